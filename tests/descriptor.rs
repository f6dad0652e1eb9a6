//! Integration tests for descriptor generation.
//!
//! These build realistic classes through the public API and check the generated descriptor:
//! exact sizing across record layouts, identical traversals in both passes, notify resolution
//! within and across classes, and property access through the dispatch glue.

use metaforge::{builder::EMPTY_STRING, prelude::*};

#[derive(Debug, Default, Clone, PartialEq)]
struct Counter {
    value: i32,
}

#[derive(Debug, Clone, PartialEq)]
struct Palette {
    name: String,
}

/// Counter with a notifying property, a signal and a slot.
fn counter(registry: &Registry) -> Result<ClassId> {
    let mut decl = registry.declare(ClassDef::new::<Counter>("Counter").base("QObject"))?;
    decl.public();
    decl.property(
        PropertyDescriptor::new::<i32>("value")
            .getter("getValue", |c: &Counter| c.value)
            .setter("setValue", |c: &mut Counter, v: i32| c.value = v)
            .notify("valueChanged"),
    )?;
    decl.signal(MethodDescriptor::new("valueChanged", |_: &mut Counter| {}))?;
    decl.slot(MethodDescriptor::new("increment", |c: &mut Counter| c.value += 1))?;
    Ok(decl.id())
}

/// A class touching every section of the descriptor.
fn everything(registry: &Registry) -> Result<ClassId> {
    registry.register_type::<Palette>("Palette");
    let mut decl = registry.declare(
        ClassDef::new::<Counter>("Everything")
            .base("QObject")
            .flags(MetaObjectFlags::default() | MetaObjectFlags::REQUIRES_VARIANT_META_OBJECT),
    )?;
    decl.class_info("DefaultProperty", "value")?;
    decl.class_info("Version", "3")?;
    decl.public();
    decl.signal(MethodDescriptor::new("valueChanged", |_: &mut Counter, _: i32| {}).params("int value"))?;
    decl.signal(MethodDescriptor::new("paletteChanged", |_: &mut Counter| {}).revision(2))?;
    decl.slot(
        MethodDescriptor::new("apply", |_: &mut Counter, p: Palette, strength: f64| {
            !p.name.is_empty() && strength > 0.0
        })
        .params("Palette palette, double strength"),
    )?;
    decl.method(MethodDescriptor::new("label", |c: &mut Counter| c.value.to_string()).constant())?;
    decl.constructor(ConstructorDescriptor::new("Everything", Counter::default))?;
    decl.constructor(ConstructorDescriptor::new("Everything", |value: i32| Counter { value }))?;
    decl.property(
        PropertyDescriptor::new::<i32>("value")
            .member("value", |c: &Counter| &c.value, |c: &mut Counter| &mut c.value)
            .notify("valueChanged")
            .revision(1),
    )?;
    decl.property(
        PropertyDescriptor::new::<Palette>("palette")
            .getter("palette", |_: &Counter| Palette { name: "dark".into() })
            .notify("paletteChanged"),
    )?;
    decl.property(PropertyDescriptor::new::<bool>("idle").getter("isIdle", |c: &Counter| c.value == 0))?;
    decl.enumeration(EnumDescriptor::new("Mode").enumerators("Mode::Fast, Mode::Slow", &[0, 1]))?;
    decl.enumeration(
        EnumDescriptor::new("Options")
            .alias("Option")
            .flag()
            .enumerators("A = 0x1, B = 0x2, C = 0x4", &[1, 2, 4]),
    )?;
    Ok(decl.id())
}

/// Records every operation of a traversal.
#[derive(Debug, Default, PartialEq)]
struct Recorder {
    ints: Vec<u32>,
    ops: Vec<String>,
    strings: u32,
    handles: u32,
}

impl LayoutSink for Recorder {
    fn int(&mut self, value: u32) -> Result<()> {
        self.ops.push(format!("int {}", value));
        self.ints.push(value);
        Ok(())
    }

    fn string(&mut self, text: &str) -> Result<u32> {
        self.ops.push(format!("string {:?}", text));
        self.strings += 1;
        Ok(self.strings - 1)
    }

    fn handle(&mut self, handle: Option<&TypeHandle>) -> Result<u32> {
        self.ops.push(format!("handle {:?}", handle.map(|h| h.name.clone())));
        self.handles += 1;
        Ok(self.handles - 1)
    }

    fn position(&self) -> usize {
        self.ints.len()
    }
}

/// The measured totals are exactly what the emitting pass fills, for every record layout.
#[test]
fn test_measure_equals_emit_for_all_layouts() -> Result<()> {
    let registry = Registry::new();
    let classes = [counter(&registry)?, everything(&registry)?];

    for config in LayoutConfig::presets() {
        let builder = MetaObjectBuilder::with_config(&registry, config)?;
        for class in classes {
            let totals = builder.measure(class)?;
            let data = builder.emit(class, totals)?;

            assert_eq!(data.ints().len(), totals.int_count);
            assert_eq!(data.strings().len(), totals.string_count);
            assert_eq!(data.strings().bytes().len(), totals.string_bytes);
            assert_eq!(data.type_handles().len(), totals.type_handle_count);
            assert_eq!(data.revision(), config.revision);
        }
    }
    Ok(())
}

/// Two traversals of the same class issue the same operations in the same order.
#[test]
fn test_traversal_is_deterministic() -> Result<()> {
    let registry = Registry::new();
    let class = everything(&registry)?;
    let builder = MetaObjectBuilder::new(&registry);

    let mut first = Recorder::default();
    let mut second = Recorder::default();
    builder.drive(class, &mut first)?;
    builder.drive(class, &mut second)?;
    assert_eq!(first, second);

    let data = builder.build(class)?;
    assert_eq!(data.ints(), first.ints.as_slice());
    assert_eq!(data.strings().len(), first.strings as usize);
    assert_eq!(data.type_handles().len(), first.handles as usize);
    Ok(())
}

/// Header slots, records and blocks of a fully populated class.
#[test]
fn test_everything_layout() -> Result<()> {
    let registry = Registry::new();
    let class = everything(&registry)?;
    let data = MetaObjectBuilder::new(&registry).build(class)?;

    assert_eq!(data.class_name(), Some("Everything"));
    assert!(data.flags().contains(MetaObjectFlags::REQUIRES_VARIANT_META_OBJECT));
    assert_eq!(data.class_info_count(), 2);
    assert_eq!(data.class_info(1), Some(("Version", "3")));
    assert_eq!(data.method_count(), 4);
    assert_eq!(data.signal_count(), 2);
    assert_eq!(data.property_count(), 3);
    assert_eq!(data.enum_count(), 2);
    assert_eq!(data.constructor_count(), 2);

    // method records in signal, slot, method order
    let names: Vec<_> = (0..4).filter_map(|i| data.method_name(i)).collect();
    assert_eq!(names, ["valueChanged", "paletteChanged", "apply", "label"]);

    let flags = data.method_record(3).unwrap()[4];
    assert_ne!(flags & MethodFlags::CONST.bits(), 0);
    let flags = data.method_record(1).unwrap()[4];
    assert_eq!(flags & MethodFlags::METHOD_TYPE_MASK.bits(), MethodKind::Signal.bits());
    assert_ne!(flags & MethodFlags::REVISIONED.bits(), 0);

    // the palette property comes first in the handle table, then the slot argument
    let handles: Vec<_> = data
        .type_handles()
        .iter()
        .map(|h| h.as_ref().map(|h| h.name.clone()))
        .collect();
    assert_eq!(handles, [Some("Palette".to_string()), Some("Palette".to_string())]);
    assert_eq!(data.method_record(2).unwrap()[5], 1);

    let params = data.method_parameters(2).unwrap();
    assert_eq!(params[0], BuiltinType::Bool.id());
    assert_eq!(data.type_name(params[1]).as_deref(), Some("Palette"));
    assert_eq!(params[2], BuiltinType::Double.id());
    assert_eq!(data.string(params[3] as usize), Some("palette"));
    assert_eq!(data.string(params[4] as usize), Some("strength"));

    assert_eq!(data.property_revision(0), Some(1));
    assert_eq!(data.property_notify(0), Some(NotifyTarget::Index(0)));
    assert_eq!(data.property_notify(1), Some(NotifyTarget::Index(1)));
    assert_eq!(data.property_notify(2), None);

    assert_eq!(data.enum_values(0).unwrap(), [("Fast", 0), ("Slow", 1)]);
    assert_eq!(data.enum_values(1).unwrap(), [("A", 1), ("B", 2), ("C", 4)]);
    let alias = data.enum_record(1).unwrap()[1] as usize;
    assert_eq!(data.string(alias), Some("Option"));

    let constructor = data.constructor_record(1).unwrap();
    assert_eq!(constructor[1], 1);
    assert_eq!(constructor[4], Access::Public.bits() | MethodKind::Constructor.bits());
    Ok(())
}

/// Unnamed parameters spelled with several words keep their full type and get no name.
#[test]
fn test_multi_word_parameter_types() -> Result<()> {
    let registry = Registry::new();
    let mut decl = registry.declare(ClassDef::new::<Counter>("Storage"))?;
    decl.public();
    decl.slot(
        MethodDescriptor::new("store", |_: &mut Counter, _: i64, _: u8, _: String| {})
            .params("long long, unsigned char, const QString"),
    )?;
    let data = MetaObjectBuilder::new(&registry).build(decl.id())?;

    let params = data.method_parameters(0).unwrap();
    assert_eq!(params[0], BuiltinType::Void.id());
    assert_eq!(
        &params[1..4],
        [
            BuiltinType::LongLong.id(),
            BuiltinType::UChar.id(),
            BuiltinType::QString.id()
        ]
    );
    assert_eq!(&params[4..7], [EMPTY_STRING; 3]);
    Ok(())
}

/// Signal, slot and property as in the canonical counter example.
#[test]
fn test_counter_scenario() -> Result<()> {
    let registry = Registry::new();
    let class = counter(&registry)?;
    let meta = registry.meta_object(class)?;
    let data = meta.data();

    assert_eq!(data.property_count(), 1);
    assert_eq!(data.method_count(), 2);
    assert_eq!(data.property_notify(0), Some(NotifyTarget::Index(0)));
    let flags = data.property_flags(0).unwrap();
    assert!(flags.contains(PropertyFlags::READABLE | PropertyFlags::WRITABLE | PropertyFlags::NOTIFY));
    assert!(flags.contains(PropertyFlags::STD_CPP_SET));

    let mut counter = Counter::default();
    let increment = meta.index_of_method("increment").unwrap();
    meta.invoke(&mut counter, increment, &mut [&mut ()])?;
    meta.invoke(&mut counter, increment, &mut [&mut ()])?;

    let mut value = 0i32;
    assert!(meta.read_property(&counter, 0, &mut value)?);
    assert_eq!(value, 2);

    // getter and setter round-trip
    assert!(meta.write_property(&mut counter, 0, &-5i32)?);
    assert!(meta.read_property(&counter, 0, &mut value)?);
    assert_eq!(value, -5);
    Ok(())
}

/// A notify signal declared by a registered base class is referenced by name.
#[test]
fn test_inherited_notify_scenario() -> Result<()> {
    let registry = Registry::new();

    let mut base = registry.declare(ClassDef::new::<Counter>("Base").base("QObject"))?;
    base.public();
    base.signal(MethodDescriptor::new("changed", |_: &mut Counter| {}))?;

    let mut derived = registry.declare(ClassDef::new::<Counter>("Derived").base("Base"))?;
    derived.public();
    derived.property(
        PropertyDescriptor::new::<i32>("x")
            .getter("x", |c: &Counter| c.value)
            .notify("changed"),
    )?;
    let derived = derived.id();

    let data = MetaObjectBuilder::new(&registry).build(derived)?;
    assert_eq!(data.property_notify(0), Some(NotifyTarget::Name("changed".into())));

    // the short record layout carries the same reference in its trailing block
    let builder = MetaObjectBuilder::with_config(&registry, LayoutConfig::revision7())?;
    let data = builder.build(derived)?;
    assert_eq!(data.property_notify(0), Some(NotifyTarget::Name("changed".into())));
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Speed {
    Slow,
    Fast,
}

/// A property typed by an enum of a registered base class is flagged as an enum property.
#[test]
fn test_inherited_enum_property() -> Result<()> {
    let registry = Registry::new();

    let base = registry.declare(ClassDef::new::<Counter>("Engine"))?;
    base.enumeration(EnumDescriptor::of::<Speed>("Speed").enumerators("Slow, Fast", &[0, 1]))?;

    let mut derived = registry.declare(ClassDef::new::<Counter>("Turbo").base("Engine"))?;
    derived.public();
    derived.property(PropertyDescriptor::new::<Speed>("speed").getter("speed", |c: &Counter| {
        if c.value > 0 {
            Speed::Fast
        } else {
            Speed::Slow
        }
    }))?;
    let derived = derived.id();

    let data = MetaObjectBuilder::new(&registry).build(derived)?;
    let record = data.property_record(0).unwrap();
    assert_eq!(data.type_name(record[1]).as_deref(), Some("Engine::Speed"));
    assert!(data
        .property_flags(0)
        .unwrap()
        .contains(PropertyFlags::ENUM_OR_FLAG | PropertyFlags::READABLE));
    Ok(())
}

/// A notify reference matching nothing reachable fails the build.
#[test]
fn test_dangling_notify() -> Result<()> {
    let registry = Registry::new();
    let mut decl = registry.declare(ClassDef::new::<Counter>("Lonely"))?;
    decl.public();
    decl.property(
        PropertyDescriptor::new::<i32>("x")
            .getter("x", |c: &Counter| c.value)
            .notify("nowhere"),
    )?;

    let err = MetaObjectBuilder::new(&registry).build(decl.id()).unwrap_err();
    assert!(matches!(
        err,
        Error::NotifySignalNotFound { ref signal, .. } if signal == "nowhere"
    ));
    Ok(())
}

/// Values written through a property come back through it, with setter and member access.
#[test]
fn test_property_round_trip() -> Result<()> {
    let registry = Registry::new();
    let class = everything(&registry)?;
    let meta = registry.meta_object(class)?;
    let mut object = Counter::default();

    let value = meta.index_of_property("value").unwrap();
    assert!(meta.write_property(&mut object, value, &41i32)?);
    let mut out = 0i32;
    assert!(meta.read_property(&object, value, &mut out)?);
    assert_eq!(out, 41);

    let idle = meta.index_of_property("idle").unwrap();
    assert!(!meta.write_property(&mut object, idle, &true)?);

    let mut wrong = String::new();
    assert!(matches!(
        meta.read_property(&object, value, &mut wrong),
        Err(Error::WrongAccessorShape { .. })
    ));
    Ok(())
}

/// Constructors build instances through the dispatch glue.
#[test]
fn test_create_instance() -> Result<()> {
    let registry = Registry::new();
    let class = everything(&registry)?;
    let meta = registry.meta_object(class)?;

    let made = meta.create_instance(1, &[&mut (), &mut 9i32])?;
    assert_eq!(made.downcast_ref::<Counter>(), Some(&Counter { value: 9 }));
    let made = meta.create_instance(0, &[&mut ()])?;
    assert_eq!(made.downcast_ref::<Counter>(), Some(&Counter::default()));
    Ok(())
}
