//! Index-based dispatch glue.
//!
//! The host runtime addresses members by index only: "invoke method 3 with these argument
//! slots", "read property 1 into this slot". [`MetaObject`] pairs the generated
//! [`MetaObjectData`] with the registry entries of its class and translates those index-based
//! requests into calls of the stored callables.
//!
//! Indices are local to the class. Method indices run over signals, then slots, then plain
//! methods, the order of the method table. A signal's identity towards the host is offset by the
//! number of signals its registered ancestors declare.
//!
//! # Examples
//!
//! ```rust
//! use metaforge::prelude::*;
//!
//! #[derive(Default)]
//! struct Counter { value: i32 }
//!
//! let registry = Registry::new();
//! let mut decl = registry.declare(ClassDef::new::<Counter>("Counter"))?;
//! decl.public();
//! decl.slot(MethodDescriptor::new("add", |c: &mut Counter, n: i32| { c.value += n; c.value }))?;
//! decl.property(
//!     PropertyDescriptor::new::<i32>("value")
//!         .member("value", |c: &Counter| &c.value, |c: &mut Counter| &mut c.value),
//! )?;
//!
//! let meta = registry.meta_object(decl.id())?;
//! let mut counter = Counter::default();
//!
//! let mut result = 0i32;
//! meta.invoke(&mut counter, 0, &mut [&mut result, &mut 5i32])?;
//! assert_eq!(result, 5);
//!
//! let mut value = 0i32;
//! assert!(meta.read_property(&counter, 0, &mut value)?);
//! assert_eq!(value, 5);
//! # Ok::<(), metaforge::Error>(())
//! ```

use std::any::Any;

use tracing::trace;

use crate::{
    builder::{LayoutConfig, MetaObjectBuilder, MetaObjectData},
    model::{MethodDescriptor, PropertyDescriptor},
    registry::{Category, ClassEntry, ClassId, Registry},
    Error, Result,
};

/// A class's generated descriptor bound to its registry entries.
#[derive(Debug)]
pub struct MetaObject<'r> {
    registry: &'r Registry,
    class: ClassId,
    entry: &'r ClassEntry,
    data: MetaObjectData,
    signal_offset: usize,
}

impl<'r> MetaObject<'r> {
    /// Build the descriptor of `class` with the default layout and bind it.
    ///
    /// # Errors
    /// Returns any error of [`MetaObjectBuilder::build`].
    pub fn new(registry: &'r Registry, class: ClassId) -> Result<Self> {
        Self::with_config(registry, class, LayoutConfig::default())
    }

    /// Build the descriptor of `class` with a custom layout and bind it.
    ///
    /// # Errors
    /// Returns any error of [`MetaObjectBuilder::build`].
    pub fn with_config(registry: &'r Registry, class: ClassId, config: LayoutConfig) -> Result<Self> {
        let data = MetaObjectBuilder::with_config(registry, config)?.build(class)?;
        Ok(MetaObject {
            registry,
            class,
            entry: registry.class(class)?,
            data,
            signal_offset: registry.inherited_count(class, Category::Signal)?,
        })
    }

    /// The generated descriptor.
    #[must_use]
    pub fn data(&self) -> &MetaObjectData {
        &self.data
    }

    /// The class this meta-object describes.
    #[must_use]
    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Class name.
    #[must_use]
    pub fn class_name(&self) -> &'r str {
        self.entry.name()
    }

    fn method(&self, index: usize) -> Result<&'r MethodDescriptor> {
        self.entry
            .method_at(index)
            .ok_or(Error::IndexOutOfRange {
                category: Category::Method,
                index,
                count: self.entry.method_count(),
            })
    }

    fn property(&self, index: usize) -> Result<&'r PropertyDescriptor> {
        self.entry.property(index).ok_or(Error::IndexOutOfRange {
            category: Category::Property,
            index,
            count: self.entry.count(Category::Property),
        })
    }

    /// Local index of the method-table entry named `name`.
    #[must_use]
    pub fn index_of_method(&self, name: &str) -> Option<usize> {
        self.entry.all_methods().position(|method| method.name() == name)
    }

    /// Local index of the property named `name`.
    #[must_use]
    pub fn index_of_property(&self, name: &str) -> Option<usize> {
        self.entry
            .properties()
            .position(|property| property.name() == name)
    }

    /// Invoke method-table entry `index` on `obj`.
    ///
    /// `slots[0]` receives the result (pass `&mut ()` to discard it), `slots[1..]` hold the
    /// arguments.
    ///
    /// # Errors
    /// - [`Error::IndexOutOfRange`] for an unknown index
    /// - [`Error::WrongAccessorShape`] if `obj` or a slot holds the wrong type
    pub fn invoke(&self, obj: &mut dyn Any, index: usize, slots: &mut [&mut dyn Any]) -> Result<()> {
        let method = self.method(index)?;
        trace!(class = self.class_name(), method = method.name(), "invoke");
        method.invoker().invoke(method.name(), obj, slots)
    }

    /// Read property `index` of `obj` into `out`.
    ///
    /// Returns `false` if the property cannot be read.
    ///
    /// # Errors
    /// - [`Error::IndexOutOfRange`] for an unknown index
    /// - [`Error::WrongAccessorShape`] if `obj` or `out` has the wrong type
    pub fn read_property(&self, obj: &dyn Any, index: usize, out: &mut dyn Any) -> Result<bool> {
        let property = self.property(index)?;
        if let Some(getter) = property.get_facet() {
            getter.accessor.get(property.name(), obj, out)?;
        } else if let Some(member) = property.member_facet() {
            member.accessor.get.get(property.name(), obj, out)?;
        } else {
            return Ok(false);
        }
        Ok(true)
    }

    /// Write `value` into property `index` of `obj`.
    ///
    /// Returns `false` if the property cannot be written.
    ///
    /// # Errors
    /// - [`Error::IndexOutOfRange`] for an unknown index
    /// - [`Error::WrongAccessorShape`] if `obj` or `value` has the wrong type
    pub fn write_property(&self, obj: &mut dyn Any, index: usize, value: &dyn Any) -> Result<bool> {
        let property = self.property(index)?;
        if let Some(setter) = property.set_facet() {
            setter.accessor.set(property.name(), obj, value)?;
        } else if let Some(member) = property.member_facet() {
            member.accessor.set.set(property.name(), obj, value)?;
        } else {
            return Ok(false);
        }
        Ok(true)
    }

    /// Reset property `index` of `obj`.
    ///
    /// Returns `false` if the property has no reset function.
    ///
    /// # Errors
    /// - [`Error::IndexOutOfRange`] for an unknown index
    /// - [`Error::WrongAccessorShape`] if `obj` has the wrong type
    pub fn reset_property(&self, obj: &mut dyn Any, index: usize) -> Result<bool> {
        let property = self.property(index)?;
        match property.reset_facet() {
            Some(reset) => {
                reset.accessor.reset(property.name(), obj)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Create an instance through constructor `index`; `slots[1..]` hold the arguments.
    ///
    /// # Errors
    /// - [`Error::IndexOutOfRange`] for an unknown index
    /// - [`Error::WrongAccessorShape`] if a slot holds the wrong type
    pub fn create_instance(&self, index: usize, slots: &[&mut dyn Any]) -> Result<Box<dyn Any>> {
        let constructor = self
            .entry
            .constructors()
            .nth(index)
            .ok_or(Error::IndexOutOfRange {
                category: Category::Constructor,
                index,
                count: self.entry.count(Category::Constructor),
            })?;
        constructor.factory().create(constructor.name(), slots)
    }

    /// Number of signals declared by the registered ancestors.
    #[must_use]
    pub fn signal_offset(&self) -> usize {
        self.signal_offset
    }

    /// Identity of local signal `index` towards the host: the inherited signal count plus
    /// `index`.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] if the class has no such signal.
    pub fn signal_identity(&self, index: usize) -> Result<usize> {
        let count = self.entry.count(Category::Signal);
        if index >= count {
            return Err(Error::IndexOutOfRange {
                category: Category::Signal,
                index,
                count,
            });
        }
        Ok(self.signal_offset + index)
    }

    /// Hand local signal `index` and its arguments to the host's activation routine.
    ///
    /// `activator` receives the signal identity and the argument slots (`args[0]` is the unused
    /// return slot, as for any method).
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] if the class has no such signal.
    pub fn activate<F>(&self, index: usize, args: &mut [&mut dyn Any], activator: F) -> Result<()>
    where
        F: FnOnce(usize, &mut [&mut dyn Any]),
    {
        let identity = self.signal_identity(index)?;
        trace!(class = self.class_name(), index, identity, "activate");
        activator(identity, args);
        Ok(())
    }

    /// Whether an object of this class can be viewed as `name`: the class itself, one of its
    /// ancestors, or an interface implemented by the class or a registered ancestor.
    #[must_use]
    pub fn cast(&self, name: &str) -> bool {
        if self.class_name() == name {
            return true;
        }

        let Ok(lineage) = self.registry.lineage(self.class) else {
            return false;
        };
        if lineage.unresolved.as_deref() == Some(name) {
            return true;
        }

        std::iter::once(self.class)
            .chain(lineage.registered)
            .filter_map(|id| self.registry.class(id).ok())
            .any(|entry| {
                entry.name() == name || entry.interfaces().any(|interface| interface.iid == name)
            })
    }
}

impl Registry {
    /// Build and bind the meta-object of `class` with the default layout.
    ///
    /// # Errors
    /// Returns any error of [`MetaObjectBuilder::build`].
    pub fn meta_object(&self, class: ClassId) -> Result<MetaObject<'_>> {
        MetaObject::new(self, class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{ConstructorDescriptor, InterfaceDescriptor},
        registry::ClassDef,
    };

    trait Drawable {}

    #[derive(Default)]
    struct Lamp {
        lit: bool,
        level: i32,
    }

    fn lamp(registry: &Registry) -> ClassId {
        let mut decl = registry
            .declare(ClassDef::new::<Lamp>("Lamp").base("Device"))
            .unwrap();
        decl.public();
        decl.signal(MethodDescriptor::new("toggled", |_: &mut Lamp, _: bool| {}))
            .unwrap();
        decl.slot(MethodDescriptor::new("toggle", |l: &mut Lamp| l.lit = !l.lit))
            .unwrap();
        decl.constructor(ConstructorDescriptor::new("Lamp", |level: i32| Lamp {
            lit: false,
            level,
        }))
        .unwrap();
        decl.property(
            PropertyDescriptor::new::<i32>("level")
                .getter("level", |l: &Lamp| l.level)
                .setter("setLevel", |l: &mut Lamp, v: i32| l.level = v)
                .reset("resetLevel", |l: &mut Lamp| l.level = 0),
        )
        .unwrap();
        decl.property(PropertyDescriptor::new::<bool>("lit").getter("isLit", |l: &Lamp| l.lit))
            .unwrap();
        decl.interface(InterfaceDescriptor::new::<dyn Drawable>("org.example.Drawable"))
            .unwrap();
        decl.id()
    }

    #[test]
    fn invoke_by_index() {
        let registry = Registry::new();
        let meta = registry.meta_object(lamp(&registry)).unwrap();
        let mut object = Lamp::default();

        let toggle = meta.index_of_method("toggle").unwrap();
        assert_eq!(toggle, 1);
        meta.invoke(&mut object, toggle, &mut []).unwrap();
        assert!(object.lit);

        assert!(matches!(
            meta.invoke(&mut object, 2, &mut []),
            Err(Error::IndexOutOfRange { category: Category::Method, index: 2, count: 2 })
        ));
    }

    #[test]
    fn properties() {
        let registry = Registry::new();
        let meta = registry.meta_object(lamp(&registry)).unwrap();
        let mut object = Lamp::default();

        assert!(meta.write_property(&mut object, 0, &7i32).unwrap());
        let mut level = 0i32;
        assert!(meta.read_property(&object, 0, &mut level).unwrap());
        assert_eq!(level, 7);

        assert!(meta.reset_property(&mut object, 0).unwrap());
        assert_eq!(object.level, 0);

        let lit = meta.index_of_property("lit").unwrap();
        assert!(!meta.write_property(&mut object, lit, &true).unwrap());
        assert!(!meta.reset_property(&mut object, lit).unwrap());

        assert!(matches!(
            meta.write_property(&mut object, 0, &"seven"),
            Err(Error::WrongAccessorShape { .. })
        ));
    }

    #[test]
    fn constructors() {
        let registry = Registry::new();
        let meta = registry.meta_object(lamp(&registry)).unwrap();
        let instance = meta.create_instance(0, &[&mut (), &mut 3i32]).unwrap();
        assert_eq!(instance.downcast_ref::<Lamp>().unwrap().level, 3);
        assert!(meta.create_instance(1, &[]).is_err());
    }

    #[test]
    fn signals_and_cast() {
        let registry = Registry::new();
        let meta = registry.meta_object(lamp(&registry)).unwrap();
        assert_eq!(meta.signal_offset(), 0);
        assert_eq!(meta.signal_identity(0).unwrap(), 0);
        assert!(meta.signal_identity(1).is_err());

        let mut seen = None;
        meta.activate(0, &mut [&mut (), &mut true], |identity, args| {
            seen = Some((identity, args.len()));
        })
        .unwrap();
        assert_eq!(seen, Some((0, 2)));

        assert!(meta.cast("Lamp"));
        assert!(meta.cast("Device"));
        assert!(meta.cast("org.example.Drawable"));
        assert!(!meta.cast("Heater"));
    }
}
