//! The canonical walk over a class descriptor.
//!
//! [`traverse`] is the only place that knows the order in which the descriptor is laid out. Both
//! the measuring and the emitting pass call it, differing only in the [`LayoutSink`] they pass, so
//! the two passes cannot drift apart.
//!
//! All offsets written into the header and records come from a [`SectionPlan`] computed from the
//! counts and the configuration up front. At every section boundary the plan is checked against
//! the sink position; a disagreement is reported as [`crate::Error::LayoutMismatch`].
//!
//! # Layout
//!
//! | Section | Content |
//! |---|---|
//! | header | revision, class name, `(count, offset)` for class info, methods, properties, enums and constructors, flags, signal count |
//! | class info | key, value |
//! | methods | name, argc, parameters, tag, flags, [first type handle]; then a revision block if any method is revisioned |
//! | properties | name, type, flags, [notify], [revision]; then trailing notify / revision blocks for the short record shapes |
//! | enums | name, [alias], flags, count, data |
//! | constructors | as methods |
//! | parameters | per method: return type, argument types, argument names |
//! | constructor parameters | per constructor: marker, argument types, name placeholders |
//! | enum data | per enumerator: name, value |

use crate::{
    builder::{
        config::LayoutConfig,
        notify::{NotifyTarget, IS_UNRESOLVED_SIGNAL},
        output::{EMPTY_STRING, HEADER_SIZE},
        resolve::ClassLayout,
        sink::LayoutSink,
    },
    model::{Access, MethodKind},
    typesystem::{TypeRef, IS_UNRESOLVED_TYPE},
    Result,
};

/// Offsets of every section, derived from counts alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SectionPlan {
    pub class_info: usize,
    pub methods: usize,
    pub method_revisions: bool,
    pub properties: usize,
    pub notify_block: bool,
    pub property_revision_block: bool,
    pub enums: usize,
    pub constructors: usize,
    pub parameters: usize,
    pub constructor_parameters: usize,
    pub enum_data: usize,
    pub end: usize,
}

impl SectionPlan {
    pub fn new(layout: &ClassLayout<'_>, config: &LayoutConfig) -> Self {
        let method_count = layout.methods.len();
        let property_count = layout.properties.len();

        let class_info = HEADER_SIZE;
        let methods = class_info + 2 * layout.class_info.len();

        let method_revisions = layout.methods.iter().any(|m| m.revision.is_some());
        let properties = methods
            + config.method_fields * method_count
            + if method_revisions { method_count } else { 0 };

        let notify_block =
            !config.inline_notify() && layout.properties.iter().any(|p| p.notify.is_some());
        let property_revision_block = !config.inline_property_revision()
            && layout.properties.iter().any(|p| p.revision.is_some());
        let trailing = usize::from(notify_block) + usize::from(property_revision_block);
        let enums = properties + (config.property_fields + trailing) * property_count;

        let constructors = enums + config.enum_fields * layout.enums.len();
        let parameters = constructors + config.method_fields * layout.constructors.len();
        let constructor_parameters = parameters
            + layout
                .methods
                .iter()
                .map(|m| 1 + 2 * m.args.len())
                .sum::<usize>();
        let enum_data = constructor_parameters
            + layout
                .constructors
                .iter()
                .map(|c| 1 + 2 * c.args.len())
                .sum::<usize>();
        let end = enum_data + layout.enums.iter().map(|e| 2 * e.values.len()).sum::<usize>();

        SectionPlan {
            class_info,
            methods,
            method_revisions,
            properties,
            notify_block,
            property_revision_block,
            enums,
            constructors,
            parameters,
            constructor_parameters,
            enum_data,
            end,
        }
    }
}

fn word(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| layout_error!("value {} exceeds the 32-bit range", value))
}

fn boundary<S: LayoutSink>(sink: &S, expected: usize, section: &str) -> Result<()> {
    if sink.position() != expected {
        return Err(layout_error!(
            "section `{}` starts at {} but the plan puts it at {}",
            section,
            sink.position(),
            expected
        ));
    }
    Ok(())
}

fn type_ref<S: LayoutSink>(sink: &mut S, ty: &TypeRef) -> Result<u32> {
    match ty {
        TypeRef::Builtin(builtin) => Ok(builtin.id()),
        TypeRef::External(external) => Ok(IS_UNRESOLVED_TYPE | sink.string(&external.name)?),
        TypeRef::Literal(text) => Ok(IS_UNRESOLVED_TYPE | sink.string(text)?),
    }
}

fn notify_ref<S: LayoutSink>(
    sink: &mut S,
    notify: Option<&NotifyTarget>,
    missing: u32,
) -> Result<u32> {
    match notify {
        None => Ok(missing),
        Some(NotifyTarget::Index(index)) => Ok(*index),
        Some(NotifyTarget::Name(name)) => Ok(IS_UNRESOLVED_SIGNAL | sink.string(name)?),
    }
}

fn handle<S: LayoutSink>(sink: &mut S, ty: &TypeRef, expected: &mut usize) -> Result<()> {
    if let TypeRef::External(external) = ty {
        let index = sink.handle(external.handle.as_ref())? as usize;
        if index != *expected {
            return Err(layout_error!(
                "type handle of `{}` landed in slot {} instead of {}",
                external.name,
                index,
                expected
            ));
        }
        *expected += 1;
    }
    Ok(())
}

/// Walk `layout` in descriptor order, feeding every integer, string and type-handle slot to
/// `sink`.
pub(crate) fn traverse<S: LayoutSink>(
    layout: &ClassLayout<'_>,
    config: &LayoutConfig,
    sink: &mut S,
) -> Result<()> {
    let plan = SectionPlan::new(layout, config);

    // Header
    boundary(sink, 0, "header")?;
    sink.int(config.revision)?;
    let name = sink.string(layout.name)?;
    sink.int(name)?;
    if sink.string("")? != EMPTY_STRING {
        return Err(layout_error!("empty placeholder is not string {}", EMPTY_STRING));
    }
    for (count, offset) in [
        (layout.class_info.len(), plan.class_info),
        (layout.methods.len(), plan.methods),
        (layout.properties.len(), plan.properties),
        (layout.enums.len(), plan.enums),
        (layout.constructors.len(), plan.constructors),
    ] {
        sink.int(word(count)?)?;
        sink.int(word(offset)?)?;
    }
    sink.int(layout.flags.bits())?;
    sink.int(word(layout.signal_count)?)?;

    // Class info
    boundary(sink, plan.class_info, "class info")?;
    for (key, value) in &layout.class_info {
        let key = sink.string(key)?;
        sink.int(key)?;
        let value = sink.string(value)?;
        sink.int(value)?;
    }

    // Property type handles lead the handle table
    let mut next_handle = 0usize;
    if config.type_handles {
        for property in &layout.properties {
            handle(sink, &property.ty, &mut next_handle)?;
        }
    }

    // Method records
    boundary(sink, plan.methods, "methods")?;
    let mut handle_cursor = next_handle;
    let mut parameters = plan.parameters;
    for method in &layout.methods {
        let name = sink.string(method.name)?;
        sink.int(name)?;
        sink.int(word(method.args.len())?)?;
        sink.int(word(parameters)?)?;
        sink.int(EMPTY_STRING)?;
        sink.int(method.flags)?;
        if config.method_fields == 6 {
            sink.int(word(handle_cursor)?)?;
        }
        handle_cursor += method.handle_count();
        parameters += 1 + 2 * method.args.len();
    }
    if plan.method_revisions {
        for method in &layout.methods {
            sink.int(method.revision.unwrap_or(0))?;
        }
    }

    // Property records
    boundary(sink, plan.properties, "properties")?;
    for property in &layout.properties {
        let name = sink.string(property.name)?;
        sink.int(name)?;
        let ty = type_ref(sink, &property.ty)?;
        sink.int(ty)?;
        sink.int(property.flags.bits())?;
        if config.inline_notify() {
            let notify = notify_ref(sink, property.notify.as_ref(), u32::MAX)?;
            sink.int(notify)?;
        }
        if config.inline_property_revision() {
            sink.int(property.revision.unwrap_or(0))?;
        }
    }
    if plan.notify_block {
        for property in &layout.properties {
            let notify = notify_ref(sink, property.notify.as_ref(), 0)?;
            sink.int(notify)?;
        }
    }
    if plan.property_revision_block {
        for property in &layout.properties {
            sink.int(property.revision.unwrap_or(0))?;
        }
    }

    // Enum records
    boundary(sink, plan.enums, "enums")?;
    let mut data = plan.enum_data;
    for descriptor in &layout.enums {
        let name = sink.string(descriptor.name)?;
        sink.int(name)?;
        if config.enum_alias() {
            let alias = sink.string(descriptor.alias.unwrap_or(descriptor.name))?;
            sink.int(alias)?;
        }
        sink.int(descriptor.flags)?;
        sink.int(word(descriptor.values.len())?)?;
        sink.int(word(data)?)?;
        data += 2 * descriptor.values.len();
    }

    // Constructor records
    boundary(sink, plan.constructors, "constructors")?;
    let constructor_flags = Access::Public.bits() | MethodKind::Constructor.bits();
    let mut parameters = plan.constructor_parameters;
    for constructor in &layout.constructors {
        let name = sink.string(constructor.name)?;
        sink.int(name)?;
        sink.int(word(constructor.args.len())?)?;
        sink.int(word(parameters)?)?;
        sink.int(EMPTY_STRING)?;
        sink.int(constructor_flags)?;
        if config.method_fields == 6 {
            sink.int(word(handle_cursor)?)?;
        }
        handle_cursor += constructor.handle_count();
        parameters += 1 + 2 * constructor.args.len();
    }

    // Method parameter blocks
    boundary(sink, plan.parameters, "parameters")?;
    for method in &layout.methods {
        let ret = type_ref(sink, &method.ret)?;
        sink.int(ret)?;
        for arg in &method.args {
            let ty = type_ref(sink, arg)?;
            sink.int(ty)?;
        }
        for arg_name in &method.arg_names {
            let index = if arg_name.is_empty() {
                EMPTY_STRING
            } else {
                sink.string(arg_name)?
            };
            sink.int(index)?;
        }
        if config.type_handles {
            handle(sink, &method.ret, &mut next_handle)?;
            for arg in &method.args {
                handle(sink, arg, &mut next_handle)?;
            }
        }
    }

    // Constructor parameter blocks
    boundary(sink, plan.constructor_parameters, "constructor parameters")?;
    for constructor in &layout.constructors {
        sink.int(IS_UNRESOLVED_TYPE | EMPTY_STRING)?;
        for arg in &constructor.args {
            let ty = type_ref(sink, arg)?;
            sink.int(ty)?;
        }
        for _ in &constructor.args {
            sink.int(EMPTY_STRING)?;
        }
        if config.type_handles {
            for arg in &constructor.args {
                handle(sink, arg, &mut next_handle)?;
            }
        }
    }

    // Enum data
    boundary(sink, plan.enum_data, "enum data")?;
    for descriptor in &layout.enums {
        for &(name, value) in &descriptor.values {
            let name = sink.string(name)?;
            sink.int(name)?;
            sink.int(value as u32)?;
        }
    }

    boundary(sink, plan.end, "end")?;
    if config.type_handles && next_handle != handle_cursor {
        return Err(layout_error!(
            "records announce {} type handles but {} were written",
            handle_cursor,
            next_handle
        ));
    }
    Ok(())
}
