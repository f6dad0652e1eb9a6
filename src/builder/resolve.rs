//! Resolution of a registered class into the values the traversal emits.
//!
//! Everything that can fail for a reason other than a layout defect happens here, once, before
//! either pass runs: type resolution, access classification and notify resolution. The measuring
//! and emitting passes then walk the same resolved [`ClassLayout`].

use crate::{
    builder::{
        config::MetaObjectFlags,
        notify::{resolve_notify, NotifyTarget},
    },
    model::{Access, MethodDescriptor, PropertyFlags},
    registry::{access::AccessProber, Category, ClassEntry, ClassId, Registry},
    typesystem::TypeRef,
    Result,
};

/// A method-table entry ready for emission.
#[derive(Debug)]
pub(crate) struct MethodLayout<'a> {
    pub name: &'a str,
    pub flags: u32,
    pub revision: Option<u32>,
    pub ret: TypeRef,
    pub args: Vec<TypeRef>,
    pub arg_names: Vec<&'a str>,
}

impl MethodLayout<'_> {
    /// Type-handle slots this method occupies: its external return and argument types.
    pub fn handle_count(&self) -> usize {
        std::iter::once(&self.ret)
            .chain(&self.args)
            .filter(|ty| ty.needs_handle())
            .count()
    }
}

/// A property ready for emission.
#[derive(Debug)]
pub(crate) struct PropertyLayout<'a> {
    pub name: &'a str,
    pub ty: TypeRef,
    pub flags: PropertyFlags,
    pub notify: Option<NotifyTarget>,
    pub revision: Option<u32>,
}

/// An enum ready for emission.
#[derive(Debug)]
pub(crate) struct EnumLayout<'a> {
    pub name: &'a str,
    pub alias: Option<&'a str>,
    pub flags: u32,
    pub values: Vec<(&'a str, i32)>,
}

/// A constructor ready for emission.
#[derive(Debug)]
pub(crate) struct ConstructorLayout<'a> {
    pub name: &'a str,
    pub args: Vec<TypeRef>,
}

impl ConstructorLayout<'_> {
    pub fn handle_count(&self) -> usize {
        self.args.iter().filter(|ty| ty.needs_handle()).count()
    }
}

/// A class with every reference resolved.
#[derive(Debug)]
pub(crate) struct ClassLayout<'a> {
    pub name: &'a str,
    pub flags: MetaObjectFlags,
    pub class_info: Vec<(&'a str, &'a str)>,
    pub signal_count: usize,
    pub methods: Vec<MethodLayout<'a>>,
    pub properties: Vec<PropertyLayout<'a>>,
    pub enums: Vec<EnumLayout<'a>>,
    pub constructors: Vec<ConstructorLayout<'a>>,
}

impl<'a> ClassLayout<'a> {
    /// Resolve `class` of `registry`.
    ///
    /// # Errors
    /// - [`crate::Error::ClassNotFound`] if `class` is unknown
    /// - [`crate::Error::UnregisteredType`] for a member type that cannot be expressed
    /// - [`crate::Error::NotifySignalNotFound`] for a dangling notify reference
    pub fn resolve(registry: &'a Registry, class: ClassId) -> Result<Self> {
        let entry = registry.class(class)?;
        let prober = AccessProber::new();
        let final_class = entry.def().is_final();

        let methods = entry
            .all_methods()
            .map(|method| {
                let access = prober.classify(method, final_class);
                resolve_method(registry, method, access)
            })
            .collect::<Result<Vec<_>>>()?;

        let properties = entry
            .properties()
            .map(|property| -> Result<PropertyLayout<'a>> {
                let mut flags = property.flags();
                if registry.is_enum_type(class, property.ty())? {
                    flags |= PropertyFlags::ENUM_OR_FLAG;
                }
                Ok(PropertyLayout {
                    name: property.name(),
                    ty: registry.resolve_type(property.ty(), property.type_text(), property.name())?,
                    flags,
                    notify: resolve_notify(registry, class, property)?,
                    revision: property.revision_number(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let constructors = entry
            .constructors()
            .map(|constructor| -> Result<ConstructorLayout<'a>> {
                let args = constructor
                    .factory()
                    .arg_types()
                    .iter()
                    .enumerate()
                    .map(|(index, info)| {
                        registry.resolve_type(info, constructor.param_type(index), constructor.name())
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(ConstructorLayout {
                    name: constructor.name(),
                    args,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ClassLayout {
            name: entry.name(),
            flags: entry.def().meta_flags(),
            class_info: entry
                .class_info()
                .map(|info| (info.key.as_str(), info.value.as_str()))
                .collect(),
            signal_count: entry.count(Category::Signal),
            methods,
            properties,
            enums: resolve_enums(entry),
            constructors,
        })
    }
}

fn resolve_method<'a>(
    registry: &Registry,
    method: &'a MethodDescriptor,
    access: Access,
) -> Result<MethodLayout<'a>> {
    let invoker = method.invoker();
    let ret = registry.resolve_type(invoker.return_type(), None, method.name())?;
    let args = invoker
        .arg_types()
        .iter()
        .enumerate()
        .map(|(index, info)| registry.resolve_type(info, method.param_type(index), method.name()))
        .collect::<Result<Vec<_>>>()?;

    Ok(MethodLayout {
        name: method.name(),
        flags: method.flags(access),
        revision: method.revision_number(),
        ret,
        arg_names: (0..args.len()).map(|index| method.param_name(index)).collect(),
        args,
    })
}

fn resolve_enums(entry: &ClassEntry) -> Vec<EnumLayout<'_>> {
    entry
        .enums()
        .map(|descriptor| EnumLayout {
            name: descriptor.name(),
            alias: descriptor.alias_name(),
            flags: descriptor.flags().bits(),
            values: descriptor.iter().collect(),
        })
        .collect()
}
