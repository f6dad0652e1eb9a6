//! Companion descriptor for external tooling.
//!
//! Besides the packed descriptor the host runtime consumes, tools such as type registrars and
//! language bindings want a readable description of a class. [`describe`] projects a registered
//! class into a [`ClassDescription`] tree, and [`to_json`] renders it as pretty-printed JSON with
//! camelCase keys.
//!
//! ```rust
//! use metaforge::prelude::*;
//! use metaforge::companion;
//!
//! struct Gauge { level: f64 }
//!
//! let registry = Registry::new();
//! let mut decl = registry.declare(ClassDef::new::<Gauge>("Gauge").base("QObject"))?;
//! decl.public();
//! decl.property(PropertyDescriptor::new::<f64>("level").getter("level", |g: &Gauge| g.level))?;
//!
//! let description = companion::describe(&registry, decl.id())?;
//! assert_eq!(description.properties[0].type_name, "double");
//!
//! let json = companion::to_json(&description)?;
//! assert!(json.contains("\"className\": \"Gauge\""));
//! # Ok::<(), metaforge::Error>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    model::{EnumFlags, MethodDescriptor, PropertyFlags},
    registry::{access::AccessProber, ClassEntry, ClassId, Registry},
    Result,
};

/// A `(name, value)` class info pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfoDescription {
    /// Key
    pub name: String,
    /// Value
    pub value: String,
}

/// A base class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperClassDescription {
    /// Inheritance access
    pub access: String,
    /// Base-class name
    pub name: String,
}

/// One argument of a method or constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentDescription {
    /// Argument name, if one was declared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Spelled type
    #[serde(rename = "type")]
    pub type_name: String,
}

/// A signal, slot, method or constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDescription {
    /// Method name
    pub name: String,
    /// Resolved access level
    pub access: String,
    /// Spelled return type; absent for constructors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    /// Arguments in order
    #[serde(default)]
    pub arguments: Vec<ArgumentDescription>,
    /// Local index within its category
    pub index: usize,
    /// Revision number, if revisioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u32>,
}

/// A property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct PropertyDescription {
    /// Property name
    pub name: String,
    /// Spelled type
    #[serde(rename = "type")]
    pub type_name: String,
    /// Getter spelling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<String>,
    /// Setter spelling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<String>,
    /// Backing field spelling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
    /// Reset spelling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset: Option<String>,
    /// Notify signal spelling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify: Option<String>,
    /// Bindable accessor spelling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bindable: Option<String>,
    /// Revision number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u32>,
    /// Constant attribute
    pub constant: bool,
    /// Designable attribute
    pub designable: bool,
    /// Final attribute
    #[serde(rename = "final")]
    pub is_final: bool,
    /// Required attribute
    pub required: bool,
    /// Scriptable attribute
    pub scriptable: bool,
    /// Stored attribute
    pub stored: bool,
    /// User attribute
    pub user: bool,
    /// Local index
    pub index: usize,
}

/// An enum or flag set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumDescription {
    /// Enum name
    pub name: String,
    /// Alias, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Scoped enumerators
    pub is_class: bool,
    /// Values combine as a bit set
    pub is_flag: bool,
    /// Enumerator names in order
    pub values: Vec<String>,
}

/// An implemented interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceDescription {
    /// Interface id
    pub id: String,
    /// Rust type standing for the interface
    pub class_name: String,
}

/// Readable description of one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDescription {
    /// Class name
    pub class_name: String,
    /// Class info annotations
    #[serde(default)]
    pub class_infos: Vec<ClassInfoDescription>,
    /// Base classes
    #[serde(default)]
    pub super_classes: Vec<SuperClassDescription>,
    /// Whether the class is final
    #[serde(default)]
    pub is_final: bool,
    /// Signals
    #[serde(default)]
    pub signals: Vec<MethodDescription>,
    /// Slots
    #[serde(default)]
    pub slots: Vec<MethodDescription>,
    /// Plain invokable methods
    #[serde(default)]
    pub methods: Vec<MethodDescription>,
    /// Constructors
    #[serde(default)]
    pub constructors: Vec<MethodDescription>,
    /// Properties
    #[serde(default)]
    pub properties: Vec<PropertyDescription>,
    /// Enums
    #[serde(default)]
    pub enums: Vec<EnumDescription>,
    /// Implemented interfaces
    #[serde(default)]
    pub interfaces: Vec<InterfaceDescription>,
}

fn describe_methods<'a>(
    registry: &Registry,
    entry: &ClassEntry,
    methods: impl Iterator<Item = &'a MethodDescriptor>,
) -> Result<Vec<MethodDescription>> {
    let prober = AccessProber::new();
    methods
        .enumerate()
        .map(|(index, method)| -> Result<MethodDescription> {
            let invoker = method.invoker();
            let arguments = invoker
                .arg_types()
                .iter()
                .enumerate()
                .map(|(arg, info)| -> Result<ArgumentDescription> {
                    let ty = registry.resolve_type(info, method.param_type(arg), method.name())?;
                    let name = method.param_name(arg);
                    Ok(ArgumentDescription {
                        name: (!name.is_empty()).then(|| name.to_string()),
                        type_name: ty.name(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(MethodDescription {
                name: method.name().to_string(),
                access: prober
                    .classify(method, entry.def().is_final())
                    .to_string(),
                return_type: Some(
                    registry
                        .resolve_type(invoker.return_type(), None, method.name())?
                        .name(),
                ),
                arguments,
                index,
                revision: method.revision_number(),
            })
        })
        .collect()
}

/// Describe a registered class.
///
/// # Errors
/// - [`crate::Error::ClassNotFound`] if `class` is unknown
/// - [`crate::Error::UnregisteredType`] for a member type that cannot be named
pub fn describe(registry: &Registry, class: ClassId) -> Result<ClassDescription> {
    let entry = registry.class(class)?;

    let constructors = entry
        .constructors()
        .enumerate()
        .map(|(index, constructor)| -> Result<MethodDescription> {
            let arguments = constructor
                .factory()
                .arg_types()
                .iter()
                .enumerate()
                .map(|(arg, info)| -> Result<ArgumentDescription> {
                    let ty = registry.resolve_type(
                        info,
                        constructor.param_type(arg),
                        constructor.name(),
                    )?;
                    Ok(ArgumentDescription {
                        name: None,
                        type_name: ty.name(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(MethodDescription {
                name: constructor.name().to_string(),
                access: "public".to_string(),
                return_type: None,
                arguments,
                index,
                revision: None,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let properties = entry
        .properties()
        .enumerate()
        .map(|(index, property)| -> Result<PropertyDescription> {
            let ty = registry.resolve_type(property.ty(), property.type_text(), property.name())?;
            let flags = property.flags();
            Ok(PropertyDescription {
                name: property.name().to_string(),
                type_name: ty.name(),
                read: property.get_facet().map(|facet| facet.spelling.clone()),
                write: property.set_facet().map(|facet| facet.spelling.clone()),
                member: property.member_facet().map(|facet| facet.spelling.clone()),
                reset: property.reset_facet().map(|facet| facet.spelling.clone()),
                notify: property.notify_ref().map(|notify| notify.spelling.clone()),
                bindable: property.bindable_spelling().map(ToString::to_string),
                revision: property.revision_number(),
                constant: flags.contains(PropertyFlags::CONSTANT),
                designable: flags.contains(PropertyFlags::DESIGNABLE),
                is_final: flags.contains(PropertyFlags::FINAL),
                required: flags.contains(PropertyFlags::REQUIRED),
                scriptable: flags.contains(PropertyFlags::SCRIPTABLE),
                stored: flags.contains(PropertyFlags::STORED),
                user: flags.contains(PropertyFlags::USER),
                index,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ClassDescription {
        class_name: entry.name().to_string(),
        class_infos: entry
            .class_info()
            .map(|info| ClassInfoDescription {
                name: info.key.clone(),
                value: info.value.clone(),
            })
            .collect(),
        super_classes: entry
            .def()
            .base_name()
            .map(|name| SuperClassDescription {
                access: "public".to_string(),
                name: name.to_string(),
            })
            .into_iter()
            .collect(),
        is_final: entry.def().is_final(),
        signals: describe_methods(registry, entry, entry.signals())?,
        slots: describe_methods(registry, entry, entry.slots())?,
        methods: describe_methods(registry, entry, entry.methods())?,
        constructors,
        properties,
        enums: entry
            .enums()
            .map(|descriptor| EnumDescription {
                name: descriptor.name().to_string(),
                alias: descriptor.alias_name().map(ToString::to_string),
                is_class: descriptor.flags().contains(EnumFlags::IS_SCOPED),
                is_flag: descriptor.flags().contains(EnumFlags::IS_FLAG),
                values: descriptor.iter().map(|(name, _)| name.to_string()).collect(),
            })
            .collect(),
        interfaces: entry
            .interfaces()
            .map(|interface| InterfaceDescription {
                id: interface.iid.clone(),
                class_name: interface.ty.name.to_string(),
            })
            .collect(),
    })
}

/// Render a description as pretty-printed JSON.
///
/// # Errors
/// Returns [`crate::Error::Serialization`] if serialization fails.
pub fn to_json(description: &ClassDescription) -> Result<String> {
    Ok(serde_json::to_string_pretty(description)?)
}

/// Parse a description from JSON.
///
/// # Errors
/// Returns [`crate::Error::Serialization`] for malformed input.
pub fn from_json(text: &str) -> Result<ClassDescription> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{Access, EnumDescriptor, MethodDescriptor, PropertyDescriptor},
        registry::ClassDef,
    };

    #[derive(Default)]
    struct Dial {
        angle: i32,
    }

    #[test]
    fn describes_members() {
        let registry = Registry::new();
        let mut decl = registry
            .declare(ClassDef::new::<Dial>("Dial").base("QWidget"))
            .unwrap();
        decl.class_info("Version", "2").unwrap();
        decl.public();
        decl.signal(
            MethodDescriptor::new("angleChanged", |_: &mut Dial, _: i32| {}).params("int angle"),
        )
        .unwrap();
        decl.protected();
        decl.slot(MethodDescriptor::new("rotate", |d: &mut Dial, by: i32| d.angle += by))
            .unwrap();
        decl.property(
            PropertyDescriptor::new::<i32>("angle")
                .getter("angle", |d: &Dial| d.angle)
                .setter("setAngle", |d: &mut Dial, v: i32| d.angle = v)
                .notify("angleChanged")
                .user(),
        )
        .unwrap();
        decl.enumeration(
            EnumDescriptor::new("Unit")
                .scoped()
                .enumerators("Unit::Degrees, Unit::Radians", &[0, 1]),
        )
        .unwrap();

        let description = describe(&registry, decl.id()).unwrap();
        assert_eq!(description.class_name, "Dial");
        assert_eq!(description.super_classes[0].name, "QWidget");
        assert_eq!(description.class_infos[0].value, "2");

        let signal = &description.signals[0];
        assert_eq!(signal.access, Access::Public.to_string());
        assert_eq!(signal.return_type.as_deref(), Some("void"));
        assert_eq!(signal.arguments[0].name.as_deref(), Some("angle"));
        assert_eq!(signal.arguments[0].type_name, "int");

        assert_eq!(description.slots[0].access, "protected");
        assert_eq!(description.slots[0].arguments[0].name, None);

        let property = &description.properties[0];
        assert_eq!(property.write.as_deref(), Some("setAngle"));
        assert_eq!(property.notify.as_deref(), Some("angleChanged"));
        assert!(property.user && property.designable && !property.constant);

        assert!(description.enums[0].is_class);
        assert_eq!(description.enums[0].values, ["Degrees", "Radians"]);
    }

    #[test]
    fn json_round_trip() {
        let registry = Registry::new();
        let class = registry.add_class(ClassDef::new::<Dial>("Dial")).unwrap();
        let description = describe(&registry, class).unwrap();

        let json = to_json(&description).unwrap();
        assert!(json.contains("\"superClasses\": []"));
        assert_eq!(from_json(&json).unwrap(), description);
        assert!(from_json("[]").is_err());
    }
}
