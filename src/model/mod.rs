//! Descriptor model.
//!
//! One plain record per reflected member kind. Every record is built by chained calls so that
//! optional facets attach without repeating the required fields, handed to the
//! [`crate::Registry`] once, and never changed afterwards.
//!
//! # Key Components
//!
//! - [`MethodDescriptor`] - Signals, slots and plain invokable methods
//! - [`ConstructorDescriptor`] - Reflected constructors
//! - [`PropertyDescriptor`] - Properties with getter / setter / member / reset / notify facets
//! - [`EnumDescriptor`] - Enums and flag sets
//! - [`ClassInfoEntry`] - Free-form key/value annotations
//! - [`InterfaceDescriptor`] - Implemented capability interfaces
//! - [`callable`] - Type-erased callables the descriptors carry

pub mod callable;
mod constructor;
mod enums;
mod method;
mod property;

pub use callable::{Factory, Getter, IntoFactory, IntoInvoker, Invoker, Reset, Setter};
pub use constructor::ConstructorDescriptor;
pub use enums::{EnumDescriptor, EnumFlags};
pub use method::{Access, MethodDescriptor, MethodFlags, MethodKind};
pub use property::{Facet, MemberAccess, NotifyRef, PropertyDescriptor, PropertyFlags};

use crate::typesystem::TypeInfo;

/// A free-form `(key, value)` annotation on a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfoEntry {
    /// Annotation key
    pub key: String,
    /// Annotation value
    pub value: String,
}

impl ClassInfoEntry {
    /// Create an annotation.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        ClassInfoEntry {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A capability interface implemented by a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    /// Interface id the host runtime casts by
    pub iid: String,
    /// The Rust type standing for the capability, typically a trait object type
    pub ty: TypeInfo,
}

impl InterfaceDescriptor {
    /// Reference the capability `I` under the interface id `iid`.
    #[must_use]
    pub fn new<I: ?Sized + 'static>(iid: impl Into<String>) -> Self {
        InterfaceDescriptor {
            iid: iid.into(),
            ty: TypeInfo::of::<I>(),
        }
    }
}

/// Any descriptor, as handed to [`crate::Registry::register`].
///
/// Method descriptors are routed to the signal, slot or method catalog by their kind.
#[derive(Debug, Clone)]
pub enum Descriptor {
    /// Signal, slot or method
    Method(MethodDescriptor),
    /// Constructor
    Constructor(ConstructorDescriptor),
    /// Property
    Property(PropertyDescriptor),
    /// Enum
    Enum(EnumDescriptor),
    /// Class info annotation
    ClassInfo(ClassInfoEntry),
    /// Implemented interface
    Interface(InterfaceDescriptor),
}

impl From<MethodDescriptor> for Descriptor {
    fn from(value: MethodDescriptor) -> Self {
        Descriptor::Method(value)
    }
}

impl From<ConstructorDescriptor> for Descriptor {
    fn from(value: ConstructorDescriptor) -> Self {
        Descriptor::Constructor(value)
    }
}

impl From<PropertyDescriptor> for Descriptor {
    fn from(value: PropertyDescriptor) -> Self {
        Descriptor::Property(value)
    }
}

impl From<EnumDescriptor> for Descriptor {
    fn from(value: EnumDescriptor) -> Self {
        Descriptor::Enum(value)
    }
}

impl From<ClassInfoEntry> for Descriptor {
    fn from(value: ClassInfoEntry) -> Self {
        Descriptor::ClassInfo(value)
    }
}

impl From<InterfaceDescriptor> for Descriptor {
    fn from(value: InterfaceDescriptor) -> Self {
        Descriptor::Interface(value)
    }
}

/// A borrowed registry entry, as returned by [`crate::Registry::lookup`].
#[derive(Debug, Clone, Copy)]
pub enum Member<'a> {
    /// Signal, slot or method
    Method(&'a MethodDescriptor),
    /// Constructor
    Constructor(&'a ConstructorDescriptor),
    /// Property
    Property(&'a PropertyDescriptor),
    /// Enum
    Enum(&'a EnumDescriptor),
    /// Class info annotation
    ClassInfo(&'a ClassInfoEntry),
    /// Implemented interface
    Interface(&'a InterfaceDescriptor),
}

impl Member<'_> {
    /// Display name of the member.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Member::Method(m) => m.name(),
            Member::Constructor(c) => c.name(),
            Member::Property(p) => p.name(),
            Member::Enum(e) => e.name(),
            Member::ClassInfo(ci) => &ci.key,
            Member::Interface(i) => &i.iid,
        }
    }
}
