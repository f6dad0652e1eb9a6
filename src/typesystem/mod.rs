//! Type references as they appear in a reflection descriptor.
//!
//! Every return, argument and property type of a reflected member ends up in the descriptor in
//! one of three shapes:
//!
//! - a **built-in id** ([`BuiltinType`]) for the types the host runtime knows natively,
//! - an **external** reference: the registered name in the string pool, flagged as
//!   "resolve by name", plus a slot in the type-handle table holding the runtime handle (or null
//!   while the type is only declared),
//! - a **literal** spelling supplied at the declaration site, emitted verbatim by name.
//!
//! [`TypeTable`] holds the external registrations and performs the resolution of a Rust static
//! type plus an optional spelled name into a [`TypeRef`].

mod builtin;

pub use builtin::{normalize_type_name, BuiltinType};

use std::{
    any::{type_name, TypeId},
    fmt,
    sync::Arc,
};

use dashmap::{mapref::entry::Entry, DashMap};

use crate::{Error, Result};

/// Flag OR'ed into a string index to mark a type reference that the host resolves by name.
pub const IS_UNRESOLVED_TYPE: u32 = 0x8000_0000;

/// Identity of a Rust type as seen by the registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    /// The `TypeId` of the type
    pub id: TypeId,
    /// The Rust name of the type, for diagnostics and the companion descriptor
    pub name: &'static str,
}

impl TypeInfo {
    /// Capture the identity of `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeInfo {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// The built-in type `T` maps to, if any.
    #[must_use]
    pub fn builtin(&self) -> Option<BuiltinType> {
        BuiltinType::for_type_id(self.id)
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Runtime-visible description of a registered type; what a type-handle slot points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInterface {
    /// Name the host runtime registers the type under
    pub name: String,
    /// Rust identity of the type
    pub info: TypeInfo,
    /// `size_of` the Rust type
    pub size: usize,
    /// `align_of` the Rust type
    pub align: usize,
}

impl TypeInterface {
    /// Describe `T` under the given host name.
    #[must_use]
    pub fn of<T: 'static>(name: impl Into<String>) -> Self {
        TypeInterface {
            name: name.into(),
            info: TypeInfo::of::<T>(),
            size: std::mem::size_of::<T>(),
            align: std::mem::align_of::<T>(),
        }
    }
}

/// A pointer-sized handle to a [`TypeInterface`].
pub type TypeHandle = Arc<TypeInterface>;

/// An external type registration.
#[derive(Debug, Clone)]
pub struct ExternalType {
    /// Name the host runtime resolves the type by
    pub name: String,
    /// Runtime handle, `None` while the type is declared but not fully defined
    pub handle: Option<TypeHandle>,
}

/// A resolved type reference.
#[derive(Debug, Clone)]
pub enum TypeRef {
    /// A type with a built-in numeric id
    Builtin(BuiltinType),
    /// A registered type, resolved by name and carrying a type-handle slot
    External(ExternalType),
    /// Verbatim type text from the declaration site
    Literal(String),
}

impl TypeRef {
    /// Whether this reference occupies a slot in the type-handle table.
    #[must_use]
    pub fn needs_handle(&self) -> bool {
        matches!(self, TypeRef::External(_))
    }

    /// The spelled name of the type.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            TypeRef::Builtin(builtin) => builtin.to_string(),
            TypeRef::External(external) => external.name.clone(),
            TypeRef::Literal(text) => text.clone(),
        }
    }
}

/// The set of externally registered types.
///
/// Types are keyed by their Rust [`TypeId`]. A registration may be upgraded from declared (no
/// handle) to fully registered, which is the only update the table permits.
#[derive(Default)]
pub struct TypeTable {
    entries: DashMap<TypeId, ExternalType>,
}

impl TypeTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        TypeTable::default()
    }

    /// Register `T` under `name` with a runtime handle.
    pub fn register<T: 'static>(&self, name: impl Into<String>) -> TypeHandle {
        self.insert(TypeInterface::of::<T>(name))
    }

    /// Register a type from an already captured interface; the interface name is the host name.
    pub fn insert(&self, interface: TypeInterface) -> TypeHandle {
        let id = interface.info.id;
        let handle = Arc::new(interface);
        self.entries.insert(
            id,
            ExternalType {
                name: handle.name.clone(),
                handle: Some(handle.clone()),
            },
        );
        handle
    }

    /// Register `interface` unless its type already has an entry.
    ///
    /// Returns `false` if an earlier registration or declaration was kept.
    pub fn link(&self, interface: TypeInterface) -> bool {
        match self.entries.entry(interface.info.id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let handle = Arc::new(interface);
                slot.insert(ExternalType {
                    name: handle.name.clone(),
                    handle: Some(handle),
                });
                true
            }
        }
    }

    /// Declare `T` under `name` without a runtime handle; its slots are emitted as null.
    ///
    /// Declaring a type that is already registered keeps the existing handle.
    pub fn declare<T: 'static>(&self, name: impl Into<String>) {
        self.entries
            .entry(TypeId::of::<T>())
            .or_insert_with(|| ExternalType {
                name: name.into(),
                handle: None,
            });
    }

    /// Look up the registration of a type.
    #[must_use]
    pub fn get(&self, id: TypeId) -> Option<ExternalType> {
        self.entries.get(&id).map(|entry| entry.value().clone())
    }

    /// Number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no type is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a static type and an optional spelled name into a [`TypeRef`].
    ///
    /// A spelled name wins over the static type: it maps to a built-in id when it names one, to
    /// the external registration when it names the registered type, and is otherwise emitted
    /// verbatim. Without a spelling the static type must be built-in or
    /// registered.
    ///
    /// # Errors
    /// Returns [`Error::UnregisteredType`] if the static type is unknown and nothing was spelled.
    pub fn resolve(&self, info: &TypeInfo, spelled: Option<&str>, member: &str) -> Result<TypeRef> {
        if let Some(text) = spelled.map(str::trim).filter(|text| !text.is_empty()) {
            if let Some(builtin) = BuiltinType::from_name(text) {
                return Ok(TypeRef::Builtin(builtin));
            }
            let normalized = normalize_type_name(text);
            return Ok(match self.get(info.id) {
                Some(external) if external.name == normalized => TypeRef::External(external),
                _ => TypeRef::Literal(normalized),
            });
        }

        if let Some(builtin) = info.builtin() {
            return Ok(TypeRef::Builtin(builtin));
        }

        match self.get(info.id) {
            Some(external) => Ok(TypeRef::External(external)),
            None => Err(Error::UnregisteredType {
                type_name: info.name.to_string(),
                member: member.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point;
    struct Pending;

    #[test]
    fn link_keeps_earlier_registration() {
        let table = TypeTable::new();
        table.register::<Point>("Geometry::Point");
        assert!(!table.link(TypeInterface::of::<Point>("Shape::Point")));
        let kept = table.get(TypeId::of::<Point>()).unwrap();
        assert_eq!(kept.name, "Geometry::Point");

        assert!(table.link(TypeInterface::of::<Pending>("Shape::Pending")));
        let linked = table.get(TypeId::of::<Pending>()).unwrap();
        assert_eq!(linked.name, "Shape::Pending");
        assert!(linked.handle.is_some());
    }

    #[test]
    fn resolve_builtin_and_external() {
        let table = TypeTable::new();
        table.register::<Point>("Point");

        let builtin = table.resolve(&TypeInfo::of::<i32>(), None, "m").unwrap();
        assert!(matches!(builtin, TypeRef::Builtin(BuiltinType::Int)));
        assert!(!builtin.needs_handle());

        let external = table.resolve(&TypeInfo::of::<Point>(), None, "m").unwrap();
        match &external {
            TypeRef::External(ext) => {
                assert_eq!(ext.name, "Point");
                assert_eq!(ext.handle.as_ref().unwrap().size, 0);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(external.needs_handle());
    }

    #[test]
    fn resolve_spelled() {
        let table = TypeTable::new();
        let literal = table
            .resolve(&TypeInfo::of::<Point>(), Some("const Point &"), "m")
            .unwrap();
        assert!(matches!(&literal, TypeRef::Literal(text) if text == "Point"));

        let builtin = table
            .resolve(&TypeInfo::of::<Point>(), Some("qint32"), "m")
            .unwrap();
        assert!(matches!(builtin, TypeRef::Builtin(BuiltinType::Int)));

        table.register::<Point>("Point");
        let external = table
            .resolve(&TypeInfo::of::<Point>(), Some("const Point&"), "m")
            .unwrap();
        assert!(external.needs_handle());
    }

    #[test]
    fn resolve_unregistered() {
        let table = TypeTable::new();
        let err = table.resolve(&TypeInfo::of::<Point>(), None, "move").unwrap_err();
        assert!(matches!(err, Error::UnregisteredType { ref member, .. } if member == "move"));
    }

    #[test]
    fn declare_then_register() {
        let table = TypeTable::new();
        table.declare::<Pending>("Pending");
        assert!(table.get(TypeId::of::<Pending>()).unwrap().handle.is_none());

        table.register::<Pending>("Pending");
        assert!(table.get(TypeId::of::<Pending>()).unwrap().handle.is_some());

        table.declare::<Pending>("Other");
        let entry = table.get(TypeId::of::<Pending>()).unwrap();
        assert_eq!(entry.name, "Pending");
        assert!(entry.handle.is_some());
        assert_eq!(table.len(), 1);
    }
}
