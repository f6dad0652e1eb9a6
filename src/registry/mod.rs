//! Per-class member registry.
//!
//! The registry is the single store every other component reads from. Each registered class owns
//! one append-only catalog per [`Category`]; registering a member appends it and returns its
//! index, which stays valid for the lifetime of the registry. The catalogs are `boxcar::Vec`s, so
//! registration only needs `&self` and may run from several threads, while class names are
//! indexed in a `DashMap`.
//!
//! # Key Components
//!
//! - [`Registry`] - Class storage, member catalogs and external type registrations
//! - [`ClassDef`] - Class-level declaration: name, base class, finality, flags
//! - [`ClassDecl`] - Declaration cursor tracking the current access section
//! - [`ClassEntry`] - A registered class with its catalogs
//! - [`Category`] - Member categories
//! - [`probe`] - Counting a catalog through its lookup query
//! - [`access`] - Access-level classification
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
//! decl.signal(MethodDescriptor::new("valueChanged", |_: &mut Counter| {}))?;
//! decl.slot(MethodDescriptor::new("increment", |c: &mut Counter| c.value += 1))?;
//!
//! let class = decl.id();
//! assert_eq!(registry.count(class, Category::Signal), 1);
//! assert_eq!(registry.lookup(class, Category::Slot, 0).unwrap().name(), "increment");
//! # Ok::<(), metaforge::Error>(())
//! ```

pub mod access;
pub mod probe;

use std::fmt;

use dashmap::{mapref::entry::Entry, DashMap};
use strum::{Display, EnumCount, EnumIter};
use tracing::debug;

use crate::{
    builder::MetaObjectFlags,
    model::{
        Access, ClassInfoEntry, ConstructorDescriptor, Descriptor, EnumDescriptor,
        InterfaceDescriptor, Member, MethodDescriptor, MethodKind, PropertyDescriptor,
    },
    registry::probe::MemberCatalog,
    typesystem::{TypeHandle, TypeInfo, TypeRef, TypeTable},
    Error, Result,
};

/// Maximum depth of a base-class chain.
pub const MAX_BASE_DEPTH: usize = 64;

/// Member categories of a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumCount)]
pub enum Category {
    /// Signals
    Signal,
    /// Slots
    Slot,
    /// Plain invokable methods
    Method,
    /// Constructors
    Constructor,
    /// Properties
    Property,
    /// Enums and flag sets
    Enum,
    /// Class info annotations
    ClassInfo,
    /// Implemented interfaces
    Interface,
}

/// Handle of a registered class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(usize);

impl ClassId {
    /// Position of the class in registration order.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Class-level declaration.
#[derive(Debug, Clone)]
pub struct ClassDef {
    name: String,
    rust_type: Option<TypeInfo>,
    base: Option<String>,
    final_class: bool,
    flags: MetaObjectFlags,
}

impl ClassDef {
    /// Declare the Rust type `T` as class `name`.
    #[must_use]
    pub fn new<T: 'static>(name: impl Into<String>) -> Self {
        ClassDef {
            name: name.into(),
            rust_type: Some(TypeInfo::of::<T>()),
            base: None,
            final_class: false,
            flags: MetaObjectFlags::default(),
        }
    }

    /// Declare a class that has no Rust type of its own.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        ClassDef {
            name: name.into(),
            rust_type: None,
            base: None,
            final_class: false,
            flags: MetaObjectFlags::default(),
        }
    }

    /// Name the base class. It need not be registered.
    #[must_use]
    pub fn base(mut self, name: impl Into<String>) -> Self {
        self.base = Some(name.into());
        self
    }

    /// The class cannot be derived from.
    #[must_use]
    pub fn final_class(mut self) -> Self {
        self.final_class = true;
        self
    }

    /// Replace the meta-object flags.
    #[must_use]
    pub fn flags(mut self, flags: MetaObjectFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Class name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rust type of the class, if any.
    #[must_use]
    pub fn rust_type(&self) -> Option<&TypeInfo> {
        self.rust_type.as_ref()
    }

    /// Base-class name, if any.
    #[must_use]
    pub fn base_name(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// Whether the class is final.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.final_class
    }

    /// Meta-object flags.
    #[must_use]
    pub fn meta_flags(&self) -> MetaObjectFlags {
        self.flags
    }
}

/// A registered class and its member catalogs.
pub struct ClassEntry {
    def: ClassDef,
    signals: boxcar::Vec<MethodDescriptor>,
    slots: boxcar::Vec<MethodDescriptor>,
    methods: boxcar::Vec<MethodDescriptor>,
    constructors: boxcar::Vec<ConstructorDescriptor>,
    properties: boxcar::Vec<PropertyDescriptor>,
    enums: boxcar::Vec<EnumDescriptor>,
    class_info: boxcar::Vec<ClassInfoEntry>,
    interfaces: boxcar::Vec<InterfaceDescriptor>,
}

impl ClassEntry {
    fn new(def: ClassDef) -> Self {
        ClassEntry {
            def,
            signals: boxcar::Vec::new(),
            slots: boxcar::Vec::new(),
            methods: boxcar::Vec::new(),
            constructors: boxcar::Vec::new(),
            properties: boxcar::Vec::new(),
            enums: boxcar::Vec::new(),
            class_info: boxcar::Vec::new(),
            interfaces: boxcar::Vec::new(),
        }
    }

    /// Class declaration.
    #[must_use]
    pub fn def(&self) -> &ClassDef {
        &self.def
    }

    /// Class name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Number of members in `category`.
    #[must_use]
    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::Signal => self.signals.count(),
            Category::Slot => self.slots.count(),
            Category::Method => self.methods.count(),
            Category::Constructor => self.constructors.count(),
            Category::Property => self.properties.count(),
            Category::Enum => self.enums.count(),
            Category::ClassInfo => self.class_info.count(),
            Category::Interface => self.interfaces.count(),
        }
    }

    /// Member at `index` in `category`.
    #[must_use]
    pub fn get(&self, category: Category, index: usize) -> Option<Member<'_>> {
        match category {
            Category::Signal => self.signals.get(index).map(Member::Method),
            Category::Slot => self.slots.get(index).map(Member::Method),
            Category::Method => self.methods.get(index).map(Member::Method),
            Category::Constructor => self.constructors.get(index).map(Member::Constructor),
            Category::Property => self.properties.get(index).map(Member::Property),
            Category::Enum => self.enums.get(index).map(Member::Enum),
            Category::ClassInfo => self.class_info.get(index).map(Member::ClassInfo),
            Category::Interface => self.interfaces.get(index).map(Member::Interface),
        }
    }

    /// Signals in declaration order.
    pub fn signals(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.signals.iter().map(|(_, method)| method)
    }

    /// Slots in declaration order.
    pub fn slots(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.slots.iter().map(|(_, method)| method)
    }

    /// Plain methods in declaration order.
    pub fn methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods.iter().map(|(_, method)| method)
    }

    /// Signals, then slots, then plain methods: the order of the method table.
    pub fn all_methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.signals().chain(self.slots()).chain(self.methods())
    }

    /// Method at `index` of the method table.
    #[must_use]
    pub fn method_at(&self, index: usize) -> Option<&MethodDescriptor> {
        self.all_methods().nth(index)
    }

    /// Number of entries in the method table.
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.signals.count() + self.slots.count() + self.methods.count()
    }

    /// Constructors in declaration order.
    pub fn constructors(&self) -> impl Iterator<Item = &ConstructorDescriptor> {
        self.constructors.iter().map(|(_, constructor)| constructor)
    }

    /// Properties in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.iter().map(|(_, property)| property)
    }

    /// Property at `index`.
    #[must_use]
    pub fn property(&self, index: usize) -> Option<&PropertyDescriptor> {
        self.properties.get(index)
    }

    /// Enums in declaration order.
    pub fn enums(&self) -> impl Iterator<Item = &EnumDescriptor> {
        self.enums.iter().map(|(_, descriptor)| descriptor)
    }

    /// Class info in declaration order.
    pub fn class_info(&self) -> impl Iterator<Item = &ClassInfoEntry> {
        self.class_info.iter().map(|(_, entry)| entry)
    }

    /// Implemented interfaces in declaration order.
    pub fn interfaces(&self) -> impl Iterator<Item = &InterfaceDescriptor> {
        self.interfaces.iter().map(|(_, interface)| interface)
    }

    /// Local index of the signal named `name`.
    #[must_use]
    pub fn signal_index(&self, name: &str) -> Option<usize> {
        self.signals().position(|signal| signal.name() == name)
    }

    /// Whether `ty` is the Rust type of one of the class's linked enums.
    #[must_use]
    pub fn is_enum_type(&self, ty: &TypeInfo) -> bool {
        self.enums()
            .any(|descriptor| descriptor.rust_type() == Some(ty))
    }
}

impl fmt::Debug for ClassEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassEntry")
            .field("def", &self.def)
            .field("signals", &self.signals.count())
            .field("slots", &self.slots.count())
            .field("methods", &self.methods.count())
            .field("constructors", &self.constructors.count())
            .field("properties", &self.properties.count())
            .field("enums", &self.enums.count())
            .finish_non_exhaustive()
    }
}

/// Registered ancestors of a class, nearest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lineage {
    /// Registered ancestors in base-to-base order
    pub registered: Vec<ClassId>,
    /// Name of the first ancestor that is not registered, where the walk stopped
    pub unresolved: Option<String>,
}

/// The member registry.
#[derive(Default)]
pub struct Registry {
    classes: boxcar::Vec<ClassEntry>,
    names: DashMap<String, ClassId>,
    types: TypeTable,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Registry::default()
    }

    /// Register a class.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateClass`] if a class of that name exists.
    pub fn add_class(&self, def: ClassDef) -> Result<ClassId> {
        match self.names.entry(def.name.clone()) {
            Entry::Occupied(_) => Err(Error::DuplicateClass(def.name)),
            Entry::Vacant(slot) => {
                debug!(class = %def.name, base = ?def.base, "registering class");
                let id = ClassId(self.classes.push(ClassEntry::new(def)));
                slot.insert(id);
                Ok(id)
            }
        }
    }

    /// Register a class and open a declaration cursor on it.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateClass`] if a class of that name exists.
    pub fn declare(&self, def: ClassDef) -> Result<ClassDecl<'_>> {
        let class = self.add_class(def)?;
        Ok(ClassDecl {
            registry: self,
            class,
            section: Access::Private,
        })
    }

    /// Open a declaration cursor on an already registered class.
    ///
    /// # Errors
    /// Returns [`Error::ClassNotFound`] if `class` is unknown.
    pub fn reopen(&self, class: ClassId) -> Result<ClassDecl<'_>> {
        self.class(class)?;
        Ok(ClassDecl {
            registry: self,
            class,
            section: Access::Private,
        })
    }

    /// Append a member to its catalog and return its index there.
    ///
    /// Method descriptors go to the signal, slot or method catalog according to their kind.
    ///
    /// # Errors
    /// - [`Error::ClassNotFound`] if `class` is unknown
    /// - [`Error::MalformedProperty`] for a property without getter, setter or member
    /// - [`Error::Malformed`] for an enum whose names and values differ in length, or a method
    ///   descriptor of constructor kind
    pub fn register(&self, class: ClassId, descriptor: impl Into<Descriptor>) -> Result<usize> {
        let entry = self.class(class)?;
        let descriptor = descriptor.into();

        let (category, index) = match descriptor {
            Descriptor::Method(method) => match method.kind() {
                MethodKind::Signal => (Category::Signal, entry.signals.push(method)),
                MethodKind::Slot => (Category::Slot, entry.slots.push(method)),
                MethodKind::Method => (Category::Method, entry.methods.push(method)),
                MethodKind::Constructor => {
                    return Err(malformed_error!(
                        "Method `{}` of `{}` uses the constructor kind; register a ConstructorDescriptor",
                        method.name(),
                        entry.name()
                    ))
                }
            },
            Descriptor::Constructor(constructor) => {
                (Category::Constructor, entry.constructors.push(constructor))
            }
            Descriptor::Property(property) => {
                if !property.is_accessible() {
                    return Err(Error::MalformedProperty(property.name().to_string()));
                }
                (Category::Property, entry.properties.push(property))
            }
            Descriptor::Enum(descriptor) => {
                descriptor.validate()?;
                let qualified = format!("{}::{}", entry.name(), descriptor.name());
                if let Some(interface) = descriptor.linked_interface(&qualified) {
                    if !self.types.link(interface) {
                        debug!(enumeration = %qualified, "linked enum type already registered");
                    }
                }
                (Category::Enum, entry.enums.push(descriptor))
            }
            Descriptor::ClassInfo(info) => (Category::ClassInfo, entry.class_info.push(info)),
            Descriptor::Interface(interface) => {
                (Category::Interface, entry.interfaces.push(interface))
            }
        };

        debug!(
            class = %entry.name(),
            %category,
            index,
            member = ?entry.get(category, index).map(|member| member.name().to_string()),
            "registered member"
        );
        Ok(index)
    }

    /// The member at `index` in `category` of `class`.
    #[must_use]
    pub fn lookup(&self, class: ClassId, category: Category, index: usize) -> Option<Member<'_>> {
        self.classes.get(class.0)?.get(category, index)
    }

    /// Number of members in `category` of `class`; zero for an unknown class.
    #[must_use]
    pub fn count(&self, class: ClassId, category: Category) -> usize {
        self.classes
            .get(class.0)
            .map_or(0, |entry| entry.count(category))
    }

    /// A registered class.
    ///
    /// # Errors
    /// Returns [`Error::ClassNotFound`] if `class` is unknown.
    pub fn class(&self, class: ClassId) -> Result<&ClassEntry> {
        self.classes
            .get(class.0)
            .ok_or_else(|| Error::ClassNotFound(class.to_string()))
    }

    /// Id of the class registered under `name`.
    #[must_use]
    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.names.get(name).map(|id| *id.value())
    }

    /// Number of registered classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.count()
    }

    /// Returns `true` if no class is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.count() == 0
    }

    /// Registered ancestors of `class`, walking base names until one is not registered.
    ///
    /// # Errors
    /// - [`Error::ClassNotFound`] if `class` is unknown
    /// - [`Error::RecursionLimit`] if the chain is longer than [`MAX_BASE_DEPTH`], which is what
    ///   a cyclic declaration produces
    pub fn lineage(&self, class: ClassId) -> Result<Lineage> {
        let mut lineage = Lineage::default();
        let mut base = self.class(class)?.def.base.clone();

        while let Some(name) = base {
            if lineage.registered.len() >= MAX_BASE_DEPTH {
                return Err(Error::RecursionLimit(MAX_BASE_DEPTH));
            }

            match self.class_by_name(&name) {
                Some(id) => {
                    lineage.registered.push(id);
                    base = self.class(id)?.def.base.clone();
                }
                None => {
                    lineage.unresolved = Some(name);
                    break;
                }
            }
        }

        Ok(lineage)
    }

    /// Number of `category` members declared by the registered ancestors of `class`.
    ///
    /// Unregistered ancestors contribute nothing.
    ///
    /// # Errors
    /// See [`Registry::lineage`].
    pub fn inherited_count(&self, class: ClassId, category: Category) -> Result<usize> {
        Ok(self
            .lineage(class)?
            .registered
            .into_iter()
            .map(|ancestor| self.count(ancestor, category))
            .sum())
    }

    /// Number of method-table entries (signals, slots and methods) declared by the registered
    /// ancestors of `class`.
    ///
    /// # Errors
    /// See [`Registry::lineage`].
    pub fn inherited_method_count(&self, class: ClassId) -> Result<usize> {
        Ok(self
            .lineage(class)?
            .registered
            .into_iter()
            .map(|ancestor| self.class(ancestor).map_or(0, ClassEntry::method_count))
            .sum())
    }

    /// Whether `ty` is the Rust type of an enum linked in `class` or one of its registered
    /// ancestors.
    ///
    /// # Errors
    /// See [`Registry::lineage`].
    pub fn is_enum_type(&self, class: ClassId, ty: &TypeInfo) -> Result<bool> {
        if self.class(class)?.is_enum_type(ty) {
            return Ok(true);
        }
        Ok(self
            .lineage(class)?
            .registered
            .into_iter()
            .any(|ancestor| self.class(ancestor).is_ok_and(|entry| entry.is_enum_type(ty))))
    }

    /// Register `T` as an external type with a runtime handle.
    pub fn register_type<T: 'static>(&self, name: impl Into<String>) -> TypeHandle {
        self.types.register::<T>(name)
    }

    /// Declare `T` as an external type whose handle is not available yet.
    pub fn declare_type<T: 'static>(&self, name: impl Into<String>) {
        self.types.declare::<T>(name);
    }

    /// External type registrations.
    #[must_use]
    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    /// Resolve a static type plus optional spelling. See [`TypeTable::resolve`].
    ///
    /// # Errors
    /// Returns [`Error::UnregisteredType`] if nothing identifies the type.
    pub fn resolve_type(
        &self,
        info: &TypeInfo,
        spelled: Option<&str>,
        member: &str,
    ) -> Result<TypeRef> {
        self.types.resolve(info, spelled, member)
    }
}

impl MemberCatalog for Registry {
    fn lookup(&self, class: ClassId, category: Category, index: usize) -> Option<Member<'_>> {
        Registry::lookup(self, class, category, index)
    }

    fn count(&self, class: ClassId, category: Category) -> usize {
        Registry::count(self, class, category)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("classes", &self.classes.count())
            .field("types", &self.types.len())
            .finish()
    }
}

/// Declaration cursor on one class.
///
/// Mirrors a class body: members are registered in the order the calls are made, and every method
/// records the access section that is current at the time. A fresh cursor starts in the private
/// section.
#[derive(Debug)]
pub struct ClassDecl<'r> {
    registry: &'r Registry,
    class: ClassId,
    section: Access,
}

impl<'r> ClassDecl<'r> {
    /// Id of the class being declared.
    #[must_use]
    pub fn id(&self) -> ClassId {
        self.class
    }

    /// The registry the cursor writes to.
    #[must_use]
    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Access section currently open.
    #[must_use]
    pub fn current_section(&self) -> Access {
        self.section
    }

    /// Open a public section.
    pub fn public(&mut self) -> &mut Self {
        self.section = Access::Public;
        self
    }

    /// Open a protected section.
    pub fn protected(&mut self) -> &mut Self {
        self.section = Access::Protected;
        self
    }

    /// Open a private section.
    pub fn private(&mut self) -> &mut Self {
        self.section = Access::Private;
        self
    }

    fn method_of_kind(&self, method: MethodDescriptor, kind: MethodKind) -> Result<usize> {
        let method = method.with_kind(kind).section(self.section);
        self.registry.register(self.class, method)
    }

    /// Declare a signal.
    ///
    /// # Errors
    /// See [`Registry::register`].
    pub fn signal(&self, method: MethodDescriptor) -> Result<usize> {
        self.method_of_kind(method, MethodKind::Signal)
    }

    /// Declare a slot.
    ///
    /// # Errors
    /// See [`Registry::register`].
    pub fn slot(&self, method: MethodDescriptor) -> Result<usize> {
        self.method_of_kind(method, MethodKind::Slot)
    }

    /// Declare a plain invokable method.
    ///
    /// # Errors
    /// See [`Registry::register`].
    pub fn method(&self, method: MethodDescriptor) -> Result<usize> {
        self.method_of_kind(method, MethodKind::Method)
    }

    /// Declare a constructor.
    ///
    /// # Errors
    /// See [`Registry::register`].
    pub fn constructor(&self, constructor: ConstructorDescriptor) -> Result<usize> {
        self.registry.register(self.class, constructor)
    }

    /// Declare a property.
    ///
    /// # Errors
    /// See [`Registry::register`].
    pub fn property(&self, property: PropertyDescriptor) -> Result<usize> {
        self.registry.register(self.class, property)
    }

    /// Declare an enum.
    ///
    /// # Errors
    /// See [`Registry::register`].
    pub fn enumeration(&self, descriptor: EnumDescriptor) -> Result<usize> {
        self.registry.register(self.class, descriptor)
    }

    /// Attach a class info annotation.
    ///
    /// # Errors
    /// See [`Registry::register`].
    pub fn class_info(&self, key: impl Into<String>, value: impl Into<String>) -> Result<usize> {
        self.registry
            .register(self.class, ClassInfoEntry::new(key, value))
    }

    /// Declare an implemented interface.
    ///
    /// # Errors
    /// See [`Registry::register`].
    pub fn interface(&self, interface: InterfaceDescriptor) -> Result<usize> {
        self.registry.register(self.class, interface)
    }
}
