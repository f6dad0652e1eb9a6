//! # metaforge Prelude
//!
//! This module re-exports the types most code needs to declare classes, build their descriptors
//! and dispatch through them. Import it to get everything in one line.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all metaforge operations
pub use crate::Error;

/// The result type used throughout metaforge
pub use crate::Result;

// ================================================================================================
// Registry
// ================================================================================================

/// Class storage and member catalogs
pub use crate::registry::{Category, ClassDecl, ClassDef, ClassEntry, ClassId, Registry};

/// Access classification
pub use crate::registry::access::{AccessProber, DeclaredSection, Vantage};

/// Counting through the lookup query
pub use crate::registry::probe::{probe_count, MemberCatalog};

// ================================================================================================
// Member Descriptors
// ================================================================================================

/// Methods, signals and slots
pub use crate::model::{Access, MethodDescriptor, MethodFlags, MethodKind};

/// Properties
pub use crate::model::{NotifyRef, PropertyDescriptor, PropertyFlags};

/// Constructors, enums and class-level annotations
pub use crate::model::{
    ClassInfoEntry, ConstructorDescriptor, Descriptor, EnumDescriptor, EnumFlags,
    InterfaceDescriptor, Member,
};

// ================================================================================================
// Descriptor Generation
// ================================================================================================

/// Two-pass builder and its configuration
pub use crate::builder::{LayoutConfig, MetaObjectBuilder, MetaObjectFlags};

/// Passes and their sinks
pub use crate::builder::{EmitSink, LayoutSink, LayoutTotals, MeasureSink};

/// Generated descriptor
pub use crate::builder::{MetaObjectData, NotifyTarget, StringPool};

// ================================================================================================
// Dispatch and Types
// ================================================================================================

/// Runtime glue over a built descriptor
pub use crate::dispatch::MetaObject;

/// Type references
pub use crate::typesystem::{BuiltinType, TypeHandle, TypeInfo, TypeInterface, TypeRef};
