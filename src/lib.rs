// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

//! # metaforge
//!
//! Reflection descriptors for Rust types, laid out the way a signal/slot runtime expects them.
//!
//! A class is declared once, member by member, into a [`Registry`]: signals, slots, invokable
//! methods, constructors, properties, enums, class info and interfaces. From those catalogs the
//! [`MetaObjectBuilder`] produces a packed descriptor: a table of 32-bit integers, a string pool
//! and a table of type handles. Generation runs in two passes over one traversal, the first one
//! measuring the buffers and the second one filling them, so both are sized exactly.
//!
//! ## Features
//!
//! - **Member registry** - Append-only catalogs with stable indices, usable from several threads
//! - **Access classification** - Explicit levels or the section a member was declared in
//! - **Notify resolution** - Local signal indices or by-name references across classes
//! - **Configurable layout** - Record shapes of several descriptor revisions
//! - **Dispatch glue** - Invoke methods, read and write properties, emit signals, construct
//! - **Companion JSON** - A readable class description for external tooling
//!
//! ## Quick Start
//!
//! ```rust
//! use metaforge::prelude::*;
//!
//! #[derive(Default)]
//! struct Counter { value: i32 }
//!
//! let registry = Registry::new();
//! let mut decl = registry.declare(ClassDef::new::<Counter>("Counter").base("QObject"))?;
//! decl.public();
//! decl.property(
//!     PropertyDescriptor::new::<i32>("value")
//!         .getter("getValue", |c: &Counter| c.value)
//!         .setter("setValue", |c: &mut Counter, v: i32| c.value = v)
//!         .notify("valueChanged"),
//! )?;
//! decl.signal(MethodDescriptor::new("valueChanged", |_: &mut Counter| {}))?;
//! decl.slot(MethodDescriptor::new("increment", |c: &mut Counter| c.value += 1))?;
//!
//! let meta = registry.meta_object(decl.id())?;
//! assert_eq!(meta.data().method_count(), 2);
//! assert_eq!(meta.data().property_notify(0), Some(NotifyTarget::Index(0)));
//!
//! let mut counter = Counter::default();
//! meta.invoke(&mut counter, 1, &mut [&mut ()])?;
//! assert_eq!(counter.value, 1);
//! # Ok::<(), metaforge::Error>(())
//! ```
//!
//! ## Modules
//!
//! - [`registry`] - Classes and their member catalogs
//! - [`model`] - Member descriptors and type-erased accessors
//! - [`typesystem`] - Built-in ids and external type registrations
//! - [`builder`] - The two-pass descriptor generator
//! - [`dispatch`] - Runtime calls through a built descriptor
//! - [`companion`] - JSON class description
//! - [`utils`] - Declaration-text helpers

#[macro_use]
pub(crate) mod error;

pub mod builder;
pub mod companion;
pub mod dispatch;
pub mod model;
pub mod prelude;
pub mod registry;
pub mod typesystem;
pub mod utils;

pub use builder::{LayoutConfig, MetaObjectBuilder, MetaObjectData};
pub use dispatch::MetaObject;
pub use error::Error;
pub use registry::{ClassDef, ClassId, Registry};

/// The result type used throughout metaforge.
pub type Result<T> = std::result::Result<T, Error>;
