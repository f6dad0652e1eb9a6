//! Two-pass generation of the meta-object data.
//!
//! A class descriptor is built in two passes over one traversal: the measuring pass counts the
//! integers, strings and type-handle slots the descriptor needs, the emitting pass writes them
//! into buffers of exactly that size. Before either pass runs, the class is resolved once: member
//! types are mapped to built-in ids or external references, methods without an explicit access
//! level are classified, and notify references are matched to signals.
//!
//! # Key Components
//!
//! - [`MetaObjectBuilder`] - Entry point: measure, emit or build a class
//! - [`LayoutConfig`] - Record shapes of the generated descriptor
//! - [`LayoutSink`] / [`MeasureSink`] / [`EmitSink`] - What the traversal feeds
//! - [`MetaObjectData`] - The generated descriptor
//! - [`NotifyTarget`] - Resolved notify reference
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
//! decl.property(
//!     PropertyDescriptor::new::<i32>("value")
//!         .getter("value", |c: &Counter| c.value)
//!         .notify("valueChanged"),
//! )?;
//!
//! let builder = MetaObjectBuilder::new(&registry);
//! let totals = builder.measure(decl.id())?;
//! let data = builder.emit(decl.id(), totals)?;
//!
//! assert_eq!(data.ints().len(), totals.int_count);
//! assert_eq!(data.property_notify(0), Some(NotifyTarget::Index(0)));
//! # Ok::<(), metaforge::Error>(())
//! ```

pub mod config;
pub mod notify;
pub mod output;
mod resolve;
pub mod sink;
mod traverse;

pub use config::{LayoutConfig, MetaObjectFlags};
pub use notify::{resolve_notify, NotifyTarget, IS_UNRESOLVED_SIGNAL};
pub use output::{MetaObjectData, StringPool, EMPTY_STRING, HEADER_SIZE};
pub use sink::{EmitSink, LayoutSink, LayoutTotals, MeasureSink};

use tracing::debug;

use crate::{
    builder::{resolve::ClassLayout, traverse::traverse},
    registry::{ClassId, Registry},
    Result,
};

/// Builds meta-object data for classes of one registry.
#[derive(Debug, Clone, Copy)]
pub struct MetaObjectBuilder<'r> {
    registry: &'r Registry,
    config: LayoutConfig,
}

impl<'r> MetaObjectBuilder<'r> {
    /// Builder using the default layout.
    #[must_use]
    pub fn new(registry: &'r Registry) -> Self {
        MetaObjectBuilder {
            registry,
            config: LayoutConfig::default(),
        }
    }

    /// Builder using a custom layout.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidConfig`] if the layout is not supported.
    pub fn with_config(registry: &'r Registry, config: LayoutConfig) -> Result<Self> {
        config.validate()?;
        Ok(MetaObjectBuilder { registry, config })
    }

    /// Layout in use.
    #[must_use]
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Resolve `class` and walk its descriptor into `sink`.
    ///
    /// Both passes go through here; any other sink sees exactly the same sequence of operations.
    ///
    /// # Errors
    /// Returns resolution errors for the class, or whatever the sink reports.
    pub fn drive<S: LayoutSink>(&self, class: ClassId, sink: &mut S) -> Result<()> {
        let layout = ClassLayout::resolve(self.registry, class)?;
        traverse(&layout, &self.config, sink)
    }

    /// Measuring pass: the buffer sizes of the descriptor of `class`.
    ///
    /// # Errors
    /// Returns resolution errors for the class.
    pub fn measure(&self, class: ClassId) -> Result<LayoutTotals> {
        let mut sink = MeasureSink::new();
        self.drive(class, &mut sink)?;
        let totals = sink.totals();
        debug!(%class, ?totals, "measured descriptor");
        Ok(totals)
    }

    /// Emitting pass: write the descriptor of `class` into buffers of the measured sizes.
    ///
    /// # Errors
    /// Returns resolution errors for the class, or [`crate::Error::LayoutMismatch`] if `totals`
    /// does not match what the class needs.
    pub fn emit(&self, class: ClassId, totals: LayoutTotals) -> Result<MetaObjectData> {
        let mut sink = EmitSink::new(totals);
        self.drive(class, &mut sink)?;
        let data = sink.finish(self.config)?;
        debug!(%class, ints = data.ints().len(), strings = data.strings().len(), "emitted descriptor");
        Ok(data)
    }

    /// Measure, then emit.
    ///
    /// # Errors
    /// See [`MetaObjectBuilder::measure`] and [`MetaObjectBuilder::emit`].
    pub fn build(&self, class: ClassId) -> Result<MetaObjectData> {
        let totals = self.measure(class)?;
        self.emit(class, totals)
    }
}
