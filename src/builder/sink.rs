//! Sinks driven by the layout traversal.
//!
//! The traversal in [`crate::builder::traverse`] describes the descriptor as a sequence of three
//! primitive operations: append an integer, append a string, append a type-handle slot. A
//! [`LayoutSink`] decides what those operations do. [`MeasureSink`] only counts them;
//! [`EmitSink`] writes them into buffers sized from the count.

use tracing::trace;

use crate::{
    builder::{config::LayoutConfig, output::MetaObjectData, output::StringPool},
    typesystem::TypeHandle,
    Result,
};

/// Receiver of the traversal's primitive operations.
pub trait LayoutSink {
    /// Append an integer to the integer array.
    ///
    /// # Errors
    /// Returns [`crate::Error::LayoutMismatch`] if the sink has no room left.
    fn int(&mut self, value: u32) -> Result<()>;

    /// Append a string to the pool and return its index.
    ///
    /// # Errors
    /// Returns [`crate::Error::LayoutMismatch`] if the sink has no room left.
    fn string(&mut self, text: &str) -> Result<u32>;

    /// Append a slot to the type-handle table and return its index.
    ///
    /// # Errors
    /// Returns [`crate::Error::LayoutMismatch`] if the sink has no room left.
    fn handle(&mut self, handle: Option<&TypeHandle>) -> Result<u32>;

    /// Number of integers appended so far.
    fn position(&self) -> usize;
}

/// Buffer sizes of a descriptor, as produced by the measuring pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LayoutTotals {
    /// Bytes of string data including one terminating NUL per string
    pub string_bytes: usize,
    /// Number of strings
    pub string_count: usize,
    /// Number of integers
    pub int_count: usize,
    /// Number of type-handle slots
    pub type_handle_count: usize,
}

fn index(count: usize) -> Result<u32> {
    u32::try_from(count).map_err(|_| layout_error!("index {} exceeds the 32-bit range", count))
}

/// Counting sink.
#[derive(Debug, Default)]
pub struct MeasureSink {
    totals: LayoutTotals,
}

impl MeasureSink {
    /// Create a sink with all counts at zero.
    #[must_use]
    pub fn new() -> Self {
        MeasureSink::default()
    }

    /// The counts gathered so far.
    #[must_use]
    pub fn totals(&self) -> LayoutTotals {
        self.totals
    }
}

impl LayoutSink for MeasureSink {
    fn int(&mut self, _value: u32) -> Result<()> {
        self.totals.int_count += 1;
        Ok(())
    }

    fn string(&mut self, text: &str) -> Result<u32> {
        let index = index(self.totals.string_count)?;
        self.totals.string_count += 1;
        self.totals.string_bytes += text.len() + 1;
        Ok(index)
    }

    fn handle(&mut self, _handle: Option<&TypeHandle>) -> Result<u32> {
        let index = index(self.totals.type_handle_count)?;
        self.totals.type_handle_count += 1;
        Ok(index)
    }

    fn position(&self) -> usize {
        self.totals.int_count
    }
}

/// Writing sink over buffers of fixed size.
///
/// Appending past the measured size of any buffer fails, and [`EmitSink::finish`] fails unless
/// every buffer was filled exactly.
#[derive(Debug)]
pub struct EmitSink {
    limits: LayoutTotals,
    ints: Vec<u32>,
    bytes: Vec<u8>,
    table: Vec<(u32, u32)>,
    handles: Vec<Option<TypeHandle>>,
}

impl EmitSink {
    /// Allocate buffers of exactly the measured sizes.
    #[must_use]
    pub fn new(limits: LayoutTotals) -> Self {
        EmitSink {
            limits,
            ints: Vec::with_capacity(limits.int_count),
            bytes: Vec::with_capacity(limits.string_bytes),
            table: Vec::with_capacity(limits.string_count),
            handles: Vec::with_capacity(limits.type_handle_count),
        }
    }

    /// Hand over the filled buffers.
    ///
    /// # Errors
    /// Returns [`crate::Error::LayoutMismatch`] if any buffer holds fewer entries than measured.
    pub fn finish(self, config: LayoutConfig) -> Result<MetaObjectData> {
        let filled = LayoutTotals {
            string_bytes: self.bytes.len(),
            string_count: self.table.len(),
            int_count: self.ints.len(),
            type_handle_count: self.handles.len(),
        };
        if filled != self.limits {
            return Err(layout_error!(
                "emitted {:?} but measured {:?}",
                filled,
                self.limits
            ));
        }

        trace!(?filled, "descriptor buffers filled");
        Ok(MetaObjectData::new(
            config,
            self.ints,
            StringPool::new(self.bytes, self.table),
            self.handles,
        ))
    }
}

impl LayoutSink for EmitSink {
    fn int(&mut self, value: u32) -> Result<()> {
        if self.ints.len() >= self.limits.int_count {
            return Err(layout_error!(
                "integer {} overflows the measured {} integers",
                value,
                self.limits.int_count
            ));
        }
        self.ints.push(value);
        Ok(())
    }

    fn string(&mut self, text: &str) -> Result<u32> {
        if self.table.len() >= self.limits.string_count
            || self.bytes.len() + text.len() + 1 > self.limits.string_bytes
        {
            return Err(layout_error!(
                "string `{}` overflows the measured string pool",
                text
            ));
        }
        let index = index(self.table.len())?;
        let offset = index_of_byte(self.bytes.len())?;
        self.table.push((offset, index_of_byte(text.len())?));
        self.bytes.extend_from_slice(text.as_bytes());
        self.bytes.push(0);
        Ok(index)
    }

    fn handle(&mut self, handle: Option<&TypeHandle>) -> Result<u32> {
        if self.handles.len() >= self.limits.type_handle_count {
            return Err(layout_error!(
                "type handle overflows the measured {} slots",
                self.limits.type_handle_count
            ));
        }
        let index = index(self.handles.len())?;
        self.handles.push(handle.cloned());
        Ok(index)
    }

    fn position(&self) -> usize {
        self.ints.len()
    }
}

fn index_of_byte(offset: usize) -> Result<u32> {
    u32::try_from(offset)
        .map_err(|_| layout_error!("string pool offset {} exceeds the 32-bit range", offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_counts() {
        let mut sink = MeasureSink::new();
        sink.int(1).unwrap();
        assert_eq!(sink.string("abc").unwrap(), 0);
        assert_eq!(sink.string("").unwrap(), 1);
        assert_eq!(sink.handle(None).unwrap(), 0);
        assert_eq!(
            sink.totals(),
            LayoutTotals {
                string_bytes: 5,
                string_count: 2,
                int_count: 1,
                type_handle_count: 1,
            }
        );
        assert_eq!(sink.position(), 1);
    }

    #[test]
    fn emit_overflow() {
        let mut sink = EmitSink::new(LayoutTotals {
            int_count: 1,
            ..LayoutTotals::default()
        });
        sink.int(7).unwrap();
        assert!(sink.int(8).is_err());
        assert!(sink.string("x").is_err());
        assert!(sink.handle(None).is_err());
    }

    #[test]
    fn emit_unfilled() {
        let sink = EmitSink::new(LayoutTotals {
            int_count: 2,
            ..LayoutTotals::default()
        });
        assert!(sink.finish(LayoutConfig::default()).is_err());
    }

    #[test]
    fn emit_strings() {
        let mut sink = EmitSink::new(LayoutTotals {
            string_bytes: 7,
            string_count: 2,
            int_count: 0,
            type_handle_count: 0,
        });
        assert_eq!(sink.string("ab").unwrap(), 0);
        assert_eq!(sink.string("cde").unwrap(), 1);
        let data = sink.finish(LayoutConfig::default()).unwrap();
        assert_eq!(data.strings().bytes(), b"ab\0cde\0");
        assert_eq!(data.string(1), Some("cde"));
    }
}
