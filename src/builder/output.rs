//! The generated meta-object data and read-back accessors.
//!
//! [`MetaObjectData`] is what the emitting pass produces: the packed integer array, the string
//! pool and the type-handle table. The accessors decode the header and records again; they are
//! used by the dispatch glue and make the layout inspectable in tests.

use strum::IntoEnumIterator;

use crate::{
    builder::{
        config::{LayoutConfig, MetaObjectFlags},
        notify::{NotifyTarget, IS_UNRESOLVED_SIGNAL},
    },
    model::PropertyFlags,
    typesystem::{BuiltinType, TypeHandle, IS_UNRESOLVED_TYPE},
};

/// Number of integers in the descriptor header.
pub const HEADER_SIZE: usize = 14;

/// Header slots.
pub(crate) mod header {
    pub const REVISION: usize = 0;
    pub const CLASS_NAME: usize = 1;
    pub const CLASS_INFO: usize = 2;
    pub const METHODS: usize = 4;
    pub const PROPERTIES: usize = 6;
    pub const ENUMS: usize = 8;
    pub const CONSTRUCTORS: usize = 10;
    pub const FLAGS: usize = 12;
    pub const SIGNAL_COUNT: usize = 13;
}

/// String index of the shared empty placeholder.
pub const EMPTY_STRING: u32 = 1;

/// NUL-terminated string data plus an `(offset, length)` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringPool {
    bytes: Vec<u8>,
    table: Vec<(u32, u32)>,
}

impl StringPool {
    pub(crate) fn new(bytes: Vec<u8>, table: Vec<(u32, u32)>) -> Self {
        StringPool { bytes, table }
    }

    /// Raw string data.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// `(offset, length)` of every string; the length excludes the terminator.
    #[must_use]
    pub fn table(&self) -> &[(u32, u32)] {
        &self.table
    }

    /// Number of strings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the pool holds no string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// String `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        let &(offset, length) = self.table.get(index)?;
        let start = offset as usize;
        let bytes = self.bytes.get(start..start + length as usize)?;
        std::str::from_utf8(bytes).ok()
    }

    /// All strings in index order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        (0..self.table.len()).filter_map(|index| self.get(index))
    }
}

/// The packed reflection descriptor of one class.
#[derive(Debug, Clone)]
pub struct MetaObjectData {
    config: LayoutConfig,
    ints: Vec<u32>,
    strings: StringPool,
    type_handles: Vec<Option<TypeHandle>>,
}

impl MetaObjectData {
    pub(crate) fn new(
        config: LayoutConfig,
        ints: Vec<u32>,
        strings: StringPool,
        type_handles: Vec<Option<TypeHandle>>,
    ) -> Self {
        MetaObjectData {
            config,
            ints,
            strings,
            type_handles,
        }
    }

    /// Layout the data was generated with.
    #[must_use]
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// The integer array.
    #[must_use]
    pub fn ints(&self) -> &[u32] {
        &self.ints
    }

    /// The string pool.
    #[must_use]
    pub fn strings(&self) -> &StringPool {
        &self.strings
    }

    /// String `index` of the pool.
    #[must_use]
    pub fn string(&self, index: usize) -> Option<&str> {
        self.strings.get(index)
    }

    /// The type-handle table; `None` marks a type that was only declared.
    #[must_use]
    pub fn type_handles(&self) -> &[Option<TypeHandle>] {
        &self.type_handles
    }

    fn header(&self, slot: usize) -> usize {
        self.ints.get(slot).map_or(0, |&value| value as usize)
    }

    /// Format revision.
    #[must_use]
    pub fn revision(&self) -> u32 {
        self.header(header::REVISION) as u32
    }

    /// Class name.
    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        let index = *self.ints.get(header::CLASS_NAME)?;
        self.string(index as usize)
    }

    /// Class-level flags.
    #[must_use]
    pub fn flags(&self) -> MetaObjectFlags {
        MetaObjectFlags::from_bits_retain(self.header(header::FLAGS) as u32)
    }

    /// Number of class info entries.
    #[must_use]
    pub fn class_info_count(&self) -> usize {
        self.header(header::CLASS_INFO)
    }

    /// Number of method-table entries (signals, slots and methods).
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.header(header::METHODS)
    }

    /// Number of signals.
    #[must_use]
    pub fn signal_count(&self) -> usize {
        self.header(header::SIGNAL_COUNT)
    }

    /// Number of properties.
    #[must_use]
    pub fn property_count(&self) -> usize {
        self.header(header::PROPERTIES)
    }

    /// Number of enums.
    #[must_use]
    pub fn enum_count(&self) -> usize {
        self.header(header::ENUMS)
    }

    /// Number of constructors.
    #[must_use]
    pub fn constructor_count(&self) -> usize {
        self.header(header::CONSTRUCTORS)
    }

    fn record(&self, section: usize, width: usize, index: usize) -> Option<&[u32]> {
        if index >= self.header(section) {
            return None;
        }
        let start = self.header(section + 1) + index * width;
        self.ints.get(start..start + width)
    }

    /// Class info entry `index` as `(key, value)`.
    #[must_use]
    pub fn class_info(&self, index: usize) -> Option<(&str, &str)> {
        let record = self.record(header::CLASS_INFO, 2, index)?;
        Some((
            self.string(record[0] as usize)?,
            self.string(record[1] as usize)?,
        ))
    }

    /// Record of method-table entry `index`.
    #[must_use]
    pub fn method_record(&self, index: usize) -> Option<&[u32]> {
        self.record(header::METHODS, self.config.method_fields, index)
    }

    /// Name of method-table entry `index`.
    #[must_use]
    pub fn method_name(&self, index: usize) -> Option<&str> {
        self.string(*self.method_record(index)?.first()? as usize)
    }

    /// Parameter block of method-table entry `index`: return type, argument types, argument
    /// names.
    #[must_use]
    pub fn method_parameters(&self, index: usize) -> Option<&[u32]> {
        let record = self.method_record(index)?;
        let (argc, offset) = (record[1] as usize, record[2] as usize);
        self.ints.get(offset..offset + 1 + 2 * argc)
    }

    /// Record of property `index`.
    #[must_use]
    pub fn property_record(&self, index: usize) -> Option<&[u32]> {
        self.record(header::PROPERTIES, self.config.property_fields, index)
    }

    /// Name of property `index`.
    #[must_use]
    pub fn property_name(&self, index: usize) -> Option<&str> {
        self.string(*self.property_record(index)?.first()? as usize)
    }

    /// Flag word of property `index`.
    #[must_use]
    pub fn property_flags(&self, index: usize) -> Option<PropertyFlags> {
        let record = self.property_record(index)?;
        Some(PropertyFlags::from_bits_retain(record[2]))
    }

    fn trailing_block(&self, block: usize, index: usize) -> Option<u32> {
        let count = self.property_count();
        let start = self.header(header::PROPERTIES + 1)
            + count * self.config.property_fields
            + block * count;
        self.ints.get(start + index).copied()
    }

    fn has_notify_block(&self) -> bool {
        (0..self.property_count()).any(|index| {
            self.property_flags(index)
                .is_some_and(|flags| flags.contains(PropertyFlags::NOTIFY))
        })
    }

    /// Decoded notify reference of property `index`.
    #[must_use]
    pub fn property_notify(&self, index: usize) -> Option<NotifyTarget> {
        if !self.property_flags(index)?.contains(PropertyFlags::NOTIFY) {
            return None;
        }

        let raw = if self.config.inline_notify() {
            self.property_record(index)?[3]
        } else {
            self.trailing_block(0, index)?
        };

        if raw & IS_UNRESOLVED_SIGNAL == IS_UNRESOLVED_SIGNAL {
            let name = self.string((raw & !IS_UNRESOLVED_SIGNAL) as usize)?;
            Some(NotifyTarget::Name(name.to_string()))
        } else {
            Some(NotifyTarget::Index(raw))
        }
    }

    /// Revision of property `index`; `0` when it has none.
    #[must_use]
    pub fn property_revision(&self, index: usize) -> Option<u32> {
        let flags = self.property_flags(index)?;
        if self.config.inline_property_revision() {
            return Some(self.property_record(index)?[4]);
        }
        if !flags.contains(PropertyFlags::REVISIONED) {
            return Some(0);
        }

        let block = match (self.config.inline_notify(), self.has_notify_block()) {
            (false, true) => 1,
            _ => 0,
        };
        self.trailing_block(block, index)
    }

    /// Record of enum `index`.
    #[must_use]
    pub fn enum_record(&self, index: usize) -> Option<&[u32]> {
        self.record(header::ENUMS, self.config.enum_fields, index)
    }

    /// Enumerators of enum `index` as `(name, value)`.
    #[must_use]
    pub fn enum_values(&self, index: usize) -> Option<Vec<(&str, i32)>> {
        let record = self.enum_record(index)?;
        let width = record.len();
        let (count, offset) = (record[width - 2] as usize, record[width - 1] as usize);
        let block = self.ints.get(offset..offset + 2 * count)?;
        block
            .chunks_exact(2)
            .map(|pair| Some((self.string(pair[0] as usize)?, pair[1] as i32)))
            .collect()
    }

    /// Record of constructor `index`.
    #[must_use]
    pub fn constructor_record(&self, index: usize) -> Option<&[u32]> {
        self.record(header::CONSTRUCTORS, self.config.method_fields, index)
    }

    /// Spelled name of an encoded type reference.
    #[must_use]
    pub fn type_name(&self, encoded: u32) -> Option<String> {
        if encoded & IS_UNRESOLVED_TYPE != 0 {
            return self
                .string((encoded & !IS_UNRESOLVED_TYPE) as usize)
                .map(ToString::to_string);
        }
        BuiltinType::iter()
            .find(|builtin| builtin.id() == encoded)
            .map(|builtin| builtin.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_lookup() {
        let pool = StringPool::new(b"Foo\0\0bar\0".to_vec(), vec![(0, 3), (4, 0), (5, 3)]);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.get(0), Some("Foo"));
        assert_eq!(pool.get(1), Some(""));
        assert_eq!(pool.get(2), Some("bar"));
        assert_eq!(pool.get(3), None);
        assert_eq!(pool.iter().collect::<Vec<_>>(), ["Foo", "", "bar"]);
    }

    #[test]
    fn type_names() {
        let pool = StringPool::new(b"C\0\0Point\0".to_vec(), vec![(0, 1), (2, 0), (3, 5)]);
        let data = MetaObjectData::new(LayoutConfig::default(), vec![], pool, vec![]);
        assert_eq!(data.type_name(BuiltinType::Int.id()).as_deref(), Some("int"));
        assert_eq!(
            data.type_name(IS_UNRESOLVED_TYPE | 2).as_deref(),
            Some("Point")
        );
        assert_eq!(data.type_name(9999), None);
        assert_eq!(data.method_count(), 0);
        assert_eq!(data.class_name(), None);
    }
}
