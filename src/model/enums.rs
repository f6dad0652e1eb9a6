use bitflags::bitflags;

use crate::{
    typesystem::{TypeInfo, TypeInterface},
    utils::textview::{split_enumerators, TextView},
    Result,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Flag word of an enum record
    pub struct EnumFlags: u32 {
        /// Values combine as a bit set
        const IS_FLAG = 0x1;
        /// Enumerators are scoped to the enum (`enum class`)
        const IS_SCOPED = 0x2;
    }
}

/// Descriptor of a reflected enum or flag set.
///
/// ```rust
/// use metaforge::prelude::*;
///
/// let e = EnumDescriptor::new("Color")
///     .scoped()
///     .enumerators("Color::Red, Color::Green, Color::Blue", &[0, 1, 2]);
///
/// assert_eq!(e.len(), 3);
/// assert_eq!(e.enumerator(1), Some(("Green", 1)));
/// ```
#[derive(Debug, Clone)]
pub struct EnumDescriptor {
    name: String,
    alias: Option<String>,
    names: Vec<String>,
    values: Vec<i32>,
    flags: EnumFlags,
    rust_type: Option<TypeInterface>,
}

impl EnumDescriptor {
    /// Describe an enum named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        EnumDescriptor {
            name: name.into(),
            alias: None,
            names: Vec::new(),
            values: Vec::new(),
            flags: EnumFlags::empty(),
            rust_type: None,
        }
    }

    /// Describe an enum and link it to the Rust type `E`.
    ///
    /// Properties of type `E` on the declaring class are flagged as enum-or-flag, and `E` is
    /// registered as an external type named `Class::name`.
    #[must_use]
    pub fn of<E: 'static>(name: impl Into<String>) -> Self {
        let mut descriptor = EnumDescriptor::new(name);
        descriptor.rust_type = Some(TypeInterface::of::<E>(descriptor.name.clone()));
        descriptor
    }

    /// Name of the enum this flag set is built from.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Values combine as a bit set.
    #[must_use]
    pub fn flag(mut self) -> Self {
        self.flags |= EnumFlags::IS_FLAG;
        self
    }

    /// Enumerators are scoped.
    #[must_use]
    pub fn scoped(mut self) -> Self {
        self.flags |= EnumFlags::IS_SCOPED;
        self
    }

    /// Append one enumerator.
    #[must_use]
    pub fn value(mut self, name: impl Into<String>, value: i32) -> Self {
        self.names.push(name.into());
        self.values.push(value);
        self
    }

    /// Append enumerators from a stringified list such as `"Color::Red, Color::Green"`.
    ///
    /// Scope qualifications are dropped. The list and `values` must have the same length; the
    /// registry rejects the descriptor otherwise.
    #[must_use]
    pub fn enumerators(mut self, list: &str, values: &[i32]) -> Self {
        self.names.extend(
            split_enumerators(TextView::new(list)).map(|name| name.as_str().to_string()),
        );
        self.values.extend_from_slice(values);
        self
    }

    /// Enum name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alias, if any.
    #[must_use]
    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Flag word.
    #[must_use]
    pub fn flags(&self) -> EnumFlags {
        self.flags
    }

    /// Linked Rust type, if any.
    #[must_use]
    pub fn rust_type(&self) -> Option<&TypeInfo> {
        self.rust_type.as_ref().map(|interface| &interface.info)
    }

    /// Runtime interface of the linked type, renamed to `qualified`.
    pub(crate) fn linked_interface(&self, qualified: &str) -> Option<TypeInterface> {
        self.rust_type.as_ref().map(|interface| TypeInterface {
            name: qualified.to_string(),
            ..interface.clone()
        })
    }

    /// Number of enumerators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if the enum has no enumerators.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Enumerator `index` as `(name, value)`.
    #[must_use]
    pub fn enumerator(&self, index: usize) -> Option<(&str, i32)> {
        Some((self.names.get(index)?.as_str(), *self.values.get(index)?))
    }

    /// All enumerators in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Check that every enumerator has exactly one value.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the name and value lists differ in length.
    pub fn validate(&self) -> Result<()> {
        if self.names.len() != self.values.len() {
            return Err(malformed_error!(
                "Enum `{}` lists {} enumerators but {} values",
                self.name,
                self.names.len(),
                self.values.len()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_text() {
        let e = EnumDescriptor::new("Mode").enumerators("Mode::A, Mode::B", &[1, 4]);
        assert!(e.validate().is_ok());
        let items: Vec<_> = e.iter().collect();
        assert_eq!(items, [("A", 1), ("B", 4)]);
    }

    #[test]
    fn mismatched_lengths() {
        let e = EnumDescriptor::new("Mode").enumerators("A, B, C", &[1, 2]);
        assert!(e.validate().is_err());
        assert_eq!(e.enumerator(2), None);
    }

    #[test]
    fn flags_and_alias() {
        let e = EnumDescriptor::new("Options").alias("Option").flag().value("None", 0);
        assert_eq!(e.flags(), EnumFlags::IS_FLAG);
        assert_eq!(e.alias_name(), Some("Option"));
        assert_eq!(e.len(), 1);
    }
}
