//! Layout configuration for descriptor generation.
//!
//! The host runtime has changed the shape of its records over several format revisions. Rather
//! than inferring the shape from the revision number, every record size is explicit here, and
//! the presets pin the combinations real host revisions use.
//!
//! | Preset | methods | properties | enums | type handles |
//! |---|---|---|---|---|
//! | [`LayoutConfig::revision7`] | 5 | 3 + trailing notify / revision blocks | 4 | no |
//! | [`LayoutConfig::revision8`] | 5 | 3 + trailing notify / revision blocks | 5 | no |
//! | [`LayoutConfig::revision9`] | 6 | 5 | 5 | yes |

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Class-level flag word of the descriptor header
    pub struct MetaObjectFlags: u32 {
        /// The class builds its meta-object at runtime
        const DYNAMIC_META_OBJECT = 0x01;
        /// Property values go through a variant-based meta-object
        const REQUIRES_VARIANT_META_OBJECT = 0x02;
        /// Property access is routed through the static dispatch function
        const PROPERTY_ACCESS_IN_STATIC_META_CALL = 0x04;
    }
}

impl Default for MetaObjectFlags {
    fn default() -> Self {
        MetaObjectFlags::PROPERTY_ACCESS_IN_STATIC_META_CALL
    }
}

/// Record shapes of the generated descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Format revision written as the first integer of the descriptor
    pub revision: u32,

    /// Integers per method record: 5 (name, argc, parameters, tag, flags) or 6 (adds the first
    /// type-handle index)
    pub method_fields: usize,

    /// Integers per property record: 3 (name, type, flags; notify and revision in trailing
    /// blocks), 4 (adds notify; revision in a trailing block) or 5 (adds notify and revision)
    pub property_fields: usize,

    /// Integers per enum record: 4 (name, flags, count, data) or 5 (adds the alias)
    pub enum_fields: usize,

    /// Emit a type-handle table for external types
    pub type_handles: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::revision9()
    }
}

impl LayoutConfig {
    /// Revision 7 records: 5-field methods, 3-field properties, 4-field enums.
    #[must_use]
    pub fn revision7() -> Self {
        Self {
            revision: 7,
            method_fields: 5,
            property_fields: 3,
            enum_fields: 4,
            type_handles: false,
        }
    }

    /// Revision 8 records: as revision 7, with enum aliases.
    #[must_use]
    pub fn revision8() -> Self {
        Self {
            revision: 8,
            method_fields: 5,
            property_fields: 3,
            enum_fields: 5,
            type_handles: false,
        }
    }

    /// Revision 9 records: 6-field methods, 5-field properties, 5-field enums, type handles.
    #[must_use]
    pub fn revision9() -> Self {
        Self {
            revision: 9,
            method_fields: 6,
            property_fields: 5,
            enum_fields: 5,
            type_handles: true,
        }
    }

    /// All presets, oldest first.
    #[must_use]
    pub fn presets() -> [Self; 3] {
        [Self::revision7(), Self::revision8(), Self::revision9()]
    }

    /// Check that the record shapes are ones the host understands.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] for unsupported field counts, or when the method records
    /// and the type-handle table disagree (the 6th method field exists exactly when handles do).
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.method_fields, 5 | 6) {
            return Err(Error::InvalidConfig(format!(
                "method records have 5 or 6 fields, not {}",
                self.method_fields
            )));
        }
        if !matches!(self.property_fields, 3..=5) {
            return Err(Error::InvalidConfig(format!(
                "property records have 3, 4 or 5 fields, not {}",
                self.property_fields
            )));
        }
        if !matches!(self.enum_fields, 4 | 5) {
            return Err(Error::InvalidConfig(format!(
                "enum records have 4 or 5 fields, not {}",
                self.enum_fields
            )));
        }
        if (self.method_fields == 6) != self.type_handles {
            return Err(Error::InvalidConfig(format!(
                "{}-field method records with type handles {}",
                self.method_fields,
                if self.type_handles { "on" } else { "off" }
            )));
        }
        Ok(())
    }

    /// Parse and validate a configuration from JSON.
    ///
    /// # Errors
    /// Returns [`Error::Serialization`] for malformed JSON and [`Error::InvalidConfig`] for
    /// unsupported shapes.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: LayoutConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration as JSON.
    ///
    /// # Errors
    /// Returns [`Error::Serialization`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Whether properties carry their notify reference inline.
    #[must_use]
    pub fn inline_notify(&self) -> bool {
        self.property_fields >= 4
    }

    /// Whether properties carry their revision inline.
    #[must_use]
    pub fn inline_property_revision(&self) -> bool {
        self.property_fields >= 5
    }

    /// Whether enum records carry an alias.
    #[must_use]
    pub fn enum_alias(&self) -> bool {
        self.enum_fields >= 5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        for config in LayoutConfig::presets() {
            assert!(config.validate().is_ok(), "{:?}", config);
        }
        assert_eq!(LayoutConfig::default(), LayoutConfig::revision9());
    }

    #[test]
    fn rejects_bad_shapes() {
        let mut config = LayoutConfig::revision9();
        config.property_fields = 6;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = LayoutConfig::revision7();
        config.type_handles = true;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = LayoutConfig::revision8();
        config.enum_fields = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn json() {
        let text = LayoutConfig::revision8().to_json().unwrap();
        assert!(text.contains("\"methodFields\":5"));
        assert_eq!(LayoutConfig::from_json(&text).unwrap(), LayoutConfig::revision8());

        let bad = r#"{"revision":9,"methodFields":5,"propertyFields":5,"enumFields":5,"typeHandles":true}"#;
        assert!(matches!(LayoutConfig::from_json(bad), Err(Error::InvalidConfig(_))));
        assert!(matches!(
            LayoutConfig::from_json("{"),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn meta_flags_default() {
        assert_eq!(
            MetaObjectFlags::default().bits(),
            MetaObjectFlags::PROPERTY_ACCESS_IN_STATIC_META_CALL.bits()
        );
    }
}
