//! Enum entry.
//!
//! This module provides `EnumEntry` for registered enumerations.

use introspect_core::RegistrationError;

use super::Attributes;

/// A single named enumerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub value: i64,
}

impl EnumValue {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Registry entry for an enumeration.
///
/// Enumerations are integer-backed named constants kept in declaration order.
/// Names are unique; values may repeat (aliases), in which case lookups by
/// value return the first name declared.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumEntry {
    /// Unqualified name.
    pub name: String,
    /// Namespace path (e.g., `["gfx", "color"]`).
    pub namespace: Vec<String>,
    /// Fully qualified name (with namespace).
    pub qualified_name: String,
    /// Enum values.
    pub values: Vec<EnumValue>,
    pub attributes: Attributes,
}

impl EnumEntry {
    /// Create a new enum entry.
    pub fn new(
        name: impl Into<String>,
        namespace: Vec<String>,
        qualified_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace,
            qualified_name: qualified_name.into(),
            values: Vec::new(),
            attributes: Attributes::new(),
        }
    }

    /// Add a value to the enum.
    pub fn add_value(&mut self, name: impl Into<String>, value: i64) -> Result<(), RegistrationError> {
        let name = name.into();
        if self.has_value(&name) {
            return Err(RegistrationError::DuplicateEnumValue {
                enum_name: self.qualified_name.clone(),
                value_name: name,
            });
        }
        self.values.push(EnumValue::new(name, value));
        Ok(())
    }

    /// Look up a value by name.
    pub fn get_value(&self, name: &str) -> Option<i64> {
        self.values.iter().find(|v| v.name == name).map(|v| v.value)
    }

    /// Look up a name by value.
    pub fn get_name(&self, value: i64) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.value == value)
            .map(|v| v.name.as_str())
    }

    /// Check if a value with the given name exists.
    pub fn has_value(&self, name: &str) -> bool {
        self.values.iter().any(|v| v.name == name)
    }

    /// Values in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.values.iter().map(|v| (v.name.as_str(), v.value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
