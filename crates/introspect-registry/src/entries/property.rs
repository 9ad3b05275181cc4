//! Property entry.

use introspect_core::{Argument, InvokeError, TypeId, Variant};

use crate::{ClassGraph, Invoker};

use super::Attributes;

/// Registry entry for a class property or a global property.
///
/// A property is a getter plus an optional setter. Properties without a
/// setter are read-only: their values come back as read-only variants and
/// writing them fails with [`InvokeError::ReadOnlyProperty`].
#[derive(Debug, Clone)]
pub struct PropertyEntry {
    /// Unqualified name.
    pub name: String,
    /// Fully qualified name.
    pub qualified_name: String,
    /// Type of the property value.
    pub type_id: TypeId,
    pub getter: Invoker,
    pub setter: Option<Invoker>,
    pub attributes: Attributes,
}

impl PropertyEntry {
    pub fn new(
        name: impl Into<String>,
        qualified_name: impl Into<String>,
        type_id: TypeId,
        getter: Invoker,
        setter: Option<Invoker>,
    ) -> Self {
        Self {
            name: name.into(),
            qualified_name: qualified_name.into(),
            type_id,
            getter,
            setter,
            attributes: Attributes::new(),
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.setter.is_none()
    }

    /// Whether this property belongs to the object rather than a namespace.
    pub fn is_member(&self) -> bool {
        !self.getter.is_static()
    }

    /// Read the property of `object` (or the global, when `None`).
    pub fn get(
        &self,
        graph: &ClassGraph,
        object: Option<&Variant<'_>>,
    ) -> Result<Variant<'static>, InvokeError> {
        let value = self
            .getter
            .invoke(graph, object.map(Argument::variant_const), Vec::new())?;
        Ok(if self.is_read_only() {
            value.read_only()
        } else {
            value
        })
    }

    /// Write `value` to the property of `object` (or the global, when `None`).
    pub fn set(
        &self,
        graph: &ClassGraph,
        object: Option<&mut Variant<'_>>,
        value: Variant<'_>,
    ) -> Result<(), InvokeError> {
        let setter = self
            .setter
            .as_ref()
            .ok_or_else(|| InvokeError::ReadOnlyProperty(self.qualified_name.clone()))?;
        setter.invoke(
            graph,
            object.map(Argument::variant_lvalue),
            vec![Argument::from_variant(value)],
        )?;
        Ok(())
    }
}
