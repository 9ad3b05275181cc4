//! Attribute parsing utilities for the reflect macros.

use syn::{Attribute, LitStr};

/// Parsed `#[reflect(...)]` attributes on a type.
#[derive(Debug, Default)]
pub struct TypeAttrs {
    /// Registered type name (default: Rust type name)
    pub name: Option<String>,
    /// Implement the copy hook through `Clone`
    pub clone: bool,
    /// Implement the equality hook through `PartialEq`
    pub eq: bool,
}

/// Parsed `#[reflect(...)]` attributes on a field.
#[derive(Debug, Default)]
pub struct FieldAttrs {
    /// Expose a getter
    pub get: bool,
    /// Expose a setter
    pub set: bool,
    /// Override property name
    pub name: Option<String>,
    /// The field holds the object's `DynamicType` tag
    pub dynamic: bool,
}

fn unknown(meta: &syn::meta::ParseNestedMeta<'_>, what: &str) -> syn::Error {
    meta.error(format!(
        "unknown reflect {}: {}",
        what,
        meta.path
            .get_ident()
            .map(|i| i.to_string())
            .unwrap_or_default()
    ))
}

impl TypeAttrs {
    /// Parse attributes from a list of `#[reflect(...)]` attributes.
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("reflect") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    if value.value().is_empty() {
                        return Err(meta.error("reflect name cannot be empty"));
                    }
                    result.name = Some(value.value());
                } else if meta.path.is_ident("clone") {
                    result.clone = true;
                } else if meta.path.is_ident("eq") {
                    result.eq = true;
                } else {
                    return Err(unknown(&meta, "attribute"));
                }
                Ok(())
            })?;
        }

        Ok(result)
    }
}

impl FieldAttrs {
    /// Parse attributes from a list of `#[reflect(...)]` attributes.
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("reflect") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("get") {
                    result.get = true;
                } else if meta.path.is_ident("set") {
                    result.set = true;
                } else if meta.path.is_ident("dynamic") {
                    result.dynamic = true;
                } else if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.name = Some(value.value());
                } else {
                    return Err(unknown(&meta, "field attribute"));
                }
                Ok(())
            })?;
        }

        Ok(result)
    }

    /// Whether the field becomes a property.
    pub fn is_property(&self) -> bool {
        self.get || self.set
    }
}
