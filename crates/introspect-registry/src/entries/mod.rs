//! Registry entry types.
//!
//! - [`ClassEntry`] - Classes with bases, constructors, methods and properties
//! - [`FunctionEntry`] - Functions, methods and constructors
//! - [`PropertyEntry`] - Getter/setter pairs, on classes or namespaces
//! - [`EnumEntry`] - Enumerations
//!
//! Supporting types:
//! - [`Attributes`] - Key/value metadata on any entry
//! - [`EnumValue`] - A single enumerator

mod attributes;
mod class;
mod enum_entry;
mod function;
mod property;

pub use attributes::Attributes;
pub use class::ClassEntry;
pub use enum_entry::{EnumEntry, EnumValue};
pub use function::FunctionEntry;
pub use property::PropertyEntry;
