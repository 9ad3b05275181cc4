//! Core types for the introspect runtime reflection engine.
//!
//! This crate holds the pieces every other layer builds on:
//!
//! - [`TypeId`] / [`TypeRegistry`]: process-stable identifiers and type descriptors
//! - [`ConverterRegistry`]: single-hop directed conversions between types
//! - [`Variant`]: type-erased value container with inline small-value storage
//! - [`Argument`]: call-scoped, non-owning argument wrapper tagged with a value category
//! - [`ClassInfo`] / [`DynamicType`]: the self-reporting dynamic type hook
//! - [`Signature`] / [`ParamType`]: explicit signature descriptions for invokers
//! - [`IntoReturn`]: boxing native return values
//!
//! # Example
//!
//! ```
//! use introspect_core::{Variant, type_id};
//!
//! let value = Variant::new(42i32);
//! assert_eq!(value.type_id(), type_id::<i32>());
//! assert_eq!(value.to::<String>().unwrap(), "42");
//! ```

mod argument;
mod class_info;
mod convert;
mod error;
mod into_return;
mod reflect;
mod signature;
mod type_id;
mod type_registry;
pub mod variant;

pub use argument::{Argument, ValueCategory};
pub use class_info::{ClassInfo, DynamicType};
pub use convert::{ConvertFn, ConverterRegistry, converters};
pub use error::{
    BindFailure, CastError, ConversionError, InvokeError, LookupError, ReflectError,
    RegistrationError, Result, SymbolKind, VariantError,
};
pub use into_return::IntoReturn;
pub use reflect::Reflect;
pub use signature::{ParamType, PassBy, Signature, SignatureHash};
pub use type_id::{Qualifiers, TypeId, TypeInfo};
pub use type_registry::{TypeRegistry, find_type, type_id, types};
pub use variant::{ValueOps, Variant};
