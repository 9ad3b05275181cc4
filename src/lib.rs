//! Introspect - runtime reflection for Rust types.
//!
//! Introspect lets an application describe its types once and then work with
//! them by name at runtime: look up classes, call methods and constructors
//! with dynamically typed arguments, read and write properties, and cast
//! between registered base and derived classes.
//!
//! # Crates
//!
//! - `introspect-core`: type ids, converters, [`Variant`], [`Argument`]
//! - `introspect-registry`: the [`Registry`], builders, the cast engine and invokers
//! - `introspect-macros`: `#[derive(Reflect)]`
//!
//! # Example
//!
//! ```
//! use introspect::prelude::*;
//!
//! #[derive(Clone, PartialEq)]
//! struct Counter {
//!     value: i32,
//! }
//!
//! impl Reflect for Counter {
//!     fn type_name() -> &'static str {
//!         "demo::Counter"
//!     }
//!
//!     fn clone_value(&self) -> Option<Self> {
//!         Some(self.clone())
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = Registry::new();
//! registry
//!     .class::<Counter>()
//!     .constructor(|value: i32| Counter { value })?
//!     .method("add", |c: &mut Counter, by: i32| c.value += by)?
//!     .property("value", |c: &Counter| c.value, |c: &mut Counter, v: i32| c.value = v)?
//!     .build()?;
//!
//! let mut counter = registry.construct("demo::Counter", vec![Argument::value(1i32)])?;
//! registry.call(Argument::variant_lvalue(&mut counter), "add", vec![Argument::value(2i32)])?;
//! let value = registry.get_property(&counter, "value")?;
//! assert_eq!(value.to::<i32>()?, 3);
//! # Ok(())
//! # }
//! ```

extern crate self as introspect;

pub use introspect_core::{
    Argument, BindFailure, CastError, ClassInfo, ConversionError, ConvertFn, ConverterRegistry,
    DynamicType, IntoReturn, InvokeError, LookupError, ParamType, PassBy, Qualifiers, Reflect,
    ReflectError, RegistrationError, Result, Signature, SignatureHash, SymbolKind, TypeId,
    TypeInfo, TypeRegistry, ValueCategory, ValueOps, Variant, VariantError, converters, find_type,
    type_id, types,
};

pub use introspect_registry::{
    Attributes, ByMut, ByRef, CallArgs, CastEdge, ClassBuilder, ClassEntry, ClassGraph,
    DuplicatePolicy, EnumBuilder, EnumEntry, EnumValue, FunctionEntry, IntoConstructor,
    IntoFunction, IntoMethod, Invoker, NamespaceBuilder, NamespaceData, NamespaceTree, NativeFn,
    PropertyEntry, Receiver, ReflectFields, Registry, RegistryConfig, UpcastFn,
};

/// `#[derive(Reflect)]`, see [`introspect_macros`] for the attributes.
pub use introspect_macros::Reflect;

/// Commonly used items.
pub mod prelude {
    pub use crate::{
        Argument, CastError, ClassInfo, DynamicType, InvokeError, ParamType, Reflect,
        ReflectError, ReflectFields, Registry, RegistryConfig, Signature, TypeId, Variant,
        VariantError, converters, type_id,
    };
}
