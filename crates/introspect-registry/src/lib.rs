//! Introspect Registry crate.
//!
//! Everything that needs registration state lives here:
//!
//! - [`ClassGraph`]: the cast engine over registered inheritance edges
//! - [`Invoker`]: registered callables with argument binding
//! - [`entries`]: class, function, property and enum entries
//! - [`NamespaceTree`]: hierarchical, name-unique storage of all symbols
//! - [`ClassBuilder`], [`NamespaceBuilder`], [`EnumBuilder`]: fluent registration
//! - [`Registry`]: lookups, calls, property access and casts
//!
//! Types, converters and variants come from `introspect-core` and are global
//! to the process; a [`Registry`] only holds what was registered into it.

mod builder;
mod class_graph;
mod config;
pub mod entries;
mod invoker;
pub mod namespace_tree;
mod registry;

pub use builder::{ClassBuilder, EnumBuilder, NamespaceBuilder, ReflectFields};
pub use class_graph::{CastEdge, ClassGraph, UpcastFn};
pub use config::{DuplicatePolicy, RegistryConfig};
pub use entries::{Attributes, ClassEntry, EnumEntry, EnumValue, FunctionEntry, PropertyEntry};
pub use invoker::{
    ByMut, ByRef, CallArgs, IntoConstructor, IntoFunction, IntoMethod, Invoker, NativeFn, Receiver,
};
pub use namespace_tree::{NamespaceData, NamespaceTree};
pub use registry::Registry;
