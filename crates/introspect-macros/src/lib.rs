//! Introspect Proc Macros
//!
//! This crate provides the `#[derive(Reflect)]` macro. Generated code refers
//! to the `introspect` facade crate, so depend on `introspect` rather than on
//! this crate directly.
//!
//! # Example
//!
//! ```ignore
//! use introspect::Reflect;
//!
//! #[derive(Clone, PartialEq, Reflect)]
//! #[reflect(name = "game::Player", clone, eq)]
//! pub struct Player {
//!     #[reflect(get, set)]
//!     pub health: i32,
//! }
//! ```

use proc_macro::TokenStream;

mod attrs;
mod derive_reflect;

/// Derive the `Reflect` trait for a type.
///
/// # Attributes
///
/// - `#[reflect(name = "...")]` - Override the registered type name
/// - `#[reflect(clone)]` - Copy values through `Clone`
/// - `#[reflect(eq)]` - Compare values through `PartialEq`
///
/// # Field Attributes
///
/// - `#[reflect(get)]` - Expose the field as a read-only property
/// - `#[reflect(get, set)]` - Expose the field as a read/write property
/// - `#[reflect(name = "...")]` - Override property name
/// - `#[reflect(dynamic)]` - The field is the object's `DynamicType` tag,
///   used to report the most-derived type
///
/// Property fields must be `Clone`. They are registered by calling
/// `ClassBuilder::fields()`.
///
/// # Example
///
/// ```ignore
/// #[derive(Reflect)]
/// #[reflect(name = "ui::Widget")]
/// pub struct Widget {
///     #[reflect(dynamic)]
///     tag: DynamicType,
///
///     #[reflect(get, set)]
///     pub width: u32,
///
///     #[reflect(get, name = "id")]
///     pub widget_id: u64,
/// }
/// ```
#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    derive_reflect::derive_reflect_impl(input)
}
