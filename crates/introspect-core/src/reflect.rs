//! The `Reflect` trait for registrable types.
//!
//! Every type that can be stored in a [`Variant`](crate::Variant), passed as
//! an argument, or registered as a class implements `Reflect`. It supplies the
//! registered type name and a few optional value hooks.
//!
//! # Example
//!
//! ```
//! use introspect_core::{Reflect, Variant};
//!
//! #[derive(Clone, PartialEq)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! impl Reflect for Point {
//!     fn type_name() -> &'static str {
//!         "Point"
//!     }
//!
//!     fn clone_value(&self) -> Option<Self> {
//!         Some(self.clone())
//!     }
//!
//!     fn eq_value(&self, other: &Self) -> Option<bool> {
//!         Some(self == other)
//!     }
//! }
//!
//! let a = Variant::new(Point { x: 1, y: 2 });
//! let b = a.try_clone().unwrap();
//! assert_eq!(a, b);
//! ```
//!
//! With the `#[derive(Reflect)]` macro (from `introspect-macros`):
//!
//! ```ignore
//! #[derive(Clone, PartialEq, Reflect)]
//! #[reflect(name = "Point", clone, eq)]
//! pub struct Point {
//!     pub x: i32,
//!     pub y: i32,
//! }
//! ```

use crate::DynamicType;

/// Trait for types known to the reflection engine.
///
/// Only `type_name` is required. The remaining methods are hooks with
/// conservative defaults:
///
/// - [`Reflect::clone_value`]: `None` means the type cannot be copied, so
///   copying a [`Variant`](crate::Variant) holding it fails.
/// - [`Reflect::eq_value`]: `None` means values are never equal.
/// - [`Reflect::dynamic_type`]: the self-reporting dynamic type hook. The
///   default has no tag, so the value is only its static type. Resolve it
///   with [`ClassInfo::of`](crate::ClassInfo::of).
pub trait Reflect: Sized + 'static {
    /// The registered name of this type.
    fn type_name() -> &'static str;

    /// Copy this value, if the type supports copying.
    fn clone_value(&self) -> Option<Self> {
        None
    }

    /// Compare two values, if the type supports comparison.
    fn eq_value(&self, _other: &Self) -> Option<bool> {
        None
    }

    /// The tag recording the most-derived object this value is embedded in.
    fn dynamic_type(&self) -> Option<&DynamicType> {
        None
    }
}

// === Primitive Type Implementations ===

macro_rules! impl_reflect_value {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn type_name() -> &'static str {
                    $name
                }

                #[allow(clippy::clone_on_copy)]
                fn clone_value(&self) -> Option<Self> {
                    Some(self.clone())
                }

                fn eq_value(&self, other: &Self) -> Option<bool> {
                    Some(self == other)
                }
            }
        )*
    };
}

impl_reflect_value! {
    bool => "bool",
    char => "char",
    i8 => "int8",
    i16 => "int16",
    i32 => "int",
    i64 => "int64",
    u8 => "uint8",
    u16 => "uint16",
    u32 => "uint",
    u64 => "uint64",
    isize => "isize",
    usize => "usize",
    f32 => "float",
    f64 => "double",
    String => "string",
}
