//! Call-scoped argument wrapper.
//!
//! An [`Argument`] is what callers hand to an invoker: a value (owned or
//! aliased through a [`Variant`]) plus its value category. The category
//! decides which parameter kinds the argument may bind to:
//!
//! | parameter   | rvalue | lvalue | const |
//! |-------------|--------|--------|-------|
//! | `T`         | yes    | yes    | yes   |
//! | `const T&`  | yes    | yes    | yes   |
//! | `T&`        | no     | yes    | no    |
//! | `T&&`       | yes    | no     | no    |
//!
//! # Example
//!
//! ```
//! use introspect_core::{Argument, ValueCategory};
//!
//! let mut flag = false;
//! let args = [Argument::value(123i32), Argument::lvalue(&mut flag)];
//! assert_eq!(args[0].category(), ValueCategory::Rvalue);
//! assert_eq!(args[1].category(), ValueCategory::Lvalue);
//! ```

use crate::{Reflect, TypeId, Variant};

/// Value category of an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueCategory {
    /// A temporary the callee may consume.
    Rvalue,
    /// A named, mutable value the callee may write through.
    Lvalue,
    /// A named value the callee may only read.
    Const,
}

/// A type-erased argument tagged with its value category.
///
/// The lifetime ties aliased arguments to the values they borrow, so an
/// argument never outlives the invocation it is built for.
#[derive(Debug)]
pub struct Argument<'a> {
    value: Variant<'a>,
    category: ValueCategory,
}

impl Argument<'static> {
    /// An rvalue argument owning `value`.
    pub fn value<T: Reflect>(value: T) -> Self {
        Self {
            value: Variant::new(value),
            category: ValueCategory::Rvalue,
        }
    }
}

impl<'a> Argument<'a> {
    /// A mutable lvalue argument aliasing `value`.
    pub fn lvalue<T: Reflect>(value: &'a mut T) -> Self {
        Self {
            value: Variant::alias_mut(value),
            category: ValueCategory::Lvalue,
        }
    }

    /// A const lvalue argument aliasing `value`.
    pub fn constant<T: Reflect>(value: &'a T) -> Self {
        Self {
            value: Variant::alias(value),
            category: ValueCategory::Const,
        }
    }

    /// Wrap a variant, deriving the category from how it holds its payload.
    ///
    /// Owned writable payloads are rvalues, read-only payloads are const and
    /// mutable aliases are lvalues.
    pub fn from_variant(value: Variant<'a>) -> Self {
        let category = if value.is_read_only() {
            ValueCategory::Const
        } else if value.is_alias() {
            ValueCategory::Lvalue
        } else {
            ValueCategory::Rvalue
        };
        Self { value, category }
    }

    /// An lvalue argument aliasing the payload of `variant`.
    pub fn variant_lvalue(variant: &'a mut Variant<'_>) -> Self {
        let category = if variant.is_read_only() {
            ValueCategory::Const
        } else {
            ValueCategory::Lvalue
        };
        Self {
            value: variant.by_mut(),
            category,
        }
    }

    /// A const argument aliasing the payload of `variant`.
    pub fn variant_const(variant: &'a Variant<'_>) -> Self {
        Self {
            value: variant.by_ref(),
            category: ValueCategory::Const,
        }
    }

    /// Re-tag this argument as const. Categories only ever narrow.
    pub fn into_const(mut self) -> Self {
        self.value.make_read_only();
        self.category = ValueCategory::Const;
        self
    }

    pub fn category(&self) -> ValueCategory {
        self.category
    }

    pub fn is_rvalue(&self) -> bool {
        self.category == ValueCategory::Rvalue
    }

    pub fn is_lvalue(&self) -> bool {
        self.category == ValueCategory::Lvalue
    }

    pub fn is_const(&self) -> bool {
        self.category == ValueCategory::Const
    }

    /// Decayed type of the wrapped value.
    pub fn type_id(&self) -> TypeId {
        self.value.type_id()
    }

    pub fn type_name(&self) -> &'static str {
        self.value.type_name()
    }

    pub fn variant(&self) -> &Variant<'a> {
        &self.value
    }

    pub fn into_variant(self) -> Variant<'a> {
        self.value
    }

    pub fn into_parts(self) -> (Variant<'a>, ValueCategory) {
        (self.value, self.category)
    }
}

impl<T: Reflect> From<T> for Argument<'static> {
    fn from(value: T) -> Self {
        Argument::value(value)
    }
}

impl<'a> From<Variant<'a>> for Argument<'a> {
    fn from(value: Variant<'a>) -> Self {
        Argument::from_variant(value)
    }
}
