//! Per-type operations table.
//!
//! A [`ValueOps`] is the only type-aware code a [`Variant`] carries. One
//! table exists per `T: Reflect`, built at compile time, so comparing table
//! pointers or their Rust type ids is enough to compare stored types.

use std::fmt;
use std::ptr::NonNull;

use super::Variant;
use super::storage::fits_inline;
use crate::{ClassInfo, Reflect, TypeId, type_id};

/// Type-erased operations for one stored type.
pub struct ValueOps {
    type_name: fn() -> &'static str,
    type_id: fn() -> TypeId,
    pub(crate) rust_type_id: fn() -> std::any::TypeId,
    pub(crate) inline: bool,
    pub(crate) drop_inline: unsafe fn(*mut u8),
    pub(crate) drop_boxed: unsafe fn(*mut u8),
    pub(crate) clone_value: unsafe fn(NonNull<u8>) -> Option<Variant<'static>>,
    pub(crate) eq_value: unsafe fn(NonNull<u8>, NonNull<u8>) -> Option<bool>,
    pub(crate) class_info: unsafe fn(NonNull<u8>) -> ClassInfo,
}

impl ValueOps {
    /// The table for `T`.
    pub fn of<T: Reflect>() -> &'static ValueOps {
        <T as HasOps>::OPS
    }

    const fn build<T: Reflect>() -> ValueOps {
        ValueOps {
            type_name: T::type_name,
            type_id: type_id::<T>,
            rust_type_id: std::any::TypeId::of::<T>,
            inline: fits_inline::<T>(),
            drop_inline: drop_inline::<T>,
            drop_boxed: drop_boxed::<T>,
            clone_value: clone_value::<T>,
            eq_value: eq_value::<T>,
            class_info: class_info::<T>,
        }
    }

    /// Registered name of the stored type.
    pub fn type_name(&self) -> &'static str {
        (self.type_name)()
    }

    /// Registered id of the stored type.
    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Check whether this is the table for `T`.
    pub fn is<T: Reflect>(&self) -> bool {
        (self.rust_type_id)() == std::any::TypeId::of::<T>()
    }

    /// Check whether two tables describe the same type.
    pub fn same_type(&self, other: &ValueOps) -> bool {
        (self.rust_type_id)() == (other.rust_type_id)()
    }

    /// Check whether values of this type are stored inline.
    pub fn is_inline(&self) -> bool {
        self.inline
    }
}

impl fmt::Debug for ValueOps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueOps")
            .field("type_name", &self.type_name())
            .field("inline", &self.inline)
            .finish()
    }
}

trait HasOps {
    const OPS: &'static ValueOps;
}

impl<T: Reflect> HasOps for T {
    const OPS: &'static ValueOps = &ValueOps::build::<T>();
}

// SAFETY (all functions below): `ptr` addresses a live, properly aligned `T`.

unsafe fn drop_inline<T>(ptr: *mut u8) {
    unsafe { ptr.cast::<T>().drop_in_place() }
}

unsafe fn drop_boxed<T>(ptr: *mut u8) {
    drop(unsafe { Box::from_raw(ptr.cast::<T>()) });
}

unsafe fn clone_value<T: Reflect>(ptr: NonNull<u8>) -> Option<Variant<'static>> {
    let value = unsafe { ptr.cast::<T>().as_ref() };
    value.clone_value().map(Variant::new)
}

unsafe fn eq_value<T: Reflect>(lhs: NonNull<u8>, rhs: NonNull<u8>) -> Option<bool> {
    let (lhs, rhs) = unsafe { (lhs.cast::<T>().as_ref(), rhs.cast::<T>().as_ref()) };
    lhs.eq_value(rhs)
}

unsafe fn class_info<T: Reflect>(ptr: NonNull<u8>) -> ClassInfo {
    ClassInfo::of(unsafe { ptr.cast::<T>().as_ref() })
}
