//! Type-erased value container.
//!
//! A [`Variant`] holds at most one value of any `T: Reflect`. Owned values
//! small enough for [`INLINE_SIZE`] bytes are stored in place, larger ones are
//! boxed. A variant can also *alias* a value owned elsewhere; the lifetime
//! parameter ties such a variant to the borrow it was built from.
//!
//! # Value semantics
//!
//! - Moving a variant moves its payload; the source is gone (Rust move) or
//!   left empty ([`Variant::take_variant`]).
//! - Copying is explicit ([`Variant::try_clone`]) because not every payload
//!   can be copied. Owned payloads are deep-copied through the type's
//!   [`Reflect::clone_value`] hook; shared aliases copy the alias.
//! - Every owned payload is dropped exactly once.
//!
//! # Example
//!
//! ```
//! use introspect_core::Variant;
//!
//! let mut value = Variant::new(5i32);
//! *value.get_mut::<i32>().unwrap() += 1;
//! assert_eq!(*value.get::<i32>().unwrap(), 6);
//! assert_eq!(value.to::<String>().unwrap(), "6");
//!
//! let mut flag = false;
//! {
//!     let mut alias = Variant::alias_mut(&mut flag);
//!     *alias.get_mut::<bool>().unwrap() = true;
//! }
//! assert!(flag);
//! ```

mod ops;
mod storage;

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

pub use ops::ValueOps;
pub use storage::{INLINE_ALIGN, INLINE_SIZE, fits_inline};
use storage::{InlineBuffer, Storage};

use crate::{ClassInfo, ConversionError, Reflect, TypeId, VariantError, converters, type_id};

/// A type-erased value, owned or aliased.
pub struct Variant<'a> {
    ops: Option<&'static ValueOps>,
    storage: Storage,
    read_only: bool,
    _borrow: PhantomData<&'a ()>,
}

impl Default for Variant<'_> {
    fn default() -> Self {
        Self::empty()
    }
}

impl Variant<'static> {
    /// Store `value`, inline if it fits.
    pub fn new<T: Reflect>(value: T) -> Self {
        let ops = ValueOps::of::<T>();
        let storage = if ops.inline {
            // SAFETY: `ops.inline` is `fits_inline::<T>()`.
            Storage::Inline(unsafe { InlineBuffer::new(value) })
        } else {
            Storage::boxed(value)
        };
        Self {
            ops: Some(ops),
            storage,
            read_only: false,
            _borrow: PhantomData,
        }
    }
}

impl<'a> Variant<'a> {
    // ========================================================================
    // Construction
    // ========================================================================

    /// A variant holding nothing.
    pub const fn empty() -> Self {
        Self {
            ops: None,
            storage: Storage::Empty,
            read_only: false,
            _borrow: PhantomData,
        }
    }

    /// Alias a value without copying it. The variant is read-only.
    pub fn alias<T: Reflect>(value: &'a T) -> Self {
        Self {
            ops: Some(ValueOps::of::<T>()),
            storage: Storage::Shared(NonNull::from(value).cast()),
            read_only: true,
            _borrow: PhantomData,
        }
    }

    /// Alias a value mutably without copying it.
    pub fn alias_mut<T: Reflect>(value: &'a mut T) -> Self {
        Self {
            ops: Some(ValueOps::of::<T>()),
            storage: Storage::Exclusive(NonNull::from(value).cast()),
            read_only: false,
            _borrow: PhantomData,
        }
    }

    /// Alias a value through its operations table and address.
    ///
    /// Used by the cast engine to view an object as one of its bases.
    ///
    /// # Safety
    ///
    /// `ptr` must address a live value of the type described by `ops`, valid
    /// for `'a`. Unless `read_only` is set, the value must be exclusively
    /// borrowed for `'a` and `ptr` must carry write permission.
    pub unsafe fn alias_raw(ops: &'static ValueOps, ptr: NonNull<u8>, read_only: bool) -> Self {
        Self {
            ops: Some(ops),
            storage: if read_only {
                Storage::Shared(ptr)
            } else {
                Storage::Exclusive(ptr)
            },
            read_only,
            _borrow: PhantomData,
        }
    }

    /// Mark this variant read-only. There is no way back.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn make_read_only(&mut self) {
        self.read_only = true;
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn is_empty(&self) -> bool {
        self.ops.is_none()
    }

    /// Id of the stored (decayed) type, or [`TypeId::INVALID`] when empty.
    pub fn type_id(&self) -> TypeId {
        self.ops.map_or(TypeId::INVALID, ValueOps::type_id)
    }

    /// Name of the stored type, or `"<empty>"`.
    pub fn type_name(&self) -> &'static str {
        self.ops.map_or("<empty>", ValueOps::type_name)
    }

    /// The operations table of the stored type.
    pub fn ops(&self) -> Option<&'static ValueOps> {
        self.ops
    }

    /// Check whether the stored type is exactly `T`.
    pub fn is<T: Reflect>(&self) -> bool {
        self.ops.is_some_and(ValueOps::is::<T>)
    }

    /// Check whether the payload is owned (not aliased).
    pub fn is_owned(&self) -> bool {
        self.storage.is_owned()
    }

    pub fn is_alias(&self) -> bool {
        self.storage.is_alias()
    }

    /// Check whether the payload is stored in place.
    pub fn is_inline(&self) -> bool {
        matches!(self.storage, Storage::Inline(_))
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Address of the payload.
    pub fn payload_ptr(&self) -> Option<NonNull<u8>> {
        self.storage.as_ptr()
    }

    /// Address of the payload for writing. `None` when empty or read-only.
    pub fn payload_mut_ptr(&mut self) -> Option<NonNull<u8>> {
        if self.read_only {
            return None;
        }
        self.storage.as_mut_ptr()
    }

    /// The payload's self-reported dynamic type and casting address.
    pub fn class_info(&self) -> Option<ClassInfo> {
        let ops = self.ops?;
        let ptr = self.storage.as_ptr()?;
        // SAFETY: `ptr` addresses a live value of the type `ops` describes.
        Some(unsafe { (ops.class_info)(ptr) })
    }

    // ========================================================================
    // Typed Access
    // ========================================================================

    fn check<T: Reflect>(&self) -> Result<&'static ValueOps, VariantError> {
        let ops = self.ops.ok_or(VariantError::Empty)?;
        if !ops.is::<T>() {
            return Err(VariantError::BadCast {
                expected: T::type_name().to_string(),
                actual: ops.type_name().to_string(),
            });
        }
        Ok(ops)
    }

    /// Borrow the payload as `T`.
    pub fn get<T: Reflect>(&self) -> Result<&T, VariantError> {
        self.check::<T>()?;
        let ptr = self.storage.as_ptr().ok_or(VariantError::Empty)?;
        // SAFETY: the stored type is `T` and the payload lives as long as `self`.
        Ok(unsafe { ptr.cast::<T>().as_ref() })
    }

    /// Borrow the payload mutably as `T`. Fails on read-only variants.
    pub fn get_mut<T: Reflect>(&mut self) -> Result<&mut T, VariantError> {
        self.check::<T>()?;
        if self.read_only {
            return Err(VariantError::ReadOnly(T::type_name().to_string()));
        }
        let ptr = self
            .storage
            .as_mut_ptr()
            .ok_or_else(|| VariantError::ReadOnly(T::type_name().to_string()))?;
        // SAFETY: the stored type is `T`; owned and exclusive payloads are
        // uniquely reachable through `self`.
        Ok(unsafe { ptr.cast::<T>().as_mut() })
    }

    /// Move the payload out, leaving the variant empty.
    ///
    /// Only owned, writable payloads can be moved from.
    pub fn take<T: Reflect>(&mut self) -> Result<T, VariantError> {
        self.check::<T>()?;
        if self.read_only {
            return Err(VariantError::ReadOnly(T::type_name().to_string()));
        }
        let value = match mem::replace(&mut self.storage, Storage::Empty) {
            // SAFETY: the buffer holds an initialized `T`; clearing `ops`
            // below keeps it from being dropped again.
            Storage::Inline(buffer) => unsafe { buffer.as_ptr().cast::<T>().read() },
            // SAFETY: the pointer came from `Box::<T>::leak`.
            Storage::Boxed(ptr) => *unsafe { Box::from_raw(ptr.as_ptr().cast::<T>()) },
            other => {
                self.storage = other;
                return Err(VariantError::NotOwned(T::type_name().to_string()));
            }
        };
        self.ops = None;
        Ok(value)
    }

    /// Produce a `T`: moved out if owned and writable, copied otherwise.
    pub fn into_value<T: Reflect>(mut self) -> Result<T, VariantError> {
        self.check::<T>()?;
        if self.is_owned() && !self.read_only {
            return self.take();
        }
        self.get::<T>()?
            .clone_value()
            .ok_or_else(|| VariantError::NotCopyable(T::type_name().to_string()))
    }

    /// Produce a `T`, converting through one registered converter if the
    /// stored type differs.
    pub fn to<T: Reflect>(&self) -> Result<T, VariantError> {
        if self.check::<T>().is_ok() {
            return self
                .get::<T>()?
                .clone_value()
                .ok_or_else(|| VariantError::NotCopyable(T::type_name().to_string()));
        }
        if self.is_empty() {
            return Err(VariantError::Empty);
        }
        converters().convert(self, type_id::<T>())?.into_value()
    }

    /// Convert to the type with id `target` through one converter hop.
    pub fn convert(&self, target: TypeId) -> Result<Variant<'static>, ConversionError> {
        converters().convert(self, target)
    }

    // ========================================================================
    // Copy / Move / Swap
    // ========================================================================

    /// Copy this variant.
    ///
    /// Owned payloads are deep-copied into a fresh writable value. Shared
    /// aliases copy the alias. Exclusive aliases cannot be copied.
    pub fn try_clone(&self) -> Result<Variant<'a>, VariantError> {
        let Some(ops) = self.ops else {
            return Ok(Variant::empty());
        };
        match &self.storage {
            Storage::Empty => Ok(Variant::empty()),
            Storage::Shared(ptr) => Ok(Variant {
                ops: Some(ops),
                storage: Storage::Shared(*ptr),
                read_only: true,
                _borrow: PhantomData,
            }),
            Storage::Exclusive(_) => Err(VariantError::NotCopyable(ops.type_name().to_string())),
            Storage::Inline(_) | Storage::Boxed(_) => {
                let ptr = self.storage.as_ptr().ok_or(VariantError::Empty)?;
                // SAFETY: `ptr` addresses a live value of the type `ops` describes.
                unsafe { (ops.clone_value)(ptr) }
                    .ok_or_else(|| VariantError::NotCopyable(ops.type_name().to_string()))
            }
        }
    }

    /// Deep-copy the payload into a fresh owned variant, aliases included.
    pub fn to_owned_variant(&self) -> Result<Variant<'static>, VariantError> {
        let (Some(ops), Some(ptr)) = (self.ops, self.storage.as_ptr()) else {
            return Ok(Variant::empty());
        };
        // SAFETY: `ptr` addresses a live value of the type `ops` describes.
        unsafe { (ops.clone_value)(ptr) }
            .ok_or_else(|| VariantError::NotCopyable(ops.type_name().to_string()))
    }

    /// Move the whole variant out, leaving this one empty.
    pub fn take_variant(&mut self) -> Variant<'a> {
        mem::take(self)
    }

    /// Exchange contents with `other`, ownership mode and read-only flag included.
    pub fn swap(&mut self, other: &mut Variant<'a>) {
        mem::swap(self, other);
    }

    /// Replace the contents with `value`, dropping the old payload.
    pub fn set<T: Reflect>(&mut self, value: T) {
        *self = Variant::new(value);
    }

    /// Drop the payload and become empty.
    pub fn clear(&mut self) {
        self.release();
        self.read_only = false;
    }

    /// A read-only alias of this variant's payload.
    pub fn by_ref(&self) -> Variant<'_> {
        match (self.ops, self.storage.as_ptr()) {
            (Some(ops), Some(ptr)) => Variant {
                ops: Some(ops),
                storage: Storage::Shared(ptr),
                read_only: true,
                _borrow: PhantomData,
            },
            _ => Variant::empty(),
        }
    }

    /// A mutable alias of this variant's payload. Read-only variants give a
    /// read-only alias.
    pub fn by_mut(&mut self) -> Variant<'_> {
        if self.read_only {
            return self.by_ref();
        }
        match (self.ops, self.storage.as_mut_ptr()) {
            (Some(ops), Some(ptr)) => Variant {
                ops: Some(ops),
                storage: Storage::Exclusive(ptr),
                read_only: false,
                _borrow: PhantomData,
            },
            _ => Variant::empty(),
        }
    }

    // ========================================================================
    // Comparison
    // ========================================================================

    /// Compare after converting `other` to this variant's type.
    ///
    /// Same-typed payloads compare directly. Otherwise `other` is converted
    /// through one converter hop; a missing or failing conversion is unequal.
    pub fn loose_eq(&self, other: &Variant<'_>) -> bool {
        if self.is_empty() || other.is_empty() {
            return self.is_empty() && other.is_empty();
        }
        if self.same_type(other) {
            return self == other;
        }
        match converters().convert(other, self.type_id()) {
            Ok(converted) => *self == converted,
            Err(_) => false,
        }
    }

    fn same_type(&self, other: &Variant<'_>) -> bool {
        match (self.ops, other.ops) {
            (Some(a), Some(b)) => a.same_type(b),
            _ => false,
        }
    }

    fn release(&mut self) {
        let storage = mem::replace(&mut self.storage, Storage::Empty);
        let Some(ops) = self.ops.take() else {
            return;
        };
        match storage {
            // SAFETY: owned payloads of the type `ops` describes, released once
            // because `storage` and `ops` have been cleared.
            Storage::Inline(mut buffer) => unsafe { (ops.drop_inline)(buffer.as_mut_ptr()) },
            Storage::Boxed(ptr) => unsafe { (ops.drop_boxed)(ptr.as_ptr()) },
            Storage::Empty | Storage::Shared(_) | Storage::Exclusive(_) => {}
        }
    }
}

impl Drop for Variant<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: Reflect> From<T> for Variant<'static> {
    fn from(value: T) -> Self {
        Variant::new(value)
    }
}

impl<'b> PartialEq<Variant<'b>> for Variant<'_> {
    /// Empty equals only empty. Different stored types are unequal. Types
    /// without an equality hook are never equal.
    fn eq(&self, other: &Variant<'b>) -> bool {
        match (self.ops, other.ops) {
            (None, None) => true,
            (Some(ops), Some(other_ops)) if ops.same_type(other_ops) => {
                match (self.storage.as_ptr(), other.storage.as_ptr()) {
                    // SAFETY: both payloads are live values of the same type.
                    (Some(lhs), Some(rhs)) => unsafe { (ops.eq_value)(lhs, rhs) }.unwrap_or(false),
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Variant<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant")
            .field("type", &self.type_name())
            .field("storage", &self.storage.kind())
            .field("read_only", &self.read_only)
            .finish()
    }
}
