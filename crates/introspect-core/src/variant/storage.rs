//! Payload storage for [`Variant`](super::Variant).
//!
//! Values that fit in [`INLINE_SIZE`] bytes with at most 8-byte alignment are
//! stored in place; larger values are boxed. Aliases store only the address
//! of a value owned elsewhere.

use std::mem::MaybeUninit;
use std::ptr::NonNull;

/// Bytes available for inline storage.
pub const INLINE_SIZE: usize = 3 * size_of::<usize>();

/// Alignment guaranteed by inline storage.
pub const INLINE_ALIGN: usize = 8;

/// Check whether `T` is stored inline.
pub const fn fits_inline<T>() -> bool {
    size_of::<T>() <= INLINE_SIZE && align_of::<T>() <= INLINE_ALIGN
}

/// Raw, uninitialized bytes for an inline payload.
#[repr(C, align(8))]
pub(crate) struct InlineBuffer([MaybeUninit<u8>; INLINE_SIZE]);

impl InlineBuffer {
    /// Move `value` into a fresh buffer.
    ///
    /// # Safety
    ///
    /// `fits_inline::<T>()` must hold. The buffer does not drop `value`; the
    /// owner must release it through the matching operations table.
    pub(crate) unsafe fn new<T>(value: T) -> Self {
        debug_assert!(fits_inline::<T>());
        let mut buffer = InlineBuffer([MaybeUninit::uninit(); INLINE_SIZE]);
        // SAFETY: size and alignment checked by the caller.
        unsafe { buffer.as_mut_ptr().cast::<T>().write(value) };
        buffer
    }

    pub(crate) fn as_ptr(&self) -> *const u8 {
        self.0.as_ptr().cast()
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut u8 {
        self.0.as_mut_ptr().cast()
    }
}

/// Where a variant's payload lives.
pub(crate) enum Storage {
    Empty,
    /// Owned, stored in place.
    Inline(InlineBuffer),
    /// Owned, heap allocated through `Box<T>`.
    Boxed(NonNull<u8>),
    /// Aliases a value through a shared borrow.
    Shared(NonNull<u8>),
    /// Aliases a value through an exclusive borrow.
    Exclusive(NonNull<u8>),
}

impl Storage {
    pub(crate) fn boxed<T>(value: T) -> Self {
        Storage::Boxed(NonNull::from(Box::leak(Box::new(value))).cast())
    }

    pub(crate) fn is_owned(&self) -> bool {
        matches!(self, Storage::Inline(_) | Storage::Boxed(_))
    }

    pub(crate) fn is_alias(&self) -> bool {
        matches!(self, Storage::Shared(_) | Storage::Exclusive(_))
    }

    /// Address of the payload for reading.
    pub(crate) fn as_ptr(&self) -> Option<NonNull<u8>> {
        match self {
            Storage::Empty => None,
            Storage::Inline(buffer) => NonNull::new(buffer.as_ptr().cast_mut()),
            Storage::Boxed(ptr) | Storage::Shared(ptr) | Storage::Exclusive(ptr) => Some(*ptr),
        }
    }

    /// Address of the payload for writing. `None` for empty and shared storage.
    pub(crate) fn as_mut_ptr(&mut self) -> Option<NonNull<u8>> {
        match self {
            Storage::Empty | Storage::Shared(_) => None,
            Storage::Inline(buffer) => NonNull::new(buffer.as_mut_ptr()),
            Storage::Boxed(ptr) | Storage::Exclusive(ptr) => Some(*ptr),
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Storage::Empty => "empty",
            Storage::Inline(_) => "inline",
            Storage::Boxed(_) => "boxed",
            Storage::Shared(_) => "shared alias",
            Storage::Exclusive(_) => "exclusive alias",
        }
    }
}
