//! Self-reporting dynamic type hook.
//!
//! A reflected object reports its *actual* type through
//! [`Reflect::dynamic_type`]. Most types have no tag and are only their static
//! type. A sub-object that is embedded in a larger registered class can carry
//! a [`DynamicType`] tag that records the most-derived type, a pointer to it
//! and where the sub-object sits inside it, the same information a C++ vtable
//! keeps next to its RTTI slot.
//!
//! Tags can only be created through the unsafe [`DynamicType::within`], and a
//! tag is only honoured while the object carrying it still sits at the
//! recorded offset. Safe code cannot make the cast engine address memory it
//! was not handed.
//!
//! ```
//! use std::mem::offset_of;
//! use std::ptr::NonNull;
//! use introspect_core::{ClassInfo, DynamicType, Reflect, type_id};
//!
//! struct Base {
//!     dynamic: DynamicType,
//!     id: u32,
//! }
//!
//! impl Reflect for Base {
//!     fn type_name() -> &'static str { "doc::Base" }
//!     fn dynamic_type(&self) -> Option<&DynamicType> { Some(&self.dynamic) }
//! }
//!
//! struct Derived {
//!     name: String,
//!     base: Base,
//! }
//!
//! impl Reflect for Derived {
//!     fn type_name() -> &'static str { "doc::Derived" }
//! }
//!
//! let top = NonNull::from(Box::leak(Box::new(Derived {
//!     name: "d".into(),
//!     base: Base { dynamic: DynamicType::none(), id: 7 },
//! })));
//! // SAFETY: the `Derived` is only reached through `top` until it is freed below.
//! unsafe {
//!     (*top.as_ptr()).base.dynamic = DynamicType::within(top, offset_of!(Derived, base));
//! }
//!
//! let base = unsafe { &top.as_ref().base };
//! let info = ClassInfo::of(base);
//! assert_eq!(info.type_id(), type_id::<Derived>());
//! assert_eq!(info.address(), top.cast());
//!
//! drop(unsafe { Box::from_raw(top.as_ptr()) });
//! ```

use std::fmt;
use std::ptr::NonNull;

use crate::{Reflect, TypeId, type_id};

/// The actual type of an object and the address to start casting from.
///
/// Only [`ClassInfo::of`] builds one, from the object itself and the tag it
/// reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassInfo {
    type_id: TypeId,
    address: NonNull<u8>,
    tagged: bool,
}

impl ClassInfo {
    /// Resolve the dynamic type of `object`.
    ///
    /// An untagged object, or one whose tag no longer matches where it sits,
    /// reports exactly its static type and its own address.
    pub fn of<T: Reflect>(object: &T) -> Self {
        let address = NonNull::from(object).cast::<u8>();
        match object.dynamic_type().and_then(|tag| tag.top_of(address)) {
            Some((type_id, top)) => Self {
                type_id,
                address: top,
                tagged: true,
            },
            None => Self {
                type_id: type_id::<T>(),
                address,
                tagged: false,
            },
        }
    }

    /// The object's dynamic (most-derived) type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Address of the most-derived object.
    pub fn address(&self) -> NonNull<u8> {
        self.address
    }

    /// Whether the object reported an enclosing most-derived object.
    pub fn is_tagged(&self) -> bool {
        self.tagged
    }
}

#[derive(Clone, Copy)]
struct TopObject {
    type_id: TypeId,
    address: NonNull<u8>,
    offset: usize,
}

/// Tag recording the most-derived object a sub-object lives in.
///
/// The default tag reports the static type. Copies of a tagged value are new,
/// standalone objects, so cloning always yields an untagged `DynamicType`.
#[derive(Default)]
pub struct DynamicType {
    top: Option<TopObject>,
}

impl DynamicType {
    /// A tag that reports the static type.
    pub const fn none() -> Self {
        Self { top: None }
    }

    /// A tag for a sub-object stored `offset` bytes into the `Top` at `top`.
    ///
    /// # Safety
    ///
    /// `top` must be derived from a pointer to the whole `Top` allocation (for
    /// example `Box::leak` or `Box::into_raw`), not from a reference to one of
    /// its fields. For as long as a value carrying this tag sits `offset`
    /// bytes past `top`, that `Top` must stay live at `top` and the pointer
    /// must remain valid for reads. Moving or freeing the `Top` while the tag
    /// is still installed breaks this, as does moving the tag out into a value
    /// that outlives the `Top`.
    pub unsafe fn within<Top: Reflect>(top: NonNull<Top>, offset: usize) -> Self {
        Self {
            top: Some(TopObject {
                type_id: type_id::<Top>(),
                address: top.cast(),
                offset,
            }),
        }
    }

    /// The recorded most-derived type, if any.
    pub fn most_derived(&self) -> Option<TypeId> {
        self.top.map(|top| top.type_id)
    }

    /// The tagged type and top address for the sub-object at `object`.
    ///
    /// `None` when untagged or when `object` is not where the tag says the
    /// sub-object lives.
    fn top_of(&self, object: NonNull<u8>) -> Option<(TypeId, NonNull<u8>)> {
        let top = self.top?;
        let expected = (top.address.as_ptr() as usize).checked_add(top.offset)?;
        if expected != object.as_ptr() as usize {
            tracing::trace!(
                top = %top.type_id,
                offset = top.offset,
                "dynamic type tag does not match the object's address"
            );
            return None;
        }
        Some((top.type_id, top.address))
    }
}

impl Clone for DynamicType {
    fn clone(&self) -> Self {
        Self::none()
    }
}

impl fmt::Debug for DynamicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.top {
            Some(top) => write!(f, "DynamicType({} @ {})", top.type_id, top.offset),
            None => write!(f, "DynamicType(static)"),
        }
    }
}
