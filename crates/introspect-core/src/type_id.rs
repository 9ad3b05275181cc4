//! Type identity and descriptors.
//!
//! A [`TypeId`] is a small, process-stable handle assigned the first time a
//! type is seen by the [`TypeRegistry`](crate::TypeRegistry). Ids are handed
//! out sequentially, so they are stable for one run of the program but not
//! across runs or builds.
//!
//! Qualified types (`const int&`, `int*`, `int[4]`) get their own ids. Each
//! qualified id links back to its *decayed* id, which is what argument
//! matching and conversion lookups work on.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use bitflags::bitflags;

use crate::types;

/// A process-stable identifier for a (possibly qualified) type.
///
/// `TypeId::INVALID` is never assigned to a registered type and is what
/// lookups report for types that have not been registered yet.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    /// The id reported for unknown or unregistered types.
    pub const INVALID: TypeId = TypeId(0);

    #[inline]
    pub(crate) const fn from_index(index: u32) -> Self {
        TypeId(index)
    }

    /// Get the raw index of this id.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Check whether this id refers to a registered type.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Get the descriptor for this id.
    ///
    /// Returns an invalid descriptor if the id is unknown.
    pub fn info(self) -> TypeInfo {
        types().info(self)
    }

    /// Get the decayed (unqualified) id for this type.
    pub fn decayed(self) -> TypeId {
        types().info(self).decayed()
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

impl Display for TypeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "<invalid>");
        }
        write!(f, "{}", types().info(*self).name())
    }
}

bitflags! {
    /// Qualifiers layered on top of a decayed type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Qualifiers: u8 {
        /// `const T`
        const CONST = 1 << 0;
        /// `T*`
        const POINTER = 1 << 1;
        /// `T&`
        const LVALUE_REF = 1 << 2;
        /// `T&&`
        const RVALUE_REF = 1 << 3;
        /// `T[N]`
        const ARRAY = 1 << 4;
    }
}

impl Qualifiers {
    /// Check whether these qualifiers describe any kind of reference.
    pub fn is_reference(self) -> bool {
        self.intersects(Qualifiers::LVALUE_REF | Qualifiers::RVALUE_REF)
    }

    /// Render a qualified name from a decayed base name.
    pub(crate) fn decorate(self, base: &str, extent: usize) -> String {
        let mut name = String::with_capacity(base.len() + 8);
        if self.contains(Qualifiers::CONST) {
            name.push_str("const ");
        }
        name.push_str(base);
        if self.contains(Qualifiers::ARRAY) {
            name.push_str(&format!("[{}]", extent));
        }
        if self.contains(Qualifiers::POINTER) {
            name.push('*');
        }
        if self.contains(Qualifiers::RVALUE_REF) {
            name.push_str("&&");
        } else if self.contains(Qualifiers::LVALUE_REF) {
            name.push('&');
        }
        name
    }
}

/// Descriptor for a registered type.
///
/// Descriptors are created lazily the first time a type is requested and live
/// for the rest of the process. Cloning is cheap (the name is shared).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    id: TypeId,
    name: Arc<str>,
    size: usize,
    qualifiers: Qualifiers,
    extent: usize,
    decayed: TypeId,
}

impl TypeInfo {
    pub(crate) fn new(
        id: TypeId,
        name: Arc<str>,
        size: usize,
        qualifiers: Qualifiers,
        extent: usize,
        decayed: TypeId,
    ) -> Self {
        Self {
            id,
            name,
            size,
            qualifiers,
            extent,
            decayed,
        }
    }

    /// The descriptor reported for unknown types.
    pub fn invalid() -> Self {
        Self {
            id: TypeId::INVALID,
            name: Arc::from("<invalid>"),
            size: 0,
            qualifiers: Qualifiers::empty(),
            extent: 0,
            decayed: TypeId::INVALID,
        }
    }

    /// Check whether this descriptor refers to a registered type.
    pub fn is_valid(&self) -> bool {
        self.id.is_valid()
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The full (qualified) type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes of a value of this type.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn qualifiers(&self) -> Qualifiers {
        self.qualifiers
    }

    /// Array extent (0 unless the type is an array).
    pub fn extent(&self) -> usize {
        self.extent
    }

    /// The decayed (unqualified) type id. Equal to [`TypeInfo::id`] for plain types.
    pub fn decayed(&self) -> TypeId {
        self.decayed
    }

    pub fn is_const(&self) -> bool {
        self.qualifiers.contains(Qualifiers::CONST)
    }

    pub fn is_pointer(&self) -> bool {
        self.qualifiers.contains(Qualifiers::POINTER)
    }

    pub fn is_lvalue_ref(&self) -> bool {
        self.qualifiers.contains(Qualifiers::LVALUE_REF)
    }

    pub fn is_rvalue_ref(&self) -> bool {
        self.qualifiers.contains(Qualifiers::RVALUE_REF)
    }

    pub fn is_array(&self) -> bool {
        self.qualifiers.contains(Qualifiers::ARRAY)
    }

    /// Check whether this is an unqualified type.
    pub fn is_decayed(&self) -> bool {
        self.is_valid() && self.id == self.decayed
    }
}
