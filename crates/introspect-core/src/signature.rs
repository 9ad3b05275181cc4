//! Explicit signature descriptions.
//!
//! Rust has no way to ask a closure for its parameter list at runtime, so
//! every invoker is registered together with a [`Signature`]: an ordered list
//! of [`ParamType`]s (decayed type + how the value is passed) and a return
//! type. Typed helpers in the registry crate build these automatically for
//! plain by-value functions; reference parameters are described by hand.
//!
//! # Example
//!
//! ```
//! use introspect_core::{ParamType, PassBy, Signature, type_id};
//!
//! let sig = Signature::new()
//!     .param(ParamType::value::<i32>())
//!     .param(ParamType::mut_ref::<bool>())
//!     .returns::<String>();
//!
//! assert_eq!(sig.arity(), 2);
//! assert_eq!(sig.params()[1].pass_by, PassBy::MutRef);
//! assert_eq!(sig.return_type(), Some(type_id::<String>()));
//! assert_eq!(sig.to_string(), "string(int, bool&)");
//! ```

use std::fmt::{self, Display, Formatter};

use xxhash_rust::xxh64::xxh64;

use crate::{Qualifiers, Reflect, TypeId, type_id, types};

/// How an argument is handed to a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PassBy {
    /// `T`: accepts rvalues, lvalues, consts and converted temporaries.
    #[default]
    Value,
    /// `const T&`: same binding rules as by-value, no copy is made.
    ConstRef,
    /// `T&`: requires a mutable lvalue of exactly the parameter type.
    MutRef,
    /// `T&&`: requires an rvalue (or a converted temporary).
    RvalueRef,
}

impl PassBy {
    /// Qualifiers matching this passing mode.
    pub fn qualifiers(self) -> Qualifiers {
        match self {
            PassBy::Value => Qualifiers::empty(),
            PassBy::ConstRef => Qualifiers::CONST | Qualifiers::LVALUE_REF,
            PassBy::MutRef => Qualifiers::LVALUE_REF,
            PassBy::RvalueRef => Qualifiers::RVALUE_REF,
        }
    }
}

/// A single parameter: decayed type plus passing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamType {
    /// The decayed parameter type.
    pub type_id: TypeId,
    pub pass_by: PassBy,
}

impl ParamType {
    pub fn new(type_id: TypeId, pass_by: PassBy) -> Self {
        Self {
            type_id: type_id.decayed(),
            pass_by,
        }
    }

    /// `T`
    pub fn value<T: Reflect>() -> Self {
        Self::new(type_id::<T>(), PassBy::Value)
    }

    /// `const T&`
    pub fn const_ref<T: Reflect>() -> Self {
        Self::new(type_id::<T>(), PassBy::ConstRef)
    }

    /// `T&`
    pub fn mut_ref<T: Reflect>() -> Self {
        Self::new(type_id::<T>(), PassBy::MutRef)
    }

    /// `T&&`
    pub fn rvalue<T: Reflect>() -> Self {
        Self::new(type_id::<T>(), PassBy::RvalueRef)
    }

    /// The interned id of the qualified parameter type (e.g. `const int&`).
    pub fn qualified_id(&self) -> TypeId {
        types().qualified(self.type_id, self.pass_by.qualifiers(), 0)
    }
}

impl Display for ParamType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_id())
    }
}

/// Ordered parameter list plus return type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    params: Vec<ParamType>,
    returns: Option<TypeId>,
}

impl Signature {
    /// An empty `void()` signature.
    pub fn new() -> Self {
        Self::default()
    }

    // === Builder Methods ===

    /// Append a parameter.
    pub fn param(mut self, param: ParamType) -> Self {
        self.params.push(param);
        self
    }

    /// Set the return type.
    pub fn returns<T: Reflect>(mut self) -> Self {
        self.returns = Some(type_id::<T>());
        self
    }

    /// Set the return type by id (`None` for void).
    pub fn returns_id(mut self, id: Option<TypeId>) -> Self {
        self.returns = id;
        self
    }

    // === Query Methods ===

    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// The return type, or `None` for void.
    pub fn return_type(&self) -> Option<TypeId> {
        self.returns
    }

    /// Qualified parameter ids, in order.
    pub fn param_ids(&self) -> Vec<TypeId> {
        self.params.iter().map(ParamType::qualified_id).collect()
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.returns {
            Some(id) => write!(f, "{}", id)?,
            None => write!(f, "void")?,
        }
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ")")
    }
}

/// Domain-specific mixing constants for signature hashing.
mod hash_constants {
    /// Separator constant mixed between parameters.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for free functions.
    pub const FUNCTION: u64 = 0x5ea77ffbcdf5f302;

    /// Domain marker for methods.
    pub const METHOD: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for constructors.
    pub const CONSTRUCTOR: u64 = 0x9a7f3d5e2b8c4601;

    /// Parameter position markers, so `(a, b)` and `(b, a)` hash differently.
    pub const PARAM_MARKERS: [u64; 12] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
        0x7c3e9f2a5b8d1403,
        0x5d8c7b4a3e9f2106,
        0x3f1e9d8c7b5a4203,
        0x1a2b3c4d5e6f7089,
    ];
}

/// Key identifying a registered callable by owner, name and parameter types.
///
/// Two registrations with the same key are duplicates; overloads differ in
/// their parameter lists and therefore in their key. Keys are built from
/// [`TypeId`]s, so they are only meaningful within one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SignatureHash(pub u64);

impl SignatureHash {
    /// Key for a free function.
    pub fn from_function(name: &str, params: &[TypeId]) -> Self {
        let seed = hash_constants::FUNCTION ^ xxh64(name.as_bytes(), 0);
        SignatureHash(mix_params(seed, params))
    }

    /// Key for a method of `owner`.
    pub fn from_method(owner: TypeId, name: &str, params: &[TypeId]) -> Self {
        let seed = hash_constants::METHOD ^ u64::from(owner.index()) ^ xxh64(name.as_bytes(), 0);
        SignatureHash(mix_params(seed, params))
    }

    /// Key for a constructor of `owner`.
    pub fn from_constructor(owner: TypeId, params: &[TypeId]) -> Self {
        let seed = hash_constants::CONSTRUCTOR ^ u64::from(owner.index()).rotate_left(17);
        SignatureHash(mix_params(seed, params))
    }
}

fn mix_params(seed: u64, params: &[TypeId]) -> u64 {
    params.iter().enumerate().fold(seed, |hash, (i, param)| {
        let marker = hash_constants::PARAM_MARKERS
            .get(i)
            .copied()
            .unwrap_or_else(|| hash_constants::PARAM_MARKERS[0].wrapping_add(i as u64));
        hash.wrapping_mul(hash_constants::SEP)
            .wrapping_add(marker ^ u64::from(param.index()))
    })
}
