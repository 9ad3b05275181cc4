//! Error types for every reflection subsystem.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ReflectError (top-level wrapper)
//! ├── RegistrationError - duplicate or conflicting definitions
//! ├── LookupError       - unregistered types, classes and members
//! ├── CastError         - cross-hierarchy casts between unrelated types
//! ├── VariantError      - typed access to a Variant
//! ├── ConversionError   - converter lookup and runtime conversion failures
//! └── InvokeError       - argument binding and native call failures
//! ```
//!
//! ## Usage
//!
//! Each subsystem returns its own error type. Callers that mix subsystems can
//! use [`ReflectError`] and the `?` operator:
//!
//! ```
//! use introspect_core::{ReflectError, Variant};
//!
//! fn parse_answer(value: &Variant<'_>) -> Result<i32, ReflectError> {
//!     let text = value.get::<String>()?;
//!     Ok(text.len() as i32)
//! }
//!
//! assert_eq!(parse_answer(&Variant::new(String::from("abc"))).unwrap(), 3);
//! assert!(parse_answer(&Variant::new(3i32)).is_err());
//! ```

use std::fmt;

use thiserror::Error;

/// Result alias defaulting to [`ReflectError`].
pub type Result<T, E = ReflectError> = std::result::Result<T, E>;

/// Kind of registered symbol, used in registration and lookup errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Type,
    Class,
    Namespace,
    Function,
    Method,
    Constructor,
    Property,
    Enum,
    EnumValue,
    Attribute,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SymbolKind::Type => "type",
            SymbolKind::Class => "class",
            SymbolKind::Namespace => "namespace",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Property => "property",
            SymbolKind::Enum => "enum",
            SymbolKind::EnumValue => "enum value",
            SymbolKind::Attribute => "attribute",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors raised while registering types, classes, members and converters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A symbol with this name (or signature) already exists in its scope.
    #[error("duplicate {kind}: '{name}' is already registered")]
    Duplicate { kind: SymbolKind, name: String },

    /// A converter for this ordered pair already exists.
    #[error("duplicate converter: {from} -> {to}")]
    DuplicateConverter { from: String, to: String },

    /// Converters between a type and itself are implicit.
    #[error("identity converter for '{0}' is implicit and cannot be registered")]
    IdentityConverter(String),

    /// An enum already has a value with this name.
    #[error("duplicate enum value: '{value_name}' in enum '{enum_name}'")]
    DuplicateEnumValue {
        enum_name: String,
        value_name: String,
    },

    /// A class was registered as its own base.
    #[error("class '{0}' cannot inherit from itself")]
    SelfInheritance(String),

    /// Adding the base edge would create an inheritance cycle.
    #[error("circular inheritance: '{derived}' is already a base of '{base}'")]
    CircularInheritance { derived: String, base: String },

    /// A callable declares more parameters than the configured ceiling.
    #[error("'{name}' takes {arity} parameters, the limit is {max}")]
    TooManyParameters {
        name: String,
        arity: usize,
        max: usize,
    },

    /// Names must be non-empty and must not contain the scope separator.
    #[error("invalid {kind} name: '{name}'")]
    InvalidName { kind: SymbolKind, name: String },

    /// A registration referenced a type id the type registry has never seen.
    #[error("type not registered: {0}")]
    TypeNotRegistered(String),
}

// ============================================================================
// Lookup Errors
// ============================================================================

/// Errors raised by by-name or by-id lookups that must produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("{kind} not found: '{name}'")]
    NotFound { kind: SymbolKind, name: String },
}

impl LookupError {
    pub fn not_found(kind: SymbolKind, name: impl Into<String>) -> Self {
        LookupError::NotFound {
            kind,
            name: name.into(),
        }
    }
}

// ============================================================================
// Cast Errors
// ============================================================================

/// Errors raised by the reference-returning cast APIs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CastError {
    /// No path exists, or the object's dynamic type does not confirm it.
    #[error("bad meta cast: '{from}' cannot be cast to '{to}'")]
    BadMetaCast { from: String, to: String },

    /// The only path to the target goes through a shared (const-only) base.
    #[error("'{from}' reaches '{to}' only through a shared base, no mutable path exists")]
    ImmutablePath { from: String, to: String },
}

// ============================================================================
// Conversion Errors
// ============================================================================

/// Errors raised by the converter registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// No single-hop converter exists for the pair.
    #[error("no converter from '{from}' to '{to}'")]
    NoConverter { from: String, to: String },

    /// The converter ran and rejected the value.
    #[error("bad conversion from '{from}' to '{to}': {reason}")]
    Failed {
        from: String,
        to: String,
        reason: String,
    },

    /// A numeric value does not fit in the destination type.
    #[error("overflow converting {value} from '{from}' to '{to}'")]
    Overflow {
        value: String,
        from: String,
        to: String,
    },
}

// ============================================================================
// Variant Errors
// ============================================================================

/// Errors raised by typed access to a [`Variant`](crate::Variant).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariantError {
    /// The variant holds no value.
    #[error("variant is empty")]
    Empty,

    /// The stored type differs from the requested one.
    #[error("bad variant cast: expected '{expected}', found '{actual}'")]
    BadCast { expected: String, actual: String },

    /// Mutable access to a read-only variant.
    #[error("variant holding '{0}' is read-only")]
    ReadOnly(String),

    /// Moving out of a variant that aliases a value it does not own.
    #[error("variant holding '{0}' does not own its value")]
    NotOwned(String),

    /// Copying a value whose type has no copy hook, or an exclusive alias.
    #[error("variant holding '{0}' cannot be copied")]
    NotCopyable(String),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

// ============================================================================
// Invocation Errors
// ============================================================================

/// Why a single argument could not be bound to its parameter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindFailure {
    /// `T&` parameters need an addressable, non-const lvalue of exactly `T`.
    #[error("a mutable lvalue is required")]
    NeedsMutableLvalue,

    /// `T&&` parameters do not bind to named values.
    #[error("an rvalue is required")]
    NeedsRvalue,

    #[error("no conversion from '{0}'")]
    NoConversion(String),

    #[error("conversion failed: {0}")]
    ConversionFailed(String),

    #[error("argument is empty")]
    Empty,

    /// A by-value parameter received an alias to a value that cannot be copied.
    #[error("'{0}' cannot be copied")]
    NotCopyable(String),
}

/// Errors raised while binding arguments or running a registered callable.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("'{name}' expects {expected} arguments, got {actual}")]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("'{name}': argument {index} cannot bind to parameter '{param}': {reason}")]
    Unbindable {
        name: String,
        index: usize,
        param: String,
        reason: BindFailure,
    },

    #[error("method '{0}' requires an object")]
    MissingThis(String),

    #[error("'{0}' is static and takes no object")]
    UnexpectedThis(String),

    /// A mutating method was called on a const object.
    #[error("method '{0}' mutates its object, which is const")]
    ConstThis(String),

    /// The object cannot be cast to the method's owning class.
    #[error("'{name}': object of type '{actual}' is not a '{owner}'")]
    IncompatibleThis {
        name: String,
        owner: String,
        actual: String,
    },

    #[error("no constructor of '{0}' matches the arguments")]
    NoMatchingConstructor(String),

    #[error("property '{0}' is read-only")]
    ReadOnlyProperty(String),

    /// A native body asked for an argument past the end of the list.
    #[error("argument index {index} out of bounds ({len} arguments)")]
    ArgumentIndexOutOfBounds { index: usize, len: usize },

    /// A native body borrowed an argument (or the object) twice incompatibly.
    #[error("{0} is already borrowed")]
    ArgumentBorrowed(String),

    #[error(transparent)]
    Variant(#[from] VariantError),

    /// Error raised by the native callable, propagated unmodified.
    #[error(transparent)]
    Native(Box<dyn std::error::Error + Send + Sync>),
}

impl InvokeError {
    /// Wrap an error produced by a native callable.
    pub fn native(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        InvokeError::Native(Box::new(error))
    }

    /// Check if binding failed before the native callable ran.
    pub fn is_binding(&self) -> bool {
        matches!(
            self,
            InvokeError::ArityMismatch { .. }
                | InvokeError::Unbindable { .. }
                | InvokeError::MissingThis(_)
                | InvokeError::UnexpectedThis(_)
                | InvokeError::ConstThis(_)
                | InvokeError::IncompatibleThis { .. }
                | InvokeError::NoMatchingConstructor(_)
        )
    }
}

impl From<ConversionError> for InvokeError {
    fn from(error: ConversionError) -> Self {
        InvokeError::Variant(VariantError::Conversion(error))
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// The unified error type for all reflection operations.
#[derive(Debug, Error)]
pub enum ReflectError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Cast(#[from] CastError),

    #[error(transparent)]
    Variant(#[from] VariantError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Invoke(#[from] InvokeError),
}

impl ReflectError {
    pub fn is_registration(&self) -> bool {
        matches!(self, ReflectError::Registration(_))
    }

    pub fn is_lookup(&self) -> bool {
        matches!(self, ReflectError::Lookup(_))
    }

    pub fn is_cast(&self) -> bool {
        matches!(self, ReflectError::Cast(_))
    }

    pub fn is_invoke(&self) -> bool {
        matches!(self, ReflectError::Invoke(_))
    }
}
