//! Directed, single-hop value conversions.
//!
//! The [`ConverterRegistry`] maps an ordered `(from, to)` pair of decayed type
//! ids to one conversion function. Conversions are never chained: if `A -> B`
//! and `B -> C` exist, `A -> C` still fails unless registered itself.
//!
//! The global registry ([`converters`]) comes with the standard conversions
//! between primitive numbers, `bool` and `String`.
//!
//! # Example
//!
//! ```
//! use introspect_core::{ConversionError, Reflect, Variant, converters, type_id};
//!
//! #[derive(Clone)]
//! struct Meters(f64);
//!
//! impl Reflect for Meters {
//!     fn type_name() -> &'static str {
//!         "convert_doc::Meters"
//!     }
//! }
//!
//! converters()
//!     .register_fn(|m: &Meters| Ok::<_, ConversionError>(m.0 * 100.0))
//!     .unwrap();
//!
//! let centimeters = Variant::new(Meters(1.5)).to::<f64>().unwrap();
//! assert_eq!(centimeters, 150.0);
//! assert!(converters().can_convert(type_id::<Meters>(), type_id::<f64>()));
//! assert!(!converters().can_convert(type_id::<Meters>(), type_id::<f32>()));
//! ```

use std::fmt::Display;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::{ConversionError, Reflect, RegistrationError, TypeId, Variant, type_id};

/// A type-erased conversion function.
pub type ConvertFn =
    dyn Fn(&Variant<'_>) -> Result<Variant<'static>, ConversionError> + Send + Sync;

/// Get the global converter registry, with the standard conversions installed.
pub fn converters() -> &'static ConverterRegistry {
    static REGISTRY: OnceLock<ConverterRegistry> = OnceLock::new();
    REGISTRY.get_or_init(ConverterRegistry::with_standard)
}

/// Map of directed conversions between decayed types.
#[derive(Default)]
pub struct ConverterRegistry {
    table: RwLock<FxHashMap<(TypeId, TypeId), Arc<ConvertFn>>>,
}

impl ConverterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the standard primitive conversions.
    pub fn with_standard() -> Self {
        let registry = Self::new();
        install_standard(&registry);
        registry
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a conversion from `S` to `D` through a custom function.
    pub fn register_fn<S, D, F>(&self, convert: F) -> Result<(), RegistrationError>
    where
        S: Reflect,
        D: Reflect,
        F: Fn(&S) -> Result<D, ConversionError> + Send + Sync + 'static,
    {
        let function = erase(move |value: &Variant<'_>| {
            let source = value.get::<S>().map_err(|e| failed::<S, D>(e))?;
            convert(source).map(Variant::new)
        });
        self.register_raw(type_id::<S>(), type_id::<D>(), function)
    }

    /// Register a conversion from `S` to `D` through `D: From<S>`.
    pub fn register_from<S, D>(&self) -> Result<(), RegistrationError>
    where
        S: Reflect + Clone,
        D: Reflect + From<S>,
    {
        self.register_fn(|value: &S| Ok(D::from(value.clone())))
    }

    /// Register a conversion from `S` to `D` through `D: TryFrom<S>`.
    ///
    /// A value the `TryFrom` implementation rejects is a runtime conversion
    /// failure, not a registration failure.
    pub fn register_try_from<S, D>(&self) -> Result<(), RegistrationError>
    where
        S: Reflect + Clone,
        D: Reflect + TryFrom<S>,
        D::Error: Display,
    {
        self.register_fn(|value: &S| D::try_from(value.clone()).map_err(|e| failed::<S, D>(e)))
    }

    /// Register a type-erased conversion between two type ids.
    ///
    /// Both ids are decayed first. Identity pairs are implicit and duplicate
    /// pairs are rejected.
    pub fn register_raw(
        &self,
        from: TypeId,
        to: TypeId,
        function: Arc<ConvertFn>,
    ) -> Result<(), RegistrationError> {
        let (from, to) = (from.decayed(), to.decayed());
        if !from.is_valid() || !to.is_valid() {
            return Err(RegistrationError::TypeNotRegistered(format!("{} -> {}", from, to)));
        }
        if from == to {
            return Err(RegistrationError::IdentityConverter(from.to_string()));
        }
        {
            let mut table = self.table.write();
            if table.contains_key(&(from, to)) {
                return Err(RegistrationError::DuplicateConverter {
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }
            table.insert((from, to), function);
        }
        debug!(from = %from, to = %to, "registered converter");
        Ok(())
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Find the converter for a pair of decayed types.
    pub fn find(&self, from: TypeId, to: TypeId) -> Option<Arc<ConvertFn>> {
        self.table.read().get(&(from.decayed(), to.decayed())).cloned()
    }

    /// Check whether a value of `from` can be turned into `to`.
    ///
    /// Same decayed types always can; otherwise a direct converter must exist.
    pub fn can_convert(&self, from: TypeId, to: TypeId) -> bool {
        let (from, to) = (from.decayed(), to.decayed());
        from.is_valid() && (from == to || self.table.read().contains_key(&(from, to)))
    }

    /// Convert `value` to the type `to`.
    ///
    /// Same decayed types copy the payload. Otherwise the direct converter is
    /// applied; a missing converter or a rejected value is an error.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn convert(
        &self,
        value: &Variant<'_>,
        to: TypeId,
    ) -> Result<Variant<'static>, ConversionError> {
        let from = value.type_id();
        let target = to.decayed();
        if from == target && from.is_valid() {
            return value
                .to_owned_variant()
                .map_err(|e| ConversionError::Failed {
                    from: from.to_string(),
                    to: target.to_string(),
                    reason: e.to_string(),
                });
        }
        // Release the lock before running user code.
        let function = self.find(from, target).ok_or_else(|| ConversionError::NoConverter {
            from: value.type_name().to_string(),
            to: target.to_string(),
        })?;
        function(value)
    }

    /// Number of registered conversions.
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Install a standard conversion, skipping identity pairs.
    fn install<S, D, F>(&self, convert: F)
    where
        S: Reflect,
        D: Reflect,
        F: Fn(&S) -> Result<D, ConversionError> + Send + Sync + 'static,
    {
        if std::any::TypeId::of::<S>() == std::any::TypeId::of::<D>() {
            return;
        }
        if let Err(e) = self.register_fn(convert) {
            debug!(error = %e, "standard converter skipped");
        }
    }
}

fn erase<F>(function: F) -> Arc<ConvertFn>
where
    F: Fn(&Variant<'_>) -> Result<Variant<'static>, ConversionError> + Send + Sync + 'static,
{
    Arc::new(function)
}

fn failed<S: Reflect, D: Reflect>(reason: impl Display) -> ConversionError {
    ConversionError::Failed {
        from: S::type_name().to_string(),
        to: D::type_name().to_string(),
        reason: reason.to_string(),
    }
}

fn overflow<S: Reflect, D: Reflect>(value: impl Display) -> ConversionError {
    ConversionError::Overflow {
        value: value.to_string(),
        from: S::type_name().to_string(),
        to: D::type_name().to_string(),
    }
}

// ============================================================================
// Standard Conversions
// ============================================================================

/// Expand `$leaf!(registry, S, D)` for every `S` in the first list and every
/// `D` in the second.
macro_rules! each_pair {
    ($registry:ident, [$($s:ty),*], $targets:tt, $leaf:ident) => {
        $( each_pair!(@row $registry, $s, $targets, $leaf); )*
    };
    (@row $registry:ident, $s:ty, [$($d:ty),*], $leaf:ident) => {
        $( $leaf!($registry, $s, $d); )*
    };
}

macro_rules! int_to_int {
    ($registry:ident, $s:ty, $d:ty) => {
        $registry.install(|v: &$s| <$d>::try_from(*v).map_err(|_| overflow::<$s, $d>(v)))
    };
}

macro_rules! int_to_float {
    ($registry:ident, $s:ty, $d:ty) => {
        $registry.install(|v: &$s| Ok(*v as $d))
    };
}

macro_rules! float_to_float {
    ($registry:ident, $s:ty, $d:ty) => {
        $registry.install(|v: &$s| Ok(*v as $d))
    };
}

macro_rules! float_to_int {
    ($registry:ident, $s:ty, $d:ty) => {
        $registry.install(|v: &$s| {
            if !v.is_finite() {
                return Err(failed::<$s, $d>("value is not finite"));
            }
            let truncated = v.trunc();
            // `MAX as float` rounds up for 64-bit targets, so compare against
            // the exact power of two one past it.
            let end = (<$d>::MAX / 2 + 1) as $s * 2.0;
            if truncated < <$d>::MIN as $s || truncated >= end {
                return Err(overflow::<$s, $d>(v));
            }
            Ok(truncated as $d)
        })
    };
}

macro_rules! to_string {
    ($registry:ident, $s:ty, $d:ty) => {
        $registry.install(|v: &$s| Ok::<$d, ConversionError>(v.to_string()))
    };
}

macro_rules! parse_string {
    ($registry:ident, $s:ty, $d:ty) => {
        $registry.install(|v: &$s| v.trim().parse::<$d>().map_err(|e| failed::<$s, $d>(e)))
    };
}

macro_rules! bool_to_number {
    ($registry:ident, $s:ty, $d:ty) => {
        $registry.install(|v: &$s| Ok(u8::from(*v) as $d))
    };
}

macro_rules! number_to_bool {
    ($registry:ident, $s:ty, $d:ty) => {
        $registry.install(|v: &$s| Ok::<$d, ConversionError>(*v != (0 as $s)))
    };
}

fn install_standard(registry: &ConverterRegistry) {
    each_pair!(
        registry,
        [i8, i16, i32, i64, u8, u16, u32, u64, isize, usize],
        [i8, i16, i32, i64, u8, u16, u32, u64, isize, usize],
        int_to_int
    );
    each_pair!(
        registry,
        [i8, i16, i32, i64, u8, u16, u32, u64, isize, usize],
        [f32, f64],
        int_to_float
    );
    each_pair!(registry, [f32, f64], [f32, f64], float_to_float);
    each_pair!(
        registry,
        [f32, f64],
        [i8, i16, i32, i64, u8, u16, u32, u64, isize, usize],
        float_to_int
    );
    each_pair!(
        registry,
        [bool, char, i8, i16, i32, i64, u8, u16, u32, u64, isize, usize, f32, f64],
        [String],
        to_string
    );
    each_pair!(
        registry,
        [String],
        [bool, char, i8, i16, i32, i64, u8, u16, u32, u64, isize, usize, f32, f64],
        parse_string
    );
    each_pair!(
        registry,
        [bool],
        [i8, i16, i32, i64, u8, u16, u32, u64, isize, usize, f32, f64],
        bool_to_number
    );
    each_pair!(
        registry,
        [i8, i16, i32, i64, u8, u16, u32, u64, isize, usize, f32, f64],
        [bool],
        number_to_bool
    );
    debug!(count = registry.len(), "installed standard converters");
}
