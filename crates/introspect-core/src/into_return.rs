//! Boxing native return values into variants.

use crate::{InvokeError, Reflect, TypeId, Variant, type_id};

/// A value a native callable may return.
///
/// `()` boxes to an empty variant (a `void` return). `Result<T, E>` returns
/// `T` or propagates `E` unmodified as [`InvokeError::Native`].
pub trait IntoReturn {
    /// The declared return type, `None` for void.
    fn return_type() -> Option<TypeId>;

    fn into_return(self) -> Result<Variant<'static>, InvokeError>;
}

impl IntoReturn for () {
    fn return_type() -> Option<TypeId> {
        None
    }

    fn into_return(self) -> Result<Variant<'static>, InvokeError> {
        Ok(Variant::empty())
    }
}

impl<T: Reflect> IntoReturn for T {
    fn return_type() -> Option<TypeId> {
        Some(type_id::<T>())
    }

    fn into_return(self) -> Result<Variant<'static>, InvokeError> {
        Ok(Variant::new(self))
    }
}

impl<T, E> IntoReturn for Result<T, E>
where
    T: IntoReturn,
    E: std::error::Error + Send + Sync + 'static,
{
    fn return_type() -> Option<TypeId> {
        T::return_type()
    }

    fn into_return(self) -> Result<Variant<'static>, InvokeError> {
        self.map_err(InvokeError::native)?.into_return()
    }
}
