//! Invokers - type-erased callables with argument binding.
//!
//! An [`Invoker`] pairs a native body with the [`Signature`] it expects and
//! the kind of object it runs on ([`Receiver`]). Calling it binds the supplied
//! [`Argument`]s to the declared parameters first, all or nothing:
//!
//! 1. the argument count must equal the arity
//! 2. each argument binds by exact decayed type, or through one converter hop
//! 3. value categories are checked per parameter (see [`PassBy`])
//! 4. the object, if any, must cast to the owning class
//!
//! Only when every argument binds does the native body run. Errors it
//! returns are propagated as they are.
//!
//! Typed helpers ([`IntoFunction`], [`IntoMethod`], [`IntoConstructor`])
//! build invokers from plain Rust functions and closures of up to ten
//! by-value parameters, deriving the signature from the parameter types.

mod call_args;
mod typed;

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use introspect_core::{
    Argument, BindFailure, InvokeError, ParamType, PassBy, Reflect, Signature, TypeId,
    ValueCategory, ValueOps, Variant, converters,
};

use crate::ClassGraph;

pub use call_args::CallArgs;
pub use typed::{ByMut, ByRef, IntoConstructor, IntoFunction, IntoMethod};

/// The erased body of a registered callable.
pub type NativeFn =
    dyn Fn(&CallArgs<'_, '_>) -> Result<Variant<'static>, InvokeError> + Send + Sync;

/// What a callable runs on.
#[derive(Debug, Clone, Copy)]
pub enum Receiver {
    /// Free functions, static methods and constructors.
    Static,
    /// Methods of the class `ops` describes.
    Object {
        ops: &'static ValueOps,
        /// Whether the method needs a mutable object.
        mutable: bool,
    },
}

impl Receiver {
    /// A method taking `&T`.
    pub fn of<T: Reflect>() -> Self {
        Receiver::Object {
            ops: ValueOps::of::<T>(),
            mutable: false,
        }
    }

    /// A method taking `&mut T`.
    pub fn of_mut<T: Reflect>() -> Self {
        Receiver::Object {
            ops: ValueOps::of::<T>(),
            mutable: true,
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, Receiver::Static)
    }

    /// The owning class of a method.
    pub fn owner(&self) -> Option<TypeId> {
        match self {
            Receiver::Static => None,
            Receiver::Object { ops, .. } => Some(ops.type_id()),
        }
    }
}

/// How a checked argument will be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    /// The argument is passed as it is.
    Direct,
    /// A by-value parameter gets a copy of a borrowed value.
    Copy,
    /// One converter hop produces a temporary.
    Convert,
}

/// A registered callable.
#[derive(Clone)]
pub struct Invoker {
    name: Arc<str>,
    signature: Signature,
    receiver: Receiver,
    body: Arc<NativeFn>,
}

impl Invoker {
    /// Wrap `body` with an explicit signature.
    pub fn new<F>(name: &str, signature: Signature, receiver: Receiver, body: F) -> Self
    where
        F: Fn(&CallArgs<'_, '_>) -> Result<Variant<'static>, InvokeError> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            signature,
            receiver,
            body: Arc::new(body),
        }
    }

    /// A free function with an explicit signature.
    pub fn function<F>(name: &str, signature: Signature, body: F) -> Self
    where
        F: Fn(&CallArgs<'_, '_>) -> Result<Variant<'static>, InvokeError> + Send + Sync + 'static,
    {
        Self::new(name, signature, Receiver::Static, body)
    }

    /// A method of `T` taking `&T`, with an explicit signature.
    pub fn method<T, F>(name: &str, signature: Signature, body: F) -> Self
    where
        T: Reflect,
        F: Fn(&CallArgs<'_, '_>) -> Result<Variant<'static>, InvokeError> + Send + Sync + 'static,
    {
        Self::new(name, signature, Receiver::of::<T>(), body)
    }

    /// A method of `T` taking `&mut T`, with an explicit signature.
    pub fn method_mut<T, F>(name: &str, signature: Signature, body: F) -> Self
    where
        T: Reflect,
        F: Fn(&CallArgs<'_, '_>) -> Result<Variant<'static>, InvokeError> + Send + Sync + 'static,
    {
        Self::new(name, signature, Receiver::of_mut::<T>(), body)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn arity(&self) -> usize {
        self.signature.arity()
    }

    pub fn receiver(&self) -> Receiver {
        self.receiver
    }

    pub fn is_static(&self) -> bool {
        self.receiver.is_static()
    }

    // ========================================================================
    // Binding
    // ========================================================================

    /// Check whether the arguments would bind, without consuming them.
    ///
    /// Used to pick among overloads. A successful check can still fail to
    /// bind when a conversion or copy rejects the actual value.
    pub fn check(
        &self,
        graph: &ClassGraph,
        this: Option<&Argument<'_>>,
        args: &[Argument<'_>],
    ) -> Result<(), InvokeError> {
        self.conversions(graph, this, args).map(|_| ())
    }

    /// Like [`check`](Self::check), counting the arguments that would need
    /// a converter to bind.
    pub fn conversions(
        &self,
        graph: &ClassGraph,
        this: Option<&Argument<'_>>,
        args: &[Argument<'_>],
    ) -> Result<usize, InvokeError> {
        self.check_arity(args.len())?;
        self.check_this(graph, this)?;
        let mut converted = 0;
        for (index, (param, arg)) in self.signature.params().iter().zip(args).enumerate() {
            let binding = check_argument(param, arg)
                .map_err(|reason| self.unbindable(index, param, reason))?;
            if binding == Binding::Convert {
                converted += 1;
            }
        }
        Ok(converted)
    }

    /// Bind `args` (and `this`) to the parameters.
    pub fn bind<'g, 'a>(
        &'g self,
        graph: &'g ClassGraph,
        this: Option<Argument<'a>>,
        args: Vec<Argument<'a>>,
    ) -> Result<CallArgs<'g, 'a>, InvokeError> {
        self.check_arity(args.len())?;
        self.check_this(graph, this.as_ref())?;

        let mut bound = Vec::with_capacity(args.len());
        for (index, (param, arg)) in self.signature.params().iter().zip(args).enumerate() {
            let value =
                bind_argument(param, arg).map_err(|reason| self.unbindable(index, param, reason))?;
            bound.push(value);
        }

        let this = this.map(|arg| {
            let mut value = arg.into_variant();
            if let Receiver::Object { mutable: false, .. } = self.receiver {
                value.make_read_only();
            }
            value
        });

        Ok(CallArgs::new(&self.name, graph, this, bound))
    }

    /// Bind the arguments and run the body.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn invoke<'a>(
        &self,
        graph: &ClassGraph,
        this: Option<Argument<'a>>,
        args: Vec<Argument<'a>>,
    ) -> Result<Variant<'static>, InvokeError> {
        let call = self.bind(graph, this, args)?;
        trace!(name = %self.name, signature = %self.signature, "invoking");
        (self.body)(&call)
    }

    fn check_arity(&self, actual: usize) -> Result<(), InvokeError> {
        if actual != self.arity() {
            return Err(InvokeError::ArityMismatch {
                name: self.name.to_string(),
                expected: self.arity(),
                actual,
            });
        }
        Ok(())
    }

    fn check_this(&self, graph: &ClassGraph, this: Option<&Argument<'_>>) -> Result<(), InvokeError> {
        let name = || self.name.to_string();
        match (self.receiver, this) {
            (Receiver::Static, None) => Ok(()),
            (Receiver::Static, Some(_)) => Err(InvokeError::UnexpectedThis(name())),
            (Receiver::Object { .. }, None) => Err(InvokeError::MissingThis(name())),
            (Receiver::Object { ops, mutable }, Some(arg)) => {
                let value = arg.variant();
                if value.is_empty() {
                    return Err(InvokeError::MissingThis(name()));
                }
                if mutable && (arg.category() == ValueCategory::Const || value.is_read_only()) {
                    return Err(InvokeError::ConstThis(name()));
                }
                if graph.variant_ptr(value, ops.type_id()).is_none() {
                    trace!(name = %self.name, object = value.type_name(), "object does not cast to owner");
                    return Err(InvokeError::IncompatibleThis {
                        name: name(),
                        owner: ops.type_name().to_string(),
                        actual: value.type_name().to_string(),
                    });
                }
                Ok(())
            }
        }
    }

    fn unbindable(&self, index: usize, param: &ParamType, reason: BindFailure) -> InvokeError {
        trace!(name = %self.name, index, param = %param, %reason, "argument does not bind");
        InvokeError::Unbindable {
            name: self.name.to_string(),
            index,
            param: param.to_string(),
            reason,
        }
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker")
            .field("name", &self.name)
            .field("signature", &self.signature.to_string())
            .field("receiver", &self.receiver)
            .finish()
    }
}

// ============================================================================
// Argument Binding
// ============================================================================

fn check_argument(param: &ParamType, arg: &Argument<'_>) -> Result<Binding, BindFailure> {
    let value = arg.variant();
    if value.is_empty() {
        return Err(BindFailure::Empty);
    }
    let exact = value.type_id() == param.type_id;
    let convertible = || {
        if converters().can_convert(value.type_id(), param.type_id) {
            Ok(Binding::Convert)
        } else {
            Err(BindFailure::NoConversion(value.type_name().to_string()))
        }
    };

    match param.pass_by {
        PassBy::MutRef => {
            if !arg.is_lvalue() || value.is_read_only() {
                Err(BindFailure::NeedsMutableLvalue)
            } else if !exact {
                Err(BindFailure::NoConversion(value.type_name().to_string()))
            } else {
                Ok(Binding::Direct)
            }
        }
        PassBy::RvalueRef if exact => {
            if arg.is_rvalue() {
                Ok(Binding::Direct)
            } else {
                Err(BindFailure::NeedsRvalue)
            }
        }
        PassBy::ConstRef if exact => Ok(Binding::Direct),
        PassBy::Value if exact => {
            if arg.is_rvalue() {
                Ok(Binding::Direct)
            } else {
                Ok(Binding::Copy)
            }
        }
        PassBy::RvalueRef | PassBy::ConstRef | PassBy::Value => convertible(),
    }
}

fn bind_argument<'a>(param: &ParamType, arg: Argument<'a>) -> Result<Variant<'a>, BindFailure> {
    let binding = check_argument(param, &arg)?;
    let value = arg.into_variant();
    let bound = match binding {
        Binding::Direct => value,
        Binding::Copy => value
            .to_owned_variant()
            .map_err(|_| BindFailure::NotCopyable(value.type_name().to_string()))?,
        Binding::Convert => converters()
            .convert(&value, param.type_id)
            .map_err(|e| BindFailure::ConversionFailed(e.to_string()))?,
    };
    Ok(match param.pass_by {
        PassBy::ConstRef => bound.read_only(),
        _ => bound,
    })
}
