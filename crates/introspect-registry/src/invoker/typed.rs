//! Invokers built from plain Rust functions and closures.
//!
//! The marker type parameters only exist to keep the blanket impls for
//! different arities and receiver kinds apart; callers never name them.

use introspect_core::{IntoReturn, ParamType, Reflect, Signature, Variant};

use super::{Invoker, Receiver};

/// Marker for methods taking `&T`.
pub struct ByRef;

/// Marker for methods taking `&mut T`.
pub struct ByMut;

/// A free function or static method with by-value parameters.
pub trait IntoFunction<Marker>: Send + Sync + 'static {
    fn into_invoker(self, name: &str) -> Invoker;
}

/// A method of `T` whose first parameter is `&T` or `&mut T`.
pub trait IntoMethod<T, Marker>: Send + Sync + 'static {
    fn into_invoker(self, name: &str) -> Invoker;
}

/// A function building a `T`.
pub trait IntoConstructor<T, Marker>: Send + Sync + 'static {
    fn into_invoker(self, name: &str) -> Invoker;
}

macro_rules! impl_into_invokers {
    ($($arg:ident => $idx:tt),*) => {
        impl<F, R, $($arg,)*> IntoFunction<(R, $($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: IntoReturn,
            $($arg: Reflect,)*
        {
            #[allow(unused_variables)]
            fn into_invoker(self, name: &str) -> Invoker {
                let signature = Signature::new()
                    $(.param(ParamType::value::<$arg>()))*
                    .returns_id(R::return_type());
                Invoker::new(name, signature, Receiver::Static, move |args| {
                    (self)($(args.take::<$arg>($idx)?),*).into_return()
                })
            }
        }

        impl<F, T, R, $($arg,)*> IntoMethod<T, (ByRef, R, $($arg,)*)> for F
        where
            F: Fn(&T $(, $arg)*) -> R + Send + Sync + 'static,
            T: Reflect,
            R: IntoReturn,
            $($arg: Reflect,)*
        {
            fn into_invoker(self, name: &str) -> Invoker {
                let signature = Signature::new()
                    $(.param(ParamType::value::<$arg>()))*
                    .returns_id(R::return_type());
                Invoker::new(name, signature, Receiver::of::<T>(), move |args| {
                    let this = args.this::<T>()?;
                    (self)(&*this $(, args.take::<$arg>($idx)?)*).into_return()
                })
            }
        }

        impl<F, T, R, $($arg,)*> IntoMethod<T, (ByMut, R, $($arg,)*)> for F
        where
            F: Fn(&mut T $(, $arg)*) -> R + Send + Sync + 'static,
            T: Reflect,
            R: IntoReturn,
            $($arg: Reflect,)*
        {
            fn into_invoker(self, name: &str) -> Invoker {
                let signature = Signature::new()
                    $(.param(ParamType::value::<$arg>()))*
                    .returns_id(R::return_type());
                Invoker::new(name, signature, Receiver::of_mut::<T>(), move |args| {
                    let mut this = args.this_mut::<T>()?;
                    (self)(&mut *this $(, args.take::<$arg>($idx)?)*).into_return()
                })
            }
        }

        impl<F, T, $($arg,)*> IntoConstructor<T, ($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> T + Send + Sync + 'static,
            T: Reflect,
            $($arg: Reflect,)*
        {
            #[allow(unused_variables)]
            fn into_invoker(self, name: &str) -> Invoker {
                let signature = Signature::new()
                    $(.param(ParamType::value::<$arg>()))*
                    .returns::<T>();
                Invoker::new(name, signature, Receiver::Static, move |args| {
                    Ok(Variant::new((self)($(args.take::<$arg>($idx)?),*)))
                })
            }
        }
    };
}

impl_into_invokers!();
impl_into_invokers!(A0 => 0);
impl_into_invokers!(A0 => 0, A1 => 1);
impl_into_invokers!(A0 => 0, A1 => 1, A2 => 2);
impl_into_invokers!(A0 => 0, A1 => 1, A2 => 2, A3 => 3);
impl_into_invokers!(A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4);
impl_into_invokers!(A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4, A5 => 5);
impl_into_invokers!(A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4, A5 => 5, A6 => 6);
impl_into_invokers!(A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4, A5 => 5, A6 => 6, A7 => 7);
impl_into_invokers!(
    A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4, A5 => 5, A6 => 6, A7 => 7, A8 => 8
);
impl_into_invokers!(
    A0 => 0, A1 => 1, A2 => 2, A3 => 3, A4 => 4, A5 => 5, A6 => 6, A7 => 7, A8 => 8, A9 => 9
);
