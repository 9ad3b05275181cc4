//! Bound arguments handed to native callables.

use std::cell::{Ref, RefCell, RefMut};

use introspect_core::{InvokeError, Reflect, TypeId, Variant, VariantError, type_id};

use crate::ClassGraph;

/// The arguments of one call, already bound to the callable's parameters.
///
/// Each argument sits in its own cell so a native body can hold several
/// typed borrows at once, the way a native function holds its parameters.
/// Borrowing the same argument mutably twice is reported as
/// [`InvokeError::ArgumentBorrowed`] rather than panicking.
///
/// ```ignore
/// let invoker = Invoker::new("scale", signature, Receiver::Static, |args| {
///     let factor: f64 = args.take(0)?;
///     let mut values = args.get_mut::<Vec<f64>>(1)?;
///     values.iter_mut().for_each(|v| *v *= factor);
///     Ok(Variant::empty())
/// });
/// ```
pub struct CallArgs<'g, 'a> {
    name: &'g str,
    graph: &'g ClassGraph,
    this: Option<RefCell<Variant<'a>>>,
    args: Vec<RefCell<Variant<'a>>>,
}

impl<'g, 'a> CallArgs<'g, 'a> {
    pub(crate) fn new(
        name: &'g str,
        graph: &'g ClassGraph,
        this: Option<Variant<'a>>,
        args: Vec<Variant<'a>>,
    ) -> Self {
        Self {
            name,
            graph,
            this: this.map(RefCell::new),
            args: args.into_iter().map(RefCell::new).collect(),
        }
    }

    /// Name of the callable being run.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Number of arguments, not counting the object.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn has_this(&self) -> bool {
        self.this.is_some()
    }

    fn slot(&self, index: usize) -> Result<&RefCell<Variant<'a>>, InvokeError> {
        self.args
            .get(index)
            .ok_or(InvokeError::ArgumentIndexOutOfBounds {
                index,
                len: self.args.len(),
            })
    }

    // ========================================================================
    // Arguments
    // ========================================================================

    /// Type of the argument at `index`.
    pub fn type_id(&self, index: usize) -> Result<TypeId, InvokeError> {
        Ok(self.variant(index)?.type_id())
    }

    /// Borrow the argument at `index` as a variant.
    pub fn variant(&self, index: usize) -> Result<Ref<'_, Variant<'a>>, InvokeError> {
        self.slot(index)?
            .try_borrow()
            .map_err(|_| InvokeError::ArgumentBorrowed(format!("argument {}", index)))
    }

    /// Borrow the argument at `index` as `T`.
    pub fn get<T: Reflect>(&self, index: usize) -> Result<Ref<'_, T>, InvokeError> {
        let value = self.variant(index)?;
        Ref::filter_map(value, |v| v.get::<T>().ok())
            .map_err(|v| InvokeError::from(mismatch::<T>(&v)))
    }

    /// Borrow the argument at `index` mutably as `T`.
    ///
    /// Fails for const-bound arguments.
    pub fn get_mut<T: Reflect>(&self, index: usize) -> Result<RefMut<'_, T>, InvokeError> {
        let value = self.slot(index)?
            .try_borrow_mut()
            .map_err(|_| InvokeError::ArgumentBorrowed(format!("argument {}", index)))?;
        RefMut::filter_map(value, |v| v.get_mut::<T>().ok())
            .map_err(|v| InvokeError::from(mismatch::<T>(&v)))
    }

    /// Move the argument at `index` out as `T`, copying it if it is borrowed.
    ///
    /// The slot is left empty.
    pub fn take<T: Reflect>(&self, index: usize) -> Result<T, InvokeError> {
        let mut value = self.slot(index)?
            .try_borrow_mut()
            .map_err(|_| InvokeError::ArgumentBorrowed(format!("argument {}", index)))?;
        Ok(value.take_variant().into_value::<T>()?)
    }

    // ========================================================================
    // Object
    // ========================================================================

    fn this_cell(&self) -> Result<&RefCell<Variant<'a>>, InvokeError> {
        self.this
            .as_ref()
            .ok_or_else(|| InvokeError::MissingThis(self.name.to_string()))
    }

    /// Borrow the object as `T`, casting through the class graph.
    pub fn this<T: Reflect>(&self) -> Result<Ref<'_, T>, InvokeError> {
        let value = self
            .this_cell()?
            .try_borrow()
            .map_err(|_| InvokeError::ArgumentBorrowed("this".to_string()))?;
        let graph = self.graph;
        let target = type_id::<T>();
        Ref::filter_map(value, |v| {
            // SAFETY: the cast yields a `T` inside the payload, which the
            // returned guard keeps borrowed.
            graph
                .variant_ptr(v, target)
                .map(|ptr| unsafe { ptr.cast::<T>().as_ref() })
        })
        .map_err(|v| self.incompatible::<T>(&v))
    }

    /// Borrow the object mutably as `T`. Fails with
    /// [`InvokeError::ConstThis`] for const objects.
    pub fn this_mut<T: Reflect>(&self) -> Result<RefMut<'_, T>, InvokeError> {
        let value = self
            .this_cell()?
            .try_borrow_mut()
            .map_err(|_| InvokeError::ArgumentBorrowed("this".to_string()))?;
        let graph = self.graph;
        let target = type_id::<T>();
        RefMut::filter_map(value, |v| {
            // SAFETY: the cast yields a writable `T` inside the payload, which
            // the returned guard keeps uniquely borrowed.
            graph
                .variant_mut_ptr(v, target)
                .map(|ptr| unsafe { ptr.cast::<T>().as_mut() })
        })
        .map_err(|v| {
            if v.is_read_only() {
                InvokeError::ConstThis(self.name.to_string())
            } else {
                self.incompatible::<T>(&v)
            }
        })
    }

    fn incompatible<T: Reflect>(&self, value: &Variant<'_>) -> InvokeError {
        InvokeError::IncompatibleThis {
            name: self.name.to_string(),
            owner: T::type_name().to_string(),
            actual: value.type_name().to_string(),
        }
    }
}

fn mismatch<T: Reflect>(value: &Variant<'_>) -> VariantError {
    if value.is_empty() {
        VariantError::Empty
    } else if value.is::<T>() {
        VariantError::ReadOnly(value.type_name().to_string())
    } else {
        VariantError::BadCast {
            expected: T::type_name().to_string(),
            actual: value.type_name().to_string(),
        }
    }
}
