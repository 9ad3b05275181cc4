//! Function entry.
//!
//! One entry type covers free functions, methods, static methods and
//! constructors; the invoker's [`Receiver`](crate::Receiver) tells them apart.

use introspect_core::{Argument, InvokeError, Signature, SignatureHash, Variant};

use crate::{ClassGraph, Invoker};

use super::Attributes;

/// Registry entry for a callable.
#[derive(Debug, Clone)]
pub struct FunctionEntry {
    /// Unqualified name.
    pub name: String,
    /// Fully qualified name (`ns::name` or `ns::Class::name`).
    pub qualified_name: String,
    /// Key identifying this overload.
    pub hash: SignatureHash,
    pub invoker: Invoker,
    pub attributes: Attributes,
}

impl FunctionEntry {
    pub fn new(
        name: impl Into<String>,
        qualified_name: impl Into<String>,
        hash: SignatureHash,
        invoker: Invoker,
    ) -> Self {
        Self {
            name: name.into(),
            qualified_name: qualified_name.into(),
            hash,
            invoker,
            attributes: Attributes::new(),
        }
    }

    pub fn signature(&self) -> &Signature {
        self.invoker.signature()
    }

    pub fn arity(&self) -> usize {
        self.invoker.arity()
    }

    pub fn is_static(&self) -> bool {
        self.invoker.is_static()
    }

    /// Run the callable. See [`Invoker::invoke`].
    pub fn invoke<'a>(
        &self,
        graph: &ClassGraph,
        this: Option<Argument<'a>>,
        args: Vec<Argument<'a>>,
    ) -> Result<Variant<'static>, InvokeError> {
        self.invoker.invoke(graph, this, args)
    }
}
