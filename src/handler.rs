//! Handlers: the callables a rule selects.

use std::fmt;
use std::sync::Arc;

use crate::error::{DispatchError, GenericResult};
use crate::value::{Value, display_args};

/// Shared handler body.
pub type HandlerFn = Arc<dyn Fn(&[Value]) -> GenericResult<Value> + Send + Sync>;

/// A named handler. Clones share identity; see [`Handler::same`].
#[derive(Clone)]
pub struct Handler {
    name: Arc<str>,
    f: HandlerFn,
}

impl Handler {
    pub fn new(
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> GenericResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Self::from_fn(name, Arc::new(f))
    }

    pub fn from_fn(name: impl Into<String>, f: HandlerFn) -> Self {
        Self {
            name: Arc::from(name.into()),
            f,
        }
    }

    /// A handler that ignores its arguments and returns `value`.
    pub fn constant(name: impl Into<String>, value: Value) -> Self {
        Self::new(name, move |_| Ok(value.clone()))
    }

    /// The error-raising default installed when an operation has no default
    /// handler of its own.
    pub fn unmatched(operation: impl Into<String>) -> Self {
        let operation: String = operation.into();
        let name = format!("{operation}:no-handler");
        Self::new(name, move |args| {
            Err(DispatchError::NoHandlerMatched {
                operation: operation.clone(),
                args: display_args(args),
            }
            .into())
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> GenericResult<Value> {
        (self.f)(args)
    }

    /// Whether both handles refer to the same handler body.
    pub fn same(&self, other: &Handler) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.f), Arc::as_ptr(&other.f))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({})", self.name)
    }
}
