//! Generic procedure handles and the ambient construction API.
//!
//! A [`GenericProcedure`] is the callable returned by construction. It is only
//! an identity: its metadata lives in the registry it was constructed against,
//! and [`GenericProcedure::call`] resolves it through whichever registry is
//! currently [installed](crate::registry::install).

use std::fmt;
use std::sync::Arc;

use crate::applicability::Applicability;
use crate::error::GenericResult;
use crate::handler::Handler;
use crate::id::OperationId;
use crate::registry::{self, Registry};
use crate::value::Value;

#[derive(Clone)]
pub struct GenericProcedure {
    id: OperationId,
    name: Arc<str>,
    arity: usize,
}

impl GenericProcedure {
    pub(crate) fn new(id: OperationId, name: &str, arity: usize) -> Self {
        Self {
            id,
            name: Arc::from(name),
            arity,
        }
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Invoke through the active registry.
    pub fn call(&self, args: &[Value]) -> GenericResult<Value> {
        registry::active().call(self, args)
    }

    /// Invoke through an explicit registry.
    pub fn call_in(&self, registry: &Registry, args: &[Value]) -> GenericResult<Value> {
        registry.call(self, args)
    }
}

impl PartialEq for GenericProcedure {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GenericProcedure {}

impl std::hash::Hash for GenericProcedure {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for GenericProcedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GenericProcedure({} {}, {})", self.name, self.arity, self.id)
    }
}

impl fmt::Display for GenericProcedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// Construct a generic procedure backed by a simple store in the active registry.
pub fn construct_simple_generic_procedure(
    name: &str,
    arity: usize,
    default: Option<Handler>,
) -> GenericResult<GenericProcedure> {
    registry::active().construct_simple(name, arity, default)
}

/// Construct a generic procedure backed by a cached store in the active registry.
pub fn construct_cached_generic_procedure(
    name: &str,
    arity: usize,
    default: Option<Handler>,
) -> GenericResult<GenericProcedure> {
    registry::active().construct_cached(name, arity, default)
}

/// Register `handler` for `applicability` on `procedure` in the active registry.
pub fn define_generic_procedure_handler(
    procedure: &GenericProcedure,
    applicability: Applicability,
    handler: Handler,
) -> GenericResult<()> {
    registry::active().define_handler(procedure, applicability, handler)
}
