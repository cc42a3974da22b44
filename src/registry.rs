//! Operation registry: maps each generic procedure's identity to its metadata.
//!
//! A [`Registry`] is an explicit value. One process-wide registry is created on
//! first use and is what [`active`] returns until another one is
//! [installed](install). Handles constructed against one registry are unknown
//! to every other registry, and operations are never removed individually:
//! replacing the registry is the only reset.
//!
//! An operation's store is locked only to take a snapshot of its rules and to
//! memoize a result. Predicates and handlers both run with no lock held, so
//! either may call generic procedures (including their own) and handlers may
//! register new handlers.

use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use dashmap::DashMap;

use crate::applicability::Applicability;
use crate::config::DispatchConfig;
use crate::dispatch::{self, DispatchTrace};
use crate::error::{GenericResult, RegistryError, RegistryResult};
use crate::handler::Handler;
use crate::id::OperationId;
use crate::metadata::ProcedureMetadata;
use crate::procedure::GenericProcedure;
use crate::rule::Rule;
use crate::store::{self, StoreKind};
use crate::value::Value;

pub struct Registry {
    operations: DashMap<OperationId, ProcedureMetadata>,
    config: DispatchConfig,
}

impl Registry {
    /// Create an empty registry with the default configuration.
    pub fn new() -> Self {
        Self::with_config(DispatchConfig::default())
    }

    pub fn with_config(config: DispatchConfig) -> Self {
        Self {
            operations: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Construct a generic procedure with a fresh store of `kind`.
    ///
    /// Without a `default`, calls that match no rule fail with `NoHandlerMatched`.
    pub fn construct(
        &self,
        name: &str,
        arity: usize,
        default: Option<Handler>,
        kind: StoreKind,
    ) -> GenericResult<GenericProcedure> {
        let id = OperationId::allocate()?;
        let default = default.unwrap_or_else(|| Handler::unmatched(name));
        let store = kind.build(default, self.config.max_cache_entries);
        self.operations
            .insert(id, ProcedureMetadata::new(name, arity, store));
        tracing::debug!(name, arity, %id, store = %kind, "constructed generic procedure");
        Ok(GenericProcedure::new(id, name, arity))
    }

    pub fn construct_simple(
        &self,
        name: &str,
        arity: usize,
        default: Option<Handler>,
    ) -> GenericResult<GenericProcedure> {
        self.construct(name, arity, default, StoreKind::Simple)
    }

    pub fn construct_cached(
        &self,
        name: &str,
        arity: usize,
        default: Option<Handler>,
    ) -> GenericResult<GenericProcedure> {
        self.construct(name, arity, default, StoreKind::Cached)
    }

    /// Construct with the store kind from this registry's configuration.
    pub fn construct_default(
        &self,
        name: &str,
        arity: usize,
        default: Option<Handler>,
    ) -> GenericResult<GenericProcedure> {
        self.construct(name, arity, default, self.config.store)
    }

    /// Register `handler` for `applicability` on `procedure`.
    pub fn define_handler(
        &self,
        procedure: &GenericProcedure,
        applicability: Applicability,
        handler: Handler,
    ) -> GenericResult<()> {
        tracing::debug!(
            procedure = procedure.name(),
            applicability = %applicability,
            handler = handler.name(),
            "defining handler"
        );
        self.with_metadata_mut(procedure, |meta| meta.add_handler(applicability, handler))?;
        Ok(())
    }

    pub fn remove_handler(
        &self,
        procedure: &GenericProcedure,
        applicability: &Applicability,
    ) -> GenericResult<()> {
        self.with_metadata_mut(procedure, |meta| meta.store.remove_handler(applicability))?;
        Ok(())
    }

    pub fn set_default_handler(
        &self,
        procedure: &GenericProcedure,
        handler: Handler,
    ) -> GenericResult<()> {
        self.with_metadata_mut(procedure, |meta| meta.store.set_default_handler(handler))?;
        Ok(())
    }

    /// Whether `procedure` was constructed against this registry.
    pub fn contains(&self, procedure: &GenericProcedure) -> bool {
        self.operations.contains_key(&procedure.id())
    }

    /// `"name arity"` of every known operation, sorted.
    pub fn known_operations(&self) -> Vec<String> {
        let mut known: Vec<String> = self
            .operations
            .iter()
            .map(|r| r.value().summary())
            .collect();
        known.sort();
        known
    }

    /// Number of known operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Call `procedure`, traced when the configuration asks for it.
    pub fn call(&self, procedure: &GenericProcedure, args: &[Value]) -> GenericResult<Value> {
        if self.config.trace {
            self.dispatch_traced(procedure, args).map(|(value, _)| value)
        } else {
            self.dispatch(procedure, args)
        }
    }

    pub fn dispatch(&self, procedure: &GenericProcedure, args: &[Value]) -> GenericResult<Value> {
        dispatch::dispatch(self, procedure, args)
    }

    pub fn dispatch_traced(
        &self,
        procedure: &GenericProcedure,
        args: &[Value],
    ) -> GenericResult<(Value, DispatchTrace)> {
        dispatch::dispatch_traced(self, procedure, args)
    }

    /// Traced dispatch that keeps the trace when the call fails.
    pub fn dispatch_recorded(
        &self,
        procedure: &GenericProcedure,
        args: &[Value],
    ) -> (GenericResult<Value>, DispatchTrace) {
        dispatch::dispatch_recorded(self, procedure, args)
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    pub fn summarize_rules(&self, procedure: &GenericProcedure) -> RegistryResult<Vec<String>> {
        Ok(store::summarize_rules(&self.snapshot(procedure)?))
    }

    pub fn summarize_rules_with_args(
        &self,
        procedure: &GenericProcedure,
        args: &[Value],
    ) -> RegistryResult<Vec<String>> {
        Ok(store::summarize_rules_with_args(&self.snapshot(procedure)?, args))
    }

    /// Name of the handler a call with `args` would select, if any rule matches.
    pub fn search_handler(
        &self,
        procedure: &GenericProcedure,
        args: &[Value],
    ) -> RegistryResult<Option<String>> {
        Ok(store::peek_handler(&self.snapshot(procedure)?, args)
            .map(|handler| handler.name().to_string()))
    }

    /// Summaries of every rule accepting `args`; see [`store::matching_rules`].
    pub fn matching_rules(
        &self,
        procedure: &GenericProcedure,
        args: &[Value],
    ) -> RegistryResult<Vec<String>> {
        Ok(store::matching_rules(&self.snapshot(procedure)?, args))
    }

    /// Current rules of `procedure`, detached from its store.
    pub fn snapshot(&self, procedure: &GenericProcedure) -> RegistryResult<Arc<[Rule]>> {
        self.with_metadata(procedure, |meta| meta.store.snapshot())
    }

    pub(crate) fn with_metadata<R>(
        &self,
        procedure: &GenericProcedure,
        f: impl FnOnce(&ProcedureMetadata) -> R,
    ) -> RegistryResult<R> {
        let entry = self
            .operations
            .get(&procedure.id())
            .ok_or_else(|| self.not_found(procedure))?;
        Ok(f(entry.value()))
    }

    pub(crate) fn with_metadata_mut<R>(
        &self,
        procedure: &GenericProcedure,
        f: impl FnOnce(&mut ProcedureMetadata) -> R,
    ) -> RegistryResult<R> {
        let mut entry = self
            .operations
            .get_mut(&procedure.id())
            .ok_or_else(|| self.not_found(procedure))?;
        Ok(f(entry.value_mut()))
    }

    fn not_found(&self, procedure: &GenericProcedure) -> RegistryError {
        RegistryError::MetadataNotFound {
            operation: procedure.to_string(),
            known: self.known_operations(),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("operations", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Active registry
// ---------------------------------------------------------------------------

static ACTIVE: LazyLock<RwLock<Arc<Registry>>> =
    LazyLock::new(|| RwLock::new(Arc::new(Registry::new())));

/// The currently installed registry.
pub fn active() -> Arc<Registry> {
    ACTIVE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Install `registry` as the active one, returning the previous registry.
///
/// Procedures constructed against the previous registry become unreachable
/// through [`GenericProcedure::call`].
pub fn install(registry: Arc<Registry>) -> Arc<Registry> {
    let mut guard = ACTIVE.write().unwrap_or_else(PoisonError::into_inner);
    tracing::info!(
        previous = guard.len(),
        operations = registry.len(),
        "installing registry"
    );
    std::mem::replace(&mut *guard, registry)
}

/// `"name arity"` of every operation in the active registry.
pub fn known_operations() -> Vec<String> {
    active().known_operations()
}
