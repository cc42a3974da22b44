//! Predicate registry: named, registered boolean tests over one [`Value`].
//!
//! A [`Predicate`]'s identity is the identity of its raw test: the shared
//! allocation behind its [`PredicateFn`]. Two predicates wrapping the same
//! test are equal even when they come from different registries; the
//! [`PredicateId`] assigned at registration only orders and labels them.
//! Client code may hold on to a bare [`PredicateFn`] and have the registry
//! resolve it back to the registered predicate
//! ([`PredicateRegistry::lookup_by_test`]).
//!
//! Registration rules:
//! - a name already bound to a *different* test fails with `DuplicateName`;
//! - a test already registered under another name fails with `DuplicateTest`;
//! - re-registering the identical `(name, test)` pair is a no-op that returns
//!   the existing predicate.

pub mod builtin;

use std::fmt;
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;

use crate::error::{GenericResult, PredicateError, PredicateResult};
use crate::id::PredicateId;
use crate::value::Value;

/// A raw predicate test. Clones of the same `Arc` are the same test.
pub type PredicateFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Wrap a closure as a [`PredicateFn`].
pub fn test_fn(f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> PredicateFn {
    Arc::new(f)
}

/// Address of the test's shared allocation, used as its identity.
fn test_addr(test: &PredicateFn) -> usize {
    Arc::as_ptr(test).cast::<()>() as usize
}

/// A registered predicate.
#[derive(Clone)]
pub struct Predicate {
    id: PredicateId,
    name: String,
    side_note: String,
    test: PredicateFn,
}

impl Predicate {
    pub fn id(&self) -> PredicateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn side_note(&self) -> &str {
        &self.side_note
    }

    /// The raw test this predicate was registered with.
    pub fn test_fn(&self) -> &PredicateFn {
        &self.test
    }

    /// Run the test.
    pub fn execute(&self, value: &Value) -> bool {
        (self.test)(value)
    }

    /// `name side_note`, trimmed when there is no note.
    pub fn summary(&self) -> String {
        if self.side_note.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.side_note)
        }
    }

    /// Summary plus the outcome of running the test on `value`.
    pub fn summary_with_arg(&self, value: &Value) -> String {
        format!(
            "{} arg: {} result: {}",
            self.summary(),
            value,
            self.execute(value)
        )
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        test_addr(&self.test) == test_addr(&other.test)
    }
}

impl Eq for Predicate {}

impl std::hash::Hash for Predicate {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        test_addr(&self.test).hash(state);
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("side_note", &self.side_note)
            .finish_non_exhaustive()
    }
}

/// Registry of predicates, keyed both by name and by test identity.
pub struct PredicateRegistry {
    /// Name → predicate (source of truth).
    by_name: DashMap<String, Predicate>,
    /// Test identity → name.
    by_test: DashMap<usize, String>,
}

impl PredicateRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            by_name: DashMap::new(),
            by_test: DashMap::new(),
        }
    }

    /// Register `test` under `name`.
    pub fn register(&self, name: &str, test: PredicateFn) -> GenericResult<Predicate> {
        self.register_with_note(name, "", test)
    }

    /// Register `test` under `name` with a free-text note shown in summaries.
    pub fn register_with_note(
        &self,
        name: &str,
        side_note: &str,
        test: PredicateFn,
    ) -> GenericResult<Predicate> {
        let addr = test_addr(&test);

        if let Some(existing) = self.by_name.get(name) {
            if test_addr(&existing.test) == addr {
                return Ok(existing.value().clone());
            }
            return Err(PredicateError::DuplicateName {
                name: name.to_string(),
            }
            .into());
        }

        if let Some(existing) = self.by_test.get(&addr) {
            return Err(PredicateError::DuplicateTest {
                name: name.to_string(),
                existing: existing.value().clone(),
            }
            .into());
        }

        let predicate = Predicate {
            id: PredicateId::allocate()?,
            name: name.to_string(),
            side_note: side_note.to_string(),
            test,
        };
        self.by_test.insert(addr, name.to_string());
        self.by_name.insert(name.to_string(), predicate.clone());
        tracing::debug!(name, id = %predicate.id, "registered predicate");
        Ok(predicate)
    }

    /// Look up a predicate by name.
    pub fn get(&self, name: &str) -> Option<Predicate> {
        self.by_name.get(name).map(|r| r.value().clone())
    }

    /// Look up a predicate by name, failing with `NotFound`.
    pub fn lookup(&self, name: &str) -> PredicateResult<Predicate> {
        self.get(name).ok_or_else(|| PredicateError::NotFound {
            name: name.to_string(),
            registered: self.summary(),
        })
    }

    /// Reconstruct a predicate from its bare test.
    pub fn lookup_by_test(&self, test: &PredicateFn) -> Option<Predicate> {
        let name = self.by_test.get(&test_addr(test))?.value().clone();
        self.get(&name)
    }

    /// Whether `test` has been registered.
    pub fn contains_test(&self, test: &PredicateFn) -> bool {
        self.by_test.contains_key(&test_addr(test))
    }

    /// Run the predicate registered under `name`.
    pub fn execute(&self, name: &str, value: &Value) -> PredicateResult<bool> {
        Ok(self.lookup(name)?.execute(value))
    }

    /// Resolve raw tests to registered predicates, position by position.
    ///
    /// Fails with `UnregisteredPredicate` naming every unregistered position.
    pub fn resolve_tests(&self, tests: &[PredicateFn]) -> PredicateResult<Vec<Predicate>> {
        let resolved: Vec<Option<Predicate>> =
            tests.iter().map(|t| self.lookup_by_test(t)).collect();
        let positions: Vec<usize> = resolved
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.is_none().then_some(i))
            .collect();
        if !positions.is_empty() {
            return Err(PredicateError::UnregisteredPredicate {
                positions,
                registered: self.summary(),
            });
        }
        Ok(resolved.into_iter().flatten().collect())
    }

    /// Resolve names to registered predicates.
    pub fn resolve_names(&self, names: &[&str]) -> PredicateResult<Vec<Predicate>> {
        names.iter().map(|name| self.lookup(name)).collect()
    }

    /// All registered predicates, in registration order.
    pub fn all(&self) -> Vec<Predicate> {
        let mut all: Vec<Predicate> = self.by_name.iter().map(|r| r.value().clone()).collect();
        all.sort_by_key(Predicate::id);
        all
    }

    /// Predicates whose name satisfies `keep`.
    pub fn filter(&self, keep: impl Fn(&str) -> bool) -> Vec<Predicate> {
        self.all().into_iter().filter(|p| keep(p.name())).collect()
    }

    /// Comma-separated summaries of every registered predicate.
    pub fn summary(&self) -> String {
        self.all()
            .iter()
            .map(Predicate::summary)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Number of registered predicates.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Drop every registered predicate.
    ///
    /// Meant for test isolation: applicabilities built before the call keep
    /// their predicates, but nothing can be resolved against this registry
    /// until it is repopulated.
    pub fn clear(&self) {
        tracing::warn!(
            count = self.len(),
            "clearing predicate registry; outside of tests this is probably a bug"
        );
        self.by_name.clear();
        self.by_test.clear();
    }
}

impl Default for PredicateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateRegistry")
            .field("count", &self.len())
            .finish()
    }
}

static GLOBAL: LazyLock<PredicateRegistry> = LazyLock::new(PredicateRegistry::new);

/// The process-wide predicate registry.
pub fn global() -> &'static PredicateRegistry {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenericError;

    fn is_42() -> PredicateFn {
        test_fn(|v| v.as_number() == Some(42.0))
    }

    #[test]
    fn register_and_lookup() {
        let reg = PredicateRegistry::new();
        let test = is_42();
        let p = reg.register("is_42", test.clone()).unwrap();

        assert_eq!(reg.lookup("is_42").unwrap(), p);
        assert_eq!(reg.lookup_by_test(&test).unwrap(), p);
        assert!(reg.contains_test(&test));
        assert!(p.execute(&Value::from(42)));
        assert!(!p.execute(&Value::from(43)));
    }

    #[test]
    fn execute_by_name_runs_test_each_time() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let reg = PredicateRegistry::new();
        reg.register(
            "counted",
            test_fn(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            }),
        )
        .unwrap();

        assert!(reg.execute("counted", &Value::Null).unwrap());
        assert!(reg.execute("counted", &Value::Null).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn missing_name_is_not_found() {
        let reg = PredicateRegistry::new();
        let err = reg.execute("nope", &Value::Null).unwrap_err();
        assert!(matches!(err, PredicateError::NotFound { ref name, .. } if name == "nope"));
    }

    #[test]
    fn same_name_different_test_is_duplicate_name() {
        let reg = PredicateRegistry::new();
        reg.register("p", is_42()).unwrap();
        let err = reg.register("p", is_42()).unwrap_err();
        assert!(matches!(
            err,
            GenericError::Predicate(PredicateError::DuplicateName { .. })
        ));
    }

    #[test]
    fn same_test_different_name_is_duplicate_test() {
        let reg = PredicateRegistry::new();
        let test = is_42();
        reg.register("first", test.clone()).unwrap();
        let err = reg.register("second", test).unwrap_err();
        assert!(matches!(
            err,
            GenericError::Predicate(PredicateError::DuplicateTest { ref existing, .. })
                if existing == "first"
        ));
    }

    #[test]
    fn identical_reregistration_is_a_noop() {
        let reg = PredicateRegistry::new();
        let test = is_42();
        let a = reg.register("p", test.clone()).unwrap();
        let b = reg.register("p", test).unwrap();
        assert_eq!(a, b);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn same_name_distinct_tests_are_distinct_predicates() {
        let left = PredicateRegistry::new();
        let right = PredicateRegistry::new();
        let a = left.register("p", is_42()).unwrap();
        let b = right.register("p", is_42()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn shared_test_is_one_predicate_across_registries() {
        let left = PredicateRegistry::new();
        let right = PredicateRegistry::new();
        let test = is_42();
        let a = left.register("is_42", test.clone()).unwrap();
        let b = right.register("is_42", test).unwrap();

        assert_ne!(a.id(), b.id());
        assert_eq!(a, b);

        use std::collections::HashSet;
        let set: HashSet<Predicate> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn resolve_tests_reports_every_unregistered_position() {
        let reg = PredicateRegistry::new();
        let known = is_42();
        reg.register("is_42", known.clone()).unwrap();

        let err = reg
            .resolve_tests(&[is_42(), known.clone(), is_42()])
            .unwrap_err();
        match err {
            PredicateError::UnregisteredPredicate { positions, registered } => {
                assert_eq!(positions, vec![0, 2]);
                assert!(registered.contains("is_42"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let resolved = reg.resolve_tests(&[known]).unwrap();
        assert_eq!(resolved[0].name(), "is_42");
    }

    #[test]
    fn all_and_filter_follow_registration_order() {
        let reg = PredicateRegistry::new();
        reg.register("is_b", is_42()).unwrap();
        reg.register("is_a", is_42()).unwrap();
        reg.register_with_note("other", "(always)", test_fn(|_| true))
            .unwrap();

        let names: Vec<String> = reg.all().iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec!["is_b", "is_a", "other"]);
        assert_eq!(reg.filter(|n| n.starts_with("is_")).len(), 2);
        assert_eq!(reg.summary(), "is_b, is_a, other (always)");
    }

    #[test]
    fn clear_empties_registry() {
        let reg = PredicateRegistry::new();
        let test = is_42();
        reg.register("p", test.clone()).unwrap();
        reg.clear();
        assert!(reg.is_empty());
        assert!(reg.lookup_by_test(&test).is_none());
        // The test can be registered again afterwards.
        reg.register("p", test).unwrap();
    }
}
