//! Caching dispatch store.
//!
//! Resolutions are memoized under the blake3 hash of the argument list's
//! canonical form. Any change to the rule set drops the whole cache, since a
//! new or removed rule can change the winner for arguments resolved earlier.
//! Misses that find no rule are not cached, so a later registration is seen
//! without invalidation.

use std::collections::HashMap;
use std::sync::Arc;

use super::{DispatchStore, Lookup, SimpleDispatchStore, StoreKind};
use crate::applicability::Applicability;
use crate::handler::Handler;
use crate::rule::Rule;
use crate::value::{ArgsKey, Value, canonical_key};

/// Default bound on cached resolutions.
pub const DEFAULT_MAX_ENTRIES: usize = 4096;

#[derive(Debug)]
pub struct CachedDispatchStore {
    inner: SimpleDispatchStore,
    cache: HashMap<ArgsKey, Handler>,
    /// Inserting past this bound drops the whole cache first. Zero disables caching.
    max_entries: usize,
}

impl CachedDispatchStore {
    pub fn new(inner: SimpleDispatchStore, max_entries: usize) -> Self {
        Self {
            inner,
            cache: HashMap::new(),
            max_entries,
        }
    }

    /// Whether a resolution for `args` is currently cached.
    pub fn is_cached(&self, args: &[Value]) -> bool {
        self.cache.contains_key(&canonical_key(args))
    }

    pub fn clear_cache(&mut self) {
        if !self.cache.is_empty() {
            tracing::debug!(entries = self.cache.len(), "dispatch cache invalidated");
        }
        self.cache.clear();
    }
}

impl Default for CachedDispatchStore {
    fn default() -> Self {
        Self::new(SimpleDispatchStore::new(), DEFAULT_MAX_ENTRIES)
    }
}

impl DispatchStore for CachedDispatchStore {
    fn lookup(&self, args: &[Value]) -> Lookup {
        let key = canonical_key(args);
        if let Some(handler) = self.cache.get(&key) {
            tracing::trace!(%key, handler = handler.name(), "dispatch cache hit");
            return Lookup::Cached(handler.clone());
        }
        Lookup::Scan {
            rules: self.inner.snapshot(),
            generation: self.inner.generation(),
            memoize: self.max_entries > 0,
        }
    }

    fn record(&mut self, args: &[Value], generation: u64, handler: &Handler) {
        if self.max_entries == 0 || generation != self.inner.generation() {
            return;
        }
        if self.cache.len() >= self.max_entries {
            self.clear_cache();
        }
        self.cache.insert(canonical_key(args), handler.clone());
    }

    fn add_handler(&mut self, applicability: Applicability, handler: Handler) {
        self.inner.add_handler(applicability, handler);
        self.clear_cache();
    }

    fn remove_handler(&mut self, applicability: &Applicability) {
        self.inner.remove_handler(applicability);
        self.clear_cache();
    }

    fn default_handler(&self) -> &Handler {
        self.inner.default_handler()
    }

    fn set_default_handler(&mut self, handler: Handler) {
        self.inner.set_default_handler(handler);
    }

    fn rules(&self) -> &[Rule] {
        self.inner.rules()
    }

    fn snapshot(&self) -> Arc<[Rule]> {
        self.inner.snapshot()
    }

    fn generation(&self) -> u64 {
        self.inner.generation()
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Cached
    }

    fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::predicate::{Predicate, PredicateRegistry, test_fn};
    use crate::store::ResolveStep;

    /// A predicate accepting 42 that counts its invocations.
    fn counted_42(reg: &PredicateRegistry) -> (Predicate, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let p = reg
            .register(
                "is_42",
                test_fn(move |v| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    v.as_number() == Some(42.0)
                }),
            )
            .unwrap();
        (p, calls)
    }

    #[test]
    fn repeated_calls_hit_the_cache() {
        let reg = PredicateRegistry::new();
        let (p, calls) = counted_42(&reg);
        let mut store = CachedDispatchStore::default();
        store.add_handler(Applicability::match_args([p]), Handler::constant("specific", Value::from("specific")));

        let args = [Value::from(42)];
        assert_eq!(store.get_handler(&args).unwrap().name(), "specific");
        assert_eq!(store.get_handler(&args).unwrap().name(), "specific");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(store.is_cached(&args));
    }

    #[test]
    fn structurally_equal_args_share_an_entry() {
        let reg = PredicateRegistry::new();
        let any = reg.register("any", test_fn(|_| true)).unwrap();
        let mut store = CachedDispatchStore::default();
        store.add_handler(Applicability::all_match(any), Handler::constant("h", Value::Null));

        let first = vec![Value::Sequence(vec![Value::from(1), Value::from("x")])];
        let second = vec![Value::Sequence(vec![Value::from(1), Value::from("x")])];
        store.get_handler(&first);
        assert!(store.is_cached(&second));
        assert_eq!(store.cache_len(), 1);
    }

    #[test]
    fn re_registration_never_returns_stale_handler() {
        let reg = PredicateRegistry::new();
        let (p, calls) = counted_42(&reg);
        let app = Applicability::match_args([p]);
        let mut store = CachedDispatchStore::default();

        store.add_handler(app.clone(), Handler::constant("old", Value::from("old")));
        let args = [Value::from(42)];
        assert_eq!(store.get_handler(&args).unwrap().name(), "old");

        store.add_handler(app, Handler::constant("new", Value::from("new")));
        assert!(!store.is_cached(&args));
        assert_eq!(store.get_handler(&args).unwrap().name(), "new");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn removal_invalidates() {
        let reg = PredicateRegistry::new();
        let (p, _) = counted_42(&reg);
        let app = Applicability::match_args([p]);
        let mut store = CachedDispatchStore::default();
        store.add_handler(app.clone(), Handler::constant("h", Value::Null));

        let args = [Value::from(42)];
        assert!(store.get_handler(&args).is_some());
        store.remove_handler(&app);
        assert_eq!(store.cache_len(), 0);
        assert!(store.get_handler(&args).is_none());
    }

    #[test]
    fn misses_are_not_cached() {
        let reg = PredicateRegistry::new();
        let (p, _) = counted_42(&reg);
        let mut store = CachedDispatchStore::default();

        let args = [Value::from(42)];
        assert!(store.get_handler(&args).is_none());
        assert!(!store.is_cached(&args));

        store.add_handler(Applicability::match_args([p]), Handler::constant("late", Value::Null));
        assert_eq!(store.get_handler(&args).unwrap().name(), "late");
    }

    #[test]
    fn bound_drops_whole_cache() {
        let reg = PredicateRegistry::new();
        let any = reg.register("any", test_fn(|_| true)).unwrap();
        let mut store = CachedDispatchStore::new(SimpleDispatchStore::new(), 2);
        store.add_handler(Applicability::all_match(any), Handler::constant("h", Value::Null));

        store.get_handler(&[Value::from(1)]);
        store.get_handler(&[Value::from(2)]);
        assert_eq!(store.cache_len(), 2);
        store.get_handler(&[Value::from(3)]);
        assert_eq!(store.cache_len(), 1);
        assert!(store.is_cached(&[Value::from(3)]));
    }

    #[test]
    fn zero_bound_disables_caching() {
        let reg = PredicateRegistry::new();
        let any = reg.register("any", test_fn(|_| true)).unwrap();
        let mut store = CachedDispatchStore::new(SimpleDispatchStore::new(), 0);
        store.add_handler(Applicability::all_match(any), Handler::constant("h", Value::Null));

        assert!(store.get_handler(&[Value::from(1)]).is_some());
        assert_eq!(store.cache_len(), 0);
    }

    #[test]
    fn stale_scan_is_not_memoized() {
        let reg = PredicateRegistry::new();
        let (p, _) = counted_42(&reg);
        let app = Applicability::match_args([p]);
        let mut store = CachedDispatchStore::default();
        store.add_handler(app.clone(), Handler::constant("old", Value::Null));

        let args = [Value::from(42)];
        let Lookup::Scan { rules, generation, memoize } = store.lookup(&args) else {
            panic!("empty cache must ask for a scan");
        };
        assert!(memoize);
        let old = crate::store::peek_handler(&rules, &args).unwrap();

        // rules change between the scan and the record
        store.add_handler(app, Handler::constant("new", Value::Null));
        store.record(&args, generation, &old);
        assert!(!store.is_cached(&args));
        assert_eq!(store.get_handler(&args).unwrap().name(), "new");
    }

    #[test]
    fn observed_hit_reports_no_rule_checks() {
        let reg = PredicateRegistry::new();
        let (p, _) = counted_42(&reg);
        let mut store = CachedDispatchStore::default();
        store.add_handler(Applicability::match_args([p]), Handler::constant("h", Value::Null));

        let args = [Value::from(42)];
        let mut first = Vec::new();
        store.get_handler_observed(&args, &mut |step| first.push(matches!(step, ResolveStep::CacheHit(_))));
        assert_eq!(first, vec![false]);

        let mut second = Vec::new();
        store.get_handler_observed(&args, &mut |step| second.push(matches!(step, ResolveStep::CacheHit(_))));
        assert_eq!(second, vec![true]);
    }
}
