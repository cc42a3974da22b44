//! Dispatch stores: ordered rule collections that resolve arguments to handlers.
//!
//! - [`SimpleDispatchStore`]: linear front-to-back scan over the rules
//! - [`CachedDispatchStore`]: wraps a simple store and memoizes resolutions
//!   by the content hash of the argument list
//!
//! Rules are kept most-recent-first: a new applicability is prepended, while
//! re-registering an equal applicability swaps the handler in place without
//! moving the rule. The first rule whose applicability accepts the arguments
//! wins, silently, even if later rules would also accept them.
//!
//! Resolution runs in three phases so that a shared store never has to be
//! locked while a predicate runs:
//!
//! 1. [`DispatchStore::lookup`] consults memoized state and otherwise hands out
//!    a snapshot of the rules, tagged with the store's generation.
//! 2. [`resolve`] scans the snapshot. No store is borrowed here.
//! 3. [`DispatchStore::record`] memoizes the winner, unless the rules changed
//!    since the snapshot was taken.

pub mod cached;
pub mod simple;

pub use cached::CachedDispatchStore;
pub use simple::SimpleDispatchStore;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::applicability::Applicability;
use crate::handler::Handler;
use crate::rule::Rule;
use crate::value::Value;

/// Scan `rules` front to back and return the first rule accepting `args`.
///
/// `observe` sees every rule checked, with its outcome, in scan order. Plain
/// and traced resolution both go through here.
pub fn resolve<'a>(
    rules: &'a [Rule],
    args: &[Value],
    mut observe: impl FnMut(&Rule, bool),
) -> Option<&'a Rule> {
    rules.iter().find(|rule| {
        let matched = rule.applies(args);
        observe(rule, matched);
        matched
    })
}

/// Handler of the first rule accepting `args`.
pub fn peek_handler(rules: &[Rule], args: &[Value]) -> Option<Handler> {
    resolve(rules, args, |_, _| {}).map(|rule| rule.handler().clone())
}

pub fn summarize_rules(rules: &[Rule]) -> Vec<String> {
    rules.iter().map(Rule::summary).collect()
}

pub fn summarize_rules_with_args(rules: &[Rule], args: &[Value]) -> Vec<String> {
    rules
        .iter()
        .map(|rule| rule.summary_with_args(args))
        .collect()
}

/// Summaries of every rule accepting `args`, in scan order.
///
/// More than one entry means the call is ambiguous and only the first one is
/// ever selected.
pub fn matching_rules(rules: &[Rule], args: &[Value]) -> Vec<String> {
    rules
        .iter()
        .filter(|rule| rule.applies(args))
        .map(Rule::summary)
        .collect()
}

/// Answer of [`DispatchStore::lookup`].
#[derive(Debug, Clone)]
pub enum Lookup {
    /// A memoized resolution.
    Cached(Handler),
    /// The rules have to be scanned.
    Scan {
        rules: Arc<[Rule]>,
        /// Generation of the rule set `rules` was taken from.
        generation: u64,
        /// Whether the winner should be handed back through `record`.
        memoize: bool,
    },
}

/// One step observed while resolving a call.
#[derive(Debug, Clone, Copy)]
pub enum ResolveStep<'a> {
    /// The handler came from the cache; no rule was checked.
    CacheHit(&'a Handler),
    /// A rule was checked.
    Checked(&'a Rule, bool),
}

/// A resolvable collection of rules plus a default handler.
pub trait DispatchStore: Send + Sync {
    /// Bind `handler` to `applicability`, replacing the handler of an equal
    /// applicability in place or prepending a new rule.
    fn add_handler(&mut self, applicability: Applicability, handler: Handler);

    /// Remove the rule with an equal applicability, if any.
    fn remove_handler(&mut self, applicability: &Applicability);

    fn default_handler(&self) -> &Handler;

    fn set_default_handler(&mut self, handler: Handler);

    /// Rules in scan order.
    fn rules(&self) -> &[Rule];

    /// Shared copy of the current rules.
    fn snapshot(&self) -> Arc<[Rule]>;

    /// Bumped on every change to the rules.
    fn generation(&self) -> u64;

    fn kind(&self) -> StoreKind;

    /// Number of memoized resolutions.
    fn cache_len(&self) -> usize {
        0
    }

    /// Consult memoized state for `args`. Never runs a predicate.
    fn lookup(&self, _args: &[Value]) -> Lookup {
        Lookup::Scan {
            rules: self.snapshot(),
            generation: self.generation(),
            memoize: false,
        }
    }

    /// Remember that scanning rule set `generation` selected `handler` for
    /// `args`. Ignored once the rules have changed.
    fn record(&mut self, _args: &[Value], _generation: u64, _handler: &Handler) {}

    /// All three resolution phases in one go, reporting each step.
    fn get_handler_observed(
        &mut self,
        args: &[Value],
        observe: &mut dyn FnMut(ResolveStep<'_>),
    ) -> Option<Handler> {
        match self.lookup(args) {
            Lookup::Cached(handler) => {
                observe(ResolveStep::CacheHit(&handler));
                Some(handler)
            }
            Lookup::Scan {
                rules,
                generation,
                memoize,
            } => {
                let handler = resolve(&rules, args, |rule, matched| {
                    observe(ResolveStep::Checked(rule, matched))
                })?
                .handler()
                .clone();
                if memoize {
                    self.record(args, generation, &handler);
                }
                Some(handler)
            }
        }
    }

    /// Handler of the first rule accepting `args`, or `None`.
    fn get_handler(&mut self, args: &[Value]) -> Option<Handler> {
        self.get_handler_observed(args, &mut |_| {})
    }

    /// Handler that would be selected for `args`, without touching any cache.
    fn peek_handler(&self, args: &[Value]) -> Option<Handler> {
        peek_handler(self.rules(), args)
    }

    fn summarize_rules(&self) -> Vec<String> {
        summarize_rules(self.rules())
    }

    fn summarize_rules_with_args(&self, args: &[Value]) -> Vec<String> {
        summarize_rules_with_args(self.rules(), args)
    }

    fn matching_rules(&self, args: &[Value]) -> Vec<String> {
        matching_rules(self.rules(), args)
    }
}

/// Which store a generic procedure is constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Simple,
    Cached,
}

impl StoreKind {
    /// Build an empty store of this kind.
    pub fn build(self, default: Handler, max_cache_entries: usize) -> Box<dyn DispatchStore> {
        match self {
            Self::Simple => Box::new(SimpleDispatchStore::with_default(default)),
            Self::Cached => Box::new(CachedDispatchStore::new(
                SimpleDispatchStore::with_default(default),
                max_cache_entries,
            )),
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Cached => write!(f, "cached"),
        }
    }
}
