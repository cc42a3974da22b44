//! Linear-scan dispatch store.

use std::sync::Arc;

use super::{DispatchStore, StoreKind};
use crate::applicability::Applicability;
use crate::handler::Handler;
use crate::rule::Rule;

/// Rules in most-recent-first order plus a default handler.
///
/// The rule list is copy-on-write so that [`DispatchStore::snapshot`] is a
/// reference-count bump.
#[derive(Debug)]
pub struct SimpleDispatchStore {
    rules: Arc<[Rule]>,
    generation: u64,
    default: Handler,
}

impl SimpleDispatchStore {
    /// Create an empty store whose default handler raises `NoHandlerMatched`.
    pub fn new() -> Self {
        Self::with_default(Handler::unmatched("anonymous"))
    }

    pub fn with_default(default: Handler) -> Self {
        Self {
            rules: Arc::from(Vec::new()),
            generation: 0,
            default,
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn replace_rules(&mut self, rules: Vec<Rule>) {
        self.rules = rules.into();
        self.generation += 1;
    }
}

impl Default for SimpleDispatchStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchStore for SimpleDispatchStore {
    fn add_handler(&mut self, applicability: Applicability, handler: Handler) {
        let mut rules = self.rules.to_vec();
        match rules
            .iter_mut()
            .find(|rule| *rule.applicability() == applicability)
        {
            Some(existing) => existing.set_handler(handler),
            None => rules.insert(0, Rule::new(applicability, handler)),
        }
        self.replace_rules(rules);
    }

    fn remove_handler(&mut self, applicability: &Applicability) {
        if !self.rules.iter().any(|rule| rule.applicability() == applicability) {
            return;
        }
        let rules = self
            .rules
            .iter()
            .filter(|rule| rule.applicability() != applicability)
            .cloned()
            .collect();
        self.replace_rules(rules);
    }

    fn default_handler(&self) -> &Handler {
        &self.default
    }

    fn set_default_handler(&mut self, handler: Handler) {
        self.default = handler;
    }

    fn rules(&self) -> &[Rule] {
        &self.rules
    }

    fn snapshot(&self) -> Arc<[Rule]> {
        self.rules.clone()
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Simple
    }
}
