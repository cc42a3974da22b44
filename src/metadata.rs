//! Metadata binding a generic operation's name and arity to its store.

use std::fmt;

use crate::applicability::Applicability;
use crate::handler::Handler;
use crate::store::DispatchStore;

/// Name, declared arity and dispatch store of one generic operation.
///
/// `arity` documents the expected argument count for callers and tooling;
/// dispatch never checks calls against it.
pub struct ProcedureMetadata {
    pub name: String,
    pub arity: usize,
    pub store: Box<dyn DispatchStore>,
}

impl ProcedureMetadata {
    /// Bind `store`, which already carries its default handler, to `name`/`arity`.
    pub fn new(name: impl Into<String>, arity: usize, store: Box<dyn DispatchStore>) -> Self {
        Self {
            name: name.into(),
            arity,
            store,
        }
    }

    pub fn add_handler(&mut self, applicability: Applicability, handler: Handler) {
        self.store.add_handler(applicability, handler);
    }

    /// `"name arity"`.
    pub fn summary(&self) -> String {
        format!("{} {}", self.name, self.arity)
    }
}

impl fmt::Debug for ProcedureMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcedureMetadata")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("store", &self.store.kind())
            .field("rules", &self.store.rules().len())
            .finish()
    }
}
