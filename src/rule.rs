//! A rule binds one applicability to one handler.

use crate::applicability::Applicability;
use crate::handler::Handler;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct Rule {
    applicability: Applicability,
    handler: Handler,
}

impl Rule {
    pub fn new(applicability: Applicability, handler: Handler) -> Self {
        Self {
            applicability,
            handler,
        }
    }

    pub fn applicability(&self) -> &Applicability {
        &self.applicability
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Replace the handler in place.
    pub fn set_handler(&mut self, handler: Handler) {
        self.handler = handler;
    }

    pub fn applies(&self, args: &[Value]) -> bool {
        self.applicability.test(args)
    }

    pub fn summary(&self) -> String {
        format!(
            "applicability: {} handler: {}",
            self.applicability.summary(),
            self.handler.name()
        )
    }

    pub fn summary_with_args(&self, args: &[Value]) -> String {
        format!(
            "applicability: {}\nhandler: {}",
            self.applicability.summary_with_args(args),
            self.handler.name()
        )
    }
}
