//! Rich diagnostic error types for the dispatch engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Registration-time failures surface
//! immediately to the registering code; dispatch-time failures surface to the
//! caller of the generic procedure unmodified. Nothing here is transient, so
//! nothing is retried.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the dispatch engine.
///
/// Handlers return [`GenericResult`] so that nested generic calls can use `?`
/// and their failures reach the original caller with the full diagnostic chain.
#[derive(Debug, Error, Diagnostic)]
pub enum GenericError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Predicate(#[from] PredicateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] crate::config::ConfigError),
}

// ---------------------------------------------------------------------------
// Predicate errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum PredicateError {
    #[error("duplicate predicate name: \"{name}\" is already bound to a different test")]
    #[diagnostic(
        code(generic::predicate::duplicate_name),
        help(
            "Predicate names are unique within a registry. Pick another name, \
             or reuse the predicate that is already registered under \"{name}\"."
        )
    )]
    DuplicateName { name: String },

    #[error("duplicate predicate test: already registered as \"{existing}\", cannot register again as \"{name}\"")]
    #[diagnostic(
        code(generic::predicate::duplicate_test),
        help(
            "A test function can only be registered once. Look it up with \
             `lookup_by_test` and reuse the existing predicate \"{existing}\"."
        )
    )]
    DuplicateTest { name: String, existing: String },

    #[error("predicate not found: {name}")]
    #[diagnostic(
        code(generic::predicate::not_found),
        help("No predicate is registered under this name. Registered predicates: {registered}")
    )]
    NotFound { name: String, registered: String },

    #[error("unregistered predicate test(s) at position(s) {positions:?}")]
    #[diagnostic(
        code(generic::predicate::unregistered),
        help(
            "Every raw test passed to an applicability combinator must be registered \
             first with `PredicateRegistry::register`. Registered predicates: {registered}"
        )
    )]
    UnregisteredPredicate {
        positions: Vec<usize>,
        registered: String,
    },
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error("generic procedure metadata not found for \"{operation}\"")]
    #[diagnostic(
        code(generic::registry::metadata_not_found),
        help(
            "The procedure was constructed against a different or superseded registry. \
             Known operations: {known:?}"
        )
    )]
    MetadataNotFound { operation: String, known: Vec<String> },

    #[error("identifier space exhausted: cannot allocate more than u64::MAX {kind} ids")]
    #[diagnostic(
        code(generic::registry::exhausted),
        help(
            "The id space is exhausted. This requires 2^64 allocations; \
             check for allocation loops."
        )
    )]
    IdSpaceExhausted { kind: &'static str },
}

// ---------------------------------------------------------------------------
// Dispatch errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum DispatchError {
    #[error("no handler matched for \"{operation}\" with args {args}")]
    #[diagnostic(
        code(generic::dispatch::no_handler),
        help(
            "No registered rule accepted these arguments and no default handler was \
             supplied. Register a handler whose applicability covers them, or construct \
             the procedure with a default handler."
        )
    )]
    NoHandlerMatched { operation: String, args: String },

    #[error("handler \"{handler}\" failed: {message}")]
    #[diagnostic(
        code(generic::dispatch::handler_failed),
        help("The selected handler rejected its arguments. Check the handler's expectations.")
    )]
    HandlerFailed { handler: String, message: String },
}

impl DispatchError {
    /// Build a [`DispatchError::HandlerFailed`] for use inside handler bodies.
    pub fn handler_failed(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HandlerFailed {
            handler: handler.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias for functions returning dispatch-engine results.
pub type GenericResult<T> = std::result::Result<T, GenericError>;

/// Result type for predicate registry operations.
pub type PredicateResult<T> = std::result::Result<T, PredicateError>;

/// Result type for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicate_error_converts_to_generic_error() {
        let err = PredicateError::DuplicateName {
            name: "is_number".into(),
        };
        let generic: GenericError = err.into();
        assert!(matches!(
            generic,
            GenericError::Predicate(PredicateError::DuplicateName { .. })
        ));
    }

    #[test]
    fn registry_error_converts_to_generic_error() {
        let err = RegistryError::MetadataNotFound {
            operation: "classify".into(),
            known: vec!["add 2".into()],
        };
        let generic: GenericError = err.into();
        assert!(matches!(
            generic,
            GenericError::Registry(RegistryError::MetadataNotFound { .. })
        ));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = DispatchError::NoHandlerMatched {
            operation: "classify".into(),
            args: "[true]".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("classify"));
        assert!(msg.contains("[true]"));

        let err = PredicateError::UnregisteredPredicate {
            positions: vec![0, 2],
            registered: "is_number".into(),
        };
        assert!(format!("{err}").contains("[0, 2]"));
    }
}
