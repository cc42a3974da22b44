// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # generic-dispatch
//!
//! Runtime multiple dispatch over dynamically-typed values: one named
//! operation, many handlers, selected per call by predicates over the
//! arguments.
//!
//! ## Architecture
//!
//! - **Values** (`value`): closed tagged union that every predicate and handler sees
//! - **Predicates** (`predicate`): named tests over one value, deduplicated by name and by test
//! - **Applicability** (`applicability`): combinators lifting predicates to argument lists
//! - **Stores** (`store`): most-recent-first rule lists, plain or memoized by argument hash
//! - **Registry** (`registry`): operation identity → name, arity and store
//! - **Dispatch** (`dispatch`): resolve then invoke, with an optional trace
//!
//! ## Library usage
//!
//! ```
//! use generic_dispatch::{Applicability, Handler, PredicateRegistry, Registry, Value};
//! use generic_dispatch::predicate::builtin::register_builtins;
//!
//! let predicates = PredicateRegistry::new();
//! register_builtins(&predicates).unwrap();
//!
//! let registry = Registry::new();
//! let classify = registry
//!     .construct_simple("classify", 1, Some(Handler::constant("unknown", Value::from("unknown"))))
//!     .unwrap();
//! registry
//!     .define_handler(
//!         &classify,
//!         Applicability::match_args_named(&predicates, &["is_number"]).unwrap(),
//!         Handler::constant("number", Value::from("number")),
//!     )
//!     .unwrap();
//!
//! assert_eq!(classify.call_in(&registry, &[Value::from(5)]).unwrap(), Value::from("number"));
//! assert_eq!(classify.call_in(&registry, &[Value::from(true)]).unwrap(), Value::from("unknown"));
//! ```

pub mod applicability;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod id;
pub mod metadata;
pub mod predicate;
pub mod procedure;
pub mod registry;
pub mod rule;
pub mod store;
pub mod value;

pub use applicability::{Applicability, ApplicabilityKind};
pub use config::DispatchConfig;
pub use dispatch::{DispatchTrace, TraceEvent, trace_handler};
pub use error::{GenericError, GenericResult};
pub use handler::Handler;
pub use predicate::{Predicate, PredicateRegistry, test_fn};
pub use procedure::{
    GenericProcedure, construct_cached_generic_procedure, construct_simple_generic_procedure,
    define_generic_procedure_handler,
};
pub use registry::Registry;
pub use store::StoreKind;
pub use value::Value;
