//! Call dispatch: resolve a generic call to a handler, then invoke it.
//!
//! Every call runs two steps. **Resolve** asks the operation's store for the
//! first matching rule, falling back to the default handler. **Invoke** calls
//! the selected handler with the original arguments. The store is locked only
//! to read its cache or take a snapshot of its rules, and again to memoize the
//! winner; predicates and handlers run unlocked.
//!
//! [`dispatch_traced`] runs the same two steps with an observer attached: it
//! records each rule checked with its outcome (or the cache hit that made
//! checking unnecessary), then the handler that ran and what it returned. The
//! trace never changes which handler is selected.

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::GenericResult;
use crate::handler::Handler;
use crate::procedure::GenericProcedure;
use crate::registry::Registry;
use crate::store::{self, Lookup, ResolveStep};
use crate::value::{Value, display_args};

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Outcome of the resolve step.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// A rule matched; its handler runs.
    Rule(Handler),
    /// No rule matched; the store's default handler runs.
    Default(Handler),
}

impl Resolution {
    pub fn handler(&self) -> &Handler {
        match self {
            Self::Rule(h) | Self::Default(h) => h,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default(_))
    }
}

/// Resolve `args` against `procedure`'s store.
pub fn resolve(
    registry: &Registry,
    procedure: &GenericProcedure,
    args: &[Value],
) -> GenericResult<Resolution> {
    resolve_observed(registry, procedure, args, &mut |_| {})
}

/// [`resolve`], reporting every step to `observe`.
pub fn resolve_observed(
    registry: &Registry,
    procedure: &GenericProcedure,
    args: &[Value],
    observe: &mut dyn FnMut(ResolveStep<'_>),
) -> GenericResult<Resolution> {
    let (lookup, default) = registry.with_metadata(procedure, |meta| {
        (meta.store.lookup(args), meta.store.default_handler().clone())
    })?;

    match lookup {
        Lookup::Cached(handler) => {
            observe(ResolveStep::CacheHit(&handler));
            Ok(Resolution::Rule(handler))
        }
        Lookup::Scan {
            rules,
            generation,
            memoize,
        } => {
            let winner = store::resolve(&rules, args, |rule, matched| {
                observe(ResolveStep::Checked(rule, matched))
            });
            let Some(rule) = winner else {
                return Ok(Resolution::Default(default));
            };
            let handler = rule.handler().clone();
            if memoize {
                registry.with_metadata_mut(procedure, |meta| {
                    meta.store.record(args, generation, &handler)
                })?;
            }
            Ok(Resolution::Rule(handler))
        }
    }
}

/// Invoke a resolved handler.
pub fn invoke(resolution: &Resolution, args: &[Value]) -> GenericResult<Value> {
    resolution.handler().call(args)
}

/// Resolve and invoke.
pub fn dispatch(
    registry: &Registry,
    procedure: &GenericProcedure,
    args: &[Value],
) -> GenericResult<Value> {
    let resolution = resolve(registry, procedure, args)?;
    invoke(&resolution, args)
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// One step observed during a traced dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// The handler was served from the store's cache.
    CacheHit { handler: String },
    /// A rule's applicability was tested.
    RuleChecked { rule: String, matched: bool },
    /// A matching rule's handler ran.
    HandlerInvoked {
        handler: String,
        args: String,
        result: String,
    },
    /// No rule matched and the default handler ran.
    DefaultInvoked {
        handler: String,
        args: String,
        result: String,
    },
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CacheHit { handler } => write!(f, "cache hit -> {handler}"),
            Self::RuleChecked { rule, matched } => write!(f, "checking {rule} -> {matched}"),
            Self::HandlerInvoked {
                handler,
                args,
                result,
            } => write!(f, "invoking {handler} with {args} -> {result}"),
            Self::DefaultInvoked {
                handler,
                args,
                result,
            } => write!(f, "no rule matched, invoking default {handler} with {args} -> {result}"),
        }
    }
}

/// Record of a traced dispatch.
#[derive(Debug, Clone)]
pub struct DispatchTrace {
    /// Operation that was called, as `name/arity`.
    pub operation: String,
    /// Events in the order they happened.
    pub events: Vec<TraceEvent>,
    /// Wall-clock time spent resolving and invoking.
    pub elapsed: Duration,
}

impl DispatchTrace {
    fn new(procedure: &GenericProcedure) -> Self {
        Self {
            operation: procedure.to_string(),
            events: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    fn record(&mut self, event: TraceEvent) {
        tracing::debug!(operation = %self.operation, "{event}");
        self.events.push(event);
    }

    /// Rendered events, one line each.
    pub fn lines(&self) -> Vec<String> {
        self.events.iter().map(ToString::to_string).collect()
    }

    /// Name of the handler that ran, if the call got that far.
    pub fn handler_name(&self) -> Option<&str> {
        self.events.iter().find_map(|event| match event {
            TraceEvent::HandlerInvoked { handler, .. } | TraceEvent::DefaultInvoked { handler, .. } => {
                Some(handler.as_str())
            }
            TraceEvent::CacheHit { .. } | TraceEvent::RuleChecked { .. } => None,
        })
    }
}

impl fmt::Display for DispatchTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({:?})", self.operation, self.elapsed)?;
        for event in &self.events {
            writeln!(f, "  {event}")?;
        }
        Ok(())
    }
}

/// [`resolve`] with every step recorded into `trace`.
pub fn resolve_traced(
    registry: &Registry,
    procedure: &GenericProcedure,
    args: &[Value],
    trace: &mut DispatchTrace,
) -> GenericResult<Resolution> {
    resolve_observed(registry, procedure, args, &mut |step| {
        trace.record(match step {
            ResolveStep::CacheHit(handler) => TraceEvent::CacheHit {
                handler: handler.name().to_string(),
            },
            ResolveStep::Checked(rule, matched) => TraceEvent::RuleChecked {
                rule: rule.summary(),
                matched,
            },
        })
    })
}

/// [`invoke`] with the handler, its arguments and its outcome recorded into `trace`.
pub fn invoke_traced(
    resolution: &Resolution,
    args: &[Value],
    trace: &mut DispatchTrace,
) -> GenericResult<Value> {
    let result = invoke(resolution, args);
    let handler = resolution.handler().name().to_string();
    let args = display_args(args);
    let outcome = match &result {
        Ok(value) => value.to_string(),
        Err(e) => format!("error: {e}"),
    };
    trace.record(match resolution {
        Resolution::Rule(_) => TraceEvent::HandlerInvoked {
            handler,
            args,
            result: outcome,
        },
        Resolution::Default(_) => TraceEvent::DefaultInvoked {
            handler,
            args,
            result: outcome,
        },
    });
    result
}

/// Resolve and invoke, returning the result together with a trace.
///
/// Handler errors are returned as-is and the trace is dropped; use
/// [`dispatch_recorded`] to keep it.
pub fn dispatch_traced(
    registry: &Registry,
    procedure: &GenericProcedure,
    args: &[Value],
) -> GenericResult<(Value, DispatchTrace)> {
    let (result, trace) = dispatch_recorded(registry, procedure, args);
    result.map(|value| (value, trace))
}

/// Resolve and invoke, returning the trace whether or not the call succeeded.
pub fn dispatch_recorded(
    registry: &Registry,
    procedure: &GenericProcedure,
    args: &[Value],
) -> (GenericResult<Value>, DispatchTrace) {
    let start = Instant::now();
    let mut trace = DispatchTrace::new(procedure);
    let result = resolve_traced(registry, procedure, args, &mut trace)
        .and_then(|resolution| invoke_traced(&resolution, args, &mut trace));
    trace.elapsed = start.elapsed();
    (result, trace)
}

/// Wrap `handler` so that every call logs its arguments and result under `name`.
pub fn trace_handler(name: &str, handler: Handler) -> Handler {
    let label = name.to_string();
    Handler::new(name, move |args| {
        let result = handler.call(args);
        match &result {
            Ok(value) => tracing::debug!(
                handler = %label,
                args = %display_args(args),
                result = %value,
                "handler returned"
            ),
            Err(e) => tracing::debug!(
                handler = %label,
                args = %display_args(args),
                error = %e,
                "handler failed"
            ),
        }
        result
    })
}
