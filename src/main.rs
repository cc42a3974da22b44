//! gdispatch CLI: exercise the generic dispatch engine from the command line.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use generic_dispatch::predicate::builtin::register_builtins;
use generic_dispatch::registry::{self, Registry};
use generic_dispatch::{
    Applicability, DispatchConfig, GenericProcedure, Handler, PredicateRegistry, StoreKind, Value,
    define_generic_procedure_handler,
};

#[derive(Parser)]
#[command(name = "gdispatch", version, about = "Runtime multiple dispatch over JSON values")]
struct Cli {
    /// TOML dispatch config (store, max_cache_entries, trace).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify each JSON value as number, string, or unknown.
    Classify {
        /// JSON values, one per argument (e.g. 5 '"a"' true).
        #[arg(required = true)]
        values: Vec<String>,

        /// Print the dispatch trace of every call.
        #[arg(long)]
        trace: bool,

        /// Use the cached dispatch store.
        #[arg(long)]
        cached: bool,

        /// Print the rules of `classify` before dispatching.
        #[arg(long)]
        rules: bool,
    },

    /// List the built-in predicates.
    Predicates,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DispatchConfig::load(path)?,
        None => DispatchConfig::default(),
    };

    let predicates = PredicateRegistry::new();
    register_builtins(&predicates)?;

    match cli.command {
        Commands::Classify {
            values,
            trace,
            cached,
            rules,
        } => {
            if cached {
                config.store = StoreKind::Cached;
            }
            let show_trace = trace || config.trace;
            registry::install(Arc::new(Registry::with_config(config)));

            let classify = build_classify(&predicates)?;
            if rules {
                println!("Rules for {classify}:");
                for rule in registry::active().summarize_rules(&classify)? {
                    println!("  {rule}");
                }
            }

            for raw in &values {
                let json: serde_json::Value = serde_json::from_str(raw).into_diagnostic()?;
                let args = [Value::from(json)];
                if show_trace {
                    let (result, trace) = registry::active().dispatch_recorded(&classify, &args);
                    print!("{trace}");
                    println!("{raw} -> {}", result?);
                } else {
                    let result = classify.call(&args)?;
                    println!("{raw} -> {result}");
                }
            }
        }

        Commands::Predicates => {
            println!("Built-in predicates ({}):", predicates.len());
            for predicate in predicates.all() {
                println!("  {}", predicate.summary());
            }
        }
    }

    Ok(())
}

/// `classify` over the active registry: "number", "string", else "unknown".
fn build_classify(predicates: &PredicateRegistry) -> Result<GenericProcedure> {
    let classify = registry::active().construct_default(
        "classify",
        1,
        Some(Handler::constant("unknown", Value::from("unknown"))),
    )?;
    define_generic_procedure_handler(
        &classify,
        Applicability::match_args_named(predicates, &["is_number"])?,
        Handler::constant("number", Value::from("number")),
    )?;
    define_generic_procedure_handler(
        &classify,
        Applicability::match_args_named(predicates, &["is_string"])?,
        Handler::constant("string", Value::from("string")),
    )?;
    Ok(classify)
}
