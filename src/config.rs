//! Registry configuration, loadable from TOML.
//!
//! ```toml
//! store = "cached"
//! max_cache_entries = 1024
//! trace = false
//! ```

use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreKind;
use crate::store::cached::DEFAULT_MAX_ENTRIES;

/// Errors from loading a configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read dispatch config: {path}")]
    #[diagnostic(
        code(generic::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dispatch config: {message}")]
    #[diagnostic(
        code(generic::config::parse),
        help("Check the TOML syntax. Valid keys: store (\"simple\" | \"cached\"), max_cache_entries, trace.")
    )]
    Parse { message: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Settings applied by a [`Registry`](crate::registry::Registry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Store used by `Registry::construct_default`.
    #[serde(default)]
    pub store: StoreKind,
    /// Bound on cached resolutions per cached store.
    #[serde(default = "default_max_cache_entries")]
    pub max_cache_entries: usize,
    /// Route every `call` through the traced dispatcher.
    #[serde(default)]
    pub trace: bool,
}

fn default_max_cache_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            store: StoreKind::default(),
            max_cache_entries: default_max_cache_entries(),
            trace: false,
        }
    }
}

impl DispatchConfig {
    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        toml::from_str(s).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Load a config file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }
}
