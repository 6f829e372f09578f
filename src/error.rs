//! Error types.
//!
//! The prediction path itself never fails; these cover the edges of the
//! crate: building a predictor from a configuration, reading traces, and
//! routing calls to per-core predictors.

use std::path::PathBuf;

/// Errors produced while loading or validating a predictor configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The ensemble expects exactly one configuration per component.
    #[error("expected {expected} components, found {found}")]
    ComponentCount {
        expected: usize,
        found: usize,
    },

    /// A parameter is outside the range the tables can represent.
    #[error("component `{name}`: {detail}")]
    Invalid {
        name: String,
        detail: String,
    },

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while reading a configuration file.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
impl ConfigError {
    pub(crate) fn invalid(name: &str, detail: impl ToString) -> Self {
        Self::Invalid { name: name.to_string(), detail: detail.to_string() }
    }
}

/// Errors produced while reading or writing a binary trace.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file size is not a multiple of the record size.
    #[error("trace length {len} is not a multiple of {record_size} bytes")]
    Truncated {
        len: usize,
        record_size: usize,
    },

    /// A record carries a combination of flag bits with no meaning.
    #[error("invalid branch flags {flags:#07b}")]
    InvalidFlags {
        flags: u32,
    },
}

/// Errors produced when routing a call to a per-core predictor.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("core {proc_id} does not exist ({num_cores} cores configured)")]
    UnknownCore {
        proc_id: usize,
        num_cores: usize,
    },
}
