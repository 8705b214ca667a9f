//! Error taxonomy.
//!
//! Only [`InputError`] (wrapped by [`RunError`]) reaches the caller of the
//! orchestrator. [`RoutingError`] is absorbed per task and geometry problems
//! never leave the entry-point resolver.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal problems with the input data or the run configuration.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("input file not found: {path}")]
    MissingFile { path: PathBuf },

    #[error("{source_name}: required column '{column}' is missing")]
    MissingColumn { source_name: String, column: String },

    #[error("{source_name}: no usable destinations")]
    NoDestinations { source_name: String },

    #[error("destination {destination} does not match routing mode {mode}")]
    ModeMismatch { destination: String, mode: String },

    #[error("invalid routing policy: {0}")]
    InvalidPolicy(String),

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-task routing failure. Degrades the task to an absent distance.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    #[error("invalid coordinates")]
    InvalidCoordinates,

    #[error("routing service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("routing request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("malformed routing response ({reason}): {body}")]
    MalformedResponse { reason: String, body: String },
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Failure while persisting the result table.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to serialise route geometry: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
