// Error taxonomy for the transport engine
//
// Fatal initialization problems (bad configuration, rejected parameter
// tables) abort before any worker thread starts. Per-cascade I/O failures
// are contained in the worker loop and surface here so the caller can log
// and move on. Per-event numerical anomalies never reach this type; they
// are recovered locally and counted on the particle.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CascadeError {
    /// The run configuration is unusable. Raised before any cascade starts.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Injected electron parameter tables do not match the configured shape.
    #[error("scattering table rejected: {0}")]
    Table(String),

    /// A destination file could not be opened, written, or renamed.
    #[error("output file {path:?}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CascadeError>;
