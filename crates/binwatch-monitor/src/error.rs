//! Error types for the monitor binary.

use binwatch_client::TransportError;
use binwatch_engine::EngineError;

/// Errors that can terminate the monitor.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// The command line could not be interpreted.
    #[error("usage: binwatch-monitor [watch|step|run|reset] -- {0}")]
    Usage(String),

    /// A transport call exhausted its retries.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The orchestration engine refused or failed an operation.
    #[error(transparent)]
    Engine(#[from] EngineError),
}
