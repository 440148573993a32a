//! Error types for the orchestration engine.
//!
//! Terminal simulation outcomes ("All bins collected") are not errors;
//! they travel as ordinary [`StepOutcome`] values. Only transport
//! exhaustion and re-entrancy rejections surface here.
//!
//! [`StepOutcome`]: crate::driver::StepOutcome

use binwatch_client::TransportError;

/// Errors that can occur while orchestrating the simulation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A run-to-completion or single step is already in progress.
    ///
    /// Callers treat this as a no-op: the in-progress run is untouched
    /// and no duplicate timers or tasks were created.
    #[error("a simulation run is already in progress")]
    AlreadyRunning,

    /// A transport call exhausted its retries.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
