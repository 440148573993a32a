//! Error types for the authority client.
//!
//! Uses `thiserror` for typed errors surfaced through the transport
//! pipeline. The taxonomy distinguishes transport-level failures
//! (retried, then surfaced) from decode failures and configuration
//! problems (surfaced immediately). A well-formed but semantically
//! unsuccessful response -- "All bins collected", say -- is not an
//! error at all; it arrives as an ordinary [`StepResponse`] value.
//!
//! [`StepResponse`]: binwatch_types::StepResponse

/// Errors that can occur while talking to the authority.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request could not be sent or the connection failed mid-flight.
    #[error("request to {url} failed: {reason}")]
    Request {
        /// The full URL of the failed request.
        url: String,
        /// Description of the underlying failure.
        reason: String,
    },

    /// The authority answered with a non-success HTTP status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// The full URL of the request.
        url: String,
        /// The HTTP status code received.
        status: u16,
    },

    /// The response body could not be decoded into the expected shape.
    ///
    /// Decode failures are not retried: the bytes arrived intact, so a
    /// retry would fetch the same undecodable payload again.
    #[error("response from {url} could not be decoded: {reason}")]
    Decode {
        /// The full URL of the request.
        url: String,
        /// Description of the decode failure.
        reason: String,
    },

    /// Every attempt allowed by the retry policy failed.
    #[error("{operation} gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// The logical operation that was retried.
        operation: String,
        /// How many attempts were made.
        attempts: u32,
        /// The last underlying failure.
        last: String,
    },

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),
}
