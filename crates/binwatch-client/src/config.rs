//! Client configuration.
//!
//! All configuration is read from environment variables once at
//! startup; there is no runtime reconfiguration. The base URL resolves
//! to the local development backend unless overridden, matching how
//! the dashboard frontend picks its API host.

use std::time::Duration;

use crate::error::TransportError;
use crate::retry::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, RetryPolicy};

/// Default authority base URL for local development.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Authority connection configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the authority API.
    pub base_url: String,
    /// Retry policy applied to every transport call.
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_owned(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Recognized variables:
    /// - `BINWATCH_API_URL` -- authority base URL (default
    ///   `http://localhost:8000`)
    /// - `BINWATCH_RETRY_ATTEMPTS` -- attempts per transport call
    ///   (default 3)
    /// - `BINWATCH_RETRY_BASE_MS` -- base backoff delay in
    ///   milliseconds (default 1000)
    pub fn from_env() -> Result<Self, TransportError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Split out from [`from_env`](Self::from_env) so tests can supply
    /// variables without mutating process state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TransportError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("BINWATCH_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_owned());

        let max_attempts = parse_or_default(
            "BINWATCH_RETRY_ATTEMPTS",
            lookup("BINWATCH_RETRY_ATTEMPTS"),
            DEFAULT_MAX_ATTEMPTS,
        )?;

        let base_ms: u64 = parse_or_default(
            "BINWATCH_RETRY_BASE_MS",
            lookup("BINWATCH_RETRY_BASE_MS"),
            DEFAULT_BASE_DELAY.as_millis().try_into().unwrap_or(1000),
        )?;

        Ok(Self {
            base_url,
            retry: RetryPolicy::new(max_attempts, Duration::from_millis(base_ms)),
        })
    }
}

/// Parse an optional variable value, falling back to a default.
fn parse_or_default<T: std::str::FromStr>(
    name: &str,
    raw: Option<String>,
    default: T,
) -> Result<T, TransportError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|e| TransportError::Config(format!("invalid {name}: {e}"))),
    }
}
