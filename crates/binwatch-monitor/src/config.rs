//! Monitor configuration and command-line mode.
//!
//! Follows the same convention as the client configuration: everything
//! is read once at startup from environment variables, with working
//! local-development defaults, and parsing is split from `std::env` so
//! tests never mutate process state.

use std::time::Duration;

use binwatch_client::TransportError;
use binwatch_engine::view::BinVisibility;
use binwatch_engine::{DEFAULT_ANIMATION_DURATION, DEFAULT_MAX_RUN_STEPS, DEFAULT_POLL_INTERVAL};

use crate::error::MonitorError;

/// What the monitor does this invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Poll the authority and log the reconciled view until interrupted.
    Watch,
    /// Trigger one simulation step, animate it, and exit.
    Step,
    /// Run the simulation to completion and exit.
    Run,
    /// Ask the authority to mark every bin uncollected again.
    Reset,
}

impl Mode {
    /// Parse the mode argument. A missing argument means [`Watch`].
    ///
    /// [`Watch`]: Mode::Watch
    pub fn from_arg(arg: Option<&str>) -> Result<Self, MonitorError> {
        match arg {
            None | Some("watch") => Ok(Self::Watch),
            Some("step") => Ok(Self::Step),
            Some("run") => Ok(Self::Run),
            Some("reset") => Ok(Self::Reset),
            Some(other) => Err(MonitorError::Usage(format!("unknown mode {other:?}"))),
        }
    }
}

/// Monitor-side tunables, layered over [`ClientConfig`].
///
/// [`ClientConfig`]: binwatch_client::ClientConfig
#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    /// Period between background snapshot fetches.
    pub poll_interval: Duration,
    /// Safety bound on steps per run-to-completion.
    pub max_run_steps: u32,
    /// Total duration of each truck movement animation.
    pub animation_duration: Duration,
    /// Which bins the watch view logs.
    pub visibility: BinVisibility,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_run_steps: DEFAULT_MAX_RUN_STEPS,
            animation_duration: DEFAULT_ANIMATION_DURATION,
            visibility: BinVisibility::All,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    ///
    /// Recognized variables:
    /// - `BINWATCH_POLL_INTERVAL_MS` -- snapshot poll period (default
    ///   5000)
    /// - `BINWATCH_MAX_RUN_STEPS` -- per-run step bound (default 50)
    /// - `BINWATCH_ANIMATION_MS` -- per-movement animation duration
    ///   (default 1000)
    /// - `BINWATCH_HIDE_COLLECTED` -- set to `true` to log only
    ///   uncollected bins
    pub fn from_env() -> Result<Self, MonitorError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MonitorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let poll_ms: u64 = parse_or_default(
            "BINWATCH_POLL_INTERVAL_MS",
            lookup("BINWATCH_POLL_INTERVAL_MS"),
            millis_of(defaults.poll_interval),
        )?;
        let max_run_steps = parse_or_default(
            "BINWATCH_MAX_RUN_STEPS",
            lookup("BINWATCH_MAX_RUN_STEPS"),
            defaults.max_run_steps,
        )?;
        let animation_ms: u64 = parse_or_default(
            "BINWATCH_ANIMATION_MS",
            lookup("BINWATCH_ANIMATION_MS"),
            millis_of(defaults.animation_duration),
        )?;
        let hide_collected: bool = parse_or_default(
            "BINWATCH_HIDE_COLLECTED",
            lookup("BINWATCH_HIDE_COLLECTED"),
            false,
        )?;

        Ok(Self {
            poll_interval: Duration::from_millis(poll_ms),
            max_run_steps,
            animation_duration: Duration::from_millis(animation_ms),
            visibility: if hide_collected {
                BinVisibility::UncollectedOnly
            } else {
                BinVisibility::All
            },
        })
    }
}

fn millis_of(duration: Duration) -> u64 {
    duration.as_millis().try_into().unwrap_or(u64::MAX)
}

/// Parse an optional variable value, falling back to a default.
fn parse_or_default<T: std::str::FromStr>(
    name: &str,
    raw: Option<String>,
    default: T,
) -> Result<T, MonitorError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e| {
            MonitorError::Transport(TransportError::Config(format!("invalid {name}: {e}")))
        }),
    }
}
