//! Terminal monitor entry point for the BinWatch dashboard.
//!
//! The monitor is a headless consumer of the same orchestration engine
//! the map dashboard uses. One invocation does one thing:
//!
//! - `watch` (default) -- poll the authority and log the reconciled
//!   view until interrupted
//! - `step` -- trigger one simulation step, animate it, and exit
//! - `run` -- drive the simulation to completion and exit
//! - `reset` -- ask the authority to mark every bin uncollected
//!
//! # Startup sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load client and monitor configuration from the environment
//! 3. Build the HTTP authority client
//! 4. Fetch the initial snapshot into the shared view
//! 5. Dispatch on the requested mode

mod config;
mod error;
mod render;

use std::sync::Arc;

use binwatch_client::{Authority, ClientConfig, HttpAuthority, fetch_snapshot};
use binwatch_engine::{Controller, Poller, RunPolicy, SharedView, StepOutcome, shared_view};
use chrono::Utc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Mode, MonitorConfig};
use crate::error::MonitorError;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the initial snapshot
/// fetch fails, or the requested operation fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("binwatch-monitor starting");

    let mode = {
        let arg = std::env::args().nth(1);
        Mode::from_arg(arg.as_deref())?
    };

    let client_config = ClientConfig::from_env()?;
    let monitor_config = MonitorConfig::from_env()?;
    info!(
        base_url = client_config.base_url,
        retry_attempts = client_config.retry.max_attempts,
        poll_interval_ms = monitor_config.poll_interval.as_millis(),
        max_run_steps = monitor_config.max_run_steps,
        ?mode,
        "configuration loaded"
    );

    let authority = Arc::new(HttpAuthority::from_config(&client_config));
    let view = shared_view();

    // Seed the view before any mode runs so step endpoint resolution
    // and the first watch render have authoritative data.
    let snapshot = fetch_snapshot(authority.as_ref()).await?;
    info!(
        bins = snapshot.bins.len(),
        trucks = snapshot.trucks.len(),
        "initial snapshot fetched"
    );
    view.write().await.replace_snapshot(snapshot);

    match mode {
        Mode::Watch => watch(authority, view, monitor_config).await?,
        Mode::Step => step(&authority, &view, &monitor_config).await?,
        Mode::Run => run(authority, view, monitor_config).await?,
        Mode::Reset => reset(authority.as_ref()).await?,
    }

    info!("binwatch-monitor shutdown complete");
    Ok(())
}

/// Poll and log the reconciled view until Ctrl-C.
async fn watch(
    authority: Arc<HttpAuthority>,
    view: SharedView,
    config: MonitorConfig,
) -> Result<(), MonitorError> {
    let poller = Poller::spawn(authority, view.clone(), config.poll_interval);
    info!(
        period_ms = config.poll_interval.as_millis(),
        "background poller started; Ctrl-C to stop"
    );

    let mut ticks = tokio::time::interval(config.poll_interval);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticks.tick() => {
                let guard = view.read().await;
                info!("{}", render::summary_line(&guard, config.visibility, Utc::now()));
                for line in render::truck_lines(&guard) {
                    info!("{line}");
                }
            }
        }
    }

    poller.stop();
    info!("watch stopped");
    Ok(())
}

/// Trigger one guarded step and log its outcome.
async fn step(
    authority: &Arc<HttpAuthority>,
    view: &SharedView,
    config: &MonitorConfig,
) -> Result<(), MonitorError> {
    let controller = Controller::new(
        Arc::clone(authority),
        view.clone(),
        run_policy(config),
    );
    match controller.single_step().await? {
        StepOutcome::Moved(movement) => {
            info!(
                truck_id = %movement.truck_id,
                bin_id = %movement.collected_bin,
                "step completed: truck moved and collected a bin"
            );
        }
        StepOutcome::MovedUnresolved {
            truck_id,
            collected_bin,
        } => {
            info!(
                %truck_id,
                bin_id = %collected_bin,
                "step completed; local snapshot was stale, skipped animation"
            );
        }
        StepOutcome::Terminal(message) => info!(message = %message, "no step performed"),
    }
    Ok(())
}

/// Drive the simulation to completion, logging the final report.
async fn run(
    authority: Arc<HttpAuthority>,
    view: SharedView,
    config: MonitorConfig,
) -> Result<(), MonitorError> {
    let controller = Controller::new(authority, view, run_policy(&config));
    let report = controller.run_to_completion().await?;
    info!(
        final_state = ?report.final_state,
        steps_taken = report.progress.steps_taken,
        completed = report.progress.completed,
        last_message = report.last_message.as_deref().unwrap_or(""),
        error = report.error.as_deref().unwrap_or(""),
        "run finished"
    );
    Ok(())
}

/// Ask the authority to mark every bin uncollected again, then refetch
/// to confirm the new state.
async fn reset(authority: &HttpAuthority) -> Result<(), MonitorError> {
    let response = authority.reset_bins().await?;
    info!(message = %response.message, "bins reset");

    let snapshot = fetch_snapshot(authority).await?;
    info!(
        bins = snapshot.bins.len(),
        uncollected = snapshot.uncollected_count(),
        "snapshot after reset"
    );
    Ok(())
}

fn run_policy(config: &MonitorConfig) -> RunPolicy {
    RunPolicy {
        max_steps: config.max_run_steps,
        animation_duration: config.animation_duration,
        ..RunPolicy::default()
    }
}
