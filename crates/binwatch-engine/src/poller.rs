//! Periodic snapshot polling.
//!
//! A background task fetches the full snapshot on a fixed cadence and
//! applies it through [`ViewState::refresh_from_poll`], so a fresh
//! authoritative snapshot always supersedes in-flight animation.
//! Tickets are drawn from the view before each fetch begins; the view
//! discards any result whose ticket is at or below the last applied
//! one, so a slow early tick can never overwrite a later one, and a
//! poller stopped and respawned on the same view continues the ticket
//! sequence instead of restarting below the high-water mark.
//!
//! A failed fetch leaves the previous snapshot in place and posts a
//! transient banner; the next tick retries from scratch.
//!
//! [`ViewState::refresh_from_poll`]: crate::view::ViewState::refresh_from_poll

use std::sync::Arc;
use std::time::Duration;

use binwatch_client::{Authority, fetch_snapshot};
use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::view::SharedView;

/// Default period between snapshot fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How long fetch failure banners stay visible.
const POLL_BANNER_TTL: Duration = Duration::from_secs(10);

/// Handle to a running background poller.
///
/// The poll task is aborted when the handle is dropped or [`stop`] is
/// called; no further view writes occur afterwards.
///
/// [`stop`]: Poller::stop
#[derive(Debug)]
pub struct Poller {
    handle: JoinHandle<()>,
}

impl Poller {
    /// Spawn the background poll task.
    ///
    /// The first fetch happens immediately; subsequent fetches follow
    /// every `period`.
    pub fn spawn<A>(authority: Arc<A>, view: SharedView, period: Duration) -> Self
    where
        A: Authority + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
            loop {
                interval.tick().await;
                let ticket = view.write().await.take_poll_ticket();
                poll_once(authority.as_ref(), &view, ticket).await;
            }
        });
        Self { handle }
    }

    /// Stop the poll task.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn poll_once<A: Authority>(authority: &A, view: &SharedView, ticket: u64) {
    match fetch_snapshot(authority).await {
        Ok(snapshot) => {
            let mut guard = view.write().await;
            if guard.refresh_from_poll(snapshot, ticket) {
                debug!(ticket, "poll snapshot applied");
            } else {
                debug!(ticket, "stale poll snapshot discarded");
            }
        }
        Err(error) => {
            warn!(ticket, %error, "poll fetch failed; keeping previous snapshot");
            view.write().await.set_banner(
                format!("Failed to refresh map data: {error}"),
                Utc::now(),
                POLL_BANNER_TTL,
            );
        }
    }
}
