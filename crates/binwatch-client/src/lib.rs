//! HTTP client for the BinWatch authority.
//!
//! The authority is the remote service that owns simulation truth:
//! bin state, truck routing, and collection events. This crate covers
//! everything between the orchestration engine and the wire:
//!
//! - [`retry`] -- one reusable retry/backoff policy for all calls
//! - [`transport`] -- `reqwest`-backed HTTP with bounded retry
//! - [`authority`] -- the [`Authority`] trait seam and its HTTP impl
//! - [`snapshot`] -- atomic concurrent fetch of bins and trucks
//! - [`config`] -- environment-based configuration, read once
//! - [`error`] -- the transport error taxonomy
//!
//! [`Authority`]: authority::Authority

pub mod authority;
pub mod config;
pub mod error;
pub mod retry;
pub mod snapshot;
pub mod transport;

pub use authority::{Authority, HttpAuthority};
pub use config::ClientConfig;
pub use error::TransportError;
pub use retry::{RetryPolicy, with_retry};
pub use snapshot::{Snapshot, fetch_snapshot};
pub use transport::Transport;
