//! The authority seam: every read of bins/trucks and every simulation
//! trigger goes through the [`Authority`] trait.
//!
//! The trait exists so the orchestration engine can be exercised
//! against in-memory stubs in tests while production wires in
//! [`HttpAuthority`]. The client instance is constructed explicitly
//! and passed in -- there is no module-level singleton.
//!
//! Futures are declared `Send` so engine tasks holding an authority
//! can be spawned onto the runtime.

use std::future::Future;

use binwatch_types::{Bin, StepResponse, Truck};

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::transport::Transport;

/// Remote service owning simulation truth.
///
/// Read operations are idempotent; `step` and `reset_bins` are the
/// only mutating triggers and both mutate server-side state only.
pub trait Authority: Send + Sync {
    /// Fetch all bins.
    fn list_bins(&self) -> impl Future<Output = Result<Vec<Bin>, TransportError>> + Send;

    /// Fetch all trucks.
    fn list_trucks(&self) -> impl Future<Output = Result<Vec<Truck>, TransportError>> + Send;

    /// Ask the authority to perform one discrete simulation step.
    fn step(&self) -> impl Future<Output = Result<StepResponse, TransportError>> + Send;

    /// Ask the authority to mark every bin uncollected again.
    fn reset_bins(&self) -> impl Future<Output = Result<StepResponse, TransportError>> + Send;
}

/// HTTP-backed [`Authority`] speaking the dashboard API contract.
#[derive(Debug, Clone)]
pub struct HttpAuthority {
    transport: Transport,
}

impl HttpAuthority {
    /// Wrap an existing transport.
    pub const fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Build a transport from configuration and wrap it.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(Transport::new(config.base_url.clone(), config.retry))
    }
}

impl Authority for HttpAuthority {
    async fn list_bins(&self) -> Result<Vec<Bin>, TransportError> {
        self.transport.get_json("/api/bins").await
    }

    async fn list_trucks(&self) -> Result<Vec<Truck>, TransportError> {
        self.transport.get_json("/api/trucks").await
    }

    async fn step(&self) -> Result<StepResponse, TransportError> {
        self.transport.post_json("/api/simulate/step").await
    }

    async fn reset_bins(&self) -> Result<StepResponse, TransportError> {
        self.transport.post_json("/api/bins/reset").await
    }
}
