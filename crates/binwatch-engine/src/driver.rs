//! The step driver: one authority step, interpreted.
//!
//! Invokes the step operation exactly once and classifies the result.
//! The driver never mutates bin or truck state itself -- it hands the
//! interpretation back to its caller, which decides whether to animate
//! and when to refresh. Transport failures propagate after the
//! transport's own retry policy has been exhausted; a terminal message
//! from the authority is a normal outcome, never an error.

use binwatch_client::{Authority, TransportError};
use binwatch_types::{BinId, TruckId, TruckMovement};
use tracing::{debug, warn};

use crate::view::SharedView;

/// Interpreted outcome of one simulation step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// A truck moved and collected a bin, with both endpoints resolved
    /// against the cached snapshot.
    Moved(TruckMovement),

    /// A truck moved, but the cached snapshot was too stale to resolve
    /// its endpoints. The caller should refresh instead of animating.
    MovedUnresolved {
        /// The truck the authority reported.
        truck_id: TruckId,
        /// The bin the authority reported as collected.
        collected_bin: BinId,
    },

    /// The authority reported no further work (or an informational
    /// condition such as "No trucks available").
    Terminal(String),
}

/// Perform one simulation step and interpret the response.
///
/// The step response carries only ids; the origin position comes from
/// the truck's last cached position and the destination from the
/// collected bin's cached position.
pub async fn drive_step<A: Authority>(
    authority: &A,
    view: &SharedView,
) -> Result<StepOutcome, TransportError> {
    let response = authority.step().await?;

    let (Some(truck_id), Some(collected_bin)) = (response.truck_id, response.collected_bin_id)
    else {
        debug!(message = %response.message, "step reported terminal condition");
        return Ok(StepOutcome::Terminal(response.message));
    };

    let guard = view.read().await;
    let from = guard.find_truck(truck_id).map(|t| t.position);
    let to = guard.find_bin(collected_bin).map(|b| b.position);
    drop(guard);

    match (from, to) {
        (Some(from), Some(to)) => Ok(StepOutcome::Moved(TruckMovement {
            truck_id,
            from,
            to,
            collected_bin,
        })),
        _ => {
            warn!(
                %truck_id,
                bin_id = %collected_bin,
                "step endpoints missing from cached snapshot; skipping animation"
            );
            Ok(StepOutcome::MovedUnresolved {
                truck_id,
                collected_bin,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use binwatch_client::Snapshot;
    use binwatch_types::{Bin, GeoPoint, StepResponse, Truck, TruckStatus};
    use chrono::Utc;

    use super::*;
    use crate::view::shared_view;

    /// Stub authority returning a canned step response.
    struct CannedStep {
        response: StepResponse,
    }

    impl Authority for CannedStep {
        async fn list_bins(&self) -> Result<Vec<Bin>, TransportError> {
            Ok(Vec::new())
        }

        async fn list_trucks(&self) -> Result<Vec<Truck>, TransportError> {
            Ok(Vec::new())
        }

        async fn step(&self) -> Result<StepResponse, TransportError> {
            Ok(self.response.clone())
        }

        async fn reset_bins(&self) -> Result<StepResponse, TransportError> {
            Ok(self.response.clone())
        }
    }

    fn success_response() -> StepResponse {
        StepResponse {
            message: "Simulation step completed".to_owned(),
            truck_id: Some(TruckId(1)),
            collected_bin_id: Some(BinId(2)),
        }
    }

    #[tokio::test]
    async fn terminal_message_passes_through() {
        let authority = CannedStep {
            response: StepResponse {
                message: "All bins collected".to_owned(),
                truck_id: None,
                collected_bin_id: None,
            },
        };
        let view = shared_view();

        let outcome = drive_step(&authority, &view).await.unwrap();
        assert_eq!(outcome, StepOutcome::Terminal("All bins collected".to_owned()));
    }

    #[tokio::test]
    async fn successful_step_resolves_endpoints_from_snapshot() {
        let authority = CannedStep {
            response: success_response(),
        };
        let view = shared_view();
        view.write().await.replace_snapshot(Snapshot {
            bins: vec![Bin::new(BinId(2), GeoPoint::new(3.0, 4.0), 70)],
            trucks: vec![Truck::new(
                TruckId(1),
                GeoPoint::new(1.0, 2.0),
                TruckStatus::Waiting,
            )],
            fetched_at: Utc::now(),
        });

        let outcome = drive_step(&authority, &view).await.unwrap();
        match outcome {
            StepOutcome::Moved(movement) => {
                assert_eq!(movement.truck_id, TruckId(1));
                assert_eq!(movement.collected_bin, BinId(2));
                assert!((movement.from.lat - 1.0).abs() < 1e-9);
                assert!((movement.to.lat - 3.0).abs() < 1e-9);
            }
            other => panic!("expected Moved, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stale_snapshot_yields_unresolved_movement() {
        let authority = CannedStep {
            response: success_response(),
        };
        // Empty view: neither the truck nor the bin is known locally.
        let view = shared_view();

        let outcome = drive_step(&authority, &view).await.unwrap();
        assert_eq!(
            outcome,
            StepOutcome::MovedUnresolved {
                truck_id: TruckId(1),
                collected_bin: BinId(2),
            }
        );
    }
}
