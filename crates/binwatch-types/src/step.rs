//! Wire types for the authority's simulation step operation.
//!
//! `POST /api/simulate/step` returns a small JSON object: always a
//! `message`, plus `truck_id` and `collected_bin_id` when a truck
//! actually moved. The authority stringifies ids in this response even
//! though the list endpoints carry them as integers, so deserialization
//! here accepts both forms.

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::geo::GeoPoint;
use crate::ids::{BinId, TruckId};

/// Step message the authority sends when every bin has been collected.
pub const MSG_ALL_COLLECTED: &str = "All bins collected";
/// Step message the authority sends when no bin is reachable.
pub const MSG_NO_ACCESSIBLE: &str = "No accessible bins found";
/// Step message the authority sends when it has no trucks to dispatch.
pub const MSG_NO_TRUCKS: &str = "No trucks available";

// ---------------------------------------------------------------------------
// StepResponse
// ---------------------------------------------------------------------------

/// Raw response of one simulation step.
///
/// Exactly one of two shapes holds: a successful step carries both
/// `truck_id` and `collected_bin_id`; a terminal or informational step
/// carries only the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StepResponse {
    /// Human-readable outcome message.
    pub message: String,
    /// The truck that moved, when the step succeeded.
    #[serde(default, deserialize_with = "de_opt_id")]
    pub truck_id: Option<TruckId>,
    /// The bin that was collected, when the step succeeded.
    #[serde(default, deserialize_with = "de_opt_id")]
    pub collected_bin_id: Option<BinId>,
}

impl StepResponse {
    /// Whether the step moved a truck and collected a bin.
    pub const fn is_success(&self) -> bool {
        self.truck_id.is_some() && self.collected_bin_id.is_some()
    }
}

/// A numeric id that may arrive as a JSON number, a JSON string, or
/// null.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Num(i64),
    Text(String),
}

/// Accept an optional id in either numeric or string form.
fn de_opt_id<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<i64>,
{
    let raw = Option::<WireId>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(WireId::Num(n)) => Ok(Some(T::from(n))),
        Some(WireId::Text(s)) => s
            .parse::<i64>()
            .map(|n| Some(T::from(n)))
            .map_err(|e| serde::de::Error::custom(format!("invalid id {s:?}: {e}"))),
    }
}

// ---------------------------------------------------------------------------
// TruckMovement
// ---------------------------------------------------------------------------

/// A successful step resolved against the client's cached snapshot.
///
/// The wire response carries only ids; the origin is the truck's last
/// known position and the destination is the collected bin's position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruckMovement {
    /// The truck that moved.
    pub truck_id: TruckId,
    /// Position the truck departed from.
    pub from: GeoPoint,
    /// Position of the bin it collected.
    pub to: GeoPoint,
    /// The bin that was collected.
    pub collected_bin: BinId,
}
