//! Core entity structs cached from the authority.
//!
//! Bins and trucks are owned by the authority; the client holds
//! read-only copies that are replaced wholesale on every snapshot
//! fetch. Nothing here mutates in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{FillSeverity, TruckStatus};
use crate::geo::GeoPoint;
use crate::ids::{BinId, TruckId};

// ---------------------------------------------------------------------------
// Bin
// ---------------------------------------------------------------------------

/// A waste bin as reported by the authority.
///
/// Invariants maintained by the authority and preserved here: the fill
/// level stays in `[0, 100]`, and a collected bin never moves or
/// refills within one simulation round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Bin {
    /// Stable identifier assigned by the authority.
    pub id: BinId,
    /// Geographic position (serialized as flat `lat`/`lon` fields).
    #[serde(flatten)]
    pub position: GeoPoint,
    /// Waste fill level as an integer percentage, 0–100.
    pub waste_level: u8,
    /// Whether a truck has collected this bin this round.
    #[serde(default)]
    pub is_collected: bool,
    /// When the bin was collected, if it has been.
    #[serde(default)]
    pub collected_at: Option<DateTime<Utc>>,
}

impl Bin {
    /// Create an uncollected bin, clamping the fill level to 100.
    pub fn new(id: BinId, position: GeoPoint, waste_level: u8) -> Self {
        Self {
            id,
            position,
            waste_level: waste_level.min(100),
            is_collected: false,
            collected_at: None,
        }
    }

    /// Severity band for this bin's fill level.
    pub const fn severity(&self) -> FillSeverity {
        FillSeverity::from_level(self.waste_level)
    }
}

// ---------------------------------------------------------------------------
// Truck
// ---------------------------------------------------------------------------

/// A collection truck as reported by the authority.
///
/// The client renders trucks either at this authoritative position or
/// at a transient animated override; the struct itself is never
/// mutated locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Truck {
    /// Stable identifier assigned by the authority.
    pub id: TruckId,
    /// Geographic position (serialized as flat `lat`/`lon` fields).
    #[serde(flatten)]
    pub position: GeoPoint,
    /// Operational status string from the authority.
    pub status: TruckStatus,
}

impl Truck {
    /// Create a truck record.
    pub const fn new(id: TruckId, position: GeoPoint, status: TruckStatus) -> Self {
        Self {
            id,
            position,
            status,
        }
    }
}
