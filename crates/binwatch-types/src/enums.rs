//! Enumeration types shared across the BinWatch workspace.
//!
//! Truck statuses are authority-defined strings; the client treats the
//! vocabulary as open and maps anything unrecognized to
//! [`TruckStatus::Unknown`] rather than failing the whole snapshot.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Truck status
// ---------------------------------------------------------------------------

/// Operational status of a collection truck, as reported by the
/// authority.
///
/// The authority cycles trucks through `collecting` while servicing a
/// bin and re-queues them as `waiting` afterwards. The client never
/// writes this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum TruckStatus {
    /// Parked with no assignment.
    Idle,
    /// Driving toward a target bin.
    EnRoute,
    /// Servicing a bin.
    Collecting,
    /// Heading back to the depot.
    Returning,
    /// Serviced a bin and re-queued for the next step.
    Waiting,
    /// Any status string this client version does not recognize.
    #[serde(other)]
    Unknown,
}

// ---------------------------------------------------------------------------
// Fill severity
// ---------------------------------------------------------------------------

/// Severity band for a bin's fill level, used by the dashboard for
/// marker coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum FillSeverity {
    /// Fill level 0–25%.
    Low,
    /// Fill level 26–50%.
    Medium,
    /// Fill level 51–75%.
    High,
    /// Fill level above 75%.
    Critical,
}

impl FillSeverity {
    /// Band a fill percentage into a severity.
    pub const fn from_level(level: u8) -> Self {
        if level > 75 {
            Self::Critical
        } else if level > 50 {
            Self::High
        } else if level > 25 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}
