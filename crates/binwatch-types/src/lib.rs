//! Shared type definitions for the BinWatch monitoring client.
//!
//! This crate is the single source of truth for the wire and view
//! types used across the BinWatch workspace. Types defined here flow
//! downstream to `TypeScript` via `ts-rs` for the map dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe integer wrappers for bin and truck identifiers
//! - [`geo`] -- Geographic positions and linear interpolation
//! - [`enums`] -- Truck status and fill severity enumerations
//! - [`structs`] -- Cached entity structs (bins, trucks)
//! - [`step`] -- Simulation step wire types and resolved movements

pub mod enums;
pub mod geo;
pub mod ids;
pub mod step;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{FillSeverity, TruckStatus};
pub use geo::GeoPoint;
pub use ids::{BinId, TruckId};
pub use step::{
    MSG_ALL_COLLECTED, MSG_NO_ACCESSIBLE, MSG_NO_TRUCKS, StepResponse, TruckMovement,
};
pub use structs::{Bin, Truck};
