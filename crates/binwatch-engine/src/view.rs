//! The single reconciled view state.
//!
//! Everything the renderer needs lives behind one
//! `Arc<RwLock<ViewState>>`: the latest authoritative snapshot, the
//! transient animation overrides, run progress, and the status banner.
//! Each writer owns exactly one slice -- the poller and controller
//! replace the snapshot, the animator writes overrides, the controller
//! owns progress -- and every mutation is an atomic replace of its
//! slice, never a partial in-place edit, so the renderer can never
//! observe a torn state.
//!
//! # Supersession rules
//!
//! - A periodic poll refresh replaces the snapshot wholesale *and*
//!   clears all overrides (fresh authoritative truth wins over any
//!   in-flight animation). Poll results carry a ticket taken before
//!   the fetch started; a result with a ticket at or below the last
//!   applied one is discarded, so a slow early tick can never clobber
//!   a later, faster-completing one.
//! - The controller's own post-step refresh uses
//!   [`ViewState::replace_snapshot`], which swaps only the snapshot
//!   slice and leaves unrelated trucks' overrides untouched.
//! - Every override write is guarded by a per-truck animation epoch;
//!   bumping the epoch (new animation, poll refresh, explicit clear)
//!   silently invalidates any animation still running against the old
//!   epoch.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use binwatch_client::Snapshot;
use binwatch_types::{Bin, BinId, GeoPoint, Truck, TruckId};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Opacity used for collected bins when rendering all bins.
pub const COLLECTED_BIN_OPACITY: f64 = 0.5;

/// Shared handle to the reconciled view.
pub type SharedView = Arc<RwLock<ViewState>>;

/// Create a fresh shared view with an empty snapshot.
pub fn shared_view() -> SharedView {
    Arc::new(RwLock::new(ViewState::new()))
}

// ---------------------------------------------------------------------------
// Ephemeral slices
// ---------------------------------------------------------------------------

/// Transient, auto-dismissing status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    /// Message to display.
    pub message: String,
    /// Instant after which the banner is no longer rendered.
    pub expires_at: DateTime<Utc>,
}

/// Ephemeral counters describing a run-to-completion in progress.
///
/// Owned exclusively by the run controller; cleared from the view when
/// the run ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunProgress {
    /// Successful steps performed so far.
    pub steps_taken: u32,
    /// Uncollected bins at run start, as a step-count estimate.
    pub estimated_total: Option<u32>,
    /// Wall-clock time the run started.
    pub started_at: DateTime<Utc>,
    /// Whether the run reached a terminal "no more work" condition.
    pub completed: bool,
}

// ---------------------------------------------------------------------------
// Rendered output
// ---------------------------------------------------------------------------

/// Which bins the dashboard variant renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinVisibility {
    /// Every bin; collected ones at reduced opacity.
    All,
    /// Only bins not yet collected.
    UncollectedOnly,
}

/// A bin ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBin {
    /// The authoritative bin record.
    pub bin: Bin,
    /// Marker opacity (1.0 opaque, lower for collected bins).
    pub opacity: f64,
}

/// A truck ready for rendering, with animation applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTruck {
    /// The authoritative truck record.
    pub truck: Truck,
    /// Position to render: the animation override if one is active,
    /// else the authoritative position.
    pub position: GeoPoint,
    /// Whether the position comes from an animation override.
    pub animated: bool,
}

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// The single mutable view reconciling authoritative snapshots with
/// animated local state.
#[derive(Debug)]
pub struct ViewState {
    snapshot: Snapshot,
    overrides: BTreeMap<TruckId, GeoPoint>,
    epochs: BTreeMap<TruckId, u64>,
    poll_tickets_drawn: u64,
    last_poll_ticket: u64,
    progress: Option<RunProgress>,
    banner: Option<Banner>,
}

impl ViewState {
    /// Create a view with an empty snapshot and no overrides.
    pub fn new() -> Self {
        Self {
            snapshot: Snapshot::empty(),
            overrides: BTreeMap::new(),
            epochs: BTreeMap::new(),
            poll_tickets_drawn: 0,
            last_poll_ticket: 0,
            progress: None,
            banner: None,
        }
    }

    /// The latest applied snapshot.
    pub const fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Number of bins not yet collected in the latest snapshot.
    pub fn uncollected_count(&self) -> usize {
        self.snapshot.uncollected_count()
    }

    /// Look up a truck in the latest snapshot.
    pub fn find_truck(&self, id: TruckId) -> Option<&Truck> {
        self.snapshot.trucks.iter().find(|t| t.id == id)
    }

    /// Look up a bin in the latest snapshot.
    pub fn find_bin(&self, id: BinId) -> Option<&Bin> {
        self.snapshot.bins.iter().find(|b| b.id == id)
    }

    // -----------------------------------------------------------------------
    // Snapshot slice
    // -----------------------------------------------------------------------

    /// Draw the ticket for a poll fetch that is about to start.
    ///
    /// The counter lives in the view rather than the poll task, so a
    /// stopped-and-respawned poller continues the sequence above the
    /// applied high-water mark instead of restarting at one.
    pub const fn take_poll_ticket(&mut self) -> u64 {
        self.poll_tickets_drawn = self.poll_tickets_drawn.saturating_add(1);
        self.poll_tickets_drawn
    }

    /// Apply a periodic poll result.
    ///
    /// Replaces the snapshot wholesale and supersedes all animation
    /// overrides. Returns `false` (discarding the snapshot) if
    /// `ticket` is at or below the last applied poll ticket.
    pub fn refresh_from_poll(&mut self, snapshot: Snapshot, ticket: u64) -> bool {
        if ticket <= self.last_poll_ticket {
            return false;
        }
        self.last_poll_ticket = ticket;
        self.snapshot = snapshot;
        self.clear_overrides();
        true
    }

    /// Replace only the snapshot slice, preserving animation overrides.
    ///
    /// Used by the run controller, which manages the affected truck's
    /// override lifecycle itself and must not disturb other trucks'
    /// in-flight animations.
    pub fn replace_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshot = snapshot;
    }

    // -----------------------------------------------------------------------
    // Override slice (animation)
    // -----------------------------------------------------------------------

    /// Start a new animation for a truck.
    ///
    /// Bumps the truck's animation epoch (cancelling any previous
    /// animation), writes the origin as the initial override, and
    /// returns the new epoch for subsequent guarded writes.
    pub fn begin_animation(&mut self, truck_id: TruckId, origin: GeoPoint) -> u64 {
        let epoch = self.bump_epoch(truck_id);
        self.overrides.insert(truck_id, origin);
        epoch
    }

    /// Write an interpolated override position, if the animation is
    /// still current.
    ///
    /// Returns `false` without writing when `epoch` is stale, which is
    /// how a superseded animation learns it should stop.
    pub fn try_set_override(&mut self, truck_id: TruckId, epoch: u64, position: GeoPoint) -> bool {
        if self.epochs.get(&truck_id).copied().unwrap_or(0) != epoch {
            return false;
        }
        self.overrides.insert(truck_id, position);
        true
    }

    /// The active override position for a truck, if any.
    pub fn override_for(&self, truck_id: TruckId) -> Option<GeoPoint> {
        self.overrides.get(&truck_id).copied()
    }

    /// The current animation epoch for a truck.
    pub fn animation_epoch(&self, truck_id: TruckId) -> u64 {
        self.epochs.get(&truck_id).copied().unwrap_or(0)
    }

    /// Remove one truck's override and invalidate its animation.
    pub fn clear_override(&mut self, truck_id: TruckId) {
        self.overrides.remove(&truck_id);
        self.bump_epoch(truck_id);
    }

    /// Remove all overrides and invalidate all animations.
    pub fn clear_overrides(&mut self) {
        let active: Vec<TruckId> = self.overrides.keys().copied().collect();
        self.overrides.clear();
        for truck_id in active {
            self.bump_epoch(truck_id);
        }
    }

    fn bump_epoch(&mut self, truck_id: TruckId) -> u64 {
        let entry = self.epochs.entry(truck_id).or_insert(0);
        *entry = entry.saturating_add(1);
        *entry
    }

    // -----------------------------------------------------------------------
    // Progress slice
    // -----------------------------------------------------------------------

    /// Publish run progress for the renderer.
    pub fn set_progress(&mut self, progress: RunProgress) {
        self.progress = Some(progress);
    }

    /// The current run progress, if a run is in flight.
    pub const fn progress(&self) -> Option<&RunProgress> {
        self.progress.as_ref()
    }

    /// Remove run progress at run end.
    pub fn clear_progress(&mut self) {
        self.progress = None;
    }

    // -----------------------------------------------------------------------
    // Banner slice
    // -----------------------------------------------------------------------

    /// Post a transient status banner.
    pub fn set_banner(&mut self, message: String, now: DateTime<Utc>, ttl: Duration) {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
        self.banner = Some(Banner {
            message,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        });
    }

    /// The banner to render, if one is active and unexpired.
    pub fn active_banner(&self, now: DateTime<Utc>) -> Option<&Banner> {
        self.banner.as_ref().filter(|b| b.expires_at > now)
    }

    // -----------------------------------------------------------------------
    // Reconciled reads
    // -----------------------------------------------------------------------

    /// Render every truck, preferring animation overrides over
    /// authoritative positions.
    pub fn rendered_trucks(&self) -> Vec<RenderedTruck> {
        self.snapshot
            .trucks
            .iter()
            .map(|truck| {
                self.overrides.get(&truck.id).copied().map_or_else(
                    || RenderedTruck {
                        truck: truck.clone(),
                        position: truck.position,
                        animated: false,
                    },
                    |position| RenderedTruck {
                        truck: truck.clone(),
                        position,
                        animated: true,
                    },
                )
            })
            .collect()
    }

    /// Render bins for the requested dashboard variant.
    ///
    /// Bins carry no animation; snapshot fields are rendered verbatim.
    pub fn rendered_bins(&self, visibility: BinVisibility) -> Vec<RenderedBin> {
        self.snapshot
            .bins
            .iter()
            .filter(|bin| match visibility {
                BinVisibility::All => true,
                BinVisibility::UncollectedOnly => !bin.is_collected,
            })
            .map(|bin| RenderedBin {
                opacity: if bin.is_collected {
                    COLLECTED_BIN_OPACITY
                } else {
                    1.0
                },
                bin: bin.clone(),
            })
            .collect()
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}
