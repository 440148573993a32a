//! Truck movement animation.
//!
//! The authority reports truck movement as discrete jumps; the
//! animator turns one jump into a fixed number of evenly spaced
//! interpolated positions written into the view's override slice, with
//! a fixed delay between writes. This is cooperative time-slicing, not
//! concurrency: the task yields at every delay and every lock
//! acquisition.
//!
//! Cancellation is by supersession: every write is guarded by the
//! animation epoch captured at start, and anything that bumps the
//! epoch (a poll refresh, a newer animation for the same truck, an
//! explicit clear) makes the next write fail, ending the animation
//! without touching the newer state.

use std::time::Duration;

use binwatch_types::{GeoPoint, TruckMovement};
use tracing::debug;

use crate::view::SharedView;

/// Number of interpolation steps per animated movement.
pub const ANIMATION_STEPS: u32 = 20;

/// Default total duration of one animated movement.
pub const DEFAULT_ANIMATION_DURATION: Duration = Duration::from_millis(1000);

/// How an animation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationResult {
    /// All positions were written; the override rests exactly on the
    /// destination until the next snapshot supersedes it.
    Completed,
    /// A newer animation or snapshot took over; this animation stopped
    /// without writing further.
    Superseded,
}

/// Interpolated positions for a movement, including both endpoints.
///
/// Returns `steps + 1` points: the origin, `steps - 1` intermediate
/// positions, and the destination exactly. A `steps` of zero is
/// treated as one.
pub fn interpolate_path(from: GeoPoint, to: GeoPoint, steps: u32) -> Vec<GeoPoint> {
    let steps = steps.max(1);
    (0..=steps)
        .map(|i| from.lerp(to, f64::from(i) / f64::from(steps)))
        .collect()
}

/// Animate one truck movement into the view's override slice.
///
/// Writes the origin immediately, then each interpolated position
/// after `duration / steps`, finishing with the destination exactly.
/// The override is left in place on completion; the next authoritative
/// refresh supersedes it.
pub async fn animate_truck(
    view: &SharedView,
    movement: &TruckMovement,
    duration: Duration,
    steps: u32,
) -> AnimationResult {
    let steps = steps.max(1);
    let pause = duration.checked_div(steps).unwrap_or(Duration::ZERO);
    let path = interpolate_path(movement.from, movement.to, steps);

    let epoch = view
        .write()
        .await
        .begin_animation(movement.truck_id, movement.from);

    // The origin was written by begin_animation; walk the rest.
    for point in path.into_iter().skip(1) {
        tokio::time::sleep(pause).await;
        let mut guard = view.write().await;
        if !guard.try_set_override(movement.truck_id, epoch, point) {
            debug!(truck_id = %movement.truck_id, "animation superseded");
            return AnimationResult::Superseded;
        }
    }

    debug!(truck_id = %movement.truck_id, "animation completed");
    AnimationResult::Completed
}
