//! Plain-text rendering of the reconciled view.
//!
//! The monitor is a terminal consumer of the same view state the map
//! dashboard reads; instead of markers and opacity it logs one summary
//! line per refresh plus a line per truck. Formatting is pure string
//! building so it can be tested without a runtime.

use std::fmt::Write as _;

use binwatch_engine::view::{BinVisibility, ViewState};
use binwatch_types::FillSeverity;
use chrono::{DateTime, Utc};

/// One-line summary of bins, trucks, and run progress.
pub fn summary_line(view: &ViewState, visibility: BinVisibility, now: DateTime<Utc>) -> String {
    let bins = view.rendered_bins(visibility);
    let critical = bins
        .iter()
        .filter(|r| !r.bin.is_collected && r.bin.severity() == FillSeverity::Critical)
        .count();
    let collected = bins.iter().filter(|r| r.bin.is_collected).count();

    let mut line = format!(
        "{} bins ({} collected, {} critical), {} uncollected, {} trucks",
        bins.len(),
        collected,
        critical,
        view.uncollected_count(),
        view.snapshot().trucks.len(),
    );

    if let Some(progress) = view.progress() {
        let total = progress
            .estimated_total
            .map_or_else(|| "?".to_owned(), |t| t.to_string());
        let _ = write!(line, " | run {}/{}", progress.steps_taken, total);
    }
    if let Some(banner) = view.active_banner(now) {
        let _ = write!(line, " | {}", banner.message);
    }
    line
}

/// One line per truck, animation-aware.
pub fn truck_lines(view: &ViewState) -> Vec<String> {
    view.rendered_trucks()
        .iter()
        .map(|rendered| {
            format!(
                "truck {} [{:?}] at ({:.5}, {:.5}){}",
                rendered.truck.id,
                rendered.truck.status,
                rendered.position.lat,
                rendered.position.lon,
                if rendered.animated { " (moving)" } else { "" },
            )
        })
        .collect()
}
