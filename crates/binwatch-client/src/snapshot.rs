//! Atomic snapshot fetching.
//!
//! A snapshot is the pair of bin and truck lists as of one fetch. The
//! two list calls run concurrently, but the fetch succeeds or fails as
//! a whole: the caller never sees one fresh half next to one stale
//! half. On failure the caller keeps whatever snapshot it already had
//! -- stale-but-consistent beats fresh-but-partial.

use binwatch_types::{Bin, Truck};
use chrono::{DateTime, Utc};

use crate::authority::Authority;
use crate::error::TransportError;

/// A full, atomically-replacing view of bins and trucks.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// All bins known to the authority.
    pub bins: Vec<Bin>,
    /// All trucks known to the authority.
    pub trucks: Vec<Truck>,
    /// Wall-clock time the fetch completed.
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// An empty snapshot, used before the first successful fetch.
    pub fn empty() -> Self {
        Self {
            bins: Vec::new(),
            trucks: Vec::new(),
            fetched_at: Utc::now(),
        }
    }

    /// Number of bins not yet collected.
    pub fn uncollected_count(&self) -> usize {
        self.bins.iter().filter(|b| !b.is_collected).count()
    }
}

/// Fetch bins and trucks concurrently, failing atomically.
pub async fn fetch_snapshot<A: Authority>(authority: &A) -> Result<Snapshot, TransportError> {
    let (bins, trucks) = tokio::try_join!(authority.list_bins(), authority.list_trucks())?;
    Ok(Snapshot {
        bins,
        trucks,
        fetched_at: Utc::now(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use binwatch_types::{BinId, GeoPoint, StepResponse, TruckId, TruckStatus};

    use super::*;

    /// Stub authority whose halves can fail independently.
    struct HalfFailingAuthority {
        fail_bins: bool,
        fail_trucks: bool,
    }

    fn unreachable_host() -> TransportError {
        TransportError::Request {
            url: "http://localhost:8000".to_owned(),
            reason: "connection refused".to_owned(),
        }
    }

    impl Authority for HalfFailingAuthority {
        async fn list_bins(&self) -> Result<Vec<Bin>, TransportError> {
            if self.fail_bins {
                Err(unreachable_host())
            } else {
                Ok(vec![Bin::new(BinId(1), GeoPoint::new(0.0, 0.0), 40)])
            }
        }

        async fn list_trucks(&self) -> Result<Vec<Truck>, TransportError> {
            if self.fail_trucks {
                Err(unreachable_host())
            } else {
                Ok(vec![Truck::new(
                    TruckId(1),
                    GeoPoint::new(0.0, 0.0),
                    TruckStatus::Idle,
                )])
            }
        }

        async fn step(&self) -> Result<StepResponse, TransportError> {
            Err(unreachable_host())
        }

        async fn reset_bins(&self) -> Result<StepResponse, TransportError> {
            Err(unreachable_host())
        }
    }

    /// Stub authority with nothing to report.
    struct EmptyAuthority;

    impl Authority for EmptyAuthority {
        async fn list_bins(&self) -> Result<Vec<Bin>, TransportError> {
            Ok(Vec::new())
        }

        async fn list_trucks(&self) -> Result<Vec<Truck>, TransportError> {
            Ok(Vec::new())
        }

        async fn step(&self) -> Result<StepResponse, TransportError> {
            Err(unreachable_host())
        }

        async fn reset_bins(&self) -> Result<StepResponse, TransportError> {
            Err(unreachable_host())
        }
    }

    #[tokio::test]
    async fn successful_fetch_returns_both_lists() {
        let authority = HalfFailingAuthority {
            fail_bins: false,
            fail_trucks: false,
        };
        let snapshot = fetch_snapshot(&authority).await.unwrap();
        assert_eq!(snapshot.bins.len(), 1);
        assert_eq!(snapshot.trucks.len(), 1);
    }

    #[tokio::test]
    async fn empty_lists_are_still_lists() {
        let snapshot = fetch_snapshot(&EmptyAuthority).await.unwrap();
        assert!(snapshot.bins.is_empty());
        assert!(snapshot.trucks.is_empty());
    }

    #[tokio::test]
    async fn failing_bin_half_fails_the_whole_fetch() {
        let authority = HalfFailingAuthority {
            fail_bins: true,
            fail_trucks: false,
        };
        assert!(fetch_snapshot(&authority).await.is_err());
    }

    #[tokio::test]
    async fn failing_truck_half_fails_the_whole_fetch() {
        let authority = HalfFailingAuthority {
            fail_bins: false,
            fail_trucks: true,
        };
        assert!(fetch_snapshot(&authority).await.is_err());
    }

    #[test]
    fn uncollected_count_ignores_collected_bins() {
        let mut snapshot = Snapshot::empty();
        let mut collected = Bin::new(BinId(1), GeoPoint::new(0.0, 0.0), 80);
        collected.is_collected = true;
        snapshot.bins = vec![
            collected,
            Bin::new(BinId(2), GeoPoint::new(1.0, 1.0), 30),
            Bin::new(BinId(3), GeoPoint::new(2.0, 2.0), 55),
        ];
        assert_eq!(snapshot.uncollected_count(), 2);
    }
}
