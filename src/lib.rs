//! Street-sweeping and parking-restriction alerts from open municipal data.
//!
//! `sweepsafe` joins a city's street-sweeping schedule feed with its parking-regulation
//! feed, so that every parkable curb segment knows which sweeping schedules apply to it.
//! Given a parked car's position, it answers three questions: is there a time limit
//! running, when does it expire, and when is the street swept next.
//!
//! # Features
//!
//! - **One-call check** - [`check_spot`] finds the spot under a GPS fix and evaluates it
//! - **Side-aware join** - Regulations are matched to the correct side of the centerline
//! - **Grid index** - Nearest-street search scans a 3×3 neighborhood of ~100 m cells
//! - **Timezone-correct** - Feed wall-clock times are resolved in the configured IANA zone
//! - **Atomic refresh** - A failed download never clobbers the last good snapshot
//! - **Offline** - After a refresh the snapshot is a local bincode file
//!
//! # Quick Start
//!
//! ```no_run
//! use chrono::Utc;
//! use sweepsafe::{check_spot, Config, Location, SpotStore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load(None)?;
//! let store = SpotStore::open(&config.snapshot_path)?;
//! let snapshot = store.snapshot();
//!
//! let here = Location::new(37.7601, -122.4195);
//! let now = Utc::now();
//! if let Some((spot, state)) = check_spot(
//!     &snapshot.spots,
//!     &here,
//!     Some("Q"),
//!     now,
//!     now,
//!     config.tz()?,
//!     config.spot_threshold_meters,
//! ) {
//!     println!("{}: {}", spot.regulation.regulation_id, state.label());
//!     if let Some(cleaning) = state.next_cleaning() {
//!         println!("next sweeping at {}", cleaning);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ## Refresh
//!
//! 1. Both feeds are paged concurrently through a [`fetch::FeedSource`]
//! 2. Rows are parsed into typed records; malformed rows are logged and skipped
//! 3. Sweeping schedules are indexed by centroid in a [`ScheduleMatcher`]
//! 4. Each parkable regulation is joined to the nearest schedule within the match threshold
//! 5. The result replaces the [`SpotStore`] snapshot in one step
//!
//! ## Evaluation
//!
//! - [`spot::find_matching_spot`] picks the nearest spot strictly inside the spot radius
//! - [`restriction::evaluate`] decides between permit, time-limited and unrestricted
//! - [`occurrence::next_cleaning`] expands week-of-month schedules into instants
//! - [`reminder::schedule`] turns the next cleaning into alarm times
//!
//! # Thread Safety
//!
//! [`SpotStore`] hands out `Arc<Snapshot>` clones. Readers keep the snapshot they were
//! given while a refresh swaps in a new one, and never see a half-written join.
//!
//! # Data Sources
//!
//! The defaults in [`Config`] point at San Francisco's open-data portal
//! ([DataSF](https://datasf.org/)): the street-sweeping schedule and the parking
//! regulations datasets. Any Socrata-style endpoint with the same columns works.
//!
//! # Limitations
//!
//! - **Side detection**: uses the centerline's endpoints, so curved or one-way streets
//!   can resolve to the wrong side
//! - **Holidays**: schedules flagged as holiday-only are never expanded
//! - **Coverage**: spots farther than the match threshold from any centerline carry no
//!   sweeping schedule
//!
//! # Modules
//!
//! - [`types`] - Feed records and shared value types
//! - [`feed`] - Row parsing
//! - [`fetch`] - Paginated feed access
//! - [`matcher`] - Spatial join of regulations to schedules
//! - [`refresh`] - The fetch-join-store pipeline
//! - [`store`] - Persisted snapshot
//! - [`occurrence`], [`restriction`], [`spot`], [`reminder`] - Evaluation

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod geometry;
pub mod matcher;
pub mod occurrence;
pub mod refresh;
pub mod reminder;
pub mod restriction;
pub mod spot;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{ConfigError, FetchError, LocationError, RecordError, RefreshError, StoreError};
pub use matcher::ScheduleMatcher;
pub use refresh::{refresh, RefreshSummary};
pub use reminder::{ReminderOffsets, ReminderPlan};
pub use restriction::RestrictionState;
pub use store::{Snapshot, SpotStore};
pub use types::{Location, MatchedSpot, Polyline, RegulationRecord, ScheduleRecord, Side};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Finds the spot under `location` and evaluates its restriction state.
///
/// Returns `None` when no spot lies strictly within `threshold_meters`.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use sweepsafe::{check_spot, Location};
///
/// let now = Utc::now();
/// let found = check_spot(
///     &[],
///     &Location::new(37.76, -122.42),
///     None,
///     now,
///     now,
///     chrono_tz::America::Los_Angeles,
///     20.0,
/// );
/// assert!(found.is_none());
/// ```
pub fn check_spot<'a>(
    spots: &'a [MatchedSpot],
    location: &Location,
    user_zone: Option<&str>,
    parked_at: DateTime<Utc>,
    now: DateTime<Utc>,
    tz: Tz,
    threshold_meters: f64,
) -> Option<(&'a MatchedSpot, RestrictionState)> {
    let spot = spot::find_matching_spot(location, spots, threshold_meters)?;
    Some((spot, restriction::evaluate(spot, user_zone, parked_at, now, tz)))
}
