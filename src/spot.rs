//! Matching a live GPS fix to one of the user's watched spots.

use crate::error::LocationError;
use crate::geometry::distance_meters;
use crate::types::{Location, MatchedSpot};

/// Default radius for attributing a fix to a spot.
pub const DEFAULT_SPOT_THRESHOLD_METERS: f64 = 20.0;

/// Source of a single best-effort position fix, e.g. the platform location service.
pub trait LocationSource {
    /// Returns the current fix, or why there is none.
    fn current_fix(&self) -> Result<Location, LocationError>;
}

/// Nearest spot strictly closer than `threshold_meters`; ties go to the first spot.
///
/// ```
/// use sweepsafe::spot::find_matching_spot;
/// use sweepsafe::Location;
///
/// assert!(find_matching_spot(&Location::new(37.76, -122.42), &[], 20.0).is_none());
/// ```
pub fn find_matching_spot<'a>(
    location: &Location,
    spots: &'a [MatchedSpot],
    threshold_meters: f64,
) -> Option<&'a MatchedSpot> {
    let mut closest: Option<(&MatchedSpot, f64)> = None;
    for spot in spots {
        let dist = distance_meters(location, &spot.regulation.geometry);
        if dist < threshold_meters && closest.map_or(true, |(_, d)| dist < d) {
            closest = Some((spot, dist));
        }
    }
    closest.map(|(spot, _)| spot)
}

/// Reads one fix from `source` and matches it against `spots`.
///
/// A missing fix is an error; a fix near no spot is `Ok(None)`.
pub fn match_current_fix<'a>(
    source: &dyn LocationSource,
    spots: &'a [MatchedSpot],
    threshold_meters: f64,
) -> Result<Option<&'a MatchedSpot>, LocationError> {
    let fix = source.current_fix()?;
    let found = find_matching_spot(&fix, spots, threshold_meters);
    match found {
        Some(spot) => log::debug!("fix matched regulation {}", spot.regulation.regulation_id),
        None => log::debug!("fix at {:.5},{:.5} matched no spot", fix.latitude, fix.longitude),
    }
    Ok(found)
}
