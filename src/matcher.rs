//! Spatial join of parking regulations to street-sweeping schedules.

use crate::geometry::{centroid, distance_meters, side_of};
use crate::types::{street_key, Location, Polyline, ScheduleRecord, Side};
use rustc_hash::FxHashMap;

/// Grid cell edge in degrees (~85-111 m depending on latitude).
const CELL_DEGREES: f64 = 0.001;

/// Sweeping schedules indexed for nearest-street lookups.
///
/// Record centroids are bucketed into a uniform grid; a lookup scans the target's cell
/// and its 8 neighbors. The index is rebuilt wholesale on every refresh.
pub struct ScheduleMatcher {
    records: Vec<ScheduleRecord>,
    grid: FxHashMap<(i32, i32), Vec<u32>>,
    by_street_side: FxHashMap<String, Vec<u32>>,
}

/// Result of joining a regulation geometry to the sweeping feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleMatch {
    /// Street centerline identifier of the nearest schedule
    pub street_id: String,
    /// Side resolved from geometry
    pub side: Side,
    /// Distance from the target centroid to the matched centerline
    pub distance_meters: f64,
    /// Every schedule filed under `street_id:side`, one per weekday swept
    pub schedules: Vec<ScheduleRecord>,
}

impl ScheduleMatcher {
    /// Indexes `records` by centroid cell and by `street_id:side`.
    pub fn new(records: Vec<ScheduleRecord>) -> Self {
        let mut grid: FxHashMap<(i32, i32), Vec<u32>> = FxHashMap::default();
        let mut by_street_side: FxHashMap<String, Vec<u32>> = FxHashMap::default();

        for (idx, record) in records.iter().enumerate() {
            if let Some(center) = centroid(&record.geometry) {
                grid.entry(grid_key(&center)).or_default().push(idx as u32);
            }
            by_street_side
                .entry(record.street_key())
                .or_default()
                .push(idx as u32);
        }

        Self {
            records,
            grid,
            by_street_side,
        }
    }

    /// Number of indexed schedule records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no schedules are indexed.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of occupied grid cells.
    pub fn cell_count(&self) -> usize {
        self.grid.len()
    }

    /// Joins `target` to the nearest sweeping schedule within `threshold_meters`.
    pub fn find_match(&self, target: &Polyline, threshold_meters: f64) -> Option<ScheduleMatch> {
        let center = centroid(target)?;
        let (idx, distance) = self.find_nearest(&center)?;
        if distance > threshold_meters {
            return None;
        }

        let nearest = &self.records[idx];
        // The target's own orientation beats the schedule feed's side label.
        let side = if side_of(&center, &nearest.geometry) == nearest.side {
            nearest.side
        } else {
            nearest.side.flipped()
        };

        Some(ScheduleMatch {
            street_id: nearest.street_id.clone(),
            side,
            distance_meters: distance,
            schedules: self.schedules_for(&nearest.street_id, side),
        })
    }

    /// All schedules filed under one street side.
    pub fn schedules_for(&self, street_id: &str, side: Side) -> Vec<ScheduleRecord> {
        self.by_street_side
            .get(&street_key(street_id, side))
            .map(|indices| {
                indices
                    .iter()
                    .map(|&idx| self.records[idx as usize].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn find_nearest(&self, location: &Location) -> Option<(usize, f64)> {
        let key = grid_key(location);
        (-1..=1)
            .flat_map(|dlat| {
                (-1..=1).filter_map(move |dlon| self.grid.get(&(key.0 + dlat, key.1 + dlon)))
            })
            .flatten()
            .map(|&idx| {
                let record = &self.records[idx as usize];
                (idx as usize, distance_meters(location, &record.geometry))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

fn grid_key(location: &Location) -> (i32, i32) {
    (
        (location.latitude / CELL_DEGREES).floor() as i32,
        (location.longitude / CELL_DEGREES).floor() as i32,
    )
}
