//! The persisted join result and its all-or-nothing replacement.

use crate::error::StoreError;
use crate::types::{MatchedSpot, Side};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Every matched spot produced by one refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Snapshot {
    /// Unix timestamp (seconds) of the refresh that produced this snapshot
    pub refreshed_at: i64,
    /// Matched spots in regulation feed order
    pub spots: Vec<MatchedSpot>,
}

impl Snapshot {
    /// Number of spots.
    pub fn len(&self) -> usize {
        self.spots.len()
    }

    /// Whether the snapshot holds no spots.
    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }

    /// Spots matched to one street side.
    pub fn by_street_side(&self, street_id: &str, side: Side) -> Vec<&MatchedSpot> {
        self.spots
            .iter()
            .filter(|spot| spot.street_id.as_deref() == Some(street_id) && spot.side == Some(side))
            .collect()
    }

    /// Spots inside a permit zone (case-insensitive).
    pub fn by_zone(&self, zone: &str) -> Vec<&MatchedSpot> {
        let zone = zone.trim();
        self.spots
            .iter()
            .filter(|spot| spot.permit_zone().is_some_and(|z| z.eq_ignore_ascii_case(zone)))
            .collect()
    }

    /// Distinct permit zones, sorted.
    pub fn zones(&self) -> Vec<String> {
        self.count_by_zone().into_iter().map(|(zone, _)| zone).collect()
    }

    /// Spot count per permit zone, sorted by zone.
    pub fn count_by_zone(&self) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for zone in self.spots.iter().filter_map(MatchedSpot::permit_zone) {
            *counts.entry(zone.to_string()).or_default() += 1;
        }
        counts.into_iter().collect()
    }
}

/// Current snapshot plus its backing file.
///
/// Readers get an `Arc` to whichever snapshot is current; [`SpotStore::replace_all`]
/// swaps in a new one only after it is safely on disk, so nobody observes a partial join.
pub struct SpotStore {
    path: Option<PathBuf>,
    current: RwLock<Arc<Snapshot>>,
    // Held across write, rename and swap so disk and memory agree.
    writer: Mutex<()>,
}

impl SpotStore {
    /// A store with no backing file.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            current: RwLock::new(Arc::new(Snapshot::default())),
            writer: Mutex::new(()),
        }
    }

    /// Opens the snapshot at `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let snapshot = read_snapshot(&path)?;
        Ok(Self::with_snapshot(path, snapshot))
    }

    /// Like [`SpotStore::open`], but a file that fails to decode is treated as empty.
    ///
    /// Used ahead of a refresh, which replaces the file wholesale and so never needs the
    /// old contents. I/O errors are still returned.
    pub fn open_or_empty(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let snapshot = match read_snapshot(&path) {
            Err(StoreError::Decode(err)) => {
                log::warn!(
                    "ignoring unreadable snapshot at {}: {}",
                    path.display(),
                    err
                );
                Snapshot::default()
            }
            other => other?,
        };
        Ok(Self::with_snapshot(path, snapshot))
    }

    fn with_snapshot(path: PathBuf, snapshot: Snapshot) -> Self {
        Self {
            path: Some(path),
            current: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(()),
        }
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces everything with `snapshot`.
    ///
    /// The encoded snapshot is written to a sibling temp file and renamed over the old one;
    /// on any error the previous snapshot stays in place, on disk and in memory.
    pub fn replace_all(&self, snapshot: Snapshot) -> Result<(), StoreError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(path) = &self.path {
            let encoded = bincode::encode_to_vec(&snapshot, bincode::config::standard())?;
            let tmp = path.with_extension("tmp");
            std::fs::write(&tmp, &encoded)?;
            std::fs::rename(&tmp, path)?;
            log::info!(
                "wrote {} spots to {} ({} KB)",
                snapshot.len(),
                path.display(),
                encoded.len() / 1000
            );
        }

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
        Ok(())
    }
}

fn read_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
    if !path.exists() {
        return Ok(Snapshot::default());
    }
    let bytes = std::fs::read(path)?;
    let (snapshot, _): (Snapshot, _) =
        bincode::decode_from_slice(&bytes, bincode::config::standard())?;
    log::info!("loaded {} spots from {}", snapshot.len(), path.display());
    Ok(snapshot)
}
