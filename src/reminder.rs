//! Turning a parked spot and the user's "remind me N minutes before" choices into
//! absolute alarm instants.

use crate::occurrence::{next_cleaning_window, CleaningWindow};
use crate::types::MatchedSpot;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Most reminders realized for one cleaning.
pub const MAX_REMINDERS: usize = 5;

/// Minutes-before offsets chosen by the user. Ordered, de-duplicated, zero excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderOffsets(BTreeSet<u32>);

impl ReminderOffsets {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an offset; returns `false` for zero or a duplicate.
    pub fn insert(&mut self, minutes: u32) -> bool {
        minutes > 0 && self.0.insert(minutes)
    }

    /// Offsets in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    /// Number of distinct offsets.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no offsets are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<u32> for ReminderOffsets {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut offsets = Self::new();
        for minutes in iter {
            offsets.insert(minutes);
        }
        offsets
    }
}

/// One realized reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reminder {
    /// Minutes before the cleaning start
    pub offset_minutes: u32,
    /// Absolute alarm instant
    pub fires_at: DateTime<Utc>,
    /// Human-readable notification text
    pub summary: String,
}

/// The next cleaning of a spot and the reminders still ahead of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderPlan {
    /// Start of the next cleaning, if the spot has one.
    pub next_cleaning: Option<DateTime<Utc>>,
    /// Reminders in ascending offset order.
    pub reminders: Vec<Reminder>,
}

/// Fire-and-forget alarm delivery, e.g. the platform alarm manager.
pub trait AlarmSink {
    /// Schedules `reminder` to fire at its `fires_at` instant.
    fn schedule_alarm(&self, reminder: &Reminder);
}

impl ReminderPlan {
    /// Hands every reminder to `sink`; returns how many were scheduled.
    pub fn deliver(&self, sink: &dyn AlarmSink) -> usize {
        for reminder in &self.reminders {
            sink.schedule_alarm(reminder);
        }
        self.reminders.len()
    }
}

/// Plans reminders for the next cleaning at `spot`.
///
/// Only the smallest [`MAX_REMINDERS`] offsets are considered, and an alarm that would
/// fire at or before `now` is dropped.
pub fn schedule(
    spot: &MatchedSpot,
    offsets: &ReminderOffsets,
    now: DateTime<Utc>,
    tz: Tz,
) -> ReminderPlan {
    let Some(window) = next_cleaning_window(&spot.schedules, now, tz) else {
        return ReminderPlan {
            next_cleaning: None,
            reminders: Vec::new(),
        };
    };

    let reminders = offsets
        .iter()
        .take(MAX_REMINDERS)
        .filter_map(|offset_minutes| {
            let fires_at = window.start - Duration::minutes(i64::from(offset_minutes));
            (fires_at > now).then(|| Reminder {
                offset_minutes,
                fires_at,
                summary: summarize(spot, &window, offset_minutes, tz),
            })
        })
        .collect();

    ReminderPlan {
        next_cleaning: Some(window.start),
        reminders,
    }
}

fn summarize(spot: &MatchedSpot, window: &CleaningWindow, offset_minutes: u32, tz: Tz) -> String {
    let street = match (spot.street_name(), spot.street_id.as_deref()) {
        (Some(name), _) => name.to_string(),
        (None, Some(id)) => format!("street {}", id),
        (None, None) => format!("regulation {}", spot.regulation.regulation_id),
    };
    let side = spot
        .side
        .map(|side| format!(" ({} side)", side))
        .unwrap_or_default();
    let start = window.start.with_timezone(&tz);
    let end = window.end.with_timezone(&tz);

    format!(
        "Street cleaning on {}{} in {}: {} {}-{}",
        street,
        side,
        describe_offset(offset_minutes),
        start.format("%a %b %-d"),
        start.format("%-I:%M %p"),
        end.format("%-I:%M %p"),
    )
}

fn describe_offset(minutes: u32) -> String {
    let (hours, rest) = (minutes / 60, minutes % 60);
    match (hours, rest) {
        (0, 1) => "1 minute".to_string(),
        (0, m) => format!("{} minutes", m),
        (1, 0) => "1 hour".to_string(),
        (h, 0) => format!("{} hours", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}
