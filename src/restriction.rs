//! "Will I get a ticket?" evaluation for one spot at one instant.
//!
//! [`evaluate`] is pure: the same inputs always produce the same [`RestrictionState`],
//! and it is safe to call concurrently with different clocks.

use crate::occurrence::{localize, next_cleaning};
use crate::types::{MatchedSpot, TimeLimitRule};
use chrono::{DateTime, Days, Duration, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Parking state of a spot, each variant carrying the next sweeping start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RestrictionState {
    /// No time limit applies.
    Unrestricted {
        /// Next sweeping start, if any
        next_cleaning: Option<DateTime<Utc>>,
    },
    /// The user's permit exempts them from the time limit.
    PermitSafe {
        /// Next sweeping start, if any
        next_cleaning: Option<DateTime<Utc>>,
    },
    /// The limit clock is running and ends at `expiry`.
    ActiveTimed {
        /// When the limit runs out
        expiry: DateTime<Utc>,
        /// Next sweeping start, if any
        next_cleaning: Option<DateTime<Utc>>,
    },
    /// Enforcement has not begun; the clock starts at `starts_at`.
    PendingTimed {
        /// When enforcement begins
        starts_at: DateTime<Utc>,
        /// When the limit runs out
        expiry: DateTime<Utc>,
        /// Next sweeping start, if any
        next_cleaning: Option<DateTime<Utc>>,
    },
}

impl RestrictionState {
    /// Next sweeping start, whatever the time-limit state.
    pub fn next_cleaning(&self) -> Option<DateTime<Utc>> {
        match self {
            RestrictionState::Unrestricted { next_cleaning }
            | RestrictionState::PermitSafe { next_cleaning }
            | RestrictionState::ActiveTimed { next_cleaning, .. }
            | RestrictionState::PendingTimed { next_cleaning, .. } => *next_cleaning,
        }
    }

    /// When the time limit runs out, if one applies.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        match self {
            RestrictionState::ActiveTimed { expiry, .. }
            | RestrictionState::PendingTimed { expiry, .. } => Some(*expiry),
            _ => None,
        }
    }

    /// Short machine-friendly name of the state.
    pub fn label(&self) -> &'static str {
        match self {
            RestrictionState::Unrestricted { .. } => "unrestricted",
            RestrictionState::PermitSafe { .. } => "permit_safe",
            RestrictionState::ActiveTimed { .. } => "active_timed",
            RestrictionState::PendingTimed { .. } => "pending_timed",
        }
    }
}

/// Evaluates a spot for a car parked at `parked_at`, as seen at `now`.
///
/// Order of precedence: matching permit zone, then the time-limit rule. When the car was
/// parked too late in an enforcement window to use the full limit, the clock starts at the
/// next window instead.
pub fn evaluate(
    spot: &MatchedSpot,
    user_zone: Option<&str>,
    parked_at: DateTime<Utc>,
    now: DateTime<Utc>,
    tz: Tz,
) -> RestrictionState {
    let next_cleaning = next_cleaning(&spot.schedules, now, tz);

    if permit_matches(spot.permit_zone(), user_zone) {
        return RestrictionState::PermitSafe { next_cleaning };
    }

    let Some(rule) = spot.regulation.time_limit_rule() else {
        return RestrictionState::Unrestricted { next_cleaning };
    };
    let Some(starts_at) = effective_start(&rule, parked_at, tz) else {
        return RestrictionState::Unrestricted { next_cleaning };
    };

    let expiry = starts_at + Duration::minutes(i64::from(rule.limit_minutes));
    if starts_at > now {
        RestrictionState::PendingTimed {
            starts_at,
            expiry,
            next_cleaning,
        }
    } else {
        RestrictionState::ActiveTimed {
            expiry,
            next_cleaning,
        }
    }
}

/// Instant the time-limit clock starts for a car parked at `parked_at`.
///
/// `None` when no enforcement window starts within the following week.
pub fn effective_start(rule: &TimeLimitRule, parked_at: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
    let local = parked_at.with_timezone(&tz);
    let limit_secs = rule.limit_minutes.saturating_mul(60);
    if rule
        .remaining_seconds(&local)
        .is_some_and(|remaining| remaining >= limit_secs)
    {
        return Some(parked_at);
    }

    let window_start = NaiveTime::from_num_seconds_from_midnight_opt(u32::from(rule.start_minute) * 60, 0)?;
    let today = local.date_naive();
    let in_window = |candidate: &DateTime<Utc>| rule.contains(&candidate.with_timezone(&tz));

    if let Some(candidate) = localize(tz, today, window_start) {
        if candidate > parked_at && in_window(&candidate) {
            return Some(candidate);
        }
    }

    (1..=7)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .filter_map(|date| localize(tz, date, window_start))
        .find(in_window)
}

fn permit_matches(spot_zone: Option<&str>, user_zone: Option<&str>) -> bool {
    match (spot_zone.map(str::trim), user_zone.map(str::trim)) {
        (Some(spot), Some(user)) => !spot.is_empty() && spot.eq_ignore_ascii_case(user),
        _ => false,
    }
}
