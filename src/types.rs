//! Core data structures shared by the matcher, the evaluators and the snapshot store.
//!
//! This module defines the records produced by feed parsing and the fused result of a
//! refresh:
//!
//! - [`Location`] / [`Polyline`] - points and street geometry in decimal degrees
//! - [`ScheduleRecord`] - one street-sweeping window for one side of one street
//! - [`RegulationRecord`] - one parking regulation block
//! - [`MatchedSpot`] - a regulation fused with the sweeping schedules of its street side

#![warn(missing_docs)]

use chrono::{Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Location {
    /// Latitude in decimal degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in decimal degrees (-180 to 180)
    pub longitude: f64,
}

impl Location {
    /// Constructs a new Location from coordinates.
    ///
    /// # Examples
    ///
    /// ```
    /// use sweepsafe::Location;
    ///
    /// let loc = Location::new(37.7599, -122.4148);
    /// assert_eq!(loc.latitude, 37.7599);
    /// assert_eq!(loc.longitude, -122.4148);
    /// ```
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// An ordered sequence of vertices describing a street block.
///
/// Feeds publish coordinates as `[longitude, latitude]`; [`Polyline::from_lng_lat`]
/// accepts that order directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Polyline {
    /// Vertices in drawing order
    pub points: Vec<Location>,
}

impl Polyline {
    /// Wraps an ordered list of vertices.
    pub fn new(points: Vec<Location>) -> Self {
        Self { points }
    }

    /// Builds a polyline from `(longitude, latitude)` pairs.
    ///
    /// ```
    /// use sweepsafe::Polyline;
    ///
    /// let line = Polyline::from_lng_lat(&[(-122.42, 37.76), (-122.41, 37.76)]);
    /// assert_eq!(line.points[0].latitude, 37.76);
    /// ```
    pub fn from_lng_lat(pairs: &[(f64, f64)]) -> Self {
        Self {
            points: pairs
                .iter()
                .map(|&(longitude, latitude)| Location::new(latitude, longitude))
                .collect(),
        }
    }

    /// Vertices with finite coordinates, in order.
    pub fn usable_points(&self) -> Vec<Location> {
        self.points.iter().copied().filter(Location::is_finite).collect()
    }

    /// Number of vertices, usable or not.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the polyline has no vertices at all.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Side of a street centerline, relative to the direction the centerline is drawn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub enum Side {
    /// Left of the drawing direction
    Left,
    /// Right of the drawing direction
    Right,
}

impl Side {
    /// Parses `L`, `R`, `Left` or `Right`, ignoring case and surrounding whitespace.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "L" | "LEFT" => Some(Side::Left),
            "R" | "RIGHT" => Some(Side::Right),
            _ => None,
        }
    }

    /// Single-letter code used in feed rows and grouping keys.
    pub fn code(self) -> &'static str {
        match self {
            Side::Left => "L",
            Side::Right => "R",
        }
    }

    /// The opposite side.
    pub fn flipped(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Day a sweeping window applies to. `Holiday` never falls on a calendar weekday.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub enum SweepDay {
    /// Monday
    Mon,
    /// Tuesday
    Tue,
    /// Wednesday
    Wed,
    /// Thursday
    Thu,
    /// Friday
    Fri,
    /// Saturday
    Sat,
    /// Sunday
    Sun,
    /// Holiday-only sweeping
    Holiday,
}

impl SweepDay {
    /// Parses the weekday labels the sweeping feed uses (`Mon`, `Tues`, `Thu`, `Holiday`, ...).
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "mon" | "monday" => Some(SweepDay::Mon),
            "tue" | "tues" | "tuesday" => Some(SweepDay::Tue),
            "wed" | "weds" | "wednesday" => Some(SweepDay::Wed),
            "thu" | "thur" | "thurs" | "thursday" => Some(SweepDay::Thu),
            "fri" | "friday" => Some(SweepDay::Fri),
            "sat" | "saturday" => Some(SweepDay::Sat),
            "sun" | "sunday" => Some(SweepDay::Sun),
            "holiday" | "holidays" => Some(SweepDay::Holiday),
            _ => None,
        }
    }

    /// Calendar weekday, or `None` for [`SweepDay::Holiday`].
    pub fn weekday(self) -> Option<Weekday> {
        match self {
            SweepDay::Mon => Some(Weekday::Mon),
            SweepDay::Tue => Some(Weekday::Tue),
            SweepDay::Wed => Some(Weekday::Wed),
            SweepDay::Thu => Some(Weekday::Thu),
            SweepDay::Fri => Some(Weekday::Fri),
            SweepDay::Sat => Some(Weekday::Sat),
            SweepDay::Sun => Some(Weekday::Sun),
            SweepDay::Holiday => None,
        }
    }
}

/// One street-sweeping window for one side of one street segment.
///
/// A street side swept on several weekdays appears as several records sharing
/// `street_id` and `side`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct ScheduleRecord {
    /// Street centerline identifier
    pub street_id: String,
    /// Side of the centerline the schedule applies to
    pub side: Side,
    /// Weekday swept
    pub day: SweepDay,
    /// Local hour sweeping starts (0-23)
    pub start_hour: u8,
    /// Local hour sweeping ends (1-24)
    pub end_hour: u8,
    /// Whether the 1st through 5th occurrence of `day` in a month is swept
    pub weeks: [bool; 5],
    /// Whether sweeping also happens on public holidays
    pub holidays: bool,
    /// Street name, when published
    pub street_name: Option<String>,
    /// Block limits description (e.g. "Mission St - Valencia St")
    pub limits: Option<String>,
    /// Centerline geometry
    pub geometry: Polyline,
}

impl ScheduleRecord {
    /// Grouping key `street_id:side` shared by every weekday of the same street side.
    pub fn street_key(&self) -> String {
        street_key(&self.street_id, self.side)
    }
}

/// Builds the `street_id:side` grouping key.
pub fn street_key(street_id: &str, side: Side) -> String {
    format!("{}:{}", street_id, side.code())
}

/// Category of a parking regulation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub enum RegulationKind {
    /// Time-limited parking, permit holders exempt
    TimeLimited,
    /// Metered unless holding a permit
    PayOrPermit,
    /// Metered and permit area
    PaidPlusPermit,
    /// No overnight parking
    NoOvernight,
    /// No oversized vehicles
    NoOversized,
    /// Residential permit holders only
    RppOnly,
    /// No parking at any time
    NoParking,
    /// No stopping at any time
    NoStopping,
    /// Government vehicles only
    GovernmentOnly,
    /// Label not recognized
    Unknown,
}

impl RegulationKind {
    /// Maps the feed's free-text regulation label to a kind.
    pub fn parse(label: &str) -> Self {
        let label = label.trim().to_ascii_lowercase();
        if label.contains("no stopping") {
            RegulationKind::NoStopping
        } else if label.contains("overnight") {
            RegulationKind::NoOvernight
        } else if label.contains("oversize") {
            RegulationKind::NoOversized
        } else if label.contains("no parking") {
            RegulationKind::NoParking
        } else if label.contains("government") {
            RegulationKind::GovernmentOnly
        } else if label.contains("rpp only") {
            RegulationKind::RppOnly
        } else if label.contains("paid + permit") || label.contains("paid+permit") {
            RegulationKind::PaidPlusPermit
        } else if label.contains("pay or permit") {
            RegulationKind::PayOrPermit
        } else if label.contains("time limit") {
            RegulationKind::TimeLimited
        } else {
            RegulationKind::Unknown
        }
    }

    /// Whether the general public can park under this regulation at some point.
    pub fn is_parkable(self) -> bool {
        matches!(
            self,
            RegulationKind::TimeLimited
                | RegulationKind::PayOrPermit
                | RegulationKind::PaidPlusPermit
                | RegulationKind::NoOvernight
                | RegulationKind::NoOversized
                | RegulationKind::RppOnly
        )
    }
}

/// Days a regulation is enforced, indexed Monday = 0 through Sunday = 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct EnforcementDays(pub [bool; 7]);

impl EnforcementDays {
    /// Every day of the week.
    pub const ALL: EnforcementDays = EnforcementDays([true; 7]);

    /// Whether enforcement happens on `weekday`.
    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0[weekday.num_days_from_monday() as usize]
    }

    /// Parses labels such as `M-F`, `M-Sa`, `Daily`, `Sa, Su` or `M, W, F`.
    ///
    /// ```
    /// use chrono::Weekday;
    /// use sweepsafe::types::EnforcementDays;
    ///
    /// let days = EnforcementDays::parse("M-F").unwrap();
    /// assert!(days.contains(Weekday::Fri));
    /// assert!(!days.contains(Weekday::Sat));
    /// ```
    pub fn parse(label: &str) -> Option<Self> {
        let normalized: String = label
            .to_ascii_uppercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if normalized.is_empty() {
            return None;
        }
        if normalized == "DAILY" || normalized == "ALL" {
            return Some(Self::ALL);
        }

        let mut days = [false; 7];
        for token in normalized.split([',', '/', '&']).filter(|t| !t.is_empty()) {
            match token.split_once('-') {
                Some((from, to)) => {
                    let (from, to) = (day_index(from)?, day_index(to)?);
                    let mut idx = from;
                    loop {
                        days[idx] = true;
                        if idx == to {
                            break;
                        }
                        idx = (idx + 1) % 7;
                    }
                }
                None => days[day_index(token)?] = true,
            }
        }
        Some(Self(days))
    }
}

fn day_index(token: &str) -> Option<usize> {
    match token {
        "M" | "MO" | "MON" => Some(0),
        "T" | "TU" | "TUE" | "TUES" => Some(1),
        "W" | "WE" | "WED" => Some(2),
        "TH" | "R" | "THU" | "THUR" | "THURS" => Some(3),
        "F" | "FR" | "FRI" => Some(4),
        "SA" | "SAT" => Some(5),
        "SU" | "SUN" => Some(6),
        _ => None,
    }
}

/// One parking regulation block from the regulation feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct RegulationRecord {
    /// Regulation identifier
    pub regulation_id: String,
    /// Regulation category
    pub kind: RegulationKind,
    /// Residential permit area label (e.g. "A", "Q"), when the block is in one
    pub permit_zone: Option<String>,
    /// Time limit in hours, when the block is time-limited
    pub hour_limit: Option<f64>,
    /// Enforcement days; `None` means every day
    pub days: Option<EnforcementDays>,
    /// Enforcement start as minutes after local midnight
    pub enforcement_start: Option<u16>,
    /// Enforcement end as minutes after local midnight (1440 = midnight at day end)
    pub enforcement_end: Option<u16>,
    /// Block geometry
    pub geometry: Polyline,
}

impl RegulationRecord {
    /// The time-limit rule, when the block has a positive limit and an enforcement window.
    pub fn time_limit_rule(&self) -> Option<TimeLimitRule> {
        let hours = self.hour_limit.filter(|h| h.is_finite() && *h > 0.0)?;
        let start_minute = self.enforcement_start.filter(|m| *m < 1440)?;
        let end_minute = self.enforcement_end.filter(|m| *m <= 1440)?;
        Some(TimeLimitRule {
            limit_minutes: (hours * 60.0).round() as u32,
            days: self.days.unwrap_or(EnforcementDays::ALL),
            start_minute,
            end_minute,
        })
    }
}

/// Time-limit enforcement extracted from a [`RegulationRecord`].
///
/// `start_minute > end_minute` denotes a window that wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLimitRule {
    /// Maximum stay in minutes
    pub limit_minutes: u32,
    /// Enforcement days
    pub days: EnforcementDays,
    /// Window start, minutes after local midnight
    pub start_minute: u16,
    /// Window end, minutes after local midnight
    pub end_minute: u16,
}

impl TimeLimitRule {
    /// Whether the window wraps past midnight.
    pub fn is_overnight(&self) -> bool {
        self.start_minute > self.end_minute
    }

    /// Whether a local instant lies inside the window, both endpoints included.
    pub fn contains<T: Timelike + chrono::Datelike>(&self, local: &T) -> bool {
        if !self.days.contains(local.weekday()) {
            return false;
        }
        let secs = local.num_seconds_from_midnight();
        let (start, end) = self.window_seconds();
        if self.is_overnight() {
            secs >= start || secs <= end
        } else {
            secs >= start && secs <= end
        }
    }

    /// Seconds of enforcement left in the current window at `local`, or `None` outside it.
    pub fn remaining_seconds<T: Timelike + chrono::Datelike>(&self, local: &T) -> Option<u32> {
        if !self.contains(local) {
            return None;
        }
        let secs = local.num_seconds_from_midnight();
        let (start, end) = self.window_seconds();
        Some(if self.is_overnight() && secs >= start {
            86_400 - secs + end
        } else {
            end - secs
        })
    }

    fn window_seconds(&self) -> (u32, u32) {
        (
            u32::from(self.start_minute) * 60,
            u32::from(self.end_minute) * 60,
        )
    }
}

/// A regulation block fused with the sweeping schedules of its resolved street side.
///
/// All attached schedules share `side`; a spot without a match has no street, side or
/// schedules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct MatchedSpot {
    /// The regulation block
    pub regulation: RegulationRecord,
    /// Matched street centerline identifier
    pub street_id: Option<String>,
    /// Resolved side of the matched street
    pub side: Option<Side>,
    /// Every sweeping schedule for `street_id:side`
    pub schedules: Vec<ScheduleRecord>,
}

impl MatchedSpot {
    /// A spot with no sweeping data attached.
    pub fn unmatched(regulation: RegulationRecord) -> Self {
        Self {
            regulation,
            street_id: None,
            side: None,
            schedules: Vec::new(),
        }
    }

    /// Permit area of the underlying regulation.
    pub fn permit_zone(&self) -> Option<&str> {
        self.regulation.permit_zone.as_deref()
    }

    /// Street name from the first attached schedule, if any.
    pub fn street_name(&self) -> Option<&str> {
        self.schedules
            .iter()
            .find_map(|schedule| schedule.street_name.as_deref())
    }
}
