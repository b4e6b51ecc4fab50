//! Next-start arithmetic for "Nth weekday of the month" sweeping schedules.

use crate::types::{ScheduleRecord, SweepDay};
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Upper bound on the forward day walk; a schedule with no hit in a year is malformed.
const MAX_SCAN_DAYS: u64 = 52 * 7;

/// A concrete sweeping window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleaningWindow {
    /// Sweeping start
    pub start: DateTime<Utc>,
    /// Sweeping end
    pub end: DateTime<Utc>,
}

/// The first start of a recurring sweeping window strictly after `now`.
///
/// `weeks[n]` enables the (n+1)-th occurrence of `day` within a calendar month.
/// Returns `None` for [`SweepDay::Holiday`], an invalid hour, or when no enabled week
/// falls within a year.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use chrono_tz::America::Los_Angeles;
/// use sweepsafe::occurrence::next_occurrence;
/// use sweepsafe::types::SweepDay;
///
/// // Monday 2024-01-08 14:00 local
/// let now = Los_Angeles.with_ymd_and_hms(2024, 1, 8, 14, 0, 0).unwrap().with_timezone(&Utc);
/// let next = next_occurrence(SweepDay::Mon, 8, &[true; 5], now, Los_Angeles).unwrap();
/// assert_eq!(next, Los_Angeles.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap());
/// ```
pub fn next_occurrence(
    day: SweepDay,
    start_hour: u8,
    weeks: &[bool; 5],
    now: DateTime<Utc>,
    tz: Tz,
) -> Option<DateTime<Utc>> {
    let weekday = day.weekday()?;
    let start = NaiveTime::from_hms_opt(u32::from(start_hour), 0, 0)?;
    let today = now.with_timezone(&tz).date_naive();

    (0..MAX_SCAN_DAYS)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .filter(|date| date.weekday() == weekday && weeks[week_of_month(*date) - 1])
        .filter_map(|date| localize(tz, date, start))
        .find(|candidate| *candidate > now)
}

/// Ordinal (1-5) of `date`'s weekday within its month.
pub fn week_of_month(date: NaiveDate) -> usize {
    (date.day0() / 7 + 1) as usize
}

/// Next start of one schedule record.
pub fn next_start(schedule: &ScheduleRecord, now: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
    next_occurrence(schedule.day, schedule.start_hour, &schedule.weeks, now, tz)
}

/// Earliest next start across a spot's schedules.
pub fn next_cleaning(
    schedules: &[ScheduleRecord],
    now: DateTime<Utc>,
    tz: Tz,
) -> Option<DateTime<Utc>> {
    schedules
        .iter()
        .filter_map(|schedule| next_start(schedule, now, tz))
        .min()
}

/// Next full window (start and end) of one schedule record.
pub fn next_window(schedule: &ScheduleRecord, now: DateTime<Utc>, tz: Tz) -> Option<CleaningWindow> {
    let start = next_start(schedule, now, tz)?;
    let hours = if schedule.end_hour > schedule.start_hour {
        schedule.end_hour - schedule.start_hour
    } else {
        schedule.end_hour + 24 - schedule.start_hour
    };
    Some(CleaningWindow {
        start,
        end: start + Duration::hours(i64::from(hours)),
    })
}

/// Earliest next window across a spot's schedules.
pub fn next_cleaning_window(
    schedules: &[ScheduleRecord],
    now: DateTime<Utc>,
    tz: Tz,
) -> Option<CleaningWindow> {
    schedules
        .iter()
        .filter_map(|schedule| next_window(schedule, now, tz))
        .min_by_key(|window| window.start)
}

/// Resolves a local wall-clock time to an instant.
///
/// Ambiguous times take the earlier instant; times inside a DST gap move forward an hour.
pub(crate) fn localize(tz: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    let naive = date.and_time(time);
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|local| local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Polyline, Side};
    use chrono_tz::America::Los_Angeles;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Los_Angeles
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn schedule(day: SweepDay, start_hour: u8, end_hour: u8, weeks: [bool; 5]) -> ScheduleRecord {
        ScheduleRecord {
            street_id: "100".into(),
            side: Side::Left,
            day,
            start_hour,
            end_hour,
            weeks,
            holidays: false,
            street_name: None,
            limits: None,
            geometry: Polyline::default(),
        }
    }

    #[test]
    fn test_following_week_when_today_has_passed() {
        let next = next_occurrence(SweepDay::Mon, 8, &[true; 5], at(2024, 1, 8, 14, 0), Los_Angeles);
        assert_eq!(next, Some(at(2024, 1, 15, 8, 0)));
    }

    #[test]
    fn test_same_day_when_still_ahead() {
        let next = next_occurrence(SweepDay::Mon, 8, &[true; 5], at(2024, 1, 8, 7, 0), Los_Angeles);
        assert_eq!(next, Some(at(2024, 1, 8, 8, 0)));
    }

    #[test]
    fn test_start_equal_to_now_is_not_next() {
        let next = next_occurrence(SweepDay::Mon, 8, &[true; 5], at(2024, 1, 8, 8, 0), Los_Angeles);
        assert_eq!(next, Some(at(2024, 1, 15, 8, 0)));
    }

    #[test]
    fn test_second_and_fourth_weeks() {
        // Tuesdays in January 2024: 2, 9, 16, 23, 30
        let weeks = [false, true, false, true, false];
        let now = at(2024, 1, 1, 0, 0);
        assert_eq!(
            next_occurrence(SweepDay::Tue, 6, &weeks, now, Los_Angeles),
            Some(at(2024, 1, 9, 6, 0))
        );
        let now = at(2024, 1, 10, 0, 0);
        assert_eq!(
            next_occurrence(SweepDay::Tue, 6, &weeks, now, Los_Angeles),
            Some(at(2024, 1, 23, 6, 0))
        );
    }

    #[test]
    fn test_fifth_week_skips_short_months() {
        // Feb and Mar 2024 have four Tuesdays; April has five.
        let weeks = [false, false, false, false, true];
        let next = next_occurrence(SweepDay::Tue, 9, &weeks, at(2024, 2, 1, 0, 0), Los_Angeles);
        assert_eq!(next, Some(at(2024, 4, 30, 9, 0)));
    }

    #[test]
    fn test_week_of_month() {
        let date = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        assert_eq!(week_of_month(date(1)), 1);
        assert_eq!(week_of_month(date(7)), 1);
        assert_eq!(week_of_month(date(8)), 2);
        assert_eq!(week_of_month(date(29)), 5);
    }

    #[test]
    fn test_holiday_and_malformed_schedules() {
        let now = at(2024, 1, 8, 14, 0);
        assert_eq!(next_occurrence(SweepDay::Holiday, 8, &[true; 5], now, Los_Angeles), None);
        assert_eq!(next_occurrence(SweepDay::Mon, 8, &[false; 5], now, Los_Angeles), None);
        assert_eq!(next_occurrence(SweepDay::Mon, 25, &[true; 5], now, Los_Angeles), None);
    }

    #[test]
    fn test_dst_spring_forward_keeps_wall_clock() {
        // 2024-03-10 is the DST switch in Los Angeles; the following Monday is PDT.
        let next = next_occurrence(SweepDay::Mon, 8, &[true; 5], at(2024, 3, 9, 12, 0), Los_Angeles);
        assert_eq!(next, Some(at(2024, 3, 11, 8, 0)));
        assert_eq!(next.unwrap().format("%H").to_string(), "15");
    }

    #[test]
    fn test_next_cleaning_is_earliest() {
        let schedules = vec![
            schedule(SweepDay::Thu, 8, 10, [true; 5]),
            schedule(SweepDay::Tue, 12, 14, [true; 5]),
            schedule(SweepDay::Holiday, 8, 10, [true; 5]),
        ];
        let now = at(2024, 1, 8, 14, 0);
        assert_eq!(next_cleaning(&schedules, now, Los_Angeles), Some(at(2024, 1, 9, 12, 0)));
        assert_eq!(next_cleaning(&[], now, Los_Angeles), None);
    }

    #[test]
    fn test_next_window_bounds() {
        let now = at(2024, 1, 8, 14, 0);
        let window = next_window(&schedule(SweepDay::Tue, 12, 14, [true; 5]), now, Los_Angeles).unwrap();
        assert_eq!(window.start, at(2024, 1, 9, 12, 0));
        assert_eq!(window.end, at(2024, 1, 9, 14, 0));

        let overnight = next_window(&schedule(SweepDay::Tue, 22, 2, [true; 5]), now, Los_Angeles).unwrap();
        assert_eq!(overnight.end, at(2024, 1, 10, 2, 0));

        let windows = vec![
            schedule(SweepDay::Fri, 6, 8, [true; 5]),
            schedule(SweepDay::Wed, 6, 8, [true; 5]),
        ];
        let earliest = next_cleaning_window(&windows, now, Los_Angeles).unwrap();
        assert_eq!(earliest.start, at(2024, 1, 10, 6, 0));
    }
}
