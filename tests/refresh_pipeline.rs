use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::America::Los_Angeles;
use serde_json::{json, Value};
use std::path::PathBuf;
use sweepsafe::fetch::{FeedSource, MemoryFeed};
use sweepsafe::reminder::{self, AlarmSink, Reminder};
use sweepsafe::{
    check_spot, refresh, Config, FetchError, Location, RefreshError, ReminderOffsets,
    RestrictionState, Side, SpotStore,
};

// 2024-01-08 is a Monday in the second week of January
fn at(d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Los_Angeles
        .with_ymd_and_hms(2024, 1, d, h, min, 0)
        .unwrap()
        .with_timezone(&Utc)
}

fn line(lat: f64) -> Value {
    json!({"type": "LineString", "coordinates": [[-122.4200, lat], [-122.4190, lat]]})
}

fn schedule_rows() -> Vec<Value> {
    [("Mon", "L"), ("Thu", "L"), ("Tue", "R"), ("Fri", "R")]
        .iter()
        .map(|(day, side)| {
            json!({
                "cnn": "100", "cnnrightleft": side, "weekday": day,
                "fromhour": "8", "tohour": "10",
                "week1": "1", "week2": "1", "week3": "1", "week4": "1", "week5": "1",
                "holidays": "0", "corridor": "Main St", "line": line(37.7600)
            })
        })
        .collect()
}

fn regulation_rows() -> Vec<Value> {
    vec![
        json!({
            "objectid": "north", "regulation": "Time limited", "rpparea1": "Q",
            "hrlimit": "2", "days": "M-F", "hrs_begin": "800", "hrs_end": "1800",
            "shape": line(37.76005)
        }),
        json!({
            "objectid": "south", "regulation": "Time limited",
            "hrlimit": "2", "days": "M-F", "hrs_begin": "800", "hrs_end": "1800",
            "shape": line(37.75995)
        }),
        json!({"objectid": "red-curb", "regulation": "No Stopping", "shape": line(37.76005)}),
        json!({"objectid": "no-shape", "regulation": "Time limited"}),
    ]
}

fn temp_store(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sweepsafe-it-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("snapshot.bin");
    let _ = std::fs::remove_file(&path);
    path
}

fn refreshed_store(name: &str) -> SpotStore {
    let store = SpotStore::open(temp_store(name)).unwrap();
    refresh(
        &MemoryFeed::new("schedules", schedule_rows()),
        &MemoryFeed::new("regulations", regulation_rows()),
        &Config::default(),
        &store,
    )
    .unwrap();
    store
}

struct DownFeed;

impl FeedSource for DownFeed {
    fn name(&self) -> &str {
        "regulations"
    }

    fn fetch_page(&self, _limit: usize, _offset: usize) -> Result<Vec<Value>, FetchError> {
        Err(FetchError::Other("connection reset".into()))
    }
}

#[test]
fn test_refresh_joins_and_persists() {
    let path = temp_store("persist");
    let store = SpotStore::open(&path).unwrap();
    let summary = refresh(
        &MemoryFeed::new("schedules", schedule_rows()),
        &MemoryFeed::new("regulations", regulation_rows()),
        &Config::default(),
        &store,
    )
    .unwrap();

    assert_eq!(summary.schedules, 4);
    assert_eq!(summary.skipped_rows, 1);
    assert_eq!(summary.parkable, 2);
    assert_eq!(summary.matched, 2);
    assert_eq!(summary.unmatched, 0);

    let snapshot = store.snapshot();
    assert!(snapshot.refreshed_at > 0);
    assert_eq!(snapshot.by_street_side("100", Side::Left).len(), 1);
    assert_eq!(snapshot.by_street_side("100", Side::Right).len(), 1);
    assert_eq!(snapshot.zones(), vec!["Q".to_string()]);

    let reopened = SpotStore::open(&path).unwrap();
    assert_eq!(*reopened.snapshot(), *snapshot);
}

#[test]
fn test_failed_feed_keeps_previous_snapshot() {
    let store = refreshed_store("failed");
    let before = store.snapshot();

    let err = refresh(
        &MemoryFeed::new("schedules", schedule_rows()),
        &DownFeed,
        &Config::default(),
        &store,
    )
    .unwrap_err();

    match err {
        RefreshError::Feed { feed, .. } => assert_eq!(feed, "regulations"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(*store.snapshot(), *before);
    let reopened = SpotStore::open(store.path().unwrap()).unwrap();
    assert_eq!(*reopened.snapshot(), *before);
}

#[test]
fn test_refresh_over_unreadable_snapshot() {
    let path = temp_store("corrupt");
    std::fs::write(&path, [0xff, 0xff, 0xff]).unwrap();
    assert!(SpotStore::open(&path).is_err());

    let store = SpotStore::open_or_empty(&path).unwrap();
    assert!(store.snapshot().is_empty());
    let summary = refresh(
        &MemoryFeed::new("schedules", schedule_rows()),
        &MemoryFeed::new("regulations", regulation_rows()),
        &Config::default(),
        &store,
    )
    .unwrap();
    assert_eq!(summary.parkable, 2);

    let reopened = SpotStore::open(&path).unwrap();
    assert_eq!(reopened.snapshot().len(), 2);
    assert_eq!(*reopened.snapshot(), *store.snapshot());
}

#[test]
fn test_status_after_refresh() {
    let store = refreshed_store("status");
    let snapshot = store.snapshot();
    let north_curb = Location::new(37.76005, -122.4195);
    let now = at(8, 9, 0);

    let (spot, state) =
        check_spot(&snapshot.spots, &north_curb, None, now, now, Los_Angeles, 20.0).unwrap();
    assert_eq!(spot.regulation.regulation_id, "north");
    assert_eq!(spot.side, Some(Side::Left));
    // Monday's 8:00 sweep has started, so Thursday's is next
    assert_eq!(
        state,
        RestrictionState::ActiveTimed {
            expiry: at(8, 11, 0),
            next_cleaning: Some(at(11, 8, 0)),
        }
    );

    let (_, state) =
        check_spot(&snapshot.spots, &north_curb, Some(" q "), now, now, Los_Angeles, 20.0).unwrap();
    assert_eq!(
        state,
        RestrictionState::PermitSafe {
            next_cleaning: Some(at(11, 8, 0)),
        }
    );

    let evening = at(8, 19, 0);
    let (_, state) =
        check_spot(&snapshot.spots, &north_curb, None, evening, evening, Los_Angeles, 20.0).unwrap();
    assert_eq!(
        state,
        RestrictionState::PendingTimed {
            starts_at: at(9, 8, 0),
            expiry: at(9, 10, 0),
            next_cleaning: Some(at(11, 8, 0)),
        }
    );

    let far = Location::new(37.7700, -122.4195);
    assert!(check_spot(&snapshot.spots, &far, None, now, now, Los_Angeles, 20.0).is_none());
}

#[derive(Default)]
struct Recorded(std::sync::Mutex<Vec<Reminder>>);

impl AlarmSink for Recorded {
    fn schedule_alarm(&self, reminder: &Reminder) {
        self.0.lock().unwrap().push(reminder.clone());
    }
}

#[test]
fn test_reminders_after_refresh() {
    let store = refreshed_store("remind");
    let snapshot = store.snapshot();
    let south_curb = Location::new(37.75995, -122.4195);
    let spot = sweepsafe::spot::find_matching_spot(&south_curb, &snapshot.spots, 20.0).unwrap();
    assert_eq!(spot.side, Some(Side::Right));

    // Sunday evening: Tuesday 8:00 is next for the right side
    let now = at(7, 20, 0);
    let offsets: ReminderOffsets = [60, 24 * 60, 3 * 24 * 60].into_iter().collect();
    let plan = reminder::schedule(spot, &offsets, now, Los_Angeles);
    assert_eq!(plan.next_cleaning, Some(at(9, 8, 0)));

    let sink = Recorded::default();
    assert_eq!(plan.deliver(&sink), 2);
    let fired: Vec<_> = sink.0.lock().unwrap().iter().map(|r| r.fires_at).collect();
    assert_eq!(fired, vec![at(9, 7, 0), at(8, 8, 0)]);
}
