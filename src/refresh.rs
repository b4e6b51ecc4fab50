//! The fetch, join and commit pipeline behind a snapshot refresh.

use crate::config::Config;
use crate::error::RefreshError;
use crate::feed::{parse_regulations, parse_schedules};
use crate::fetch::{fetch_all, FeedSource};
use crate::matcher::ScheduleMatcher;
use crate::store::{Snapshot, SpotStore};
use crate::types::MatchedSpot;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

/// Counts from one refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    /// Schedule rows parsed
    pub schedules: usize,
    /// Regulation rows parsed, parkable or not
    pub regulations: usize,
    /// Rows of either feed dropped as malformed
    pub skipped_rows: usize,
    /// Spots written to the snapshot
    pub parkable: usize,
    /// Spots joined to a sweeping schedule
    pub matched: usize,
    /// Spots with no schedule within the match threshold
    pub unmatched: usize,
}

/// Fetches both feeds, joins them and replaces the store's snapshot.
///
/// A feed failure aborts before anything is written, leaving the previous snapshot in
/// place. Malformed rows are skipped.
pub fn refresh(
    schedules: &dyn FeedSource,
    regulations: &dyn FeedSource,
    config: &Config,
    store: &SpotStore,
) -> Result<RefreshSummary, RefreshError> {
    log::info!("Fetching {} and {} feeds...", schedules.name(), regulations.name());
    let (schedule_rows, regulation_rows) = fetch_feeds(schedules, regulations, config.page_size)?;

    log::info!(
        "Matching {} regulation rows against {} schedule rows...",
        regulation_rows.len(),
        schedule_rows.len()
    );
    let (snapshot, summary) = build_snapshot(
        &schedule_rows,
        &regulation_rows,
        config.match_threshold_meters,
        Utc::now().timestamp(),
    );

    log::info!("Committing {} spots...", snapshot.len());
    store.replace_all(snapshot)?;
    log::info!(
        "Done! {} matched, {} unmatched, {} rows skipped",
        summary.matched,
        summary.unmatched,
        summary.skipped_rows
    );
    Ok(summary)
}

/// Joins already-fetched feed rows into a snapshot. Pure and CPU-bound.
pub fn build_snapshot(
    schedule_rows: &[Value],
    regulation_rows: &[Value],
    threshold_meters: f64,
    refreshed_at: i64,
) -> (Snapshot, RefreshSummary) {
    let (schedules, skipped_schedules) = parse_schedules(schedule_rows);
    let (regulations, skipped_regulations) = parse_regulations(regulation_rows);

    let mut summary = RefreshSummary {
        schedules: schedules.len(),
        regulations: regulations.len(),
        skipped_rows: skipped_schedules + skipped_regulations,
        ..RefreshSummary::default()
    };

    let matcher = ScheduleMatcher::new(schedules);
    let spots: Vec<MatchedSpot> = regulations
        .into_iter()
        .filter(|regulation| regulation.kind.is_parkable())
        .map(|regulation| match matcher.find_match(&regulation.geometry, threshold_meters) {
            Some(found) => {
                summary.matched += 1;
                MatchedSpot {
                    regulation,
                    street_id: Some(found.street_id),
                    side: Some(found.side),
                    schedules: found.schedules,
                }
            }
            None => {
                summary.unmatched += 1;
                log::debug!("regulation {} has no sweeping match", regulation.regulation_id);
                MatchedSpot::unmatched(regulation)
            }
        })
        .collect();
    summary.parkable = spots.len();

    (
        Snapshot {
            refreshed_at,
            spots,
        },
        summary,
    )
}

fn fetch_feeds(
    schedules: &dyn FeedSource,
    regulations: &dyn FeedSource,
    page_size: usize,
) -> Result<(Vec<Value>, Vec<Value>), RefreshError> {
    let (schedule_rows, regulation_rows) = std::thread::scope(|scope| {
        let schedule_job = scope.spawn(|| fetch_all(schedules, page_size));
        let regulation_rows = fetch_all(regulations, page_size);
        let schedule_rows = schedule_job
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
        (schedule_rows, regulation_rows)
    });

    let schedule_rows = schedule_rows.map_err(|source| RefreshError::Feed {
        feed: schedules.name().to_string(),
        source,
    })?;
    let regulation_rows = regulation_rows.map_err(|source| RefreshError::Feed {
        feed: regulations.name().to_string(),
        source,
    })?;
    Ok((schedule_rows, regulation_rows))
}
