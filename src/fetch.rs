//! Paginated access to the two open-data feeds.
//!
//! [`FeedSource`] is the seam between the refresh pipeline and transport. The HTTP
//! implementation, [`SocrataClient`], is only compiled with the `fetcher` feature;
//! [`MemoryFeed`] serves rows already in memory or read from a JSON export.

use crate::error::FetchError;
use serde_json::Value;
use std::path::Path;

/// A paginated feed of JSON rows.
pub trait FeedSource: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Fetches up to `limit` rows starting at row `offset`. An empty page ends the feed.
    fn fetch_page(&self, limit: usize, offset: usize) -> Result<Vec<Value>, FetchError>;
}

/// Reads every page of `source` until an empty page.
///
/// Any page failure aborts the whole read; no partial result is returned.
pub fn fetch_all(source: &dyn FeedSource, page_size: usize) -> Result<Vec<Value>, FetchError> {
    let page_size = page_size.max(1);
    let mut rows = Vec::new();
    loop {
        let page = source.fetch_page(page_size, rows.len())?;
        if page.is_empty() {
            break;
        }
        log::debug!("{}: fetched {} rows at offset {}", source.name(), page.len(), rows.len());
        rows.extend(page);
    }
    log::info!("{}: fetched {} rows", source.name(), rows.len());
    Ok(rows)
}

/// Rows held in memory, paged on request.
pub struct MemoryFeed {
    name: String,
    rows: Vec<Value>,
}

impl MemoryFeed {
    /// Serves `rows` under `name`.
    pub fn new(name: impl Into<String>, rows: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Loads a JSON array of rows, e.g. a full export downloaded from the portal.
    pub fn from_path(name: impl Into<String>, path: &Path) -> Result<Self, FetchError> {
        let bytes = std::fs::read(path)?;
        let rows: Vec<Value> = serde_json::from_slice(&bytes)?;
        Ok(Self::new(name, rows))
    }
}

impl FeedSource for MemoryFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_page(&self, limit: usize, offset: usize) -> Result<Vec<Value>, FetchError> {
        Ok(self.rows.iter().skip(offset).take(limit).cloned().collect())
    }
}

/// Blocking client for a Socrata-style `resource/<id>.json` endpoint.
#[cfg(feature = "fetcher")]
pub struct SocrataClient {
    client: reqwest::blocking::Client,
    name: String,
    url: String,
    app_token: Option<String>,
}

#[cfg(feature = "fetcher")]
impl SocrataClient {
    /// Builds a client for `url`, sending `app_token` when given.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        app_token: Option<String>,
    ) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .user_agent(concat!("sweepsafe/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            name: name.into(),
            url: url.into(),
            app_token,
        })
    }
}

#[cfg(feature = "fetcher")]
impl FeedSource for SocrataClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_page(&self, limit: usize, offset: usize) -> Result<Vec<Value>, FetchError> {
        let url = format!("{}?$limit={}&$offset={}&$order=:id", self.url, limit, offset);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.app_token {
            request = request.header("X-App-Token", token);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text()?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyFeed {
        rows: MemoryFeed,
        fail_at_offset: usize,
        calls: AtomicUsize,
    }

    impl FeedSource for FlakyFeed {
        fn name(&self) -> &str {
            "flaky"
        }

        fn fetch_page(&self, limit: usize, offset: usize) -> Result<Vec<Value>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if offset >= self.fail_at_offset {
                return Err(FetchError::Status {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            self.rows.fetch_page(limit, offset)
        }
    }

    fn rows(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({ "objectid": i })).collect()
    }

    #[test]
    fn test_fetch_all_pages_until_empty() {
        let feed = MemoryFeed::new("regulations", rows(25));
        let all = fetch_all(&feed, 10).unwrap();
        assert_eq!(all.len(), 25);
        assert_eq!(all[24]["objectid"], 24);
    }

    #[test]
    fn test_fetch_all_exact_multiple_and_empty() {
        assert_eq!(fetch_all(&MemoryFeed::new("a", rows(20)), 10).unwrap().len(), 20);
        assert!(fetch_all(&MemoryFeed::new("b", Vec::new()), 10).unwrap().is_empty());
        // A zero page size is treated as one row per page
        assert_eq!(fetch_all(&MemoryFeed::new("c", rows(3)), 0).unwrap().len(), 3);
    }

    #[test]
    fn test_page_failure_aborts() {
        let feed = FlakyFeed {
            rows: MemoryFeed::new("inner", rows(50)),
            fail_at_offset: 20,
            calls: AtomicUsize::new(0),
        };
        let err = fetch_all(&feed, 10).unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
        assert_eq!(feed.calls.load(Ordering::SeqCst), 3);
    }
}
