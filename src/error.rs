//! Error types, one enum per failure domain.

use thiserror::Error;

/// Failure fetching a feed page. Aborts the refresh that requested it.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure from the HTTP client
    #[cfg(feature = "fetcher")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("feed returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// Page body was not a JSON array of rows
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local export could not be read
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other source-specific failure
    #[error("{0}")]
    Other(String),
}

/// A feed row that could not become a record. The row is skipped.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    /// Row is not a JSON object
    #[error("row is not a JSON object")]
    NotAnObject,

    /// Required field absent or blank
    #[error("missing or empty field `{0}`")]
    MissingField(&'static str),

    /// Field present but unusable
    #[error("invalid value for `{field}`: {value}")]
    InvalidField {
        /// Feed column name
        field: &'static str,
        /// Offending raw value
        value: String,
    },

    /// Geometry missing or degenerate
    #[error("geometry is missing or has fewer than two usable points")]
    InvalidGeometry,
}

/// Failure reading or writing the persisted snapshot.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded
    #[error("snapshot encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// Snapshot file is corrupt or from an incompatible build
    #[error("snapshot decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// Failure of a whole refresh. The previous snapshot stays current.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// A feed page could not be fetched
    #[error("fetching {feed} feed failed: {source}")]
    Feed {
        /// Name of the failing feed
        feed: String,
        /// Underlying fetch failure
        #[source]
        source: FetchError,
    },

    /// The new snapshot could not be committed
    #[error("committing snapshot failed: {0}")]
    Store(#[from] StoreError),
}

/// Why no location fix is available. Distinct from a fix that matches no spot.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    /// The platform refused location access
    #[error("location permission denied")]
    PermissionDenied,

    /// No fix could be obtained
    #[error("no location fix available")]
    Unavailable,
}

/// Failure loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("io error reading config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for [`Config`](crate::Config)
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Timezone name not in the IANA database
    #[error("unknown timezone `{0}`")]
    UnknownTimezone(String),
}
