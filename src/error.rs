//! Typed errors for the crawl pipeline.
//!
//! `main` works with `anyhow`; everything below the binary edge returns one of
//! these so callers can tell a cancelled run apart from a failed listing.

use thiserror::Error;

/// Errors from the storage gateway.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No stored record with this id
    #[error("property not found: {id}")]
    NotFound { id: String },

    /// Underlying database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors from the geolocation provider.
#[derive(Debug, Error)]
pub enum GeoError {
    /// Request could not be sent or the connection failed
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with something other than 200
    #[error("unexpected status code: {0}")]
    Status(u16),

    /// Body did not decode into a distance matrix
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Body decoded but had no row/element to read a distance from
    #[error("no distance data in response")]
    NoRoute,

    /// Endpoint URL could not be built
    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    /// Run was cancelled while waiting to retry
    #[error("cancelled while retrying")]
    Cancelled,

    /// Every attempt failed; carries the last cause
    #[error("max retries reached after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<GeoError>,
    },
}

/// Errors from a notifier.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("notification rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Errors fetching listing or detail pages.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("rate limiter closed")]
    Limiter(#[from] tokio::sync::AcquireError),
}

/// Failure processing a single listing. Never aborts the page.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("listing has no id")]
    MissingId,

    #[error("error checking if property exists: {0}")]
    Exists(#[source] StorageError),

    #[error("error fetching existing property: {0}")]
    Lookup(#[source] StorageError),

    #[error("error calculating distance: {0}")]
    Enrichment(#[source] GeoError),

    /// Run stopped while the distance lookup was pending
    #[error("cancelled while calculating distance")]
    Cancelled,

    #[error("error saving or updating property: {0}")]
    Persist(#[source] StorageError),
}

impl From<GeoError> for ProcessError {
    fn from(err: GeoError) -> Self {
        match err {
            GeoError::Cancelled => ProcessError::Cancelled,
            other => ProcessError::Enrichment(other),
        }
    }
}

/// Why a run stopped before visiting every page.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum RunError {
    #[error("run was cancelled")]
    Cancelled,

    #[error("run deadline exceeded")]
    DeadlineExceeded,
}
