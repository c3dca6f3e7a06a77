//! Error types shared across the catalog resolver, fetcher, archive reader,
//! per-resource worker, and orchestrator.
//!
//! The taxonomy mirrors how the engine actually recovers from failure: most
//! variants never reach a caller as an `Err` — they are captured as a
//! [`Failure`](crate::types::Failure) entry on the response instead (see
//! [`Error::failure_reason`]). Only [`Error::InvalidRequest`] and
//! [`Error::Internal`] ever propagate out of the orchestrator.

use thiserror::Error;

/// The error type for scripture-search-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The caller's request failed validation (empty query, out-of-range
    /// option). Short-circuits before any work is scheduled; surfaced as
    /// HTTP 400 by the server.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The upstream catalog could not be reached or returned an error, and
    /// the static fallback descriptor list was used instead. This is
    /// informational, not fatal — the search still proceeds.
    #[error("catalog unavailable, used fallback descriptors: {0}")]
    CatalogUnavailable(String),

    /// A worker's archive fetch exceeded its timeout.
    #[error("fetch timed out after {elapsed_ms}ms")]
    FetchTimeout {
        /// Milliseconds elapsed before the timeout fired.
        elapsed_ms: u64,
    },

    /// The archive URL returned 404 or an equivalent not-found status.
    #[error("archive not found at '{url}'")]
    FetchNotFound {
        /// The archive URL that could not be found.
        url: String,
    },

    /// A transient network or server error occurred while fetching the
    /// archive (connection reset, 5xx, DNS failure).
    #[error("transient fetch error for '{url}': {reason}")]
    FetchTransient {
        /// The archive URL being fetched.
        url: String,
        /// Description of the transient failure.
        reason: String,
    },

    /// The archive exceeded `SEARCH_ARCHIVE_MAX_BYTES`.
    #[error("archive at '{url}' exceeds the {limit_bytes} byte cap")]
    FetchTooLarge {
        /// The archive URL that was rejected.
        url: String,
        /// The configured byte limit that was exceeded.
        limit_bytes: u64,
    },

    /// The archive could not be opened as a ZIP file at all (central
    /// directory missing or malformed). Individual unreadable entries do
    /// not raise this — they are simply skipped.
    #[error("archive corrupt: {0}")]
    ArchiveCorrupt(String),

    /// A worker exceeded its CPU budget while indexing and stopped early,
    /// scoring and returning whatever it had indexed so far.
    #[error("worker exceeded its {budget_ms}ms CPU budget after indexing {indexed} documents")]
    BudgetExceeded {
        /// The configured per-worker CPU budget in milliseconds.
        budget_ms: u64,
        /// Number of documents successfully indexed before the budget fired.
        indexed: usize,
    },

    /// A worker did not complete before the orchestrator's global deadline
    /// and was abandoned.
    #[error("worker abandoned after exceeding the global deadline")]
    WorkerTimeout,

    /// A worker observed the orchestrator's cancellation signal at a
    /// suspension point and returned early.
    #[error("worker cancelled")]
    Cancelled,

    /// The orchestrator could not produce any response: the catalog
    /// resolver and its fallback both failed to yield descriptors, or every
    /// worker failed. Extremely rare; surfaced as HTTP 500.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O operation failed (reading archive bytes, cache storage).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network operation failed at the transport layer.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl Error {
    /// Whether this error is typically transient and might succeed on retry.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::FetchTimeout { .. } | Self::FetchTransient { .. } | Self::WorkerTimeout => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// A stable category string for logging and metrics grouping.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::CatalogUnavailable(_) => "catalog_unavailable",
            Self::FetchTimeout { .. } => "fetch_timeout",
            Self::FetchNotFound { .. } => "fetch_not_found",
            Self::FetchTransient { .. } => "fetch_transient",
            Self::FetchTooLarge { .. } => "fetch_too_large",
            Self::ArchiveCorrupt(_) => "archive_corrupt",
            Self::BudgetExceeded { .. } => "budget_exceeded",
            Self::WorkerTimeout => "worker_timeout",
            Self::Cancelled => "cancelled",
            Self::Internal(_) => "internal",
            Self::Io(_) => "io",
            Self::Network(_) => "network",
        }
    }

    /// The short, stable diagnostic reason recorded in a
    /// [`Failure`](crate::types::Failure) entry. Distinct from `Display`,
    /// which is meant for logs — this is meant for machine-readable
    /// `failures[].reason` fields that clients may match on.
    #[must_use]
    pub fn failure_reason(&self) -> String {
        self.category().to_string()
    }
}

/// Convenience alias used throughout scripture-search-core.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn categories_are_stable() {
        assert_eq!(
            Error::InvalidRequest("empty query".into()).category(),
            "invalid_request"
        );
        assert_eq!(Error::WorkerTimeout.category(), "worker_timeout");
        assert_eq!(Error::Cancelled.category(), "cancelled");
    }

    #[test]
    fn recoverable_errors() {
        assert!(Error::WorkerTimeout.is_recoverable());
        assert!(
            Error::FetchTransient {
                url: "https://example.com/a.zip".into(),
                reason: "connection reset".into(),
            }
            .is_recoverable()
        );
        assert!(!Error::ArchiveCorrupt("bad central directory".into()).is_recoverable());
        assert!(!Error::InvalidRequest("empty query".into()).is_recoverable());
    }

    #[test]
    fn failure_reason_matches_category() {
        let err = Error::FetchNotFound {
            url: "https://example.com/missing.zip".into(),
        };
        assert_eq!(err.failure_reason(), "fetch_not_found");
    }
}
