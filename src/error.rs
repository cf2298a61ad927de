//! Error types for charity-ingest
//!
//! One crate-wide error enum covering the fetch, extract, decode, and
//! index-provisioning stages. The orchestrator catches these at the
//! per-source boundary; [`Error::is_fatal`] marks the kinds that leave no
//! well-defined partial result for a source.

use thiserror::Error;

/// Result type alias for charity-ingest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for charity-ingest
#[derive(Debug, Error)]
pub enum Error {
    /// Regulator endpoint answered with a non-2xx status
    #[error("fetch failed for {url}: HTTP {status} {reason}")]
    Fetch {
        /// The URL that was requested
        url: String,
        /// HTTP status code of the response
        status: u16,
        /// Status reason phrase (e.g. "Internal Server Error")
        reason: String,
    },

    /// HTML scrape found no anchor matching the download-link pattern
    #[error("no download link matching `{pattern}` found at {url}")]
    LinkNotFound {
        /// The page that was scraped
        url: String,
        /// The URL pattern the scrape was looking for
        pattern: String,
    },

    /// The named form is missing from the fetched page
    #[error("form `{selector}` not found at {url}")]
    FormNotFound {
        /// The page that was fetched
        url: String,
        /// CSS selector naming the form
        selector: String,
    },

    /// Fetched HTML could not be processed
    #[error("HTML error: {0}")]
    Html(String),

    /// Payload is not a valid ZIP container
    #[error("archive error: {0}")]
    Archive(String),

    /// Archive contents violate a structural assumption — fatal
    #[error("unexpected archive entry count: expected {expected}, found {found}")]
    UnexpectedEntryCount {
        /// The number of entries the caller asserted
        expected: usize,
        /// The number of entries actually present
        found: usize,
    },

    /// Truncated or corrupt bulk-export byte stream — fatal for that file
    #[error("malformed bulk extract at byte {offset}: {reason}")]
    MalformedExtract {
        /// Byte offset into the payload where decoding failed
        offset: usize,
        /// What went wrong at that offset
        reason: String,
    },

    /// Index store request failed with an unexpected status
    #[error("index store error: {0}")]
    Index(String),

    /// Network-level failure from the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// URL construction failed
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// CSV serialization failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error leaves no well-defined partial result for the
    /// source being processed.
    ///
    /// Fatal kinds are an entry-count mismatch (downstream logic assumes
    /// exactly one payload) and a malformed bulk extract (truncated input
    /// must not be treated as data). All errors abort the owning source;
    /// fatal ones additionally fail the run's exit status even when the
    /// remaining sources succeed.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::UnexpectedEntryCount { .. } | Error::MalformedExtract { .. }
        )
    }
}
