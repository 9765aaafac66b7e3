//! Error taxonomy shared by the fetch, normalize and ranking stages.

use thiserror::Error;

/// Failure of the retrying fetcher after its attempt budget was spent.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every attempt was answered with a non-ready status, a rate-limit
    /// marker, or a transport failure.
    #[error("gave up on {url} after {attempts} attempts (last: {last})")]
    Exhausted {
        /// Exact URL that was requested.
        url: String,
        /// Number of live attempts made.
        attempts: u32,
        /// Description of the last failed attempt.
        last: String,
    },
}

/// A payload that could not be turned into records at all.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The body is not well-formed XML.
    #[error("invalid XML: {0}")]
    Xml(String),
    /// The document root is not the element expected for this response kind.
    #[error("expected <{expected}> document, found <{found}>")]
    UnexpectedRoot {
        /// Root element required by the response kind.
        expected: &'static str,
        /// Root element actually present.
        found: String,
    },
    /// The service answered with its own `<errors>` document.
    #[error("catalog service reported: {0}")]
    ServiceError(String),
}

/// A single record that cannot take part in ranking.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    /// A required key is absent from the record mapping.
    #[error("record {id}: missing field `{field}`")]
    MissingField {
        /// Object id of the record, or `?` when the id itself is missing.
        id: String,
        /// Dotted path of the missing field.
        field: &'static str,
    },
    /// A numeric field holds something that does not parse.
    #[error("record {id}: `{field}` is not numeric ({value:?})")]
    NotNumeric {
        /// Object id of the record.
        id: String,
        /// Dotted path of the offending field.
        field: &'static str,
        /// Raw value found in the payload.
        value: String,
    },
}

/// Run-level failures; any of these aborts before ranking output exists.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Retrieval of a run-critical document failed.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    /// A run-critical document could not be parsed.
    #[error("parse failed: {0}")]
    Parse(#[from] NormalizeError),
    /// No rated game survived normalization, so there is no mean rating.
    #[error("scoring failed: no rated games in the collection of {username} ({dropped} records dropped)")]
    EmptyCollection {
        /// User whose collection was fetched.
        username: String,
        /// Records rejected as invalid before scoring.
        dropped: usize,
    },
    /// The configured catalog base URL cannot be combined with a request path.
    #[error("fetch failed: invalid catalog url: {0}")]
    Url(String),
}
