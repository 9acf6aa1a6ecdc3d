//! Error type shared by every module.
//!
//! Absence is not an error here: a missing whitelist or a missing previous
//! snapshot comes back as `Ok(None)`. Everything below aborts the run.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-level failure talking to a probed endpoint or a webhook.
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    /// The endpoint answered, but not in a shape we know how to interpret.
    #[error("unexpected response for {resource}: {detail}")]
    UnexpectedResponse { resource: String, detail: String },

    #[error("{op} failed for {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to decode {what}: {source}")]
    Json {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid timestamp '{0}'")]
    Timestamp(String),

    /// A key that must exist (listed, or named explicitly) could not be read.
    #[error("object '{0}' not found")]
    MissingObject(String),

    /// Snapshots are append-only; a second write to the same key is refused.
    #[error("object '{0}' already exists")]
    AlreadyExists(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn http(url: &str, source: ureq::Error) -> Self {
        Error::Http {
            url: url.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            op,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(what: impl Into<String>, source: serde_json::Error) -> Self {
        Error::Json {
            what: what.into(),
            source,
        }
    }

    pub(crate) fn unexpected(resource: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::UnexpectedResponse {
            resource: resource.into(),
            detail: detail.into(),
        }
    }
}
