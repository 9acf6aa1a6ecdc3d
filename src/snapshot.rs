//! Snapshot data model.
//!
//! A snapshot is the immutable record of one full scan. It is written once,
//! as a single JSON object, under a key derived from its end time:
//! - `start_time` / `end_time` with fixed microsecond precision
//! - `tests`: the check kinds that ran, in order
//! - `issues`: every issue found, tagged with the check that found it
//! - any caller-supplied metadata (`accounts`, `external_ip`, ...) at top level

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Key format: zero-padded, fixed width, UTC. Lexicographic order of the
/// formatted strings is chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

pub const SNAPSHOT_SUFFIX: &str = ".json";

pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

/// Accepts our own format, any RFC 3339 string, and offset-less ISO-8601
/// (as older snapshots were written), which is taken to be UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| Error::Timestamp(s.to_string()))
}

/// Store key for a snapshot that finished at `end_time`.
pub fn key_for(end_time: &DateTime<Utc>) -> String {
    format!("{}{SNAPSHOT_SUFFIX}", format_timestamp(end_time))
}

mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

/// Identity of an issue for comparison. Help text and extra fields are not
/// part of it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IssueId {
    pub kind: String,
    pub resource: String,
}

impl IssueId {
    pub fn new(kind: impl Into<String>, resource: impl Into<String>) -> Self {
        IssueId {
            kind: kind.into(),
            resource: resource.into(),
        }
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.resource, self.kind)
    }
}

/// One detected misconfiguration, as recorded in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "issue")]
    pub kind: String,
    pub resource: String,
    pub help: Option<String>,
    /// Name of the check kind that produced this issue. Empty until the
    /// runner tags it.
    #[serde(rename = "test", default)]
    pub source_check: String,
    /// Check-specific fields such as `key` for file-level issues.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Issue {
    pub fn new(kind: impl Into<String>, resource: impl Into<String>) -> Self {
        Issue {
            kind: kind.into(),
            resource: resource.into(),
            help: None,
            source_check: String::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_extra(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(field.to_string(), value.into());
        self
    }

    pub fn id(&self) -> IssueId {
        IssueId::new(&self.kind, &self.resource)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(with = "timestamp")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub end_time: DateTime<Utc>,
    #[serde(rename = "tests")]
    pub checks_run: Vec<String>,
    pub issues: Vec<Issue>,
    #[serde(flatten)]
    pub external_context: BTreeMap<String, Value>,
}

impl Snapshot {
    pub fn key(&self) -> String {
        key_for(&self.end_time)
    }

    /// Serialized form with keys sorted at every level.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        // Going through Value sorts object keys, flattened ones included.
        let value = serde_json::to_value(self).map_err(|e| Error::json("snapshot", e))?;
        serde_json::to_vec(&value).map_err(|e| Error::json("snapshot", e))
    }

    pub fn from_json(bytes: &[u8], key: &str) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::json(format!("snapshot {key}"), e))
    }
}
