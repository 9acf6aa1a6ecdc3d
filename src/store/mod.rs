//! Snapshot persistence.
//!
//! Snapshots live in an append-only key/value object store, one JSON object
//! per completed run, keyed by end time. Backends:
//! - `dir`: a local directory, one file per key
//! - `sqlite`: a single SQLite database (the default history location)
//! - `memory`: in-process, for tests and dry runs
//!
//! Reads by key are assumed to see a write that just completed. Listings
//! are not: a key written a moment ago may or may not be listed yet, which
//! is what `SnapshotStore::resolve_previous` has to cope with.

pub mod diff;
pub mod dir;
pub mod memory;
pub mod sqlite;
pub mod whitelist;

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::snapshot::{format_timestamp, Snapshot, SNAPSHOT_SUFFIX};
use whitelist::WHITELIST_KEY;

/// Lookback used when searching for the previous snapshot. Comfortably
/// longer than the interval between scheduled runs.
pub const DEFAULT_HORIZON: Duration = Duration::from_secs(200 * 60 * 60);

pub trait ObjectStore {
    fn put(&self, key: &str, body: &[u8]) -> Result<()>;

    /// `Ok(None)` when the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Keys sorting at or after `from`, in lexicographic order.
    fn list(&self, from: &str) -> Result<Vec<String>>;

    /// Human-facing location of a key, used in logs and notifications.
    fn location(&self, key: &str) -> String;
}

impl<S: ObjectStore + ?Sized> ObjectStore for Box<S> {
    fn put(&self, key: &str, body: &[u8]) -> Result<()> {
        (**self).put(key, body)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn list(&self, from: &str) -> Result<Vec<String>> {
        (**self).list(from)
    }

    fn location(&self, key: &str) -> String {
        (**self).location(key)
    }
}

/// Start of the lookback window ending now.
pub fn horizon_start(horizon: Duration) -> Result<DateTime<Utc>> {
    chrono::Duration::from_std(horizon)
        .ok()
        .and_then(|horizon| Utc::now().checked_sub_signed(horizon))
        .ok_or_else(|| {
            Error::Config(format!(
                "horizon {} is out of range",
                humantime::format_duration(horizon)
            ))
        })
}

/// Picks the previous snapshot's key out of a listing that may or may not
/// already include the snapshot just written.
///
/// Only the last entry is compared against `current_key`; nothing else in
/// the listing is second-guessed.
pub fn previous_key<'a>(listing: &'a [String], current_key: &str) -> Option<&'a str> {
    let listing = match listing.split_last() {
        Some((last, rest)) if last == current_key => rest,
        _ => listing,
    };
    listing.last().map(String::as_str)
}

pub struct SnapshotStore<S> {
    objects: S,
}

impl<S: ObjectStore> SnapshotStore<S> {
    pub fn new(objects: S) -> Self {
        SnapshotStore { objects }
    }

    pub fn objects(&self) -> &S {
        &self.objects
    }

    pub fn location(&self, key: &str) -> String {
        self.objects.location(key)
    }

    /// Writes a snapshot under its own key and returns the key. Snapshots
    /// are never replaced: a key that already holds one is an error.
    pub fn put(&self, snapshot: &Snapshot) -> Result<String> {
        let key = snapshot.key();
        if self.objects.get(&key)?.is_some() {
            return Err(Error::AlreadyExists(self.objects.location(&key)));
        }
        info!("Uploading to {}", self.objects.location(&key));
        self.objects.put(&key, &snapshot.to_json()?)?;
        Ok(key)
    }

    pub fn get(&self, key: &str) -> Result<Snapshot> {
        let bytes = self
            .objects
            .get(key)?
            .ok_or_else(|| Error::MissingObject(self.objects.location(key)))?;
        Snapshot::from_json(&bytes, key)
    }

    /// Snapshot keys at or after `since`, oldest first.
    pub fn list_recent(&self, since: DateTime<Utc>) -> Result<Vec<String>> {
        let keys = self.objects.list(&format_timestamp(&since))?;
        Ok(keys
            .into_iter()
            .filter(|key| key != WHITELIST_KEY && key.ends_with(SNAPSHOT_SUFFIX))
            .collect())
    }

    /// The most recent snapshot before `current_key`, looking back `horizon`.
    /// `Ok(None)` when there is none in that window.
    pub fn resolve_previous(&self, current_key: &str, horizon: Duration) -> Result<Option<Snapshot>> {
        let listing = self.list_recent(horizon_start(horizon)?)?;

        match previous_key(&listing, current_key) {
            Some(key) => {
                warn!("Comparing to {}", self.objects.location(key));
                self.get(key).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Most recent snapshot within `horizon`, if any.
    pub fn latest(&self, horizon: Duration) -> Result<Option<Snapshot>> {
        match self.list_recent(horizon_start(horizon)?)?.last() {
            Some(key) => self.get(key).map(Some),
            None => Ok(None),
        }
    }
}
