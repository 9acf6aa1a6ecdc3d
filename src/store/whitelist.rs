//! Operator-approved exceptions.
//!
//! Stored as `whitelist.json` next to the account configs: a map from issue
//! kind to the resources accepted for that kind, e.g.
//! `{"PubliclyReadableFileIssue": ["public-assets"]}`.
//!
//! `load` separates three outcomes: no whitelist object (`Ok(None)`), a
//! whitelist (possibly empty), and a failure to read or parse it (`Err`).

use std::collections::{BTreeMap, BTreeSet};

use super::ObjectStore;
use crate::error::{Error, Result};
use crate::snapshot::IssueId;

pub const WHITELIST_KEY: &str = "whitelist.json";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    entries: BTreeSet<IssueId>,
}

impl Whitelist {
    pub fn from_map(map: BTreeMap<String, Vec<String>>) -> Self {
        let entries = map
            .into_iter()
            .flat_map(|(kind, resources)| {
                resources
                    .into_iter()
                    .map(move |resource| IssueId::new(kind.clone(), resource))
            })
            .collect();
        Whitelist { entries }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let map: BTreeMap<String, Vec<String>> =
            serde_json::from_slice(bytes).map_err(|e| Error::json(WHITELIST_KEY, e))?;
        Ok(Self::from_map(map))
    }

    pub fn contains(&self, id: &IssueId) -> bool {
        self.entries.contains(id)
    }

    pub fn entries(&self) -> &BTreeSet<IssueId> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<IssueId> for Whitelist {
    fn from_iter<I: IntoIterator<Item = IssueId>>(iter: I) -> Self {
        Whitelist {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Reads the whitelist from the config store.
pub fn load<S: ObjectStore + ?Sized>(store: &S) -> Result<Option<Whitelist>> {
    match store.get(WHITELIST_KEY)? {
        Some(bytes) => Whitelist::parse(&bytes).map(Some),
        None => Ok(None),
    }
}
