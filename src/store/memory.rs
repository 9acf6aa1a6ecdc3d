//! In-process object store.
//!
//! Can also hold back newly written keys from listings, to reproduce a
//! store whose listings lag behind its writes.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use super::ObjectStore;
use crate::error::Result;

#[derive(Default)]
pub struct MemoryStore {
    objects: RefCell<BTreeMap<String, Vec<u8>>>,
    unlisted: RefCell<BTreeSet<String>>,
    hide_new_keys: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, keys written are readable by key but missing from `list`.
    pub fn hide_from_listing(&self, hide: bool) {
        self.hide_new_keys.set(hide);
    }

    /// Makes every held-back key visible to `list`.
    pub fn settle(&self) {
        self.unlisted.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.objects.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.borrow().is_empty()
    }
}

impl ObjectStore for MemoryStore {
    fn put(&self, key: &str, body: &[u8]) -> Result<()> {
        self.objects
            .borrow_mut()
            .insert(key.to_string(), body.to_vec());
        if self.hide_new_keys.get() {
            self.unlisted.borrow_mut().insert(key.to_string());
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.objects.borrow().get(key).cloned())
    }

    fn list(&self, from: &str) -> Result<Vec<String>> {
        let unlisted = self.unlisted.borrow();
        Ok(self
            .objects
            .borrow()
            .range(from.to_string()..)
            .map(|(key, _)| key)
            .filter(|key| !unlisted.contains(*key))
            .cloned()
            .collect())
    }

    fn location(&self, key: &str) -> String {
        format!("memory://{key}")
    }
}
