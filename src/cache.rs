//! Run-scoped map from view name to resolved handle.
use crate::namespace::ViewHandle;
use std::collections::HashMap;

/// Entries are never evicted; one cache lives exactly as long as one run.
#[derive(Debug, Default)]
pub struct ProvisionCache {
    entries: HashMap<String, ViewHandle>,
}

impl ProvisionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ViewHandle> {
        self.entries.get(name)
    }

    pub fn insert(&mut self, name: &str, handle: ViewHandle) {
        self.entries.insert(name.to_string(), handle);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
