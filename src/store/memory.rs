//! In-memory state store.
//!
//! Single-process only: suitable for tests and for deployments where one
//! gateway instance owns all traffic. The DashMap entry lock makes each
//! compare-and-swap atomic without holding any lock across await points.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;

use super::{StateStore, StoreError, VersionedValue};

#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<DashMap<String, VersionedValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, StoreError> {
        Ok(self.records.get(key).map(|r| r.value().clone()))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected_version: u64,
        value: Value,
    ) -> Result<bool, StoreError> {
        match self.records.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().version == expected_version {
                    entry.insert(VersionedValue {
                        version: expected_version + 1,
                        value,
                    });
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(entry) => {
                if expected_version == 0 {
                    entry.insert(VersionedValue { version: 1, value });
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }
}
