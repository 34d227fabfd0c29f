//! External coordination state.
//!
//! # Data Flow
//! ```text
//! RateLimiter / CircuitBreaker
//!     → get(key)                      (read current record + version)
//!     → compare_and_swap(key, v, ..)  (write only if version unchanged)
//!     → on conflict: re-read and retry, bounded
//! ```
//!
//! # Design Decisions
//! - All cross-invocation coordination goes through this interface; no
//!   in-process lock is ever held across a store or upstream call
//! - Records are opaque JSON values; the store knows nothing about
//!   rate windows or breaker states
//! - Version 0 means "absent"; a CAS expecting version 0 creates the record
//! - Two implementations: in-memory (single process, tests) and SQLite
//!   (durable, shared by concurrent instances)

pub mod memory;
pub mod sqlite;

use std::future::Future;

use serde_json::Value;
use thiserror::Error;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Error from the backing store itself (not a CAS conflict).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("corrupt state record at {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// A stored record together with its write version.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedValue {
    pub version: u64,
    pub value: Value,
}

/// Keyed store with conditional writes.
///
/// `compare_and_swap` returns `Ok(false)` when a concurrent writer got
/// there first; callers decide whether and how often to retry.
pub trait StateStore: Send + Sync + Clone + 'static {
    /// Read the record at `key`, if present.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<VersionedValue>, StoreError>> + Send;

    /// Write `value` at `key` only if the stored version is still
    /// `expected_version`. Expected version 0 creates the record and
    /// fails if it already exists.
    fn compare_and_swap(
        &self,
        key: &str,
        expected_version: u64,
        value: Value,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

/// Runtime-selected store backend.
#[derive(Clone)]
pub enum Backend {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl StateStore for Backend {
    async fn get(&self, key: &str) -> Result<Option<VersionedValue>, StoreError> {
        match self {
            Backend::Memory(s) => s.get(key).await,
            Backend::Sqlite(s) => s.get(key).await,
        }
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected_version: u64,
        value: Value,
    ) -> Result<bool, StoreError> {
        match self {
            Backend::Memory(s) => s.compare_and_swap(key, expected_version, value).await,
            Backend::Sqlite(s) => s.compare_and_swap(key, expected_version, value).await,
        }
    }
}
