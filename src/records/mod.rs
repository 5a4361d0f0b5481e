//! Per-user record storage.
//!
//! The ledger never touches storage directly; it goes through the
//! [`RecordStore`] trait so tests can run against [`MemoryRecordStore`] and
//! deployments against the append-only [`FileRecordStore`].

mod file;
mod log;
mod memory;

pub use file::{FileRecordStore, FileStoreStats};
pub use log::{LogEntry, LogIterator, SubscriptionLog};
pub use memory::MemoryRecordStore;

use crate::error::Result;
use crate::types::{SubscriptionRecord, UserId};

/// Keyed storage holding at most one [`SubscriptionRecord`] per user.
pub trait RecordStore: Send + Sync {
    /// Fetch the record for a user, `None` if the user has never subscribed.
    fn get(&self, user_id: &UserId) -> Result<Option<SubscriptionRecord>>;

    /// Create or replace the record for `record.user_id`.
    fn put(&self, record: &SubscriptionRecord) -> Result<()>;

    /// Number of users with a stored record.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flush pending writes to durable storage.
    fn sync(&self) -> Result<()> {
        Ok(())
    }
}
