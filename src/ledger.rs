//! The subscription ledger.
//!
//! Records which feedback threads and which activities each user follows.
//! Subscriptions are only ever added: re-subscribing is a no-op, and
//! deleting the followed activity or thread leaves them in place.

use crate::error::Result;
use crate::records::RecordStore;
use crate::types::{ActivityId, SubscriptionRecord, ThreadId, UserId};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Per-user subscriptions on top of an injected [`RecordStore`].
pub struct SubscriptionLedger {
    records: Arc<dyn RecordStore>,

    /// Serialises read-modify-write cycles so concurrent subscriptions for
    /// the same user do not overwrite each other.
    write_lock: Mutex<()>,
}

impl SubscriptionLedger {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self {
            records,
            write_lock: Mutex::new(()),
        }
    }

    /// Ensure `thread_id` is among the threads `user_id` follows.
    pub fn subscribe_to_thread(&self, user_id: &UserId, thread_id: &ThreadId) -> Result<()> {
        let added = self.update(user_id, |record| record.add_thread(thread_id.clone()))?;
        if added {
            debug!(user = %user_id, thread = %thread_id, "subscribed to thread");
        }
        Ok(())
    }

    /// Ensure `activity_id` is among the activities `user_id` follows.
    pub fn subscribe_to_activity(&self, user_id: &UserId, activity_id: &ActivityId) -> Result<()> {
        let added = self.update(user_id, |record| record.add_activity(activity_id.clone()))?;
        if added {
            debug!(user = %user_id, activity = %activity_id, "subscribed to activity");
        }
        Ok(())
    }

    /// Activities the user follows, in subscription order. Empty for users
    /// that have never subscribed to anything.
    pub fn get_activity_ids_subscribed_to(&self, user_id: &UserId) -> Result<Vec<ActivityId>> {
        Ok(self
            .records
            .get(user_id)?
            .map(|record| record.activity_ids.into_iter().collect())
            .unwrap_or_default())
    }

    /// Feedback threads the user follows, in subscription order.
    pub fn get_thread_ids_subscribed_to(&self, user_id: &UserId) -> Result<Vec<ThreadId>> {
        Ok(self
            .records
            .get(user_id)?
            .map(|record| record.feedback_thread_ids.into_iter().collect())
            .unwrap_or_default())
    }

    /// The full record for a user; an empty one if nothing is stored.
    pub fn get_subscriptions(&self, user_id: &UserId) -> Result<SubscriptionRecord> {
        Ok(self
            .records
            .get(user_id)?
            .unwrap_or_else(|| SubscriptionRecord::empty(user_id.clone())))
    }

    /// Number of users with at least one stored subscription record.
    pub fn user_count(&self) -> usize {
        self.records.len()
    }

    /// Flush the underlying record store.
    pub fn sync(&self) -> Result<()> {
        self.records.sync()
    }

    /// Load (or start) the user's record, apply `change`, and write it back
    /// only if `change` reports a modification.
    fn update<F>(&self, user_id: &UserId, change: F) -> Result<bool>
    where
        F: FnOnce(&mut SubscriptionRecord) -> bool,
    {
        let _lock = self.write_lock.lock();

        let mut record = self
            .records
            .get(user_id)?
            .unwrap_or_else(|| SubscriptionRecord::empty(user_id.clone()));

        if !change(&mut record) {
            return Ok(false);
        }

        self.records.put(&record)?;
        Ok(true)
    }
}
