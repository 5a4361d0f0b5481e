//! In-memory record store.

use super::RecordStore;
use crate::error::Result;
use crate::types::{SubscriptionRecord, UserId};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Record store backed by a `HashMap`. Contents are lost on drop.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<UserId, SubscriptionRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, user_id: &UserId) -> Result<Option<SubscriptionRecord>> {
        Ok(self.records.read().get(user_id).cloned())
    }

    fn put(&self, record: &SubscriptionRecord) -> Result<()> {
        self.records
            .write()
            .insert(record.user_id.clone(), record.clone());
        Ok(())
    }

    fn len(&self) -> usize {
        self.records.read().len()
    }
}
