//! Main Store struct tying the ledger and its collaborators together.

use crate::activities::ActivityService;
use crate::error::Result;
use crate::feedback::FeedbackService;
use crate::ledger::SubscriptionLedger;
use crate::records::{FileRecordStore, FileStoreStats, MemoryRecordStore, RecordStore};
use crate::rights::RightsManager;
use std::path::PathBuf;
use std::sync::Arc;

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Directory holding the subscription log.
    pub path: PathBuf,

    /// Record cache size (number of users).
    pub cache_size: usize,

    /// Whether to create the store if it doesn't exist.
    pub create_if_missing: bool,

    /// Sync the log every N writes (0 and 1 both mean every write).
    pub sync_interval: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./subscriptions"),
            cache_size: 1000,
            create_if_missing: true,
            sync_interval: 100,
        }
    }
}

/// The subscription ledger together with the flows that feed it.
///
/// All services share one [`SubscriptionLedger`]:
/// - [`ActivityService`] subscribes creators
/// - [`RightsManager`] subscribes new owners and editors
/// - [`FeedbackService`] subscribes message authors
pub struct Store {
    /// Set when the records live in a [`FileRecordStore`].
    file: Option<Arc<FileRecordStore>>,
    ledger: Arc<SubscriptionLedger>,
    rights: Arc<RightsManager>,
    activities: ActivityService,
    feedback: FeedbackService,
}

impl Store {
    /// Open an existing file-backed store or create a new one.
    pub fn open_or_create(config: StoreConfig) -> Result<Self> {
        Ok(Self::with_file(FileRecordStore::open_or_create(&config)?))
    }

    /// Create a new file-backed store.
    pub fn create(config: StoreConfig) -> Result<Self> {
        Ok(Self::with_file(FileRecordStore::create(&config)?))
    }

    /// Open an existing file-backed store.
    pub fn open(config: StoreConfig) -> Result<Self> {
        Ok(Self::with_file(FileRecordStore::open(&config)?))
    }

    /// A store whose records vanish on drop.
    pub fn in_memory() -> Self {
        Self::with_record_store(Arc::new(MemoryRecordStore::new()))
    }

    /// Build the services over any record store.
    pub fn with_record_store(records: Arc<dyn RecordStore>) -> Self {
        Self::wire(records, None)
    }

    fn with_file(records: FileRecordStore) -> Self {
        let records = Arc::new(records);
        Self::wire(records.clone(), Some(records))
    }

    fn wire(records: Arc<dyn RecordStore>, file: Option<Arc<FileRecordStore>>) -> Self {
        let ledger = Arc::new(SubscriptionLedger::new(records));
        let rights = Arc::new(RightsManager::new(Arc::clone(&ledger)));
        let activities = ActivityService::new(Arc::clone(&rights), Arc::clone(&ledger));
        let feedback = FeedbackService::new(Arc::clone(&ledger));

        Self {
            file,
            ledger,
            rights,
            activities,
            feedback,
        }
    }

    pub fn ledger(&self) -> &SubscriptionLedger {
        &self.ledger
    }

    pub fn rights(&self) -> &RightsManager {
        &self.rights
    }

    pub fn activities(&self) -> &ActivityService {
        &self.activities
    }

    pub fn feedback(&self) -> &FeedbackService {
        &self.feedback
    }

    /// Sync all data to disk.
    pub fn sync(&self) -> Result<()> {
        self.ledger.sync()
    }

    /// Compact the subscription log. `None` for stores without one.
    pub fn compact(&self) -> Result<Option<FileStoreStats>> {
        self.file.as_ref().map(|file| file.compact()).transpose()
    }

    /// Log statistics. `None` for stores without a log.
    pub fn stats(&self) -> Option<FileStoreStats> {
        self.file.as_ref().map(|file| file.stats())
    }
}
