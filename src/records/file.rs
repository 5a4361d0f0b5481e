//! File-backed record store.

use super::log::SubscriptionLog;
use super::RecordStore;
use crate::error::{LedgerError, Result};
use crate::store::StoreConfig;
use crate::types::{SubscriptionRecord, UserId};
use fs2::FileExt;
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Magic bytes for the store manifest.
const STORE_MAGIC: &[u8; 4] = b"SUB\0";

/// Current store format version.
const STORE_VERSION: u8 = 1;

const MANIFEST_FILE: &str = "MANIFEST";
const LOCK_FILE: &str = "LOCK";
const LOG_FILE: &str = "subscriptions.log";
const COMPACT_LOG_FILE: &str = "subscriptions.log.compact";

/// Size figures for a [`FileRecordStore`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileStoreStats {
    /// Users with a stored record.
    pub live_records: u64,
    /// Entries in the log, including superseded ones.
    pub log_entries: u64,
    /// Size of the log file.
    pub log_bytes: u64,
}

/// Record store persisted as an append-only log in a directory.
///
/// Layout:
/// - `MANIFEST`: magic and format version
/// - `LOCK`: held exclusively while the store is open
/// - `subscriptions.log`: one entry per write, newest entry per user wins
///
/// The `user -> offset` index is rebuilt from the log on open.
pub struct FileRecordStore {
    /// Store directory.
    path: PathBuf,

    /// Lock file for exclusive access.
    _lock_file: File,

    /// Sync interval passed to the log (kept for reopening after compaction).
    sync_interval: u64,

    /// Subscription log. Replaced wholesale by compaction.
    log: RwLock<SubscriptionLog>,

    /// Latest log offset per user.
    index: RwLock<HashMap<UserId, u64>>,

    /// Total entries in the log.
    entry_count: RwLock<u64>,

    /// Recently read or written records.
    cache: Mutex<LruCache<UserId, SubscriptionRecord>>,

    /// Serialises appends against compaction.
    write_lock: Mutex<()>,
}

impl FileRecordStore {
    /// Open an existing store or create a new one.
    pub fn open_or_create(config: &StoreConfig) -> Result<Self> {
        if config.path.join(MANIFEST_FILE).exists() {
            Self::open(config)
        } else if config.create_if_missing {
            Self::create(config)
        } else {
            Err(LedgerError::NotInitialized)
        }
    }

    /// Create a new store.
    pub fn create(config: &StoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.path)?;
        Self::write_manifest(&config.path)?;

        let store = Self::load(config)?;
        info!(path = %config.path.display(), "created subscription store");
        Ok(store)
    }

    /// Open an existing store.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        Self::verify_manifest(&config.path)?;

        let store = Self::load(config)?;
        info!(
            path = %config.path.display(),
            users = store.len(),
            "opened subscription store"
        );
        Ok(store)
    }

    fn load(config: &StoreConfig) -> Result<Self> {
        let lock_file = Self::acquire_lock(&config.path)?;

        let log =
            SubscriptionLog::open_with_sync_interval(config.path.join(LOG_FILE), config.sync_interval)?;
        let (index, entry_count) = Self::rebuild_index(&log)?;

        let cache_size = NonZeroUsize::new(config.cache_size.max(1)).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            path: config.path.clone(),
            _lock_file: lock_file,
            sync_interval: config.sync_interval,
            log: RwLock::new(log),
            index: RwLock::new(index),
            entry_count: RwLock::new(entry_count),
            cache: Mutex::new(LruCache::new(cache_size)),
            write_lock: Mutex::new(()),
        })
    }

    /// Rebuild the user index by replaying the log.
    fn rebuild_index(log: &SubscriptionLog) -> Result<(HashMap<UserId, u64>, u64)> {
        let mut index = HashMap::new();
        let mut entries = 0u64;
        for entry in log.iter_from(0)? {
            let entry = entry?;
            index.insert(entry.record.user_id, entry.offset);
            entries += 1;
        }
        Ok((index, entries))
    }

    /// Rewrite the log keeping only the newest entry for each user.
    pub fn compact(&self) -> Result<FileStoreStats> {
        let _write = self.write_lock.lock();
        let mut log = self.log.write();
        log.sync()?;

        let before = log.size();
        let tmp_path = self.path.join(COMPACT_LOG_FILE);
        if tmp_path.exists() {
            fs::remove_file(&tmp_path)?;
        }

        let mut live: Vec<(UserId, u64)> = self
            .index
            .read()
            .iter()
            .map(|(user, offset)| (user.clone(), *offset))
            .collect();
        live.sort_by_key(|(_, offset)| *offset);

        let mut new_index = HashMap::with_capacity(live.len());
        let mut compacted = SubscriptionLog::open_with_sync_interval(&tmp_path, self.sync_interval)?;
        for (user, offset) in live {
            let entry = log.read_at(offset)?;
            let new_offset = compacted.append(&entry.record)?;
            new_index.insert(user, new_offset);
        }
        compacted.sync()?;

        // The old log stays live until the rename has succeeded.
        compacted.rename_to(self.path.join(LOG_FILE))?;
        sync_dir(&self.path)?;
        *log = compacted;

        let stats = FileStoreStats {
            live_records: new_index.len() as u64,
            log_entries: new_index.len() as u64,
            log_bytes: log.size(),
        };
        *self.index.write() = new_index;
        *self.entry_count.write() = stats.log_entries;

        info!(
            before_bytes = before,
            after_bytes = stats.log_bytes,
            users = stats.live_records,
            "compacted subscription log"
        );
        Ok(stats)
    }

    pub fn stats(&self) -> FileStoreStats {
        FileStoreStats {
            live_records: self.index.read().len() as u64,
            log_entries: *self.entry_count.read(),
            log_bytes: self.log.read().size(),
        }
    }

    // --- Private Helpers ---

    fn write_manifest(path: &Path) -> Result<()> {
        let mut file = File::create(path.join(MANIFEST_FILE))?;
        file.write_all(STORE_MAGIC)?;
        file.write_all(&[STORE_VERSION])?;
        file.sync_all()?;
        Ok(())
    }

    fn verify_manifest(path: &Path) -> Result<()> {
        let mut file = match File::open(path.join(MANIFEST_FILE)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(LedgerError::NotInitialized),
            Err(e) => return Err(e.into()),
        };

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != STORE_MAGIC {
            return Err(LedgerError::InvalidFormat("Invalid store magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != STORE_VERSION {
            return Err(LedgerError::InvalidFormat(format!(
                "Unsupported store version: {}",
                version[0]
            )));
        }

        Ok(())
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_file = File::create(path.join(LOCK_FILE))?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| LedgerError::Locked)?;
        Ok(lock_file)
    }
}

/// Persist a rename by syncing the directory entry.
#[cfg(unix)]
fn sync_dir(path: &Path) -> Result<()> {
    File::open(path)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_path: &Path) -> Result<()> {
    Ok(())
}

impl RecordStore for FileRecordStore {
    fn get(&self, user_id: &UserId) -> Result<Option<SubscriptionRecord>> {
        if let Some(record) = self.cache.lock().get(user_id).cloned() {
            return Ok(Some(record));
        }

        // Holding the log guard keeps compaction from swapping the file
        // between the index lookup and the read.
        let log = self.log.read();
        let offset = match self.index.read().get(user_id).copied() {
            Some(offset) => offset,
            None => return Ok(None),
        };
        let record = log.read_at(offset)?.record;

        // `put` updates the index before the cache, so if the index still
        // points at what we read, no newer record can be in the cache yet.
        let mut cache = self.cache.lock();
        if self.index.read().get(user_id) == Some(&offset) {
            cache.put(user_id.clone(), record.clone());
        }
        Ok(Some(record))
    }

    fn put(&self, record: &SubscriptionRecord) -> Result<()> {
        let _write = self.write_lock.lock();

        let offset = self.log.read().append(record)?;
        self.index.write().insert(record.user_id.clone(), offset);
        *self.entry_count.write() += 1;
        self.cache.lock().put(record.user_id.clone(), record.clone());

        debug!(user = %record.user_id, offset, "wrote subscription record");
        Ok(())
    }

    fn len(&self) -> usize {
        self.index.read().len()
    }

    fn sync(&self) -> Result<()> {
        self.log.read().sync()
    }
}

impl Drop for FileRecordStore {
    fn drop(&mut self) {
        // Best-effort sync on drop
        let _ = self.log.read().sync();
    }
}
