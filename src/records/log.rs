//! Append-only log of subscription record snapshots.
//!
//! Every write appends the full record for one user. The newest entry for a
//! user wins; older ones stay on disk until compaction.

use crate::error::{LedgerError, Result};
use crate::types::{SubscriptionRecord, Timestamp};
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Magic bytes for log entries.
const LOG_MAGIC: &[u8; 4] = b"SRL\0";

/// Current log format version.
const LOG_VERSION: u8 = 1;

/// Entry header size: magic + version + flags + timestamp + payload length.
const ENTRY_HEADER_SIZE: u64 = 4 + 1 + 1 + 8 + 4;

/// Trailing CRC32 of the payload.
const CHECKSUM_SIZE: u64 = 4;

/// A decoded log entry.
#[derive(Clone, Debug)]
pub struct LogEntry {
    /// Byte offset of the entry in the log file.
    pub offset: u64,
    /// When the entry was appended.
    pub written: Timestamp,
    pub record: SubscriptionRecord,
}

/// Append-only subscription log.
pub struct SubscriptionLog {
    /// Path to the log file.
    path: PathBuf,

    /// Log file handle.
    file: RwLock<File>,

    /// Current file size (for appending).
    file_size: RwLock<u64>,

    /// Number of writes since last sync.
    writes_since_sync: RwLock<u64>,

    /// Sync every N writes.
    sync_interval: u64,
}

impl SubscriptionLog {
    /// Default sync interval.
    pub const DEFAULT_SYNC_INTERVAL: u64 = 100;

    /// Open or create a log with the default sync interval.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_sync_interval(path, Self::DEFAULT_SYNC_INTERVAL)
    }

    /// Open or create a log, syncing every `sync_interval` appends
    /// (0 behaves like 1).
    ///
    /// A torn entry at the end of the file (left by a crash mid-append) is
    /// cut off. Damage anywhere else is reported as an error.
    pub fn open_with_sync_interval(path: impl AsRef<Path>, sync_interval: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let on_disk = file.metadata()?.len();
        let valid_end = Self::find_valid_end(&path, on_disk)?;
        if valid_end < on_disk {
            warn!(
                path = %path.display(),
                discarded = on_disk - valid_end,
                "truncating torn entry at end of subscription log"
            );
            file.set_len(valid_end)?;
            file.sync_all()?;
        }

        Ok(Self {
            path,
            file: RwLock::new(file),
            file_size: RwLock::new(valid_end),
            writes_since_sync: RwLock::new(0),
            sync_interval: sync_interval.max(1),
        })
    }

    /// Append a record snapshot. Returns the offset it was written at.
    pub fn append(&self, record: &SubscriptionRecord) -> Result<u64> {
        let payload = rmp_serde::to_vec(record)?;
        let entry = encode_entry(&payload, Timestamp::now());

        let mut file = self.file.write();
        let offset = *self.file_size.read();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&entry)?;

        *self.file_size.write() = offset + entry.len() as u64;

        let mut writes = self.writes_since_sync.write();
        *writes += 1;
        if *writes >= self.sync_interval {
            file.sync_all()?;
            *writes = 0;
        }

        Ok(offset)
    }

    /// Read the entry at a given offset.
    pub fn read_at(&self, offset: u64) -> Result<LogEntry> {
        let size = *self.file_size.read();
        let mut file = self.file.write();
        file.seek(SeekFrom::Start(offset))?;
        let (written, record, _) = read_entry(&mut *file, size.saturating_sub(offset))?;
        Ok(LogEntry {
            offset,
            written,
            record,
        })
    }

    /// Iterate entries from a given offset, oldest first.
    ///
    /// The iterator reads through its own file handle, so appends made while
    /// it runs are not observed.
    pub fn iter_from(&self, offset: u64) -> Result<LogIterator> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        Ok(LogIterator {
            reader: BufReader::new(file),
            offset,
            end: *self.file_size.read(),
        })
    }

    /// Force sync all pending writes to disk.
    pub fn sync(&self) -> Result<()> {
        let file = self.file.write();
        file.sync_all()?;
        *self.writes_since_sync.write() = 0;
        Ok(())
    }

    /// Current file size in bytes.
    pub fn size(&self) -> u64 {
        *self.file_size.read()
    }

    /// Move the log file to `path`. The open handle keeps working.
    pub fn rename_to(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        std::fs::rename(&self.path, &path)?;
        self.path = path;
        Ok(())
    }

    /// Offset just past the last complete entry.
    fn find_valid_end(path: &Path, on_disk: u64) -> Result<u64> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut offset = 0u64;

        while offset < on_disk {
            match read_entry(&mut reader, on_disk - offset) {
                Ok((_, _, len)) => offset += len,
                Err(LedgerError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
        }

        Ok(offset)
    }
}

/// Iterator over entries in the log.
pub struct LogIterator {
    reader: BufReader<File>,
    offset: u64,
    end: u64,
}

impl Iterator for LogIterator {
    type Item = Result<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.end {
            return None;
        }

        let offset = self.offset;
        match read_entry(&mut self.reader, self.end - offset) {
            Ok((written, record, len)) => {
                self.offset += len;
                Some(Ok(LogEntry {
                    offset,
                    written,
                    record,
                }))
            }
            Err(e) => {
                // Stop iteration on error
                self.offset = self.end;
                Some(Err(e))
            }
        }
    }
}

fn encode_entry(payload: &[u8], written: Timestamp) -> Vec<u8> {
    let mut entry =
        Vec::with_capacity((ENTRY_HEADER_SIZE + CHECKSUM_SIZE) as usize + payload.len());
    entry.extend_from_slice(LOG_MAGIC);
    entry.push(LOG_VERSION);
    // Flags (reserved)
    entry.push(0u8);
    entry.extend_from_slice(&written.0.to_le_bytes());
    entry.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    entry.extend_from_slice(payload);
    entry.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
    entry
}

/// Read one entry. `remaining` is the number of bytes left in the log, so a
/// length field pointing past the end reads as a torn entry rather than an
/// allocation of arbitrary size.
fn read_entry<R: Read>(
    reader: &mut R,
    remaining: u64,
) -> Result<(Timestamp, SubscriptionRecord, u64)> {
    if remaining < ENTRY_HEADER_SIZE + CHECKSUM_SIZE {
        return Err(torn());
    }

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != LOG_MAGIC {
        return Err(LedgerError::InvalidFormat("Invalid log entry magic".into()));
    }

    let mut version = [0u8; 1];
    reader.read_exact(&mut version)?;
    if version[0] != LOG_VERSION {
        return Err(LedgerError::InvalidFormat(format!(
            "Unsupported log version: {}",
            version[0]
        )));
    }

    let mut _flags = [0u8; 1];
    reader.read_exact(&mut _flags)?;

    let mut ts_bytes = [0u8; 8];
    reader.read_exact(&mut ts_bytes)?;
    let written = Timestamp(i64::from_le_bytes(ts_bytes));

    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes)?;
    let payload_len = u32::from_le_bytes(len_bytes) as u64;

    let entry_len = ENTRY_HEADER_SIZE + payload_len + CHECKSUM_SIZE;
    if entry_len > remaining {
        return Err(torn());
    }

    let mut payload = vec![0u8; payload_len as usize];
    reader.read_exact(&mut payload)?;

    let mut checksum_bytes = [0u8; 4];
    reader.read_exact(&mut checksum_bytes)?;
    let stored = u32::from_le_bytes(checksum_bytes);
    let computed = crc32fast::hash(&payload);
    if stored != computed {
        return Err(LedgerError::ChecksumMismatch {
            expected: stored,
            got: computed,
        });
    }

    let record: SubscriptionRecord = rmp_serde::from_slice(&payload)?;
    Ok((written, record, entry_len))
}

fn torn() -> LedgerError {
    LedgerError::Io(std::io::Error::new(
        ErrorKind::UnexpectedEof,
        "log entry extends past end of file",
    ))
}
