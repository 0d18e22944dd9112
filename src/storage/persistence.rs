//! Write-ahead journal and snapshot persistence for the document store

use super::collections::Collections;
use super::error::{StoreError, StoreResult};
use crate::models::{Item, ItemId, TodoList};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

pub const JOURNAL_FILE: &str = "todolist.wal";
pub const SNAPSHOT_FILE: &str = "todolist.snapshot";
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;
pub const DEFAULT_CHECKPOINT_THRESHOLD: usize = 1000;

// ============================================================================
// Journal Entry Types
// ============================================================================

/// One successful mutation of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalEntry {
    InsertItems { items: Vec<Item> },
    DeleteItem { id: ItemId },
    InsertList { list: TodoList },
    ReplaceList { list: TodoList },
    PushItem { list: String, item: Item },
    PullItem { list: String, id: ItemId },
}

/// A journal entry tagged with its position in the write sequence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JournalFrame {
    pub seq: u64,
    pub entry: JournalEntry,
}

#[derive(Serialize)]
struct JournalFrameRef<'a> {
    seq: u64,
    entry: &'a JournalEntry,
}

// ============================================================================
// Store Snapshot
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub collections: Collections,
    pub metadata: SnapshotMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub created_at: DateTime<Utc>,
    pub default_item_count: usize,
    pub list_count: usize,
    /// Sequence number of the last journal frame folded into the snapshot.
    #[serde(default)]
    pub last_seq: u64,
}

impl StoreSnapshot {
    pub fn new(collections: Collections, last_seq: u64) -> Self {
        let metadata = SnapshotMetadata {
            created_at: Utc::now(),
            last_seq,
            default_item_count: collections.items.len(),
            list_count: collections.lists.len(),
        };

        Self {
            version: SNAPSHOT_FORMAT_VERSION,
            collections,
            metadata,
        }
    }
}

// ============================================================================
// Durability Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// fsync after every journal append.
    Sync,
    #[default]
    Async,
    /// Memory only.
    None,
}

impl std::str::FromStr for DurabilityMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "sync" => Ok(Self::Sync),
            "async" => Ok(Self::Async),
            "none" | "memory" => Ok(Self::None),
            other => Err(format!(
                "unknown durability mode '{other}', expected one of: sync, async, none"
            )),
        }
    }
}

// ============================================================================
// Journal
// ============================================================================

/// Append-only file of length-prefixed MessagePack frames.
pub struct Journal {
    path: PathBuf,
    file: File,
    durability_mode: DurabilityMode,
    len: u64,
    last_seq: u64,
    entries_since_checkpoint: usize,
    checkpoint_threshold: usize,
}

impl Journal {
    pub async fn open(path: PathBuf, durability_mode: DurabilityMode) -> StoreResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(StoreError::io("opening journal"))?;
        let len = file
            .metadata()
            .await
            .map_err(StoreError::io("reading journal metadata"))?
            .len();

        Ok(Self {
            path,
            file,
            durability_mode,
            len,
            last_seq: 0,
            entries_since_checkpoint: 0,
            checkpoint_threshold: DEFAULT_CHECKPOINT_THRESHOLD,
        })
    }

    /// Appends `entry` and returns its sequence number. A failed write is
    /// cut back off the file so later frames start on a frame boundary.
    pub async fn append(&mut self, entry: &JournalEntry) -> StoreResult<u64> {
        let seq = self.last_seq + 1;
        let frame = encode_frame(seq, entry)?;

        if let Err(err) = self.write_frame(&frame).await {
            if let Err(truncate_err) = self.file.set_len(self.len).await {
                error!(error = %truncate_err, len = self.len, "failed to roll back partial journal frame");
            }
            return Err(err);
        }

        self.len += frame.len() as u64;
        self.last_seq = seq;
        self.entries_since_checkpoint += 1;
        Ok(seq)
    }

    async fn write_frame(&mut self, frame: &[u8]) -> StoreResult<()> {
        self.file
            .write_all(frame)
            .await
            .map_err(StoreError::io("writing journal"))?;
        self.file
            .flush()
            .await
            .map_err(StoreError::io("flushing journal"))?;
        if self.durability_mode == DurabilityMode::Sync {
            self.file
                .sync_data()
                .await
                .map_err(StoreError::io("syncing journal"))?;
        }
        Ok(())
    }

    pub async fn read_frames(&self) -> StoreResult<DecodedJournal> {
        read_journal_frames(&self.path).await
    }

    /// Cuts the file back to `len` bytes.
    pub async fn truncate_to(&mut self, len: u64) -> StoreResult<()> {
        self.file
            .set_len(len)
            .await
            .map_err(StoreError::io("truncating journal"))?;
        if self.durability_mode == DurabilityMode::Sync {
            self.file
                .sync_data()
                .await
                .map_err(StoreError::io("syncing journal"))?;
        }
        self.len = len;
        Ok(())
    }

    pub async fn clear(&mut self) -> StoreResult<()> {
        self.truncate_to(0).await?;
        self.entries_since_checkpoint = 0;
        Ok(())
    }

    pub fn file_len(&self) -> u64 {
        self.len
    }

    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    pub fn needs_checkpoint(&self) -> bool {
        self.entries_since_checkpoint >= self.checkpoint_threshold
    }

    pub fn entries_since_checkpoint(&self) -> usize {
        self.entries_since_checkpoint
    }

    pub fn set_checkpoint_threshold(&mut self, threshold: usize) {
        self.checkpoint_threshold = threshold.max(1);
    }
}

fn encode_frame(seq: u64, entry: &JournalEntry) -> StoreResult<Vec<u8>> {
    let payload = rmp_serde::to_vec_named(&JournalFrameRef { seq, entry })?;
    let len = u32::try_from(payload.len())
        .map_err(|_| StoreError::Encode("journal entry larger than 4 GiB".to_string()))?;
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

#[derive(Debug, Default)]
pub struct DecodedJournal {
    pub frames: Vec<JournalFrame>,
    /// Length of the prefix made of complete frames.
    pub valid_len: u64,
}

/// Decodes every complete frame. A torn trailing frame is left out of
/// both `frames` and `valid_len`.
pub fn decode_frames(data: &[u8]) -> StoreResult<DecodedJournal> {
    let mut frames = Vec::new();
    let mut offset = 0;

    while offset < data.len() {
        let Some(len_bytes) = data.get(offset..offset + 4) else {
            warn!(offset, "ignoring torn journal frame header");
            break;
        };
        let len = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]])
            as usize;
        let start = offset + 4;
        let Some(payload) = data.get(start..start + len) else {
            warn!(offset, len, "ignoring torn journal frame payload");
            break;
        };
        frames.push(rmp_serde::from_slice(payload)?);
        offset = start + len;
    }

    Ok(DecodedJournal {
        frames,
        valid_len: offset as u64,
    })
}

async fn read_journal_frames(path: &Path) -> StoreResult<DecodedJournal> {
    match fs::read(path).await {
        Ok(data) => decode_frames(&data),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(DecodedJournal::default()),
        Err(err) => Err(StoreError::io("reading journal")(err)),
    }
}

pub async fn read_journal(path: &Path) -> StoreResult<Vec<JournalEntry>> {
    let decoded = read_journal_frames(path).await?;
    Ok(decoded.frames.into_iter().map(|frame| frame.entry).collect())
}

// ============================================================================
// Snapshot File
// ============================================================================

pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Writes to a temporary file in the same directory, then renames it
    /// over the previous snapshot.
    pub async fn save(&self, snapshot: &StoreSnapshot) -> StoreResult<()> {
        let serialized = rmp_serde::to_vec_named(snapshot)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || -> StoreResult<()> {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let mut temp = tempfile::NamedTempFile::new_in(dir)
                .map_err(StoreError::io("creating snapshot temp file"))?;
            temp.write_all(&serialized)
                .map_err(StoreError::io("writing snapshot"))?;
            temp.as_file()
                .sync_all()
                .map_err(StoreError::io("syncing snapshot"))?;
            temp.persist(&path)
                .map_err(|err| StoreError::io("renaming snapshot")(err.error))?;
            Ok(())
        })
        .await??;

        Ok(())
    }

    pub async fn load(&self) -> StoreResult<Option<StoreSnapshot>> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::io("reading snapshot")(err)),
        };

        let snapshot: StoreSnapshot = rmp_serde::from_slice(&data)?;
        if snapshot.version != SNAPSHOT_FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: snapshot.version,
                expected: SNAPSHOT_FORMAT_VERSION,
            });
        }
        Ok(Some(snapshot))
    }

    pub async fn delete(&self) -> StoreResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::io("deleting snapshot")(err)),
        }
    }
}

// ============================================================================
// Persistence Manager
// ============================================================================

pub struct PersistenceManager {
    data_dir: PathBuf,
    journal: Journal,
    snapshot: SnapshotFile,
}

impl PersistenceManager {
    /// Opens the journal and snapshot in `data_dir`. Returns `None` for
    /// [`DurabilityMode::None`], in which case nothing touches disk.
    pub async fn open<P: AsRef<Path>>(
        data_dir: P,
        durability_mode: DurabilityMode,
    ) -> StoreResult<Option<Self>> {
        if durability_mode == DurabilityMode::None {
            return Ok(None);
        }

        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)
            .await
            .map_err(StoreError::io("creating data directory"))?;

        let journal = Journal::open(data_dir.join(JOURNAL_FILE), durability_mode).await?;
        let snapshot = SnapshotFile::new(data_dir.join(SNAPSHOT_FILE));

        Ok(Some(Self {
            data_dir,
            journal,
            snapshot,
        }))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn set_checkpoint_threshold(&mut self, threshold: usize) {
        self.journal.set_checkpoint_threshold(threshold);
    }

    pub async fn log(&mut self, entry: &JournalEntry) -> StoreResult<u64> {
        self.journal.append(entry).await
    }

    pub fn needs_checkpoint(&self) -> bool {
        self.journal.needs_checkpoint()
    }

    pub async fn checkpoint(&mut self, collections: &Collections) -> StoreResult<()> {
        let snapshot = StoreSnapshot::new(collections.clone(), self.journal.last_seq());
        self.snapshot.save(&snapshot).await?;
        let replayed = self.journal.entries_since_checkpoint();
        self.journal.clear().await?;
        debug!(entries = replayed, "checkpoint written");
        Ok(())
    }

    /// Drops every persisted document.
    pub async fn reset(&mut self) -> StoreResult<()> {
        self.snapshot.delete().await?;
        self.journal.clear().await
    }

    pub fn pending_entries(&self) -> usize {
        self.journal.entries_since_checkpoint()
    }

    /// Loads the last snapshot and replays the journal frames written
    /// after it. Frames already folded into the snapshot are skipped, and
    /// a torn tail is cut off the file before any new frame is appended.
    pub async fn recover(&mut self) -> StoreResult<Collections> {
        let (mut collections, snapshot_seq) = match self.snapshot.load().await? {
            Some(snapshot) => (snapshot.collections, snapshot.metadata.last_seq),
            None => (Collections::new(), 0),
        };

        let decoded = self.journal.read_frames().await?;
        if decoded.valid_len < self.journal.file_len() {
            warn!(
                valid_len = decoded.valid_len,
                file_len = self.journal.file_len(),
                "truncating torn journal tail"
            );
            self.journal.truncate_to(decoded.valid_len).await?;
        }

        let mut last_seq = snapshot_seq;
        let mut skipped = 0usize;
        self.journal.entries_since_checkpoint = decoded.frames.len();
        for frame in decoded.frames {
            if frame.seq <= snapshot_seq {
                skipped += 1;
                continue;
            }
            collections.apply(frame.entry)?;
            last_seq = last_seq.max(frame.seq);
        }
        if skipped > 0 {
            debug!(skipped, "skipped journal frames already in snapshot");
        }
        self.journal.last_seq = last_seq;

        Ok(collections)
    }
}
