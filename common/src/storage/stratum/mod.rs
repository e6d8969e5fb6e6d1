//! Stratum: a log-structured engine-class backend.
//!
//! This is a deliberately small engine skeleton: checksummed append-only
//! segment logs, an in-memory index rebuilt on open, size-triggered segment
//! rotation, and full-rewrite compaction. It exists to make the engine
//! extension contract ([`EngineExt`]) executable — approximate sizes,
//! forced compaction, property introspection, and out-of-process
//! [`destroy`]/[`repair`] — without pulling in a production storage engine.

pub mod files;
mod log;

use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use self::files::segment_file_name;
use self::log::{LogRecord, LogWriter};
use super::snapshot::SnapshotCursor;
use super::{lock_poisoned, Backend, BackendCursor, BatchOp, EngineExt, OpenOptions, Record};
use super::{config::StratumConfig, SnapshotSemantics};
use crate::error::{Error, Result};
use crate::range::ResolvedRange;

pub use files::{destroy, repair};

/// Property name prefix; names outside this namespace resolve to `""`.
const PROPERTY_PREFIX: &str = "stratum.";

/// Levels reported by the `sstables` property. The skeleton only populates
/// level 0; the headers for the other levels are part of the format.
const REPORTED_LEVELS: u64 = 7;

struct EngineState {
    dir: PathBuf,
    /// Live records.
    index: BTreeMap<Bytes, Bytes>,
    /// On-disk bytes currently attributable to each key: live record plus
    /// any stale versions and tombstones not yet compacted away.
    footprint: BTreeMap<Bytes, u64>,
    segments: Vec<(u64, PathBuf)>,
    active_id: u64,
    writer: LogWriter,
}

impl EngineState {
    fn charge(&mut self, key: &Bytes, len: u64) {
        *self.footprint.entry(key.clone()).or_insert(0) += len;
    }

    fn append(&mut self, record: &LogRecord, sync: bool) -> Result<()> {
        let len = self.writer.append(record)?;
        if sync {
            self.writer.sync()?;
        }
        self.charge(&record.key, len);
        match record.kind {
            log::RecordKind::Put => {
                self.index.insert(record.key.clone(), record.value.clone());
            }
            log::RecordKind::Delete => {
                self.index.remove(&record.key);
            }
        }
        Ok(())
    }

    fn rotate_if_needed(&mut self, segment_size: u64) -> Result<()> {
        if self.writer.len() < segment_size {
            return Ok(());
        }
        self.writer.sync()?;
        self.active_id += 1;
        let path = self.dir.join(segment_file_name(self.active_id));
        self.writer = LogWriter::open(path.clone())?;
        self.segments.push((self.active_id, path));
        Ok(())
    }
}

/// Log-structured disk backend with engine-class extensions.
pub struct StratumBackend {
    config: StratumConfig,
    state: RwLock<Option<EngineState>>,
}

impl StratumBackend {
    pub fn new(config: StratumConfig) -> Self {
        Self {
            config,
            state: RwLock::new(None),
        }
    }

    /// The configured on-disk location.
    pub fn location(&self) -> &str {
        &self.config.path
    }

    fn not_open() -> Error {
        Error::usage("stratum backend is not open")
    }
}

#[async_trait]
impl Backend for StratumBackend {
    /// Opens the location, replaying every segment into the in-memory
    /// index. A torn tail on the last segment is tolerated (and logged);
    /// [`repair`] removes it permanently.
    async fn open(&self, options: OpenOptions) -> Result<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        if state.is_some() {
            return Err(Error::usage("stratum backend is already open"));
        }

        let dir = PathBuf::from(&self.config.path);
        let exists = files::is_stratum_dir(&dir);
        if exists && options.error_if_exists {
            return Err(Error::engine(format!(
                "{}: already exists (error_if_exists is true)",
                dir.display()
            )));
        }
        if !exists && !options.create_if_missing {
            return Err(Error::engine(format!(
                "{}: does not exist (create_if_missing is false)",
                dir.display()
            )));
        }

        std::fs::create_dir_all(&dir)?;
        if !exists {
            files::write_marker(&dir)?;
        }

        let mut index = BTreeMap::new();
        let mut footprint: BTreeMap<Bytes, u64> = BTreeMap::new();
        let mut segments = files::list_segments(&dir)?;
        let last_id = segments.last().map(|(id, _)| *id);
        for (id, path) in &segments {
            let outcome = log::scan(path)?;
            if outcome.truncated_tail {
                // Only the newest segment may legitimately end mid-frame
                // (crash during append). Anywhere else it is corruption.
                if Some(*id) != last_id {
                    return Err(Error::corruption(format!(
                        "bad frame in sealed segment {}",
                        path.display()
                    )));
                }
                tracing::warn!(
                    segment = id,
                    valid_len = outcome.valid_len,
                    "ignoring torn tail in active segment; run repair to truncate it"
                );
            }
            for (record, len) in outcome.records {
                *footprint.entry(record.key.clone()).or_insert(0) += len;
                match record.kind {
                    log::RecordKind::Put => {
                        index.insert(record.key, record.value);
                    }
                    log::RecordKind::Delete => {
                        index.remove(&record.key);
                    }
                }
            }
        }

        let active_id = segments.last().map(|(id, _)| id + 1).unwrap_or(1);
        let active_path = dir.join(segment_file_name(active_id));
        let writer = LogWriter::open(active_path.clone())?;
        segments.push((active_id, active_path));

        tracing::debug!(
            location = %dir.display(),
            segments = segments.len(),
            live_keys = index.len(),
            "opened stratum backend"
        );

        *state = Some(EngineState {
            dir,
            index,
            footprint,
            segments,
            active_id,
            writer,
        });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        if let Some(engine) = state.as_mut() {
            engine.writer.sync()?;
        }
        *state = None;
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> Result<Option<Bytes>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        let engine = state.as_ref().ok_or_else(Self::not_open)?;
        Ok(engine.index.get(&key).cloned())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn put(&self, key: Bytes, value: Bytes) -> Result<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let engine = state.as_mut().ok_or_else(Self::not_open)?;
        engine.rotate_if_needed(self.config.segment_size)?;
        engine.append(&LogRecord::put(key, value), self.config.sync_writes)
    }

    /// Deleting an absent key still appends a tombstone; idempotent-delete
    /// semantics come for free and the tombstone is reclaimed at the next
    /// compaction.
    #[tracing::instrument(level = "trace", skip_all)]
    async fn delete(&self, key: Bytes) -> Result<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let engine = state.as_mut().ok_or_else(Self::not_open)?;
        engine.rotate_if_needed(self.config.segment_size)?;
        engine.append(&LogRecord::delete(key), self.config.sync_writes)
    }

    /// All frames are appended and the index updated under one write-lock
    /// acquisition: a running process never observes partial application.
    /// A crash between frames can tear durability at the log tail, which
    /// open tolerates and repair truncates.
    #[tracing::instrument(level = "trace", skip_all)]
    async fn apply(&self, ops: Vec<BatchOp>) -> Result<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let engine = state.as_mut().ok_or_else(Self::not_open)?;
        engine.rotate_if_needed(self.config.segment_size)?;
        for op in ops {
            let record = match op {
                BatchOp::Put { key, value } => LogRecord::put(key, value),
                BatchOp::Delete { key } => LogRecord::delete(key),
            };
            engine.append(&record, false)?;
        }
        if self.config.sync_writes {
            engine.writer.sync()?;
        }
        Ok(())
    }

    fn cursor(&self, range: ResolvedRange) -> Result<Box<dyn BackendCursor>> {
        if range.yields_nothing() {
            return Ok(Box::new(SnapshotCursor::exhausted()));
        }

        let state = self.state.read().map_err(lock_poisoned)?;
        let engine = state.as_ref().ok_or_else(Self::not_open)?;
        let iter = engine
            .index
            .range((range.range.start.clone(), range.range.end.clone()))
            .map(|(k, v)| Record::new(k.clone(), v.clone()));
        let records: Vec<Record> = if range.reverse {
            iter.rev().collect()
        } else {
            iter.collect()
        };
        Ok(Box::new(SnapshotCursor::new(
            records,
            range.range,
            range.reverse,
        )))
    }

    fn semantics(&self) -> SnapshotSemantics {
        SnapshotSemantics::Snapshot
    }

    // clear: inherited composed default (cursor + delete).

    fn as_engine(&self) -> Option<&dyn EngineExt> {
        Some(self)
    }
}

#[async_trait]
impl EngineExt for StratumBackend {
    /// Sums the on-disk bytes attributable to keys in `[start, end)`,
    /// including stale versions and tombstones not yet compacted away.
    async fn approximate_size(&self, start: Bytes, end: Bytes) -> Result<u64> {
        let state = self.state.read().map_err(lock_poisoned)?;
        let engine = state.as_ref().ok_or_else(Self::not_open)?;
        let total = engine
            .footprint
            .range((Bound::Included(start), Bound::Excluded(end)))
            .map(|(_, len)| len)
            .sum();
        Ok(total)
    }

    /// Rewrites all live records into a fresh segment and drops the old
    /// ones. The skeleton engine has a single level, so the range is
    /// advisory and compaction is whole-store; the observable contract —
    /// footprint strictly shrinks for tombstone-heavy content — holds.
    async fn compact_range(&self, _start: Bytes, _end: Bytes) -> Result<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let engine = state.as_mut().ok_or_else(Self::not_open)?;

        let compacted_id = engine.active_id + 1;
        let compacted_path = engine.dir.join(segment_file_name(compacted_id));
        let mut writer = LogWriter::open(compacted_path.clone())?;
        let mut footprint = BTreeMap::new();
        for (key, value) in &engine.index {
            let record = LogRecord::put(key.clone(), value.clone());
            let len = writer.append(&record)?;
            footprint.insert(key.clone(), len);
        }
        writer.sync()?;

        let old_segments = std::mem::take(&mut engine.segments);
        for (_, path) in old_segments {
            std::fs::remove_file(&path)?;
        }

        tracing::debug!(
            segment = compacted_id,
            live_keys = engine.index.len(),
            "compacted stratum segments"
        );

        engine.footprint = footprint;
        engine.segments = vec![(compacted_id, compacted_path)];
        engine.active_id = compacted_id;
        engine.writer = writer;
        Ok(())
    }

    fn property(&self, name: &str) -> String {
        let Some(name) = name.strip_prefix(PROPERTY_PREFIX) else {
            return String::new();
        };
        let Ok(state) = self.state.read() else {
            return String::new();
        };
        let Some(engine) = state.as_ref() else {
            return String::new();
        };

        if let Some(level) = name.strip_prefix("num-files-at-level") {
            let Ok(level) = level.parse::<u64>() else {
                return String::new();
            };
            let files = if level == 0 { engine.segments.len() } else { 0 };
            return files.to_string();
        }

        match name {
            "stats" => {
                let footprint: u64 = engine.footprint.values().sum();
                format!(
                    "Stratum engine statistics\n\
                     Segments: {}\n\
                     Live keys: {}\n\
                     Approximate footprint: {} bytes\n",
                    engine.segments.len(),
                    engine.index.len(),
                    footprint
                )
            }
            "sstables" => {
                let mut out = String::new();
                for level in 0..REPORTED_LEVELS {
                    out.push_str(&format!("--- level {level} ---\n"));
                    if level == 0 {
                        for (id, path) in &engine.segments {
                            let len = std::fs::metadata(path)
                                .map(|meta| meta.len())
                                .unwrap_or(0);
                            out.push_str(&format!(" {:06}: {} bytes\n", id, len));
                        }
                    }
                }
                out
            }
            _ => String::new(),
        }
    }
}
