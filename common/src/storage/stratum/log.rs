//! Segment log framing.
//!
//! Each segment is an append-only sequence of checksummed frames:
//!
//! ```text
//! | frame_len: u32 | crc64: u64 | kind: u8 | key_len: u32 | key | value |
//! ```
//!
//! `frame_len` covers everything after the checksum; the CRC-64/ECMA
//! checksum covers the same bytes. A reader stops at the first frame that
//! is short, fails its checksum, or carries an unknown kind — everything
//! before that point is the valid prefix, everything after is a torn tail
//! left by a crash mid-append.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use crc::Crc;

use crate::error::{Error, Result};

const CRC64: Crc<u64> = Crc::<u64>::new(&crc::CRC_64_ECMA_182);

/// Bytes of frame header preceding the payload: frame_len + crc64.
const HEADER_LEN: usize = 4 + 8;

const KIND_PUT: u8 = 1;
const KIND_DELETE: u8 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Put,
    Delete,
}

/// One logical record in a segment log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    pub kind: RecordKind,
    pub key: Bytes,
    pub value: Bytes,
}

impl LogRecord {
    pub fn put(key: Bytes, value: Bytes) -> Self {
        Self {
            kind: RecordKind::Put,
            key,
            value,
        }
    }

    /// A tombstone. Tombstones carry no value bytes.
    pub fn delete(key: Bytes) -> Self {
        Self {
            kind: RecordKind::Delete,
            key,
            value: Bytes::new(),
        }
    }
}

/// Frames a record for appending to a segment.
pub fn encode(record: &LogRecord) -> Bytes {
    let payload_len = 1 + 4 + record.key.len() + record.value.len();
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload_len);

    let mut payload = BytesMut::with_capacity(payload_len);
    payload.put_u8(match record.kind {
        RecordKind::Put => KIND_PUT,
        RecordKind::Delete => KIND_DELETE,
    });
    payload.put_u32(record.key.len() as u32);
    payload.extend_from_slice(&record.key);
    payload.extend_from_slice(&record.value);

    buf.put_u32(payload_len as u32);
    buf.put_u64(CRC64.checksum(&payload));
    buf.extend_from_slice(&payload);
    buf.freeze()
}

/// The valid contents of a segment file.
pub struct ScanOutcome {
    /// Records in append order, each with its framed on-disk length.
    pub records: Vec<(LogRecord, u64)>,
    /// Length of the valid prefix of the file.
    pub valid_len: u64,
    /// True if bytes past `valid_len` exist (torn tail or garbage).
    pub truncated_tail: bool,
}

/// Scans a segment file, tolerating a torn tail.
pub fn scan(path: &Path) -> Result<ScanOutcome> {
    let data = std::fs::read(path)?;
    let file_len = data.len() as u64;
    let mut buf = &data[..];
    let mut records = Vec::new();
    let mut valid_len = 0u64;

    loop {
        if buf.remaining() < HEADER_LEN {
            break;
        }
        let mut header = &buf[..HEADER_LEN];
        let payload_len = header.get_u32() as usize;
        let crc = header.get_u64();

        if payload_len < 5 || buf.remaining() < HEADER_LEN + payload_len {
            break;
        }
        let payload = &buf[HEADER_LEN..HEADER_LEN + payload_len];
        if CRC64.checksum(payload) != crc {
            break;
        }

        let mut body = payload;
        let kind = match body.get_u8() {
            KIND_PUT => RecordKind::Put,
            KIND_DELETE => RecordKind::Delete,
            _ => break,
        };
        let key_len = body.get_u32() as usize;
        if key_len > body.remaining() {
            break;
        }
        let key = Bytes::copy_from_slice(&body[..key_len]);
        let value = Bytes::copy_from_slice(&body[key_len..]);

        let framed_len = (HEADER_LEN + payload_len) as u64;
        records.push((LogRecord { kind, key, value }, framed_len));
        valid_len += framed_len;
        buf.advance(HEADER_LEN + payload_len);
    }

    Ok(ScanOutcome {
        records,
        valid_len,
        truncated_tail: valid_len < file_len,
    })
}

/// Appending writer for one segment file.
pub struct LogWriter {
    file: File,
    path: PathBuf,
    len: u64,
}

impl LogWriter {
    /// Opens (creating if needed) a segment for appending.
    pub fn open(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        let len = file.metadata()?.len();
        Ok(Self { file, path, len })
    }

    /// Appends one framed record, returning its on-disk length.
    pub fn append(&mut self, record: &LogRecord) -> Result<u64> {
        let frame = encode(record);
        self.file.write_all(&frame).map_err(|e| {
            Error::engine(format!("append to {}: {}", self.path.display(), e))
        })?;
        let written = frame.len() as u64;
        self.len += written;
        Ok(written)
    }

    /// Flushes appended frames to durable storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all().map_err(|e| {
            Error::engine(format!("sync {}: {}", self.path.display(), e))
        })
    }

    /// Current file length including unsynced appends.
    pub fn len(&self) -> u64 {
        self.len
    }
}
