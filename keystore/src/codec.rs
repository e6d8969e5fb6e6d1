//! Key and value serialization hooks.
//!
//! Every key and value a [`Store`](crate::Store) sends to its backend first
//! passes through the store's codec; ranges (cursor bounds, clear bounds,
//! engine-extension bounds) pass through [`KeyCodec::serialize_range`] so a
//! codec cannot be bypassed by going through a range operation. Validation
//! happens on the *pre-serialization* input and is the store's job, not the
//! codec's, so an override cannot accidentally (or deliberately) skip it.

use std::ops::Bound;

use bytes::{BufMut, Bytes, BytesMut};
use common::bytes::BytesRange;
use common::{Error, Result};

/// Per-store serialization hooks. All methods default to identity.
pub trait KeyCodec: Send + Sync {
    /// Serializes a key before it reaches the backend.
    fn serialize_key(&self, key: &Bytes) -> Bytes {
        key.clone()
    }

    /// Serializes a value before it reaches the backend.
    fn serialize_value(&self, value: &Bytes) -> Bytes {
        value.clone()
    }

    /// Serializes the bounds of a resolved range.
    ///
    /// The default maps each present bound through
    /// [`serialize_key`](KeyCodec::serialize_key) and leaves absent bounds
    /// absent. Codecs that namespace the keyspace (e.g. [`PrefixCodec`])
    /// override this to clamp unbounded sides into their namespace.
    fn serialize_range(&self, range: BytesRange) -> BytesRange {
        let map = |bound: Bound<Bytes>| match bound {
            Bound::Included(key) => Bound::Included(self.serialize_key(&key)),
            Bound::Excluded(key) => Bound::Excluded(self.serialize_key(&key)),
            Bound::Unbounded => Bound::Unbounded,
        };
        BytesRange::new(map(range.start), map(range.end))
    }
}

/// The default codec: keys and values reach the backend unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityCodec;

impl KeyCodec for IdentityCodec {}

/// Key format version used by [`PrefixCodec`].
pub const KEY_VERSION: u8 = 0x01;

/// Record tag: record type in the high nibble, reserved low nibble.
pub const RECORD_TAG: u8 = 0x10;

const NEXT_RECORD_TAG: u8 = 0x11;

/// Namespaces every key under a 2-byte `| version | record_tag |` prefix.
///
/// Useful when several record families share one backend: scans through
/// this codec only ever see this family's keys, because unbounded range
/// sides are clamped to the prefix instead of the whole keyspace.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrefixCodec;

impl PrefixCodec {
    /// Strips and validates the 2-byte prefix from a stored key, returning
    /// the user key.
    pub fn strip(stored_key: &[u8]) -> Result<Bytes> {
        if stored_key.len() < 2 {
            return Err(Error::validation(format!(
                "stored key too short: expected at least 2 bytes, got {}",
                stored_key.len()
            )));
        }
        if stored_key[0] != KEY_VERSION {
            return Err(Error::validation(format!(
                "invalid key version: expected 0x{:02x}, got 0x{:02x}",
                KEY_VERSION, stored_key[0]
            )));
        }
        if stored_key[1] != RECORD_TAG {
            return Err(Error::validation(format!(
                "invalid record tag: expected 0x{:02x}, got 0x{:02x}",
                RECORD_TAG, stored_key[1]
            )));
        }
        Ok(Bytes::copy_from_slice(&stored_key[2..]))
    }
}

impl KeyCodec for PrefixCodec {
    fn serialize_key(&self, key: &Bytes) -> Bytes {
        let mut buf = BytesMut::with_capacity(2 + key.len());
        buf.put_u8(KEY_VERSION);
        buf.put_u8(RECORD_TAG);
        buf.extend_from_slice(key);
        buf.freeze()
    }

    fn serialize_range(&self, range: BytesRange) -> BytesRange {
        let start = match range.start {
            Bound::Included(key) => Bound::Included(self.serialize_key(&key)),
            Bound::Excluded(key) => Bound::Excluded(self.serialize_key(&key)),
            // Clamp to the first key of this record family.
            Bound::Unbounded => Bound::Included(Bytes::from_static(&[KEY_VERSION, RECORD_TAG])),
        };
        let end = match range.end {
            Bound::Included(key) => Bound::Included(self.serialize_key(&key)),
            Bound::Excluded(key) => Bound::Excluded(self.serialize_key(&key)),
            // Clamp to just past this record family.
            Bound::Unbounded => {
                Bound::Excluded(Bytes::from_static(&[KEY_VERSION, NEXT_RECORD_TAG]))
            }
        };
        BytesRange::new(start, end)
    }
}
