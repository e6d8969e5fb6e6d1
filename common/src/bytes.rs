//! Byte-sequence utilities for key ordering and range queries.

use std::ops::Bound::{Excluded, Included, Unbounded};
use std::ops::{Bound, RangeBounds};

use bytes::{Bytes, BytesMut};

/// Computes the lexicographic successor of a byte sequence.
///
/// Returns the smallest byte sequence strictly greater than the input, or
/// `None` if no such sequence exists (empty input or all `0xFF` bytes).
/// Useful for turning a key prefix into an exclusive upper bound.
pub(crate) fn lex_increment(data: &[u8]) -> Option<Bytes> {
    if data.is_empty() {
        return None;
    }

    let mut result = BytesMut::from(data);
    while let Some(last) = result.last_mut() {
        if *last < 0xFF {
            *last += 1;
            return Some(result.freeze());
        }
        // Trailing 0xFF cannot be incremented, drop it and carry left.
        result.truncate(result.len() - 1);
    }

    None
}

/// A resolved range over byte-sequence keys.
///
/// Both bounds are expressed as [`Bound<Bytes>`]; direction and entry limits
/// live in [`crate::range::ResolvedRange`], not here. A `BytesRange` only
/// answers "is this key inside the window".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BytesRange {
    pub start: Bound<Bytes>,
    pub end: Bound<Bytes>,
}

impl BytesRange {
    pub fn new(start: Bound<Bytes>, end: Bound<Bytes>) -> Self {
        Self { start, end }
    }

    /// Creates a range covering the whole keyspace.
    pub fn unbounded() -> Self {
        Self {
            start: Unbounded,
            end: Unbounded,
        }
    }

    /// Creates a range covering every key that starts with `prefix`.
    pub fn prefix(prefix: Bytes) -> Self {
        if prefix.is_empty() {
            Self::unbounded()
        } else {
            match lex_increment(&prefix) {
                Some(end) => Self {
                    start: Included(prefix),
                    end: Excluded(end),
                },
                None => Self {
                    start: Included(prefix),
                    end: Unbounded,
                },
            }
        }
    }

    /// Returns true if `key` falls inside the range window.
    pub fn contains(&self, key: &[u8]) -> bool {
        (match &self.start {
            Included(s) => key >= s.as_ref(),
            Excluded(s) => key > s.as_ref(),
            Unbounded => true,
        }) && (match &self.end {
            Included(e) => key <= e.as_ref(),
            Excluded(e) => key < e.as_ref(),
            Unbounded => true,
        })
    }

    /// Returns true if the bounds are provably non-monotonic and the range
    /// can never contain a key. Used to short-circuit cursor creation; a
    /// conservative `false` is always safe because [`contains`] still
    /// filters every key.
    ///
    /// [`contains`]: BytesRange::contains
    pub fn is_degenerate(&self) -> bool {
        match (&self.start, &self.end) {
            (Included(s), Included(e)) => s > e,
            (Included(s), Excluded(e)) | (Excluded(s), Included(e)) | (Excluded(s), Excluded(e)) => {
                s >= e
            }
            // No key sorts below the empty sequence.
            (Unbounded, Excluded(e)) => e.is_empty(),
            _ => false,
        }
    }
}

impl RangeBounds<Bytes> for BytesRange {
    fn start_bound(&self) -> Bound<&Bytes> {
        self.start.as_ref()
    }

    fn end_bound(&self) -> Bound<&Bytes> {
        self.end.as_ref()
    }
}
