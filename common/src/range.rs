//! Range resolution: user-supplied bound options to a canonical range.
//!
//! Callers describe ranges with `gt`/`gte`/`lt`/`lte`, the legacy aliases
//! `start`/`end`, a traversal direction, and an entry limit. Resolution turns
//! that into a [`ResolvedRange`]: a [`BytesRange`] window plus direction and
//! limit, which is the exact shape every backend primitive receives.

use std::ops::Bound;

use bytes::Bytes;

use crate::bytes::BytesRange;

/// Entry limit meaning "yield everything".
pub const UNLIMITED: i64 = -1;

/// User-supplied range options, prior to resolution.
///
/// All bounds are optional; `None` means "no bound on this side". A bound
/// that is present but empty (`Some(Bytes::new())`) is still a bound —
/// presence and emptiness are distinct, and resolution never discards a
/// bound for being empty.
///
/// The default covers the whole keyspace: no bounds, forward, unlimited.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeOptions {
    /// Exclusive lower bound. Wins over `gte` and `start`.
    pub gt: Option<Bytes>,
    /// Inclusive lower bound. Wins over `start`.
    pub gte: Option<Bytes>,
    /// Exclusive upper bound. Wins over `lte` and `end`.
    pub lt: Option<Bytes>,
    /// Inclusive upper bound. Wins over `end`.
    pub lte: Option<Bytes>,
    /// Legacy alias: inclusive lower bound, or inclusive upper bound when
    /// `reverse` is set.
    pub start: Option<Bytes>,
    /// Legacy alias: inclusive upper bound, or inclusive lower bound when
    /// `reverse` is set.
    pub end: Option<Bytes>,
    /// Walk from the upper bound towards the lower bound.
    pub reverse: bool,
    /// Maximum number of entries to yield. `-1` is unbounded, `0` yields
    /// nothing, positive values cap the count regardless of direction.
    pub limit: i64,
}

impl Default for RangeOptions {
    fn default() -> Self {
        Self {
            gt: None,
            gte: None,
            lt: None,
            lte: None,
            start: None,
            end: None,
            reverse: false,
            // A zero default would make every defaulted cursor and clear
            // yield nothing; unlimited is the meaningful default.
            limit: UNLIMITED,
        }
    }
}

impl RangeOptions {
    /// Options covering the whole keyspace, forward, unlimited.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn gt(mut self, bound: impl Into<Bytes>) -> Self {
        self.gt = Some(bound.into());
        self
    }

    pub fn gte(mut self, bound: impl Into<Bytes>) -> Self {
        self.gte = Some(bound.into());
        self
    }

    pub fn lt(mut self, bound: impl Into<Bytes>) -> Self {
        self.lt = Some(bound.into());
        self
    }

    pub fn lte(mut self, bound: impl Into<Bytes>) -> Self {
        self.lte = Some(bound.into());
        self
    }

    pub fn start(mut self, bound: impl Into<Bytes>) -> Self {
        self.start = Some(bound.into());
        self
    }

    pub fn end(mut self, bound: impl Into<Bytes>) -> Self {
        self.end = Some(bound.into());
        self
    }

    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Resolves the options into a canonical directional range.
    ///
    /// Precedence per side: exclusive bound, then inclusive bound, then the
    /// legacy alias. The legacy `start`/`end` pair swaps sides under
    /// `reverse` (`start` names the first key yielded, whichever side that
    /// is); `gt`/`gte`/`lt`/`lte` never swap — `reverse` flips traversal,
    /// not bound semantics. Negative limits normalize to [`UNLIMITED`].
    pub fn resolve(&self) -> ResolvedRange {
        let (legacy_lower, legacy_upper) = if self.reverse {
            (&self.end, &self.start)
        } else {
            (&self.start, &self.end)
        };

        let start = if let Some(bound) = &self.gt {
            Bound::Excluded(bound.clone())
        } else if let Some(bound) = &self.gte {
            Bound::Included(bound.clone())
        } else if let Some(bound) = legacy_lower {
            Bound::Included(bound.clone())
        } else {
            Bound::Unbounded
        };

        let end = if let Some(bound) = &self.lt {
            Bound::Excluded(bound.clone())
        } else if let Some(bound) = &self.lte {
            Bound::Included(bound.clone())
        } else if let Some(bound) = legacy_upper {
            Bound::Included(bound.clone())
        } else {
            Bound::Unbounded
        };

        ResolvedRange {
            range: BytesRange::new(start, end),
            reverse: self.reverse,
            limit: if self.limit < 0 { UNLIMITED } else { self.limit },
        }
    }
}

/// A canonical directional range: the fully-defaulted argument shape passed
/// to backend cursor and clear primitives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedRange {
    /// Bound window. Unaffected by `reverse`.
    pub range: BytesRange,
    /// Traversal direction: upper bound towards lower bound when set.
    pub reverse: bool,
    /// Entry cap: [`UNLIMITED`], zero, or a positive count.
    pub limit: i64,
}

impl ResolvedRange {
    /// The whole keyspace, forward, unlimited.
    pub fn all() -> Self {
        Self {
            range: BytesRange::unbounded(),
            reverse: false,
            limit: UNLIMITED,
        }
    }

    /// Returns true if the range can be answered without consulting the
    /// engine at all: a zero limit or provably inverted bounds.
    pub fn yields_nothing(&self) -> bool {
        self.limit == 0 || self.range.is_degenerate()
    }
}
