//! Row selectors and half-open row intervals.

use std::fmt;
use std::ops::Range;

/// A half-open `[start, end)` range of rows along a field's primary axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval {
    /// First row included.
    pub start: usize,
    /// One past the last row included.
    pub end: usize,
}

impl Interval {
    /// The empty interval `[0, 0)`.
    pub const EMPTY: Interval = Interval { start: 0, end: 0 };

    /// Build an interval. `end` is clamped up to `start`.
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Number of rows covered.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` if no rows are covered.
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// As a `std::ops::Range`.
    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl From<Range<usize>> for Interval {
    fn from(r: Range<usize>) -> Self {
        Self::new(r.start, r.end)
    }
}

/// Which rows of a raw field belong to the object.
///
/// A selector is computed once per keytype by a mask function and then
/// applied to every field of that keytype.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    /// No restriction: every row belongs to the object.
    None,
    /// A contiguous block of rows.
    Range {
        /// First row included.
        start: usize,
        /// One past the last row included.
        end: usize,
    },
    /// A per-row predicate; its length equals the unmasked row count.
    BoolArray(Vec<bool>),
    /// Explicit row indices, applied in the given order.
    IndexSet(Vec<usize>),
}

impl Selector {
    /// Stable one-byte tag used by the cache codec.
    pub fn tag(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Range { .. } => 1,
            Self::BoolArray(_) => 2,
            Self::IndexSet(_) => 3,
        }
    }

    /// Returns `true` for [`Selector::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Number of rows the selector keeps out of `total`, or `None` if
    /// the selector does not fit a field with `total` rows.
    pub fn selected_len(&self, total: usize) -> Option<usize> {
        match self {
            Self::None => Some(total),
            Self::Range { start, end } => (start <= end && *end <= total).then(|| end - start),
            Self::BoolArray(mask) => {
                (mask.len() == total).then(|| mask.iter().filter(|&&b| b).count())
            }
            Self::IndexSet(idx) => idx.iter().all(|&i| i < total).then_some(idx.len()),
        }
    }

    /// The portion of a `BoolArray` covering `interval`, as a new
    /// `BoolArray` relative to the interval start.
    ///
    /// Other variants are returned unchanged.
    pub fn restrict(&self, interval: Interval) -> Selector {
        match self {
            Self::BoolArray(mask) => {
                let end = interval.end.min(mask.len());
                let start = interval.start.min(end);
                Self::BoolArray(mask[start..end].to_vec())
            }
            other => other.clone(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Range { start, end } => write!(f, "range[{start}, {end})"),
            Self::BoolArray(mask) => {
                let kept = mask.iter().filter(|&&b| b).count();
                write!(f, "bool[{kept}/{}]", mask.len())
            }
            Self::IndexSet(idx) => write!(f, "index[{}]", idx.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selected_len_checks_fit() {
        assert_eq!(Selector::None.selected_len(7), Some(7));
        assert_eq!(Selector::Range { start: 2, end: 5 }.selected_len(10), Some(3));
        assert_eq!(Selector::Range { start: 2, end: 11 }.selected_len(10), None);
        assert_eq!(
            Selector::BoolArray(vec![true, false, true]).selected_len(3),
            Some(2)
        );
        assert_eq!(Selector::BoolArray(vec![true]).selected_len(3), None);
        assert_eq!(Selector::IndexSet(vec![0, 9]).selected_len(10), Some(2));
        assert_eq!(Selector::IndexSet(vec![10]).selected_len(10), None);
    }

    #[test]
    fn restrict_slices_bool_array() {
        let sel = Selector::BoolArray(vec![false, true, true, false, true]);
        assert_eq!(
            sel.restrict(Interval::new(1, 4)),
            Selector::BoolArray(vec![true, true, false])
        );
        assert_eq!(sel.restrict(Interval::EMPTY), Selector::BoolArray(vec![]));
    }

    #[test]
    fn interval_new_clamps_reversed_bounds() {
        let iv = Interval::new(5, 2);
        assert!(iv.is_empty());
        assert_eq!(iv.start, 5);
    }
}
