//! Grouping a boolean mask into contiguous read intervals.
//!
//! Reading one interval per run of selected rows keeps I/O to the rows
//! actually needed, but many small reads are slow. Runs are therefore
//! merged when the unselected gap between them is small relative to the
//! array: a gap of `g` rows in an array of `n` rows is bridged when
//! `g / n < ratio`. A ratio of 0 never bridges; a ratio of 1 always
//! bridges and yields a single interval.

use simobj_core::Interval;

/// Maximal runs of `true` in `mask`, in order.
pub fn true_runs(mask: &[bool]) -> Vec<Interval> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, &selected) in mask.iter().enumerate() {
        match (selected, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push(Interval::new(s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(Interval::new(s, mask.len()));
    }
    runs
}

/// Group the `true` rows of `mask` into read intervals.
///
/// Consecutive runs are merged while the gap between them, as a fraction
/// of `mask.len()`, is strictly less than `ratio`. An all-false (or empty)
/// mask yields the single empty interval `[0, 0)` so callers still issue
/// one read and get a correctly typed empty result.
pub fn group_intervals(mask: &[bool], ratio: f64) -> Vec<Interval> {
    let runs = true_runs(mask);
    let Some((&first, rest)) = runs.split_first() else {
        return vec![Interval::EMPTY];
    };
    let n = mask.len() as f64;
    let mut grouped = Vec::with_capacity(runs.len());
    let mut current = first;
    for &run in rest {
        let gap = (run.start - current.end) as f64;
        if gap / n < ratio {
            current.end = run.end;
        } else {
            grouped.push(current);
            current = run;
        }
    }
    grouped.push(current);
    grouped
}

/// Total number of rows spanned by `intervals`.
pub fn rows_covered(intervals: &[Interval]) -> usize {
    intervals.iter().map(Interval::len).sum()
}
