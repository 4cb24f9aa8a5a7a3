//! Reading a field through a selector.

use tracing::debug;

use simobj_core::source::fetch;
use simobj_core::{FieldError, FieldSource, Interval, Selector, Value};

use crate::interval::{group_intervals, rows_covered};

/// Read the rows of `key` picked by `selector`.
///
/// The read strategy depends on the selector and the source:
///
/// - In share mode, or when `key` is already resident, the whole field is
///   read and the selector applied afterwards.
/// - [`Selector::Range`] reads exactly that interval.
/// - [`Selector::BoolArray`] is grouped with [`group_intervals`] using
///   `grouping_ratio`; each interval is read separately, masked with the
///   matching slice of the selector, and the chunks concatenated.
/// - [`Selector::None`] and [`Selector::IndexSet`] read the whole field.
///
/// Before a partial read the selector is checked against
/// [`FieldSource::rows`]; one sized for another field fails with
/// [`FieldError::ShapeMismatch`], as it would on a whole read.
///
/// Keys loaded here are released before returning unless the source is in
/// share mode. The result is identical for every strategy.
pub fn fetch_selected(
    source: &mut dyn FieldSource,
    key: &str,
    selector: &Selector,
    grouping_ratio: f64,
) -> Result<Value, FieldError> {
    if !source.contains(key) {
        return Err(FieldError::UnknownField {
            name: key.to_string(),
        });
    }
    if source.share_mode() || source.value(key).is_some() {
        return fetch(source, key, None)?.select(selector);
    }
    let rows = source.rows(key).ok_or_else(|| FieldError::Source {
        reason: format!("no row count for '{key}'"),
    })?;
    if selector.selected_len(rows).is_none() {
        return Err(FieldError::ShapeMismatch {
            reason: format!("selector {selector} does not fit {rows} rows"),
        });
    }
    match selector {
        Selector::Range { start, end } => fetch(source, key, Some(Interval::new(*start, *end))),
        Selector::BoolArray(mask) => {
            let intervals = group_intervals(mask, grouping_ratio);
            debug!(
                key,
                reads = intervals.len(),
                rows_read = rows_covered(&intervals),
                rows_kept = selector.selected_len(mask.len()).unwrap_or(0),
                "grouped partial read"
            );
            let mut chunks = Vec::with_capacity(intervals.len());
            for iv in intervals {
                let chunk = fetch(source, key, Some(iv))?;
                chunks.push(chunk.select(&selector.restrict(iv))?);
            }
            Value::concat(chunks)
        }
        Selector::None | Selector::IndexSet(_) => fetch(source, key, None)?.select(selector),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use simobj_test_utils::fixtures::counting_source;
    use simobj_test_utils::MockFieldSource;

    #[test]
    fn range_reads_only_that_interval() {
        let mut src = counting_source();
        let v = fetch_selected(&mut src, "x", &Selector::Range { start: 2, end: 5 }, 0.1).unwrap();
        assert_eq!(v.data(), &[2.0, 3.0, 4.0]);
        assert_eq!(src.intervals_for("x"), vec![Some(Interval::new(2, 5))]);
        assert!(src.working_set().is_empty());
    }

    #[test]
    fn bool_array_reads_one_interval_per_group() {
        let mut src = counting_source();
        let mask: Vec<bool> = (0..10).map(|i| i < 2 || i >= 8).collect();
        let v = fetch_selected(&mut src, "x", &Selector::BoolArray(mask), 0.0).unwrap();
        assert_eq!(v.data(), &[0.0, 1.0, 8.0, 9.0]);
        assert_eq!(
            src.intervals_for("x"),
            vec![Some(Interval::new(0, 2)), Some(Interval::new(8, 10))]
        );
    }

    #[test]
    fn all_false_mask_gives_empty_value_with_unit() {
        let mut src = MockFieldSource::new().with_field(
            "m",
            "p",
            Value::column(vec![1.0, 2.0, 3.0], "Msun"),
        );
        let v = fetch_selected(&mut src, "m", &Selector::BoolArray(vec![false; 3]), 0.5).unwrap();
        assert!(v.is_empty());
        assert_eq!(v.unit().name(), "Msun");
    }

    #[test]
    fn share_mode_reads_whole_and_keeps_resident() {
        let mut src = MockFieldSource::shared().with_field(
            "x",
            "p",
            Value::column((0..10).map(f64::from).collect(), ""),
        );
        let v = fetch_selected(&mut src, "x", &Selector::Range { start: 1, end: 3 }, 0.1).unwrap();
        assert_eq!(v.data(), &[1.0, 2.0]);
        assert_eq!(src.intervals_for("x"), vec![None]);
        assert_eq!(src.working_set(), vec!["x".to_string()]);
    }

    #[test]
    fn resident_key_is_selected_in_memory() {
        let mut src = counting_source();
        src.load(&["x"], None).unwrap();
        src.clear_log();
        let v = fetch_selected(&mut src, "x", &Selector::IndexSet(vec![9, 0]), 0.1).unwrap();
        assert_eq!(v.data(), &[9.0, 0.0]);
        assert!(src.releases.is_empty());
        assert_eq!(src.working_set(), vec!["x".to_string()]);
    }

    #[test]
    fn unknown_key_fails_before_loading() {
        let mut src = counting_source();
        let err = fetch_selected(&mut src, "y", &Selector::None, 0.1).unwrap_err();
        assert_eq!(err, FieldError::UnknownField { name: "y".into() });
        assert!(src.loads.is_empty());
    }

    #[test]
    fn short_mask_is_rejected_before_reading() {
        let mut src = counting_source();
        let mask = Selector::BoolArray(vec![true, false, true, false, true]);
        let err = fetch_selected(&mut src, "x", &mask, 0.0).unwrap_err();
        assert!(matches!(err, FieldError::ShapeMismatch { .. }), "{err}");
        assert!(src.loads.is_empty());
    }

    #[test]
    fn range_past_the_end_is_rejected() {
        let mut src = counting_source();
        let err = fetch_selected(&mut src, "x", &Selector::Range { start: 8, end: 12 }, 0.1)
            .unwrap_err();
        assert!(matches!(err, FieldError::ShapeMismatch { .. }), "{err}");
    }

    proptest! {
        #[test]
        fn grouped_read_matches_whole_read(
            mask in prop::collection::vec(any::<bool>(), 5..15),
            ratio in 0.0f64..=1.0,
        ) {
            let selector = Selector::BoolArray(mask);
            let mut grouped = counting_source();
            let mut whole = counting_source();
            let a = fetch_selected(&mut grouped, "x", &selector, ratio);
            let b = fetch(&mut whole, "x", None).unwrap().select(&selector);
            match (a, b) {
                (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
                (Err(FieldError::ShapeMismatch { .. }), Err(FieldError::ShapeMismatch { .. })) => {}
                (a, b) => prop_assert!(false, "grouped {:?} but whole {:?}", a, b),
            }
        }
    }
}
