//! Unit-tagged n-dimensional arrays.
//!
//! A [`Value`] is a row-major `f64` buffer with a [`Shape`] and a [`Unit`].
//! Axis 0 is the primary axis: selectors pick rows along it, partial loads
//! restrict it, and chunked fetches concatenate along it.

use std::fmt;

use smallvec::SmallVec;

use crate::error::FieldError;
use crate::selector::{Interval, Selector};

/// Array dimensions. Inline for up to 4 axes.
pub type Shape = SmallVec<[usize; 4]>;

/// A physical unit, compared by name.
///
/// The empty name is dimensionless. No conversion is ever performed:
/// operations between values whose units differ fail with
/// [`FieldError::UnitMismatch`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Unit(String);

impl Unit {
    /// A named unit.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The dimensionless unit.
    pub fn dimensionless() -> Self {
        Self(String::new())
    }

    /// The unit name (`""` when dimensionless).
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the dimensionless unit.
    pub fn is_dimensionless(&self) -> bool {
        self.0.is_empty()
    }

    /// Fail with [`FieldError::UnitMismatch`] unless `other` equals `self`.
    pub fn ensure_matches(&self, other: &Unit) -> Result<(), FieldError> {
        if self == other {
            Ok(())
        } else {
            Err(FieldError::UnitMismatch {
                expected: self.clone(),
                found: other.clone(),
            })
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "dimensionless")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for Unit {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Unit {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Wrap one coordinate component into `(-length/2, length/2]`.
///
/// Assumes `x` is within one box length of the interval, which holds for
/// differences of two in-box coordinates.
pub fn wrap_periodic(x: f64, length: f64) -> f64 {
    let half = length / 2.0;
    if x > half {
        x - length
    } else if x <= -half {
        x + length
    } else {
        x
    }
}

/// An n-dimensional numeric array tagged with a physical unit.
///
/// # Examples
///
/// ```
/// use simobj_core::{Selector, Value};
///
/// let v = Value::column((0..10).map(f64::from).collect(), "kpc");
/// let picked = v.select(&Selector::Range { start: 2, end: 5 }).unwrap();
/// assert_eq!(picked.data(), &[2.0, 3.0, 4.0]);
/// assert_eq!(picked.unit().name(), "kpc");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Value {
    data: Vec<f64>,
    shape: Shape,
    unit: Unit,
}

impl Value {
    /// Build a value, checking that `data.len()` equals the product of `shape`.
    pub fn new(data: Vec<f64>, shape: &[usize], unit: impl Into<Unit>) -> Result<Self, FieldError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(FieldError::ShapeMismatch {
                reason: format!(
                    "shape {shape:?} needs {expected} elements, got {}",
                    data.len()
                ),
            });
        }
        Ok(Self {
            data,
            shape: Shape::from_slice(shape),
            unit: unit.into(),
        })
    }

    /// A one-dimensional value.
    pub fn column(data: Vec<f64>, unit: impl Into<Unit>) -> Self {
        let n = data.len();
        Self {
            data,
            shape: smallvec::smallvec![n],
            unit: unit.into(),
        }
    }

    /// An `(n, 3)` value built from 3-vectors.
    pub fn vectors(rows: &[[f64; 3]], unit: impl Into<Unit>) -> Self {
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Self {
            data,
            shape: smallvec::smallvec![rows.len(), 3],
            unit: unit.into(),
        }
    }

    /// A zero-dimensional value.
    pub fn scalar(v: f64, unit: impl Into<Unit>) -> Self {
        Self {
            data: vec![v],
            shape: Shape::new(),
            unit: unit.into(),
        }
    }

    /// An empty value with zero rows and the given trailing dimensions.
    pub fn empty(row_shape: &[usize], unit: impl Into<Unit>) -> Self {
        let mut shape = Shape::with_capacity(row_shape.len() + 1);
        shape.push(0);
        shape.extend_from_slice(row_shape);
        Self {
            data: Vec::new(),
            shape,
            unit: unit.into(),
        }
    }

    /// Flat row-major data.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable flat row-major data.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Dimensions.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Physical unit.
    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// Number of rows along the primary axis (1 for a scalar).
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    /// Elements per row (product of the trailing dimensions).
    pub fn row_width(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    /// Trailing dimensions (everything but axis 0).
    pub fn row_shape(&self) -> &[usize] {
        self.shape.get(1..).unwrap_or(&[])
    }

    /// Returns `true` if the value holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` for a zero-dimensional value.
    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    /// The single element of a one-element value.
    pub fn as_scalar(&self) -> Option<f64> {
        (self.data.len() == 1).then(|| self.data[0])
    }

    /// Row `i` as a slice.
    pub fn row(&self, i: usize) -> &[f64] {
        let w = self.row_width();
        &self.data[i * w..(i + 1) * w]
    }

    /// Consume into `(data, shape, unit)`.
    pub fn into_parts(self) -> (Vec<f64>, Shape, Unit) {
        (self.data, self.shape, self.unit)
    }

    /// Apply a selector along the primary axis.
    ///
    /// Fails with [`FieldError::ShapeMismatch`] if the selector does not
    /// fit this value's row count.
    pub fn select(&self, selector: &Selector) -> Result<Value, FieldError> {
        if selector.is_none() {
            return Ok(self.clone());
        }
        if self.is_scalar() {
            return Err(FieldError::ShapeMismatch {
                reason: format!("cannot apply selector {selector} to a scalar"),
            });
        }
        let rows = self.rows();
        if selector.selected_len(rows).is_none() {
            return Err(FieldError::ShapeMismatch {
                reason: format!("selector {selector} does not fit {rows} rows"),
            });
        }
        Ok(match selector {
            Selector::None => self.clone(),
            Selector::Range { start, end } => self.take_rows(*start..*end),
            Selector::BoolArray(mask) => {
                self.take_rows(mask.iter().enumerate().filter(|&(_, &b)| b).map(|(i, _)| i))
            }
            Selector::IndexSet(idx) => self.take_rows(idx.iter().copied()),
        })
    }

    /// Rows in `interval`, checked against the row count.
    pub fn slice_rows(&self, interval: Interval) -> Result<Value, FieldError> {
        if interval.end > self.rows() || self.is_scalar() {
            return Err(FieldError::ShapeMismatch {
                reason: format!("interval {interval} outside {} rows", self.rows()),
            });
        }
        Ok(self.take_rows(interval.as_range()))
    }

    fn take_rows(&self, rows: impl IntoIterator<Item = usize>) -> Value {
        let w = self.row_width();
        let mut data = Vec::new();
        let mut n = 0;
        for i in rows {
            data.extend_from_slice(&self.data[i * w..(i + 1) * w]);
            n += 1;
        }
        let mut shape = self.shape.clone();
        shape[0] = n;
        Value {
            data,
            shape,
            unit: self.unit.clone(),
        }
    }

    /// Concatenate chunks along the primary axis.
    ///
    /// The result takes the unit of the first non-empty chunk; if every
    /// chunk is empty, the first chunk's unit and row shape are kept. All
    /// non-empty chunks must agree on unit and row shape.
    pub fn concat(chunks: Vec<Value>) -> Result<Value, FieldError> {
        let template = chunks
            .iter()
            .find(|c| !c.is_empty())
            .or_else(|| chunks.first())
            .ok_or_else(|| FieldError::ShapeMismatch {
                reason: "cannot concatenate zero chunks".into(),
            })?;
        let unit = template.unit.clone();
        let mut shape = template.shape.clone();
        if shape.is_empty() {
            return Err(FieldError::ShapeMismatch {
                reason: "cannot concatenate scalars".into(),
            });
        }
        let row_shape: Shape = Shape::from_slice(template.row_shape());

        let mut data = Vec::new();
        let mut rows = 0;
        for chunk in chunks.into_iter().filter(|c| !c.is_empty()) {
            unit.ensure_matches(&chunk.unit)?;
            if chunk.row_shape() != row_shape.as_slice() {
                return Err(FieldError::ShapeMismatch {
                    reason: format!(
                        "chunk row shape {:?} differs from {:?}",
                        chunk.row_shape(),
                        row_shape
                    ),
                });
            }
            rows += chunk.rows();
            data.extend(chunk.data);
        }
        shape[0] = rows;
        Ok(Value { data, shape, unit })
    }

    /// Subtract one row-shaped `centre` from every row.
    ///
    /// `centre` must have the same unit and hold exactly
    /// [`row_width`](Self::row_width) elements.
    pub fn subtract_row(&mut self, centre: &Value) -> Result<(), FieldError> {
        self.unit.ensure_matches(&centre.unit)?;
        let w = self.row_width();
        if centre.data.len() != w {
            return Err(FieldError::ShapeMismatch {
                reason: format!(
                    "centre has {} elements, rows have {w}",
                    centre.data.len()
                ),
            });
        }
        if w == 0 {
            return Ok(());
        }
        for row in self.data.chunks_exact_mut(w) {
            for (x, c) in row.iter_mut().zip(&centre.data) {
                *x -= c;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid(rows: usize) -> Value {
        let data: Vec<f64> = (0..rows * 3).map(|i| i as f64).collect();
        Value::new(data, &[rows, 3], "kpc").unwrap()
    }

    #[test]
    fn wrap_periodic_half_open_interval() {
        assert_eq!(wrap_periodic(6.0, 10.0), -4.0);
        assert_eq!(wrap_periodic(5.0, 10.0), 5.0);
        assert_eq!(wrap_periodic(-5.0, 10.0), 5.0);
        assert_eq!(wrap_periodic(-4.0, 10.0), -4.0);
    }

    #[test]
    fn new_rejects_wrong_element_count() {
        let err = Value::new(vec![1.0; 5], &[2, 3], "kpc").unwrap_err();
        assert!(matches!(err, FieldError::ShapeMismatch { .. }));
    }

    #[test]
    fn select_bool_array_keeps_marked_rows() {
        let v = grid(4);
        let out = v
            .select(&Selector::BoolArray(vec![false, true, false, true]))
            .unwrap();
        assert_eq!(out.shape(), &[2, 3]);
        assert_eq!(out.data(), &[3.0, 4.0, 5.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn select_index_set_preserves_order() {
        let v = Value::column(vec![10.0, 11.0, 12.0], "");
        let out = v.select(&Selector::IndexSet(vec![2, 0])).unwrap();
        assert_eq!(out.data(), &[12.0, 10.0]);
    }

    #[test]
    fn select_rejects_wrong_length_mask() {
        let v = grid(4);
        assert!(v.select(&Selector::BoolArray(vec![true; 3])).is_err());
        assert!(v.select(&Selector::Range { start: 1, end: 5 }).is_err());
    }

    #[test]
    fn select_none_on_scalar_is_identity() {
        let v = Value::scalar(100.0, "Mpc");
        assert_eq!(v.select(&Selector::None).unwrap(), v);
        assert!(v.select(&Selector::Range { start: 0, end: 1 }).is_err());
    }

    #[test]
    fn concat_all_empty_keeps_unit() {
        let a = Value::empty(&[3], "kpc");
        let b = Value::empty(&[3], "kpc");
        let out = Value::concat(vec![a, b]).unwrap();
        assert_eq!(out.shape(), &[0, 3]);
        assert_eq!(out.unit().name(), "kpc");
    }

    #[test]
    fn concat_takes_unit_of_first_non_empty_chunk() {
        let a = Value::empty(&[], "");
        let b = Value::column(vec![1.0, 2.0], "Msun");
        let out = Value::concat(vec![a, b]).unwrap();
        assert_eq!(out.unit().name(), "Msun");
        assert_eq!(out.data(), &[1.0, 2.0]);
    }

    #[test]
    fn concat_rejects_mixed_units() {
        let a = Value::column(vec![1.0], "kpc");
        let b = Value::column(vec![2.0], "km/s");
        assert!(matches!(
            Value::concat(vec![a, b]),
            Err(FieldError::UnitMismatch { .. })
        ));
    }

    #[test]
    fn subtract_row_checks_unit() {
        let mut v = grid(2);
        let centre = Value::new(vec![1.0, 1.0, 1.0], &[3], "km/s").unwrap();
        assert!(matches!(
            v.subtract_row(&centre),
            Err(FieldError::UnitMismatch { .. })
        ));
        let centre = Value::new(vec![1.0, 2.0, 3.0], &[1, 3], "kpc").unwrap();
        v.subtract_row(&centre).unwrap();
        assert_eq!(v.data(), &[-1.0, -1.0, -1.0, 2.0, 2.0, 2.0]);
    }

    proptest! {
        #[test]
        fn bool_select_len_matches_true_count(mask in prop::collection::vec(any::<bool>(), 0..64)) {
            let v = grid(mask.len());
            let kept = mask.iter().filter(|&&b| b).count();
            let out = v.select(&Selector::BoolArray(mask)).unwrap();
            prop_assert_eq!(out.rows(), kept);
            prop_assert_eq!(out.data().len(), kept * 3);
        }

        #[test]
        fn concat_of_slices_restores_value(rows in 1usize..40, cut in 0usize..40) {
            let v = grid(rows);
            let cut = cut.min(rows);
            let a = v.slice_rows(Interval::new(0, cut)).unwrap();
            let b = v.slice_rows(Interval::new(cut, rows)).unwrap();
            prop_assert_eq!(Value::concat(vec![a, b]).unwrap(), v);
        }
    }
}
