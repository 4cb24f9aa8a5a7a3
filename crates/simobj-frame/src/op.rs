//! Transform operations.

use std::fmt;

use simobj_core::{CoordClass, FieldError, Unit, Value};

/// A 3×3 matrix, row-major.
pub type Matrix3 = [[f64; 3]; 3];

/// A unit-tagged 3-vector used as a translation.
#[derive(Clone, Debug, PartialEq)]
pub struct Offset {
    /// Components.
    pub vector: [f64; 3],
    /// Unit of every component.
    pub unit: Unit,
}

impl Offset {
    /// Build an offset.
    pub fn new(vector: [f64; 3], unit: impl Into<Unit>) -> Self {
        Self {
            vector,
            unit: unit.into(),
        }
    }

    /// The first row of a value with 3-vector rows (or a bare 3-vector).
    pub fn from_value(value: &Value) -> Result<Self, FieldError> {
        let data = value.data();
        if data.len() < 3 || value.row_width() != 3 {
            return Err(FieldError::ShapeMismatch {
                reason: format!("expected a 3-vector, got shape {:?}", value.shape()),
            });
        }
        Ok(Self::new([data[0], data[1], data[2]], value.unit().clone()))
    }

    /// The opposite offset.
    pub fn negated(&self) -> Self {
        Self::new(self.vector.map(|x| -x), self.unit.clone())
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x, y, z] = self.vector;
        write!(f, "({x}, {y}, {z}) {}", self.unit)
    }
}

/// One entry of a [`TransformStack`](crate::TransformStack).
#[derive(Clone, Debug, PartialEq)]
pub enum TransformOp {
    /// Add `offset` to fields of coordinate class `class`.
    Translate {
        /// Coordinate class the offset applies to.
        class: CoordClass,
        /// The offset added to every row.
        offset: Offset,
    },
    /// Multiply every coordinate row by `matrix`.
    Rotate {
        /// The rotation matrix.
        matrix: Matrix3,
    },
}

impl TransformOp {
    /// Wire tag: 0 = translate, 1 = rotate.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Translate { .. } => 0,
            Self::Rotate { .. } => 1,
        }
    }
}
