//! The ordered log of transforms applied to an object.

use simobj_core::{CoordClass, FieldError, Value};

use crate::kernel;
use crate::op::{Matrix3, TransformOp};

/// Append-only record of translations and rotations.
///
/// The only removal is [`pop_rotation`](Self::pop_rotation), which undoes
/// a trailing rotation. [`replay`](Self::replay) applies every entry to a
/// freshly loaded field, op by op, so it lands in the same frame as fields
/// that were present when the transforms were first applied.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransformStack {
    ops: Vec<TransformOp>,
}

impl TransformStack {
    /// An empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// A stack holding `ops`, oldest first.
    pub fn from_ops(ops: Vec<TransformOp>) -> Self {
        Self { ops }
    }

    /// Entries, oldest first.
    pub fn ops(&self) -> &[TransformOp] {
        &self.ops
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` if nothing has been applied.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Append an entry.
    pub fn push(&mut self, op: TransformOp) {
        self.ops.push(op);
    }

    /// Remove the last entry if it is a rotation and return its matrix.
    ///
    /// Fails with [`FieldError::NotARotation`] otherwise, leaving the
    /// stack unchanged.
    pub fn pop_rotation(&mut self) -> Result<Matrix3, FieldError> {
        match self.ops.last() {
            Some(TransformOp::Rotate { matrix }) => {
                let matrix = *matrix;
                self.ops.pop();
                Ok(matrix)
            }
            _ => Err(FieldError::NotARotation),
        }
    }

    /// Apply every entry to `value`, a field of coordinate class `class`.
    ///
    /// Translations apply only when their class matches; rotations always
    /// apply.
    pub fn replay(&self, value: &mut Value, class: CoordClass) -> Result<(), FieldError> {
        for op in &self.ops {
            apply_op(op, value, class)?;
        }
        Ok(())
    }
}

/// Apply one entry to a field of coordinate class `class`.
pub fn apply_op(op: &TransformOp, value: &mut Value, class: CoordClass) -> Result<(), FieldError> {
    match op {
        TransformOp::Translate { class: c, offset } if *c == class => kernel::translate(value, offset),
        TransformOp::Translate { .. } => Ok(()),
        TransformOp::Rotate { matrix } => kernel::rotate(value, matrix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::Offset;
    use crate::rotation::{axis_angle, transpose};
    use proptest::prelude::*;

    fn close(a: &[f64], b: &[f64], tol: f64) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= tol)
    }

    #[test]
    fn pop_rotation_requires_trailing_rotate() {
        let mut stack = TransformStack::new();
        stack.push(TransformOp::Rotate { matrix: crate::rotation::IDENTITY });
        stack.push(TransformOp::Translate {
            class: CoordClass::Position,
            offset: Offset::new([1.0, 0.0, 0.0], "kpc"),
        });
        let before = stack.clone();
        assert_eq!(stack.pop_rotation(), Err(FieldError::NotARotation));
        assert_eq!(stack, before);
        assert_eq!(TransformStack::new().pop_rotation(), Err(FieldError::NotARotation));
    }

    #[test]
    fn replay_skips_other_class_translations() {
        let mut stack = TransformStack::new();
        stack.push(TransformOp::Translate {
            class: CoordClass::Velocity,
            offset: Offset::new([100.0, 0.0, 0.0], "km/s"),
        });
        stack.push(TransformOp::Translate {
            class: CoordClass::Position,
            offset: Offset::new([1.0, 2.0, 3.0], "kpc"),
        });
        let mut pos = Value::vectors(&[[0.0, 0.0, 0.0]], "kpc");
        stack.replay(&mut pos, CoordClass::Position).unwrap();
        assert_eq!(pos.data(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn replay_is_order_sensitive() {
        let quarter = axis_angle([0.0, 0.0, 1.0], std::f64::consts::FRAC_PI_2).unwrap();
        let shift = TransformOp::Translate {
            class: CoordClass::Position,
            offset: Offset::new([1.0, 0.0, 0.0], "kpc"),
        };
        let a = TransformStack::from_ops(vec![shift.clone(), TransformOp::Rotate { matrix: quarter }]);
        let b = TransformStack::from_ops(vec![TransformOp::Rotate { matrix: quarter }, shift]);
        let mut va = Value::vectors(&[[0.0, 0.0, 0.0]], "kpc");
        let mut vb = va.clone();
        a.replay(&mut va, CoordClass::Position).unwrap();
        b.replay(&mut vb, CoordClass::Position).unwrap();
        assert!(close(va.data(), &[0.0, 1.0, 0.0], 1e-12));
        assert!(close(vb.data(), &[1.0, 0.0, 0.0], 1e-12));
    }

    proptest! {
        #[test]
        fn rotate_then_transpose_restores(
            rows in prop::collection::vec(prop::array::uniform3(-100.0f64..100.0), 1..20),
            axis in prop::array::uniform3(-1.0f64..1.0),
            angle in -6.3f64..6.3,
        ) {
            prop_assume!(axis.iter().map(|x| x * x).sum::<f64>() > 1e-6);
            let m = axis_angle(axis, angle).unwrap();
            let original = Value::vectors(&rows, "kpc");
            let mut v = original.clone();
            kernel::rotate(&mut v, &m).unwrap();
            kernel::rotate(&mut v, &transpose(&m)).unwrap();
            prop_assert!(close(v.data(), original.data(), 1e-9));
        }

        #[test]
        fn translate_then_negate_restores(
            rows in prop::collection::vec(prop::array::uniform3(-100.0f64..100.0), 1..20),
            d in prop::array::uniform3(-50.0f64..50.0),
        ) {
            let offset = Offset::new(d, "kpc");
            let original = Value::vectors(&rows, "kpc");
            let mut v = original.clone();
            kernel::translate(&mut v, &offset).unwrap();
            kernel::translate(&mut v, &offset.negated()).unwrap();
            prop_assert!(close(v.data(), original.data(), 1e-9));
        }
    }
}
