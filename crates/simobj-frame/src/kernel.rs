//! In-place coordinate operations on [`Value`]s with 3-vector rows.

use simobj_core::{wrap_periodic, FieldError, Value};

use crate::op::{Matrix3, Offset};

fn ensure_vectors(value: &Value) -> Result<(), FieldError> {
    if value.is_scalar() || value.row_width() != 3 {
        return Err(FieldError::ShapeMismatch {
            reason: format!(
                "coordinate transforms need 3-vector rows, got shape {:?}",
                value.shape()
            ),
        });
    }
    Ok(())
}

/// Add `offset` to every row. Units must match.
pub fn translate(value: &mut Value, offset: &Offset) -> Result<(), FieldError> {
    value.unit().ensure_matches(&offset.unit)?;
    ensure_vectors(value)?;
    for row in value.data_mut().chunks_exact_mut(3) {
        for (x, d) in row.iter_mut().zip(offset.vector) {
            *x += d;
        }
    }
    Ok(())
}

/// Replace every row `v` with `matrix · v`.
pub fn rotate(value: &mut Value, matrix: &Matrix3) -> Result<(), FieldError> {
    ensure_vectors(value)?;
    for row in value.data_mut().chunks_exact_mut(3) {
        let v = [row[0], row[1], row[2]];
        for (out, m) in row.iter_mut().zip(matrix) {
            *out = m[0] * v[0] + m[1] * v[1] + m[2] * v[2];
        }
    }
    Ok(())
}

/// Wrap every component into `(-L/2, L/2]`, with `L` read from the
/// one-element `box_length`. Units must match.
pub fn box_wrap(value: &mut Value, box_length: &Value) -> Result<(), FieldError> {
    value.unit().ensure_matches(box_length.unit())?;
    let length = box_length
        .as_scalar()
        .ok_or_else(|| FieldError::ShapeMismatch {
            reason: format!("box length must hold one element, got shape {:?}", box_length.shape()),
        })?;
    for x in value.data_mut() {
        *x = wrap_periodic(*x, length);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::IDENTITY;

    #[test]
    fn translate_checks_unit() {
        let mut v = Value::vectors(&[[1.0, 2.0, 3.0]], "kpc");
        let err = translate(&mut v, &Offset::new([1.0; 3], "km/s")).unwrap_err();
        assert!(matches!(err, FieldError::UnitMismatch { .. }));
        assert_eq!(v.data(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn translate_adds_to_each_row() {
        let mut v = Value::vectors(&[[1.0, 2.0, 3.0], [0.0, 0.0, 0.0]], "kpc");
        translate(&mut v, &Offset::new([1.0, -1.0, 0.5], "kpc")).unwrap();
        assert_eq!(v.data(), &[2.0, 1.0, 3.5, 1.0, -1.0, 0.5]);
    }

    #[test]
    fn rotate_quarter_turn_about_z() {
        let m = [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        let mut v = Value::vectors(&[[1.0, 0.0, 2.0]], "kpc");
        rotate(&mut v, &m).unwrap();
        assert_eq!(v.data(), &[0.0, 1.0, 2.0]);
        rotate(&mut v, &IDENTITY).unwrap();
        assert_eq!(v.data(), &[0.0, 1.0, 2.0]);
    }

    #[test]
    fn rotate_rejects_columns() {
        let mut v = Value::column(vec![1.0, 2.0], "Msun");
        assert!(matches!(
            rotate(&mut v, &IDENTITY),
            Err(FieldError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn box_wrap_into_half_open_interval() {
        let mut v = Value::vectors(&[[6.0, -5.0, 5.0]], "kpc");
        box_wrap(&mut v, &Value::scalar(10.0, "kpc")).unwrap();
        assert_eq!(v.data(), &[-4.0, 5.0, 5.0]);
    }

    #[test]
    fn box_wrap_needs_scalar_in_same_unit() {
        let mut v = Value::vectors(&[[6.0, 0.0, 0.0]], "kpc");
        assert!(box_wrap(&mut v, &Value::scalar(10.0, "Mpc")).is_err());
        assert!(box_wrap(&mut v, &Value::column(vec![10.0, 20.0], "kpc")).is_err());
    }
}
