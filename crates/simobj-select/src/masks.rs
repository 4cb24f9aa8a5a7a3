//! Reusable mask function builders.
//!
//! These know nothing about any particular snapshot format; they are
//! parameterised by field and identifier-component names so a
//! per-simulation configuration can wire them to its own catalogue.

use simobj_core::{wrap_periodic, FieldError, Param, Selector, Value};

use crate::registry::MaskSpec;

/// A mask that keeps every row.
pub fn null_mask() -> MaskSpec {
    MaskSpec::fixed(Selector::None)
}

/// Keep rows where the column `field` equals the object identifier's
/// integer component `component`.
pub fn field_equals(field: &str, component: &str) -> MaskSpec {
    fields_equal(&[(field, component)])
}

/// Keep rows where every `(field, component)` pair matches.
///
/// Each field must be a column of the same length.
pub fn fields_equal(pairs: &[(&str, &str)]) -> MaskSpec {
    let uses: Vec<&str> = pairs.iter().map(|&(f, _)| f).collect();
    let pairs: Vec<(String, String)> = pairs
        .iter()
        .map(|(f, c)| (f.to_string(), c.to_string()))
        .collect();
    MaskSpec::new(move |ctx| {
        let mut mask: Option<Vec<bool>> = None;
        for (field, component) in &pairs {
            let target = ctx.object_int(component)? as f64;
            let column = ctx.val(field)?;
            if column.row_width() != 1 || column.is_scalar() {
                return Err(FieldError::ShapeMismatch {
                    reason: format!("'{field}' is not a column"),
                });
            }
            let hits = column.data().iter().map(|&x| x == target);
            mask = Some(match mask {
                None => hits.collect(),
                Some(prev) if prev.len() == column.rows() => {
                    prev.into_iter().zip(hits).map(|(a, b)| a && b).collect()
                }
                Some(prev) => {
                    return Err(FieldError::ShapeMismatch {
                        reason: format!(
                            "'{field}' has {} rows, earlier fields have {}",
                            column.rows(),
                            prev.len()
                        ),
                    })
                }
            });
        }
        Ok(Selector::BoolArray(mask.unwrap_or_default()))
    })
    .uses(&uses)
}

/// Select the contiguous rows `[offset, offset + count)`, reading the
/// offset and count from the first row of two group-catalogue fields after
/// applying the `group_keytype` selector.
pub fn index_range(offset_field: &str, count_field: &str, group_keytype: &str) -> MaskSpec {
    let offset_field = offset_field.to_string();
    let count_field = count_field.to_string();
    let group_keytype = group_keytype.to_string();
    MaskSpec::new(move |ctx| {
        let group = ctx.selector(&group_keytype)?;
        let offset = first_index(&ctx.raw(&offset_field)?.select(&group)?, &offset_field)?;
        let count = first_index(&ctx.raw(&count_field)?.select(&group)?, &count_field)?;
        Ok(Selector::Range {
            start: offset,
            end: offset + count,
        })
    })
}

fn first_index(value: &Value, name: &str) -> Result<usize, FieldError> {
    let first = value
        .data()
        .first()
        .copied()
        .ok_or_else(|| FieldError::MaskFailed {
            reason: format!("'{name}' has no row for this object"),
        })?;
    if !first.is_finite() || first < 0.0 || first.fract() != 0.0 {
        return Err(FieldError::MaskFailed {
            reason: format!("'{name}' holds {first}, not a row index"),
        });
    }
    Ok(first as usize)
}

/// Keep positions within a sphere around the object's centre.
///
/// The centre is the first row of `centre_field` under its own keytype's
/// selector. Separations are wrapped with the periodic box length read
/// from the scalar `box_field`. The radius is the keyword mask argument
/// `radius_kwarg`; a quantity must carry the positions' unit.
///
/// Rows inside the inscribed cube of the sphere are accepted without
/// computing a distance.
pub fn aperture(
    position_field: &str,
    centre_field: &str,
    box_field: &str,
    radius_kwarg: &str,
) -> MaskSpec {
    let position_field = position_field.to_string();
    let centre_field = centre_field.to_string();
    let box_field = box_field.to_string();
    let radius_kwarg = radius_kwarg.to_string();
    let uses = [position_field.clone(), box_field.clone()];
    MaskSpec::new(move |ctx| {
        let centre = ctx.masked(&centre_field)?;
        if centre.rows() == 0 || centre.row_width() != 3 {
            return Err(FieldError::MaskFailed {
                reason: format!("'{centre_field}' has no 3-vector for this object"),
            });
        }
        let c = centre.row(0);

        let radius = ctx
            .kwarg(&radius_kwarg)
            .cloned()
            .ok_or_else(|| FieldError::MaskFailed {
                reason: format!("mask argument '{radius_kwarg}' missing"),
            })?;
        let positions = ctx.val(&position_field)?;
        positions.unit().ensure_matches(centre.unit())?;
        if let Param::Quantity { unit, .. } = &radius {
            positions.unit().ensure_matches(unit)?;
        }
        let r = radius.as_f64().ok_or_else(|| FieldError::MaskFailed {
            reason: format!("mask argument '{radius_kwarg}' is not numeric"),
        })?;

        let lbox = ctx.val(&box_field)?;
        positions.unit().ensure_matches(lbox.unit())?;
        let length = lbox.as_scalar().ok_or_else(|| FieldError::ShapeMismatch {
            reason: format!("'{box_field}' is not a scalar"),
        })?;

        if positions.row_width() != 3 {
            return Err(FieldError::ShapeMismatch {
                reason: format!("'{position_field}' rows are not 3-vectors"),
            });
        }
        let inner = r / 3f64.sqrt();
        let mask = (0..positions.rows())
            .map(|i| {
                let d: Vec<f64> = positions
                    .row(i)
                    .iter()
                    .zip(c)
                    .map(|(x, c)| wrap_periodic(x - c, length))
                    .collect();
                if d.iter().any(|v| v.abs() >= r) {
                    false
                } else if d.iter().all(|v| v.abs() < inner) {
                    true
                } else {
                    d.iter().map(|v| v * v).sum::<f64>() < r * r
                }
            })
            .collect();
        Ok(Selector::BoolArray(mask))
    })
    .uses(&[uses[0].as_str(), uses[1].as_str()])
}
