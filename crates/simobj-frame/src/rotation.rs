//! Building rotation matrices.

use simobj_core::{FieldError, Value};

use crate::op::Matrix3;

/// The identity matrix.
pub const IDENTITY: Matrix3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Transpose, which inverts an orthonormal matrix.
pub fn transpose(m: &Matrix3) -> Matrix3 {
    let mut t = [[0.0; 3]; 3];
    for (i, row) in m.iter().enumerate() {
        for (j, &x) in row.iter().enumerate() {
            t[j][i] = x;
        }
    }
    t
}

/// Matrix product `a · b`.
pub fn matmul(a: &Matrix3, b: &Matrix3) -> Matrix3 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, x) in row.iter_mut().enumerate() {
            *x = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

/// Whether `m · mᵀ` is within `tol` of the identity, element-wise.
pub fn is_orthonormal(m: &Matrix3, tol: f64) -> bool {
    let p = matmul(m, &transpose(m));
    p.iter()
        .zip(IDENTITY.iter())
        .all(|(r, e)| r.iter().zip(e).all(|(a, b)| (a - b).abs() <= tol))
}

fn norm(v: [f64; 3]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn unit_vector(v: [f64; 3], what: &str) -> Result<[f64; 3], FieldError> {
    let n = norm(v);
    if !n.is_finite() || n == 0.0 {
        return Err(FieldError::InvalidTransform {
            reason: format!("{what} has zero or non-finite length"),
        });
    }
    Ok(v.map(|x| x / n))
}

/// Right-handed rotation by `angle` radians about `axis` (Rodrigues).
pub fn axis_angle(axis: [f64; 3], angle: f64) -> Result<Matrix3, FieldError> {
    if !angle.is_finite() {
        return Err(FieldError::InvalidTransform {
            reason: format!("rotation angle {angle} is not finite"),
        });
    }
    let [x, y, z] = unit_vector(axis, "rotation axis")?;
    let (s, c) = angle.sin_cos();
    let t = 1.0 - c;
    Ok([
        [c + x * x * t, x * y * t - z * s, x * z * t + y * s],
        [y * x * t + z * s, c + y * y * t, y * z * t - x * s],
        [z * x * t - y * s, z * y * t + x * s, c + z * z * t],
    ])
}

/// The rotation taking direction `v` onto `+z`.
pub fn align_with_z(v: [f64; 3]) -> Result<Matrix3, FieldError> {
    let u = unit_vector(v, "alignment vector")?;
    if u[2] < 0.0 {
        // Half turn about x first keeps the remaining angle below 90°.
        let flip = [[1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, -1.0]];
        return Ok(matmul(&align_upper(&[u[0], -u[1], -u[2]]), &flip));
    }
    Ok(align_upper(&u))
}

/// `I + K + K²/(1 + cos)` with `K` the cross-product matrix of `u × z`.
/// Requires a unit `u` with non-negative z.
fn align_upper(u: &[f64; 3]) -> Matrix3 {
    let [kx, ky, kz] = cross(*u, [0.0, 0.0, 1.0]);
    let k = [[0.0, -kz, ky], [kz, 0.0, -kx], [-ky, kx, 0.0]];
    let k2 = matmul(&k, &k);
    let f = 1.0 / (1.0 + u[2]);
    let mut out = IDENTITY;
    for (row, (kr, k2r)) in out.iter_mut().zip(k.iter().zip(&k2)) {
        for (x, (a, b)) in row.iter_mut().zip(kr.iter().zip(k2r)) {
            *x += a + b * f;
        }
    }
    out
}

/// Total angular momentum `Σ m (r × v)` of the innermost particles holding
/// `fraction` of the total mass.
///
/// Particles are ranked by `|r|`; the particle whose mass crosses the
/// threshold is included.
pub fn angular_momentum(
    positions: &Value,
    velocities: &Value,
    masses: &Value,
    fraction: f64,
) -> Result<[f64; 3], FieldError> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(FieldError::InvalidTransform {
            reason: format!("mass fraction {fraction} outside (0, 1]"),
        });
    }
    let n = positions.rows();
    if positions.row_width() != 3 || velocities.row_width() != 3 || positions.is_scalar() {
        return Err(FieldError::ShapeMismatch {
            reason: "positions and velocities need 3-vector rows".into(),
        });
    }
    if velocities.rows() != n || masses.data().len() != n {
        return Err(FieldError::ShapeMismatch {
            reason: format!(
                "{n} positions, {} velocities, {} masses",
                velocities.rows(),
                masses.data().len()
            ),
        });
    }

    let radius = |i: usize| {
        let r = positions.row(i);
        r[0] * r[0] + r[1] * r[1] + r[2] * r[2]
    };
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| radius(a).total_cmp(&radius(b)));

    let total: f64 = masses.data().iter().sum();
    let threshold = fraction * total;
    let mut enclosed = 0.0;
    let mut l = [0.0; 3];
    for i in order {
        if enclosed >= threshold {
            break;
        }
        let m = masses.data()[i];
        let r = positions.row(i);
        let v = velocities.row(i);
        let rxv = cross([r[0], r[1], r[2]], [v[0], v[1], v[2]]);
        for (acc, c) in l.iter_mut().zip(rxv) {
            *acc += m * c;
        }
        enclosed += m;
    }
    Ok(l)
}
