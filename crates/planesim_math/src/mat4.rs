//! 4x4 matrix utilities
//!
//! Matrices are stored row-major and used in the row-vector convention:
//! a point is transformed as `p' = p * M`, translation lives in row 3, and a
//! chain `mul(mul(world, view), projection)` applies `world` first.
//! Camera helpers are left-handed with a `[0, 1]` depth range.

use crate::Vec3;

/// 4x4 matrix type (row-major)
pub type Mat4 = [[f32; 4]; 4];

/// Identity matrix
pub const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Multiply two 4x4 matrices: result = a * b
///
/// In the row-vector convention this applies `a` first, then `b`.
#[allow(clippy::needless_range_loop)]
pub fn mul(a: Mat4, b: Mat4) -> Mat4 {
    let mut result = [[0.0f32; 4]; 4];

    for i in 0..4 {
        for j in 0..4 {
            for k in 0..4 {
                result[i][j] += a[i][k] * b[k][j];
            }
        }
    }

    result
}

/// Transpose a matrix
///
/// Used to turn a row-major matrix into the column-major layout GPU programs
/// expect before it is copied into a constant buffer.
pub fn transpose(m: Mat4) -> Mat4 {
    [
        [m[0][0], m[1][0], m[2][0], m[3][0]],
        [m[0][1], m[1][1], m[2][1], m[3][1]],
        [m[0][2], m[1][2], m[2][2], m[3][2]],
        [m[0][3], m[1][3], m[2][3], m[3][3]],
    ]
}

/// Transform a point (w = 1) and apply the perspective divide
pub fn transform_point(m: Mat4, p: Vec3) -> Vec3 {
    let x = p.x * m[0][0] + p.y * m[1][0] + p.z * m[2][0] + m[3][0];
    let y = p.x * m[0][1] + p.y * m[1][1] + p.z * m[2][1] + m[3][1];
    let z = p.x * m[0][2] + p.y * m[1][2] + p.z * m[2][2] + m[3][2];
    let w = p.x * m[0][3] + p.y * m[1][3] + p.z * m[2][3] + m[3][3];
    if w != 0.0 && w != 1.0 {
        Vec3::new(x / w, y / w, z / w)
    } else {
        Vec3::new(x, y, z)
    }
}

/// Translation matrix
pub fn translation(t: Vec3) -> Mat4 {
    let mut m = IDENTITY;
    m[3][0] = t.x;
    m[3][1] = t.y;
    m[3][2] = t.z;
    m
}

/// Non-uniform scaling matrix
pub fn scaling(s: Vec3) -> Mat4 {
    let mut m = IDENTITY;
    m[0][0] = s.x;
    m[1][1] = s.y;
    m[2][2] = s.z;
    m
}

/// Rotation about the Y axis (heading), left-handed
pub fn rotation_y(angle: f32) -> Mat4 {
    let (sn, cs) = angle.sin_cos();
    [
        [cs, 0.0, -sn, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [sn, 0.0, cs, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// Left-handed look-at view matrix
pub fn look_at_lh(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    let z = (target - eye).normalized();
    let x = up.cross(z).normalized();
    let y = z.cross(x);

    [
        [x.x, y.x, z.x, 0.0],
        [x.y, y.y, z.y, 0.0],
        [x.z, y.z, z.z, 0.0],
        [-x.dot(eye), -y.dot(eye), -z.dot(eye), 1.0],
    ]
}

/// Left-handed perspective projection with a `[0, 1]` depth range
///
/// # Arguments
/// * `fov_y` - Vertical field of view in radians
/// * `aspect` - Width / height
/// * `near`, `far` - Clip plane distances (`0 < near < far`)
pub fn perspective_fov_lh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let y_scale = 1.0 / (fov_y / 2.0).tan();
    let x_scale = y_scale / aspect;
    let range = far / (far - near);

    [
        [x_scale, 0.0, 0.0, 0.0],
        [0.0, y_scale, 0.0, 0.0],
        [0.0, 0.0, range, 1.0],
        [0.0, 0.0, -near * range, 0.0],
    ]
}

/// Mirror about the horizontal plane `y = height`
///
/// Composed in front of a view matrix this gives the view used for planar
/// reflections: `mul(reflection_y(h), view)`.
pub fn reflection_y(height: f32) -> Mat4 {
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, -1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 2.0 * height, 0.0, 1.0],
    ]
}
