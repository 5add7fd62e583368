use glam::{Mat4, Vec3};

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum MatrixError {
    #[error("matrix is singular")]
    Singular,

    #[error("matrix contains non-finite entries")]
    NonFinite,
}

/// Invert `m`, reporting singular or non-finite input instead of silently
/// producing garbage entries.
pub fn try_inverse(m: &Mat4) -> Result<Mat4, MatrixError> {
    if !m.is_finite() {
        return Err(MatrixError::NonFinite);
    }
    if m.determinant() == 0.0 {
        return Err(MatrixError::Singular);
    }

    let inverse = m.inverse();
    if !inverse.is_finite() {
        return Err(MatrixError::Singular);
    }

    Ok(inverse)
}

/// Transform `point` as a homogeneous position, dividing through by the
/// resulting w only when it differs from 1.
pub fn transform_point(m: &Mat4, point: Vec3) -> Vec3 {
    let v = *m * point.extend(1.0);
    if v.w != 1.0 {
        v.truncate() / v.w
    } else {
        v.truncate()
    }
}

/// Perspective projection into GL clip space.
pub fn perspective(fov_y_radians: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh_gl(fov_y_radians, aspect, near, far)
}

/// Orthographic projection into GL clip space.
pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    Mat4::orthographic_rh_gl(left, right, bottom, top, near, far)
}

/// Clip-space projection for scenes laid out in pixel coordinates: x grows
/// right, y grows down from the top-left corner, `depth` units of z.
pub fn screen_projection(width: f32, height: f32, depth: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(-1.0, 1.0, 0.0))
        * Mat4::from_scale(Vec3::new(2.0 / width, -2.0 / height, 2.0 / depth))
}

/// The transform that places a node at `eye` facing `target`. This is a
/// camera's world matrix, not a view matrix; invert it to get one.
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    let z_axis = (eye - target).normalize_or_zero();
    let x_axis = up.cross(z_axis).normalize_or_zero();
    let y_axis = z_axis.cross(x_axis).normalize_or_zero();

    Mat4::from_cols(
        x_axis.extend(0.0),
        y_axis.extend(0.0),
        z_axis.extend(0.0),
        eye.extend(1.0),
    )
}
