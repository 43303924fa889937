//! View and projection matrix construction.
//!
//! Pure functions shared by [`Camera`](crate::Camera) and anything that
//! assembles views by hand. Both builders return matrices in the math
//! (column-vector) convention, v' = M · v; the camera transposes them into
//! the row-vector layout the rasterizer consumes.

use nalgebra::{Matrix3, Matrix4, Vector3};

/// Build the world-to-view transform for a calibrated pose.
///
/// `rotation` maps world directions into camera space and `translation` is
/// the translation of that same map, so the raw rigid transform is:
///
/// Rt = | R  t |
///      | 0  1 |
///
/// The camera center C = -Rᵀ·t is pulled out of the inverse, shifted by
/// `offset` and scaled by `scale` (both act in world space, letting a whole
/// capture rig be re-centered and rescaled consistently), and the adjusted
/// transform is re-inverted:
///
/// view = | R  -R·C' |        C' = (C + offset) · scale
///        | 0    1   |
///
/// R is orthonormal, so the inverses are closed-form and this never fails.
pub fn world_to_view(
    rotation: &Matrix3<f32>,
    translation: &Vector3<f32>,
    offset: &Vector3<f32>,
    scale: f32,
) -> Matrix4<f32> {
    let center = (-(rotation.transpose() * translation) + offset) * scale;
    let view_translation = -(rotation * center);

    let mut view = Matrix4::identity();
    view.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation);
    view.fixed_view_mut::<3, 1>(0, 3).copy_from(&view_translation);
    view
}

/// Build a symmetric perspective projection from full field-of-view angles
/// (radians).
///
/// The camera looks down +Z and depth maps [znear, zfar] → [0, 1] (the
/// wgpu/Vulkan convention the rasterizer expects). With tx = tan(fov_x/2)
/// and ty = tan(fov_y/2):
///
/// P = | 1/tx   0      0             0              |
///     | 0      1/ty   0             0              |
///     | 0      0      f/(f-n)      -f·n/(f-n)      |
///     | 0      0      1             0              |
///
/// The w row keeps +Z so points in front of the camera divide by positive
/// depth.
pub fn perspective_projection(znear: f32, zfar: f32, fov_x: f32, fov_y: f32) -> Matrix4<f32> {
    let tan_half_x = (fov_x * 0.5).tan();
    let tan_half_y = (fov_y * 0.5).tan();

    let mut proj = Matrix4::zeros();
    proj[(0, 0)] = 1.0 / tan_half_x;
    proj[(1, 1)] = 1.0 / tan_half_y;
    proj[(2, 2)] = zfar / (zfar - znear);
    proj[(2, 3)] = -(zfar * znear) / (zfar - znear);
    proj[(3, 2)] = 1.0;
    proj
}

/// Focal length in pixels for a full field-of-view angle spanning `pixels`.
///
/// focal = pixels / (2·tan(fov/2))
pub fn fov_to_focal(fov: f32, pixels: u32) -> f32 {
    pixels as f32 / (2.0 * (fov * 0.5).tan())
}

/// Full field-of-view angle (radians) for a focal length in pixels.
///
/// fov = 2·atan(pixels / (2·focal))
pub fn focal_to_fov(focal: f32, pixels: u32) -> f32 {
    2.0 * (pixels as f32 / (2.0 * focal)).atan()
}
