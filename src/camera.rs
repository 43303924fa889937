//! Calibrated camera views.
//!
//! A [`Camera`] owns everything the renderer reads for one captured view:
//! - the view/projection transforms, computed once from calibration
//! - the resolution pyramid of the observed image (and optional mask)
//! - the device placement tag
//!
//! A [`VirtualCamera`] is the reduced form for synthetic fly-through views
//! built from precomputed transforms, with no observed image behind it.
//!
//! Both store their matrices in the row-vector convention the rasterizer
//! consumes: transposed relative to [`crate::transforms`], composition
//! reads left to right, and the camera center sits in row 3 of the
//! inverted view transform.

use std::fmt;

use image::Rgb32FImage;
use log::warn;
use nalgebra::{Matrix3, Matrix4, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::device::Device;
use crate::pyramid::{clamp_unit, AlphaMask, ImagePyramid, PyramidError, PyramidLevel};
use crate::transforms::{perspective_projection, world_to_view};

/// Default near clip plane distance.
pub const DEFAULT_ZNEAR: f32 = 0.01;

/// Default far clip plane distance.
pub const DEFAULT_ZFAR: f32 = 100.0;

/// Fixed geometric parameters of one captured view.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Calibration {
    /// Rotation from world to camera coordinates (3×3 orthonormal).
    pub rotation: Matrix3<f32>,

    /// Translation from world to camera coordinates.
    pub translation: Vector3<f32>,

    /// Full horizontal field of view (radians).
    pub fov_x: f32,

    /// Full vertical field of view (radians).
    pub fov_y: f32,

    /// Near clip plane distance.
    pub znear: f32,

    /// Far clip plane distance.
    pub zfar: f32,

    /// World-space offset added to the camera center, for re-centering a
    /// whole capture rig.
    pub offset: Vector3<f32>,

    /// Uniform scale applied to the offset camera center.
    pub scale: f32,
}

impl Calibration {
    /// Calibration with default clip planes and no rig adjustment.
    pub fn new(
        rotation: Matrix3<f32>,
        translation: Vector3<f32>,
        fov_x: f32,
        fov_y: f32,
    ) -> Self {
        Self {
            rotation,
            translation,
            fov_x,
            fov_y,
            znear: DEFAULT_ZNEAR,
            zfar: DEFAULT_ZFAR,
            offset: Vector3::zeros(),
            scale: 1.0,
        }
    }
}

/// Optional knobs for [`Camera::new`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CameraOptions {
    /// Downsample ratios for the resolution pyramid, each at least 2. The
    /// pyramid gets one level per ratio plus the original image.
    pub ratios: Vec<u32>,

    /// Requested compute device. An unresolvable name logs a warning and
    /// falls back to [`Device::FALLBACK`].
    pub device: String,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            ratios: vec![2, 4],
            device: "gpu".to_string(),
        }
    }
}

impl CameraOptions {
    pub fn with_ratios(mut self, ratios: Vec<u32>) -> Self {
        self.ratios = ratios;
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }
}

/// Failure to construct or drive a camera view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    /// The resolution pyramid rejected the image, mask or ratios.
    #[error("resolution pyramid: {0}")]
    Pyramid(#[from] PyramidError),

    /// The view transform has no inverse, so no camera center exists. Only
    /// a degenerate rotation (non-orthonormal, collapsing the basis) gets
    /// here.
    #[error("view transform is singular, cannot derive the camera center")]
    SingularViewTransform,

    /// A resolution switch asked for a level the pyramid does not have.
    #[error("resolution level {requested} is out of range ({available} levels)")]
    LevelOutOfRange { requested: usize, available: usize },
}

/// A calibrated view over one captured image.
///
/// Transforms are computed once at construction and never change. The only
/// mutable state is which pyramid level the image accessors read from,
/// driven by [`switch_resolution`](Camera::switch_resolution); switching
/// needs `&mut self`, so a switch and the reads that depend on it form one
/// exclusive-borrow unit and shared references stay consistent across
/// threads.
pub struct Camera {
    uid: u32,
    colmap_id: u32,
    image_name: String,
    calibration: Calibration,
    device: Device,
    pyramid: ImagePyramid,
    current_level: usize,
    world_view_transform: Matrix4<f32>,
    projection_matrix: Matrix4<f32>,
    full_proj_transform: Matrix4<f32>,
    camera_center: Vector3<f32>,
}

impl Camera {
    /// Build a view from calibration and an observed image.
    ///
    /// The image is clamped to [0, 1] before the pyramid is built. The
    /// mask, when given, must match the image dimensions and follows the
    /// image down every level. An unresolvable `options.device` logs a
    /// warning and falls back; everything else that can go wrong is a hard
    /// error naming the offending input.
    ///
    /// `uid` identifies the view inside a loaded scene, `colmap_id` ties it
    /// back to the source reconstruction.
    pub fn new(
        uid: u32,
        colmap_id: u32,
        image_name: impl Into<String>,
        calibration: Calibration,
        mut image: Rgb32FImage,
        alpha_mask: Option<AlphaMask>,
        options: CameraOptions,
    ) -> Result<Self, CameraError> {
        let device = match options.device.parse::<Device>() {
            Ok(device) => device,
            Err(err) => {
                warn!(
                    "device '{}' unavailable ({err}), falling back to {}",
                    options.device,
                    Device::FALLBACK
                );
                Device::FALLBACK
            }
        };

        clamp_unit(&mut image);
        let pyramid = ImagePyramid::build(image, alpha_mask, &options.ratios)?;

        // Row-vector convention from here on: both matrices transposed,
        // composition reads view first, projection second.
        let world_view_transform = world_to_view(
            &calibration.rotation,
            &calibration.translation,
            &calibration.offset,
            calibration.scale,
        )
        .transpose();
        let projection_matrix = perspective_projection(
            calibration.znear,
            calibration.zfar,
            calibration.fov_x,
            calibration.fov_y,
        )
        .transpose();
        let full_proj_transform = world_view_transform * projection_matrix;
        let camera_center = eye_position(&world_view_transform)?;

        Ok(Self {
            uid,
            colmap_id,
            image_name: image_name.into(),
            calibration,
            device,
            pyramid,
            current_level: 0,
            world_view_transform,
            projection_matrix,
            full_proj_transform,
            camera_center,
        })
    }

    /// Select the pyramid level the image accessors read from.
    ///
    /// An out-of-range level is rejected and the selection stays where it
    /// was. Transforms are resolution-independent and are never recomputed.
    pub fn switch_resolution(&mut self, level: usize) -> Result<(), CameraError> {
        let available = self.pyramid.num_levels();
        if level >= available {
            return Err(CameraError::LevelOutOfRange {
                requested: level,
                available,
            });
        }
        self.current_level = level;
        Ok(())
    }

    // Every switch is bounds-checked and a pyramid always has level 0.
    fn current(&self) -> &PyramidLevel {
        &self.pyramid.levels()[self.current_level]
    }

    /// Scene-local identifier of this view.
    pub fn uid(&self) -> u32 {
        self.uid
    }

    /// Identifier of the view in the source reconstruction.
    pub fn colmap_id(&self) -> u32 {
        self.colmap_id
    }

    /// File stem of the observed image.
    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Device this view is placed on.
    pub fn device(&self) -> Device {
        self.device
    }

    /// The full resolution pyramid.
    pub fn pyramid(&self) -> &ImagePyramid {
        &self.pyramid
    }

    /// Index of the selected pyramid level.
    pub fn current_level(&self) -> usize {
        self.current_level
    }

    /// Number of pyramid levels.
    pub fn num_levels(&self) -> usize {
        self.pyramid.num_levels()
    }

    /// Observed image at the selected resolution, values in [0, 1].
    pub fn image(&self) -> &Rgb32FImage {
        &self.current().image
    }

    /// Alpha mask at the selected resolution, when the view has one.
    pub fn alpha_mask(&self) -> Option<&AlphaMask> {
        self.current().alpha_mask.as_ref()
    }

    /// Image width at the selected resolution.
    pub fn width(&self) -> u32 {
        self.current().width
    }

    /// Image height at the selected resolution.
    pub fn height(&self) -> u32 {
        self.current().height
    }

    /// World-to-view transform, row-vector convention.
    pub fn world_view_transform(&self) -> Matrix4<f32> {
        self.world_view_transform
    }

    /// Perspective projection, row-vector convention.
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection_matrix
    }

    /// View and projection composed: a world-space row vector times this
    /// matrix lands in clip space.
    pub fn full_proj_transform(&self) -> Matrix4<f32> {
        self.full_proj_transform
    }

    /// Optical center in world coordinates.
    pub fn camera_center(&self) -> Vector3<f32> {
        self.camera_center
    }
}

impl fmt::Debug for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Camera")
            .field("uid", &self.uid)
            .field("colmap_id", &self.colmap_id)
            .field("image_name", &self.image_name)
            .field("device", &self.device)
            .field("num_levels", &self.pyramid.num_levels())
            .field("current_level", &self.current_level)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// A synthetic view defined purely by precomputed transforms.
///
/// Serves novel-view synthesis where no captured image exists. The caller
/// supplies both matrices in the row-vector convention; keeping them
/// mutually consistent is the caller's responsibility. Only the camera
/// center is derived.
#[derive(Clone, Debug)]
pub struct VirtualCamera {
    width: u32,
    height: u32,
    fov_x: f32,
    fov_y: f32,
    znear: f32,
    zfar: f32,
    world_view_transform: Matrix4<f32>,
    full_proj_transform: Matrix4<f32>,
    camera_center: Vector3<f32>,
}

impl VirtualCamera {
    /// Build a synthetic view from precomputed transforms.
    ///
    /// Fails only when `world_view_transform` has no inverse, which would
    /// leave the view without a camera center.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        width: u32,
        height: u32,
        fov_y: f32,
        fov_x: f32,
        znear: f32,
        zfar: f32,
        world_view_transform: Matrix4<f32>,
        full_proj_transform: Matrix4<f32>,
    ) -> Result<Self, CameraError> {
        let camera_center = eye_position(&world_view_transform)?;
        Ok(Self {
            width,
            height,
            fov_x,
            fov_y,
            znear,
            zfar,
            world_view_transform,
            full_proj_transform,
            camera_center,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fov_x(&self) -> f32 {
        self.fov_x
    }

    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    pub fn znear(&self) -> f32 {
        self.znear
    }

    pub fn zfar(&self) -> f32 {
        self.zfar
    }

    /// World-to-view transform, row-vector convention.
    pub fn world_view_transform(&self) -> Matrix4<f32> {
        self.world_view_transform
    }

    /// Composed view and projection, row-vector convention.
    pub fn full_proj_transform(&self) -> Matrix4<f32> {
        self.full_proj_transform
    }

    /// Optical center in world coordinates.
    pub fn camera_center(&self) -> Vector3<f32> {
        self.camera_center
    }
}

/// World-space eye position of a row-vector view transform: row 3 of its
/// inverse.
fn eye_position(world_view_transform: &Matrix4<f32>) -> Result<Vector3<f32>, CameraError> {
    let inverse = world_view_transform
        .try_inverse()
        .ok_or(CameraError::SingularViewTransform)?;
    Ok(Vector3::new(
        inverse[(3, 0)],
        inverse[(3, 1)],
        inverse[(3, 2)],
    ))
}
