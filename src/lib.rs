//! # splatcam: calibrated camera views for Gaussian splatting pipelines
//!
//! This crate implements the camera side of a splatting reconstruction
//! pipeline: view and projection transforms in the layout the rasterizer
//! consumes, a multi-resolution pyramid of each observed image for
//! coarse-to-fine training schedules, and the per-view bookkeeping
//! (identity, device placement, resolution switching) the training loop
//! drives.
//!
//! ## Architecture
//!
//! The crate is organized into four modules:
//!
//! - `transforms`: pure view/projection matrix construction
//! - `pyramid`: resolution pyramid over an image and its optional mask
//! - `camera`: the per-view entity ([`Camera`], [`VirtualCamera`])
//! - `device`: logical compute placement with explicit resolution
//!
//! Calibration and a decoded image go in; the renderer reads the fixed
//! transforms and the current-level image views back out.

// Per-view entities and calibration
pub mod camera;

// Logical device placement
pub mod device;

// Resolution pyramid and f32 image helpers
pub mod pyramid;

// View/projection matrix math
pub mod transforms;

// Re-export commonly used types at crate root for convenience
pub use camera::{
    Calibration, Camera, CameraError, CameraOptions, VirtualCamera, DEFAULT_ZFAR, DEFAULT_ZNEAR,
};
pub use device::{Device, DeviceError};
pub use pyramid::{AlphaMask, ImagePyramid, PyramidError, PyramidLevel};
pub use transforms::{focal_to_fov, fov_to_focal, perspective_projection, world_to_view};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
