//! End-to-end walk through the camera pipeline: build a view from
//! calibration and an image, read the renderer-facing state back out,
//! switch resolutions, and pin down the transform conventions with numbers
//! small enough to verify by hand.

use approx::assert_relative_eq;
use image::{Luma, Rgb, Rgb32FImage};
use nalgebra::{Matrix3, Matrix4, Rotation3, Vector3, Vector4};
use splatcam::{
    perspective_projection, world_to_view, AlphaMask, Calibration, Camera, CameraError,
    CameraOptions, VirtualCamera, DEFAULT_ZFAR, DEFAULT_ZNEAR,
};
use std::f32::consts::FRAC_PI_3;

fn gradient_image(width: u32, height: u32) -> Rgb32FImage {
    Rgb32FImage::from_fn(width, height, |x, y| {
        Rgb([
            x as f32 / width as f32,
            y as f32 / height as f32,
            0.5,
        ])
    })
}

#[test]
fn test_resolution_walk_over_masked_view() {
    let _ = env_logger::builder().is_test(true).try_init();

    let rotation = Rotation3::from_euler_angles(0.1, 0.3, -0.2).into_inner();
    let calibration = Calibration::new(
        rotation,
        Vector3::new(0.4, -0.6, 2.0),
        FRAC_PI_3,
        FRAC_PI_3 * 0.75,
    );
    let mut camera = Camera::new(
        3,
        17,
        "DSC_0042",
        calibration,
        gradient_image(101, 77),
        Some(AlphaMask::from_pixel(101, 77, Luma([1.0]))),
        CameraOptions::default().with_ratios(vec![2, 4]),
    )
    .unwrap();

    // 101x77 with ratios [2, 4]: rounded-up halves and quarters.
    assert_eq!(camera.num_levels(), 3);
    let expected_dims = [(101, 77), (51, 39), (26, 20)];

    let view = camera.world_view_transform();
    let full = camera.full_proj_transform();

    for (level, &(width, height)) in expected_dims.iter().enumerate() {
        camera.switch_resolution(level).unwrap();
        assert_eq!(camera.current_level(), level);
        assert_eq!((camera.width(), camera.height()), (width, height));
        assert_eq!(camera.image().dimensions(), (width, height));
        let mask = camera.alpha_mask().expect("mask follows every level");
        assert_eq!(mask.dimensions(), (width, height));
    }

    // Switching never touches the transforms.
    assert_eq!(camera.world_view_transform(), view);
    assert_eq!(camera.full_proj_transform(), full);

    // An out-of-range request is rejected and the selection stays put.
    camera.switch_resolution(1).unwrap();
    let err = camera.switch_resolution(3).unwrap_err();
    assert_eq!(
        err,
        CameraError::LevelOutOfRange {
            requested: 3,
            available: 3
        }
    );
    assert_eq!(camera.current_level(), 1);
    assert_eq!((camera.width(), camera.height()), (51, 39));
}

#[test]
fn test_stored_transforms_agree_with_math_pipeline() {
    // The camera stores transposed (row-vector) matrices; mapping a column
    // vector through their transposes must reproduce the plain math
    // pipeline from the transforms module.
    let rotation = Rotation3::from_euler_angles(0.5, -0.2, 0.1).into_inner();
    let translation = Vector3::new(1.0, -2.0, 4.0);
    let camera = Camera::new(
        0,
        0,
        "conventions",
        Calibration::new(rotation, translation, FRAC_PI_3, FRAC_PI_3),
        gradient_image(16, 16),
        None,
        CameraOptions::default(),
    )
    .unwrap();

    let view_math = world_to_view(&rotation, &translation, &Vector3::zeros(), 1.0);
    let proj_math = perspective_projection(DEFAULT_ZNEAR, DEFAULT_ZFAR, FRAC_PI_3, FRAC_PI_3);

    assert_relative_eq!(
        camera.world_view_transform(),
        view_math.transpose(),
        epsilon = 1e-6
    );
    assert_relative_eq!(
        camera.projection_matrix(),
        proj_math.transpose(),
        epsilon = 1e-6
    );

    let point = Vector4::new(0.3, -0.7, 5.0, 1.0);
    let clip_math = proj_math * view_math * point;
    let clip_stored = camera.full_proj_transform().transpose() * point;
    assert_relative_eq!(clip_stored, clip_math, epsilon = 1e-4);
}

#[test]
fn test_identity_pose_reference_values() {
    // Identity rotation, zero translation, 60 degree FoV on both axes: the
    // eye sits at the origin and the projection matches the closed form
    // for tan(30°) = 1/√3.
    let camera = Camera::new(
        0,
        0,
        "reference",
        Calibration::new(Matrix3::identity(), Vector3::zeros(), FRAC_PI_3, FRAC_PI_3),
        gradient_image(8, 8),
        None,
        CameraOptions::default(),
    )
    .unwrap();

    let center = camera.camera_center();
    assert_relative_eq!(center.x, 0.0, epsilon = 1e-6);
    assert_relative_eq!(center.y, 0.0, epsilon = 1e-6);
    assert_relative_eq!(center.z, 0.0, epsilon = 1e-6);

    // Stored transposed: focal terms stay on the diagonal, the depth terms
    // swap across it.
    let proj = camera.projection_matrix();
    let sqrt3 = 3.0f32.sqrt();
    assert_relative_eq!(proj[(0, 0)], sqrt3, epsilon = 1e-5);
    assert_relative_eq!(proj[(1, 1)], sqrt3, epsilon = 1e-5);
    assert_relative_eq!(
        proj[(2, 2)],
        DEFAULT_ZFAR / (DEFAULT_ZFAR - DEFAULT_ZNEAR),
        epsilon = 1e-6
    );
    assert_relative_eq!(proj[(2, 3)], 1.0, epsilon = 1e-6);

    // With an identity view transform the composition is the projection.
    assert_eq!(camera.world_view_transform(), Matrix4::identity());
    assert_eq!(camera.full_proj_transform(), proj);
}

#[test]
fn test_camera_center_simple_pose() {
    // Identity rotation with t = (0, 0, 5): the camera sits at (0, 0, -5).
    let camera = Camera::new(
        0,
        0,
        "axis",
        Calibration::new(
            Matrix3::identity(),
            Vector3::new(0.0, 0.0, 5.0),
            FRAC_PI_3,
            FRAC_PI_3,
        ),
        gradient_image(8, 8),
        None,
        CameraOptions::default(),
    )
    .unwrap();

    let center = camera.camera_center();
    assert_relative_eq!(center.x, 0.0, epsilon = 1e-5);
    assert_relative_eq!(center.y, 0.0, epsilon = 1e-5);
    assert_relative_eq!(center.z, -5.0, epsilon = 1e-5);

    // The view transform maps that center to the view-space origin.
    let mapped = camera.world_view_transform().transpose()
        * Vector4::new(center.x, center.y, center.z, 1.0);
    assert_relative_eq!(mapped.x, 0.0, epsilon = 1e-5);
    assert_relative_eq!(mapped.y, 0.0, epsilon = 1e-5);
    assert_relative_eq!(mapped.z, 0.0, epsilon = 1e-5);
}

#[test]
fn test_virtual_camera_mirrors_real_view() {
    let rotation = Rotation3::from_euler_angles(-0.3, 0.6, 0.05).into_inner();
    let camera = Camera::new(
        1,
        1,
        "real",
        Calibration::new(rotation, Vector3::new(2.0, 0.5, -1.5), 1.2, 0.9),
        gradient_image(32, 24),
        None,
        CameraOptions::default(),
    )
    .unwrap();

    let fly_through = VirtualCamera::new(
        640,
        480,
        0.9,
        1.2,
        DEFAULT_ZNEAR,
        DEFAULT_ZFAR,
        camera.world_view_transform(),
        camera.full_proj_transform(),
    )
    .unwrap();

    assert_eq!((fly_through.width(), fly_through.height()), (640, 480));
    assert_relative_eq!(fly_through.fov_x(), 1.2, epsilon = 1e-6);
    assert_relative_eq!(fly_through.fov_y(), 0.9, epsilon = 1e-6);

    // Same transforms, same eye position.
    let expected = camera.camera_center();
    let center = fly_through.camera_center();
    assert_relative_eq!(center.x, expected.x, epsilon = 1e-5);
    assert_relative_eq!(center.y, expected.y, epsilon = 1e-5);
    assert_relative_eq!(center.z, expected.z, epsilon = 1e-5);
}

#[test]
fn test_area_average_preserves_mean_brightness() {
    // Box filtering is mean-preserving when the ratio divides the image
    // exactly, which keeps per-pixel losses comparable across levels.
    let image = gradient_image(64, 64);
    let mean_full: f32 =
        image.pixels().map(|p| p.0[0]).sum::<f32>() / (64.0 * 64.0);

    let camera = Camera::new(
        0,
        0,
        "mean",
        Calibration::new(
            Matrix3::identity(),
            Vector3::new(0.0, 0.0, 1.0),
            FRAC_PI_3,
            FRAC_PI_3,
        ),
        image,
        None,
        CameraOptions::default().with_ratios(vec![4]),
    )
    .unwrap();

    let level = &camera.pyramid().levels()[1];
    assert_eq!((level.width, level.height), (16, 16));
    let mean_down: f32 =
        level.image.pixels().map(|p| p.0[0]).sum::<f32>() / (16.0 * 16.0);
    assert_relative_eq!(mean_down, mean_full, epsilon = 1e-4);
}

#[test]
fn test_camera_options_deserialize_from_config_fragment() {
    let options: CameraOptions =
        serde_json::from_str(r#"{ "ratios": [2, 4, 8], "device": "cuda:1" }"#).unwrap();
    assert_eq!(options.ratios, vec![2, 4, 8]);
    assert_eq!(options.device, "cuda:1");
}

#[test]
fn test_calibration_survives_serde_roundtrip() {
    let rotation = Rotation3::from_euler_angles(0.2, 0.4, -0.6).into_inner();
    let calibration = Calibration::new(rotation, Vector3::new(1.0, 2.0, 3.0), 1.1, 0.8);

    let json = serde_json::to_string(&calibration).unwrap();
    let back: Calibration = serde_json::from_str(&json).unwrap();

    assert_eq!(back.rotation, calibration.rotation);
    assert_eq!(back.translation, calibration.translation);
    assert_relative_eq!(back.fov_x, calibration.fov_x, epsilon = 1e-6);
    assert_relative_eq!(back.znear, calibration.znear, epsilon = 1e-6);
    assert_relative_eq!(back.scale, calibration.scale, epsilon = 1e-6);
}
