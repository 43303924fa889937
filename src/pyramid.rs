//! Multi-resolution pyramid over an observed image and its optional alpha
//! mask.
//!
//! Level 0 is always the original image; every further level is the
//! original downsampled by one integer ratio with an area-averaging box
//! filter. Training schedules walk the levels coarse-to-fine, so each level
//! carries its own dimensions and, when the view is masked, a mask resized
//! the same way.

use std::fmt;

use image::{GrayImage, ImageBuffer, Luma, Pixel, Rgb, Rgb32FImage, RgbImage};
use thiserror::Error;

/// Single-channel f32 alpha mask, same [0, 1] range as the image it covers.
pub type AlphaMask = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Failure to build an [`ImagePyramid`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PyramidError {
    /// The source image has a zero dimension.
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    /// The alpha mask does not cover the image pixel-for-pixel.
    #[error("alpha mask dimensions {mask:?} do not match image dimensions {image:?}")]
    MaskSizeMismatch { image: (u32, u32), mask: (u32, u32) },

    /// A downsample ratio below 2 (which would upsample or divide by zero).
    #[error("downsample ratio {ratio} at index {index} is invalid (must be at least 2)")]
    InvalidRatio { index: usize, ratio: u32 },
}

/// One resolution level: the image, the dimensions the resize actually
/// produced, and the mask when the view has one.
#[derive(Clone)]
pub struct PyramidLevel {
    pub image: Rgb32FImage,
    pub width: u32,
    pub height: u32,
    pub alpha_mask: Option<AlphaMask>,
}

impl fmt::Debug for PyramidLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PyramidLevel")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("has_mask", &self.alpha_mask.is_some())
            .finish()
    }
}

/// Ordered resolution levels of one view, finest first.
#[derive(Clone)]
pub struct ImagePyramid {
    levels: Vec<PyramidLevel>,
}

impl ImagePyramid {
    /// Build a pyramid from a [0, 1] float image.
    ///
    /// Level 0 takes the input as-is; level i+1 is the input downsampled by
    /// `ratios[i]`. Ratios apply to the original resolution, not to the
    /// previous level, so `[2, 4]` yields half and quarter size. Every
    /// level carries a mask exactly when `alpha_mask` is supplied; the mask
    /// must match the image dimensions and is resized with the same filter.
    pub fn build(
        image: Rgb32FImage,
        alpha_mask: Option<AlphaMask>,
        ratios: &[u32],
    ) -> Result<Self, PyramidError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PyramidError::EmptyImage { width, height });
        }
        if let Some(mask) = &alpha_mask {
            if mask.dimensions() != (width, height) {
                return Err(PyramidError::MaskSizeMismatch {
                    image: (width, height),
                    mask: mask.dimensions(),
                });
            }
        }
        for (index, &ratio) in ratios.iter().enumerate() {
            if ratio < 2 {
                return Err(PyramidError::InvalidRatio { index, ratio });
            }
        }

        let mut derived = Vec::with_capacity(ratios.len());
        for &ratio in ratios {
            let level_image = downsample_box(&image, ratio);
            let level_mask = alpha_mask.as_ref().map(|mask| downsample_box(mask, ratio));
            let (level_width, level_height) = level_image.dimensions();
            derived.push(PyramidLevel {
                image: level_image,
                width: level_width,
                height: level_height,
                alpha_mask: level_mask,
            });
        }

        let mut levels = Vec::with_capacity(ratios.len() + 1);
        levels.push(PyramidLevel {
            image,
            width,
            height,
            alpha_mask,
        });
        levels.extend(derived);
        Ok(Self { levels })
    }

    /// Number of levels, one more than the ratio count used to build.
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// All levels, index 0 at the original resolution.
    pub fn levels(&self) -> &[PyramidLevel] {
        &self.levels
    }

    /// A single level, or `None` past the end.
    pub fn level(&self, index: usize) -> Option<&PyramidLevel> {
        self.levels.get(index)
    }
}

impl fmt::Debug for ImagePyramid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePyramid")
            .field("levels", &self.levels)
            .finish()
    }
}

/// Downsample an f32 image by an integer ratio with an area-averaging box
/// filter.
///
/// Output dimensions round up, so a 101-wide image at ratio 2 becomes 51
/// wide; blocks on the right/bottom edge shrink to the pixels that exist.
/// Samples are averaged as-is (the data is already linear), which keeps
/// values inside the range of the input.
pub fn downsample_box<P>(src: &ImageBuffer<P, Vec<f32>>, ratio: u32) -> ImageBuffer<P, Vec<f32>>
where
    P: Pixel<Subpixel = f32>,
{
    let out_width = (src.width() + ratio - 1) / ratio;
    let out_height = (src.height() + ratio - 1) / ratio;
    let mut out = ImageBuffer::new(out_width, out_height);

    let channels = P::CHANNEL_COUNT as usize;
    for out_y in 0..out_height {
        for out_x in 0..out_width {
            let src_x_start = out_x * ratio;
            let src_y_start = out_y * ratio;
            let src_x_end = (src_x_start + ratio).min(src.width());
            let src_y_end = (src_y_start + ratio).min(src.height());

            // Average every pixel in the block, channel by channel. Four
            // accumulators cover the widest supported pixel type.
            let mut sum = [0.0f32; 4];
            for src_y in src_y_start..src_y_end {
                for src_x in src_x_start..src_x_end {
                    let pixel = src.get_pixel(src_x, src_y);
                    for (acc, &sample) in sum.iter_mut().zip(pixel.channels()) {
                        *acc += sample;
                    }
                }
            }

            let count = ((src_x_end - src_x_start) * (src_y_end - src_y_start)) as f32;
            for acc in &mut sum[..channels] {
                *acc /= count;
            }
            out.put_pixel(out_x, out_y, *P::from_slice(&sum[..channels]));
        }
    }

    out
}

/// Clamp every sample of an f32 image into [0, 1].
pub fn clamp_unit<P>(image: &mut ImageBuffer<P, Vec<f32>>)
where
    P: Pixel<Subpixel = f32>,
{
    for sample in image.iter_mut() {
        *sample = sample.clamp(0.0, 1.0);
    }
}

/// Convert an 8-bit RGB image to the [0, 1] float range the pipeline works
/// in.
///
/// # Example
/// ```
/// use splatcam::pyramid::image_from_rgb8;
///
/// let src = image::RgbImage::from_pixel(2, 2, image::Rgb([255, 0, 51]));
/// let float = image_from_rgb8(&src);
/// assert_eq!(float.get_pixel(0, 0).0, [1.0, 0.0, 0.2]);
/// ```
pub fn image_from_rgb8(image: &RgbImage) -> Rgb32FImage {
    Rgb32FImage::from_fn(image.width(), image.height(), |x, y| {
        let pixel = image.get_pixel(x, y);
        Rgb([
            pixel[0] as f32 / 255.0,
            pixel[1] as f32 / 255.0,
            pixel[2] as f32 / 255.0,
        ])
    })
}

/// Convert an 8-bit grayscale image to a [0, 1] float alpha mask.
///
/// # Example
/// ```
/// use splatcam::pyramid::mask_from_luma8;
///
/// let src = image::GrayImage::from_pixel(1, 1, image::Luma([255]));
/// assert_eq!(mask_from_luma8(&src).get_pixel(0, 0).0, [1.0]);
/// ```
pub fn mask_from_luma8(mask: &GrayImage) -> AlphaMask {
    AlphaMask::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([mask.get_pixel(x, y)[0] as f32 / 255.0])
    })
}
