//! Image Normalizer
//!
//! Turns an arbitrary decoded image into the `[1, 3, H, W]` float tensor the
//! classifier was trained on. The default policy reproduces the training
//! pipeline: PIL bilinear resize to 256x256, then plain `[0, 1]` scaling with
//! no per-channel mean/std.

use std::io::Cursor;
use std::path::Path;

use image::{imageops::FilterType, DynamicImage, ImageReader, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::utils::error::{DiagnosisError, Result};
use crate::IMAGE_SIZE;

/// Upload extensions accepted when scanning for images
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// ImageNet normalization mean values (RGB)
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet normalization std values (RGB)
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Resampling used to reach the model resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    /// Anti-aliased bilinear, matching PIL's `Image.resize(size, BILINEAR)`
    #[default]
    PilBilinear,
    /// `image` crate triangle filter
    Triangle,
    /// `image` crate Lanczos3 filter
    Lanczos3,
}

/// Value scaling applied after resizing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// `pixel / 255`, values in `[0, 1]`
    #[default]
    UnitRange,
    /// `(pixel / 255 - mean) / std` with ImageNet statistics
    #[serde(rename = "imagenet")]
    ImageNet,
}

/// Preprocessing policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessConfig {
    pub image_size: u32,
    pub filter: ResizeFilter,
    pub normalization: Normalization,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            image_size: IMAGE_SIZE as u32,
            filter: ResizeFilter::PilBilinear,
            normalization: Normalization::UnitRange,
        }
    }
}

/// Normalized single-image tensor in CHW layout, RGB channel order
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Vec<f32>,
    channels: usize,
    height: usize,
    width: usize,
}

impl ImageTensor {
    /// Wrap raw CHW data, checking that the length matches the shape
    pub fn from_raw(data: Vec<f32>, [channels, height, width]: [usize; 3]) -> Result<Self> {
        let expected = channels * height * width;
        if data.len() != expected {
            return Err(DiagnosisError::Inference(format!(
                "Tensor data has {} values, shape [{}, {}, {}] needs {}",
                data.len(),
                channels,
                height,
                width,
                expected
            )));
        }
        Ok(Self {
            data,
            channels,
            height,
            width,
        })
    }

    /// Batch-of-one shape `[1, C, H, W]`
    pub fn shape(&self) -> [usize; 4] {
        [1, self.channels, self.height, self.width]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Whether a path carries one of the supported image extensions
pub fn is_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Decode an image file, sniffing the format from its content
pub fn decode_path(path: &Path) -> Result<DynamicImage> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    reader
        .decode()
        .map_err(|e| DiagnosisError::unsupported_image(path, e))
}

/// Decode an in-memory image (e.g. an upload body)
pub fn decode_bytes(bytes: &[u8]) -> Result<DynamicImage> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    reader
        .decode()
        .map_err(|e| DiagnosisError::unsupported_image("<memory>", e))
}

/// Fixed-point precision of resampling weights (leaves room for 8-bit
/// samples times the accumulated weight in an `i32`)
const PRECISION_BITS: u32 = 32 - 8 - 2;

/// Triangle kernel, support 1
fn bilinear_kernel(x: f64) -> f64 {
    let x = x.abs();
    if x < 1.0 {
        1.0 - x
    } else {
        0.0
    }
}

fn clip8(acc: i32) -> u8 {
    (acc >> PRECISION_BITS).clamp(0, 255) as u8
}

/// Source window and fixed-point weights for each output position along one
/// axis
struct ResampleTaps {
    /// `(first source index, tap count)` per output position
    bounds: Vec<(usize, usize)>,
    weights: Vec<i32>,
    kernel_size: usize,
}

impl ResampleTaps {
    /// Anti-aliased bilinear taps: when downscaling the kernel is stretched by
    /// the scale factor, then each window is normalized to sum to one
    fn bilinear(in_size: usize, out_size: usize) -> Self {
        let scale = in_size as f64 / out_size as f64;
        let filter_scale = scale.max(1.0);
        let inv_filter_scale = 1.0 / filter_scale;
        let support = filter_scale;
        let kernel_size = support.ceil() as usize * 2 + 1;

        let mut bounds = Vec::with_capacity(out_size);
        let mut weights = vec![0i32; out_size * kernel_size];
        let mut kernel = vec![0.0f64; kernel_size];

        for out in 0..out_size {
            let center = (out as f64 + 0.5) * scale;
            // `as` truncates toward zero
            let first = ((center - support + 0.5) as i64).max(0) as usize;
            let last = ((center + support + 0.5) as i64).min(in_size as i64) as usize;
            let count = last.saturating_sub(first).min(kernel_size);

            let mut total = 0.0;
            for (i, w) in kernel.iter_mut().enumerate().take(count) {
                *w = bilinear_kernel((i as f64 + first as f64 - center + 0.5) * inv_filter_scale);
                total += *w;
            }

            let row = &mut weights[out * kernel_size..(out + 1) * kernel_size];
            for (fixed, &w) in row.iter_mut().zip(&kernel[..count]) {
                let w = if total != 0.0 { w / total } else { w };
                *fixed = (0.5 + w * f64::from(1u32 << PRECISION_BITS)) as i32;
            }
            bounds.push((first, count));
        }

        Self {
            bounds,
            weights,
            kernel_size,
        }
    }

    fn taps(&self, out: usize) -> (usize, &[i32]) {
        let (first, count) = self.bounds[out];
        let start = out * self.kernel_size;
        (first, &self.weights[start..start + count])
    }

    /// Weighted sum of `sample(source index)` for one output position
    fn apply(&self, out: usize, sample: impl Fn(usize) -> Rgb<u8>) -> Rgb<u8> {
        let (first, weights) = self.taps(out);
        let mut acc = [1i32 << (PRECISION_BITS - 1); 3];
        for (i, &w) in weights.iter().enumerate() {
            let pixel = sample(first + i);
            for (a, &v) in acc.iter_mut().zip(pixel.0.iter()) {
                *a += i32::from(v) * w;
            }
        }
        Rgb(acc.map(clip8))
    }
}

fn resample_horizontal(src: &RgbImage, width: u32) -> RgbImage {
    let taps = ResampleTaps::bilinear(src.width() as usize, width as usize);
    RgbImage::from_fn(width, src.height(), |x, y| {
        taps.apply(x as usize, |sx| *src.get_pixel(sx as u32, y))
    })
}

fn resample_vertical(src: &RgbImage, height: u32) -> RgbImage {
    let taps = ResampleTaps::bilinear(src.height() as usize, height as usize);
    RgbImage::from_fn(src.width(), height, |x, y| {
        taps.apply(y as usize, |sy| *src.get_pixel(x, sy as u32))
    })
}

/// Pillow's `Image.resize(size, BILINEAR)`.
///
/// Two separable passes, horizontal then vertical, each with 22-bit
/// fixed-point weights and rounded back to 8 bits in between. An axis whose
/// size does not change is not resampled.
fn pil_bilinear_resize(src: &RgbImage, target_width: u32, target_height: u32) -> RgbImage {
    let horizontal = if src.width() != target_width {
        resample_horizontal(src, target_width)
    } else {
        src.clone()
    };

    if horizontal.height() != target_height {
        resample_vertical(&horizontal, target_height)
    } else {
        horizontal
    }
}

/// Convert to RGB and resize to `size x size` with the configured filter
pub fn resize_rgb(image: &DynamicImage, size: u32, filter: ResizeFilter) -> RgbImage {
    let rgb = image.to_rgb8();
    if rgb.dimensions() == (size, size) {
        return rgb;
    }
    match filter {
        ResizeFilter::PilBilinear => pil_bilinear_resize(&rgb, size, size),
        ResizeFilter::Triangle => image::imageops::resize(&rgb, size, size, FilterType::Triangle),
        ResizeFilter::Lanczos3 => image::imageops::resize(&rgb, size, size, FilterType::Lanczos3),
    }
}

/// Normalize a decoded image into a model-ready tensor
pub fn normalize(image: &DynamicImage, config: &PreprocessConfig) -> Result<ImageTensor> {
    if image.width() == 0 || image.height() == 0 {
        return Err(DiagnosisError::unsupported_image(
            "<image>",
            format!("empty image ({}x{})", image.width(), image.height()),
        ));
    }
    if config.image_size == 0 {
        return Err(DiagnosisError::Config(
            "preprocess image_size must be greater than 0".to_string(),
        ));
    }

    let rgb = resize_rgb(image, config.image_size, config.filter);
    let size = config.image_size as usize;
    let num_pixels = size * size;

    // CHW: all R values, then all G values, then all B values
    let mut data = vec![0.0f32; 3 * num_pixels];
    for (i, pixel) in rgb.pixels().enumerate() {
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            data[c * num_pixels + i] = match config.normalization {
                Normalization::UnitRange => value,
                Normalization::ImageNet => (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c],
            };
        }
    }

    ImageTensor::from_raw(data, [3, size, size])
}

/// Decode and normalize an image file
pub fn normalize_path(path: &Path, config: &PreprocessConfig) -> Result<ImageTensor> {
    let image = decode_path(path)?;
    normalize(&image, config).map_err(|e| match e {
        DiagnosisError::UnsupportedImageFormat { reason, .. } => {
            DiagnosisError::unsupported_image(path, reason)
        }
        other => other,
    })
}
