use std::io::Cursor;
use std::panic::{catch_unwind, AssertUnwindSafe};

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use imageproc::contrast::stretch_contrast;
use imageproc::filter::median_filter;
use imageproc::map::map_colors;
use imageproc::stats::percentile;
use log::{debug, warn};

use crate::config::PreprocessOptions;
use crate::models::{PreprocessedPage, RawPage};
use crate::utils::PreprocessError;

pub struct ImageProcessor;

impl ImageProcessor {
    /// Condition a raw page for OCR. Never fails: on any fault the page's
    /// original bytes are passed through.
    pub fn preprocess_page(page: &RawPage, options: &PreprocessOptions) -> PreprocessedPage {
        PreprocessedPage {
            side: page.side,
            bytes: Self::preprocess(&page.bytes, options),
        }
    }

    /// Run the pipeline over encoded image bytes and return PNG bytes, or a
    /// copy of `image_bytes` if anything goes wrong.
    pub fn preprocess(image_bytes: &[u8], options: &PreprocessOptions) -> Vec<u8> {
        if !options.enabled {
            return image_bytes.to_vec();
        }

        // Decoders can panic on malformed input.
        let result = catch_unwind(AssertUnwindSafe(|| {
            Self::try_preprocess(image_bytes, options)
        }));

        match result {
            Ok(Ok(processed)) if !processed.is_empty() => processed,
            Ok(Ok(_)) => {
                warn!("Image preprocessing produced no output, using original");
                image_bytes.to_vec()
            }
            Ok(Err(e)) => {
                warn!("Image preprocessing failed, using original: {}", e);
                image_bytes.to_vec()
            }
            Err(_) => {
                warn!("Image preprocessing panicked, using original");
                image_bytes.to_vec()
            }
        }
    }

    fn try_preprocess(
        image_bytes: &[u8],
        options: &PreprocessOptions,
    ) -> Result<Vec<u8>, PreprocessError> {
        if image_bytes.is_empty() {
            return Err(PreprocessError::EmptyInput);
        }

        let img = image::load_from_memory(image_bytes).map_err(PreprocessError::Decode)?;
        debug!("Preprocessing {}x{} image", img.width(), img.height());

        // Order matters: each step expects the previous step's output.
        let gray = img.to_luma8();
        let stretched = Self::linear_contrast(&gray, options.contrast_gain, options.contrast_bias);
        let sharpened = imageops::unsharpen(&stretched, options.sharpen_sigma, options.sharpen_threshold);
        let resized = Self::bounded_resize(sharpened, options.max_width, options.max_height);
        let denoised = if options.median_radius > 0 {
            median_filter(&resized, options.median_radius, options.median_radius)
        } else {
            resized
        };
        let normalized = Self::normalize_histogram(
            denoised,
            options.normalize_low_percentile,
            options.normalize_high_percentile,
        );

        let mut buffer = Vec::new();
        DynamicImage::ImageLuma8(normalized)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(PreprocessError::Encode)?;

        debug!("Image preprocessing complete ({} bytes)", buffer.len());
        Ok(buffer)
    }

    /// `out = gain * in + bias`, clamped to the pixel range.
    fn linear_contrast(img: &GrayImage, gain: f32, bias: f32) -> GrayImage {
        map_colors(img, |p| {
            let value = gain * f32::from(p[0]) + bias;
            Luma([value.round().clamp(0.0, 255.0) as u8])
        })
    }

    /// Shrink to fit inside `max_width` x `max_height`, keeping the aspect
    /// ratio. Images already inside the box are returned untouched.
    fn bounded_resize(img: GrayImage, max_width: u32, max_height: u32) -> GrayImage {
        let (width, height) = img.dimensions();
        if width <= max_width && height <= max_height {
            return img;
        }

        let ratio = f64::min(
            f64::from(max_width) / f64::from(width),
            f64::from(max_height) / f64::from(height),
        );
        let new_width = ((f64::from(width) * ratio).round() as u32).clamp(1, max_width.max(1));
        let new_height = ((f64::from(height) * ratio).round() as u32).clamp(1, max_height.max(1));

        debug!(
            "Resizing {}x{} -> {}x{}",
            width, height, new_width, new_height
        );
        imageops::resize(&img, new_width, new_height, FilterType::Lanczos3)
    }

    /// Stretch the low..high percentile band to the full intensity range.
    fn normalize_histogram(img: GrayImage, low_pct: u8, high_pct: u8) -> GrayImage {
        if img.width() == 0 || img.height() == 0 {
            return img;
        }
        let lower = percentile(&img, low_pct);
        let upper = percentile(&img, high_pct);
        if upper <= lower {
            // flat image
            return img;
        }
        stretch_contrast(&img, lower, upper)
    }
}
