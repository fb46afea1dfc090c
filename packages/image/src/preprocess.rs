//! Cleans a cropped table region up for OCR.

use image::{GrayImage, RgbImage};
use imageproc::contrast::{equalize_histogram, otsu_level};
use imageproc::filter::median_filter;

/// Grayscale, contrast-equalize, denoise and binarize a region.
///
/// The result holds only black (0) and white (255) pixels.
#[must_use]
pub fn preprocess(region: &RgbImage) -> GrayImage {
    let gray = image::imageops::grayscale(region);
    let equalized = equalize_histogram(&gray);
    let mut denoised = median_filter(&equalized, 1, 1);

    let level = otsu_level(&denoised);
    log::trace!("Binarizing {}x{} region at level {level}", region.width(), region.height());

    for pixel in denoised.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > level { 255 } else { 0 };
    }
    denoised
}
