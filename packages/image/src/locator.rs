//! Finds the highlighted header band of each table in a scanned report.
//!
//! Table headers are printed on a yellow background. Pixels are thresholded
//! in HSV space (hue on OpenCV's 0-180 scale), the outer borders of the
//! resulting blobs are traced, and blobs larger than the layout's minimum
//! area are kept, top to bottom. Each header then yields a crop box that
//! extends down over the table body.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contours::{BorderType, find_contours};
use imageproc::point::Point;
use zafra_layout::ImageLayout;

/// Bounding box of one header blob.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaderRegion {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Area enclosed by the blob's outer border.
    pub area: f64,
}

/// Pixel rectangle to crop out of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Converts an RGB pixel to HSV with H in `0..=180` and S, V in `0..=255`.
#[must_use]
#[allow(
    clippy::float_cmp,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn rgb_to_hsv(Rgb([r, g, b]): Rgb<u8>) -> [u8; 3] {
    let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
    let v = r.max(g).max(b);
    let delta = v - r.min(g).min(b);

    let s = if v == 0.0 { 0.0 } else { 255.0 * delta / v };
    let mut h = if delta == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / delta
    } else if v == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    [(h / 2.0).round() as u8, s.round() as u8, v as u8]
}

/// White where a pixel's HSV value lies inside the layout's header range.
#[must_use]
pub fn header_mask(image: &RgbImage, params: &ImageLayout) -> GrayImage {
    let (lower, upper) = (params.hsv_lower, params.hsv_upper);
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let hsv = rgb_to_hsv(*image.get_pixel(x, y));
        let inside = (0..3).all(|i| lower[i] <= hsv[i] && hsv[i] <= upper[i]);
        Luma([if inside { 255 } else { 0 }])
    })
}

#[allow(clippy::cast_precision_loss)]
fn polygon_area(points: &[Point<u32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y))
        .sum();
    twice.unsigned_abs() as f64 / 2.0
}

/// Outermost blobs of `mask` larger than `min_area`, sorted top to bottom.
#[must_use]
pub fn find_header_regions(mask: &GrayImage, min_area: u32) -> Vec<HeaderRegion> {
    let mut regions: Vec<HeaderRegion> = find_contours::<u32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|contour| {
            let area = polygon_area(&contour.points);
            if area <= f64::from(min_area) {
                return None;
            }
            let min_x = contour.points.iter().map(|p| p.x).min()?;
            let max_x = contour.points.iter().map(|p| p.x).max()?;
            let min_y = contour.points.iter().map(|p| p.y).min()?;
            let max_y = contour.points.iter().map(|p| p.y).max()?;
            Some(HeaderRegion {
                x: min_x,
                y: min_y,
                width: max_x - min_x + 1,
                height: max_y - min_y + 1,
                area,
            })
        })
        .collect();

    regions.sort_by_key(|r| r.y);
    regions
}

/// Locates header regions in a page image.
#[must_use]
pub fn locate_regions(image: &RgbImage, params: &ImageLayout) -> Vec<HeaderRegion> {
    let regions = find_header_regions(&header_mask(image, params), params.min_area);
    log::debug!(
        "Found {} header regions in {}x{} image",
        regions.len(),
        image.width(),
        image.height()
    );
    regions
}

/// Crop box covering a header and the `expansion` pixels of table below
/// it, clipped to the image. Returns `None` when nothing is left.
#[must_use]
pub fn crop_box(
    region: &HeaderRegion,
    expansion: u32,
    params: &ImageLayout,
    (image_width, image_height): (u32, u32),
) -> Option<CropBox> {
    let x = region.x.saturating_sub(params.pad_x);
    let y = region.y.saturating_sub(params.pad_top);
    let x_end = (region.x + region.width + params.pad_x).min(image_width);

    let width = x_end.saturating_sub(x);
    let height = image_height
        .saturating_sub(y)
        .min(expansion + params.extra_height);

    (width > 0 && height > 0).then_some(CropBox {
        x,
        y,
        width,
        height,
    })
}
