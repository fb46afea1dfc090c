#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Scanned-report extraction.
//!
//! A page photo or scan is searched for the yellow header band of each
//! table. Every band is cropped together with the table below it,
//! preprocessed, and run through OCR. The recognized text of each region is
//! then handed to the line-oriented section mappers in `zafra_extract`.
//!
//! The n-th region found (top to bottom) is read as the n-th section
//! configured in the layout's `[image]` table, with that entry's crop
//! height and page segmentation mode.

pub mod locator;
pub mod ocr;
pub mod preprocess;

use std::path::Path;

use zafra_layout::ReportLayout;
use zafra_report_models::{IndicatorGroup, SectionKind};

pub use image::{GrayImage, RgbImage};
pub use locator::{CropBox, HeaderRegion, crop_box, locate_regions};
pub use ocr::{DEFAULT_LANGUAGE, OcrEngine, TesseractCli};
pub use preprocess::preprocess;

/// Errors from image extraction.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image could not be decoded or encoded.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// The OCR program could not be started.
    #[error("Failed to run OCR binary {binary}: {source}")]
    OcrUnavailable {
        /// Binary that was attempted.
        binary: String,
        /// Spawn error.
        source: std::io::Error,
    },

    /// The OCR program exited unsuccessfully.
    #[error("OCR failed ({status}): {stderr}")]
    OcrFailed {
        /// Exit status.
        status: String,
        /// Captured standard error.
        stderr: String,
    },
}

/// Recognized text of one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionText {
    /// Section the region was read as.
    pub section: SectionKind,
    /// Where the region was cropped from.
    pub crop: CropBox,
    /// OCR output.
    pub text: String,
}

/// Locates, crops and recognizes report regions with an [`OcrEngine`].
pub struct ImagePipeline<'a, E> {
    layout: &'a ReportLayout,
    engine: E,
}

impl<'a, E: OcrEngine> ImagePipeline<'a, E> {
    /// Creates a pipeline for `layout`.
    pub const fn new(layout: &'a ReportLayout, engine: E) -> Self {
        Self { layout, engine }
    }

    /// Runs OCR over every configured region found in `image`.
    ///
    /// Finding fewer regions than configured is logged and the missing
    /// sections are left out. Regions beyond the configured count are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the OCR engine fails on a region.
    pub fn recognize_regions(&self, image: &RgbImage) -> Result<Vec<RegionText>, ImageError> {
        let params = &self.layout.image;
        let regions = locate_regions(image, params);

        if regions.len() < params.regions.len() {
            log::warn!(
                "Expected {} header regions but found {}",
                params.regions.len(),
                regions.len()
            );
        } else if regions.len() > params.regions.len() {
            log::debug!(
                "Ignoring {} header regions past the configured {}",
                regions.len() - params.regions.len(),
                params.regions.len()
            );
        }

        let mut texts = Vec::new();
        for (index, (region, settings)) in regions.iter().zip(&params.regions).enumerate() {
            let Some(crop) = crop_box(region, settings.expansion, params, image.dimensions())
            else {
                log::warn!("Region {} has an empty crop, skipping", index + 1);
                continue;
            };

            let cropped =
                image::imageops::crop_imm(image, crop.x, crop.y, crop.width, crop.height)
                    .to_image();
            let text = self.engine.recognize(&preprocess(&cropped), settings.psm)?;

            log::debug!(
                "Region {} ({}) at {},{} {}x{}: {} characters",
                index + 1,
                settings.section,
                crop.x,
                crop.y,
                crop.width,
                crop.height,
                text.len()
            );
            texts.push(RegionText {
                section: settings.section,
                crop,
                text,
            });
        }

        Ok(texts)
    }

    /// Extracts indicator groups from a decoded page image.
    ///
    /// # Errors
    ///
    /// Returns an error if the OCR engine fails.
    pub fn extract(&self, image: &RgbImage) -> Result<Vec<IndicatorGroup>, ImageError> {
        let sections: Vec<(SectionKind, String)> = self
            .recognize_regions(image)?
            .into_iter()
            .map(|r| (r.section, r.text))
            .collect();
        Ok(zafra_extract::extract_sections(&sections, self.layout))
    }

    /// Opens an image file and extracts its indicator groups.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or cannot be decoded, or if
    /// OCR fails.
    pub fn extract_file(&self, path: &Path) -> Result<Vec<IndicatorGroup>, ImageError> {
        let image = image::open(path)?.to_rgb8();
        log::info!(
            "Processing {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        self.extract(&image)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use image::{GrayImage, Rgb};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;
    use zafra_layout::default_layout;
    use zafra_report_models::{CellValue, GroupName};

    use super::*;

    const YELLOW: Rgb<u8> = Rgb([250, 210, 30]);

    /// Returns canned text in call order and records each call's mode.
    struct ScriptedOcr {
        texts: Vec<&'static str>,
        calls: RefCell<Vec<(u32, u32, u8)>>,
    }

    impl ScriptedOcr {
        fn new(texts: &[&'static str]) -> Self {
            Self {
                texts: texts.to_vec(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl OcrEngine for ScriptedOcr {
        fn recognize(&self, image: &GrayImage, psm: u8) -> Result<String, ImageError> {
            let mut calls = self.calls.borrow_mut();
            let text = self.texts.get(calls.len()).copied().unwrap_or_default();
            calls.push((image.width(), image.height(), psm));
            Ok(text.to_string())
        }
    }

    struct FailingOcr;

    impl OcrEngine for FailingOcr {
        fn recognize(&self, _image: &GrayImage, _psm: u8) -> Result<String, ImageError> {
            Err(ImageError::OcrFailed {
                status: "exit status: 1".to_string(),
                stderr: "Failed loading language 'spa'".to_string(),
            })
        }
    }

    fn small_layout() -> ReportLayout {
        let mut layout = default_layout();
        layout.image.min_area = 1_000;
        for region in &mut layout.image.regions {
            region.expansion = 100;
        }
        layout
    }

    fn page(bands: &[(i32, i32)]) -> RgbImage {
        let mut page = RgbImage::from_pixel(400, 900, Rgb([255, 255, 255]));
        for &(x, y) in bands {
            draw_filled_rect_mut(&mut page, Rect::at(x, y).of_size(300, 30), YELLOW);
        }
        page
    }

    #[test]
    fn regions_map_to_configured_sections_in_order() {
        let layout = small_layout();
        let ocr = ScriptedOcr::new(&["a", "b", "c"]);
        let pipeline = ImagePipeline::new(&layout, &ocr);

        let texts = pipeline
            .recognize_regions(&page(&[(50, 600), (50, 40), (50, 320)]))
            .unwrap();

        let sections: Vec<SectionKind> = texts.iter().map(|t| t.section).collect();
        assert_eq!(
            sections,
            [
                SectionKind::Analysis,
                SectionKind::FinishedProduct,
                SectionKind::Continuation
            ]
        );
        assert_eq!(texts[0].crop.y, 35);
        assert_eq!(texts[1].crop.y, 315);

        let modes: Vec<u8> = ocr.calls.borrow().iter().map(|c| c.2).collect();
        assert_eq!(modes, [6, 4, 6]);
        // 300 wide plus 20 on each side, 100 + 50 tall
        assert_eq!(ocr.calls.borrow()[0].0, 340);
        assert_eq!(ocr.calls.borrow()[0].1, 150);
    }

    #[test]
    fn missing_regions_leave_sections_out() {
        let layout = small_layout();
        let ocr = ScriptedOcr::new(&["Jugo Mixto 18.5 16.2 87.6 1200 5.4 0.25"]);
        let pipeline = ImagePipeline::new(&layout, &ocr);

        let groups = pipeline.extract(&page(&[(50, 40)])).unwrap();

        assert_eq!(ocr.calls.borrow().len(), 1);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, GroupName::AnalysisToday);
        let jugo = &groups[0].indicators[0];
        assert_eq!(jugo.description(), "Jugo Mixto");
        assert_eq!(jugo.get("BRIX"), Some(&CellValue::Float(18.5)));
    }

    #[test]
    fn page_without_headers_yields_empty_analysis() {
        let layout = small_layout();
        let ocr = ScriptedOcr::new(&[]);
        let pipeline = ImagePipeline::new(&layout, &ocr);

        let groups = pipeline.extract(&page(&[])).unwrap();

        assert!(ocr.calls.borrow().is_empty());
        assert!(groups.iter().all(|g| g.indicators.is_empty()));
    }

    #[test]
    fn ocr_failure_is_propagated() {
        let layout = small_layout();
        let pipeline = ImagePipeline::new(&layout, FailingOcr);

        let err = pipeline.extract(&page(&[(50, 40)])).unwrap_err();
        assert!(matches!(err, ImageError::OcrFailed { .. }), "{err}");
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, b"not really a png").unwrap();

        let layout = small_layout();
        let pipeline = ImagePipeline::new(&layout, ScriptedOcr::new(&[]));

        assert!(matches!(
            pipeline.extract_file(&path),
            Err(ImageError::Image(_))
        ));
        assert!(pipeline.extract_file(&dir.path().join("missing.jpg")).is_err());
    }

    #[test]
    fn extracts_saved_scan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        page(&[(50, 40)]).save(&path).unwrap();

        let layout = small_layout();
        let ocr = ScriptedOcr::new(&["Meladura 60.1 52.3 87.0 900 6.1 0.3"]);
        let groups = ImagePipeline::new(&layout, &ocr).extract_file(&path).unwrap();

        assert_eq!(groups[0].indicators[0].description(), "Meladura");
    }
}
