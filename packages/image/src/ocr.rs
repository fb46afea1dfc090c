//! OCR engines.
//!
//! The pipeline only needs "image in, text out", so the engine sits behind
//! [`OcrEngine`]. [`TesseractCli`] shells out to the `tesseract` binary,
//! writing each region to a temporary PNG first.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use image::{GrayImage, ImageFormat};

use crate::ImageError;

/// Default OCR language (Spanish).
pub const DEFAULT_LANGUAGE: &str = "spa";

/// Turns a preprocessed region into text.
pub trait OcrEngine {
    /// Recognizes the text in `image` using page segmentation mode `psm`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot run or fails on the image.
    fn recognize(&self, image: &GrayImage, psm: u8) -> Result<String, ImageError>;
}

impl<E: OcrEngine + ?Sized> OcrEngine for &E {
    fn recognize(&self, image: &GrayImage, psm: u8) -> Result<String, ImageError> {
        (**self).recognize(image, psm)
    }
}

/// The `tesseract` command-line program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TesseractCli {
    binary: PathBuf,
    language: String,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl TesseractCli {
    /// `tesseract` from `PATH`, Spanish.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the binary at `binary`.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Uses the language pack `language` (e.g. `spa`, `spa+eng`).
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Path of the binary that will be run.
    #[must_use]
    pub const fn binary(&self) -> &PathBuf {
        &self.binary
    }

    /// Language pack passed with `-l`.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &GrayImage, psm: u8) -> Result<String, ImageError> {
        let file = tempfile::Builder::new()
            .prefix("zafra-region-")
            .suffix(".png")
            .tempfile()?;
        image.save_with_format(file.path(), ImageFormat::Png)?;

        let psm = psm.to_string();
        log::debug!(
            "Running {} on {} (lang {}, psm {psm})",
            self.binary.display(),
            file.path().display(),
            self.language
        );

        let output = Command::new(&self.binary)
            .arg(file.path())
            .arg("stdout")
            .args(["-l", self.language.as_str()])
            .args(["--psm", psm.as_str()])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| ImageError::OcrUnavailable {
                binary: self.binary.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ImageError::OcrFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_spanish_from_path() {
        let cli = TesseractCli::new();
        assert_eq!(cli.binary(), &PathBuf::from("tesseract"));
        assert_eq!(cli.language(), "spa");
    }

    #[test]
    fn missing_binary_is_reported() {
        let cli = TesseractCli::new().with_binary("/nonexistent/zafra-tesseract");
        let err = cli.recognize(&GrayImage::new(4, 4), 6).unwrap_err();
        assert!(
            matches!(err, ImageError::OcrUnavailable { ref binary, .. } if binary.contains("zafra-tesseract")),
            "{err}"
        );
    }
}
