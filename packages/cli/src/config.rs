//! Run configuration from `zafra.toml` and the environment.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use zafra_layout::DEFAULT_LAYOUT_ID;

/// Config file read from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "zafra.toml";

/// Overrides [`RunConfig::tesseract`].
pub const TESSERACT_ENV: &str = "ZAFRA_TESSERACT";

/// Overrides [`RunConfig::ocr_lang`].
pub const OCR_LANG_ENV: &str = "ZAFRA_OCR_LANG";

/// Errors from loading the run configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Config file path.
        path: String,
        /// Read error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has unknown keys.
    #[error("Invalid config {path}: {source}")]
    Toml {
        /// Config file path.
        path: String,
        /// Parse error.
        source: toml::de::Error,
    },
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// `tesseract` binary to run.
    pub tesseract: PathBuf,
    /// OCR language pack.
    pub ocr_lang: String,
    /// Layout used when `--layout` is not given.
    pub default_layout: String,
    /// 1-indexed page read when `--page` is not given.
    pub default_page: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tesseract: PathBuf::from("tesseract"),
            ocr_lang: zafra_image::DEFAULT_LANGUAGE.to_string(),
            default_layout: DEFAULT_LAYOUT_ID.to_string(),
            default_page: zafra_pdf::DEFAULT_PAGE,
        }
    }
}

impl RunConfig {
    /// Parses a config file's contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or has unknown keys.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::de::from_str(text).map_err(|source| ConfigError::Toml {
            path: path.display().to_string(),
            source,
        })
    }

    /// Loads `explicit` if given, otherwise [`DEFAULT_CONFIG_FILE`] when it
    /// exists, otherwise the defaults. Environment overrides are applied
    /// last.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen file cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()),
        };

        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                log::debug!("Loaded config from {}", path.display());
                Self::parse(&text, &path)?
            }
            None => Self::default(),
        };

        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Applies environment-style overrides looked up through `lookup`.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(tesseract) = lookup(TESSERACT_ENV).filter(|v| !v.is_empty()) {
            self.tesseract = PathBuf::from(tesseract);
        }
        if let Some(lang) = lookup(OCR_LANG_ENV).filter(|v| !v.is_empty()) {
            self.ocr_lang = lang;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = RunConfig::parse("", Path::new("zafra.toml")).unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.ocr_lang, "spa");
        assert_eq!(config.default_page, 2);
        assert_eq!(config.default_layout, "informe_diario_v1");
    }

    #[test]
    fn file_values_override_defaults() {
        let config = RunConfig::parse(
            "tesseract = \"/opt/tess/bin/tesseract\"\ndefault_page = 1\n",
            Path::new("zafra.toml"),
        )
        .unwrap();
        assert_eq!(config.tesseract, PathBuf::from("/opt/tess/bin/tesseract"));
        assert_eq!(config.default_page, 1);
        assert_eq!(config.ocr_lang, "spa");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = RunConfig::parse("ocr_language = \"eng\"", Path::new("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("bad.toml"), "{err}");
    }

    #[test]
    fn environment_wins_over_file() {
        let config = RunConfig::default().with_overrides(|key| match key {
            OCR_LANG_ENV => Some("spa+eng".to_string()),
            TESSERACT_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.ocr_lang, "spa+eng");
        assert_eq!(config.tesseract, PathBuf::from("tesseract"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().starts_with("Failed to read "), "{err}");
        assert!(err.to_string().contains("nope.toml"), "{err}");
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zafra.toml");
        std::fs::write(&path, "default_layout = \"informe_diario_v1\"\ndefault_page = 3\n").unwrap();

        let config = RunConfig::load(Some(&path)).unwrap();
        assert_eq!(config.default_page, 3);
    }
}
