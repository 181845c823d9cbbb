//! Viewer configuration.
//!
//! Configuration can be loaded from a file, environment variables, or created
//! programmatically. Environment variables take precedence over the file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const ENV_VIEWPORT_WIDTH: &str = "PDF_VIEWER_VIEWPORT_WIDTH";
const ENV_VIEWPORT_PADDING: &str = "PDF_VIEWER_VIEWPORT_PADDING";

/// Settings for a [`PdfPageViewer`](crate::PdfPageViewer).
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// Width of the host container in pixels before the first resize
    pub viewport_width_px: f32,
    /// Horizontal padding subtracted from the container width
    pub viewport_padding_px: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self { viewport_width_px: 800.0, viewport_padding_px: 16.0 }
    }
}

impl ViewerConfig {
    pub fn new(viewport_width_px: f32, viewport_padding_px: f32) -> Self {
        Self { viewport_width_px, viewport_padding_px }
    }

    pub fn with_viewport_width(mut self, px: f32) -> Self {
        self.viewport_width_px = px;
        self
    }

    pub fn with_padding(mut self, px: f32) -> Self {
        self.viewport_padding_px = px;
        self
    }

    /// Width the first render uses: container width minus padding, at least
    /// one pixel.
    pub fn initial_render_width(&self) -> f32 {
        (self.viewport_width_px - self.viewport_padding_px).max(1.0)
    }

    /// Returns the default configuration file path for the current platform.
    ///
    /// - macOS: ~/Library/Application Support/pdf-viewer/viewer.toml
    /// - Linux: ~/.config/pdf-viewer/viewer.toml
    /// - Windows: %APPDATA%\pdf-viewer\viewer.toml
    pub fn default_config_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("pdf-viewer").join("viewer.toml")
        } else {
            PathBuf::from("viewer.toml")
        }
    }

    /// Resolve the effective configuration.
    ///
    /// Reads `file` if given, otherwise the default path when it exists, then
    /// applies environment overrides.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a value is invalid.
    pub fn resolve(file: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match file {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::default_config_path();
                if default_path.is_file() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env()
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PDF_VIEWER_VIEWPORT_WIDTH`: container width in pixels (default: 800)
    /// - `PDF_VIEWER_VIEWPORT_PADDING`: padding in pixels (default: 16)
    ///
    /// # Errors
    /// Returns an error if any environment variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env()
    }

    fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(val) = std::env::var(ENV_VIEWPORT_WIDTH) {
            self.viewport_width_px = parse_width(ENV_VIEWPORT_WIDTH, &val)?;
        }

        if let Ok(val) = std::env::var(ENV_VIEWPORT_PADDING) {
            self.viewport_padding_px = parse_padding(ENV_VIEWPORT_PADDING, &val)?;
        }

        Ok(self)
    }

    /// Loads configuration from a TOML-style `key = value` file.
    ///
    /// Expected file format:
    /// ```toml
    /// viewport_width_px = 800
    /// viewport_padding_px = 16
    /// ```
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;

        Self::from_toml(&contents)
    }

    fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for line in toml_str.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"');

                match key {
                    "viewport_width_px" => config.viewport_width_px = parse_width(key, value)?,
                    "viewport_padding_px" => {
                        config.viewport_padding_px = parse_padding(key, value)?
                    }
                    _ => {} // Ignore unknown keys
                }
            }
        }

        Ok(config)
    }

    /// Saves configuration to a file readable by [`ViewerConfig::from_file`].
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path.as_ref(), self.to_toml())?;
        Ok(())
    }

    fn to_toml(&self) -> String {
        format!(
            "# PDF Viewer Configuration\n\
             viewport_width_px = {}\n\
             viewport_padding_px = {}\n",
            self.viewport_width_px, self.viewport_padding_px
        )
    }
}

fn parse_width(key: &str, value: &str) -> Result<f32, ConfigError> {
    value
        .parse::<f32>()
        .ok()
        .filter(|px| px.is_finite() && *px > 0.0)
        .ok_or_else(|| ConfigError::InvalidValue(key.to_string()))
}

fn parse_padding(key: &str, value: &str) -> Result<f32, ConfigError> {
    value
        .parse::<f32>()
        .ok()
        .filter(|px| px.is_finite() && *px >= 0.0)
        .ok_or_else(|| ConfigError::InvalidValue(key.to_string()))
}

/// Errors that can occur during configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
