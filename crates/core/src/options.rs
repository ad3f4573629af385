//! Conversion options and slide themes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Named style bundle applied to the output deck.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Professional,
    Academic,
    Minimal,
}

impl Theme {
    /// All themes, in the order they are listed to users.
    pub const ALL: [Theme; 4] = [
        Theme::Default,
        Theme::Professional,
        Theme::Academic,
        Theme::Minimal,
    ];

    /// Lowercase theme name.
    pub fn name(self) -> &'static str {
        match self {
            Theme::Default => "default",
            Theme::Professional => "professional",
            Theme::Academic => "academic",
            Theme::Minimal => "minimal",
        }
    }

    /// Fonts, sizes and colors for this theme.
    pub fn style(self) -> ThemeStyle {
        match self {
            Theme::Default => ThemeStyle {
                title_font_size: 44.0,
                content_font_size: 18.0,
                title_color: "000000",
                content_color: "000000",
                background_color: "FFFFFF",
                accent_color: "4472C4",
                major_font: "Calibri Light",
                minor_font: "Calibri",
            },
            Theme::Professional => ThemeStyle {
                title_font_size: 40.0,
                content_font_size: 16.0,
                title_color: "002060",
                content_color: "202020",
                background_color: "FFFFFF",
                accent_color: "002060",
                major_font: "Segoe UI Semibold",
                minor_font: "Segoe UI",
            },
            Theme::Academic => ThemeStyle {
                title_font_size: 42.0,
                content_font_size: 17.0,
                title_color: "000080",
                content_color: "000000",
                background_color: "FFFFFF",
                accent_color: "000080",
                major_font: "Cambria",
                minor_font: "Cambria",
            },
            Theme::Minimal => ThemeStyle {
                title_font_size: 36.0,
                content_font_size: 14.0,
                title_color: "404040",
                content_color: "404040",
                background_color: "FFFFFF",
                accent_color: "808080",
                major_font: "Helvetica Neue",
                minor_font: "Helvetica Neue",
            },
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Theme::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                Error::ConfigError(format!(
                    "unknown theme '{}' (expected one of: default, professional, academic, minimal)",
                    s
                ))
            })
    }
}

/// Resolved visual settings for a theme. Colors are RRGGBB, sizes are points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThemeStyle {
    pub title_font_size: f64,
    pub content_font_size: f64,
    pub title_color: &'static str,
    pub content_color: &'static str,
    pub background_color: &'static str,
    pub accent_color: &'static str,
    pub major_font: &'static str,
    pub minor_font: &'static str,
}

/// Options for a conversion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    /// Style bundle for layouts, fonts and colors.
    pub theme: Theme,

    /// Copy source color hints into text runs instead of theme colors.
    pub preserve_colors: bool,

    /// Resolve and embed images; when false the image step is skipped.
    pub include_images: bool,

    /// Equation cache directory. Defaults to `.slideforge-cache` next to the output.
    pub cache_dir: Option<PathBuf>,

    /// Where temporary compiler runs happen. Defaults to the system temp dir.
    pub scratch_dir: Option<PathBuf>,

    /// LaTeX compiler producing DVI.
    pub latex_program: String,

    /// DVI rasterizer.
    pub dvipng_program: String,

    /// Upper bound for each external process, in seconds.
    pub render_timeout_secs: u64,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            theme: Theme::Default,
            preserve_colors: false,
            include_images: true,
            cache_dir: None,
            scratch_dir: None,
            latex_program: "latex".to_string(),
            dvipng_program: "dvipng".to_string(),
            render_timeout_secs: 30,
        }
    }
}

impl ConversionOptions {
    /// Default cache directory name, created beside the output file.
    pub const DEFAULT_CACHE_DIR: &'static str = ".slideforge-cache";

    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parse options from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn with_preserve_colors(mut self, preserve: bool) -> Self {
        self.preserve_colors = preserve;
        self
    }

    pub fn with_include_images(mut self, include: bool) -> Self {
        self.include_images = include;
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Timeout for each external process.
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs.max(1))
    }

    /// Cache directory to use for an output written to `output_path`.
    pub fn cache_dir_for(&self, output_path: &Path) -> PathBuf {
        match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => output_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(Self::DEFAULT_CACHE_DIR),
        }
    }

    /// Scratch directory for compiler runs.
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
