//! Configuration schema types for `assetflow.toml`
//!
//! Every key is optional. An empty file (or no file at all) yields the
//! conventional layout: sources under `src/`, output under `docs/`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Project roots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Source tree root
    #[serde(default = "default_src")]
    pub src: PathBuf,
    /// Destination tree root (deleted on every run)
    #[serde(default = "default_out")]
    pub out: PathBuf,
}

fn default_src() -> PathBuf {
    PathBuf::from("src")
}

fn default_out() -> PathBuf {
    PathBuf::from("docs")
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { src: default_src(), out: default_out() }
    }
}

/// Narrow source globs used by the one-shot transforms, relative to `project.src`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceGlobsConfig {
    pub html: String,
    pub style: String,
    pub script: String,
    pub sprite: String,
    pub favicons: String,
    pub images: String,
    pub fonts: String,
}

impl Default for SourceGlobsConfig {
    fn default() -> Self {
        Self {
            html: "pages/*.html".to_string(),
            style: "assets/styles/main.scss".to_string(),
            script: "assets/scripts/main.js".to_string(),
            sprite: "assets/images/sprite/**/*.svg".to_string(),
            favicons: "assets/images/favicon/*.{jpg,png,svg,gif,ico}".to_string(),
            images: "assets/images/**/*.{jpg,png,svg,gif,ico}".to_string(),
            fonts: "assets/fonts/**/*.{woff,woff2}".to_string(),
        }
    }
}

/// Broad watch globs, one per asset kind, relative to `project.src`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchGlobsConfig {
    pub html: String,
    pub style: String,
    pub script: String,
    pub images: String,
    pub fonts: String,
}

impl Default for WatchGlobsConfig {
    fn default() -> Self {
        Self {
            html: "**/*.html".to_string(),
            style: "**/*.scss".to_string(),
            script: "**/*.js".to_string(),
            images: "assets/images/**/*.{jpg,png,svg,gif,ico}".to_string(),
            fonts: "assets/fonts/**/*.{ttf,woff,woff2}".to_string(),
        }
    }
}

/// Destination directories, relative to `project.out`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DestDirsConfig {
    pub html: PathBuf,
    pub style: PathBuf,
    pub script: PathBuf,
    pub images: PathBuf,
    pub favicons: PathBuf,
    pub fonts: PathBuf,
}

impl Default for DestDirsConfig {
    fn default() -> Self {
        Self {
            html: PathBuf::new(),
            style: PathBuf::from("assets"),
            script: PathBuf::from("assets"),
            images: PathBuf::from("assets/images"),
            favicons: PathBuf::from("assets/images/favicons"),
            fonts: PathBuf::from("assets/fonts"),
        }
    }
}

/// `[paths]` section
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathsConfig {
    #[serde(default)]
    pub source: SourceGlobsConfig,
    #[serde(default)]
    pub watch: WatchGlobsConfig,
    #[serde(default)]
    pub dest: DestDirsConfig,
    /// Library stylesheets concatenated before the entry, relative to the project root
    #[serde(default)]
    pub style_libs: Vec<PathBuf>,
    /// Library scripts concatenated before the entry, relative to the project root
    #[serde(default)]
    pub script_libs: Vec<PathBuf>,
}

/// HTML transform settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlConfig {
    /// Directive prefix for template inclusion
    pub include_prefix: String,
    /// Authoring-time asset prefix rewritten in every page
    pub asset_prefix: String,
    /// Replacement for `asset_prefix`
    pub asset_replacement: String,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            include_prefix: "@@".to_string(),
            asset_prefix: "../../assets".to_string(),
            asset_replacement: "assets".to_string(),
        }
    }
}

/// Stylesheet transform settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Name of the concatenated output file
    pub output: String,
    /// Root font size used by the px to rem conversion
    pub root_value: f64,
    /// Decimal places kept by the px to rem conversion
    pub unit_precision: usize,
    /// Pixel values below this stay in px
    pub min_pixel_value: f64,
    /// Browserslist queries for vendor prefixing
    pub browsers: Vec<String>,
    /// Extra Sass load paths, relative to the project root
    pub load_paths: Vec<PathBuf>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            output: "style.min.css".to_string(),
            root_value: 16.0,
            unit_precision: 5,
            min_pixel_value: 2.0,
            browsers: vec!["defaults".to_string()],
            load_paths: Vec::new(),
        }
    }
}

/// Script transform settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Name of the concatenated output file
    pub output: String,
    /// Separator inserted between concatenated fragments
    pub separator: String,
    /// Command reading a script on stdin and writing the transpiled script to stdout.
    /// Empty disables transpilation.
    pub transpile_command: Vec<String>,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            output: "script.min.js".to_string(),
            separator: ";".to_string(),
            transpile_command: vec![
                "npx".to_string(),
                "babel".to_string(),
                "--presets=@babel/preset-env".to_string(),
            ],
        }
    }
}

/// Image transform settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Sprite filename under the images destination
    pub sprite_file: String,
    /// JPEG re-encoding quality (1-100)
    pub jpeg_quality: u8,
    /// oxipng preset (0-6)
    pub png_level: u8,
    /// Write GIFs interlaced
    pub gif_interlaced: bool,
    /// Drop the root viewBox of optimized SVGs when it matches width/height
    pub svg_remove_viewbox: bool,
    /// Background colour for Apple touch icons
    pub favicon_background: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            sprite_file: "sprite.svg".to_string(),
            jpeg_quality: 75,
            png_level: 5,
            gif_interlaced: true,
            svg_remove_viewbox: true,
            favicon_background: "#ffffff".to_string(),
        }
    }
}

/// Dev server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 3000 }
    }
}

/// Watch mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
}

fn default_debounce_ms() -> u32 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms() }
    }
}

/// Complete assetflow.toml configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AssetflowConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub html: HtmlConfig,
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub script: ScriptConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "style.root_value")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "assetflow.toml: '{}' {}", self.field, self.message)
    }
}

impl AssetflowConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: &str| {
            errors.push(ConfigValidationError {
                field: field.to_string(),
                message: message.to_string(),
            });
        };

        if self.html.include_prefix.is_empty() {
            push("html.include_prefix", "must be a non-empty string");
        }
        if self.html.asset_prefix.is_empty() {
            push("html.asset_prefix", "must be a non-empty string");
        }
        if self.style.root_value.is_nan() || self.style.root_value <= 0.0 {
            push("style.root_value", "must be a positive number");
        }
        if self.style.min_pixel_value < 0.0 {
            push("style.min_pixel_value", "must not be negative");
        }
        if self.style.output.is_empty() {
            push("style.output", "must be a non-empty file name");
        }
        if self.script.output.is_empty() {
            push("script.output", "must be a non-empty file name");
        }
        if self.images.jpeg_quality == 0 || self.images.jpeg_quality > 100 {
            push("images.jpeg_quality", "must be between 1 and 100");
        }
        if self.images.png_level > 6 {
            push("images.png_level", "must be between 0 and 6");
        }
        if self.images.sprite_file.is_empty() {
            push("images.sprite_file", "must be a non-empty file name");
        }
        if let Err(e) = crate::css::color::parse_color(&self.images.favicon_background) {
            push("images.favicon_background", &format!("is not a CSS colour ({})", e));
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
