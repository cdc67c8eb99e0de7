//! Application and book configuration for bindery.
//!
//! User config lives at `~/.bindery/bindery.toml`; each book directory has
//! its own `bindery.toml` manifest. CLI flags override config file values,
//! which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BinderyError, Result};
use crate::types::DEFAULT_LAYOUT;

/// Configuration file name, shared by user config and book manifests.
const CONFIG_FILE_NAME: &str = "bindery.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".bindery";

/// Chapter sources discovered when a book manifest lists none explicitly.
pub const CHAPTERS_DIR_NAME: &str = "chapters";

// ---------------------------------------------------------------------------
// User config (~/.bindery/bindery.toml)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Conversion engine settings.
    #[serde(default)]
    pub converter: ConverterConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Whether the generated default stylesheet is included.
    #[serde(default = "default_true")]
    pub include_default_styles: bool,

    /// Layout applied to chapters without an explicit one.
    #[serde(default = "default_layout")]
    pub layout: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            include_default_styles: true,
            layout: default_layout(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_layout() -> String {
    DEFAULT_LAYOUT.into()
}

/// `[converter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Explicit path to the conversion engine binary, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_path: Option<String>,

    /// Directories searched for the engine before consulting `$PATH`.
    #[serde(default = "default_search_paths")]
    pub search_paths: Vec<String>,

    /// Engine binary file name looked for in search paths and `$PATH`.
    #[serde(default = "default_engine_name")]
    pub engine_name: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            engine_path: None,
            search_paths: default_search_paths(),
            engine_name: default_engine_name(),
        }
    }
}

fn default_search_paths() -> Vec<String> {
    vec![
        "/usr/bin".into(),
        "/usr/local/bin".into(),
        "/opt/prince/bin".into(),
    ]
}
fn default_engine_name() -> String {
    "prince".into()
}

// ---------------------------------------------------------------------------
// Book config (<book>/bindery.toml)
// ---------------------------------------------------------------------------

/// A book directory's `bindery.toml` manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookConfig {
    /// `[book]` metadata.
    #[serde(default)]
    pub book: BookMeta,

    /// `[styles]` stylesheet settings.
    #[serde(default)]
    pub styles: StylesConfig,

    /// `[toc]` generated table-of-contents settings.
    #[serde(default)]
    pub toc: TocConfig,

    /// Explicit chapter list; when empty, `chapters/*.md` is discovered in
    /// lexicographic order.
    #[serde(default, rename = "chapters")]
    pub chapters: Vec<ChapterEntry>,
}

/// `[book]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookMeta {
    #[serde(default = "default_book_title")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for BookMeta {
    fn default() -> Self {
        Self {
            title: default_book_title(),
            author: None,
            language: default_language(),
        }
    }
}

fn default_book_title() -> String {
    "Untitled".into()
}
fn default_language() -> String {
    "en".into()
}

/// `[styles]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylesConfig {
    /// Include the generated default stylesheet. `None` defers to the user
    /// config's `[defaults]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_default: Option<bool>,

    /// Custom stylesheets, relative to the book directory.
    #[serde(default)]
    pub custom: Vec<String>,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            include_default: None,
            custom: Vec::new(),
        }
    }
}

/// `[toc]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TocConfig {
    /// Whether a table-of-contents section is generated before the chapters.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Heading shown above the generated TOC.
    #[serde(default = "default_toc_title")]
    pub title: String,

    /// Deepest heading level included.
    #[serde(default = "default_toc_depth")]
    pub depth: u8,
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: default_toc_title(),
            depth: default_toc_depth(),
        }
    }
}

fn default_toc_title() -> String {
    "Contents".into()
}
fn default_toc_depth() -> u8 {
    2
}

/// `[[chapters]]` entry — one explicitly listed chapter source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterEntry {
    /// Markdown file, relative to the book directory.
    pub path: String,
    /// Layout override for this chapter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    /// Title override for this chapter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.bindery/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BinderyError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user config file (`~/.bindery/bindery.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the user config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the user config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BinderyError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| BinderyError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BinderyError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BinderyError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BinderyError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Load a book manifest from its directory.
///
/// A missing `bindery.toml` yields the default manifest (title "Untitled",
/// discovered chapters); a malformed one is a config error.
pub fn load_book_config(book_dir: &Path) -> Result<BookConfig> {
    let path = book_dir.join(CONFIG_FILE_NAME);

    if !path.exists() {
        tracing::debug!(?path, "book manifest not found, using defaults");
        return Ok(BookConfig::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|e| BinderyError::io(&path, e))?;
    toml::from_str(&content)
        .map_err(|e| BinderyError::config(format!("failed to parse {}: {e}", path.display())))
}

impl BookConfig {
    /// Resolve whether the default stylesheet is included, given the user
    /// config's fallback.
    pub fn include_default_styles(&self, app: &AppConfig) -> bool {
        self.styles
            .include_default
            .unwrap_or(app.defaults.include_default_styles)
    }
}
