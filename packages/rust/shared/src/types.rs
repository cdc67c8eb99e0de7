//! Core domain types for the bindery publishing pipeline.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Layout applied to chapters that do not name one themselves.
pub const DEFAULT_LAYOUT: &str = "chapter";

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one publishing run (time-sortable).
///
/// Names the per-run scratch directory, so two runs never share
/// intermediate files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// Per-item settings carried through the whole pipeline.
///
/// `layout` selects the decoration template; `extra` is free-form data made
/// available to that template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemConfig {
    /// Decoration template name (e.g., `chapter`, `cover`).
    pub layout: String,
    /// Display title; falls back to the first heading when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Additional template variables from chapter frontmatter.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, toml::Value>,
}

impl Default for ItemConfig {
    fn default() -> Self {
        Self {
            layout: DEFAULT_LAYOUT.to_string(),
            title: None,
            extra: BTreeMap::new(),
        }
    }
}

/// One section/chapter of the document as it moves through the pipeline.
///
/// Items are value-like snapshots: each phase builds a *new* item via
/// [`Item::with_parsed`] / [`Item::with_decorated`] instead of mutating in
/// place, so a failed phase can never leak partial state into the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Where the chapter was loaded from, when it came from disk.
    pub source_path: Option<PathBuf>,
    /// Raw input markup. Immutable once set.
    pub original_content: String,
    /// Structured (HTML) content. Set once per run by the Parse phase.
    pub parsed_content: Option<String>,
    /// Heading outline derived during parsing.
    pub outline: Vec<OutlineEntry>,
    /// Fully rendered markup. Set once per run by the Decorate phase.
    pub decorated_content: Option<String>,
    /// Per-item settings (layout selection, title, template variables).
    pub config: ItemConfig,
}

impl Item {
    /// Create a fresh, unparsed item from raw markup.
    pub fn new(original_content: impl Into<String>, config: ItemConfig) -> Self {
        Self {
            source_path: None,
            original_content: original_content.into(),
            parsed_content: None,
            outline: Vec::new(),
            decorated_content: None,
            config,
        }
    }

    /// Attach the source file path.
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    /// Produce the post-parse snapshot of this item.
    ///
    /// Config and provenance carry forward from `self` (the effective,
    /// possibly hook-rewritten input).
    pub fn with_parsed(self, html: impl Into<String>, outline: Vec<OutlineEntry>) -> Self {
        Self {
            parsed_content: Some(html.into()),
            outline,
            ..self
        }
    }

    /// Produce the post-decorate snapshot of this item.
    pub fn with_decorated(self, rendered: impl Into<String>) -> Self {
        Self {
            decorated_content: Some(rendered.into()),
            ..self
        }
    }

    /// Title for display: explicit config title, else the first heading.
    pub fn display_title(&self) -> Option<&str> {
        self.config
            .title
            .as_deref()
            .or_else(|| self.outline.first().map(|e| e.title.as_str()))
    }

    /// Whether the Parse phase has produced usable content for this item.
    pub fn has_parsed_content(&self) -> bool {
        self.parsed_content
            .as_deref()
            .is_some_and(|html| !html.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// OutlineEntry
// ---------------------------------------------------------------------------

/// A single heading in an item's table-of-contents outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    /// Heading level, 1–6.
    pub level: u8,
    /// Heading text with inline markup stripped.
    pub title: String,
    /// Anchor id injected into the rendered heading.
    pub anchor: String,
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Severity of a converter diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A message produced by the conversion engine.
///
/// Diagnostics are purely informational: they are surfaced verbatim to the
/// user and never decide the outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Source location or engine-specific code, when the engine gave one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{}: {}: {}", self.severity, loc, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

// ---------------------------------------------------------------------------
// BuildReport
// ---------------------------------------------------------------------------

/// Optional JSON report describing a completed run (`--report <path>`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    /// Run identifier (matches the scratch directory name).
    pub run_id: RunId,
    /// Book title as published.
    pub title: String,
    /// Number of chapters in the artifact.
    pub chapter_count: usize,
    /// Final artifact location.
    pub output_path: PathBuf,
    /// SHA-256 of the artifact.
    pub artifact_sha256: String,
    /// Engine diagnostics surfaced during conversion.
    pub diagnostics: Vec<Diagnostic>,
    /// Tool version that produced the artifact.
    pub tool_version: String,
    /// When the run finished.
    pub completed_at: DateTime<Utc>,
}
