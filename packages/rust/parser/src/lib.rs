//! Markdown Content Parser Adapter.
//!
//! Implements the pipeline's [`ContentParser`] interface on top of
//! `pulldown-cmark`: raw Markdown in, HTML with heading anchors plus the
//! extracted heading outline out.

mod outline;

use pulldown_cmark::Options;
use tracing::debug;

use bindery_core::{ContentParser, ParsedContent};
use bindery_shared::{BinderyError, Result};

pub use outline::{render_with_outline, slugify};

/// CommonMark extensions enabled for chapter sources.
pub fn default_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// The default Content Parser Adapter.
#[derive(Debug, Clone)]
pub struct MarkdownParser {
    options: Options,
}

impl MarkdownParser {
    pub fn new() -> Self {
        Self {
            options: default_options(),
        }
    }

    /// Override the enabled CommonMark extensions.
    pub fn with_options(options: Options) -> Self {
        Self { options }
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentParser for MarkdownParser {
    fn parse(&self, raw: &str) -> Result<ParsedContent> {
        let (html, outline) = outline::render_with_outline(raw, self.options);

        if html.trim().is_empty() {
            return Err(BinderyError::parse(
                "chapter source produced no content",
            ));
        }

        debug!(
            bytes = html.len(),
            headings = outline.len(),
            "markdown parsed"
        );

        Ok(ParsedContent { html, outline })
    }
}
