//! Book loading: manifest + chapter sources → the initial item collection.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use bindery_shared::{
    AppConfig, BinderyError, BookConfig, ChapterEntry, Item, ItemConfig, Result,
    CHAPTERS_DIR_NAME, load_book_config,
};

use crate::frontmatter;

/// A book loaded from disk, ready for the pipeline.
#[derive(Debug)]
pub struct LoadedBook {
    /// The book manifest (defaults applied).
    pub config: BookConfig,
    /// Chapters in document order.
    pub items: Vec<Item>,
    /// Resolved stylesheet policy.
    pub include_default_styles: bool,
    /// Custom stylesheets as absolute paths.
    pub custom_stylesheets: Vec<PathBuf>,
}

/// Load a book directory: manifest, then chapters in manifest order (or
/// discovered from `chapters/*.md` in lexicographic order).
#[instrument(skip_all, fields(book_dir = %book_dir.display()))]
pub fn load_book(book_dir: &Path, app: &AppConfig) -> Result<LoadedBook> {
    if !book_dir.is_dir() {
        return Err(BinderyError::validation(format!(
            "book directory not found: {}",
            book_dir.display()
        )));
    }

    let config = load_book_config(book_dir)?;

    let sources = if config.chapters.is_empty() {
        discover_chapters(book_dir)?
    } else {
        config.chapters.clone()
    };

    let mut items = Vec::with_capacity(sources.len());
    for entry in &sources {
        items.push(load_chapter(book_dir, entry, app)?);
    }

    let custom_stylesheets = config
        .styles
        .custom
        .iter()
        .map(|rel| book_dir.join(rel))
        .collect();

    info!(
        title = %config.book.title,
        chapters = items.len(),
        "book loaded"
    );

    Ok(LoadedBook {
        include_default_styles: config.include_default_styles(app),
        custom_stylesheets,
        config,
        items,
    })
}

/// Discover `chapters/*.md` sorted by file name.
fn discover_chapters(book_dir: &Path) -> Result<Vec<ChapterEntry>> {
    let chapters_dir = book_dir.join(CHAPTERS_DIR_NAME);
    if !chapters_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(&chapters_dir)
        .map_err(|e| BinderyError::io(&chapters_dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
        .collect();
    paths.sort();

    debug!(count = paths.len(), "discovered chapter sources");

    Ok(paths
        .into_iter()
        .map(|p| ChapterEntry {
            path: p
                .strip_prefix(book_dir)
                .unwrap_or(&p)
                .to_string_lossy()
                .to_string(),
            layout: None,
            title: None,
        })
        .collect())
}

/// Load one chapter file into an item: read, split frontmatter, merge
/// per-item config (manifest entry overrides frontmatter overrides app
/// defaults).
fn load_chapter(book_dir: &Path, entry: &ChapterEntry, app: &AppConfig) -> Result<Item> {
    let path = book_dir.join(&entry.path);
    let raw = std::fs::read_to_string(&path).map_err(|e| BinderyError::io(&path, e))?;

    let (front, body) = frontmatter::split_frontmatter(&raw).map_err(|e| match e {
        BinderyError::Parse { message } => BinderyError::parse(format!(
            "{}: {message}",
            path.display()
        )),
        other => other,
    })?;
    let front = front.unwrap_or_default();

    let config = ItemConfig {
        layout: entry
            .layout
            .clone()
            .or(front.layout)
            .unwrap_or_else(|| app.defaults.layout.clone()),
        title: entry.title.clone().or(front.title),
        extra: front.extra,
    };

    Ok(Item::new(body, config).with_source(path))
}
