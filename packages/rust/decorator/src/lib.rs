//! Template Decorator Adapter.
//!
//! Implements the pipeline's [`Decorator`] interface with `tera`. Built-in
//! layouts (`chapter`, `cover`, `plain`) are embedded in the binary; a book
//! may override them or add its own by shipping a `templates/` directory.

use std::path::Path;

use tera::Tera;
use tracing::{debug, instrument};

use bindery_core::{DecorationContext, Decorator};
use bindery_shared::{BinderyError, Result};

/// Built-in layouts, embedded at compile time.
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("chapter.html", include_str!("../templates/chapter.html")),
    ("cover.html", include_str!("../templates/cover.html")),
    ("plain.html", include_str!("../templates/plain.html")),
];

/// The default Decorator Adapter.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Engine with only the built-in layouts.
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(BUILTIN_TEMPLATES.to_vec())
            .map_err(|e| BinderyError::Render(describe(e)))?;
        Ok(Self { tera })
    }

    /// Engine with built-ins plus overrides from `dir/*.html`.
    ///
    /// A user template named like a built-in replaces it; others become new
    /// layouts. A missing directory is fine — books without custom
    /// templates are the common case.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn with_overrides(dir: &Path) -> Result<Self> {
        let mut engine = Self::new()?;
        if !dir.is_dir() {
            return Ok(engine);
        }

        let mut entries: Vec<_> = std::fs::read_dir(dir)
            .map_err(|e| BinderyError::io(dir, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "html"))
            .collect();
        entries.sort();

        for path in entries {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let content =
                std::fs::read_to_string(&path).map_err(|e| BinderyError::io(&path, e))?;
            engine
                .tera
                .add_raw_template(&name, &content)
                .map_err(|e| BinderyError::Render(describe(e)))?;
            debug!(template = %name, "loaded template override");
        }

        Ok(engine)
    }

    /// Layout names currently registered (built-in + overrides).
    pub fn layouts(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tera
            .get_template_names()
            .filter_map(|n| n.strip_suffix(".html").map(str::to_string))
            .collect();
        names.sort();
        names
    }
}

impl Decorator for TemplateEngine {
    fn render(&self, layout: &str, ctx: &DecorationContext<'_>) -> Result<String> {
        let template = format!("{layout}.html");

        let mut tctx = tera::Context::new();
        tctx.insert(
            "content",
            ctx.item.parsed_content.as_deref().unwrap_or_default(),
        );
        tctx.insert(
            "title",
            ctx.item.display_title().unwrap_or(&ctx.book.title),
        );
        tctx.insert("outline", &ctx.item.outline);
        tctx.insert("book", ctx.book);
        tctx.insert("extra", &ctx.item.config.extra);

        self.tera.render(&template, &tctx).map_err(|e| {
            if matches!(e.kind, tera::ErrorKind::TemplateNotFound(_)) {
                BinderyError::TemplateNotFound {
                    name: layout.to_string(),
                }
            } else {
                BinderyError::Render(describe(e))
            }
        })
    }
}

/// Flatten a tera error and its source chain into one message.
fn describe(err: tera::Error) -> String {
    let mut msg = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(s) = source {
        msg.push_str(": ");
        msg.push_str(&s.to_string());
        source = s.source();
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_shared::{BookMeta, Item, ItemConfig};
    use std::path::PathBuf;

    fn book() -> BookMeta {
        BookMeta {
            title: "The Book".into(),
            author: Some("A. Writer".into()),
            language: "en".into(),
        }
    }

    fn parsed_item(html: &str) -> Item {
        Item::new("raw", ItemConfig::default()).with_parsed(html, vec![])
    }

    fn render(engine: &TemplateEngine, layout: &str, item: &Item, book: &BookMeta) -> Result<String> {
        engine.render(layout, &DecorationContext { item, book })
    }

    #[test]
    fn chapter_layout_wraps_content_unescaped() {
        let engine = TemplateEngine::new().unwrap();
        let item = parsed_item("<h1 id=\"x\">X</h1>\n<p>Body &amp; more.</p>");
        let book = book();

        let out = render(&engine, "chapter", &item, &book).unwrap();
        assert!(out.contains("<section class=\"chapter\">"));
        // `content | safe` must not re-escape the parsed HTML.
        assert!(out.contains("<p>Body &amp; more.</p>"));
    }

    #[test]
    fn cover_layout_uses_title_and_author() {
        let engine = TemplateEngine::new().unwrap();
        let mut item = parsed_item("<p>2nd edition</p>");
        item.config.title = Some("Field Notes".into());
        let book = book();

        let out = render(&engine, "cover", &item, &book).unwrap();
        assert!(out.contains("<h1>Field Notes</h1>"));
        assert!(out.contains("A. Writer"));
    }

    #[test]
    fn cover_title_falls_back_to_book_title() {
        let engine = TemplateEngine::new().unwrap();
        let item = parsed_item("<p></p>");
        let book = book();

        let out = render(&engine, "cover", &item, &book).unwrap();
        assert!(out.contains("<h1>The Book</h1>"));
    }

    #[test]
    fn unknown_layout_is_template_not_found() {
        let engine = TemplateEngine::new().unwrap();
        let item = parsed_item("<p>x</p>");
        let book = book();

        let err = render(&engine, "sidebar", &item, &book).unwrap_err();
        assert!(matches!(
            err,
            BinderyError::TemplateNotFound { ref name } if name == "sidebar"
        ));
    }

    #[test]
    fn titles_are_escaped_content_is_not() {
        let engine = TemplateEngine::new().unwrap();
        let mut item = parsed_item("<em>ok</em>");
        item.config.title = Some("Nuts & Bolts".into());
        let book = book();

        let out = render(&engine, "cover", &item, &book).unwrap();
        assert!(out.contains("Nuts &amp; Bolts"));
        assert!(out.contains("<em>ok</em>"));
    }

    fn temp_templates() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "bindery-decorator-test-{}",
            std::process::id()
        ));
        let dir = dir.join(uuid_like());
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    // Unique-enough suffix without pulling uuid into this crate's dev-deps.
    fn uuid_like() -> String {
        use std::time::{SystemTime, UNIX_EPOCH};
        format!(
            "{}",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        )
    }

    #[test]
    fn overrides_replace_builtins_and_add_layouts() {
        let dir = temp_templates();
        std::fs::write(
            dir.join("chapter.html"),
            "<article>{{ content | safe }}</article>\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("appendix.html"),
            "<aside data-edition=\"{{ extra.edition }}\">{{ content | safe }}</aside>\n",
        )
        .unwrap();

        let engine = TemplateEngine::with_overrides(&dir).unwrap();
        let mut item = parsed_item("<p>x</p>");
        item.config
            .extra
            .insert("edition".into(), toml::Value::String("2nd".into()));
        let book = book();

        let out = render(&engine, "chapter", &item, &book).unwrap();
        assert!(out.contains("<article>"));

        let out = render(&engine, "appendix", &item, &book).unwrap();
        assert!(out.contains("data-edition=\"2nd\""));

        assert!(engine.layouts().contains(&"appendix".to_string()));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_overrides_dir_is_fine() {
        let ghost = std::env::temp_dir().join("bindery-decorator-missing").join(uuid_like());
        let engine = TemplateEngine::with_overrides(&ghost).unwrap();
        assert!(engine.layouts().contains(&"chapter".to_string()));
    }
}
