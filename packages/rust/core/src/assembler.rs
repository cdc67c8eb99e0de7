//! Composite document assembly and conversion.
//!
//! Concatenates all decorated items into one composite HTML document inside
//! a per-run scratch directory, stages stylesheets next to it, and invokes
//! the Converter Adapter. The final artifact reaches the output path only on
//! full success.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use bindery_shared::{BinderyError, BookMeta, Diagnostic, Item, Result, RunId, TocConfig};

use crate::toc;

/// Generated default stylesheet shipped with the tool.
const DEFAULT_STYLESHEET: &str = include_str!("../assets/default.css");

/// File name of the composite document inside the scratch directory.
const COMPOSITE_FILE_NAME: &str = "book.html";

// ---------------------------------------------------------------------------
// Converter Adapter interface
// ---------------------------------------------------------------------------

/// Converter Adapter: composite document + stylesheets in, final artifact +
/// diagnostics out.
///
/// Implementations fail with [`BinderyError::ConversionUnavailable`] when the
/// external engine cannot be located or started, and with
/// [`BinderyError::ConversionFailed`] when invocation completes without
/// producing usable output. Diagnostics are returned in production order and
/// never indicate failure by themselves.
pub trait Converter {
    fn convert(
        &self,
        input: &Path,
        stylesheets: &[PathBuf],
        output: &Path,
    ) -> Result<Vec<Diagnostic>>;
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Configuration for composite assembly and conversion.
#[derive(Debug, Clone)]
pub struct AssembleConfig {
    /// Book metadata for the document shell.
    pub book: BookMeta,
    /// Final artifact location.
    pub output_path: PathBuf,
    /// Whether the generated default stylesheet is staged.
    pub include_default_styles: bool,
    /// Custom stylesheets (absolute paths, resolved by the loader).
    pub custom_stylesheets: Vec<PathBuf>,
    /// Generated table-of-contents settings.
    pub toc: TocConfig,
    /// Scratch root override; defaults to the OS temp directory.
    pub scratch_root: Option<PathBuf>,
    /// Run identifier; makes the scratch directory unique per run.
    pub run_id: RunId,
}

/// Output from a successful assembly + conversion.
#[derive(Debug, Clone)]
pub struct ConvertOutcome {
    /// Where the artifact ended up.
    pub output_path: PathBuf,
    /// Engine diagnostics, in production order.
    pub diagnostics: Vec<Diagnostic>,
    /// Size of the composite document fed to the engine.
    pub composite_bytes: usize,
    /// SHA-256 of the final artifact.
    pub artifact_sha256: String,
}

/// Assemble the composite document and convert it to the final artifact.
///
/// The scratch directory is `bindery-<run-id>` under the scratch root, so
/// concurrent runs never collide. The artifact is written to the scratch
/// area first and moved to `config.output_path` only after the engine
/// succeeded; an aborted run leaves nothing at the final path. On success
/// the scratch directory is removed (best effort); on failure it is kept so
/// the composite can be inspected.
#[instrument(skip_all, fields(run_id = %config.run_id, items = items.len()))]
pub fn assemble_and_convert(
    config: &AssembleConfig,
    items: &[Item],
    converter: &dyn Converter,
) -> Result<ConvertOutcome> {
    for (idx, item) in items.iter().enumerate() {
        if item.decorated_content.is_none() {
            return Err(BinderyError::validation(format!(
                "item #{} reached assembly without decorated content",
                idx + 1
            )));
        }
    }

    let scratch = scratch_dir(config);
    std::fs::create_dir_all(&scratch).map_err(|e| BinderyError::io(&scratch, e))?;
    info!(path = %scratch.display(), "assembling composite document");

    // Stage stylesheets: generated default first, then custom in order.
    let mut stylesheets = Vec::new();
    if config.include_default_styles {
        let default_css = scratch.join("default.css");
        std::fs::write(&default_css, DEFAULT_STYLESHEET)
            .map_err(|e| BinderyError::io(&default_css, e))?;
        stylesheets.push(default_css);
    }
    for sheet in &config.custom_stylesheets {
        if !sheet.exists() {
            return Err(BinderyError::config(format!(
                "custom stylesheet not found: {}",
                sheet.display()
            )));
        }
        stylesheets.push(sheet.clone());
    }

    // Compose and write the single document.
    let composite = compose_document(config, items);
    let composite_path = scratch.join(COMPOSITE_FILE_NAME);
    std::fs::write(&composite_path, &composite)
        .map_err(|e| BinderyError::io(&composite_path, e))?;
    debug!(bytes = composite.len(), sections = items.len(), "composite written");

    // Convert into the scratch area, then move into place.
    let scratch_output = scratch.join(artifact_file_name(&config.output_path));
    let diagnostics = converter.convert(&composite_path, &stylesheets, &scratch_output)?;

    let artifact = std::fs::read(&scratch_output).map_err(|e| BinderyError::io(&scratch_output, e))?;
    let mut hasher = Sha256::new();
    hasher.update(&artifact);
    let artifact_sha256 = format!("{:x}", hasher.finalize());

    move_artifact(&scratch_output, &config.output_path)?;

    if let Err(e) = std::fs::remove_dir_all(&scratch) {
        warn!(path = %scratch.display(), error = %e, "could not remove scratch directory");
    }

    info!(
        output = %config.output_path.display(),
        diagnostics = diagnostics.len(),
        "conversion complete"
    );

    Ok(ConvertOutcome {
        output_path: config.output_path.clone(),
        diagnostics,
        composite_bytes: composite.len(),
        artifact_sha256,
    })
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Build the composite HTML document: shell, optional generated TOC section,
/// then every decorated section in collection order.
pub fn compose_document(config: &AssembleConfig, items: &[Item]) -> String {
    let mut doc = String::new();
    doc.push_str("<!DOCTYPE html>\n");
    doc.push_str(&format!(
        "<html lang=\"{}\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n",
        escape_html(&config.book.language),
        escape_html(&config.book.title)
    ));
    if let Some(author) = &config.book.author {
        doc.push_str(&format!(
            "<meta name=\"author\" content=\"{}\">\n",
            escape_html(author)
        ));
    }
    doc.push_str("</head>\n<body>\n");

    if config.toc.enabled {
        doc.push_str(&toc::render_toc_section(&config.toc, items));
        doc.push('\n');
    }

    for item in items {
        if let Some(section) = &item.decorated_content {
            doc.push_str(section);
            doc.push('\n');
        }
    }

    doc.push_str("</body>\n</html>\n");
    doc
}

/// Minimal HTML escaping for shell metadata.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ---------------------------------------------------------------------------
// Filesystem helpers
// ---------------------------------------------------------------------------

fn scratch_dir(config: &AssembleConfig) -> PathBuf {
    let root = config
        .scratch_root
        .clone()
        .unwrap_or_else(std::env::temp_dir);
    root.join(format!("bindery-{}", config.run_id))
}

fn artifact_file_name(output_path: &Path) -> String {
    output_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output.pdf".to_string())
}

/// Move the finished artifact into place. Rename when possible, copy across
/// filesystems.
fn move_artifact(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| BinderyError::io(parent, e))?;
        }
    }

    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            std::fs::copy(from, to).map_err(|e| BinderyError::io(to, e))?;
            std::fs::remove_file(from).map_err(|e| BinderyError::io(from, e))?;
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_shared::{ItemConfig, Severity};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bindery-assembler-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn decorated_item(section: &str) -> Item {
        Item::new("raw", ItemConfig::default())
            .with_parsed("<p>raw</p>", vec![])
            .with_decorated(section)
    }

    fn make_config(root: &Path) -> AssembleConfig {
        AssembleConfig {
            book: BookMeta {
                title: "Test Book".into(),
                author: Some("A. Author".into()),
                language: "en".into(),
            },
            output_path: root.join("out").join("book.pdf"),
            include_default_styles: true,
            custom_stylesheets: vec![],
            toc: TocConfig {
                enabled: false,
                ..TocConfig::default()
            },
            scratch_root: Some(root.to_path_buf()),
            run_id: RunId::new(),
        }
    }

    /// Converter stub that writes a fixed artifact and reports diagnostics.
    struct StubConverter {
        diagnostics: Vec<Diagnostic>,
    }

    impl Converter for StubConverter {
        fn convert(
            &self,
            input: &Path,
            _stylesheets: &[PathBuf],
            output: &Path,
        ) -> Result<Vec<Diagnostic>> {
            assert!(input.exists(), "composite must exist before conversion");
            std::fs::write(output, b"%PDF-stub").map_err(|e| BinderyError::io(output, e))?;
            Ok(self.diagnostics.clone())
        }
    }

    /// Converter stub that fails without producing output.
    struct UnavailableConverter;

    impl Converter for UnavailableConverter {
        fn convert(&self, _: &Path, _: &[PathBuf], _: &Path) -> Result<Vec<Diagnostic>> {
            Err(BinderyError::ConversionUnavailable(
                "engine not found".into(),
            ))
        }
    }

    fn diag(severity: Severity, message: &str) -> Diagnostic {
        Diagnostic {
            severity,
            location: None,
            message: message.into(),
        }
    }

    #[test]
    fn successful_conversion_moves_artifact_and_surfaces_diagnostics() {
        let tmp = temp_dir();
        let config = make_config(&tmp);
        let items = vec![decorated_item("<section>A</section>")];

        let converter = StubConverter {
            diagnostics: vec![
                diag(Severity::Warning, "missing glyph"),
                diag(Severity::Info, "4 pages"),
            ],
        };

        let outcome = assemble_and_convert(&config, &items, &converter).unwrap();

        assert!(config.output_path.exists());
        assert_eq!(outcome.diagnostics.len(), 2);
        // Order preserved exactly as the engine produced them.
        assert_eq!(outcome.diagnostics[0].message, "missing glyph");
        assert_eq!(outcome.diagnostics[1].message, "4 pages");
        assert_eq!(outcome.artifact_sha256.len(), 64);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn failed_conversion_leaves_no_artifact_at_output_path() {
        let tmp = temp_dir();
        let config = make_config(&tmp);
        let items = vec![decorated_item("<section>A</section>")];

        let err = assemble_and_convert(&config, &items, &UnavailableConverter).unwrap_err();
        assert!(matches!(err, BinderyError::ConversionUnavailable(_)));
        assert!(!config.output_path.exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn composite_preserves_section_order() {
        let tmp = temp_dir();
        let config = make_config(&tmp);
        let items = vec![
            decorated_item("<section>first</section>"),
            decorated_item("<section>second</section>"),
            decorated_item("<section>third</section>"),
        ];

        let doc = compose_document(&config, &items);
        let first = doc.find("first").unwrap();
        let second = doc.find("second").unwrap();
        let third = doc.find("third").unwrap();
        assert!(first < second && second < third);
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>Test Book</title>"));
        assert!(doc.contains("A. Author"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn shell_metadata_is_escaped() {
        let tmp = temp_dir();
        let mut config = make_config(&tmp);
        config.book.title = "Nuts & Bolts <2nd ed.>".into();

        let doc = compose_document(&config, &[]);
        assert!(doc.contains("<title>Nuts &amp; Bolts &lt;2nd ed.&gt;</title>"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn undecorated_item_is_a_validation_error() {
        let tmp = temp_dir();
        let config = make_config(&tmp);
        let items = vec![Item::new("raw", ItemConfig::default())];

        let err = assemble_and_convert(
            &config,
            &items,
            &StubConverter {
                diagnostics: vec![],
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("without decorated content"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_custom_stylesheet_is_a_config_error() {
        let tmp = temp_dir();
        let mut config = make_config(&tmp);
        config.custom_stylesheets = vec![tmp.join("no-such.css")];
        let items = vec![decorated_item("<section>A</section>")];

        let err = assemble_and_convert(
            &config,
            &items,
            &StubConverter {
                diagnostics: vec![],
            },
        )
        .unwrap_err();
        assert!(err.is_config());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn scratch_directories_are_unique_per_run() {
        let tmp = temp_dir();
        let a = make_config(&tmp);
        let b = make_config(&tmp);
        assert_ne!(scratch_dir(&a), scratch_dir(&b));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn default_stylesheet_is_staged_when_enabled() {
        let tmp = temp_dir();
        let config = make_config(&tmp);
        let items = vec![decorated_item("<section>A</section>")];

        struct CaptureConverter {
            seen: std::sync::Mutex<Vec<PathBuf>>,
        }
        impl Converter for CaptureConverter {
            fn convert(
                &self,
                _input: &Path,
                stylesheets: &[PathBuf],
                output: &Path,
            ) -> Result<Vec<Diagnostic>> {
                *self.seen.lock().unwrap() = stylesheets.to_vec();
                std::fs::write(output, b"%PDF-stub").map_err(|e| BinderyError::io(output, e))?;
                Ok(vec![])
            }
        }

        let converter = CaptureConverter {
            seen: std::sync::Mutex::new(vec![]),
        };
        assemble_and_convert(&config, &items, &converter).unwrap();

        let seen = converter.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].ends_with("default.css"));

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
