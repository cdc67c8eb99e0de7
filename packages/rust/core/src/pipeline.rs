//! The staged publishing pipeline: parse → decorate → assemble → convert.
//!
//! [`PipelineController`] drives the two transformation phases over the item
//! collection, threading each chapter as an explicit active value through
//! pre-hook → adapter call → post-hook → collection. The [`publish`] driver
//! runs a whole book end to end.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, instrument};

use bindery_shared::{
    AppConfig, BinderyError, BookMeta, Diagnostic, Item, OutlineEntry, Result, RunId,
};

use crate::assembler::{self, AssembleConfig, Converter};
use crate::events::{EventBus, PhaseEvent};
use crate::project;
use crate::store::ItemStore;

// ---------------------------------------------------------------------------
// Adapter interfaces
// ---------------------------------------------------------------------------

/// Output of the Content Parser Adapter for one item.
#[derive(Debug, Clone)]
pub struct ParsedContent {
    /// Structured (HTML) content.
    pub html: String,
    /// Heading outline extracted during parsing.
    pub outline: Vec<OutlineEntry>,
}

/// Content Parser Adapter: raw markup in, structured content + outline out.
pub trait ContentParser {
    fn parse(&self, raw: &str) -> Result<ParsedContent>;
}

/// Everything a decoration template may read for one item.
#[derive(Debug, Clone, Copy)]
pub struct DecorationContext<'a> {
    /// The item being decorated (post-parse, post-pre-hook snapshot).
    pub item: &'a Item,
    /// Book-level metadata shared by every chapter.
    pub book: &'a BookMeta,
}

/// Decorator Adapter: layout name + item context in, rendered markup out.
pub trait Decorator {
    fn render(&self, layout: &str, ctx: &DecorationContext<'_>) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after a chapter clears the Parse phase.
    fn chapter_parsed(&self, title: &str, current: usize, total: usize);
    /// Called after a chapter clears the Decorate phase.
    fn chapter_decorated(&self, title: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &PublishResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn chapter_parsed(&self, _title: &str, _current: usize, _total: usize) {}
    fn chapter_decorated(&self, _title: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &PublishResult) {}
}

// ---------------------------------------------------------------------------
// Pipeline controller
// ---------------------------------------------------------------------------

/// Orchestrates the phase sequence over the item collection.
///
/// Items are processed strictly sequentially. For each item the controller
/// seeds the active value, lets pre-hooks read and rewrite it, feeds the
/// effective value to the adapter, lets post-hooks rewrite the result, and
/// appends the read-back value to the phase output. The output replaces the
/// store's collection only after every item succeeded, so an adapter or hook
/// failure on item *k* leaves the pre-run collection untouched.
pub struct PipelineController<'a> {
    parser: &'a dyn ContentParser,
    decorator: &'a dyn Decorator,
    bus: &'a EventBus,
    book: &'a BookMeta,
    progress: &'a dyn ProgressReporter,
}

impl<'a> PipelineController<'a> {
    pub fn new(
        parser: &'a dyn ContentParser,
        decorator: &'a dyn Decorator,
        bus: &'a EventBus,
        book: &'a BookMeta,
        progress: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            parser,
            decorator,
            bus,
            book,
            progress,
        }
    }

    /// Run the Parse phase over every item, in order.
    ///
    /// Per item: PRE_PARSE hooks → parser adapter on the effective input's
    /// original content → POST_PARSE hooks → append to the output. An empty
    /// collection is a legal no-op and dispatches no hooks.
    #[instrument(skip_all, fields(items = store.len()))]
    pub fn run_parse_phase(&self, store: &mut ItemStore) -> Result<()> {
        let total = store.len();
        let mut output = Vec::with_capacity(total);

        for (idx, item) in store.items().iter().enumerate() {
            let mut active = item.clone();
            self.bus.dispatch(PhaseEvent::PreParse, &mut active)?;

            let parsed = self.parser.parse(&active.original_content)?;
            let mut active = active.with_parsed(parsed.html, parsed.outline);

            self.bus.dispatch(PhaseEvent::PostParse, &mut active)?;

            self.progress.chapter_parsed(
                active.display_title().unwrap_or("untitled"),
                idx + 1,
                total,
            );
            output.push(active);
        }

        store.replace(output);
        info!(items = total, "parse phase complete");
        Ok(())
    }

    /// Run the Decorate phase over every item, in order.
    ///
    /// Template selection is keyed by each item's `config.layout`. An item
    /// reaching this phase without parsed content (including one swapped in
    /// by a PRE_DECORATE hook) fails the whole phase.
    #[instrument(skip_all, fields(items = store.len()))]
    pub fn run_decorate_phase(&self, store: &mut ItemStore) -> Result<()> {
        let total = store.len();
        let mut output = Vec::with_capacity(total);

        for (idx, item) in store.items().iter().enumerate() {
            let mut active = item.clone();
            self.bus.dispatch(PhaseEvent::PreDecorate, &mut active)?;

            if !active.has_parsed_content() {
                return Err(BinderyError::validation(format!(
                    "chapter {} entered the decorate phase without parsed content",
                    describe_item(&active, idx),
                )));
            }

            let layout = active.config.layout.clone();
            let ctx = DecorationContext {
                item: &active,
                book: self.book,
            };
            let rendered = self.decorator.render(&layout, &ctx)?;
            let mut active = active.with_decorated(rendered);

            self.bus.dispatch(PhaseEvent::PostDecorate, &mut active)?;

            self.progress.chapter_decorated(
                active.display_title().unwrap_or("untitled"),
                idx + 1,
                total,
            );
            output.push(active);
        }

        store.replace(output);
        info!(items = total, "decorate phase complete");
        Ok(())
    }
}

fn describe_item(item: &Item, idx: usize) -> String {
    match (&item.source_path, item.display_title()) {
        (Some(path), _) => path.display().to_string(),
        (None, Some(title)) => format!("\"{title}\""),
        (None, None) => format!("#{}", idx + 1),
    }
}

// ---------------------------------------------------------------------------
// End-to-end publish
// ---------------------------------------------------------------------------

/// Configuration for one [`publish`] run.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Book directory (contains `bindery.toml` and chapter sources).
    pub book_dir: PathBuf,
    /// Final artifact location.
    pub output_path: PathBuf,
    /// Resolved user configuration.
    pub app: AppConfig,
    /// Scratch root override; defaults to the OS temp directory.
    pub scratch_root: Option<PathBuf>,
    /// Where to write the JSON build report, when requested.
    pub report_path: Option<PathBuf>,
    /// Tool version string.
    pub tool_version: String,
}

/// Result of a completed publish run.
#[derive(Debug)]
pub struct PublishResult {
    /// Run identifier (also names the scratch directory).
    pub run_id: RunId,
    /// Final artifact location.
    pub output_path: PathBuf,
    /// Number of chapters published.
    pub chapter_count: usize,
    /// Engine diagnostics, in the order the engine produced them.
    pub diagnostics: Vec<Diagnostic>,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Run the full publishing pipeline for one book.
///
/// 1. Load the book manifest and chapter sources
/// 2. Parse phase (markup → structured content + outline)
/// 3. Decorate phase (structured content → rendered sections)
/// 4. Assemble the composite document and convert it to the final artifact
#[instrument(skip_all, fields(book_dir = %opts.book_dir.display(), output = %opts.output_path.display()))]
pub fn publish(
    opts: &PublishOptions,
    parser: &dyn ContentParser,
    decorator: &dyn Decorator,
    converter: &dyn Converter,
    bus: &EventBus,
    progress: &dyn ProgressReporter,
) -> Result<PublishResult> {
    let start = Instant::now();
    let run_id = RunId::new();

    info!(%run_id, "starting publish pipeline");

    // --- Phase 1: Load ---
    progress.phase("Loading book");
    let book = project::load_book(&opts.book_dir, &opts.app)?;
    let book_meta = book.config.book.clone();
    let mut store = ItemStore::new(book.items);

    if store.is_empty() {
        return Err(BinderyError::validation(format!(
            "no chapters found in {}",
            opts.book_dir.display()
        )));
    }

    // --- Phases 2 & 3: Parse, Decorate ---
    let controller = PipelineController::new(parser, decorator, bus, &book_meta, progress);

    progress.phase("Parsing chapters");
    controller.run_parse_phase(&mut store)?;

    progress.phase("Decorating chapters");
    controller.run_decorate_phase(&mut store)?;

    // --- Phase 4: Assemble & convert ---
    progress.phase("Assembling and converting");
    let book_title = book_meta.title.clone();
    let assemble_config = AssembleConfig {
        book: book_meta,
        output_path: opts.output_path.clone(),
        include_default_styles: book.include_default_styles,
        custom_stylesheets: book.custom_stylesheets,
        toc: book.config.toc.clone(),
        scratch_root: opts.scratch_root.clone(),
        run_id: run_id.clone(),
    };
    let items = store.into_items();
    let outcome = assembler::assemble_and_convert(&assemble_config, &items, converter)?;

    let result = PublishResult {
        run_id: run_id.clone(),
        output_path: outcome.output_path.clone(),
        chapter_count: items.len(),
        diagnostics: outcome.diagnostics.clone(),
        elapsed: start.elapsed(),
    };

    if let Some(report_path) = &opts.report_path {
        let report = bindery_shared::BuildReport {
            run_id,
            title: book_title,
            chapter_count: result.chapter_count,
            output_path: result.output_path.clone(),
            artifact_sha256: outcome.artifact_sha256,
            diagnostics: result.diagnostics.clone(),
            tool_version: opts.tool_version.clone(),
            completed_at: chrono::Utc::now(),
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| BinderyError::validation(format!("report serialization failed: {e}")))?;
        std::fs::write(report_path, json).map_err(|e| BinderyError::io(report_path, e))?;
        info!(path = %report_path.display(), "wrote build report");
    }

    progress.done(&result);

    info!(
        run_id = %result.run_id,
        chapters = result.chapter_count,
        diagnostics = result.diagnostics.len(),
        elapsed_ms = result.elapsed.as_millis(),
        "publish pipeline complete"
    );

    Ok(result)
}
