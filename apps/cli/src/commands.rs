//! CLI command definitions, routing, and tracing setup.

use std::io::{IsTerminal, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use bindery_convert::{NoPrompt, PathPrompt, PrinceEngine, describe_attempts, locate_engine};
use bindery_core::{EventBus, ProgressReporter, PublishOptions, PublishResult, publish};
use bindery_decorator::TemplateEngine;
use bindery_parser::MarkdownParser;
use bindery_shared::{
    AppConfig, BinderyError, init_config, load_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// bindery — bind Markdown chapters into a paginated book.
#[derive(Parser)]
#[command(
    name = "bindery",
    version,
    about = "Publish a directory of Markdown chapters as a single PDF.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build a book directory into a PDF.
    Build {
        /// Book directory (contains bindery.toml and chapter sources).
        book_dir: PathBuf,

        /// Output artifact path (defaults to <book_dir>/book.pdf).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Conversion engine binary, overriding config and search paths.
        #[arg(long)]
        engine: Option<PathBuf>,

        /// Write a JSON build report here after a successful run.
        #[arg(long)]
        report: Option<PathBuf>,

        /// Never prompt, even on an interactive terminal.
        #[arg(long)]
        no_input: bool,
    },

    /// Check the environment: config files and engine resolution.
    Doctor,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "bindery=info",
        1 => "bindery=debug",
        _ => "bindery=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Build {
            book_dir,
            out,
            engine,
            report,
            no_input,
        } => cmd_build(&book_dir, out, engine, report, no_input),
        Command::Doctor => cmd_doctor(),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// build
// ---------------------------------------------------------------------------

fn cmd_build(
    book_dir: &PathBuf,
    out: Option<PathBuf>,
    engine: Option<PathBuf>,
    report: Option<PathBuf>,
    no_input: bool,
) -> Result<()> {
    let mut config = load_config().map_err(fail)?;
    if let Some(engine) = &engine {
        config.converter.engine_path = Some(engine.to_string_lossy().to_string());
    }

    let output_path = out.unwrap_or_else(|| book_dir.join("book.pdf"));

    // Resolve the engine up front so a misconfigured environment fails
    // before any chapter work happens.
    let engine_path = resolve_engine(&config, no_input).map_err(fail)?;
    let converter = PrinceEngine::new(engine_path);

    let parser = MarkdownParser::new();
    let decorator = TemplateEngine::with_overrides(&book_dir.join("templates")).map_err(fail)?;

    // Extension point: hooks around each phase register here.
    let bus = EventBus::new();

    let opts = PublishOptions {
        book_dir: book_dir.clone(),
        output_path,
        app: config,
        scratch_root: None,
        report_path: report,
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    info!(book_dir = %book_dir.display(), "building book");

    let reporter = CliProgress::new();
    let result = publish(&opts, &parser, &decorator, &converter, &bus, &reporter).map_err(fail)?;

    print_diagnostics(&result);

    println!();
    println!("  Book published successfully!");
    println!("  Chapters:    {}", result.chapter_count);
    println!("  Output:      {}", result.output_path.display());
    println!("  Diagnostics: {}", result.diagnostics.len());
    println!("  Time:        {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

/// Engine diagnostics are informational: print them all, fail on none.
fn print_diagnostics(result: &PublishResult) {
    if result.diagnostics.is_empty() {
        return;
    }
    println!();
    println!("  Engine diagnostics:");
    for diagnostic in &result.diagnostics {
        println!("    {diagnostic}");
    }
}

fn resolve_engine(config: &AppConfig, no_input: bool) -> bindery_shared::Result<PathBuf> {
    if no_input || !std::io::stdin().is_terminal() {
        locate_engine(&config.converter, &NoPrompt)
    } else {
        locate_engine(&config.converter, &InteractivePrompt)
    }
}

/// Map a pipeline error onto the process exit code contract: configuration
/// problems (including an unavailable engine) exit 2, everything else
/// propagates as a build failure (exit 1).
fn fail(err: BinderyError) -> color_eyre::eyre::Report {
    if matches!(err, BinderyError::ConversionUnavailable(_)) {
        eprintln!(
            "The conversion engine could not be started. Install a Prince-compatible\n\
             HTML-to-PDF engine, or point bindery at one with [converter] engine_path\n\
             in ~/.bindery/bindery.toml or --engine <path>."
        );
        eprintln!("{err}");
        std::process::exit(2);
    }
    if err.is_config() {
        eprintln!("{err}");
        std::process::exit(2);
    }
    eyre!(err)
}

// ---------------------------------------------------------------------------
// Interactive engine prompt
// ---------------------------------------------------------------------------

/// Asks for the engine path on the terminal when resolution fails.
struct InteractivePrompt;

impl PathPrompt for InteractivePrompt {
    fn prompt_engine_path(
        &self,
        engine_name: &str,
        attempted: &[PathBuf],
    ) -> bindery_shared::Result<Option<String>> {
        eprintln!("Could not find the `{engine_name}` conversion engine. Looked in:");
        eprintln!("{}", describe_attempts(attempted));
        eprint!("Path to {engine_name} (empty to abort): ");
        std::io::stderr()
            .flush()
            .map_err(|e| BinderyError::io("stderr", e))?;

        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .map_err(|e| BinderyError::io("stdin", e))?;

        let answer = line.trim();
        if answer.is_empty() {
            Ok(None)
        } else {
            Ok(Some(answer.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn chapter_parsed(&self, title: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Parsing [{current}/{total}] {title}"));
    }

    fn chapter_decorated(&self, title: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Decorating [{current}/{total}] {title}"));
    }

    fn done(&self, _result: &PublishResult) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// doctor / config
// ---------------------------------------------------------------------------

fn cmd_doctor() -> Result<()> {
    let config = load_config().map_err(fail)?;

    match bindery_shared::config_file_path() {
        Ok(path) if path.exists() => println!("Config file:  {}", path.display()),
        Ok(path) => println!("Config file:  {} (not present, using defaults)", path.display()),
        Err(e) => println!("Config file:  unavailable ({e})"),
    }

    match locate_engine(&config.converter, &NoPrompt) {
        Ok(path) => {
            println!("Engine:       {}", path.display());
            match bindery_convert::engine_version(&path) {
                Ok(version) => println!("Version:      {version}"),
                Err(e) => println!("Version:      check failed ({e})"),
            }
        }
        Err(e) => {
            println!("Engine:       not found");
            println!("              {e}");
        }
    }

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config().map_err(fail)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config().map_err(fail)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
