//! Conversion engine location policy.
//!
//! Resolution order: explicit configured path → configured search
//! directories → `$PATH` scan → interactive prompt (only when the
//! environment offers one) → a config error describing how to set the path
//! explicitly.

use std::path::PathBuf;

use tracing::{debug, info};

use bindery_shared::{BinderyError, ConverterConfig, Result};

/// Asks the user for the engine path when automatic resolution fails.
///
/// Implementations return `Ok(None)` when no interactive answer is possible
/// (non-interactive environment, or the user declined).
pub trait PathPrompt {
    fn prompt_engine_path(&self, engine_name: &str, attempted: &[PathBuf]) -> Result<Option<String>>;
}

/// Prompt for non-interactive environments: never asks, never answers.
pub struct NoPrompt;

impl PathPrompt for NoPrompt {
    fn prompt_engine_path(&self, _: &str, _: &[PathBuf]) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Locate the conversion engine binary.
pub fn locate_engine(config: &ConverterConfig, prompt: &dyn PathPrompt) -> Result<PathBuf> {
    // 1. Explicit configuration wins, and must be valid.
    if let Some(configured) = &config.engine_path {
        let path = PathBuf::from(configured);
        if path.is_file() {
            info!(path = %path.display(), "using configured engine path");
            return Ok(path);
        }
        return Err(BinderyError::config(format!(
            "configured engine path does not exist: {configured}"
        )));
    }

    // 2. Known locations, then $PATH.
    let mut attempted = Vec::new();
    let candidates = search_dirs(config);
    if let Some(found) = locate_in_dirs(&candidates, &config.engine_name, &mut attempted) {
        info!(path = %found.display(), "engine found in search paths");
        return Ok(found);
    }

    // 3. Ask, if anyone is listening.
    if let Some(answer) = prompt.prompt_engine_path(&config.engine_name, &attempted)? {
        let path = PathBuf::from(answer.trim());
        if path.is_file() {
            info!(path = %path.display(), "using engine path from prompt");
            return Ok(path);
        }
        return Err(BinderyError::config(format!(
            "no engine at the given path: {}",
            path.display()
        )));
    }

    // 4. Fail with actionable guidance.
    Err(BinderyError::config(format!(
        "could not locate the `{name}` conversion engine. Set [converter] engine_path \
         in ~/.bindery/bindery.toml or pass --engine <path>.",
        name = config.engine_name
    )))
}

/// Configured search directories followed by the entries of `$PATH`.
fn search_dirs(config: &ConverterConfig) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = config.search_paths.iter().map(PathBuf::from).collect();
    if let Some(path_var) = std::env::var_os("PATH") {
        dirs.extend(std::env::split_paths(&path_var));
    }
    dirs
}

/// First `dir/<name>` that exists as a file, recording every miss.
fn locate_in_dirs(dirs: &[PathBuf], name: &str, attempted: &mut Vec<PathBuf>) -> Option<PathBuf> {
    for dir in dirs {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        debug!(path = %candidate.display(), "engine not at candidate path");
        attempted.push(candidate);
    }
    None
}

/// Render the attempted locations for user-facing guidance.
pub fn describe_attempts(attempted: &[PathBuf]) -> String {
    attempted
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}
