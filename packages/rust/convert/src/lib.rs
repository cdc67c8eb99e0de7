//! External conversion engine adapter.
//!
//! Implements the pipeline's [`Converter`] interface by invoking a
//! Prince-compatible HTML-to-PDF engine as a subprocess
//! (`<engine> -s <css>… <input> -o <output>`) and translating its stderr
//! into [`Diagnostic`]s. Locating the engine binary lives in [`locator`].

pub mod locator;

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, instrument, warn};

use bindery_core::Converter;
use bindery_shared::{BinderyError, Diagnostic, Result, Severity};

pub use locator::{NoPrompt, PathPrompt, describe_attempts, locate_engine};

/// A Prince-compatible conversion engine invoked as a subprocess.
#[derive(Debug, Clone)]
pub struct PrinceEngine {
    binary: PathBuf,
}

impl PrinceEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Name used to strip the engine's own prefix from stderr lines.
    fn program_name(&self) -> String {
        self.binary
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

impl Converter for PrinceEngine {
    #[instrument(skip_all, fields(engine = %self.binary.display(), input = %input.display()))]
    fn convert(
        &self,
        input: &Path,
        stylesheets: &[PathBuf],
        output: &Path,
    ) -> Result<Vec<Diagnostic>> {
        let mut cmd = Command::new(&self.binary);
        for sheet in stylesheets {
            cmd.arg("-s").arg(sheet);
        }
        cmd.arg(input).arg("-o").arg(output);

        debug!(?cmd, "invoking conversion engine");

        let out = cmd.output().map_err(|e| {
            BinderyError::ConversionUnavailable(format!(
                "could not start {}: {e}",
                self.binary.display()
            ))
        })?;

        let stderr = String::from_utf8_lossy(&out.stderr);
        let diagnostics = parse_engine_output(&self.program_name(), &stderr);

        if !out.status.success() {
            warn!(status = %out.status, "engine reported failure");
            return Err(BinderyError::ConversionFailed(format!(
                "engine exited with {}: {}",
                out.status,
                last_lines(&stderr, 5)
            )));
        }

        let usable = std::fs::metadata(output)
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if !usable {
            return Err(BinderyError::ConversionFailed(format!(
                "engine exited successfully but produced no output at {}",
                output.display()
            )));
        }

        info!(diagnostics = diagnostics.len(), "conversion engine finished");
        Ok(diagnostics)
    }
}

/// Check that the engine binary answers `--version`; returns the first
/// output line.
pub fn engine_version(binary: &Path) -> Result<String> {
    let out = Command::new(binary).arg("--version").output().map_err(|e| {
        BinderyError::ConversionUnavailable(format!("could not start {}: {e}", binary.display()))
    })?;

    if !out.status.success() {
        return Err(BinderyError::ConversionUnavailable(format!(
            "{} --version exited with {}",
            binary.display(),
            out.status
        )));
    }

    let stdout = String::from_utf8_lossy(&out.stdout);
    Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
}

// ---------------------------------------------------------------------------
// Stderr → diagnostics
// ---------------------------------------------------------------------------

/// Parse engine stderr into diagnostics, one per non-empty line, in order.
///
/// Recognized shapes (the leading program name is optional):
/// ```text
/// prince: warning: no glyphs for U+1F600
/// prince: book.html:12: error: unresolved reference
/// loaded 4 fonts
/// ```
/// Lines without a severity marker become `info` diagnostics.
pub fn parse_engine_output(program: &str, stderr: &str) -> Vec<Diagnostic> {
    stderr
        .lines()
        .filter_map(|line| parse_diagnostic_line(program, line))
        .collect()
}

fn parse_diagnostic_line(program: &str, line: &str) -> Option<Diagnostic> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let mut segments: Vec<&str> = line.split(": ").collect();
    if segments.first() == Some(&program) && segments.len() > 1 {
        segments.remove(0);
    }

    let marker = segments
        .iter()
        .position(|s| severity_for(s).is_some())
        .filter(|&i| i + 1 < segments.len());

    match marker {
        Some(i) => {
            let severity = severity_for(segments[i]).unwrap_or(Severity::Info);
            let location = if i > 0 {
                Some(segments[..i].join(": "))
            } else {
                None
            };
            Some(Diagnostic {
                severity,
                location,
                message: segments[i + 1..].join(": "),
            })
        }
        None => Some(Diagnostic {
            severity: Severity::Info,
            location: None,
            message: segments.join(": "),
        }),
    }
}

fn severity_for(token: &str) -> Option<Severity> {
    match token.to_ascii_lowercase().as_str() {
        "error" => Some(Severity::Error),
        "warning" => Some(Severity::Warning),
        "info" => Some(Severity::Info),
        _ => None,
    }
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_severity_and_location() {
        let stderr = "prince: warning: no glyphs for U+1F600\n\
                      prince: book.html:12: error: unresolved reference\n\
                      loaded 4 fonts\n";
        let diags = parse_engine_output("prince", stderr);

        assert_eq!(diags.len(), 3);

        assert_eq!(diags[0].severity, Severity::Warning);
        assert_eq!(diags[0].location, None);
        assert_eq!(diags[0].message, "no glyphs for U+1F600");

        assert_eq!(diags[1].severity, Severity::Error);
        assert_eq!(diags[1].location.as_deref(), Some("book.html:12"));
        assert_eq!(diags[1].message, "unresolved reference");

        assert_eq!(diags[2].severity, Severity::Info);
        assert_eq!(diags[2].message, "loaded 4 fonts");
    }

    #[test]
    fn preserves_line_order() {
        let stderr = "warning: first\nwarning: second\nerror: third\n";
        let diags = parse_engine_output("prince", stderr);
        let messages: Vec<_> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, ["first", "second", "third"]);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let diags = parse_engine_output("prince", "\n\n  \nwarning: only one\n\n");
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn severity_token_needs_a_message() {
        // A bare trailing "error" is not a marker, just text.
        let diags = parse_engine_output("prince", "something ended with: error\n");
        assert_eq!(diags[0].severity, Severity::Info);
    }

    #[test]
    fn spawn_failure_is_conversion_unavailable() {
        let engine = PrinceEngine::new("/nonexistent/bindery-test-engine");
        let err = engine
            .convert(Path::new("in.html"), &[], Path::new("out.pdf"))
            .unwrap_err();
        assert!(matches!(err, BinderyError::ConversionUnavailable(_)));
    }

    #[cfg(unix)]
    mod scripted {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::path::PathBuf;

        fn temp_dir() -> PathBuf {
            let dir = std::env::temp_dir()
                .join(format!("bindery-convert-test-{}", uuid::Uuid::now_v7()));
            std::fs::create_dir_all(&dir).unwrap();
            dir
        }

        fn install_script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-engine");
            std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
            let mut perms = std::fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).unwrap();
            path
        }

        /// Emulates an engine: echoes diagnostics on stderr and writes the
        /// file named by the argument after `-o`.
        const WRITING_ENGINE: &str = r#"
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "-o" ]; then out="$arg"; fi
  prev="$arg"
done
echo "fake-engine: warning: synthetic glyph" >&2
echo "fake-engine: page 2: error: overflow" >&2
printf '%%PDF-fake' > "$out"
exit 0
"#;

        #[test]
        fn successful_run_returns_parsed_diagnostics() {
            let dir = temp_dir();
            let engine = PrinceEngine::new(install_script(&dir, WRITING_ENGINE));
            let input = dir.join("in.html");
            std::fs::write(&input, "<html></html>").unwrap();
            let output = dir.join("out.pdf");

            let diags = engine.convert(&input, &[], &output).unwrap();
            assert_eq!(diags.len(), 2);
            assert_eq!(diags[0].severity, Severity::Warning);
            assert_eq!(diags[1].location.as_deref(), Some("page 2"));
            assert!(output.exists());

            let _ = std::fs::remove_dir_all(&dir);
        }

        #[test]
        fn nonzero_exit_is_conversion_failed() {
            let dir = temp_dir();
            let engine =
                PrinceEngine::new(install_script(&dir, "echo 'fatal: boom' >&2\nexit 3\n"));
            let input = dir.join("in.html");
            std::fs::write(&input, "x").unwrap();

            let err = engine
                .convert(&input, &[], &dir.join("out.pdf"))
                .unwrap_err();
            assert!(matches!(err, BinderyError::ConversionFailed(_)));
            assert!(err.to_string().contains("boom"));

            let _ = std::fs::remove_dir_all(&dir);
        }

        #[test]
        fn empty_output_is_conversion_failed() {
            let dir = temp_dir();
            // Exits 0 but writes nothing.
            let engine = PrinceEngine::new(install_script(&dir, "exit 0\n"));
            let input = dir.join("in.html");
            std::fs::write(&input, "x").unwrap();

            let err = engine
                .convert(&input, &[], &dir.join("out.pdf"))
                .unwrap_err();
            assert!(matches!(err, BinderyError::ConversionFailed(_)));
            assert!(err.to_string().contains("produced no output"));

            let _ = std::fs::remove_dir_all(&dir);
        }

        #[test]
        fn engine_version_reads_first_line() {
            let dir = temp_dir();
            let path = install_script(&dir, "echo 'FakeEngine 15.1'\nexit 0\n");
            let version = engine_version(&path).unwrap();
            assert_eq!(version, "FakeEngine 15.1");

            let _ = std::fs::remove_dir_all(&dir);
        }
    }
}
