//! Chapter frontmatter: an optional `+++`-fenced TOML block at the top of a
//! chapter file carrying per-item settings (`title`, `layout`, `[extra]`).

use std::collections::BTreeMap;

use serde::Deserialize;

use bindery_shared::{BinderyError, Result};

/// Fence line delimiting the frontmatter block.
const FENCE: &str = "+++";

/// Parsed frontmatter fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrontMatter {
    /// Display title override.
    #[serde(default)]
    pub title: Option<String>,
    /// Decoration layout override.
    #[serde(default)]
    pub layout: Option<String>,
    /// Free-form template variables.
    #[serde(default)]
    pub extra: BTreeMap<String, toml::Value>,
}

/// Split a chapter source into its frontmatter (if any) and body.
///
/// The frontmatter block must start on the very first line. An opening fence
/// without a closing one, or TOML that does not parse, is a parse error.
pub fn split_frontmatter(raw: &str) -> Result<(Option<FrontMatter>, &str)> {
    let Some(rest) = strip_fence_line(raw) else {
        return Ok((None, raw));
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']).trim() == FENCE {
            let toml_src = &rest[..offset];
            let body = &rest[offset + line.len()..];
            let front: FrontMatter = toml::from_str(toml_src)
                .map_err(|e| BinderyError::parse(format!("malformed frontmatter: {e}")))?;
            return Ok((Some(front), body));
        }
        offset += line.len();
    }

    Err(BinderyError::parse(
        "unterminated frontmatter block (missing closing '+++')",
    ))
}

/// If the input starts with a fence line, return everything after it.
fn strip_fence_line(raw: &str) -> Option<&str> {
    let first_line_end = raw.find('\n')?;
    let first_line = raw[..first_line_end].trim_end_matches('\r').trim();
    if first_line == FENCE {
        Some(&raw[first_line_end + 1..])
    } else {
        None
    }
}
