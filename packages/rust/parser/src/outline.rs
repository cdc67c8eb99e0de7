//! Heading outline extraction and anchor injection.
//!
//! Walks the Markdown event stream once to collect heading text, assigns
//! each heading a unique anchor slug, rewrites the heading events to carry
//! that anchor as an `id`, and renders the final HTML.

use std::collections::HashMap;
use std::sync::LazyLock;

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd, html};
use regex::Regex;

use bindery_shared::OutlineEntry;

static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Render Markdown to HTML with heading anchors, returning the HTML and the
/// extracted outline.
pub fn render_with_outline(raw: &str, options: Options) -> (String, Vec<OutlineEntry>) {
    let mut events: Vec<Event> = Parser::new_ext(raw, options).collect();

    let headings = collect_headings(&events);
    let mut outline = Vec::with_capacity(headings.len());

    for heading in &headings {
        if let Event::Start(Tag::Heading { id, .. }) = &mut events[heading.event_idx] {
            *id = Some(heading.anchor.clone().into());
        }
        outline.push(OutlineEntry {
            level: heading.level,
            title: heading.title.clone(),
            anchor: heading.anchor.clone(),
        });
    }

    let mut out = String::with_capacity(raw.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    (out, outline)
}

struct HeadingRecord {
    event_idx: usize,
    level: u8,
    title: String,
    anchor: String,
}

/// Scan the event stream for headings, capturing their text and assigning
/// unique anchors. Explicit `{#id}` attributes are kept as-is.
fn collect_headings(events: &[Event]) -> Vec<HeadingRecord> {
    let mut records = Vec::new();
    let mut used: HashMap<String, usize> = HashMap::new();

    let mut idx = 0;
    while idx < events.len() {
        if let Event::Start(Tag::Heading { level, id, .. }) = &events[idx] {
            let explicit = id.as_ref().map(|s| s.to_string());
            let level = *level as u8;

            let mut title = String::new();
            let mut end = idx + 1;
            while end < events.len() {
                match &events[end] {
                    Event::End(TagEnd::Heading(_)) => break,
                    Event::Text(text) | Event::Code(text) => title.push_str(text),
                    Event::SoftBreak | Event::HardBreak => title.push(' '),
                    _ => {}
                }
                end += 1;
            }
            let title = title.trim().to_string();

            let anchor = explicit.unwrap_or_else(|| unique_anchor(&title, &mut used));
            records.push(HeadingRecord {
                event_idx: idx,
                level,
                title,
                anchor,
            });
            idx = end;
        }
        idx += 1;
    }

    records
}

/// Slugify heading text, suffixing duplicates with `-2`, `-3`, …
fn unique_anchor(title: &str, used: &mut HashMap<String, usize>) -> String {
    let base = slugify(title);
    let count = used.entry(base.clone()).or_insert(0);
    *count += 1;
    if *count == 1 {
        base
    } else {
        format!("{base}-{count}")
    }
}

/// Lowercase, non-alphanumeric runs collapsed to single dashes.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let slug = NON_SLUG.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(raw: &str) -> (String, Vec<OutlineEntry>) {
        render_with_outline(raw, crate::default_options())
    }

    #[test]
    fn extracts_outline_with_levels_and_anchors() {
        let (html, outline) = render("# Intro\n\n## Scope\n\ntext\n\n### Detail\n");
        assert_eq!(outline.len(), 3);
        assert_eq!(outline[0].level, 1);
        assert_eq!(outline[0].anchor, "intro");
        assert_eq!(outline[1].level, 2);
        assert_eq!(outline[2].title, "Detail");
        assert!(html.contains("<h1 id=\"intro\">Intro</h1>"));
        assert!(html.contains("<h2 id=\"scope\">Scope</h2>"));
    }

    #[test]
    fn duplicate_headings_get_unique_anchors() {
        let (_html, outline) = render("## Usage\n\n## Usage\n\n## Usage\n");
        let anchors: Vec<_> = outline.iter().map(|e| e.anchor.as_str()).collect();
        assert_eq!(anchors, ["usage", "usage-2", "usage-3"]);
    }

    #[test]
    fn inline_markup_is_stripped_from_titles() {
        let (_html, outline) = render("# Using `bindery` *well*\n");
        assert_eq!(outline[0].title, "Using bindery well");
        assert_eq!(outline[0].anchor, "using-bindery-well");
    }

    #[test]
    fn explicit_heading_ids_are_preserved() {
        let (html, outline) = render("# Intro {#opening}\n");
        assert_eq!(outline[0].anchor, "opening");
        assert!(html.contains("id=\"opening\""));
    }

    #[test]
    fn slugify_normalizes_punctuation_and_case() {
        assert_eq!(slugify("Getting Started"), "getting-started");
        assert_eq!(slugify("  API — Reference!  "), "api-reference");
        assert_eq!(slugify("Notes_and_Queries"), "notes-and-queries");
        assert_eq!(slugify("!!!"), "section");
    }

    #[test]
    fn tables_are_rendered() {
        let (html, _outline) = render("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }
}
