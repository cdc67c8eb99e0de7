//! Generated table-of-contents section.
//!
//! Nests the flat per-chapter heading outlines into a hierarchy and renders
//! the front-matter TOC section placed before the first chapter.

use tracing::debug;

use bindery_shared::{Item, OutlineEntry, TocConfig};

/// One node of the book-level table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocNode {
    pub title: String,
    pub anchor: String,
    pub children: Vec<TocNode>,
}

/// Nest the items' flat outlines into a hierarchy, keeping headings down to
/// `depth` (1 = chapter titles only).
pub fn build_toc(items: &[Item], depth: u8) -> Vec<TocNode> {
    let mut roots: Vec<TocNode> = Vec::new();
    // Parent candidates for the next entry, indexed by heading level.
    let mut stack: Vec<(u8, Vec<usize>)> = Vec::new();

    fn push_entry(roots: &mut Vec<TocNode>, path: &[usize], node: TocNode) -> usize {
        let mut siblings = roots;
        for &i in path {
            siblings = &mut siblings[i].children;
        }
        siblings.push(node);
        siblings.len() - 1
    }

    for item in items {
        // Outlines never nest across chapter boundaries.
        stack.clear();

        for entry in outline_for(item, depth) {
            let node = TocNode {
                title: entry.title.clone(),
                anchor: entry.anchor.clone(),
                children: Vec::new(),
            };

            while stack.last().is_some_and(|(level, _)| *level >= entry.level) {
                stack.pop();
            }

            let parent_path = stack.last().map(|(_, p)| p.clone()).unwrap_or_default();
            let idx = push_entry(&mut roots, &parent_path, node);

            let mut path = parent_path;
            path.push(idx);
            stack.push((entry.level, path));
        }
    }

    debug!(roots = roots.len(), "book TOC built");
    roots
}

/// Render the generated TOC as an HTML section.
pub fn render_toc_section(config: &TocConfig, items: &[Item]) -> String {
    let nodes = build_toc(items, config.depth);

    let mut html = String::from("<nav class=\"toc\">\n");
    html.push_str(&format!("<h1>{}</h1>\n", escape(&config.title)));
    render_list(&nodes, &mut html);
    html.push_str("</nav>");
    html
}

fn render_list(nodes: &[TocNode], out: &mut String) {
    if nodes.is_empty() {
        return;
    }
    out.push_str("<ol>\n");
    for node in nodes {
        out.push_str(&format!(
            "<li><a href=\"#{}\">{}</a>",
            escape(&node.anchor),
            escape(&node.title)
        ));
        render_list(&node.children, out);
        out.push_str("</li>\n");
    }
    out.push_str("</ol>\n");
}

fn outline_for(item: &Item, depth: u8) -> impl Iterator<Item = &OutlineEntry> {
    item.outline.iter().filter(move |e| e.level <= depth)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
