//! Conversion of MediaWiki-rendered HTML into flattened Markdown-ish text.
//!
//! The converter walks the parsed HTML tree once. Known block tags get a
//! Markdown rendering, navigation chrome and reference markers are dropped
//! wholesale, and every other tag is transparent: its children render as if
//! the wrapper were not there. The walk is total and never fails, whatever
//! the wiki serves.

use ego_tree::NodeRef;
use scraper::node::{Element, Node};
use scraper::Html;

/// Tags whose entire subtree is discarded.
const NOISE_TAGS: &[&str] = &["script", "style", "noscript"];

/// CSS classes marking wiki chrome rather than article content.
const NOISE_CLASSES: &[&str] = &[
    "toc",
    "mw-editsection",
    "navbox",
    "vertical-navbox",
    "catlinks",
    "metadata",
];

/// Block-level tags the converter knows how to render.
///
/// Anything not listed here falls through to [`BlockKind::Other`] and
/// renders its children transparently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Heading(u8),
    Paragraph,
    LineBreak,
    UnorderedList,
    OrderedList,
    Link,
    Table,
    BlockQuote,
    Image,
    Other,
}

impl BlockKind {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "h1" => Self::Heading(1),
            "h2" => Self::Heading(2),
            "h3" => Self::Heading(3),
            "h4" => Self::Heading(4),
            "h5" => Self::Heading(5),
            "h6" => Self::Heading(6),
            "p" => Self::Paragraph,
            "br" => Self::LineBreak,
            "ul" => Self::UnorderedList,
            "ol" => Self::OrderedList,
            "a" => Self::Link,
            "table" => Self::Table,
            "blockquote" => Self::BlockQuote,
            "img" => Self::Image,
            _ => Self::Other,
        }
    }
}

/// Converts a rendered wiki HTML fragment to flattened Markdown-ish text.
///
/// # Arguments
///
/// * `html` - The `parse.text` payload as served by the wiki API
///
/// # Returns
///
/// The flattened text with trailing whitespace stripped from every line,
/// outer whitespace trimmed, and exactly one trailing newline.
///
/// # Examples
///
/// ```
/// use wikirag_harvester::markup::html_to_markdown;
///
/// let html = "<h2>History</h2><p>See <a href=\"/wiki/X\">the X page</a>.</p>";
/// assert_eq!(html_to_markdown(html), "## History\n\nSee the X page.\n");
/// ```
#[must_use]
pub fn html_to_markdown(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();
    for child in fragment.root_element().children() {
        render_node(child, &mut out);
    }
    finish(&out)
}

/// True for elements whose subtree carries no article content.
fn is_noise(element: &Element) -> bool {
    let tag = element.name();
    if NOISE_TAGS.contains(&tag) {
        return true;
    }
    for class in element.classes() {
        if NOISE_CLASSES.contains(&class) {
            return true;
        }
        if tag == "sup" && class == "reference" {
            return true;
        }
    }
    false
}

fn render_node(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(text),
        Node::Element(element) => {
            if is_noise(element) {
                return;
            }
            render_element(node, element, out);
        }
        _ => {}
    }
}

fn render_element(node: NodeRef<'_, Node>, element: &Element, out: &mut String) {
    match BlockKind::from_tag(element.name()) {
        BlockKind::Heading(level) => {
            let text = inline_text(node);
            if !text.is_empty() {
                for _ in 0..level {
                    out.push('#');
                }
                out.push(' ');
                out.push_str(&text);
                out.push_str("\n\n");
            }
        }
        BlockKind::Paragraph => {
            let mut buf = String::new();
            for child in node.children() {
                render_node(child, &mut buf);
            }
            let text = buf.trim();
            if !text.is_empty() {
                out.push_str(text);
                out.push_str("\n\n");
            }
        }
        BlockKind::LineBreak => out.push('\n'),
        BlockKind::Link => {
            // Link targets are useless in retrieval text; keep the label.
            out.push_str(&inline_text(node));
        }
        BlockKind::UnorderedList => render_list(node, out, false),
        BlockKind::OrderedList => render_list(node, out, true),
        BlockKind::Table => render_table(node, out),
        BlockKind::BlockQuote => render_blockquote(node, out),
        BlockKind::Image => {
            if let Some(alt) = element.attr("alt") {
                out.push_str(alt.trim());
            }
        }
        BlockKind::Other => {
            for child in node.children() {
                render_node(child, out);
            }
        }
    }
}

/// Flattens a subtree to its visible text, pieces joined by single spaces.
fn inline_text(node: NodeRef<'_, Node>) -> String {
    let mut pieces = Vec::new();
    collect_text(node, &mut pieces);
    pieces.join(" ")
}

fn collect_text(node: NodeRef<'_, Node>, pieces: &mut Vec<String>) {
    match node.value() {
        Node::Text(text) => {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                pieces.push(trimmed.to_string());
            }
        }
        Node::Element(element) => {
            if is_noise(element) {
                return;
            }
            for child in node.children() {
                collect_text(child, pieces);
            }
        }
        _ => {}
    }
}

fn render_list(node: NodeRef<'_, Node>, out: &mut String, ordered: bool) {
    let mut lines = Vec::new();
    let mut position = 0;
    for child in node.children() {
        let Some(element) = child.value().as_element() else {
            continue;
        };
        if element.name() != "li" || is_noise(element) {
            continue;
        }
        // Numbering follows list position, so an empty item leaves a gap.
        position += 1;
        let text = inline_text(child);
        if text.is_empty() {
            continue;
        }
        if ordered {
            lines.push(format!("{position}. {text}"));
        } else {
            lines.push(format!("- {text}"));
        }
    }
    if !lines.is_empty() {
        out.push_str(&lines.join("\n"));
        out.push_str("\n\n");
    }
}

fn render_table(node: NodeRef<'_, Node>, out: &mut String) {
    let mut lines = Vec::new();
    for row in table_rows(node) {
        let mut cells = Vec::new();
        for cell in row.children() {
            let Some(element) = cell.value().as_element() else {
                continue;
            };
            if is_noise(element) {
                continue;
            }
            if matches!(element.name(), "th" | "td") {
                cells.push(inline_text(cell));
            }
        }
        if !cells.is_empty() {
            lines.push(cells.join(" | "));
        }
    }
    if !lines.is_empty() {
        out.push_str(&lines.join("\n"));
        out.push_str("\n\n");
    }
}

/// Direct `tr` children of the table, plus rows nested one level down in a
/// direct `thead`/`tbody`/`tfoot` (browsers insert `tbody` implicitly).
fn table_rows<'a>(table: NodeRef<'a, Node>) -> Vec<NodeRef<'a, Node>> {
    let mut rows = Vec::new();
    for child in table.children() {
        let Some(element) = child.value().as_element() else {
            continue;
        };
        if is_noise(element) {
            continue;
        }
        match element.name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => {
                for inner in child.children() {
                    let is_row = inner
                        .value()
                        .as_element()
                        .is_some_and(|e| e.name() == "tr" && !is_noise(e));
                    if is_row {
                        rows.push(inner);
                    }
                }
            }
            _ => {}
        }
    }
    rows
}

fn render_blockquote(node: NodeRef<'_, Node>, out: &mut String) {
    let mut buf = String::new();
    for child in node.children() {
        render_node(child, &mut buf);
    }
    let text = buf.trim().to_string();
    if text.is_empty() {
        return;
    }
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            out.push_str(">\n");
        } else {
            out.push_str("> ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out.push('\n');
}

/// Final cleanup pass over the assembled document.
fn finish(raw: &str) -> String {
    let mut cleaned = raw
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();
    cleaned.push('\n');
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn headings_get_hash_prefixes() {
        let html = "<h1>Top</h1><h2>Second</h2><h3>Third</h3>";
        assert_eq!(html_to_markdown(html), "# Top\n\n## Second\n\n### Third\n");
    }

    #[test]
    fn empty_heading_produces_nothing() {
        let html = "<h2>  </h2><p>Body</p>";
        assert_eq!(html_to_markdown(html), "Body\n");
    }

    #[test]
    fn paragraphs_separated_by_blank_lines() {
        let html = "<p>First.</p><p>Second.</p>";
        assert_eq!(html_to_markdown(html), "First.\n\nSecond.\n");
    }

    #[test]
    fn links_flatten_to_visible_text() {
        let html = r#"<p>See <a href="/wiki/Badab_War">the <b>Badab</b> War</a>.</p>"#;
        assert_eq!(html_to_markdown(html), "See the Badab War.\n");
    }

    #[test]
    fn reference_superscripts_are_dropped() {
        let html = r#"<p>Fact<sup class="reference">[1]</sup> stands.</p>"#;
        assert_eq!(html_to_markdown(html), "Fact stands.\n");
    }

    #[test]
    fn plain_superscripts_survive() {
        let html = "<p>x<sup>2</sup></p>";
        assert_eq!(html_to_markdown(html), "x2\n");
    }

    #[test]
    fn noise_subtrees_are_removed() {
        let html = r#"<div class="toc"><ul><li>1 History</li></ul></div><h2>History<span class="mw-editsection">[edit]</span></h2><table class="navbox"><tr><td>nav</td></tr></table><p>Kept.</p><script>alert(1)</script>"#;
        assert_eq!(html_to_markdown(html), "## History\n\nKept.\n");
    }

    #[test]
    fn unordered_list_items() {
        let html = "<ul><li>One</li><li>Two</li><li>  </li></ul>";
        assert_eq!(html_to_markdown(html), "- One\n- Two\n");
    }

    #[test]
    fn ordered_list_numbering() {
        let html = "<ol><li>Alpha</li><li>Beta</li></ol>";
        assert_eq!(html_to_markdown(html), "1. Alpha\n2. Beta\n");
    }

    #[test]
    fn ordered_list_keeps_positions_past_empty_items() {
        let html = "<ol><li> </li><li>B</li><li>C</li></ol>";
        assert_eq!(html_to_markdown(html), "2. B\n3. C\n");
    }

    #[test]
    fn nested_list_flattens_into_item() {
        let html = "<ul><li>Outer<ul><li>Inner</li></ul></li></ul>";
        assert_eq!(html_to_markdown(html), "- Outer Inner\n");
    }

    #[test]
    fn all_empty_list_produces_nothing() {
        let html = "<ul><li> </li></ul><p>After</p>";
        assert_eq!(html_to_markdown(html), "After\n");
    }

    #[test]
    fn table_rows_to_pipe_lines() {
        let html = "<table><tr><th>Name</th><th>Rank</th></tr>\
                    <tr><td>Lufgt Huron</td><td>Chapter Master</td></tr></table>";
        assert_eq!(
            html_to_markdown(html),
            "Name | Rank\nLufgt Huron | Chapter Master\n"
        );
    }

    #[test]
    fn table_rows_inside_tbody() {
        let html = "<table><tbody><tr><td>a</td><td>b</td></tr></tbody></table>";
        assert_eq!(html_to_markdown(html), "a | b\n");
    }

    #[test]
    fn row_without_cells_is_skipped() {
        let html = "<table><tr></tr><tr><td>only</td></tr></table>";
        assert_eq!(html_to_markdown(html), "only\n");
    }

    #[test]
    fn blockquote_lines_are_prefixed() {
        let html = "<blockquote><p>We are his.</p><p>As he is ours.</p></blockquote>";
        assert_eq!(
            html_to_markdown(html),
            "> We are his.\n>\n> As he is ours.\n"
        );
    }

    #[test]
    fn image_contributes_alt_text() {
        let html = r#"<p><img src="huron.png" alt="Huron Blackheart"> icon</p>"#;
        assert_eq!(html_to_markdown(html), "Huron Blackheart icon\n");
    }

    #[test]
    fn unknown_tags_are_transparent() {
        let html = "<section><p>Inside a <span>span</span>.</p></section>";
        assert_eq!(html_to_markdown(html), "Inside a span.\n");
    }

    #[test]
    fn line_break_splits_text() {
        let html = "<p>one<br>two</p>";
        assert_eq!(html_to_markdown(html), "one\ntwo\n");
    }

    #[test]
    fn empty_input_yields_single_newline() {
        assert_eq!(html_to_markdown(""), "\n");
    }
}
