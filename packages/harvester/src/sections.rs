//! Splitting converted pages into sections and dropping the unwanted ones.
//!
//! The converter renders wiki section headings as `## Title` lines, so a
//! page splits cleanly at level-2 headings. Boilerplate sections such as
//! source lists and galleries carry no retrieval value and are removed
//! before the document is written.

use std::sync::LazyLock;

use regex::Regex;

use crate::config;

static EXTRA_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank line pattern"));

/// One level-2 section of a converted page.
///
/// The section before the first `## ` boundary has no heading; it is the
/// page's intro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Cleaned heading title, `None` for the leading unheaded section.
    pub heading: Option<String>,
    /// Trimmed section body, possibly empty.
    pub body: String,
}

impl Section {
    /// Lowercased heading used for ban matching, `None` when unheaded.
    #[must_use]
    pub fn key(&self) -> Option<String> {
        self.heading.as_ref().map(|title| title.to_lowercase())
    }
}

/// Controls which sections survive filtering and how they are rendered.
#[derive(Debug, Clone)]
pub struct SectionOptions {
    /// Emit `## Title` lines for surviving sections.
    pub include_headings: bool,
    /// Lowercased section titles to drop.
    pub banned: Vec<String>,
}

impl Default for SectionOptions {
    fn default() -> Self {
        Self {
            include_headings: true,
            banned: config::BANNED_SECTIONS
                .iter()
                .map(|title| (*title).to_string())
                .collect(),
        }
    }
}

/// Splits converted text at `## ` lines into sections.
///
/// Content before the first boundary becomes an unheaded section. Deeper
/// headings (`###` and below) stay inside the enclosing section's body.
#[must_use]
pub fn split_sections(markdown: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut heading: Option<String> = None;
    let mut body: Vec<&str> = Vec::new();
    for line in markdown.lines() {
        if let Some(rest) = line.strip_prefix("## ") {
            push_section(&mut sections, heading.take(), &body);
            body.clear();
            heading = Some(clean_heading(rest));
        } else {
            body.push(line);
        }
    }
    push_section(&mut sections, heading, &body);
    sections
}

fn push_section(sections: &mut Vec<Section>, heading: Option<String>, body: &[&str]) {
    let body = body.join("\n").trim().to_string();
    if heading.is_none() && body.is_empty() {
        return;
    }
    sections.push(Section { heading, body });
}

/// Removes the trailing `[]` citation remnant that survives reference
/// stripping inside headings.
fn clean_heading(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix("[]").unwrap_or(trimmed);
    trimmed.trim().to_string()
}

/// True when the key matches a banned title exactly or by first word,
/// so `sources` also catches `Sources and Notes`.
fn is_banned(key: &str, banned: &[String]) -> bool {
    if banned.iter().any(|title| title == key) {
        return true;
    }
    key.split_whitespace()
        .next()
        .is_some_and(|first| banned.iter().any(|title| title == first))
}

/// Splits a converted page and drops empty and banned sections.
#[must_use]
pub fn surviving_sections(markdown: &str, options: &SectionOptions) -> Vec<Section> {
    split_sections(markdown)
        .into_iter()
        .filter(|section| !section.body.is_empty())
        .filter(|section| {
            section
                .key()
                .is_none_or(|key| !is_banned(&key, &options.banned))
        })
        .collect()
}

/// Reassembles surviving sections into one document body.
///
/// The unheaded leader and any section titled `Intro` emit their body
/// without a heading line; other sections keep `## Title` unless headings
/// are disabled. Runs of blank lines collapse to one and the result ends
/// with exactly one newline.
#[must_use]
pub fn render_sections(sections: &[Section], include_headings: bool) -> String {
    let mut parts = Vec::new();
    for section in sections {
        match section.key() {
            Some(key) if key != "intro" && include_headings => {
                if let Some(title) = &section.heading {
                    parts.push(format!("## {title}\n\n{}", section.body));
                }
            }
            _ => parts.push(section.body.clone()),
        }
    }
    let joined = parts.join("\n\n");
    let collapsed = EXTRA_BLANK_LINES.replace_all(&joined, "\n\n");
    let mut text = collapsed.trim().to_string();
    text.push('\n');
    text
}

/// Splits, filters, and reassembles a converted page in one step.
#[must_use]
pub fn filter_markdown(markdown: &str, options: &SectionOptions) -> String {
    render_sections(
        &surviving_sections(markdown, options),
        options.include_headings,
    )
}
