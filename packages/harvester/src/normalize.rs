//! Category normalization and collision-free filename allocation.

use std::collections::HashSet;

use serde_json::Value;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::config;

/// Normalizes category metadata to an ordered list of plain names.
///
/// The wiki API and the input file disagree on shape, so three are
/// accepted: an array of strings, a comma-separated string, and an array
/// of objects with the name under `*` (or `category`, the newer API
/// spelling). A `Category:` prefix is stripped and the first occurrence
/// of a name wins.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use wikirag_harvester::normalize::normalize_categories;
///
/// let from_array = normalize_categories(&json!(["C", "Badab War"]));
/// let from_string = normalize_categories(&json!("Category:C, Category:Badab War"));
/// assert_eq!(from_array, from_string);
/// ```
#[must_use]
pub fn normalize_categories(value: &Value) -> Vec<String> {
    let mut names = Vec::new();
    match value {
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(name) => push_category(&mut names, name),
                    Value::Object(map) => {
                        if let Some(Value::String(name)) =
                            map.get("*").or_else(|| map.get("category"))
                        {
                            push_category(&mut names, name);
                        }
                    }
                    _ => {}
                }
            }
        }
        Value::String(joined) => {
            for piece in joined.split(',') {
                push_category(&mut names, piece);
            }
        }
        _ => {}
    }
    names
}

fn push_category(names: &mut Vec<String>, raw: &str) {
    let name = raw.trim();
    let name = name.strip_prefix("Category:").unwrap_or(name).trim();
    if name.is_empty() || names.iter().any(|seen| seen == name) {
        return;
    }
    names.push(name.to_string());
}

/// Turns a page title into a filesystem-safe stem.
///
/// NFKD-decomposes the title and drops combining marks, so accented
/// letters keep their base form. Runs of anything outside ASCII
/// alphanumerics become a single `_`. An empty result falls back to
/// `page` and the stem is truncated to a fixed length.
#[must_use]
pub fn slugify(title: &str) -> String {
    let decomposed: String = title.nfkd().filter(|ch| !is_combining_mark(*ch)).collect();
    let mut slug = String::new();
    for ch in decomposed.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_matches('_');
    let slug = if slug.is_empty() {
        config::SLUG_FALLBACK
    } else {
        slug
    };
    slug.chars().take(config::SLUG_MAX_LEN).collect()
}

/// Hands out unique filename stems for one output directory.
///
/// Collisions between distinct titles that slugify identically get `_2`,
/// `_3`, and so on, in allocation order.
#[derive(Debug, Default)]
pub struct FilenameAllocator {
    used: HashSet<String>,
}

impl FilenameAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a stem unique among everything allocated so far.
    pub fn allocate(&mut self, title: &str) -> String {
        let base = slugify(title);
        let mut candidate = base.clone();
        let mut suffix = 2u32;
        while self.used.contains(&candidate) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}
