//! Reading the CSV page list that drives a harvest run.
//!
//! The file is expected to come from the `list` command, but hand-edited
//! lists are common, so parsing is forgiving about header casing, quoting,
//! and stray characters around page ids. A `pagecontent` column marks rows
//! whose text was exported in an earlier run; those harvest offline, with
//! no fetch. Structural problems are fatal before any network traffic
//! starts.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::{HarvesterError, Result};
use crate::normalize::normalize_categories;
use crate::types::{PageIdentity, PageRecord};

static FIRST_DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid digit pattern"));

/// Reads and parses a page list file.
///
/// # Arguments
///
/// * `path` - CSV file with a header row naming at least `page_id`,
///   `title`, and `url` (or `fullurl`) columns; `categories` and
///   `pagecontent` columns are picked up when present
///
/// # Returns
///
/// The records in file order, deduplicated by page id (first wins).
pub fn read_page_records(path: &Path) -> Result<Vec<PageRecord>> {
    let text = fs::read_to_string(path)?;
    parse_page_records(&text)
}

/// Parses page records from CSV text. See [`read_page_records`].
pub fn parse_page_records(text: &str) -> Result<Vec<PageRecord>> {
    let mut rows = split_records(text).into_iter();
    let header = loop {
        match rows.next() {
            Some(row) if row.is_blank() => continue,
            Some(row) => break row,
            None => {
                return Err(HarvesterError::InvalidInput(
                    "page list is empty".to_string(),
                ))
            }
        }
    };
    let columns = Columns::from_header(&header.fields)?;

    let mut records = Vec::new();
    let mut seen = HashSet::new();
    for row in rows {
        if row.is_blank() {
            continue;
        }
        let record = columns.record(&row.fields, row.line)?;
        if !seen.insert(record.identity.page_id) {
            debug!(page_id = record.identity.page_id, "duplicate page id skipped");
            continue;
        }
        records.push(record);
    }
    Ok(records)
}

/// Column positions resolved from the header row.
struct Columns {
    page_id: usize,
    title: usize,
    url: usize,
    categories: Option<usize>,
    content: Option<usize>,
}

impl Columns {
    fn from_header(fields: &[String]) -> Result<Self> {
        let names: Vec<String> = fields
            .iter()
            .map(|name| name.trim().to_lowercase())
            .collect();
        let find = |wanted: &[&str]| {
            names
                .iter()
                .position(|name| wanted.contains(&name.as_str()))
        };
        let missing = |column: &str| {
            HarvesterError::InvalidInput(format!("page list is missing a {column} column"))
        };
        Ok(Self {
            page_id: find(&["page_id", "pageid"]).ok_or_else(|| missing("page_id"))?,
            title: find(&["title"]).ok_or_else(|| missing("title"))?,
            url: find(&["url", "fullurl"]).ok_or_else(|| missing("url"))?,
            categories: find(&["categories"]),
            content: find(&["pagecontent", "content"]),
        })
    }

    fn record(&self, fields: &[String], line: usize) -> Result<PageRecord> {
        let cell = |index: usize, column: &str| {
            fields
                .get(index)
                .map(|value| value.trim().to_string())
                .ok_or_else(|| HarvesterError::InvalidRecord {
                    line,
                    message: format!("missing {column} field"),
                })
        };
        let raw_id = cell(self.page_id, "page_id")?;
        let page_id = coerce_page_id(&raw_id).ok_or_else(|| HarvesterError::InvalidRecord {
            line,
            message: format!("page_id {raw_id:?} has no usable digits"),
        })?;
        let categories = match self.categories {
            Some(index) => parse_categories(&cell(index, "categories")?),
            None => Vec::new(),
        };
        // A blank content cell means this row still needs a fetch.
        let content = match self.content {
            Some(index) => Some(cell(index, "pagecontent")?).filter(|text| !text.is_empty()),
            None => None,
        };
        Ok(PageRecord {
            identity: PageIdentity {
                page_id,
                title: cell(self.title, "title")?,
                url: cell(self.url, "url")?,
            },
            categories,
            content,
        })
    }
}

/// Pulls the first digit run out of a cell, so `"12345"` and `id=12345`
/// both parse.
fn coerce_page_id(cell: &str) -> Option<u64> {
    FIRST_DIGIT_RUN
        .find(cell)
        .and_then(|run| run.as_str().parse().ok())
}

/// A categories cell is either a JSON array or a comma-separated string.
fn parse_categories(cell: &str) -> Vec<String> {
    if cell.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<Value>(cell) {
            return normalize_categories(&value);
        }
    }
    normalize_categories(&Value::String(cell.to_string()))
}

/// One CSV record, tagged with the 1-based line it starts on.
pub(crate) struct Row {
    pub(crate) line: usize,
    pub(crate) fields: Vec<String>,
}

impl Row {
    fn is_blank(&self) -> bool {
        self.fields.len() == 1 && self.fields[0].trim().is_empty()
    }
}

/// Splits CSV text into records, honoring double-quoted fields with `""`
/// escapes. Newlines inside a quoted field belong to the field, so exported
/// page content survives the round trip.
pub(crate) fn split_records(text: &str) -> Vec<Row> {
    let mut rows = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut line = 1;
    let mut row_start = 1;
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if quoted {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    quoted = false;
                }
            } else {
                if ch == '\n' {
                    line += 1;
                }
                field.push(ch);
            }
        } else {
            match ch {
                '"' => quoted = true,
                ',' => fields.push(std::mem::take(&mut field)),
                '\r' if chars.peek() == Some(&'\n') => {}
                '\n' => {
                    line += 1;
                    fields.push(std::mem::take(&mut field));
                    rows.push(Row {
                        line: row_start,
                        fields: std::mem::take(&mut fields),
                    });
                    row_start = line;
                }
                _ => field.push(ch),
            }
        }
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        rows.push(Row {
            line: row_start,
            fields,
        });
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_list_command_output() {
        let text = "page_id,ns,title,fullurl,lastrevid,length\n\
                    12,0,Badab War,https://w/wiki/Badab_War,99,1000\n";
        let records = parse_page_records(text).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identity.page_id, 12);
        assert_eq!(records[0].identity.title, "Badab War");
        assert_eq!(records[0].identity.url, "https://w/wiki/Badab_War");
        assert!(records[0].categories.is_empty());
        assert!(records[0].content.is_none());
    }

    #[test]
    fn header_matching_ignores_case_and_padding() {
        let text = " Page_ID , Title , URL \n7,T,u\n";
        let records = parse_page_records(text).unwrap();
        assert_eq!(records[0].identity.page_id, 7);
    }

    #[test]
    fn quoted_titles_keep_commas() {
        let text = "page_id,title,url\n5,\"Huron, Blackheart\",u\n";
        let records = parse_page_records(text).unwrap();
        assert_eq!(records[0].identity.title, "Huron, Blackheart");
    }

    #[test]
    fn noisy_page_ids_are_coerced() {
        let text = "page_id,title,url\n\"  12345 \",T,u\nid=678,T2,u2\n";
        let records = parse_page_records(text).unwrap();
        assert_eq!(records[0].identity.page_id, 12345);
        assert_eq!(records[1].identity.page_id, 678);
    }

    #[test]
    fn duplicate_page_ids_keep_first() {
        let text = "page_id,title,url\n1,First,u\n1,Second,u\n2,Third,u\n";
        let records = parse_page_records(text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].identity.title, "First");
        assert_eq!(records[1].identity.title, "Third");
    }

    #[test]
    fn categories_column_accepts_both_shapes() {
        let text = "page_id,title,url,categories\n\
                    1,A,u,\"Category:C, Badab War\"\n\
                    2,B,u,\"[\"\"C\"\", \"\"Badab War\"\"]\"\n";
        let records = parse_page_records(text).unwrap();
        let expected = vec!["C".to_string(), "Badab War".to_string()];
        assert_eq!(records[0].categories, expected);
        assert_eq!(records[1].categories, expected);
    }

    #[test]
    fn pagecontent_column_spans_lines() {
        let text = "page_id,title,url,pagecontent\n\
                    1,A,u,\"Lead.\n\n## History\n\nOld.\"\n\
                    2,B,u,\n";
        let records = parse_page_records(text).unwrap();
        assert_eq!(
            records[0].content.as_deref(),
            Some("Lead.\n\n## History\n\nOld.")
        );
        assert!(records[1].content.is_none());
    }

    #[test]
    fn errors_after_multiline_fields_keep_real_line_numbers() {
        let text = "page_id,title,url,pagecontent\n\
                    1,A,u,\"two\nlines\"\n\
                    nope,B,u,x\n";
        let err = parse_page_records(text).unwrap_err();
        assert!(err.to_string().contains("line 4"));
    }

    #[test]
    fn missing_column_is_fatal() {
        let err = parse_page_records("page_id,title\n1,T\n").unwrap_err();
        assert!(err.to_string().contains("url"));
    }

    #[test]
    fn unparseable_page_id_is_fatal_with_line_number() {
        let err = parse_page_records("page_id,title,url\nnope,T,u\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn empty_file_is_fatal() {
        assert!(parse_page_records("\n\n").is_err());
    }

    #[test]
    fn blank_lines_are_skipped() {
        let text = "page_id,title,url\n\n1,T,u\n\n";
        assert_eq!(parse_page_records(text).unwrap().len(), 1);
    }
}
