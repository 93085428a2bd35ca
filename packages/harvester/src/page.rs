//! Fetching and unpacking a single page's rendered content.

use serde_json::Value;

use crate::error::{HarvesterError, Result};
use crate::http::ApiClient;
use crate::normalize::normalize_categories;

/// Rendered content and metadata for one page, straight off the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    /// Rendered article HTML (`parse.text`).
    pub html: String,

    /// Section headings in page order (`parse.sections[].line`).
    pub section_index: Vec<String>,

    /// Normalized category names (`parse.categories`).
    pub categories: Vec<String>,
}

/// Fetches the rendered content of one page by id.
///
/// # Arguments
///
/// * `client` - The rate-limited API client
/// * `page_id` - Numeric id of the page to fetch
///
/// # Returns
///
/// The rendered HTML plus section and category metadata. A page that
/// renders to nothing is an [`HarvesterError::EmptyContent`] failure.
pub fn fetch_page(client: &mut ApiClient, page_id: u64) -> Result<ParsedPage> {
    let params = vec![
        ("action", "parse".to_string()),
        ("pageid", page_id.to_string()),
        ("prop", "text|sections|categories".to_string()),
        ("disablelimitreport", "1".to_string()),
    ];
    let payload = client.get(&params)?;
    extract_page(&payload, page_id)
}

/// Unpacks a `action=parse` response body.
///
/// `parse.text` is a plain string under formatversion 2 but an object
/// with a `*` key under the legacy format; both are accepted.
pub(crate) fn extract_page(payload: &Value, page_id: u64) -> Result<ParsedPage> {
    let parse = payload
        .get("parse")
        .ok_or(HarvesterError::MissingPayload { what: "parse" })?;

    let html = match parse.get("text") {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Object(map)) => map
            .get("*")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(HarvesterError::MissingPayload { what: "parse.text" })?,
        _ => return Err(HarvesterError::MissingPayload { what: "parse.text" }),
    };
    if html.trim().is_empty() {
        return Err(HarvesterError::EmptyContent { page_id });
    }

    let section_index = parse
        .get("sections")
        .and_then(Value::as_array)
        .map(|sections| {
            sections
                .iter()
                .filter_map(|section| section.get("line").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let categories = parse
        .get("categories")
        .map(normalize_categories)
        .unwrap_or_default();

    Ok(ParsedPage {
        html,
        section_index,
        categories,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn unpacks_a_formatversion_two_response() {
        let payload = json!({"parse": {
            "title": "Angron",
            "pageid": 12,
            "text": "<p>Primarch.</p>",
            "sections": [
                {"toclevel": 1, "level": "2", "line": "History", "index": "1"},
                {"toclevel": 1, "level": "2", "line": "Sources", "index": "2"},
            ],
            "categories": [{"sortkey": "", "category": "Primarchs"}],
        }});
        let page = extract_page(&payload, 12).unwrap();
        assert_eq!(page.html, "<p>Primarch.</p>");
        assert_eq!(
            page.section_index,
            vec!["History".to_string(), "Sources".to_string()]
        );
        assert_eq!(page.categories, vec!["Primarchs".to_string()]);
    }

    #[test]
    fn accepts_legacy_text_object() {
        let payload = json!({"parse": {"text": {"*": "<p>Old shape.</p>"}}});
        let page = extract_page(&payload, 1).unwrap();
        assert_eq!(page.html, "<p>Old shape.</p>");
        assert!(page.section_index.is_empty());
        assert!(page.categories.is_empty());
    }

    #[test]
    fn blank_html_is_empty_content() {
        let payload = json!({"parse": {"text": "  \n "}});
        let err = extract_page(&payload, 42).unwrap_err();
        assert!(matches!(err, HarvesterError::EmptyContent { page_id: 42 }));
    }

    #[test]
    fn missing_parse_block_is_a_payload_error() {
        let err = extract_page(&json!({"warnings": {}}), 1).unwrap_err();
        assert!(matches!(err, HarvesterError::MissingPayload { what: "parse" }));
    }

    #[test]
    fn missing_text_is_a_payload_error() {
        let err = extract_page(&json!({"parse": {"sections": []}}), 1).unwrap_err();
        assert!(matches!(
            err,
            HarvesterError::MissingPayload { what: "parse.text" }
        ));
    }
}
