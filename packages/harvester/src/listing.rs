//! Lazy pagination over the wiki's `allpages` generator.
//!
//! The API hands out pages in batches and signals more work with a
//! `continue` object. That object is opaque: whatever keys it carries are
//! echoed verbatim into the next request, and its absence is the only
//! termination signal. [`AllPages`] wraps the protocol in an iterator so
//! callers never see the batch boundaries.

use std::collections::VecDeque;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::Result;
use crate::http::ApiClient;
use crate::types::PageSummary;

/// Iterator over every page in one namespace.
///
/// Yields `Err` once on a terminal fetch failure and is fused afterwards.
/// There is no checkpointing; a fresh `AllPages` always starts from the
/// beginning of the namespace.
pub struct AllPages<'a> {
    client: &'a mut ApiClient,
    namespace: i64,
    batch_size: u32,
    cursor: Option<Map<String, Value>>,
    buffer: VecDeque<PageSummary>,
    done: bool,
}

impl<'a> AllPages<'a> {
    /// Creates a crawler over `namespace`, fetching `batch_size` summaries
    /// per request.
    pub fn new(client: &'a mut ApiClient, namespace: i64, batch_size: u32) -> Self {
        Self {
            client,
            namespace,
            batch_size,
            cursor: None,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    fn fetch_batch(&mut self) -> Result<()> {
        let mut params = vec![
            ("action", "query".to_string()),
            ("generator", "allpages".to_string()),
            ("gaplimit", self.batch_size.to_string()),
            ("gapnamespace", self.namespace.to_string()),
            ("prop", "info".to_string()),
            ("inprop", "url".to_string()),
        ];
        if let Some(cursor) = &self.cursor {
            for (key, value) in cursor {
                params.push((key.as_str(), param_value(value)));
            }
        }
        let payload = self.client.get(&params)?;
        let (summaries, cursor) = parse_batch(&payload);
        debug!(
            count = summaries.len(),
            more = cursor.is_some(),
            "allpages batch received"
        );
        self.buffer.extend(summaries);
        self.done = cursor.is_none();
        self.cursor = cursor;
        Ok(())
    }
}

impl Iterator for AllPages<'_> {
    type Item = Result<PageSummary>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(summary) = self.buffer.pop_front() {
                return Some(Ok(summary));
            }
            if self.done {
                return None;
            }
            if let Err(err) = self.fetch_batch() {
                self.done = true;
                return Some(Err(err));
            }
        }
    }
}

/// Extracts the page summaries and the continue cursor from one response.
///
/// An absent or malformed `query.pages` is treated as an empty batch; the
/// `continue` object alone decides whether the crawl goes on.
fn parse_batch(payload: &Value) -> (Vec<PageSummary>, Option<Map<String, Value>>) {
    let mut summaries = Vec::new();
    if let Some(pages) = payload.pointer("/query/pages").and_then(Value::as_array) {
        for page in pages {
            match page_summary(page) {
                Some(summary) => summaries.push(summary),
                None => warn!(?page, "skipping malformed page summary"),
            }
        }
    }
    let cursor = payload
        .get("continue")
        .and_then(Value::as_object)
        .cloned();
    (summaries, cursor)
}

fn page_summary(page: &Value) -> Option<PageSummary> {
    Some(PageSummary {
        page_id: page.get("pageid").and_then(Value::as_u64)?,
        ns: page.get("ns").and_then(Value::as_i64).unwrap_or(0),
        title: page.get("title").and_then(Value::as_str)?.to_string(),
        url: page
            .get("fullurl")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        last_rev_id: page.get("lastrevid").and_then(Value::as_u64),
        length: page.get("length").and_then(Value::as_u64),
    })
}

/// Continue values are usually strings but numbers appear too; both must
/// round-trip into query parameters unchanged.
fn param_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
