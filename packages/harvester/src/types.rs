//! Core data types for the harvester.

use serde::{Deserialize, Serialize};

use crate::sections::Section;

/// Identity of a wiki page as read from the input file.
///
/// `page_id` is the unique key; title and URL are carried along for the
/// output document and the failure log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageIdentity {
    /// Numeric page id, unique within the wiki.
    pub page_id: u64,

    /// Page title as listed in the input.
    pub title: String,

    /// Canonical page URL.
    pub url: String,
}

/// One row of the input file: a page identity plus any categories the
/// input already carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub identity: PageIdentity,

    /// Categories from the input, already normalized to plain names.
    pub categories: Vec<String>,

    /// Pre-fetched page text from a `pagecontent` column, when the input
    /// carries one. Harvesting such a record skips the network fetch.
    pub content: Option<String>,
}

/// A page-summary record produced by the pagination crawler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSummary {
    /// Numeric page id.
    pub page_id: u64,

    /// Namespace number (0 = main articles).
    pub ns: i64,

    /// Page title.
    pub title: String,

    /// Canonical page URL (`fullurl` from the API).
    pub url: String,

    /// Id of the latest revision, when reported.
    pub last_rev_id: Option<u64>,

    /// Page length in bytes, when reported.
    pub length: Option<u64>,
}

/// A fully normalized page, ready for the document writer.
#[derive(Debug, Clone)]
pub struct NormalizedDocument {
    pub identity: PageIdentity,

    /// Deduplicated category names, input order preserved.
    pub categories: Vec<String>,

    /// Section index reported by the API (heading names, in page order).
    pub section_index: Vec<String>,

    /// Surviving sections after banned-section filtering.
    pub sections: Vec<Section>,
}

/// One failed page, recorded in the failure log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub page_id: u64,
    pub title: String,
    pub url: String,
    pub error: String,
}

/// Summary of a completed harvest run.
#[derive(Debug, Clone, Default)]
pub struct HarvestReport {
    /// Number of documents written.
    pub written: usize,

    /// Pages that failed (after retries, where applicable).
    pub failures: Vec<FailureRecord>,
}

impl HarvestReport {
    /// Total number of pages attempted.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.written + self.failures.len()
    }
}
