//! WikiRAG Harvester - Download wiki pages as clean Markdown documents.
//!
//! This crate crawls a MediaWiki-style API, converts rendered page HTML
//! into flattened Markdown, strips boilerplate sections, and writes one
//! frontmatter-tagged document per page, ready for a retrieval corpus.
//!
//! # Example
//!
//! ```
//! use wikirag_harvester::markup::html_to_markdown;
//! use wikirag_harvester::sections::{filter_markdown, SectionOptions};
//!
//! let html = "<p>Hello</p><h2>Sources</h2><p>x</p><h2>History</h2><p>Old.</p>";
//! let markdown = html_to_markdown(html);
//! let document = filter_markdown(&markdown, &SectionOptions::default());
//! assert_eq!(document, "Hello\n\n## History\n\nOld.\n");
//! ```
//!
//! # Architecture
//!
//! The harvester is organized into several modules:
//!
//! - [`config`]: Configuration constants and validation
//! - [`types`]: Core data types (PageRecord, NormalizedDocument, etc.)
//! - [`error`]: Error types and Result alias
//! - [`http`]: Rate-limited, retry-aware API client
//! - [`listing`]: Pagination over the `allpages` generator
//! - [`page`]: Single-page content fetch
//! - [`markup`]: HTML to Markdown conversion
//! - [`sections`]: Section splitting and banned-section filtering
//! - [`normalize`]: Category and filename normalization
//! - [`input`]: Page-list CSV reading
//! - [`writer`]: Document, page-list, and failure-log output
//! - [`cli`]: Command-line interface
//! - [`harvester`]: Harvest orchestration

pub mod cli;
pub mod config;
pub mod error;
pub mod harvester;
pub mod http;
pub mod input;
pub mod listing;
pub mod markup;
pub mod normalize;
pub mod page;
pub mod sections;
pub mod types;
pub mod writer;

// Re-export main functions
pub use harvester::{harvest, list_pages, HarvestOptions, ListOptions};

// Re-export commonly used items
pub use config::ClientConfig;
pub use error::{HarvesterError, Result};
pub use types::{HarvestReport, PageIdentity, PageRecord, PageSummary};
