//! Harvest orchestration: fetch, convert, filter, write.
//!
//! Pages are processed strictly in input order, one at a time; the rate
//! limit makes concurrency pointless. A page that fails after retries is
//! logged and skipped, so one deleted or vandalized page never kills an
//! overnight run. Only broken input, client construction, and local IO
//! abort the whole run.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::{HarvesterError, Result};
use crate::http::ApiClient;
use crate::listing::AllPages;
use crate::markup::html_to_markdown;
use crate::page::{fetch_page, ParsedPage};
use crate::sections::{surviving_sections, SectionOptions};
use crate::types::{
    FailureRecord, HarvestReport, NormalizedDocument, PageRecord, PageSummary,
};
use crate::writer::{DocumentWriter, FailureLog, PageListWriter};

/// Settings for one harvest run.
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    pub client: ClientConfig,

    /// Directory receiving the output documents.
    pub out_dir: PathBuf,

    /// Path of the failure log CSV.
    pub failure_log: PathBuf,

    /// Prefix filenames with the page id.
    pub id_prefix: bool,

    pub sections: SectionOptions,
}

/// Settings for one `list` run.
#[derive(Debug, Clone)]
pub struct ListOptions {
    pub client: ClientConfig,

    /// Namespace to enumerate (0 = main articles).
    pub namespace: i64,

    /// Page summaries per API request.
    pub batch_size: u32,

    /// Path of the output CSV.
    pub output: PathBuf,
}

/// Harvests every record, writing documents and the failure log.
pub fn harvest(records: &[PageRecord], options: &HarvestOptions) -> Result<HarvestReport> {
    harvest_with(records, options, |_, _| {})
}

/// Like [`harvest`], reporting each page's outcome to `observe` as it
/// completes. `Err` outcomes have already been written to the failure log.
pub fn harvest_with(
    records: &[PageRecord],
    options: &HarvestOptions,
    mut observe: impl FnMut(&PageRecord, std::result::Result<&Path, &HarvesterError>),
) -> Result<HarvestReport> {
    let mut client = ApiClient::new(options.client.clone())?;
    let mut writer = DocumentWriter::new(
        &options.out_dir,
        options.id_prefix,
        options.sections.include_headings,
    )?;
    let mut failure_log = FailureLog::new(options.failure_log.clone());
    let mut report = HarvestReport::default();

    info!(pages = records.len(), out_dir = %options.out_dir.display(), "harvest started");
    for record in records {
        match harvest_page(&mut client, &mut writer, record, &options.sections) {
            Ok(path) => {
                info!(
                    page_id = record.identity.page_id,
                    path = %path.display(),
                    "document written"
                );
                report.written += 1;
                observe(record, Ok(&path));
            }
            Err(err) if err.is_run_fatal() => return Err(err),
            Err(err) => {
                warn!(
                    page_id = record.identity.page_id,
                    error = %err,
                    "page failed, continuing"
                );
                let failure = FailureRecord {
                    page_id: record.identity.page_id,
                    title: record.identity.title.clone(),
                    url: record.identity.url.clone(),
                    error: err.to_string(),
                };
                failure_log.record(&failure)?;
                observe(record, Err(&err));
                report.failures.push(failure);
            }
        }
    }
    info!(
        written = report.written,
        failed = report.failures.len(),
        "harvest finished"
    );
    Ok(report)
}

fn harvest_page(
    client: &mut ApiClient,
    writer: &mut DocumentWriter,
    record: &PageRecord,
    sections: &SectionOptions,
) -> Result<PathBuf> {
    let document = match record.content.as_deref() {
        Some(text) => build_offline_document(record, text, sections),
        None => {
            let page = fetch_page(client, record.identity.page_id)?;
            build_document(record, page, sections)
        }
    };
    writer.write(&document)
}

/// Assembles a document from page text the input already carried, with no
/// fetch. The text is taken as flattened Markdown from an earlier export
/// and still goes through the section filter.
fn build_offline_document(
    record: &PageRecord,
    text: &str,
    sections: &SectionOptions,
) -> NormalizedDocument {
    let kept = surviving_sections(text, sections);
    let section_index = kept.iter().filter_map(|s| s.heading.clone()).collect();
    NormalizedDocument {
        identity: record.identity.clone(),
        categories: record.categories.clone(),
        section_index,
        sections: kept,
    }
}

/// Assembles the writable document from the input record and the fetched
/// page. Input categories come first, API categories fill in behind them.
fn build_document(
    record: &PageRecord,
    page: ParsedPage,
    sections: &SectionOptions,
) -> NormalizedDocument {
    let markdown = html_to_markdown(&page.html);
    let mut categories = record.categories.clone();
    for name in page.categories {
        if !categories.contains(&name) {
            categories.push(name);
        }
    }
    NormalizedDocument {
        identity: record.identity.clone(),
        categories,
        section_index: page.section_index,
        sections: surviving_sections(&markdown, sections),
    }
}

/// Enumerates a namespace and writes the page-list CSV.
///
/// Returns the number of records written. Unlike harvesting, any fetch
/// failure here is terminal; a partial page list silently narrows every
/// later harvest.
pub fn list_pages(options: &ListOptions, mut observe: impl FnMut(&PageSummary)) -> Result<usize> {
    crate::config::validate_batch_size(options.batch_size)?;
    let mut client = ApiClient::new(options.client.clone())?;
    let mut writer = PageListWriter::create(&options.output)?;

    let mut count = 0usize;
    for result in AllPages::new(&mut client, options.namespace, options.batch_size) {
        let summary = result?;
        writer.write_summary(&summary)?;
        observe(&summary);
        count += 1;
    }
    writer.finish()?;
    info!(count, output = %options.output.display(), "page list written");
    Ok(count)
}
