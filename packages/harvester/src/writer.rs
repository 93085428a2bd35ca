//! Writing harvested documents, page lists, and the failure log.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;
use crate::normalize::FilenameAllocator;
use crate::sections::render_sections;
use crate::types::{FailureRecord, NormalizedDocument, PageSummary};

/// YAML frontmatter of an output document.
#[derive(Debug, Serialize)]
struct Frontmatter<'a> {
    page_id: u64,
    title: &'a str,
    url: &'a str,
    categories: &'a [String],
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    sections: &'a [String],
}

/// Writes one Markdown document per harvested page into a directory.
///
/// Filenames are slugs of the page title, made unique per writer; with
/// the id prefix enabled they become `<page_id>-<slug>.md` instead.
pub struct DocumentWriter {
    out_dir: PathBuf,
    allocator: FilenameAllocator,
    id_prefix: bool,
    include_headings: bool,
}

impl DocumentWriter {
    /// Creates the output directory and a writer for it.
    pub fn new(out_dir: &Path, id_prefix: bool, include_headings: bool) -> Result<Self> {
        fs::create_dir_all(out_dir)?;
        Ok(Self {
            out_dir: out_dir.to_path_buf(),
            allocator: FilenameAllocator::new(),
            id_prefix,
            include_headings,
        })
    }

    /// Renders and writes one document, returning its path.
    ///
    /// Uses the atomic write pattern: temp file, sync, rename. A crash
    /// mid-write never leaves a truncated document behind.
    pub fn write(&mut self, document: &NormalizedDocument) -> Result<PathBuf> {
        let stem = self.allocator.allocate(&document.identity.title);
        let filename = if self.id_prefix {
            format!("{}-{stem}.md", document.identity.page_id)
        } else {
            format!("{stem}.md")
        };
        let output_file = self.out_dir.join(&filename);
        let temp_file = self.out_dir.join(format!(".{filename}.tmp"));

        let content = render_document(document, self.include_headings)?;
        {
            let mut file = File::create(&temp_file)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        // On Windows, rename fails if the destination already exists
        #[cfg(target_os = "windows")]
        if output_file.exists() {
            fs::remove_file(&output_file)?;
        }

        fs::rename(&temp_file, &output_file)?;
        Ok(output_file)
    }
}

/// Renders the full document text: frontmatter, title heading, body.
pub fn render_document(document: &NormalizedDocument, include_headings: bool) -> Result<String> {
    let frontmatter = Frontmatter {
        page_id: document.identity.page_id,
        title: &document.identity.title,
        url: &document.identity.url,
        categories: &document.categories,
        sections: &document.section_index,
    };
    let yaml = serde_yaml_ng::to_string(&frontmatter)?;
    let body = render_sections(&document.sections, include_headings);
    let body = body.trim_end();

    let mut content = format!(
        "---\n{}\n---\n\n# {}\n",
        yaml.trim_end(),
        document.identity.title
    );
    if !body.is_empty() {
        content.push('\n');
        content.push_str(body);
        content.push('\n');
    }
    Ok(content)
}

/// Streaming CSV writer for the `list` command.
pub struct PageListWriter {
    file: File,
}

impl PageListWriter {
    /// Creates the file and writes the header row.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = File::create(path)?;
        writeln!(file, "page_id,ns,title,fullurl,lastrevid,length")?;
        Ok(Self { file })
    }

    pub fn write_summary(&mut self, summary: &PageSummary) -> Result<()> {
        writeln!(
            self.file,
            "{},{},{},{},{},{}",
            summary.page_id,
            summary.ns,
            escape_field(&summary.title),
            escape_field(&summary.url),
            summary.last_rev_id.map(|id| id.to_string()).unwrap_or_default(),
            summary.length.map(|len| len.to_string()).unwrap_or_default(),
        )?;
        Ok(())
    }

    pub fn finish(self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

/// Append-only CSV log of pages that failed to harvest.
///
/// The file is opened and the header written only when the first failure
/// arrives, and every record is flushed immediately, so a crashed run
/// still leaves a usable log.
pub struct FailureLog {
    path: PathBuf,
    file: Option<File>,
}

impl FailureLog {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path, file: None }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&mut self, failure: &FailureRecord) -> Result<()> {
        let file = match &mut self.file {
            Some(file) => file,
            slot => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)?;
                if file.metadata()?.len() == 0 {
                    writeln!(file, "page_id,title,url,error")?;
                }
                slot.insert(file)
            }
        };
        writeln!(
            file,
            "{},{},{},{}",
            failure.page_id,
            escape_field(&failure.title),
            escape_field(&failure.url),
            escape_field(&failure.error),
        )?;
        file.flush()?;
        Ok(())
    }
}

/// Quotes a CSV field when it contains a delimiter, quote, or newline.
pub(crate) fn escape_field(value: &str) -> String {
    if value.contains(['"', ',', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::Section;
    use crate::types::PageIdentity;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn sample_document() -> NormalizedDocument {
        NormalizedDocument {
            identity: PageIdentity {
                page_id: 12,
                title: "Badab War".to_string(),
                url: "https://w/wiki/Badab_War".to_string(),
            },
            categories: vec!["Wars".to_string()],
            section_index: vec!["History".to_string(), "Sources".to_string()],
            sections: vec![
                Section {
                    heading: None,
                    body: "A rebellion.".to_string(),
                },
                Section {
                    heading: Some("History".to_string()),
                    body: "It began.".to_string(),
                },
            ],
        }
    }

    #[test]
    fn rendered_document_has_frontmatter_title_and_body() {
        let content = render_document(&sample_document(), true).unwrap();
        assert!(content.starts_with("---\n"));
        assert!(content.contains("page_id: 12"));
        assert!(content.contains("title: Badab War"));
        assert!(content.contains("- Wars"));
        assert!(content.contains("- History"));
        assert!(content.contains("\n---\n\n# Badab War\n\n"));
        assert!(content.contains("A rebellion.\n\n## History\n\nIt began."));
        assert!(content.ends_with("It began.\n"));
    }

    #[test]
    fn empty_section_index_is_omitted_from_frontmatter() {
        let mut document = sample_document();
        document.section_index.clear();
        let content = render_document(&document, true).unwrap();
        assert!(!content.contains("sections:"));
    }

    #[test]
    fn writer_places_documents_and_resolves_collisions() {
        let dir = tempdir().unwrap();
        let mut writer = DocumentWriter::new(dir.path(), false, true).unwrap();
        let first = writer.write(&sample_document()).unwrap();
        let second = writer.write(&sample_document()).unwrap();
        assert_eq!(first.file_name().unwrap(), "Badab_War.md");
        assert_eq!(second.file_name().unwrap(), "Badab_War_2.md");
        assert!(first.exists() && second.exists());
    }

    #[test]
    fn id_prefix_changes_the_filename() {
        let dir = tempdir().unwrap();
        let mut writer = DocumentWriter::new(dir.path(), true, true).unwrap();
        let path = writer.write(&sample_document()).unwrap();
        assert_eq!(path.file_name().unwrap(), "12-Badab_War.md");
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempdir().unwrap();
        let mut writer = DocumentWriter::new(dir.path(), false, true).unwrap();
        writer.write(&sample_document()).unwrap();
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn page_list_round_trips_through_the_input_reader() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pages.csv");
        let mut writer = PageListWriter::create(&path).unwrap();
        writer
            .write_summary(&PageSummary {
                page_id: 5,
                ns: 0,
                title: "Huron, Blackheart".to_string(),
                url: "https://w/wiki/Huron".to_string(),
                last_rev_id: Some(3),
                length: None,
            })
            .unwrap();
        writer.finish().unwrap();

        let records = crate::input::read_page_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identity.page_id, 5);
        assert_eq!(records[0].identity.title, "Huron, Blackheart");
    }

    #[test]
    fn failure_log_writes_header_once_and_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("failures.csv");
        let mut log = FailureLog::new(path.clone());
        let failure = FailureRecord {
            page_id: 9,
            title: "Lost, Page".to_string(),
            url: "https://w/wiki/Lost".to_string(),
            error: "Empty content for page 9".to_string(),
        };
        log.record(&failure).unwrap();
        log.record(&failure).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "page_id,title,url,error");
        assert_eq!(
            lines[1],
            "9,\"Lost, Page\",https://w/wiki/Lost,Empty content for page 9"
        );
    }

    #[test]
    fn failure_log_creates_no_file_without_failures() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("failures.csv");
        let _log = FailureLog::new(path.clone());
        assert!(!path.exists());
    }

    #[test]
    fn escape_field_quotes_only_when_needed() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
