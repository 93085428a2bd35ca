//! Command-line interface for the harvester.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{self, validate_requests_per_sec, ClientConfig};
use crate::error::Result;
use crate::harvester::{harvest_with, list_pages, HarvestOptions, ListOptions};
use crate::input::read_page_records;
use crate::sections::SectionOptions;

/// WikiRAG Harvester - Download wiki pages as clean Markdown documents.
#[derive(Parser)]
#[command(name = "wikirag-harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enumerate every page in a namespace into a page-list CSV.
    List {
        /// Output CSV path
        #[arg(short, long, default_value = "pages.csv")]
        output: PathBuf,

        /// MediaWiki API endpoint
        #[arg(long, default_value = config::DEFAULT_API_ENDPOINT)]
        endpoint: String,

        /// Namespace to enumerate (0 = main articles)
        #[arg(long, default_value_t = 0)]
        namespace: i64,

        /// Page summaries per request (1-500)
        #[arg(long, default_value_t = config::DEFAULT_BATCH_SIZE)]
        batch_size: u32,

        /// Request ceiling in requests per second
        #[arg(long, default_value_t = config::DEFAULT_REQUESTS_PER_SEC)]
        rate: f64,
    },

    /// Harvest the pages listed in a CSV into Markdown documents.
    Harvest {
        /// Input page-list CSV (from the list command); rows with a
        /// pagecontent column convert offline, without fetching
        input: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "corpus")]
        out_dir: PathBuf,

        /// Failure log path (default: <OUT_DIR>/failures.csv)
        #[arg(long)]
        failure_log: Option<PathBuf>,

        /// MediaWiki API endpoint
        #[arg(long, default_value = config::DEFAULT_API_ENDPOINT)]
        endpoint: String,

        /// Request ceiling in requests per second
        #[arg(long, default_value_t = config::DEFAULT_REQUESTS_PER_SEC)]
        rate: f64,

        /// Prefix filenames with the page id
        #[arg(long)]
        id_prefix: bool,

        /// Omit section headings from document bodies
        #[arg(long)]
        no_headings: bool,

        /// Additional section titles to drop (repeatable)
        #[arg(long = "ban", value_name = "TITLE")]
        ban: Vec<String>,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::List {
            output,
            endpoint,
            namespace,
            batch_size,
            rate,
        } => list_command(output, endpoint, namespace, batch_size, rate),
        Commands::Harvest {
            input,
            out_dir,
            failure_log,
            endpoint,
            rate,
            id_prefix,
            no_headings,
            ban,
        } => harvest_command(
            input,
            out_dir,
            failure_log,
            endpoint,
            rate,
            id_prefix,
            no_headings,
            ban,
        ),
    }
}

fn client_config(endpoint: String, rate: f64) -> Result<ClientConfig> {
    validate_requests_per_sec(rate)?;
    let mut client = ClientConfig::for_endpoint(endpoint);
    client.requests_per_sec = rate;
    Ok(client)
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {pos} {msg}")
            .expect("valid template"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn list_command(
    output: PathBuf,
    endpoint: String,
    namespace: i64,
    batch_size: u32,
    rate: f64,
) -> Result<()> {
    let options = ListOptions {
        client: client_config(endpoint, rate)?,
        namespace,
        batch_size,
        output,
    };

    println!(
        "{} namespace {} from {}",
        style("Listing").bold(),
        style(options.namespace).cyan(),
        style(&options.client.endpoint).green()
    );

    let pb = spinner();
    let count = match list_pages(&options, |summary| {
        pb.inc(1);
        pb.set_message(summary.title.clone());
    }) {
        Ok(count) => count,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };
    pb.finish_and_clear();

    println!(
        "{} {} pages to {}",
        style("Listed").green().bold(),
        count,
        options.output.display()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn harvest_command(
    input: PathBuf,
    out_dir: PathBuf,
    failure_log: Option<PathBuf>,
    endpoint: String,
    rate: f64,
    id_prefix: bool,
    no_headings: bool,
    ban: Vec<String>,
) -> Result<()> {
    let client = client_config(endpoint, rate)?;

    // Read and validate the whole input before making HTTP requests
    let records = read_page_records(&input)?;

    let mut sections = SectionOptions {
        include_headings: !no_headings,
        ..SectionOptions::default()
    };
    sections
        .banned
        .extend(ban.into_iter().map(|title| title.to_lowercase()));

    let options = HarvestOptions {
        client,
        failure_log: failure_log.unwrap_or_else(|| out_dir.join("failures.csv")),
        out_dir,
        id_prefix,
        sections,
    };

    println!(
        "{} {} pages into {}",
        style("Harvesting").bold(),
        style(records.len()).cyan(),
        style(options.out_dir.display()).green()
    );
    println!();

    let pb = ProgressBar::new(records.len() as u64);
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40.green} {pos}/{len} {msg}")
            .expect("valid template"),
    );

    let report = match harvest_with(&records, &options, |record, _outcome| {
        pb.set_message(record.identity.title.clone());
        pb.inc(1);
    }) {
        Ok(report) => report,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };
    pb.finish_and_clear();

    println!(
        "{} {} written, {} failed",
        style("Done:").green().bold(),
        report.written,
        report.failures.len()
    );
    if !report.failures.is_empty() {
        println!(
            "{} {}",
            style("Failures logged to:").yellow(),
            options.failure_log.display()
        );
    }
    Ok(())
}
