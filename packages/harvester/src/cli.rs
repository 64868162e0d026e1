//! Command-line interface for the harvester.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use scraper::Html;

use crate::config::{
    validate_threshold, BASE_URL, DEFAULT_DELAY_MS, DEFAULT_OUTPUT_DIR, SIMILARITY_THRESHOLD,
};
use crate::error::{HarvesterError, Result};
use crate::harvester::{HarvestEvent, HarvestOptions, Harvester, Pipeline};
use crate::http::HttpSource;
use crate::markup::Segmenter;
use crate::render::{save_topics, Manifest, RenderOptions};
use crate::resolver::KeyResolver;
use crate::store::TopicStore;
use crate::traversal::page_title;

/// Tafseer Harvester - Collect commentary sections from dorar.net into
/// per-topic Markdown documents.
#[derive(Parser)]
#[command(name = "tafseer-harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Crawl the encyclopedia and write one document per topic.
    Harvest {
        /// Output directory
        #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
        output: PathBuf,

        /// Only crawl the first N books
        #[arg(short, long)]
        limit: Option<usize>,

        /// Pause between requests in milliseconds
        #[arg(long, default_value_t = DEFAULT_DELAY_MS)]
        delay_ms: u64,

        /// Heading similarity threshold in (0, 1]
        #[arg(short, long, default_value_t = SIMILARITY_THRESHOLD)]
        threshold: f64,

        /// Site root to crawl
        #[arg(long, default_value = BASE_URL)]
        base_url: String,

        /// Wrap prose paragraphs at this many characters
        #[arg(long)]
        wrap: Option<usize>,
    },

    /// Segment one saved page and print its sections as YAML.
    Inspect {
        /// HTML file to segment
        file: PathBuf,

        /// Heading similarity threshold in (0, 1]
        #[arg(short, long, default_value_t = SIMILARITY_THRESHOLD)]
        threshold: f64,
    },

    /// Segment saved pages of one book and write the topic documents.
    Render {
        /// Directory of `.html` pages, processed in file name order
        dir: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
        output: PathBuf,

        /// Book title for every entry (default: the directory name)
        #[arg(short, long)]
        source_title: Option<String>,

        /// Heading similarity threshold in (0, 1]
        #[arg(short, long, default_value_t = SIMILARITY_THRESHOLD)]
        threshold: f64,

        /// Wrap prose paragraphs at this many characters
        #[arg(long)]
        wrap: Option<usize>,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Harvest {
            output,
            limit,
            delay_ms,
            threshold,
            base_url,
            wrap,
        } => harvest_command(
            HarvestOptions {
                base_url,
                delay: Duration::from_millis(delay_ms),
                limit,
                threshold,
            },
            &output,
            wrap,
        ),
        Commands::Inspect { file, threshold } => inspect_command(&file, threshold),
        Commands::Render {
            dir,
            output,
            source_title,
            threshold,
            wrap,
        } => render_command(&dir, &output, source_title.as_deref(), threshold, wrap),
    }
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Execute the harvest command.
fn harvest_command(options: HarvestOptions, output: &Path, wrap: Option<usize>) -> Result<()> {
    // Validate inputs before making HTTP requests
    validate_threshold(options.threshold)?;

    println!(
        "{} {} into {}",
        style("Harvesting").bold(),
        style(&options.base_url).cyan(),
        style(output.display()).green()
    );
    println!();

    let mut harvester = Harvester::new(HttpSource::new()?, options)?;

    let pb = spinner();
    pb.set_message("Reading book index...");

    let mut current_book = String::new();
    let result = harvester.run_with_progress(|event| match event {
        HarvestEvent::Index { books } => {
            pb.println(format!("  Books: {books}"));
        }
        HarvestEvent::Book {
            position,
            total,
            book,
        } => {
            current_book = format!("[{position}/{total}] {}", book.title);
            pb.set_message(current_book.clone());
        }
        HarvestEvent::Page { title, fragments } => {
            pb.set_message(format!("{current_book}: {title} ({fragments})"));
        }
    });

    let stats = match result {
        Ok(stats) => stats,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    pb.set_message("Writing documents...");
    let manifest = match write_documents(harvester.store(), output, wrap) {
        Ok(manifest) => manifest,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };
    pb.finish_and_clear();

    println!("  Pages: {}", stats.pages);
    println!("  Sections: {}", stats.fragments);
    if stats.skipped_pages > 0 {
        println!(
            "  Skipped pages: {}",
            style(stats.skipped_pages).yellow().bold()
        );
    }
    print_summary(&manifest, output);

    Ok(())
}

/// Execute the inspect command.
fn inspect_command(file: &Path, threshold: f64) -> Result<()> {
    let html = fs::read_to_string(file)?;
    let segmenter = Segmenter::with_defaults()?;
    let mut resolver = KeyResolver::new(threshold)?;

    let fragments = segmenter.segment(&html, &mut resolver);
    print!("{}", serde_yaml_ng::to_string(&fragments)?);

    Ok(())
}

/// Execute the render command.
fn render_command(
    dir: &Path,
    output: &Path,
    source_title: Option<&str>,
    threshold: f64,
    wrap: Option<usize>,
) -> Result<()> {
    if !dir.is_dir() {
        return Err(HarvesterError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Input directory does not exist: {}", dir.display()),
        )));
    }

    let source_title = source_title.map(String::from).unwrap_or_else(|| {
        dir.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    let pages = html_files(dir)?;
    println!(
        "{} {} pages of {}",
        style("Rendering").bold(),
        style(pages.len()).cyan(),
        style(&source_title).green()
    );
    println!();

    let mut pipeline = Pipeline::new(threshold)?;
    for path in &pages {
        let document = Html::parse_document(&fs::read_to_string(path)?);
        let mut title = page_title(&document);
        if title.is_empty() {
            title = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        pipeline.ingest(&document, &source_title, &title);
    }

    let manifest = write_documents(pipeline.store(), output, wrap)?;
    print_summary(&manifest, output);

    Ok(())
}

/// List the `.html` files of a directory sorted by name.
fn html_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "html") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn write_documents(store: &TopicStore, output: &Path, wrap: Option<usize>) -> Result<Manifest> {
    let options = RenderOptions {
        wrap_width: wrap,
        ..RenderOptions::default()
    };
    save_topics(store.topics(), &options, output)
}

fn print_summary(manifest: &Manifest, output: &Path) {
    println!("  Topics: {}", manifest.topic_count);
    println!();
    println!(
        "{} {}",
        style("Saved to:").green().bold(),
        output.display()
    );
}
