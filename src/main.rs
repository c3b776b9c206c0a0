// ABOUTME: Main entry point for the html2pptx program.
// ABOUTME: Provides the CLI interface and runs the conversion pipeline from the library.

use clap::Parser;
use html2pptx::{AspectRatio, Config, Pipeline};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing the numbered HTML documents
    #[arg(long, alias = "inputDir", default_value = html2pptx::config::DEFAULT_INPUT_DIR)]
    input_dir: PathBuf,

    /// Directory the deck is written to (created if missing)
    #[arg(long, alias = "outputDir", default_value = html2pptx::config::DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// File name of the generated deck
    #[arg(long, default_value = html2pptx::config::DEFAULT_OUTPUT_NAME)]
    output_name: String,

    /// Extension of the documents to convert
    #[arg(long, default_value = "html")]
    extension: String,

    /// Maximum number of documents rendered at once
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Viewport width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Viewport height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Screenshot format: png or jpeg
    #[arg(long)]
    format: Option<String>,

    /// Page load timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Pause after loading so animations can finish, in milliseconds
    #[arg(long)]
    settle_delay_ms: Option<u64>,

    /// Wait for this CSS selector instead of the settle delay
    #[arg(long)]
    ready_selector: Option<String>,

    /// Maximum characters copied onto each text slide
    #[arg(long, default_value_t = html2pptx::config::DEFAULT_MAX_TEXT_CHARS)]
    max_text_chars: usize,

    /// Skip the extracted-text slides
    #[arg(long)]
    no_text: bool,

    /// Write an empty deck instead of failing when no documents are found
    #[arg(long)]
    allow_empty: bool,

    /// Slide aspect ratio: 16:9 or 4:3
    #[arg(long, default_value = "16:9")]
    aspect_ratio: AspectRatio,

    /// Presentation title stored in the deck properties
    #[arg(long, default_value = "Presentation")]
    title: String,

    /// Path to the Chrome/Chromium executable
    #[arg(long)]
    browser_path: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let app_config = Config::from_env();
    let mut render = app_config.get_render_config(
        cli.width,
        cli.height,
        cli.format,
        cli.timeout_ms,
        cli.settle_delay_ms,
    );
    render.max_text_chars = cli.max_text_chars;
    render.extract_text = !cli.no_text;
    render.ready_selector = cli.ready_selector;
    if cli.browser_path.is_some() {
        render.browser_path = cli.browser_path;
    }

    let mut config = app_config.get_convert_config(
        Some(cli.input_dir),
        Some(cli.output_dir),
        cli.concurrency,
        render,
    );
    config.output_name = cli.output_name;
    config.extension = cli.extension;
    config.allow_empty = cli.allow_empty;
    config.aspect = cli.aspect_ratio;
    config.title = cli.title;

    match Pipeline::new(config).run().await {
        Ok(report) => {
            println!(
                "Converted {}/{} documents into {} slides: {}",
                report.rendered,
                report.documents,
                report.slides,
                report.output_path.display()
            );
            for failure in &report.failures {
                eprintln!("  skipped {}: {}", failure.document, failure.message);
            }
        }
        Err(e) => {
            eprintln!("Error ({}): {}", e.stage(), e);
            std::process::exit(1);
        }
    }
}
