//! Layout Translate CLI - Command line tool for layout-preserving PDF translation.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use layout_translate_core::{AppConfig, DocumentTranslator, Lang, PdfDocument, TranslatorConfig};
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "layout-translate")]
#[command(author, version, about = "Translate PDF documents in place, preserving layout", long_about = None)]
struct Args {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output PDF file (default: input-<target>.pdf)
    output: Option<PathBuf>,

    /// Target language code
    #[arg(short = 't', long, default_value = "fr")]
    target: String,

    /// Extraction worker pool width per page
    #[arg(short = 'w', long)]
    workers: Option<usize>,

    /// Retries per translation request before falling back to original text
    #[arg(long)]
    retry_limit: Option<u32>,

    /// OpenAI API base URL
    #[arg(long, env = "OPENAI_API_BASE", default_value = "http://localhost:8080/v1")]
    api_base: String,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY")]
    api_key: Option<String>,

    /// Model name for OpenAI-compatible API
    #[arg(long, env = "OPENAI_MODEL", default_value = "default_model")]
    model: String,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Disable the fragment translation cache
    #[arg(long)]
    no_cache: bool,

    /// Keep output uncompressed
    #[arg(long)]
    no_compress: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Load or create config
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };

    // Override config with CLI arguments
    config.target_lang = Lang::new(&args.target);

    if let Some(workers) = args.workers {
        config.worker_count = workers;
    }

    if args.no_cache {
        config.cache.enabled = false;
    }

    if args.no_compress {
        config.compress_output = false;
    }

    // Configure translator
    let mut translator_config = TranslatorConfig::new(args.api_base, args.api_key, args.model);
    if let Some(retry_limit) = args.retry_limit {
        translator_config.retry_count = retry_limit;
    }
    config.translator = translator_config;

    // Load input PDF
    info!("Loading PDF: {}", args.input.display());
    let mut doc = PdfDocument::from_file(&args.input)
        .context(format!("Failed to load PDF: {}", args.input.display()))?;

    let total_pages = doc.page_count();
    info!("Document has {} pages", total_pages);

    if total_pages == 0 {
        anyhow::bail!("Document has no pages");
    }

    let target = config.target_lang.clone();
    let compress = config.compress_output;

    // Create translator
    let translator = DocumentTranslator::new(config).context("Failed to initialize translator")?;

    // Setup progress bar
    #[allow(clippy::cast_possible_truncation)]
    let pb = ProgressBar::new(total_pages as u64);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let progress: Box<dyn Fn(usize, usize) + Send> = {
        let pb = pb.clone();
        #[allow(clippy::cast_possible_truncation)]
        Box::new(move |done: usize, _total: usize| {
            pb.set_position(done as u64);
        })
    };

    let report = translator.translate_document(&mut doc, Some(progress)).await;

    pb.finish_with_message("Translation complete");

    for page_num in &report.pages_failed {
        // Page numbers are 1-indexed for humans
        tracing::warn!("Page {} kept its original text", page_num + 1);
    }

    if report.pages_translated == 0 {
        anyhow::bail!("No pages could be translated");
    }

    // Determine output path
    let output_path = args.output.unwrap_or_else(|| {
        let stem = args
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        args.input
            .with_file_name(format!("{stem}-{target}.pdf"))
    });

    // Save output
    doc.save(&output_path, compress)
        .context(format!("Failed to write output: {}", output_path.display()))?;

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!(
            "Translated {}/{} pages ({} fragments, {} kept original, {} cache hits)",
            report.pages_translated,
            report.pages_total,
            report.fragments,
            report.fallbacks,
            report.cache_hits
        );
        println!("Translated PDF saved to: {}", output_path.display());
    }

    Ok(())
}
