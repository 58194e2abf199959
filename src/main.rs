use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::Parser;

use doc_scanner_rust::detector::ThresholdDetector;
use doc_scanner_rust::pdf::RasterPdfConverter;
use doc_scanner_rust::processor::{DocumentProcessor, ImageUpload};
use doc_scanner_rust::server::run_server;
use doc_scanner_rust::settings;

#[derive(Parser, Debug)]
#[command(
    name = "doc-scanner-rust",
    version,
    about = "Scan document photos into single-page PDFs"
)]
struct Cli {
    /// Run the HTTP API server
    #[arg(long = "serve")]
    serve: bool,

    /// Server bind address
    #[arg(short = 'a', long = "addr", default_value = "127.0.0.1:8080")]
    addr: String,

    /// Output directory for generated PDFs (defaults to the upload folder)
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,

    /// Image files to scan
    images: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    doc_scanner_rust::logging::init(cli.verbose)?;

    let settings_path = cli.read_settings.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    if cli.serve {
        return run_server(settings, cli.addr).await;
    }

    if cli.images.is_empty() {
        return Err(anyhow!(
            "no input images (use --serve to run the HTTP server)"
        ));
    }

    let output_dir = cli
        .output
        .map(PathBuf::from)
        .unwrap_or_else(|| settings.upload_folder.clone());
    let processor =
        DocumentProcessor::new(ThresholdDetector::default(), RasterPdfConverter, output_dir);

    let mut uploads = Vec::new();
    for input in &cli.images {
        let path = Path::new(input);
        if !settings.is_allowed_extension(path) {
            eprintln!("skipping {}: extension not allowed", path.display());
            continue;
        }
        let stem = path
            .file_stem()
            .and_then(|value| value.to_str())
            .unwrap_or("scan")
            .to_string();
        uploads.push(ImageUpload::from_file(path, stem)?);
    }

    let pdf_files = processor.process_images(&uploads)?;
    for pdf_file in &pdf_files {
        println!("{}", pdf_file.display());
    }
    if pdf_files.len() < uploads.len() {
        eprintln!(
            "{} image(s) had no detectable document",
            uploads.len() - pdf_files.len()
        );
    }
    Ok(())
}
