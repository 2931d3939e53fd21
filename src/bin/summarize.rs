use std::{fs, path::PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use paperblog::{
    config, logging,
    processing::{StageStatus, SummaryPipeline, UploadedDocument},
};

#[derive(Parser)]
#[command(
    name = "paperblog-summarize",
    about = "Turn a research paper PDF into a blog-style summary"
)]
struct Cli {
    /// PDF to summarize.
    pdf: PathBuf,
    /// Also write the summary to this file.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_cli_tracing();
    let config = config::init_config()?;

    let filename = cli
        .pdf
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| cli.pdf.display().to_string());
    let bytes =
        fs::read(&cli.pdf).with_context(|| format!("failed to read {}", cli.pdf.display()))?;
    let upload = UploadedDocument::new(filename, bytes);
    if !upload.has_pdf_extension() {
        bail!("{} is not a PDF", cli.pdf.display());
    }

    let pipeline = SummaryPipeline::from_config(&config)?;
    let report = pipeline.summarize_upload(upload).await;

    for line in &report.stages {
        match line.status {
            StageStatus::Succeeded => eprintln!("✅ {}", line.message),
            StageStatus::Failed => eprintln!("❌ {}", line.message),
            StageStatus::Skipped => {}
        }
    }

    let Some(summary) = report.summary else {
        bail!("no summary generated for {}", report.filename);
    };
    println!("{summary}");

    if let Some(path) = cli.output {
        fs::write(&path, &summary)
            .with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("Summary written to {}", path.display());
    }
    Ok(())
}
