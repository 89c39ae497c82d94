//! Coursepack CLI - build course artifacts from a VisualSpec document
//!
//! Prints one `[TAG]` line per stage to stdout.
//! Returns non-zero on validation, configuration or I/O failure.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use coursepack_core::{
    config::{BuildConfig, DEFAULT_OUTDIR},
    BuildPipeline, PipelineError, Status, StatusReporter,
};

#[derive(Parser)]
#[command(name = "coursepack-cli")]
#[command(about = "VisualSpec builder (HTML/DOCX/PDF/ZIP)")]
struct Cli {
    /// Path to course_data.json (VisualSpec)
    json_path: PathBuf,

    /// Output directory (if relative: resolved against the input JSON folder)
    #[arg(long, default_value = DEFAULT_OUTDIR)]
    outdir: PathBuf,

    /// Comma-separated exports override: html,lecture_docx,quiz_docx,pdf,zip
    #[arg(long)]
    only: Option<String>,

    /// Validate the document and exit
    #[arg(long)]
    validate_only: bool,
}

struct StdoutReporter;

impl StatusReporter for StdoutReporter {
    fn report(&mut self, status: Status, message: &str) {
        println!("{} {}", status, message);
    }
}

fn exit_code(err: &PipelineError) -> ExitCode {
    match err {
        PipelineError::Configuration(_) => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("coursepack_core=warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = BuildConfig::new(&cli.json_path, &cli.outdir, cli.only.as_deref(), cli.validate_only);

    let pipeline = match BuildPipeline::new() {
        Ok(p) => p,
        Err(e) => {
            println!("[ERROR] {}", e);
            return ExitCode::FAILURE;
        }
    };

    match pipeline.run(&config, &mut StdoutReporter) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            println!("[ERROR] {}", e);
            exit_code(&e)
        }
    }
}
