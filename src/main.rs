//! CLI entry point for the sample frame tool.
//!
//! Provides subcommands for preparing the location sample frame from an
//! ArcMap export and for drawing turnover-weighted replacement locations.

use anyhow::Result;
use clap::{Parser, Subcommand};
use sample_frame::frame::{FrameConfig, prepare_sample_frame};
use sample_frame::output::{print_json, print_pretty};
use sample_frame::sampling::{SamplingConfig, sample_replacements};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "sample_frame")]
#[command(about = "Prepare and sample the location sample frame", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge donor locations into their acceptors and filter the sample frame
    PrepareFrame {
        /// File to load. Location data exported from ArcMap
        #[arg(short, long, default_value = "SampleFrame2022.xls")]
        infile: PathBuf,

        /// Overwrite the output file(s) if they already exist
        #[arg(short, long, default_value_t = false)]
        force: bool,

        /// Year used in the output file names
        #[arg(long, default_value_t = 2022)]
        year: u16,

        /// Minimum combined outlet count for a location to stay in the frame
        #[arg(long, default_value_t = 250.0)]
        min_outlets: f64,
    },
    /// Select replacement locations per region, weighted by turnover
    SampleReplacements {
        /// File to load
        #[arg(short, long, default_value = "Currentsamplingframe.xlsx")]
        infile: PathBuf,

        /// Number of replacement locations to generate per region
        #[arg(short = 'n', long = "n_locations", default_value_t = 5)]
        n_locations: usize,

        /// Output file path
        #[arg(short, long, default_value = "Replacement locations.xlsx")]
        outfile: PathBuf,

        /// Overwrite the output file if it already exists
        #[arg(short, long, default_value_t = false)]
        force: bool,

        /// Seed for the random draws, for repeatable selections
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/sample_frame.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("sample_frame.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::PrepareFrame {
            infile,
            force,
            year,
            min_outlets,
        } => {
            let config = FrameConfig {
                year,
                min_outlets,
                overwrite: force,
                ..FrameConfig::default()
            };
            let summary = prepare_sample_frame(&infile, &config)?;
            print_pretty(&summary);
            print_json(&summary)?;
        }
        Commands::SampleReplacements {
            infile,
            n_locations,
            outfile,
            force,
            seed,
        } => {
            let config = SamplingConfig {
                n_locations,
                overwrite: force,
                seed,
            };
            let summary = sample_replacements(&infile, &outfile, &config)?;
            print_pretty(&summary);
            print_json(&summary)?;
        }
    }

    Ok(())
}
