//! Dump every committed annotation to a CSV file.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use ophtha_labeler::config::AppConfig;
use ophtha_labeler::export::{export_csv, open_existing, DEFAULT_EXPORT_FILE};
use ophtha_labeler::{logging, Result};

/// Export annotation records as CSV.
#[derive(Parser, Debug)]
#[command(name = "export_labels", version, about)]
struct Args {
    /// Database connection string or path (overrides config and environment)
    #[arg(long)]
    database: Option<String>,

    /// CSV file to write
    #[arg(short, long, default_value = DEFAULT_EXPORT_FILE)]
    output: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(count) => {
            println!("✅ Exported {} records to {}", count, args.output.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("❌ Export failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<usize> {
    let mut config = AppConfig::load()?;
    config.apply_overrides(args.database.clone(), None);
    logging::init(config.log_level.to_level_filter());

    let library = open_existing(&config.database()?)?;
    export_csv(&library, &args.output)
}
