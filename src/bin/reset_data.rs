//! Delete the annotation database and, after confirmation, the classified copies.

use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use ophtha_labeler::config::{AppConfig, DatabaseLocation};
use ophtha_labeler::reset::{remove_classified, remove_database, RemoveOutcome};
use ophtha_labeler::{logging, Result};

/// Reset the labeler to a clean state. Original images are never touched.
#[derive(Parser, Debug)]
#[command(name = "reset_data", version, about)]
struct Args {
    /// Database connection string or path (overrides config and environment)
    #[arg(long)]
    database: Option<String>,

    /// Base directory that holds the `Classified` folder
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Delete the classified folder without asking
    #[arg(short, long)]
    yes: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(()) => {
            println!("\n✨ Project clean.");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("❌ Reset failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let mut config = AppConfig::load()?;
    config.apply_overrides(args.database.clone(), args.output_dir.clone());
    logging::init(config.log_level.to_level_filter());

    // 1. Database file
    match config.database()? {
        DatabaseLocation::File(path) => match remove_database(&path)? {
            RemoveOutcome::Removed(path) => println!("✅ Database '{}' removed.", path.display()),
            RemoveOutcome::NotFound(path) => {
                println!("ℹ️  No database found at '{}'.", path.display())
            }
            RemoveOutcome::Kept(_) => {}
        },
        DatabaseLocation::Memory => println!("ℹ️  In-memory database, nothing to remove."),
    }

    // 2. Classified copies
    let assume_yes = args.yes;
    match remove_classified(&config.output_dir, |root| assume_yes || ask(root))? {
        RemoveOutcome::Removed(root) => println!("✅ Folder '{}' removed.", root.display()),
        RemoveOutcome::NotFound(root) => println!("ℹ️  No folder found at '{}'.", root.display()),
        RemoveOutcome::Kept(root) => {
            println!("ℹ️  Kept '{}'.", root.display())
        }
    }

    Ok(())
}

/// Ask on stdin; anything but "y"/"yes" is a no
fn ask(root: &Path) -> bool {
    print!(
        "⚠️  Delete '{}' and everything in it? (y/n): ",
        root.display()
    );
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}
