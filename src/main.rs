// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// Use library instead of local modules
use textbook_fees::{
    calculate_with, export_totals, read_grid, render, AmbiguityPolicy, CalcOptions, FeeReport,
};

#[derive(Parser)]
#[command(name = "textbook-fees")]
#[command(about = "Per-student textbook fees from a bookseller list and a purchase log")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the book list, purchases and per-student fees for one class
    #[command(after_help = "\
Examples:
  textbook-fees report --books 售书单.xlsx --students 学生.xlsx --class 电气231
  textbook-fees report --books books.csv --students log.csv --class 电气231 --export fees.xlsx")]
    Report {
        #[command(flatten)]
        input: InputArgs,

        /// Print the full report as JSON instead of text
        #[arg(long)]
        json: bool,

        /// Write per-student totals to .txt, .csv or .xlsx
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
    },

    /// Open the interactive terminal viewer
    View {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Bookseller price list (.xlsx, .xls, .ods, .csv, .tsv)
    #[arg(long, value_name = "FILE")]
    books: PathBuf,

    /// Student purchase log (.xlsx, .xls, .ods, .csv, .tsv)
    #[arg(long, value_name = "FILE")]
    students: PathBuf,

    /// Target class identifier, e.g. 电气231
    #[arg(long)]
    class: String,

    /// Only flag matches that needed the aggressive (tier 2) normalization
    #[arg(long)]
    tier2_only: bool,

    /// Log pipeline progress to stderr
    #[arg(long, short)]
    verbose: bool,
}

impl InputArgs {
    fn options(&self) -> CalcOptions {
        if self.tier2_only {
            CalcOptions::with_ambiguity(AmbiguityPolicy::Tier2Only)
        } else {
            CalcOptions::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            input,
            json,
            export,
        } => {
            init_tracing(input.verbose);
            run_report(&input, json, export.as_deref())?;
        }
        Commands::View { input } => {
            init_tracing(input.verbose);
            run_ui_mode(&input)?;
        }
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise warnings only, or info with `--verbose`.
/// Logs go to stderr so stdout stays clean for the report.
fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_report(input: &InputArgs) -> Result<FeeReport> {
    let book_grid = read_grid(&input.books)
        .with_context(|| format!("Failed to load book list {}", input.books.display()))?;
    let student_grid = read_grid(&input.students)
        .with_context(|| format!("Failed to load student list {}", input.students.display()))?;

    let report = calculate_with(&book_grid, &student_grid, &input.class, &input.options())?;
    Ok(report)
}

fn run_report(input: &InputArgs, json: bool, export: Option<&Path>) -> Result<()> {
    let report = load_report(input)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render(&report));
    }

    if let Some(path) = export {
        export_totals(&report, path)?;
        eprintln!("✓ Exported student fees to {}", path.display());
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(input: &InputArgs) -> Result<()> {
    let report = load_report(input)?;

    // Create and run app
    let mut app = ui::App::new(report);
    ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_input: &InputArgs) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or print the report: textbook-fees report --books ... --students ... --class ...");
    std::process::exit(1);
}
