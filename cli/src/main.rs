//! pdfinspect CLI - print the text and tables of a PDF's first page

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use colored::Colorize;
use log::LevelFilter;

use pdfinspect::{InspectOptions, JsonFormat, ReportFormat, TableStrategy};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (PDF backend: lopdf 0.34)");

#[derive(Parser)]
#[command(name = "pdfinspect")]
#[command(version = VERSION)]
#[command(about = "Print the text and tables found on the first page of a PDF", long_about = None)]
struct Cli {
    /// PDF file to inspect
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// Report format
    #[arg(long, value_enum, env = "PDFINSPECT_FORMAT", default_value = "text")]
    format: Format,

    /// How tables are located
    #[arg(long, value_enum, env = "PDFINSPECT_TABLE_STRATEGY", default_value = "lines")]
    table_strategy: Strategy,

    /// Preserve the page layout in extracted text
    #[arg(long)]
    layout: bool,

    /// Output compact JSON
    #[arg(long)]
    compact: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Delimited text and table sections
    Text,
    /// JSON document
    Json,
}

impl From<Format> for ReportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => ReportFormat::Text,
            Format::Json => ReportFormat::Json,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Strategy {
    /// Ruling lines and rectangle edges
    Lines,
    /// Whitespace alignment of words
    Text,
}

impl From<Strategy> for TableStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Lines => TableStrategy::Lines,
            Strategy::Text => TableStrategy::Text,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins over `-v` when both are given.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let options = InspectOptions::new()
        .with_layout(cli.layout)
        .with_table_strategy(cli.table_strategy.into());

    log::debug!("inspecting {}", cli.path.display());
    let inspection = pdfinspect::inspect_file(&cli.path, &options)?;

    let json = if cli.compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    inspection.write_report(&mut out, cli.format.into(), json)?;
    out.flush()?;
    Ok(())
}
