mod commands;
mod output;

use clap::{Parser, Subcommand};
use rollcall_core::error::RollcallError;
use rollcall_core::AnalyzerConfig;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "rollcall",
    version,
    about = "Count students on handwritten cleanup sign-in sheets"
)]
struct Cli {
    /// Gemini API key (overrides GEMINI_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Model to try before the built-in fallbacks (overrides GEMINI_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    /// JSON config file (models, limits, timeouts)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log debug output, including raw model replies
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one sheet (image or PDF; every PDF page is analyzed)
    Analyze {
        /// Path to a JPEG, PNG, WebP or PDF file
        input_file: PathBuf,

        /// Lot the sheet belongs to. Without it the lot is read from the sheet header
        #[arg(short, long = "lot", value_name = "NAME")]
        lot: Option<String>,

        /// ID of the lot given with --lot (defaults to its name)
        #[arg(long, requires = "lot")]
        lot_id: Option<String>,

        /// Roster (JSON or XLSX) with lots and students
        #[arg(short, long, value_name = "FILE")]
        roster: Option<PathBuf>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Analyze many sheets and assign each to a lot from the roster
    Bulk {
        /// Sheet images or PDFs
        #[arg(required = true)]
        input_files: Vec<PathBuf>,

        /// Roster (JSON or XLSX) with the lots to match against
        #[arg(short, long, value_name = "FILE")]
        roster: PathBuf,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Write the report to a JSON file
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Resolve a lot name as written on a sheet to a roster lot
    MatchLot {
        /// Lot name as read from the sheet
        detected: String,

        /// Roster (JSON or XLSX) with lots
        #[arg(short, long, value_name = "FILE")]
        roster: PathBuf,
    },
    /// Show whether the model is configured
    Status {
        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("rollcall=debug,rollcall_core=debug,warn")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("rollcall=info,rollcall_core=info,warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<AnalyzerConfig, RollcallError> {
    let mut config = match &cli.config {
        Some(path) => AnalyzerConfig::load(path)?,
        None => AnalyzerConfig::default(),
    };
    config.apply_env();
    if let Some(key) = &cli.api_key {
        config.api_key = Some(key.clone());
    }
    if let Some(model) = &cli.model {
        config.prefer_model(model);
    }
    Ok(config)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match load_config(&cli) {
        Ok(config) => match cli.command {
            Commands::Analyze {
                input_file,
                lot,
                lot_id,
                roster,
                output,
            } => commands::analyze::run(config, input_file, lot, lot_id, roster, &output).await,
            Commands::Bulk {
                input_files,
                roster,
                output,
                out,
            } => commands::bulk::run(config, input_files, roster, &output, out).await,
            Commands::MatchLot { detected, roster } => {
                commands::match_lot::run(&detected, &roster)
            }
            Commands::Status { output } => commands::status::run(&config, &output),
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
