use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use noah::core::HoldingsError;
use noah::core::log::init_logging;
use std::process::ExitCode;

#[derive(Parser)]
#[command(version, about = "Show the top-weighted holding of each ARK fund")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Comma separated fund symbols, overrides the configured list
    #[arg(short, long, value_delimiter = ',')]
    funds: Option<Vec<String>>,

    /// Render the top holdings as a table
    #[arg(short, long)]
    table: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
}

async fn top(cli: Cli) -> Result<()> {
    let mut config = noah::load_config(cli.config_path.as_deref())?;
    if let Some(funds) = cli.funds {
        config.funds = funds;
    }
    let format = if cli.table {
        noah::OutputFormat::Table
    } else {
        noah::OutputFormat::Map
    };

    tokio::select! {
        result = noah::run(&config, format) => result,
        _ = tokio::signal::ctrl_c() => Err(anyhow!("Interrupted")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => noah::cli::setup::setup(),
        None => top(cli).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "Application failed");
            // Fetch failures get a fixed message, everything else its own text.
            match e.downcast_ref::<HoldingsError>() {
                Some(fetch_error) => println!("{}", fetch_error.user_message()),
                None => println!("{e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
