//! One-shot predictions and backtests from the command line.
//!
//! Prints the same JSON the HTTP endpoints return.

use anyhow::Result;
use clap::{Parser, Subcommand};
use finrl_insight::application::bootstrap::ServicesBootstrap;
use finrl_insight::config::Config;
use finrl_insight::interfaces::http::dto::{BacktestResponse, PredictionResponse};

#[derive(Parser)]
#[command(name = "finrl-insight")]
#[command(about = "FinRL policy predictions and backtests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Pretty-print the JSON output
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Predict the next close for a ticker
    Predict {
        #[arg(short, long)]
        symbol: String,
    },
    /// Backtest the policy over the recent holdout window
    Backtest {
        #[arg(short, long)]
        symbol: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays parseable.
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let services = ServicesBootstrap::init(&config)?;

    let value = match cli.command {
        Command::Predict { symbol } => {
            let result = services.service.predict(&symbol).await?;
            serde_json::to_value(PredictionResponse::from(result))?
        }
        Command::Backtest { symbol } => {
            let result = services.service.backtest(&symbol).await?;
            serde_json::to_value(BacktestResponse::from(result))?
        }
    };

    let output = if cli.pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    println!("{}", output);

    Ok(())
}
