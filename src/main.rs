//! GEX profile CLI
//!
//! # Usage
//!
//! ```bash
//! # One pass over a saved chain snapshot
//! gex-profile analyze --input data/spy_2024-01-19.json
//!
//! # One pass against Tradier (TRADIER_API_KEY must be set)
//! gex-profile fetch --ticker SPX --dte week
//! gex-profile fetch --ticker SPY --expiry 2024-01-19
//!
//! # Keep refreshing until Ctrl-C, with commentary (GEMINI_API_KEY)
//! gex-profile --config config/default.toml --annotate watch --ticker SPX
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use gex_profile::annotation::{annotate_or_placeholder, Annotator, GenerativeAnnotator};
use gex_profile::config::{self, AppConfig};
use gex_profile::data::{parse_snapshot, ChainRequest, ChainSource, ExpirationPreference, TradierClient};
use gex_profile::pipeline::{GexAnalyzer, ProfileOutcome};
use gex_profile::refresh::RefreshCoordinator;

/// Dealer gamma-exposure profile CLI.
#[derive(Parser)]
#[command(name = "gex-profile")]
#[command(about = "Dealer gamma-exposure profiles and spread recommendations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Add narrative commentary to each report
    #[arg(long, global = true)]
    annotate: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a chain snapshot stored as JSON
    Analyze {
        /// Path to snapshot file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Fetch a live chain and analyze it once
    Fetch(SelectionArgs),

    /// Refresh periodically and print each published report
    Watch(SelectionArgs),
}

#[derive(Args)]
struct SelectionArgs {
    /// Underlying symbol
    #[arg(short, long)]
    ticker: String,

    /// Exact expiration (YYYY-MM-DD)
    #[arg(long, conflicts_with = "dte")]
    expiry: Option<NaiveDate>,

    /// Relative expiration: 0dte, 1dte, week or month
    #[arg(long, default_value = "0dte")]
    dte: ExpirationPreference,
}

impl SelectionArgs {
    fn request(&self) -> ChainRequest {
        match self.expiry {
            Some(date) => ChainRequest::for_date(&self.ticker, date),
            None => ChainRequest::new(&self.ticker, self.dte),
        }
    }
}

fn build_annotator(config: &AppConfig, requested: bool) -> Result<Option<Arc<dyn Annotator>>> {
    if !(requested || config.annotation.enabled) {
        return Ok(None);
    }
    if config::gemini_key().is_none() {
        warn!("{} not set; commentary will be a placeholder", config::GEMINI_API_KEY);
    }
    let annotator = GenerativeAnnotator::new(config::gemini_key(), config.annotation.clone())
        .context("Failed to build commentary client")?;
    Ok(Some(Arc::new(annotator)))
}

fn build_tradier(config: &AppConfig) -> Result<TradierClient> {
    let token = config::tradier_token()?;
    TradierClient::new(token, config.tradier.clone(), config.expiration.clone())
        .context("Failed to build Tradier client")
}

fn print_outcome(outcome: &ProfileOutcome) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}

async fn run_once(
    config: &AppConfig,
    annotator: Option<Arc<dyn Annotator>>,
    snapshot: gex_profile::ChainSnapshot,
) -> Result<()> {
    let analyzer = GexAnalyzer::new(&config.analytics);
    let mut outcome = analyzer.outcome(&snapshot)?;

    if let (Some(annotator), ProfileOutcome::Ready(report)) = (annotator, &mut outcome) {
        let commentary = annotate_or_placeholder(&*annotator, report, config.annotation.timeout()).await;
        report.commentary = Some(commentary);
    }

    print_outcome(&outcome)
}

async fn cmd_analyze(config: &AppConfig, annotator: Option<Arc<dyn Annotator>>, input: PathBuf) -> Result<()> {
    let text = tokio::fs::read_to_string(&input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let snapshot = parse_snapshot(&text).with_context(|| format!("Invalid snapshot in {}", input.display()))?;
    info!(
        ticker = %snapshot.ticker,
        expiration = %snapshot.expiration,
        contracts = snapshot.contracts.len(),
        "Loaded snapshot"
    );
    run_once(config, annotator, snapshot).await
}

async fn cmd_fetch(config: &AppConfig, annotator: Option<Arc<dyn Annotator>>, args: SelectionArgs) -> Result<()> {
    let client = build_tradier(config)?;
    let request = args.request();
    let snapshot = client
        .fetch(&request)
        .await
        .with_context(|| format!("Failed to fetch chain for {}", request.ticker))?;
    run_once(config, annotator, snapshot).await
}

async fn cmd_watch(config: &AppConfig, annotator: Option<Arc<dyn Annotator>>, args: SelectionArgs) -> Result<()> {
    let source: Arc<dyn ChainSource> = Arc::new(build_tradier(config)?);
    let mut coordinator = RefreshCoordinator::new(source, &config.analytics, config.refresh.clone(), args.request());
    if let Some(annotator) = annotator {
        coordinator = coordinator.with_annotator(annotator, config.annotation.timeout());
    }
    let coordinator = Arc::new(coordinator);

    let cancel = CancellationToken::new();
    let runner = tokio::spawn(Arc::clone(&coordinator).run(cancel.clone()));

    let mut reports = coordinator.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
            changed = reports.changed() => {
                if changed.is_err() {
                    break;
                }
                let published = reports.borrow_and_update().clone();
                if let Some(published) = published {
                    print_outcome(&published.outcome)?;
                }
            }
        }
    }

    cancel.cancel();
    runner.await.context("Refresh task panicked")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("gex_profile=info".parse()?))
        .init();

    config::load_dotenv();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let annotator = build_annotator(&config, cli.annotate)?;

    match cli.command {
        Commands::Analyze { input } => cmd_analyze(&config, annotator, input).await?,
        Commands::Fetch(args) => cmd_fetch(&config, annotator, args).await?,
        Commands::Watch(args) => cmd_watch(&config, annotator, args).await?,
    }

    Ok(())
}
