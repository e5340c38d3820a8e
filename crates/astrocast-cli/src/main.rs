mod commands;
mod sources;

use std::path::PathBuf;
use std::sync::Arc;

use astrocast_core::Period;
use astrocast_prediction::{GenerationSettings, PredictionPipeline};
use astrocast_providers::Orchestrator;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::sources::{FileChartStore, FileEphemeris};

#[derive(Debug, Parser)]
#[command(name = "astrocast")]
#[command(about = "Personalized horoscope predictions from natal charts and transits")]
struct Cli {
    /// JSON file of natal charts keyed by user id
    #[arg(long, global = true, default_value = "config/charts.example.json")]
    charts: PathBuf,
    /// JSON file of transiting planet longitudes
    #[arg(long, global = true, default_value = "config/transits.example.json")]
    transits: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate a prediction
    Predict {
        #[arg(long)]
        user: String,
        /// day, tomorrow, week or month
        #[arg(long, default_value = "day")]
        period: Period,
        /// Use the generative tier
        #[arg(long)]
        paid: bool,
        /// Provider id to try first (paid tier)
        #[arg(long)]
        provider: Option<String>,
        /// Fix the template choice for reproducible free-tier output
        #[arg(long)]
        seed: Option<u64>,
        /// Print the prediction as JSON
        #[arg(long)]
        json: bool,
    },
    /// Stream a paid-tier prediction as it is generated
    Stream {
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "day")]
        period: Period,
        #[arg(long)]
        provider: Option<String>,
    },
    /// Show which generative providers are configured
    Status,
    /// Show the token price table in effect
    Pricing,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = astrocast_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);
    tracing::debug!(
        env = %config.env,
        providers = ?orchestrator.list_available_providers(),
        "orchestrator ready"
    );

    match cli.command {
        Commands::Status => commands::run_status(&orchestrator),
        Commands::Pricing => commands::run_pricing(&orchestrator),
        Commands::Predict {
            user,
            period,
            paid,
            provider,
            seed,
            json,
        } => {
            let mut pipeline = build_pipeline(&cli.charts, &cli.transits, &orchestrator)?
                .with_settings(GenerationSettings::from_config(&config));
            if let Some(seed) = seed {
                pipeline = pipeline.with_template_seed(seed);
            }
            let options = commands::PredictOptions {
                user,
                period,
                paid,
                provider,
                json,
            };
            commands::run_predict(&pipeline, options).await
        }
        Commands::Stream {
            user,
            period,
            provider,
        } => {
            let pipeline = build_pipeline(&cli.charts, &cli.transits, &orchestrator)?
                .with_settings(GenerationSettings::from_config(&config));
            commands::run_stream(&pipeline, &user, period, provider).await
        }
    }
}

fn build_pipeline(
    charts: &std::path::Path,
    transits: &std::path::Path,
    orchestrator: &Arc<Orchestrator>,
) -> anyhow::Result<PredictionPipeline> {
    let charts = Arc::new(FileChartStore::load(charts)?);
    let ephemeris = Arc::new(FileEphemeris::load(transits)?);
    Ok(PredictionPipeline::new(
        charts,
        ephemeris,
        Arc::clone(orchestrator),
    ))
}
