// Command-line entry point: run, schedule and query job ingestion

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use job_ingest::sources::RemoteOk;
use job_ingest::{
    IngestionRunStats, Ingestor, JobFilter, JobService, OpenAI, SqliteStore,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "job-ingest", version, about = "Ingest, enrich and search job listings")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one ingestion now
    Run,

    /// Run ingestion on a fixed interval until interrupted
    Watch {
        /// Minutes between runs (default: INGESTION_INTERVAL_MINUTES)
        #[arg(long)]
        interval_minutes: Option<u64>,
    },

    /// Ranked free-text search over stored jobs
    Search {
        query: String,

        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Only remote jobs
        #[arg(long)]
        remote: bool,

        /// Restrict to a source (repeatable)
        #[arg(long = "source")]
        sources: Vec<String>,

        /// Minimum quality score
        #[arg(long)]
        min_quality: Option<u8>,
    },

    /// Print one stored job as JSON
    Get { id: String },

    /// Show value counts for every filter
    Facets,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,job_ingest=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    let service = build_service(&config).await?;

    match cli.command {
        Command::Run => {
            let cancel = cancel_on_ctrl_c();
            let stats = service
                .trigger_ingestion_until_cancelled(cancel)
                .await
                .context("Ingestion run failed")?;
            print_stats(&stats);
            if !stats.success {
                std::process::exit(1);
            }
        }
        Command::Watch { interval_minutes } => {
            let minutes = interval_minutes.unwrap_or(config.interval_minutes).max(1);
            watch(&service, Duration::from_secs(minutes * 60)).await?;
        }
        Command::Search {
            query,
            limit,
            remote,
            sources,
            min_quality,
        } => {
            let mut filter = JobFilter::new();
            filter.sources = sources;
            filter.remote_only = remote;
            filter.min_quality = min_quality;

            let hits = service.search(&query, &filter, limit, 0).await?;
            if hits.is_empty() {
                println!("{}", "No matching jobs".yellow());
            }
            for hit in hits {
                println!(
                    "{:>7.2}  {}  {} @ {}",
                    hit.score,
                    hit.job.id.dimmed(),
                    hit.job.title.bold(),
                    hit.job.company
                );
            }
        }
        Command::Get { id } => {
            let job = service.get_job(&id).await?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
        Command::Facets => {
            let facets = service.filter_facets().await?;
            let sections = [
                ("Sources", &facets.sources),
                ("Employment types", &facets.employment_types),
                ("Seniority", &facets.seniority),
                ("Categories", &facets.categories),
                ("Work arrangements", &facets.work_arrangements),
            ];
            for (label, values) in sections {
                println!("{}", label.bold());
                for facet in values {
                    println!("  {:<24} {}", facet.value, facet.count);
                }
            }
            println!("{} {}", "Remote:".bold(), facets.remote);
        }
    }

    Ok(())
}

async fn build_service(config: &Config) -> Result<JobService> {
    tracing::info!("Connecting to database...");
    let store = SqliteStore::new(&config.database_url)
        .await
        .context("Failed to open job store")?;
    tracing::info!("Database connected");

    let mut ingestor = Ingestor::new(Arc::new(store))
        .with_config(config.ingest_config())
        .with_source(Arc::new(RemoteOk::new()));

    if let Some(key) = config.openai_api_key.as_ref().filter(|_| config.enable_ai) {
        let ai = OpenAI::new(key.expose_secret()).with_model(&config.openai_model);
        ingestor = ingestor.with_ai(Arc::new(ai));
        tracing::info!(model = %config.openai_model, "AI enrichment enabled");
    } else {
        tracing::info!("AI enrichment disabled, using rule-based extraction");
    }

    Ok(JobService::new(ingestor))
}

/// Cancel the returned token on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight batches");
            token.cancel();
        }
    });
    cancel
}

async fn watch(service: &JobService, every: Duration) -> Result<()> {
    let cancel = cancel_on_ctrl_c();
    let mut ticker = tokio::time::interval(every);
    tracing::info!(interval_secs = every.as_secs(), "Scheduled ingestion started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancel.cancelled() => break,
        }

        let stats = service
            .trigger_ingestion_until_cancelled(cancel.clone())
            .await
            .context("Ingestion run failed")?;
        print_stats(&stats);

        if stats.cancelled {
            break;
        }
    }

    tracing::info!("Scheduled ingestion stopped");
    Ok(())
}

fn print_stats(stats: &IngestionRunStats) {
    println!("{}", stats);
    let status = if stats.success {
        "Run succeeded".green().bold()
    } else if stats.cancelled {
        "Run cancelled".yellow().bold()
    } else {
        "Run degraded".red().bold()
    };
    println!("{}", status);
}
