use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use tracing::{info, warn};

use leadwatch::collectors::fetch::{BrowserlessFetcher, HttpFetcher, PageFetcher};
use leadwatch::collectors::{self, Platform};
use leadwatch::config::{cycle_interval, Config};
use leadwatch::db::{self, LeadStore};
use leadwatch::notify::discord::DiscordNotifier;
use leadwatch::notify::{LogNotifier, NotificationQueue, Notifier};
use leadwatch::output::terminal;
use leadwatch::pipeline::{arm_shutdown, IngestionPipeline, PipelineMode, Scheduler};

/// Leadwatch: keyword-driven lead harvesting.
///
/// Searches Twitter/X, LinkedIn, Reddit and Upwork for posts matching your
/// keywords, stores each one once, and alerts you about new ones.
#[derive(Parser)]
#[command(name = "leadwatch", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Run search cycles until interrupted (Ctrl-C)
    Run {
        /// Minutes between cycles (default: LEADWATCH_INTERVAL_MINUTES)
        #[arg(long)]
        interval_minutes: Option<u64>,

        /// What to do with new leads (default: from LEADWATCH_DRAFTS / LEADWATCH_AUTO_APPLY)
        #[arg(long, value_enum)]
        mode: Option<PipelineMode>,
    },

    /// Run a single search cycle and exit
    Once {
        /// What to do with new leads (default: from LEADWATCH_DRAFTS / LEADWATCH_AUTO_APPLY)
        #[arg(long, value_enum)]
        mode: Option<PipelineMode>,
    },

    /// List the most recent leads
    Leads {
        /// Number of leads to show (default: 20)
        #[arg(long, default_value = "20")]
        limit: u32,

        /// Only show leads from this platform (twitter, linkedin, reddit, upwork)
        #[arg(long)]
        platform: Option<Platform>,
    },

    /// Render the outreach draft for a stored lead and mark it drafted
    Draft {
        /// Platform the lead came from
        platform: Platform,

        /// The lead's id on that platform
        external_id: String,
    },

    /// Show system status (lead counts, last cycle, DB size)
    Status,

    /// Start the read-only web dashboard
    #[cfg(feature = "web")]
    Serve {
        /// Port to listen on (default: 3000)
        #[arg(long, default_value = "3000")]
        port: u16,

        /// Address to bind (default: 127.0.0.1)
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("leadwatch=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing Leadwatch database...");
            let config = Config::load()?;
            let store = db::initialize_store(&config.db_path)?;
            let table_count = store.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nLeadwatch is ready. Optional: set DISCORD_TOKEN and DISCORD_CHANNEL_ID");
            println!("  in your .env file to get alerts in Discord.");
            println!("\nThen run: cargo run -- once");
        }

        Commands::Run {
            interval_minutes,
            mode,
        } => {
            // Listen before the first cycle so an early Ctrl-C still drains
            let shutdown = arm_shutdown(shutdown_signal());

            let config = Config::load()?;
            let store = db::open_store(&config.db_path)?;
            let mode = mode.unwrap_or_else(|| config.mode());
            let minutes = interval_minutes.unwrap_or(config.interval_minutes).max(1);

            let mut scheduler = build_scheduler(&config, store, mode, minutes)?;
            println!(
                "Searching {} platform(s) for {} keyword(s) every {} minute(s) ({}). Ctrl-C to stop.",
                config.platforms.len(),
                config.keywords.len(),
                minutes,
                mode
            );

            let cycles = scheduler.run_until(shutdown).await;
            println!("\nStopping after {cycles} cycle(s). Delivering queued alerts...");
            let stats = scheduler.shutdown().await;
            terminal::display_queue_stats(&stats);
        }

        Commands::Once { mode } => {
            let config = Config::load()?;
            let store = db::open_store(&config.db_path)?;
            let mode = mode.unwrap_or_else(|| config.mode());

            let mut scheduler = build_scheduler(&config, store, mode, config.interval_minutes)?
                .with_progress(true);
            let report = scheduler.run_cycle().await;
            let stats = scheduler.shutdown().await;

            terminal::display_cycle_report(&report);
            terminal::display_queue_stats(&stats);
            println!("\n{}", report.summary().bold());
        }

        Commands::Leads { limit, platform } => {
            let config = Config::load()?;
            let store = db::open_store(&config.db_path)?;
            let leads = store
                .recent_leads(limit, platform.map(|p| p.as_str()))
                .await?;
            terminal::display_leads(&leads);
        }

        Commands::Draft {
            platform,
            external_id,
        } => {
            let config = Config::load()?;
            let store = db::open_store(&config.db_path)?;
            let lead = store
                .get_lead(platform.as_str(), &external_id)
                .await?
                .with_context(|| format!("No {platform} lead with id {external_id}"))?;

            let text = leadwatch::draft::render(&lead);
            terminal::display_draft(&lead, &text);
            store.mark_drafted(&lead.platform, &lead.external_id).await?;
            if !lead.draft_generated {
                println!("  {} marked as drafted", "✓".green());
            }
        }

        Commands::Status => {
            let config = Config::load()?;
            if !leadwatch::status::is_initialized(&config.db_path) {
                println!("Database: not initialized");
                println!("\nRun `leadwatch init` to set up the database.");
                return Ok(());
            }
            let store = db::open_store(&config.db_path)?;
            leadwatch::status::show(&store, &config.db_path).await?;
        }

        #[cfg(feature = "web")]
        Commands::Serve { port, bind } => {
            let config = Config::load()?;
            let store = db::open_store(&config.db_path)?;
            leadwatch::web::run_server(store, port, &bind).await?;
        }
    }

    Ok(())
}

/// Wire collectors, notifier and store into a scheduler.
fn build_scheduler(
    config: &Config,
    store: Arc<dyn LeadStore>,
    mode: PipelineMode,
    interval_minutes: u64,
) -> Result<Scheduler> {
    let fetcher = build_fetcher(config)?;
    let collectors =
        collectors::build_collectors(&config.platforms, fetcher, config.max_results_per_query);

    let queue = NotificationQueue::start(build_notifier(config), config.notify_queue);
    let pipeline = IngestionPipeline::new(store, queue, mode);

    Ok(Scheduler::new(
        pipeline,
        collectors,
        config.keywords.clone(),
        cycle_interval(interval_minutes),
    ))
}

/// Browserless when configured, plain HTTP otherwise.
fn build_fetcher(config: &Config) -> Result<Arc<dyn PageFetcher>> {
    match config.browserless_url.as_deref() {
        Some(url) => {
            info!(url, headless = config.headless, "Rendering pages through Browserless");
            let fetcher = BrowserlessFetcher::new(
                url,
                config.browserless_token.as_deref(),
                config.headless,
            )
            .context("Failed to build Browserless client")?;
            Ok(Arc::new(fetcher))
        }
        None => {
            let fetcher = HttpFetcher::new().context("Failed to build HTTP client")?;
            Ok(Arc::new(fetcher))
        }
    }
}

/// Discord when both token and channel are set, log-only otherwise.
fn build_notifier(config: &Config) -> Arc<dyn Notifier> {
    match config.discord() {
        Some((token, channel_id)) => {
            Arc::new(DiscordNotifier::new(token.to_string(), channel_id.to_string()))
        }
        None => {
            info!("DISCORD_TOKEN / DISCORD_CHANNEL_ID not set, alerts go to the log");
            Arc::new(LogNotifier)
        }
    }
}

/// Resolves on Ctrl-C. If the handler can't be installed, never resolves.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
