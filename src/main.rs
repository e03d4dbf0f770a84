mod cache;
mod config;
mod models;
mod orchestrator;
mod pipeline;
mod providers;
mod storage;
mod utils;

use anyhow::{bail, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{AppConfig, ProviderKind};
use crate::orchestrator::{maintenance, DailyOptions, DailyOutcome, Orchestrator};
use crate::pipeline::{summary_line, CollectRequest, Pipeline, Window};
use crate::storage::Repository;

#[derive(Parser)]
#[command(name = "market-collector", about = "Daily equity bar collector", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Run one collector over its symbol universe
    Collect {
        #[arg(long, value_enum)]
        provider: ProviderKind,

        /// Days to look back from today
        #[arg(long = "days_back", conflicts_with_all = ["month", "start_date"])]
        days_back: Option<u32>,

        /// Whole calendar month, YYYY-MM
        #[arg(long, conflicts_with = "start_date")]
        month: Option<String>,

        /// Inclusive start, YYYY-MM-DD
        #[arg(long = "start_date", requires = "end_date")]
        start_date: Option<NaiveDate>,

        /// Inclusive end, YYYY-MM-DD
        #[arg(long = "end_date", requires = "start_date")]
        end_date: Option<NaiveDate>,

        /// 1-based batch of 20 symbols
        #[arg(long)]
        batch: Option<usize>,

        /// Collect these symbols instead of the configured universe
        #[arg(long, num_args = 1..)]
        symbols: Vec<String>,
    },

    /// Primary collector with fallback, then maintenance (cron entry point)
    Daily {
        #[arg(long, value_enum)]
        primary: Option<ProviderKind>,

        #[arg(long, value_enum)]
        secondary: Option<ProviderKind>,

        /// Run even on weekends and market holidays
        #[arg(long)]
        force: bool,
    },

    /// Apply the retention window and refresh statistics
    Maintain {
        #[arg(long = "retention_days")]
        retention_days: Option<u32>,
    },

    /// Show database statistics
    Stats,

    /// List all stored ticker symbols
    Symbols,

    /// Apply schema migrations without loading data
    Migrate,
}

fn window(
    days_back: Option<u32>,
    month: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Window {
    match (days_back, month, start_date, end_date) {
        (Some(days), _, _, _) => Window::DaysBack(days),
        (_, Some(month), _, _) => Window::Month(month),
        (_, _, Some(start), Some(end)) => Window::Between(start, end),
        _ => Window::Default,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "market_collector=info,warn",
        1 => "market_collector=debug,info",
        _ => "trace",
    };

    // stdout carries the summary line; logs go to stderr
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Collect {
            provider,
            days_back,
            month,
            start_date,
            end_date,
            batch,
            symbols,
        } => {
            let _t = utils::Timer::start(format!("{} collection", provider.cli_name()));
            let request = CollectRequest {
                window: window(days_back, month, start_date, end_date),
                batch,
                symbols,
            };
            let summary = Pipeline::new(config).run(provider, &request).await?;
            println!("{}", summary_line(&summary)?);
        }

        Command::Daily {
            primary,
            secondary,
            force,
        } => {
            let _t = utils::Timer::start("Daily run");
            let options = DailyOptions {
                primary,
                secondary,
                force,
            };
            let today = Utc::now().date_naive();
            match Orchestrator::new(config)?.run_daily(today, &options).await? {
                DailyOutcome::Skipped { reason } => info!("Done: skipped ({})", reason),
                DailyOutcome::Collected { provider, records } => {
                    info!("Done: {} records via {}", records, provider.cli_name())
                }
                DailyOutcome::Failed => bail!("Both collectors failed"),
            }
        }

        Command::Maintain { retention_days } => {
            let _t = utils::Timer::start("Maintenance");
            let repo = Repository::open(&config.storage.db_path)?;
            repo.run_migrations()?;
            let days = retention_days.unwrap_or(config.storage.retention_days);
            let report = maintenance::run_maintenance(&repo, Utc::now().date_naive(), days)?;
            println!(
                "Maintenance: {} bars before {} deleted, {} sources in view.",
                report.deleted,
                report.cutoff,
                report.by_source.len()
            );
        }

        Command::Stats => {
            let repo = Repository::open(&config.storage.db_path)?;
            repo.run_migrations()?;
            let bars = repo.bar_count()?;
            let symbols = repo.symbol_count()?;
            let (min, max) = repo.date_range().unwrap_or((None, None));
            println!("─────────────────────────────────");
            println!("  Market Collector — Database Stats");
            println!("─────────────────────────────────");
            println!("  Symbols  : {}", utils::fmt_number(symbols));
            println!("  EOD bars : {}", utils::fmt_number(bars));
            for (source, n) in repo.counts_by_source()? {
                println!("    {:<13}: {}", source, utils::fmt_number(n));
            }
            println!("  From     : {}", min.map(|d| d.to_string()).unwrap_or("—".into()));
            println!("  To       : {}", max.map(|d| d.to_string()).unwrap_or("—".into()));
            let runs = repo.recent_runs(5)?;
            if !runs.is_empty() {
                println!("  Recent runs:");
                for run in &runs {
                    println!(
                        "    #{:<4} {} {:<13} {:<8} {:>6} records{}",
                        run.id,
                        run.started_at.format("%Y-%m-%d %H:%M"),
                        run.source,
                        run.status,
                        run.records,
                        run.error_msg
                            .as_deref()
                            .map(|e| format!(" ({})", e))
                            .unwrap_or_default(),
                    );
                }
            }
            println!("─────────────────────────────────");
        }

        Command::Symbols => {
            let repo = Repository::open(&config.storage.db_path)?;
            repo.run_migrations()?;
            let syms = repo.list_symbols()?;
            if syms.is_empty() {
                println!("No symbols — run `market-collector collect` first.");
            } else {
                println!("{} symbols:", syms.len());
                for s in &syms {
                    let latest = repo.latest_date_for_symbol(s)?;
                    println!(
                        "  {:<8} {}",
                        s,
                        latest.map(|d| d.to_string()).unwrap_or_default()
                    );
                }
            }
        }

        Command::Migrate => {
            Repository::open(&config.storage.db_path)?.run_migrations()?;
            println!("Migrations applied.");
        }
    }

    Ok(())
}
