//! Collector loop: walks a symbol universe for one provider and writes what
//! it gets into the warehouse.
//!
//! ## Per symbol
//!
//!   1. Cache lookup (when enabled); a hit skips the limiter and the network.
//!   2. Limiter admission, then fetch with a bounded number of attempts and a
//!      fixed delay in between. Only transient errors are retried.
//!   3. Upsert the symbol's rows in its own transaction.
//!   4. Failures are logged and counted; the loop moves on.
//!
//! One symbol at a time, one request in flight. Re-running the same window
//! rewrites the same keys, so the row count does not change.

pub mod rate_limiter;

use crate::cache::DataCache;
use crate::config::{AppConfig, CollectorSettings, ProviderKind};
use crate::models::{CollectionSummary, DailyBar, DateRange};
use crate::providers::{build_source, BarSource, ProviderError};
use crate::storage::Repository;
use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use std::cell::Cell;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;
use tracing::{debug, error, info, warn};

use self::rate_limiter::RateLimiter;

/// Prefix of the machine-readable summary line a `collect` run prints.
pub const SUMMARY_MARKER: &str = "COLLECT_SUMMARY";

/// Symbols per `--batch` slice.
pub const BATCH_SIZE: usize = 20;

pub fn summary_line(summary: &CollectionSummary) -> Result<String> {
    let json = serde_json::to_string(summary).context("Failed to encode summary")?;
    Ok(format!("{} {}", SUMMARY_MARKER, json))
}

// ── Collector ─────────────────────────────────────────────────────────────────

pub struct Collector<'a> {
    source: &'a dyn BarSource,
    repo: &'a Repository,
    settings: &'a CollectorSettings,
    cache: Option<DataCache>,
    limiter: Option<RateLimiter>,
}

impl<'a> Collector<'a> {
    pub fn new(
        source: &'a dyn BarSource,
        repo: &'a Repository,
        settings: &'a CollectorSettings,
    ) -> Self {
        Self {
            source,
            repo,
            settings,
            cache: None,
            limiter: settings.calls_per_minute.map(RateLimiter::new),
        }
    }

    pub fn with_cache(mut self, cache: DataCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Never fails: every error ends up logged and as an empty result.
    async fn fetch_with_retry(&mut self, symbol: &str, range: DateRange) -> Vec<DailyBar> {
        if let Some(cache) = &self.cache {
            if let Some(bars) = cache.load::<Vec<DailyBar>>(symbol, range.start) {
                let bars: Vec<DailyBar> =
                    bars.into_iter().filter(|b| range.contains(b.date)).collect();
                if !bars.is_empty() {
                    info!("{}: {} bars from cache", symbol, bars.len());
                    return bars;
                }
            }
        }

        if let Some(limiter) = self.limiter.as_mut() {
            limiter.wait().await;
        }

        let max_attempts = self.settings.max_attempts.max(1);
        let retries = FixedInterval::new(self.settings.retry_delay())
            .take(max_attempts as usize - 1);
        let attempt = Cell::new(0u32);
        let source = self.source;

        let result = RetryIf::spawn(
            retries,
            || {
                attempt.set(attempt.get() + 1);
                source.fetch(symbol, range)
            },
            |e: &ProviderError| {
                warn!(
                    "{}: attempt {}/{} failed: {}",
                    symbol,
                    attempt.get(),
                    max_attempts,
                    e
                );
                e.is_transient()
            },
        )
        .await;

        match result {
            Ok(bars) => {
                if let Some(cache) = &self.cache {
                    cache.save(symbol, range.start, &bars);
                }
                bars
            }
            Err(ProviderError::NoData { .. }) => {
                info!("{}: no data for {}", symbol, range);
                Vec::new()
            }
            Err(e) => {
                error!("{}: giving up: {}", symbol, e);
                Vec::new()
            }
        }
    }

    pub async fn run(&mut self, symbols: &[String], range: DateRange) -> CollectionSummary {
        let source = self.source.id();
        let run_id = match self.repo.begin_run(source) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Could not log collection run: {:#}", e);
                None
            }
        };

        info!(
            "=== {}: {} symbols, {} ===",
            source,
            symbols.len(),
            range
        );

        let mut summary = CollectionSummary {
            source,
            symbols_total: symbols.len(),
            symbols_ok: 0,
            records: 0,
            aborted: false,
        };
        let mut consecutive_failures = 0u32;

        for (i, symbol) in symbols.iter().enumerate() {
            let bars = self.fetch_with_retry(symbol, range).await;

            let stored = if bars.is_empty() {
                false
            } else {
                match self.repo.upsert_daily_bars(&bars) {
                    Ok(n) => {
                        summary.records += n;
                        summary.symbols_ok += 1;
                        debug!(
                            "{}: stored {} bars (latest {:?})",
                            symbol,
                            n,
                            bars.iter().map(|b| b.date).max()
                        );
                        true
                    }
                    Err(e) => {
                        error!("{}: insert failed: {:#}", symbol, e);
                        false
                    }
                }
            };

            if stored {
                consecutive_failures = 0;
            } else {
                consecutive_failures += 1;
            }

            if let Some(limit) = self.settings.max_consecutive_failures {
                if consecutive_failures >= limit {
                    warn!(
                        "{}: {} failures in a row, stopping after {}",
                        source, consecutive_failures, symbol
                    );
                    summary.aborted = true;
                    break;
                }
            }

            let delay = self.settings.symbol_delay();
            if i + 1 < symbols.len() && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        if let Some(run_id) = run_id {
            let error = summary
                .aborted
                .then(|| format!("aborted after {} consecutive failures", consecutive_failures));
            if let Err(e) = self.repo.finish_run(run_id, &summary, error.as_deref()) {
                warn!("Could not close collection run {}: {:#}", run_id, e);
            }
        }

        info!(
            "=== Done: {} | {}/{} symbols | {} records{} ===",
            source,
            summary.symbols_ok,
            summary.symbols_total,
            summary.records,
            if summary.aborted { " | aborted" } else { "" },
        );

        summary
    }
}

// ── Request resolution ────────────────────────────────────────────────────────

/// Date window asked for on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Window {
    /// Provider's default look-back.
    #[default]
    Default,
    DaysBack(u32),
    /// `YYYY-MM`
    Month(String),
    Between(NaiveDate, NaiveDate),
}

impl Window {
    pub fn resolve(&self, today: NaiveDate, default_days_back: u32) -> Result<DateRange> {
        match self {
            Window::Default => DateRange::days_back(today, default_days_back).with_context(|| {
                format!("Default look-back of {} days is out of range", default_days_back)
            }),
            Window::DaysBack(days) => DateRange::days_back(today, *days)
                .with_context(|| format!("--days_back {} is out of range", days)),
            Window::Month(month) => DateRange::month(month, today)
                .with_context(|| format!("Invalid month {:?}, expected YYYY-MM", month)),
            Window::Between(start, end) => DateRange::new(*start, *end)
                .with_context(|| format!("Start date {} is after end date {}", start, end)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CollectRequest {
    pub window: Window,
    /// 1-based slice of the universe, `BATCH_SIZE` symbols each.
    pub batch: Option<usize>,
    /// Replaces the configured universe when non-empty.
    pub symbols: Vec<String>,
}

pub fn select_symbols(
    universe: &[String],
    overrides: &[String],
    batch: Option<usize>,
) -> Result<Vec<String>> {
    let symbols: Vec<String> = if overrides.is_empty() {
        universe.to_vec()
    } else {
        overrides.iter().map(|s| s.trim().to_uppercase()).collect()
    };

    let Some(batch) = batch else {
        return Ok(symbols);
    };

    let batches = symbols.len().div_ceil(BATCH_SIZE);
    if batch == 0 || batch > batches {
        bail!("Batch {} out of range: {} batches of {}", batch, batches, BATCH_SIZE);
    }
    Ok(symbols
        .chunks(BATCH_SIZE)
        .nth(batch - 1)
        .map(|c| c.to_vec())
        .unwrap_or_default())
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

pub struct Pipeline {
    config: AppConfig,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// One collector run. Errors here are setup failures only; per-symbol
    /// problems are reported through the summary.
    pub async fn run(&self, kind: ProviderKind, request: &CollectRequest) -> Result<CollectionSummary> {
        let settings = self.config.collectors.settings(kind);
        let range = request
            .window
            .resolve(Utc::now().date_naive(), settings.default_days_back)?;
        let symbols = select_symbols(&settings.symbols, &request.symbols, request.batch)?;

        let repo = Repository::open(&self.config.storage.db_path)
            .context("Failed to open DuckDB")?;
        if self.config.storage.run_migrations {
            repo.run_migrations()?;
        }

        let source = build_source(kind, &self.config)
            .with_context(|| format!("Failed to build {} collector", kind.cli_name()))?;

        let mut collector = Collector::new(source.as_ref(), &repo, settings);
        if settings.use_cache {
            collector = collector.with_cache(DataCache::new(&self.config.cache));
        }

        Ok(collector.run(&symbols, range).await)
    }
}
