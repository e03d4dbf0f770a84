//! Daily run: trading-day check, primary collector, fallback collector,
//! maintenance.
//!
//! Collectors run as child processes of this same binary (`collect
//! --provider ...`) so a hung provider can be killed on timeout. A child
//! counts as successful only when it exits 0 and its summary line reports
//! at least one record.

pub mod calendar;
pub mod maintenance;

use crate::config::{AppConfig, ProviderKind};
use crate::models::CollectionSummary;
use crate::pipeline::SUMMARY_MARKER;
use crate::storage::Repository;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{error, info, warn};

/// Outcome of one collector child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunVerdict {
    Succeeded { records: usize },
    /// Clean exit, but nothing collected.
    Empty,
    Failed { code: Option<i32> },
    TimedOut,
}

/// Last summary line in a child's stdout.
pub fn parse_summary(stdout: &str) -> Option<CollectionSummary> {
    stdout
        .lines()
        .rev()
        .filter_map(|line| line.trim().strip_prefix(SUMMARY_MARKER))
        .find_map(|json| serde_json::from_str(json.trim()).ok())
}

pub fn classify(exit_code: Option<i32>, stdout: &str) -> RunVerdict {
    if exit_code != Some(0) {
        return RunVerdict::Failed { code: exit_code };
    }
    match parse_summary(stdout) {
        Some(summary) if summary.records > 0 => RunVerdict::Succeeded {
            records: summary.records,
        },
        _ => RunVerdict::Empty,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DailyOutcome {
    /// Not a trading day; nothing collected.
    Skipped { reason: String },
    Collected { provider: ProviderKind, records: usize },
    /// Both collectors failed.
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct DailyOptions {
    pub primary: Option<ProviderKind>,
    pub secondary: Option<ProviderKind>,
    pub force: bool,
}

pub struct Orchestrator {
    config: AppConfig,
    program: PathBuf,
    /// Arguments placed before `collect ...`.
    leading_args: Vec<String>,
}

impl Orchestrator {
    pub fn new(config: AppConfig) -> Result<Self> {
        let program = std::env::current_exe().context("Cannot locate own executable")?;
        Ok(Self {
            config,
            program,
            leading_args: Vec::new(),
        })
    }

    #[cfg(test)]
    fn with_program(mut self, program: impl Into<PathBuf>, leading_args: Vec<String>) -> Self {
        self.program = program.into();
        self.leading_args = leading_args;
        self
    }

    async fn run_collector(&self, kind: ProviderKind, timeout: Duration) -> RunVerdict {
        info!("Starting {} collector (timeout {:?})", kind.cli_name(), timeout);

        let child = Command::new(&self.program)
            .args(&self.leading_args)
            .arg("collect")
            .arg("--provider")
            .arg(kind.cli_name())
            .arg("--days_back")
            .arg(self.config.orchestrator.days_back.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                error!("{}: could not start collector: {}", kind.cli_name(), e);
                return RunVerdict::Failed { code: None };
            }
        };

        // Dropping the timed-out future drops the child, which kills it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                error!("{}: collector I/O error: {}", kind.cli_name(), e);
                return RunVerdict::Failed { code: None };
            }
            Err(_) => {
                error!("{}: timed out after {:?}", kind.cli_name(), timeout);
                return RunVerdict::TimedOut;
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let verdict = classify(output.status.code(), &stdout);
        match &verdict {
            RunVerdict::Succeeded { records } => {
                info!("{}: collected {} records", kind.cli_name(), records)
            }
            RunVerdict::Empty => warn!("{}: finished without records", kind.cli_name()),
            RunVerdict::Failed { code } => {
                warn!("{}: exited with {:?}", kind.cli_name(), code)
            }
            RunVerdict::TimedOut => {}
        }
        verdict
    }

    /// Collect with fallback. Both collectors failing is reported, not raised.
    pub async fn collect_with_fallback(&self, options: &DailyOptions) -> DailyOutcome {
        let cfg = &self.config.orchestrator;
        let chain = [
            (
                options.primary.unwrap_or(cfg.primary),
                Duration::from_secs(cfg.primary_timeout_secs),
            ),
            (
                options.secondary.unwrap_or(cfg.secondary),
                Duration::from_secs(cfg.secondary_timeout_secs),
            ),
        ];

        for (i, (kind, timeout)) in chain.into_iter().enumerate() {
            if let RunVerdict::Succeeded { records } = self.run_collector(kind, timeout).await {
                return DailyOutcome::Collected {
                    provider: kind,
                    records,
                };
            }
            if i == 0 {
                warn!("{} failed, falling back", kind.cli_name());
            }
        }

        error!("Both collectors failed");
        DailyOutcome::Failed
    }

    /// The fallback chain, repeated up to `task_retries` more times.
    async fn collect_with_rounds(&self, options: &DailyOptions) -> DailyOutcome {
        let cfg = &self.config.orchestrator;
        let rounds = cfg.task_retries + 1;
        let mut round = 1;
        loop {
            let outcome = self.collect_with_fallback(options).await;
            if outcome != DailyOutcome::Failed || round >= rounds {
                return outcome;
            }
            let delay = Duration::from_secs(cfg.task_retry_delay_secs);
            warn!("Round {}/{} failed, retrying in {:?}", round, rounds, delay);
            tokio::time::sleep(delay).await;
            round += 1;
        }
    }

    pub async fn run_daily(&self, today: NaiveDate, options: &DailyOptions) -> Result<DailyOutcome> {
        let outcome = match closed_reason(today) {
            Some(reason) if !options.force => {
                info!("US market closed on {} ({}), skipping collection", today, reason);
                DailyOutcome::Skipped { reason }
            }
            _ => self.collect_with_rounds(options).await,
        };

        if outcome == DailyOutcome::Failed {
            return Ok(outcome);
        }

        // Opened only now: children hold the database while they run.
        let repo = Repository::open(&self.config.storage.db_path)
            .context("Failed to open DuckDB for maintenance")?;
        repo.run_migrations()?;
        maintenance::run_maintenance(&repo, today, self.config.storage.retention_days)?;

        Ok(outcome)
    }
}

fn closed_reason(date: NaiveDate) -> Option<String> {
    if calendar::is_trading_day(date) {
        return None;
    }
    if calendar::is_weekend(date) {
        return Some("weekend".to_string());
    }
    calendar::holiday_name(date).map(|name| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"COLLECT_SUMMARY {"source":"alpha_vantage","symbols_total":15,"symbols_ok":15,"records":15,"aborted":false}"#;
    const EMPTY: &str = r#"COLLECT_SUMMARY {"source":"alpha_vantage","symbols_total":15,"symbols_ok":0,"records":0,"aborted":false}"#;

    #[test]
    fn test_parse_summary_takes_last_line() {
        let stdout = format!("noise\n{}\n{}\n", EMPTY, GOOD);
        assert_eq!(parse_summary(&stdout).unwrap().records, 15);
        assert!(parse_summary("Collected 0 records").is_none());
        assert!(parse_summary("COLLECT_SUMMARY {broken").is_none());
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(Some(0), GOOD), RunVerdict::Succeeded { records: 15 });
        assert_eq!(classify(Some(0), EMPTY), RunVerdict::Empty);
        assert_eq!(classify(Some(0), ""), RunVerdict::Empty);
        assert_eq!(classify(Some(1), GOOD), RunVerdict::Failed { code: Some(1) });
        assert_eq!(classify(None, GOOD), RunVerdict::Failed { code: None });
    }

    #[test]
    fn test_closed_reason() {
        let d = |m, day| NaiveDate::from_ymd_opt(2025, m, day).unwrap();
        assert_eq!(closed_reason(d(1, 11)).as_deref(), Some("weekend"));
        assert_eq!(closed_reason(d(7, 4)).as_deref(), Some("Independence Day"));
        assert_eq!(closed_reason(d(7, 7)), None);
    }

    #[cfg(unix)]
    mod process {
        use super::*;

        /// `sh -c <script> sh collect --provider ...`: the collector flags land
        /// in the script's positional parameters and are ignored.
        fn orchestrator(script: &str, db: &std::path::Path) -> Orchestrator {
            let mut config = AppConfig::default();
            config.storage.db_path = db.to_path_buf();
            config.orchestrator.primary_timeout_secs = 1;
            config.orchestrator.secondary_timeout_secs = 1;
            config.orchestrator.task_retries = 0;
            Orchestrator {
                config,
                program: PathBuf::new(),
                leading_args: Vec::new(),
            }
            .with_program("sh", vec!["-c".into(), script.into(), "sh".into()])
        }

        fn summary_script(records: usize) -> String {
            format!(
                r#"echo 'COLLECT_SUMMARY {{"source":"polygon","symbols_total":1,"symbols_ok":1,"records":{},"aborted":false}}'"#,
                records
            )
        }

        #[tokio::test]
        async fn test_successful_primary() {
            let tmp = tempfile::tempdir().unwrap();
            let orch = orchestrator(&summary_script(4), &tmp.path().join("w.duckdb"));
            let verdict = orch
                .run_collector(ProviderKind::AlphaVantage, Duration::from_secs(5))
                .await;
            assert_eq!(verdict, RunVerdict::Succeeded { records: 4 });
        }

        #[tokio::test]
        async fn test_timeout_kills_child() {
            let tmp = tempfile::tempdir().unwrap();
            let orch = orchestrator("sleep 30", &tmp.path().join("w.duckdb"));
            let verdict = orch
                .run_collector(ProviderKind::Polygon, Duration::from_millis(200))
                .await;
            assert_eq!(verdict, RunVerdict::TimedOut);
        }

        #[tokio::test]
        async fn test_both_failing_is_reported() {
            let tmp = tempfile::tempdir().unwrap();
            let orch = orchestrator(&format!("{}; exit 3", summary_script(4)), &tmp.path().join("w.duckdb"));
            let outcome = orch.collect_with_fallback(&DailyOptions::default()).await;
            assert_eq!(outcome, DailyOutcome::Failed);
        }

        #[tokio::test]
        async fn test_zero_records_is_not_success() {
            let tmp = tempfile::tempdir().unwrap();
            let orch = orchestrator(&summary_script(0), &tmp.path().join("w.duckdb"));
            let outcome = orch.collect_with_fallback(&DailyOptions::default()).await;
            assert_eq!(outcome, DailyOutcome::Failed);
        }

        #[tokio::test]
        async fn test_weekend_skips_collection_but_runs_maintenance() {
            let tmp = tempfile::tempdir().unwrap();
            let db = tmp.path().join("w.duckdb");
            // would fail if it ran
            let orch = orchestrator("exit 1", &db);
            let saturday = NaiveDate::from_ymd_opt(2025, 1, 11).unwrap();
            let outcome = orch.run_daily(saturday, &DailyOptions::default()).await.unwrap();
            assert!(matches!(outcome, DailyOutcome::Skipped { .. }));
            assert!(db.exists());
        }

        #[tokio::test]
        async fn test_failed_round_is_retried() {
            let tmp = tempfile::tempdir().unwrap();
            let calls = tmp.path().join("calls");
            // first two invocations (one full round) report nothing
            let script = format!(
                r#"echo x >> '{}'; if [ $(wc -l < '{}') -ge 3 ]; then {}; fi"#,
                calls.display(),
                calls.display(),
                summary_script(2)
            );
            let mut orch = orchestrator(&script, &tmp.path().join("w.duckdb"));
            orch.config.orchestrator.task_retries = 1;
            orch.config.orchestrator.task_retry_delay_secs = 0;

            let outcome = orch.collect_with_rounds(&DailyOptions::default()).await;
            assert_eq!(
                outcome,
                DailyOutcome::Collected {
                    provider: ProviderKind::AlphaVantage,
                    records: 2
                }
            );
            let lines = std::fs::read_to_string(&calls).unwrap().lines().count();
            assert_eq!(lines, 3);
        }

        #[tokio::test]
        async fn test_forced_run_uses_fallback() {
            let tmp = tempfile::tempdir().unwrap();
            // primary gets "alpha-vantage" as $3, only polygon reports records
            let script = r#"if [ "$3" = "polygon" ]; then echo 'COLLECT_SUMMARY {"source":"polygon","symbols_total":1,"symbols_ok":1,"records":7,"aborted":false}'; fi"#;
            let orch = orchestrator(script, &tmp.path().join("w.duckdb"));
            let saturday = NaiveDate::from_ymd_opt(2025, 1, 11).unwrap();
            let options = DailyOptions {
                force: true,
                ..Default::default()
            };
            let outcome = orch.run_daily(saturday, &options).await.unwrap();
            assert_eq!(
                outcome,
                DailyOutcome::Collected {
                    provider: ProviderKind::Polygon,
                    records: 7
                }
            );
        }
    }
}
