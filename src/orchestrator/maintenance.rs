use crate::storage::{Repository, ViewSummary};
use anyhow::Result;
use chrono::{Duration, NaiveDate};
use tracing::info;

#[derive(Debug)]
pub struct MaintenanceReport {
    pub cutoff: NaiveDate,
    pub deleted: usize,
    pub by_source: Vec<ViewSummary>,
}

/// Drop bars outside the retention window, refresh statistics and log what
/// the merged view now holds.
pub fn run_maintenance(repo: &Repository, today: NaiveDate, retention_days: u32) -> Result<MaintenanceReport> {
    let cutoff = today - Duration::days(i64::from(retention_days));
    let deleted = repo.delete_older_than(cutoff)?;
    info!("Retention: deleted {} bars dated before {}", deleted, cutoff);

    repo.checkpoint()?;

    let by_source = repo.view_summary()?;
    let total: i64 = by_source.iter().map(|s| s.rows).sum();
    let (earliest, latest) = repo.date_range()?;
    info!(
        "Maintenance completed: {} records | {} symbols | {} sources | {:?} → {:?}",
        total,
        repo.symbol_count()?,
        by_source.len(),
        earliest,
        latest,
    );
    for s in &by_source {
        info!("  {:<14} {:>8} rows  {:>5} symbols  latest {:?}", s.source, s.rows, s.symbols, s.latest);
    }

    Ok(MaintenanceReport {
        cutoff,
        deleted,
        by_source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyBar, Source};
    use chrono::Utc;

    fn bar(date: NaiveDate, source: Source) -> DailyBar {
        DailyBar {
            symbol: "AAPL".into(),
            date,
            open: None,
            high: None,
            low: None,
            close: 200.0,
            volume: None,
            sector: None,
            exchange: None,
            currency: None,
            daily_return: 0.0,
            source,
            collected_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_retention_window() {
        let repo = Repository::open_in_memory().unwrap();
        repo.run_migrations().unwrap();

        let today = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        repo.upsert_daily_bars(&[
            bar(today - Duration::days(91), Source::Polygon),
            bar(today - Duration::days(90), Source::Polygon),
            bar(today, Source::AlphaVantage),
        ])
        .unwrap();

        let report = run_maintenance(&repo, today, 90).unwrap();
        assert_eq!(report.cutoff, today - Duration::days(90));
        assert_eq!(report.deleted, 1);
        assert_eq!(repo.bar_count().unwrap(), 2);
        assert_eq!(report.by_source.len(), 2);
    }
}
