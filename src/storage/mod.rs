use crate::models::{CollectionSummary, DailyBar, Source};
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use duckdb::{params, Connection};
use std::path::Path;
use tracing::info;

// ── Schema ────────────────────────────────────────────────────────────────────

const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS daily_bars (
    symbol        VARCHAR   NOT NULL,
    date          DATE      NOT NULL,
    source        VARCHAR   NOT NULL,
    open_price    DOUBLE,
    high_price    DOUBLE,
    low_price     DOUBLE,
    close_price   DOUBLE    NOT NULL,
    -- NULL for quote-only feeds
    volume        BIGINT,
    daily_return  DOUBLE    NOT NULL DEFAULT 0,
    sector        VARCHAR,
    exchange      VARCHAR,
    currency      VARCHAR,
    collected_at  TIMESTAMP NOT NULL,
    PRIMARY KEY (symbol, date, source)
);

CREATE TABLE IF NOT EXISTS source_priority (
    source    VARCHAR PRIMARY KEY,
    priority  INTEGER NOT NULL
);

CREATE SEQUENCE IF NOT EXISTS collection_runs_id_seq START 1;

CREATE TABLE IF NOT EXISTS collection_runs (
    id             BIGINT PRIMARY KEY DEFAULT nextval('collection_runs_id_seq'),
    source         VARCHAR   NOT NULL,
    started_at     TIMESTAMP NOT NULL,
    finished_at    TIMESTAMP,
    status         VARCHAR   NOT NULL DEFAULT 'running',
    symbols_total  INTEGER DEFAULT 0,
    symbols_ok     INTEGER DEFAULT 0,
    records        INTEGER DEFAULT 0,
    error_msg      VARCHAR
);

CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TIMESTAMP NOT NULL
);
"#;

const INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_bars_date   ON daily_bars (date);
CREATE INDEX IF NOT EXISTS idx_bars_symbol ON daily_bars (symbol);
"#;

/// One row per (symbol, date): the source with the lowest priority number wins.
const VIEW: &str = r#"
CREATE OR REPLACE VIEW daily_bars_all AS
SELECT b.*
FROM daily_bars b
JOIN source_priority p ON p.source = b.source
QUALIFY ROW_NUMBER() OVER (PARTITION BY b.symbol, b.date ORDER BY p.priority, b.collected_at DESC) = 1
"#;

/// One row of the `collection_runs` log.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub source: String,
    pub started_at: NaiveDateTime,
    pub status: String,
    pub records: i64,
    pub error_msg: Option<String>,
}

/// Row counts per source in the merged view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSummary {
    pub source: String,
    pub rows: i64,
    pub symbols: i64,
    pub latest: Option<NaiveDate>,
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open DuckDB at {:?}", path))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        Ok(self.conn.execute_batch(sql)?)
    }

    pub fn run_migrations(&self) -> Result<()> {
        info!("Running migrations…");
        self.conn.execute_batch(DDL).context("DDL failed")?;
        self.conn
            .execute_batch(INDEXES)
            .context("Index creation failed")?;

        for source in Source::all() {
            self.conn.execute(
                "INSERT OR REPLACE INTO source_priority (source, priority) VALUES (?, ?)",
                params![source.as_str(), i32::from(source.priority())],
            )?;
        }
        self.conn.execute_batch(VIEW).context("View creation failed")?;

        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, ?)",
            params![Utc::now().naive_utc()],
        )?;
        info!("Migrations done.");
        Ok(())
    }

    // ── Daily bars ────────────────────────────────────────────────────────────

    /// Upsert bars in one transaction. Re-collection overwrites prices; a
    /// missing sector, exchange or currency keeps what was stored.
    pub fn upsert_daily_bars(&self, bars: &[DailyBar]) -> Result<usize> {
        if bars.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        let sql = r#"
            INSERT INTO daily_bars
                (symbol, date, source, open_price, high_price, low_price, close_price,
                 volume, daily_return, sector, exchange, currency, collected_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (symbol, date, source) DO UPDATE SET
                open_price   = excluded.open_price,
                high_price   = excluded.high_price,
                low_price    = excluded.low_price,
                close_price  = excluded.close_price,
                volume       = excluded.volume,
                daily_return = excluded.daily_return,
                sector       = COALESCE(excluded.sector,   daily_bars.sector),
                exchange     = COALESCE(excluded.exchange, daily_bars.exchange),
                currency     = COALESCE(excluded.currency, daily_bars.currency),
                collected_at = excluded.collected_at
        "#;

        for bar in bars {
            tx.execute(
                sql,
                params![
                    bar.symbol,
                    bar.date,
                    bar.source.as_str(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume,
                    bar.daily_return,
                    bar.sector,
                    bar.exchange,
                    bar.currency,
                    bar.collected_at,
                ],
            )
            .with_context(|| format!("insert bar {} {} {}", bar.symbol, bar.date, bar.source))?;
        }

        tx.commit()?;
        Ok(bars.len())
    }

    pub fn list_symbols(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT symbol FROM daily_bars ORDER BY symbol")?;
        let syms: Vec<String> = stmt
            .query_map([], |r| r.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(syms)
    }

    pub fn latest_date_for_symbol(&self, symbol: &str) -> Result<Option<NaiveDate>> {
        let mut stmt = self
            .conn
            .prepare("SELECT MAX(date) FROM daily_bars WHERE symbol = ?")?;
        let date: Option<NaiveDate> = stmt
            .query_row(params![symbol], |r| r.get(0))
            .ok()
            .flatten();
        Ok(date)
    }

    pub fn bar_count(&self) -> Result<i64> {
        let mut s = self.conn.prepare("SELECT COUNT(*) FROM daily_bars")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    pub fn symbol_count(&self) -> Result<i64> {
        let mut s = self
            .conn
            .prepare("SELECT COUNT(DISTINCT symbol) FROM daily_bars")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    pub fn counts_by_source(&self) -> Result<Vec<(String, i64)>> {
        let mut s = self.conn.prepare(
            "SELECT source, COUNT(*) FROM daily_bars GROUP BY source ORDER BY source",
        )?;
        let rows = s
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn date_range(&self) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
        let mut s = self
            .conn
            .prepare("SELECT MIN(date), MAX(date) FROM daily_bars")?;
        Ok(s.query_row([], |r| Ok((r.get(0)?, r.get(1)?)))?)
    }

    // ── Maintenance ───────────────────────────────────────────────────────────

    /// Delete bars dated strictly before `cutoff`.
    pub fn delete_older_than(&self, cutoff: NaiveDate) -> Result<usize> {
        let n = self
            .conn
            .execute("DELETE FROM daily_bars WHERE date < ?", params![cutoff])
            .context("retention delete failed")?;
        Ok(n)
    }

    /// Refresh planner statistics and fold the WAL into the database file.
    pub fn checkpoint(&self) -> Result<()> {
        self.conn
            .execute_batch("ANALYZE; CHECKPOINT;")
            .context("checkpoint failed")?;
        Ok(())
    }

    pub fn view_summary(&self) -> Result<Vec<ViewSummary>> {
        let mut s = self.conn.prepare(
            r#"SELECT source, COUNT(*), COUNT(DISTINCT symbol), MAX(date)
               FROM daily_bars_all
               GROUP BY source
               ORDER BY source"#,
        )?;
        let rows = s
            .query_map([], |r| {
                Ok(ViewSummary {
                    source: r.get(0)?,
                    rows: r.get(1)?,
                    symbols: r.get(2)?,
                    latest: r.get(3)?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ── Collection run log ────────────────────────────────────────────────────

    pub fn begin_run(&self, source: Source) -> Result<i64> {
        let id: i64 = self.conn.query_row(
            "INSERT INTO collection_runs (source, started_at, status) VALUES (?, ?, 'running') RETURNING id",
            params![source.as_str(), Utc::now().naive_utc()],
            |r| r.get(0),
        )?;
        Ok(id)
    }

    pub fn finish_run(
        &self,
        run_id: i64,
        summary: &CollectionSummary,
        error: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            r#"UPDATE collection_runs SET
               finished_at = ?, status = ?,
               symbols_total = ?, symbols_ok = ?, records = ?, error_msg = ?
               WHERE id = ?"#,
            params![
                Utc::now().naive_utc(),
                if error.is_none() { "success" } else { "error" },
                summary.symbols_total as i64,
                summary.symbols_ok as i64,
                summary.records as i64,
                error,
                run_id,
            ],
        )?;
        Ok(())
    }

    /// Most recent collection runs, newest first.
    pub fn recent_runs(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let mut s = self.conn.prepare(&format!(
            r#"SELECT id, source, started_at, status, records, error_msg
               FROM collection_runs
               ORDER BY id DESC
               LIMIT {}"#,
            limit
        ))?;
        let rows = s
            .query_map([], |r| {
                Ok(RunRecord {
                    id: r.get(0)?,
                    source: r.get(1)?,
                    started_at: r.get(2)?,
                    status: r.get(3)?,
                    records: r.get(4)?,
                    error_msg: r.get(5)?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::daily_return;

    fn repo() -> Repository {
        let repo = Repository::open_in_memory().unwrap();
        repo.run_migrations().unwrap();
        repo
    }

    fn bar(symbol: &str, day: u32, source: Source, close: f64) -> DailyBar {
        let open = Some(100.0);
        DailyBar {
            symbol: symbol.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            open,
            high: Some(close.max(100.0)),
            low: Some(close.min(100.0)),
            close,
            volume: Some(1_000),
            sector: None,
            exchange: None,
            currency: None,
            daily_return: daily_return(open, close),
            source,
            collected_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let repo = repo();
        tokio_test::assert_ok!(repo.run_migrations());
        assert_eq!(repo.bar_count().unwrap(), 0);
    }

    #[test]
    fn test_upsert_overwrites_same_key() {
        let repo = repo();
        repo.upsert_daily_bars(&[bar("AAPL", 6, Source::Polygon, 110.0)])
            .unwrap();
        repo.upsert_daily_bars(&[bar("AAPL", 6, Source::Polygon, 120.0)])
            .unwrap();
        assert_eq!(repo.bar_count().unwrap(), 1);

        let close: f64 = repo
            .conn
            .query_row("SELECT close_price FROM daily_bars", [], |r| r.get(0))
            .unwrap();
        assert_eq!(close, 120.0);
    }

    #[test]
    fn test_sector_survives_null_update() {
        let repo = repo();
        let mut first = bar("MSFT", 6, Source::Finnhub, 101.0);
        first.sector = Some("Technology".into());
        repo.upsert_daily_bars(&[first]).unwrap();
        repo.upsert_daily_bars(&[bar("MSFT", 6, Source::Finnhub, 102.0)])
            .unwrap();

        let sector: Option<String> = repo
            .conn
            .query_row("SELECT sector FROM daily_bars", [], |r| r.get(0))
            .unwrap();
        assert_eq!(sector.as_deref(), Some("Technology"));
    }

    #[test]
    fn test_view_prefers_lower_priority_number() {
        let repo = repo();
        repo.upsert_daily_bars(&[
            bar("AAPL", 6, Source::Yahoo, 105.0),
            bar("AAPL", 6, Source::AlphaVantage, 104.0),
            bar("AAPL", 7, Source::Polygon, 106.0),
        ])
        .unwrap();
        assert_eq!(repo.bar_count().unwrap(), 3);

        let winners: Vec<(String, String)> = {
            let mut s = repo
                .conn
                .prepare("SELECT CAST(date AS VARCHAR), source FROM daily_bars_all ORDER BY date")
                .unwrap();
            s.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
                .unwrap()
                .map(|r| r.unwrap())
                .collect()
        };
        assert_eq!(
            winners,
            vec![
                ("2025-01-06".to_string(), "alpha_vantage".to_string()),
                ("2025-01-07".to_string(), "polygon".to_string()),
            ]
        );

        let summary = repo.view_summary().unwrap();
        assert_eq!(summary.len(), 2);
        assert!(summary.iter().all(|s| s.rows == 1 && s.symbols == 1));
    }

    #[test]
    fn test_retention_delete() {
        let repo = repo();
        repo.upsert_daily_bars(&[
            bar("IBM", 2, Source::AlphaVantage, 101.0),
            bar("IBM", 9, Source::AlphaVantage, 102.0),
        ])
        .unwrap();
        let cutoff = NaiveDate::from_ymd_opt(2025, 1, 9).unwrap();
        assert_eq!(repo.delete_older_than(cutoff).unwrap(), 1);
        assert_eq!(repo.date_range().unwrap(), (Some(cutoff), Some(cutoff)));
        repo.checkpoint().unwrap();
    }

    #[test]
    fn test_run_log() {
        let repo = repo();
        let first = repo.begin_run(Source::Polygon).unwrap();
        let second = repo.begin_run(Source::Polygon).unwrap();
        assert_ne!(first, second);
        assert_eq!(repo.recent_runs(5).unwrap()[1].status, "running");

        let summary = CollectionSummary {
            source: Source::Polygon,
            symbols_total: 3,
            symbols_ok: 2,
            records: 40,
            aborted: false,
        };
        repo.finish_run(first, &summary, None).unwrap();
        repo.finish_run(second, &summary, Some("aborted")).unwrap();
        let runs = repo.recent_runs(1).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, second);
        assert_eq!(runs[0].status, "error");
        assert_eq!(runs[0].error_msg.as_deref(), Some("aborted"));
        assert_eq!(repo.recent_runs(5).unwrap()[1].status, "success");
        assert_eq!(runs[0].records, 40);
    }

    #[test]
    fn test_symbol_queries() {
        let repo = repo();
        repo.upsert_daily_bars(&[
            bar("MSFT", 6, Source::Polygon, 101.0),
            bar("AAPL", 6, Source::Polygon, 101.0),
            bar("AAPL", 7, Source::Finnhub, 101.0),
        ])
        .unwrap();
        assert_eq!(repo.list_symbols().unwrap(), vec!["AAPL", "MSFT"]);
        assert_eq!(repo.symbol_count().unwrap(), 2);
        assert_eq!(
            repo.latest_date_for_symbol("AAPL").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 7)
        );
        assert_eq!(
            repo.counts_by_source().unwrap(),
            vec![("finnhub".to_string(), 1), ("polygon".to_string(), 2)]
        );
    }
}
