use crate::models::{daily_return, DailyBar, RawBar, Source};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use tracing::{debug, warn};

// ── Parsers ───────────────────────────────────────────────────────────────────

/// Parse a numeric field served as text.
/// "189.9800" → 189.98 | "None" → None | "1,234" → 1234.0
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || s == "None" || s == "N/A" || s == "-" {
        return None;
    }
    let cleaned: String = s.chars().filter(|c| *c != ',').collect();
    cleaned.parse().ok().filter(|v: &f64| v.is_finite())
}

pub fn normalise_symbol(s: &str) -> String {
    s.trim().to_uppercase()
}

/// Drop NaN/inf so they never reach the warehouse.
fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

// ── Metadata attached to every row of a fetch ─────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarMeta {
    pub sector: Option<String>,
    pub exchange: Option<String>,
    pub currency: Option<String>,
}

// ── RawBar → DailyBar ─────────────────────────────────────────────────────────

/// Validate one row. A missing date or unusable close drops the row only.
pub fn raw_to_bar(
    symbol: &str,
    raw: &RawBar,
    source: Source,
    meta: &BarMeta,
    now: NaiveDateTime,
) -> Option<DailyBar> {
    let date = raw.date?;
    let close = finite(raw.close)?;

    if close <= 0.0 {
        warn!("Invalid close {} for {} on {}", close, symbol, date);
        return None;
    }

    let open = finite(raw.open);

    Some(DailyBar {
        symbol: normalise_symbol(symbol),
        date,
        open,
        high: finite(raw.high),
        low: finite(raw.low),
        close,
        volume: finite(raw.volume).filter(|v| *v >= 0.0).map(|v| v.round() as i64),
        sector: meta.sector.clone(),
        exchange: meta.exchange.clone(),
        currency: meta.currency.clone(),
        daily_return: daily_return(open, close),
        source,
        collected_at: now,
    })
}

/// Canonicalize a whole response: valid rows only, one per date, ascending.
pub fn to_bars(
    symbol: &str,
    rows: &[RawBar],
    source: Source,
    meta: &BarMeta,
    now: NaiveDateTime,
) -> Vec<DailyBar> {
    let mut by_date = BTreeMap::new();
    for raw in rows {
        match raw_to_bar(symbol, raw, source, meta, now) {
            Some(bar) => {
                by_date.insert(bar.date, bar);
            }
            None => debug!("{}: dropped row {:?}", symbol, raw.date),
        }
    }
    by_date.into_values().collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 10)
            .unwrap()
            .and_hms_opt(22, 0, 0)
            .unwrap()
    }

    fn raw(day: u32, open: Option<f64>, close: Option<f64>) -> RawBar {
        RawBar {
            date: NaiveDate::from_ymd_opt(2025, 1, day),
            open,
            high: close,
            low: open,
            close,
            volume: Some(1_000.0),
        }
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("189.9800"), Some(189.98));
        assert_eq!(parse_number("1,234"), Some(1234.0));
        assert_eq!(parse_number("None"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_drops_bad_rows_keeps_others() {
        let rows = vec![
            raw(6, Some(100.0), Some(110.0)),
            raw(7, Some(100.0), None),
            raw(8, Some(100.0), Some(f64::NAN)),
            raw(9, Some(100.0), Some(-1.0)),
            RawBar { date: None, ..raw(10, Some(1.0), Some(1.0)) },
        ];
        let bars = to_bars("aapl", &rows, Source::Polygon, &BarMeta::default(), now());
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].symbol, "AAPL");
        assert_eq!(bars[0].daily_return, 10.0);
        assert_eq!(bars[0].volume, Some(1_000));
    }

    #[test]
    fn test_missing_open_kept_with_zero_return() {
        let bars = to_bars(
            "MSFT",
            &[raw(6, None, Some(50.0))],
            Source::Finnhub,
            &BarMeta::default(),
            now(),
        );
        assert_eq!(bars[0].open, None);
        assert_eq!(bars[0].daily_return, 0.0);
    }

    #[test]
    fn test_sorted_and_deduplicated() {
        let rows = vec![
            raw(8, Some(1.0), Some(2.0)),
            raw(6, Some(1.0), Some(2.0)),
            raw(8, Some(1.0), Some(3.0)),
        ];
        let meta = BarMeta {
            sector: Some("Technology".into()),
            ..Default::default()
        };
        let bars = to_bars("X", &rows, Source::AlphaVantage, &meta, now());
        let dates: Vec<u32> = bars.iter().map(|b| chrono::Datelike::day(&b.date)).collect();
        assert_eq!(dates, vec![6, 8]);
        assert_eq!(bars[1].close, 3.0);
        assert_eq!(bars[0].sector.as_deref(), Some("Technology"));
    }
}
