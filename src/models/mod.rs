use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Source ────────────────────────────────────────────────────────────────────

/// Provider a bar was collected from. Stored as part of the row key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Finnhub,
    AlphaVantage,
    Polygon,
    Yahoo,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Finnhub => "finnhub",
            Source::AlphaVantage => "alpha_vantage",
            Source::Polygon => "polygon",
            Source::Yahoo => "yahoo",
        }
    }

    /// Lower wins when several sources carry the same (symbol, date).
    pub fn priority(&self) -> u8 {
        match self {
            Source::Finnhub => 0,
            Source::AlphaVantage => 1,
            Source::Polygon => 2,
            Source::Yahoo => 3,
        }
    }

    pub fn all() -> [Source; 4] {
        [Source::Finnhub, Source::AlphaVantage, Source::Polygon, Source::Yahoo]
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Canonical daily bar ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<i64>,
    pub sector: Option<String>,
    pub exchange: Option<String>,
    pub currency: Option<String>,
    pub daily_return: f64,
    pub source: Source,
    pub collected_at: NaiveDateTime,
}

/// Intraday return in percent. Zero when there is no usable open.
pub fn daily_return(open: Option<f64>, close: f64) -> f64 {
    match open {
        Some(o) if o > 0.0 => (close - o) * 100.0 / o,
        _ => 0.0,
    }
}

// ── Raw provider row ──────────────────────────────────────────────────────────

/// Provider-neutral row as parsed from a response, before validation.
#[derive(Debug, Clone, Default)]
pub struct RawBar {
    pub date: Option<NaiveDate>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

// ── Date range ────────────────────────────────────────────────────────────────

/// Inclusive calendar range requested from a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// `days_back` days before `today`, through `today`. `None` when the
    /// start falls outside the representable calendar.
    pub fn days_back(today: NaiveDate, days: u32) -> Option<Self> {
        let start = today.checked_sub_days(chrono::Days::new(u64::from(days)))?;
        Some(Self { start, end: today })
    }

    /// Whole calendar month `YYYY-MM`, clipped at `today`.
    pub fn month(label: &str, today: NaiveDate) -> Option<Self> {
        let (y, m) = label.trim().split_once('-')?;
        let (year, month): (i32, u32) = (y.parse().ok()?, m.parse().ok()?);
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        let last = next.pred_opt()?;
        let end = if last > today && start <= today { today } else { last };
        Some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.start, self.end)
    }
}

// ── Run summary ───────────────────────────────────────────────────────────────

/// Outcome of one collector run; also the machine-readable stdout line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionSummary {
    pub source: Source,
    pub symbols_total: usize,
    pub symbols_ok: usize,
    pub records: usize,
    pub aborted: bool,
}
