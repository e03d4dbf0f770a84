//! Finnhub free-tier client.
//!
//! Only the `/quote` snapshot is available: one row for the latest trading
//! session, no volume. The row date comes from the quote timestamp, which
//! on weekends still points at Friday's close.

use crate::config::HttpConfig;
use crate::models::{DailyBar, DateRange, RawBar, Source};
use crate::providers::cleaner::{to_bars, BarMeta};
use crate::providers::error::ProviderError;
use crate::providers::http_client::HttpClient;
use crate::providers::BarSource;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

const BASE_URL: &str = "https://finnhub.io/api/v1";
const SOURCE: Source = Source::Finnhub;

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    c: Option<f64>,
    h: Option<f64>,
    l: Option<f64>,
    o: Option<f64>,
    pc: Option<f64>,
    t: Option<i64>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    finnhub_industry: Option<String>,
}

pub struct FinnhubClient {
    client: HttpClient,
    api_key: String,
    base_url: String,
    /// Sector per symbol; profiles rarely change so one lookup per process.
    sectors: Mutex<HashMap<String, Option<String>>>,
}

impl FinnhubClient {
    pub fn new(config: &HttpConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config, SOURCE)?,
            api_key,
            base_url: BASE_URL.to_string(),
            sectors: Mutex::new(HashMap::new()),
        })
    }

    fn url(&self, endpoint: &str, symbol: &str) -> Result<Url, ProviderError> {
        Url::parse_with_params(
            &format!("{}/{}", self.base_url, endpoint),
            &[("symbol", symbol), ("token", self.api_key.as_str())],
        )
        .map_err(|e| ProviderError::malformed(SOURCE, e))
    }

    fn cached_sector(&self, symbol: &str) -> Option<Option<String>> {
        self.sectors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(symbol)
            .cloned()
    }

    /// Sector lookup. Failures are not cached and never fail the quote.
    async fn sector(&self, symbol: &str) -> Option<String> {
        if let Some(hit) = self.cached_sector(symbol) {
            return hit;
        }

        let url = self.url("stock/profile2", symbol).ok()?;
        let sector = match self.client.get_text(url).await {
            Ok(body) => parse_profile(&body),
            Err(e) => {
                warn!("{}: sector lookup failed: {}", symbol, e);
                return None;
            }
        };

        self.sectors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(symbol.to_string(), sector.clone());
        sector
    }
}

fn parse_profile(body: &str) -> Option<String> {
    serde_json::from_str::<ProfileResponse>(body)
        .ok()?
        .finnhub_industry
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Finnhub reports missing fields as 0.
fn non_zero(v: Option<f64>) -> Option<f64> {
    v.filter(|x| *x != 0.0)
}

/// Parse a `/quote` body into a single row dated by the quote timestamp.
pub fn parse_quote(body: &str, symbol: &str, today: NaiveDate) -> Result<RawBar, ProviderError> {
    let q: QuoteResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::malformed(SOURCE, e))?;

    if let Some(message) = q.error {
        return Err(ProviderError::Api {
            provider: SOURCE,
            message,
        });
    }

    let Some(close) = non_zero(q.c) else {
        return Err(ProviderError::no_data(SOURCE, symbol));
    };

    let date = q
        .t
        .filter(|t| *t > 0)
        .and_then(|t| DateTime::from_timestamp(t, 0))
        .map(|dt| dt.date_naive())
        .unwrap_or(today);

    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        info!("{}: quote dated {} (weekend), last session carried over", symbol, date);
    }

    Ok(RawBar {
        date: Some(date),
        open: non_zero(q.o).or(non_zero(q.pc)).or(Some(close)),
        high: non_zero(q.h).or(Some(close)),
        low: non_zero(q.l).or(Some(close)),
        close: Some(close),
        volume: None,
    })
}

#[async_trait]
impl BarSource for FinnhubClient {
    fn id(&self) -> Source {
        SOURCE
    }

    /// The range is ignored: the free tier has no history.
    async fn fetch(&self, symbol: &str, _range: DateRange) -> Result<Vec<DailyBar>, ProviderError> {
        let sector = self.sector(symbol).await;

        let url = self.url("quote", symbol)?;
        let body = self.client.get_text(url).await?;
        let now = Utc::now();
        let row = parse_quote(&body, symbol, now.date_naive())?;

        let meta = BarMeta {
            sector,
            ..Default::default()
        };
        let bars = to_bars(symbol, &[row], SOURCE, &meta, now.naive_utc());
        debug!("{}: quote {:?}", symbol, bars.first().map(|b| (b.date, b.close)));

        if bars.is_empty() {
            return Err(ProviderError::no_data(SOURCE, symbol));
        }
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 13).unwrap()
    }

    #[test]
    fn test_date_comes_from_timestamp() {
        // 2025-01-10 21:00:00 UTC, a Friday close seen on Monday
        let body = r#"{"c": 236.85, "d": -3.2, "dp": -1.33, "h": 240.16, "l": 233.0, "o": 240.01, "pc": 240.05, "t": 1736542800}"#;
        let row = parse_quote(body, "AAPL", today()).unwrap();
        assert_eq!(row.date, NaiveDate::from_ymd_opt(2025, 1, 10));
        assert_eq!(row.close, Some(236.85));
        assert_eq!(row.open, Some(240.01));
        assert_eq!(row.volume, None);
    }

    #[test]
    fn test_missing_timestamp_falls_back_to_today() {
        let body = r#"{"c": 10.0, "h": 0, "l": 0, "o": 0, "pc": 9.5, "t": 0}"#;
        let row = parse_quote(body, "X", today()).unwrap();
        assert_eq!(row.date, Some(today()));
        assert_eq!(row.open, Some(9.5));
        assert_eq!(row.high, Some(10.0));
        assert_eq!(row.low, Some(10.0));
    }

    #[test]
    fn test_zero_price_is_no_data() {
        let body = r#"{"c": 0, "h": 0, "l": 0, "o": 0, "pc": 0, "t": 0}"#;
        let err = parse_quote(body, "ZZZZ", today()).unwrap_err();
        assert!(matches!(err, ProviderError::NoData { .. }));
    }

    #[test]
    fn test_error_payload() {
        let err = parse_quote(r#"{"error": "Invalid API key"}"#, "AAPL", today()).unwrap_err();
        assert!(matches!(err, ProviderError::Api { .. }));
    }

    #[test]
    fn test_parse_profile() {
        assert_eq!(
            parse_profile(r#"{"name": "Apple Inc", "finnhubIndustry": "Technology"}"#),
            Some("Technology".to_string())
        );
        assert_eq!(parse_profile(r#"{"finnhubIndustry": ""}"#), None);
        assert_eq!(parse_profile("{}"), None);
    }
}
