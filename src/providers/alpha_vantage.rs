//! Alpha Vantage `TIME_SERIES_DAILY` client.
//!
//! A compact call returns up to 100 trading days. The free tier allows 25
//! calls a day, which the symbol universe is sized to respect.

use crate::config::HttpConfig;
use crate::models::{DailyBar, DateRange, RawBar, Source};
use crate::providers::cleaner::{parse_number, to_bars, BarMeta};
use crate::providers::error::ProviderError;
use crate::providers::http_client::HttpClient;
use crate::providers::BarSource;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const SOURCE: Source = Source::AlphaVantage;

/// The three payload shapes are mutually exclusive.
#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyEntry>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

/// Fields are optional so one incomplete day only loses that row.
#[derive(Debug, Deserialize)]
struct DailyEntry {
    #[serde(rename = "1. open")]
    open: Option<String>,
    #[serde(rename = "2. high")]
    high: Option<String>,
    #[serde(rename = "3. low")]
    low: Option<String>,
    #[serde(rename = "4. close")]
    close: Option<String>,
    #[serde(rename = "5. volume")]
    volume: Option<String>,
}

fn field(value: Option<&str>) -> Option<f64> {
    value.and_then(parse_number)
}

pub struct AlphaVantageClient {
    client: HttpClient,
    api_key: String,
    base_url: String,
}

impl AlphaVantageClient {
    pub fn new(config: &HttpConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config, SOURCE)?,
            api_key,
            base_url: BASE_URL.to_string(),
        })
    }

    fn series_url(&self, symbol: &str) -> Result<Url, ProviderError> {
        Url::parse_with_params(
            &self.base_url,
            &[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("outputsize", "compact"),
                ("apikey", self.api_key.as_str()),
            ],
        )
        .map_err(|e| ProviderError::malformed(SOURCE, e))
    }
}

/// Parse a `TIME_SERIES_DAILY` body.
pub fn parse_time_series(body: &str) -> Result<Vec<RawBar>, ProviderError> {
    let resp: TimeSeriesResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::malformed(SOURCE, e))?;

    if let Some(msg) = resp.error_message {
        return Err(ProviderError::Api {
            provider: SOURCE,
            message: msg,
        });
    }

    if let Some(note) = resp.note {
        warn!("Alpha Vantage note: {}", note);
        return Err(ProviderError::RateLimited { provider: SOURCE });
    }

    let Some(series) = resp.time_series else {
        let message = resp
            .information
            .unwrap_or_else(|| "response has no 'Time Series (Daily)'".to_string());
        return Err(ProviderError::Notice {
            provider: SOURCE,
            message,
        });
    };

    Ok(series
        .into_iter()
        .map(|(date, entry)| RawBar {
            date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok(),
            open: field(entry.open.as_deref()),
            high: field(entry.high.as_deref()),
            low: field(entry.low.as_deref()),
            close: field(entry.close.as_deref()),
            volume: field(entry.volume.as_deref()),
        })
        .collect())
}

#[async_trait]
impl BarSource for AlphaVantageClient {
    fn id(&self) -> Source {
        SOURCE
    }

    async fn fetch(&self, symbol: &str, range: DateRange) -> Result<Vec<DailyBar>, ProviderError> {
        let url = self.series_url(symbol)?;
        let body = self.client.get_text(url).await?;

        let rows: Vec<RawBar> = parse_time_series(&body)?
            .into_iter()
            .filter(|r| r.date.is_some_and(|d| range.contains(d)))
            .collect();

        let now = Utc::now().naive_utc();
        let bars = to_bars(symbol, &rows, SOURCE, &BarMeta::default(), now);
        debug!("{}: {} bars in {}", symbol, bars.len(), range);

        if bars.is_empty() {
            return Err(ProviderError::no_data(SOURCE, symbol));
        }
        Ok(bars)
    }
}
