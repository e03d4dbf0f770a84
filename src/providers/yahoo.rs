//! Yahoo Finance v8 chart client.
//!
//! Serves full daily history natively. Timestamps are session opens in UTC;
//! they are shifted by the exchange's `gmtoffset` before taking the date so
//! stored dates are the exchange's own calendar days.

use crate::config::HttpConfig;
use crate::models::{DailyBar, DateRange, RawBar, Source};
use crate::providers::cleaner::{normalise_symbol, to_bars, BarMeta};
use crate::providers::error::ProviderError;
use crate::providers::http_client::HttpClient;
use crate::providers::BarSource;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::debug;
use url::Url;

const BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const SOURCE: Source = Source::Yahoo;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

/// Market flavour of the Yahoo collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Market {
    Us,
    /// Ho Chi Minh exchange; tickers carry a `.VN` suffix on Yahoo.
    Vn,
}

impl Market {
    fn meta(&self) -> BarMeta {
        let (exchange, currency) = match self {
            Market::Us => ("NYSE", "USD"),
            Market::Vn => ("HOSE", "VND"),
        };
        BarMeta {
            sector: None,
            exchange: Some(exchange.to_string()),
            currency: Some(currency.to_string()),
        }
    }

    /// Ticker as Yahoo knows it.
    pub fn request_symbol(&self, symbol: &str) -> String {
        let symbol = normalise_symbol(symbol);
        match self {
            Market::Vn if !symbol.ends_with(".VN") => format!("{}.VN", symbol),
            _ => symbol,
        }
    }

    /// Ticker as stored in the warehouse.
    pub fn stored_symbol(&self, symbol: &str) -> String {
        let symbol = normalise_symbol(symbol);
        match self {
            Market::Vn => symbol.trim_end_matches(".VN").to_string(),
            Market::Us => symbol,
        }
    }
}

pub struct YahooClient {
    client: HttpClient,
    market: Market,
    base_url: String,
}

impl YahooClient {
    pub fn new(config: &HttpConfig, market: Market) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config, SOURCE)?.with_browser_agents(),
            market,
            base_url: BASE_URL.to_string(),
        })
    }

    /// `period2` is exclusive, so the end date is pushed one day forward.
    fn chart_url(&self, symbol: &str, range: DateRange) -> Result<Url, ProviderError> {
        let period1 = range.start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let period2 = (range.end + chrono::Duration::days(1))
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp();
        let (p1, p2) = (period1.to_string(), period2.to_string());

        Url::parse_with_params(
            &format!("{}/{}", self.base_url, symbol),
            &[
                ("period1", p1.as_str()),
                ("period2", p2.as_str()),
                ("interval", "1d"),
            ],
        )
        .map_err(|e| ProviderError::malformed(SOURCE, e))
    }
}

/// Exchange-local calendar date of a UTC timestamp.
fn local_date(ts: i64, gmtoffset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts + gmtoffset, 0).map(|dt| dt.date_naive())
}

/// Parse a chart body into rows with naive exchange-local dates.
pub fn parse_chart(body: &str, symbol: &str) -> Result<Vec<RawBar>, ProviderError> {
    let resp: ChartResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::malformed(SOURCE, e))?;

    if let Some(err) = resp.chart.error {
        if err.code == "Not Found" {
            return Err(ProviderError::no_data(SOURCE, symbol));
        }
        return Err(ProviderError::Api {
            provider: SOURCE,
            message: format!("{}: {}", err.code, err.description),
        });
    }

    let Some(data) = resp.chart.result.and_then(|r| r.into_iter().next()) else {
        return Err(ProviderError::no_data(SOURCE, symbol));
    };

    let gmtoffset = data.meta.map(|m| m.gmtoffset).unwrap_or_default();
    let timestamps = data.timestamp.unwrap_or_default();
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

    let at = |col: &Vec<Option<f64>>, i: usize| col.get(i).copied().flatten();

    Ok(timestamps
        .iter()
        .enumerate()
        .map(|(i, &ts)| RawBar {
            date: local_date(ts, gmtoffset),
            open: at(&quote.open, i),
            high: at(&quote.high, i),
            low: at(&quote.low, i),
            close: at(&quote.close, i),
            volume: at(&quote.volume, i),
        })
        .collect())
}

#[async_trait]
impl BarSource for YahooClient {
    fn id(&self) -> Source {
        SOURCE
    }

    async fn fetch(&self, symbol: &str, range: DateRange) -> Result<Vec<DailyBar>, ProviderError> {
        let ticker = self.market.request_symbol(symbol);
        let url = self.chart_url(&ticker, range)?;
        let body = self.client.get_text(url).await?;

        let rows: Vec<RawBar> = parse_chart(&body, &ticker)?
            .into_iter()
            .filter(|r| r.date.is_some_and(|d| range.contains(d)))
            .collect();

        let stored = self.market.stored_symbol(symbol);
        let bars = to_bars(&stored, &rows, SOURCE, &self.market.meta(), Utc::now().naive_utc());
        debug!("{}: {} bars in {}", ticker, bars.len(), range);

        if bars.is_empty() {
            return Err(ProviderError::no_data(SOURCE, &ticker));
        }
        Ok(bars)
    }
}
