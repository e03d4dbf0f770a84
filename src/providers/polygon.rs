//! Polygon.io daily aggregates client.
//!
//! Free tier: 5 calls a minute, 15 minute delay. The collector pairs this
//! client with the sliding-window limiter and the disk cache.

use crate::config::HttpConfig;
use crate::models::{DailyBar, DateRange, RawBar, Source};
use crate::providers::cleaner::{to_bars, BarMeta};
use crate::providers::error::ProviderError;
use crate::providers::http_client::HttpClient;
use crate::providers::BarSource;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

const BASE_URL: &str = "https://api.polygon.io";
const SOURCE: Source = Source::Polygon;

#[derive(Debug, Deserialize)]
struct AggregatesResponse {
    status: Option<String>,
    results: Option<Vec<Aggregate>>,
}

#[derive(Debug, Deserialize)]
struct Aggregate {
    /// Bar start, Unix milliseconds.
    t: Option<i64>,
    o: Option<f64>,
    h: Option<f64>,
    l: Option<f64>,
    c: Option<f64>,
    v: Option<f64>,
}

pub struct PolygonClient {
    client: HttpClient,
    api_key: String,
    base_url: String,
}

impl PolygonClient {
    pub fn new(config: &HttpConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config, SOURCE)?,
            api_key,
            base_url: BASE_URL.to_string(),
        })
    }

    fn aggregates_url(&self, symbol: &str, range: DateRange) -> Result<Url, ProviderError> {
        let path = format!(
            "{}/v2/aggs/ticker/{}/range/1/day/{}/{}",
            self.base_url,
            symbol,
            range.start.format("%Y-%m-%d"),
            range.end.format("%Y-%m-%d"),
        );
        Url::parse_with_params(
            &path,
            &[
                ("adjusted", "true"),
                ("sort", "asc"),
                ("apiKey", self.api_key.as_str()),
            ],
        )
        .map_err(|e| ProviderError::malformed(SOURCE, e))
    }
}

/// Parse an aggregates body. No `results`, or a status other than `OK`,
/// means the provider has nothing for this symbol.
pub fn parse_aggregates(body: &str, symbol: &str) -> Result<Vec<RawBar>, ProviderError> {
    let resp: AggregatesResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::malformed(SOURCE, e))?;

    let results = match (resp.status.as_deref(), resp.results) {
        (Some("OK"), Some(results)) if !results.is_empty() => results,
        (status, _) => {
            debug!("{}: polygon status {:?} without results", symbol, status);
            return Err(ProviderError::no_data(SOURCE, symbol));
        }
    };

    Ok(results
        .into_iter()
        .map(|a| RawBar {
            date: a
                .t
                .and_then(DateTime::from_timestamp_millis)
                .map(|dt| dt.date_naive()),
            open: a.o,
            high: a.h,
            low: a.l,
            close: a.c,
            volume: a.v,
        })
        .collect())
}

#[async_trait]
impl BarSource for PolygonClient {
    fn id(&self) -> Source {
        SOURCE
    }

    async fn fetch(&self, symbol: &str, range: DateRange) -> Result<Vec<DailyBar>, ProviderError> {
        let url = self.aggregates_url(symbol, range)?;
        let body = self.client.get_text(url).await?;
        let rows = parse_aggregates(&body, symbol)?;

        let bars = to_bars(symbol, &rows, SOURCE, &BarMeta::default(), Utc::now().naive_utc());
        if bars.is_empty() {
            return Err(ProviderError::no_data(SOURCE, symbol));
        }
        info!("Polygon: fetched {} ({} days)", symbol, bars.len());
        Ok(bars)
    }
}
