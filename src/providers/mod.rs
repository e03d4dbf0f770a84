pub mod alpha_vantage;
pub mod cleaner;
pub mod error;
pub mod finnhub;
pub mod http_client;
pub mod polygon;
pub mod yahoo;

use crate::config::{AppConfig, ProviderKind};
use crate::models::{DailyBar, DateRange, Source};
use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::warn;

use self::alpha_vantage::AlphaVantageClient;
pub use self::error::ProviderError;
use self::finnhub::FinnhubClient;
use self::polygon::PolygonClient;
use self::yahoo::{Market, YahooClient};

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable bar provider. One call per symbol; rows come back canonical.
#[async_trait]
pub trait BarSource: Send + Sync {
    fn id(&self) -> Source;

    async fn fetch(&self, symbol: &str, range: DateRange) -> Result<Vec<DailyBar>, ProviderError>;
}

// ── Factory ───────────────────────────────────────────────────────────────────

pub fn build_source(kind: ProviderKind, config: &AppConfig) -> Result<Box<dyn BarSource>> {
    let http = &config.http;
    let source: Box<dyn BarSource> = match kind {
        ProviderKind::AlphaVantage => {
            let key = match config.keys.alpha_vantage.clone() {
                Some(key) => key,
                None => {
                    warn!("ALPHA_VANTAGE_KEY is not set, using the 'demo' key (one symbol only)");
                    "demo".to_string()
                }
            };
            Box::new(AlphaVantageClient::new(http, key)?)
        }
        ProviderKind::Finnhub => {
            let Some(key) = config.keys.finnhub.clone() else {
                bail!("FINNHUB_API_KEY is not set");
            };
            Box::new(FinnhubClient::new(http, key)?)
        }
        ProviderKind::Polygon => {
            let Some(key) = config.keys.polygon.clone() else {
                bail!("POLYGON_API_KEY is not set");
            };
            Box::new(PolygonClient::new(http, key)?)
        }
        ProviderKind::YahooUs => Box::new(YahooClient::new(http, Market::Us)?),
        ProviderKind::YahooVn => Box::new(YahooClient::new(http, Market::Vn)?),
    };
    Ok(source)
}
