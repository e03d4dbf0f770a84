pub mod universe;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub keys: ApiKeys,
    pub collectors: CollectorsConfig,
    pub orchestrator: OrchestratorConfig,
}

/// HTTP client configuration shared by every provider
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_true")]
    pub run_migrations: bool,

    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

/// On-disk response cache
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_cache_ttl_hours")]
    pub ttl_hours: u64,
}

/// Provider credentials. Missing values fall back to the conventional
/// `ALPHA_VANTAGE_KEY`, `FINNHUB_API_KEY` and `POLYGON_API_KEY` variables.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiKeys {
    pub alpha_vantage: Option<String>,
    pub finnhub: Option<String>,
    pub polygon: Option<String>,
}

/// Loop policy for a single collector.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CollectorSettings {
    pub symbols: Vec<String>,
    /// Total fetch attempts per symbol, first try included.
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    /// Pause between symbols, success or not.
    pub symbol_delay_ms: u64,
    /// Sliding-window quota; `None` disables the limiter.
    pub calls_per_minute: Option<u32>,
    pub use_cache: bool,
    /// Abort the run after this many failed symbols in a row.
    pub max_consecutive_failures: Option<u32>,
    pub default_days_back: u32,
}

impl CollectorSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn symbol_delay(&self) -> Duration {
        Duration::from_millis(self.symbol_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CollectorsConfig {
    pub alpha_vantage: CollectorSettings,
    pub finnhub: CollectorSettings,
    pub polygon: CollectorSettings,
    pub yahoo_us: CollectorSettings,
    pub yahoo_vn: CollectorSettings,
}

/// Daily fallback run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_primary")]
    pub primary: ProviderKind,

    #[serde(default = "default_secondary")]
    pub secondary: ProviderKind,

    #[serde(default = "default_primary_timeout_secs")]
    pub primary_timeout_secs: u64,

    #[serde(default = "default_secondary_timeout_secs")]
    pub secondary_timeout_secs: u64,

    #[serde(default = "default_days_back_daily")]
    pub days_back: u32,

    /// Extra rounds of the whole fallback chain when both collectors fail.
    #[serde(default = "default_task_retries")]
    pub task_retries: u32,

    #[serde(default = "default_task_retry_delay_secs")]
    pub task_retry_delay_secs: u64,
}

/// Collector selector used on the command line and in the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    AlphaVantage,
    Finnhub,
    Polygon,
    YahooUs,
    YahooVn,
}

impl ProviderKind {
    /// Flag value accepted by `collect --provider`.
    pub fn cli_name(&self) -> &'static str {
        match self {
            ProviderKind::AlphaVantage => "alpha-vantage",
            ProviderKind::Finnhub => "finnhub",
            ProviderKind::Polygon => "polygon",
            ProviderKind::YahooUs => "yahoo-us",
            ProviderKind::YahooVn => "yahoo-vn",
        }
    }
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    "market-collector/0.1 (daily equity bars)".to_string()
}
fn default_db_path() -> PathBuf {
    PathBuf::from("data/warehouse.duckdb")
}
fn default_true() -> bool {
    true
}
fn default_retention_days() -> u32 {
    90
}
fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("stock_data_cache")
}
fn default_cache_ttl_hours() -> u64 {
    24
}
fn default_primary() -> ProviderKind {
    ProviderKind::AlphaVantage
}
fn default_secondary() -> ProviderKind {
    ProviderKind::Polygon
}
fn default_primary_timeout_secs() -> u64 {
    300
}
fn default_secondary_timeout_secs() -> u64 {
    600
}
fn default_days_back_daily() -> u32 {
    1
}
fn default_task_retries() -> u32 {
    2
}
fn default_task_retry_delay_secs() -> u64 {
    600
}

fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for CollectorsConfig {
    fn default() -> Self {
        Self {
            alpha_vantage: CollectorSettings {
                symbols: symbols(universe::ALPHA_VANTAGE),
                max_attempts: 2,
                retry_delay_ms: 2_000,
                symbol_delay_ms: 300,
                calls_per_minute: None,
                use_cache: false,
                max_consecutive_failures: None,
                default_days_back: 1,
            },
            finnhub: CollectorSettings {
                symbols: symbols(universe::FINNHUB),
                max_attempts: 1,
                retry_delay_ms: 0,
                symbol_delay_ms: 1_000,
                calls_per_minute: Some(60),
                use_cache: false,
                max_consecutive_failures: None,
                default_days_back: 1,
            },
            polygon: CollectorSettings {
                symbols: symbols(universe::POLYGON),
                max_attempts: 3,
                retry_delay_ms: 5_000,
                symbol_delay_ms: 0,
                calls_per_minute: Some(5),
                use_cache: true,
                max_consecutive_failures: None,
                default_days_back: 30,
            },
            yahoo_us: CollectorSettings {
                symbols: symbols(universe::YAHOO_US),
                max_attempts: 3,
                retry_delay_ms: 10_000,
                symbol_delay_ms: 5_000,
                calls_per_minute: None,
                use_cache: false,
                max_consecutive_failures: None,
                default_days_back: 3,
            },
            yahoo_vn: CollectorSettings {
                symbols: symbols(universe::YAHOO_VN),
                max_attempts: 1,
                retry_delay_ms: 0,
                symbol_delay_ms: 5_000,
                calls_per_minute: None,
                use_cache: false,
                max_consecutive_failures: Some(7),
                default_days_back: 3,
            },
        }
    }
}

impl CollectorsConfig {
    pub fn settings(&self, kind: ProviderKind) -> &CollectorSettings {
        match kind {
            ProviderKind::AlphaVantage => &self.alpha_vantage,
            ProviderKind::Finnhub => &self.finnhub,
            ProviderKind::Polygon => &self.polygon,
            ProviderKind::YahooUs => &self.yahoo_us,
            ProviderKind::YahooVn => &self.yahoo_vn,
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration: built-in defaults, then config files, then
    /// `MARKET__SECTION__KEY` environment overrides.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let defaults = config::Config::try_from(&AppConfig::default())
            .context("Failed to seed default configuration")?;

        let cfg = config::Config::builder()
            .add_source(defaults)
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::Environment::with_prefix("MARKET")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .context("Failed to build configuration")?;

        let mut app_cfg: AppConfig = cfg
            .try_deserialize()
            .context("Invalid configuration")?;
        app_cfg.keys.fill_from_env();
        Ok(app_cfg)
    }
}

impl ApiKeys {
    fn fill_from_env(&mut self) {
        let from_env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        if self.alpha_vantage.is_none() {
            self.alpha_vantage = from_env("ALPHA_VANTAGE_KEY");
        }
        if self.finnhub.is_none() {
            self.finnhub = from_env("FINNHUB_API_KEY");
        }
        if self.polygon.is_none() {
            self.polygon = from_env("POLYGON_API_KEY");
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig {
                timeout_secs: default_timeout_secs(),
                user_agent: default_user_agent(),
            },
            storage: StorageConfig {
                db_path: default_db_path(),
                run_migrations: true,
                retention_days: default_retention_days(),
            },
            cache: CacheConfig {
                dir: default_cache_dir(),
                ttl_hours: default_cache_ttl_hours(),
            },
            keys: ApiKeys::default(),
            collectors: CollectorsConfig::default(),
            orchestrator: OrchestratorConfig {
                primary: default_primary(),
                secondary: default_secondary(),
                primary_timeout_secs: default_primary_timeout_secs(),
                secondary_timeout_secs: default_secondary_timeout_secs(),
                days_back: default_days_back_daily(),
                task_retries: default_task_retries(),
                task_retry_delay_secs: default_task_retry_delay_secs(),
            },
        }
    }
}
