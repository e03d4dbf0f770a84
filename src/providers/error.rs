//! Provider errors and their retry classification.

use crate::models::Source;
use thiserror::Error;

/// How the collector reacts to a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Worth another attempt after the fixed delay.
    Transient,
    /// Skip the symbol for this run.
    Permanent,
}

#[derive(Error, Debug)]
pub enum ProviderError {
    /// HTTP 429 or an in-band rate-limit notice.
    #[error("{provider}: rate limited")]
    RateLimited { provider: Source },

    #[error("{provider}: request timed out")]
    Timeout { provider: Source },

    #[error("{provider}: HTTP {status}")]
    Http { provider: Source, status: u16 },

    #[error("{provider}: network error: {message}")]
    Network { provider: Source, message: String },

    /// Provider rejected the request itself (unknown symbol, bad key).
    #[error("{provider}: {message}")]
    Api { provider: Source, message: String },

    /// Informational payload in place of data; usually clears on retry.
    #[error("{provider}: notice: {message}")]
    Notice { provider: Source, message: String },

    #[error("{provider}: malformed response: {message}")]
    Malformed { provider: Source, message: String },

    /// Provider answered but had nothing for the symbol and range.
    #[error("{provider}: no data for {symbol}")]
    NoData { provider: Source, symbol: String },
}

impl ProviderError {
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::RateLimited { .. }
            | Self::Timeout { .. }
            | Self::Network { .. }
            | Self::Notice { .. } => RetryClass::Transient,

            Self::Http { status, .. } if *status == 429 || *status >= 500 => RetryClass::Transient,

            Self::Http { .. } | Self::Api { .. } | Self::Malformed { .. } | Self::NoData { .. } => {
                RetryClass::Permanent
            }
        }
    }

    pub fn is_transient(&self) -> bool {
        self.retry_class() == RetryClass::Transient
    }

    pub fn malformed(provider: Source, err: impl std::fmt::Display) -> Self {
        Self::Malformed {
            provider,
            message: err.to_string(),
        }
    }

    pub fn no_data(provider: Source, symbol: &str) -> Self {
        Self::NoData {
            provider,
            symbol: symbol.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        let p = Source::Polygon;
        assert!(ProviderError::RateLimited { provider: p }.is_transient());
        assert!(ProviderError::Timeout { provider: p }.is_transient());
        assert!(ProviderError::Http { provider: p, status: 429 }.is_transient());
        assert!(ProviderError::Http { provider: p, status: 503 }.is_transient());
        assert!(
            ProviderError::Notice { provider: p, message: "busy".into() }.is_transient()
        );
    }

    #[test]
    fn test_permanent_errors() {
        let p = Source::AlphaVantage;
        assert_eq!(
            ProviderError::Http { provider: p, status: 404 }.retry_class(),
            RetryClass::Permanent
        );
        assert_eq!(
            ProviderError::Api { provider: p, message: "Invalid API call".into() }.retry_class(),
            RetryClass::Permanent
        );
        assert_eq!(ProviderError::no_data(p, "XYZ").retry_class(), RetryClass::Permanent);
    }

    #[test]
    fn test_error_display() {
        let e = ProviderError::Http { provider: Source::Finnhub, status: 403 };
        assert_eq!(e.to_string(), "finnhub: HTTP 403");
        let e = ProviderError::no_data(Source::Polygon, "AAPL");
        assert_eq!(e.to_string(), "polygon: no data for AAPL");
    }
}
