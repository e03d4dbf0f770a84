//! On-disk JSON cache of fetched bars.
//!
//! One file per symbol and date bucket, `<dir>/<SYMBOL>_<YYYYMMDD>.json`.
//! Freshness is judged on file mtime. Nothing here ever fails a collection
//! run: unreadable or corrupt entries are misses and write errors are
//! swallowed.

use crate::config::CacheConfig;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tracing::debug;

pub struct DataCache {
    dir: PathBuf,
    ttl: Duration,
}

impl DataCache {
    pub fn new(config: &CacheConfig) -> Self {
        if let Err(e) = fs::create_dir_all(&config.dir) {
            debug!("cache dir {:?} unavailable: {}", config.dir, e);
        }
        Self {
            dir: config.dir.clone(),
            ttl: Duration::from_secs(config.ttl_hours.saturating_mul(3600)),
        }
    }

    fn path(&self, symbol: &str, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", symbol.to_uppercase(), date.format("%Y%m%d")))
    }

    fn is_fresh(&self, path: &PathBuf) -> bool {
        let Ok(modified) = fs::metadata(path).and_then(|m| m.modified()) else {
            return false;
        };
        // mtime in the future counts as age zero
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        age < self.ttl
    }

    pub fn load<T: DeserializeOwned>(&self, symbol: &str, date: NaiveDate) -> Option<T> {
        let path = self.path(symbol, date);
        if !self.is_fresh(&path) {
            return None;
        }

        let json = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&json) {
            Ok(value) => {
                debug!("cache hit {:?}", path);
                Some(value)
            }
            Err(e) => {
                debug!("cache entry {:?} unreadable: {}", path, e);
                None
            }
        }
    }

    pub fn save<T: Serialize>(&self, symbol: &str, date: NaiveDate, value: &T) {
        let path = self.path(symbol, date);
        let result = serde_json::to_string(value)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(&path, json).map_err(|e| e.to_string()));

        match result {
            Ok(()) => debug!("cached {:?}", path),
            Err(e) => debug!("cache write {:?} failed: {}", path, e),
        }
    }
}
