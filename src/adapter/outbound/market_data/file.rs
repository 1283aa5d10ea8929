//! OHLCV bars read from JSON files, one per stock code.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::trace;

use super::decode_series;
use crate::domain::{BarPeriod, OhlcvSeries};
use crate::error::{Error, Result};
use crate::port::outbound::market_data::OhlcvSource;

/// Reads `{dir}/{code}.{period}.json`, falling back to `{dir}/{code}.json`.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    dir: PathBuf,
}

impl JsonFileSource {
    /// Read `{dir}/{stock_code}.json` files.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn candidates(&self, stock_code: &str, period: BarPeriod) -> Result<[PathBuf; 2]> {
        let valid = !stock_code.is_empty()
            && stock_code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
            && !stock_code.contains("..");
        if !valid {
            return Err(Error::Parse(format!("invalid stock code {stock_code:?}")));
        }
        Ok([
            self.dir.join(format!("{stock_code}.{period}.json")),
            self.dir.join(format!("{stock_code}.json")),
        ])
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl OhlcvSource for JsonFileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn fetch(&self, stock_code: &str, period: BarPeriod, limit: usize) -> Result<OhlcvSeries> {
        let [specific, generic] = self.candidates(stock_code, period)?;
        let bytes = match tokio::fs::read(&specific).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => tokio::fs::read(&generic).await?,
            Err(e) => return Err(e.into()),
        };
        trace!(stock_code, bytes = bytes.len(), "Bars file read");
        decode_series(&bytes, limit)
    }
}
