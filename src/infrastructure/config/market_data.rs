//! OHLCV source configuration.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// `{dir}/{code}.{period}.json` or `{dir}/{code}.json`.
    #[default]
    File,
    /// Kline endpoint at `{base_url}/kline`.
    Http,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketDataSection {
    pub source: SourceKind,
    pub dir: PathBuf,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for MarketDataSection {
    fn default() -> Self {
        Self {
            source: SourceKind::File,
            dir: PathBuf::from("data"),
            base_url: None,
            timeout_secs: 10,
        }
    }
}
