//! OHLCV bars from an HTTP kline endpoint.
//!
//! `GET {base_url}/kline?ts_code={code}&period={period}&limit={limit}`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use super::decode_series;
use crate::domain::{BarPeriod, OhlcvSeries};
use crate::error::{Error, Result};
use crate::port::outbound::market_data::OhlcvSource;

#[derive(Debug, Clone)]
pub struct HttpKlineSource {
    client: Client,
    endpoint: Url,
}

/// Period names understood by kline endpoints.
fn period_param(period: BarPeriod) -> &'static str {
    match period {
        BarPeriod::Minute5 => "5",
        BarPeriod::Minute15 => "15",
        BarPeriod::Minute30 => "30",
        BarPeriod::Minute60 => "60",
        BarPeriod::Daily => "daily",
        BarPeriod::Weekly => "weekly",
        BarPeriod::Monthly => "monthly",
    }
}

impl HttpKlineSource {
    /// # Errors
    ///
    /// Returns an error if `base_url` does not parse or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: base.join("kline")?,
        })
    }

    fn request_url(&self, stock_code: &str, period: BarPeriod, limit: usize) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("ts_code", stock_code)
            .append_pair("period", period_param(period))
            .append_pair("limit", &limit.to_string());
        url
    }
}

#[async_trait]
impl OhlcvSource for HttpKlineSource {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, stock_code: &str, period: BarPeriod, limit: usize) -> Result<OhlcvSeries> {
        let bytes = self
            .client
            .get(self.request_url(stock_code, period, limit))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Connection(e.to_string()))?
            .bytes()
            .await?;
        decode_series(&bytes, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_url_carries_query() {
        let source = HttpKlineSource::new("http://localhost:8000/api/akshare", Duration::from_secs(1)).unwrap();
        let url = source.request_url("600519.SH", BarPeriod::Minute60, 120);
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/akshare/kline?ts_code=600519.SH&period=60&limit=120"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(HttpKlineSource::new("localhost", Duration::from_secs(1)).is_err());
    }
}
