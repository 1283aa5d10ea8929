//! OHLCV source adapters.
//!
//! Both sources accept a bare array of bars or a kline envelope
//! `{"ts_code": .., "period": .., "data": [..]}`. Bars are used in the order
//! given; only the most recent `limit` are kept.

pub mod file;
pub mod http;

use serde::Deserialize;

use crate::domain::{Bar, OhlcvSeries};
use crate::error::Result;

pub use file::JsonFileSource;
pub use http::HttpKlineSource;

#[derive(Deserialize)]
#[serde(untagged)]
enum KlinePayload {
    Envelope { data: Vec<Bar> },
    Bare(Vec<Bar>),
}

/// Decode a kline payload (bare array or `{"data": [...]}`), keeping the
/// last `limit` bars.
///
/// # Errors
///
/// Returns an error if the payload is not a kline array.
pub fn decode_series(bytes: &[u8], limit: usize) -> Result<OhlcvSeries> {
    let mut bars = match serde_json::from_slice::<KlinePayload>(bytes)? {
        KlinePayload::Envelope { data } => data,
        KlinePayload::Bare(bars) => bars,
    };
    let start = bars.len().saturating_sub(limit);
    bars.drain(..start);
    Ok(OhlcvSeries::new(bars))
}
