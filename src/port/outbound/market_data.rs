//! Market data port.

use async_trait::async_trait;

use crate::domain::{BarPeriod, OhlcvSeries};
use crate::error::Result;

/// Provider of OHLCV bars.
///
/// Implementations return bars ascending by time. The engine uses the series
/// exactly as returned and never re-fetches to repair gaps or duplicates.
#[async_trait]
pub trait OhlcvSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &'static str;

    /// Fetch the most recent `limit` bars for `stock_code`.
    ///
    /// # Errors
    ///
    /// Returns an error when the source is unreachable or returns data that
    /// cannot be decoded.
    async fn fetch(&self, stock_code: &str, period: BarPeriod, limit: usize)
        -> Result<OhlcvSeries>;
}
