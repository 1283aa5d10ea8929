use std::path::Path;

use serde_json::json;
use stockwatch::domain::OhlcvSeries;

/// Write `series` as a kline envelope the way the market-data service
/// returns it: `YYYYMMDD` trade dates and `vol` for volume.
pub fn write_kline_file(dir: &Path, stock_code: &str, series: &OhlcvSeries) {
    let data: Vec<_> = series
        .bars()
        .iter()
        .map(|bar| {
            json!({
                "trade_date": bar.ts.format("%Y%m%d").to_string(),
                "open": bar.open,
                "high": bar.high,
                "low": bar.low,
                "close": bar.close,
                "vol": bar.volume,
            })
        })
        .collect();
    let body = json!({ "ts_code": stock_code, "period": "daily", "data": data });
    std::fs::write(dir.join(format!("{stock_code}.json")), body.to_string())
        .expect("write kline fixture");
}

/// Append one bar at a fresh day to `series`, repeating the last close.
pub fn extend_flat(series: &OhlcvSeries) -> OhlcvSeries {
    let mut bars = series.bars().to_vec();
    if let Some(last) = bars.last().cloned() {
        let mut next = last;
        next.ts += chrono::Duration::days(1);
        bars.push(next);
    }
    OhlcvSeries::new(bars)
}
