//! OHLCV fixtures with known indicator outcomes.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::{Bar, OhlcvSeries};

/// MA5 sits below MA10 on the second-to-last bar (13 vs 15.5) and above it
/// on the last (18 vs 17.5).
pub const GOLDEN_CROSS_CLOSES: [f64; 11] = [
    20.0, 19.0, 18.0, 17.0, 16.0, 15.0, 14.0, 13.0, 12.0, 11.0, 40.0,
];

/// Mirror of [`GOLDEN_CROSS_CLOSES`] around 25.
pub const DEATH_CROSS_CLOSES: [f64; 11] = [
    30.0, 31.0, 32.0, 33.0, 34.0, 35.0, 36.0, 37.0, 38.0, 39.0, 10.0,
];

/// Seven unit gains and three unit losses over 14 changes: RSI(14) on the
/// last bar is exactly 70.
pub const RSI_70_CLOSES: [f64; 15] = [
    100.0, 101.0, 102.0, 101.0, 102.0, 102.0, 103.0, 102.0, 103.0, 103.0, 104.0, 104.0, 103.0,
    104.0, 104.0,
];

/// Midnight UTC of day `index` counted from 2024-01-01.
#[must_use]
pub fn day(index: usize) -> DateTime<Utc> {
    let base = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default();
    base + Duration::days(index as i64)
}

/// Daily bars with open = high = low = close and constant volume.
#[must_use]
pub fn from_closes(closes: &[f64]) -> OhlcvSeries {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::new(day(i), c, c, c, c, 1_000.0))
        .collect::<Vec<_>>()
        .into()
}

/// Flat-priced daily bars with the given volumes.
#[must_use]
pub fn with_volumes(volumes: &[f64]) -> OhlcvSeries {
    volumes
        .iter()
        .enumerate()
        .map(|(i, &v)| Bar::new(day(i), 10.0, 10.0, 10.0, 10.0, v))
        .collect::<Vec<_>>()
        .into()
}

#[must_use]
pub fn golden_cross() -> OhlcvSeries {
    from_closes(&GOLDEN_CROSS_CLOSES)
}

#[must_use]
pub fn death_cross() -> OhlcvSeries {
    from_closes(&DEATH_CROSS_CLOSES)
}

#[must_use]
pub fn rsi_at_70() -> OhlcvSeries {
    from_closes(&RSI_70_CLOSES)
}

/// `len` bars at a constant price. Never crosses anything.
#[must_use]
pub fn flat(len: usize, price: f64) -> OhlcvSeries {
    from_closes(&vec![price; len])
}
