//! Indicator math over plain `f64` slices.
//!
//! Every function returns a vector aligned with its input. Positions without
//! enough history hold `NaN`.
//! Edge cases: RSI with no movement is 50; with no losses it is 100.

/// Relative tolerance used for threshold and cross comparisons.
pub const RELATIVE_EPSILON: f64 = 1e-9;

fn tolerance(a: f64, b: f64) -> f64 {
    RELATIVE_EPSILON * a.abs().max(b.abs()).max(1.0)
}

/// `a >= b` within the relative epsilon.
#[must_use]
pub fn approx_ge(a: f64, b: f64) -> bool {
    a >= b - tolerance(a, b)
}

/// `a <= b` within the relative epsilon.
#[must_use]
pub fn approx_le(a: f64, b: f64) -> bool {
    a <= b + tolerance(a, b)
}

/// Sign of the gap between two lines at two consecutive bars.
///
/// An upward cross needs `a < b` (beyond tolerance) on the previous bar and
/// `a >= b` (within tolerance) on the current bar. Touching without a prior
/// gap on the other side is not a cross.
#[must_use]
pub fn crossed_up(prev_a: f64, prev_b: f64, cur_a: f64, cur_b: f64) -> bool {
    !approx_ge(prev_a, prev_b) && approx_ge(cur_a, cur_b)
}

/// Mirror of [`crossed_up`].
#[must_use]
pub fn crossed_down(prev_a: f64, prev_b: f64, cur_a: f64, cur_b: f64) -> bool {
    !approx_le(prev_a, prev_b) && approx_le(cur_a, cur_b)
}

/// Simple moving average.
#[must_use]
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    let mut sum: f64 = values[..period].iter().sum();
    result[period - 1] = sum / period as f64;
    for i in period..n {
        sum += values[i] - values[i - period];
        result[i] = sum / period as f64;
    }
    result
}

/// Exponential moving average seeded with the first value.
#[must_use]
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n == 0 {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    result[0] = values[0];
    for i in 1..n {
        result[i] = alpha * values[i] + (1.0 - alpha) * result[i - 1];
    }
    result
}

/// Relative Strength Index with Wilder smoothing.
#[must_use]
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return result;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    result[period] = rsi_value(avg_gain, avg_loss);

    let alpha = 1.0 / period as f64;
    for i in (period + 1)..n {
        let change = closes[i] - closes[i - 1];
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
        result[i] = rsi_value(avg_gain, avg_loss);
    }

    result
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// MACD line (DIF = EMA fast - EMA slow) and its signal line (DEA).
#[must_use]
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> (Vec<f64>, Vec<f64>) {
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    let dif: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let dea = ema(&dif, signal);
    (dif, dea)
}

/// Highest value in `values[end - window..end]`.
#[must_use]
pub fn window_max(values: &[f64], end: usize, window: usize) -> Option<f64> {
    let start = end.checked_sub(window)?;
    values[start..end].iter().copied().reduce(f64::max)
}

/// Lowest value in `values[end - window..end]`.
#[must_use]
pub fn window_min(values: &[f64], end: usize, window: usize) -> Option<f64> {
    let start = end.checked_sub(window)?;
    values[start..end].iter().copied().reduce(f64::min)
}

/// Mean of `values[end - window..end]`.
#[must_use]
pub fn window_mean(values: &[f64], end: usize, window: usize) -> Option<f64> {
    if window == 0 {
        return None;
    }
    let start = end.checked_sub(window)?;
    Some(values[start..end].iter().sum::<f64>() / window as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "actual={actual}, expected={expected}"
        );
    }

    #[test]
    fn sma_warms_up_then_tracks_window() {
        let result = sma(&[1.0, 2.0, 3.0, 4.0], 2);
        assert!(result[0].is_nan());
        assert_approx(result[1], 1.5);
        assert_approx(result[3], 3.5);
    }

    #[test]
    fn ema_is_seeded_with_first_value() {
        let result = ema(&[10.0, 10.0, 10.0], 3);
        assert_approx(result[0], 10.0);
        assert_approx(result[2], 10.0);
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let result = rsi(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_approx(result[3], 100.0);
    }

    #[test]
    fn rsi_flat_is_50() {
        let result = rsi(&[5.0; 6], 3);
        assert_approx(result[5], 50.0);
    }

    #[test]
    fn rsi_seven_to_three_gain_loss_is_70() {
        let mut closes = vec![100.0];
        let changes = [1.0, 1.0, -1.0, 1.0, 0.0, 1.0, -1.0, 1.0, 0.0, 1.0, 0.0, -1.0, 1.0, 0.0];
        for change in changes {
            let last = *closes.last().unwrap();
            closes.push(last + change);
        }
        let result = rsi(&closes, 14);
        assert_approx(result[14], 70.0);
    }

    #[test]
    fn cross_requires_a_prior_gap() {
        assert!(crossed_up(1.0, 2.0, 2.0, 2.0));
        assert!(!crossed_up(2.0, 2.0, 2.0, 2.0));
        assert!(!crossed_up(3.0, 2.0, 4.0, 2.0));
        assert!(crossed_down(3.0, 2.0, 1.0, 2.0));
    }

    #[test]
    fn window_helpers_exclude_end() {
        let values = [1.0, 5.0, 3.0, 9.0];
        assert_eq!(window_max(&values, 3, 3), Some(5.0));
        assert_eq!(window_min(&values, 3, 2), Some(3.0));
        assert_eq!(window_mean(&values, 2, 2), Some(3.0));
        assert_eq!(window_max(&values, 1, 3), None);
    }
}
