//! Series primitives shared by the built-in indicators.
//!
//! Undefined values are `f64::NAN`, matching the way frames carry warm-up
//! rows.

/// Simple rolling mean over `window` values.
///
/// The first `window - 1` outputs are NaN, as is any output whose window
/// contains a NaN.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if window == 0 || n < window {
        return result;
    }

    for end in window..=n {
        let slice = &values[end - window..end];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[end - 1] = slice.iter().sum::<f64>() / window as f64;
    }

    result
}

/// Exponential moving average with `alpha = 2 / (span + 1)`.
///
/// Seeded with the first defined value and no bias correction:
/// `ema[t] = alpha * x[t] + (1 - alpha) * ema[t-1]`. Leading NaNs stay NaN;
/// a NaN after the seed carries the previous average forward.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    if span == 0 {
        return result;
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut prev: Option<f64> = None;

    for (i, &v) in values.iter().enumerate() {
        let next = match (prev, v.is_nan()) {
            (None, true) => continue,
            (None, false) => v,
            (Some(p), true) => p,
            (Some(p), false) => alpha * v + (1.0 - alpha) * p,
        };
        result[i] = next;
        prev = Some(next);
    }

    result
}

/// Arithmetic mean ignoring NaN, `None` when nothing is defined.
pub fn mean(values: &[f64]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}
