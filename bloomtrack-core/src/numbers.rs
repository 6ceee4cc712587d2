//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Round a f64 and clamp it to the i64 range, returning 0 for NaN values.
#[must_use]
pub fn round_f64_to_i64(value: f64) -> i64 {
    if value.is_nan() {
        return 0;
    }
    let min = cast::<i64, f64>(i64::MIN).unwrap_or(f64::MIN);
    let max = cast::<i64, f64>(i64::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).round();
    cast::<f64, i64>(clamped).unwrap_or(0)
}

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn count_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Convert i64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn i64_to_f64(value: i64) -> f64 {
    cast::<i64, f64>(value).unwrap_or(0.0)
}

/// `round(min(100, value / target * 100))` clamped into `0..=100`.
///
/// A zero target is treated as a target of one, matching how the counting
/// rules have always scored empty thresholds.
#[must_use]
pub fn ratio_percent(value: f64, target: f64) -> u8 {
    if !value.is_finite() || !target.is_finite() {
        return 0;
    }
    let target = if target <= 0.0 { 1.0 } else { target };
    clamp_percent((value / target) * 100.0)
}

/// Round and clamp any floating percentage into `0..=100`.
#[must_use]
pub fn clamp_percent(value: f64) -> u8 {
    let rounded = round_f64_to_i64(value).clamp(0, 100);
    u8::try_from(rounded).unwrap_or(0)
}

/// Percentage for integer counts against an integer threshold.
#[must_use]
pub fn count_percent(count: usize, threshold: u32) -> u8 {
    ratio_percent(count_to_f64(count), f64::from(threshold))
}
