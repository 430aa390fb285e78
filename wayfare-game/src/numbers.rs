//! Numeric conversion helpers centralizing money rounding and safe casts.

use num_traits::cast::cast;

/// Convert a currency amount to whole cents, returning 0 for non-finite values.
#[must_use]
pub fn to_cents(amount: f64) -> i64 {
    if !amount.is_finite() {
        return 0;
    }
    let min = cast::<i64, f64>(i64::MIN).unwrap_or(f64::MIN);
    let max = cast::<i64, f64>(i64::MAX).unwrap_or(f64::MAX);
    let clamped = (amount * 100.0).clamp(min, max).round();
    cast::<f64, i64>(clamped).unwrap_or(0)
}

/// Render an amount as dollars with two decimals, e.g. `$1,030.00` or `-$30.00`.
#[must_use]
pub fn format_money(amount: f64) -> String {
    let cents = to_cents(amount);
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let dollars = (cents / 100).to_string();
    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (idx, ch) in dollars.chars().enumerate() {
        if idx > 0 && (dollars.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}${grouped}.{:02}", cents % 100)
}

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_round_and_handle_non_finite() {
        assert_eq!(to_cents(1000.01), 100_001);
        assert_eq!(to_cents(0.005), 1);
        assert_eq!(to_cents(f64::NAN), 0);
        assert_eq!(to_cents(f64::INFINITY), 0);
    }

    #[test]
    fn money_formats_with_grouping() {
        assert_eq!(format_money(80.0), "$80.00");
        assert_eq!(format_money(1030.0), "$1,030.00");
        assert_eq!(format_money(-30.0), "-$30.00");
        assert_eq!(format_money(1_234_567.891), "$1,234,567.89");
        assert_eq!(format_money(0.0), "$0.00");
    }

    #[test]
    fn counts_convert_exactly() {
        assert!(usize_to_f64(0).abs() < f64::EPSILON);
        assert!((usize_to_f64(1_030) - 1_030.0).abs() < f64::EPSILON);
    }
}
