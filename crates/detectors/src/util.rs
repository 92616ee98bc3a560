use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// a / b as f64; zero when b is zero
pub(crate) fn ratio(a: Decimal, b: Decimal) -> f64 {
    if b.is_zero() {
        return 0.0;
    }
    (a / b).to_f64().unwrap_or(0.0)
}

/// Fraction of `of` that `part` covers, in [0, 1]
pub(crate) fn duration_fraction(part: Duration, of: Duration) -> f64 {
    let of = of.num_milliseconds();
    if of <= 0 {
        return 1.0;
    }
    (part.num_milliseconds() as f64 / of as f64).clamp(0.0, 1.0)
}

pub(crate) fn saturate(value: f64, at: f64) -> f64 {
    if at <= 0.0 {
        return 1.0;
    }
    (value / at).clamp(0.0, 1.0)
}
