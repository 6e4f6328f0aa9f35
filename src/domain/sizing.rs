//! Risk-based unit sizing.
//!
//! One unit risks `risk_fraction` of sizing equity per N of adverse
//! movement. Contract counts truncate toward zero so risk is never
//! understated, with one documented exception: a raw value in [0.5, 1.0)
//! is bumped to a single contract.

pub const DEFAULT_RISK_FRACTION: f64 = 0.005;

/// Contracts for one unit given sizing equity, volatility N, and the
/// per-point dollar multiplier. Zero or degenerate dollar volatility
/// yields zero contracts rather than a division error.
pub fn unit_size(sizing_equity: f64, n: f64, point_value: f64, risk_fraction: f64) -> i64 {
    let dollar_volatility = n * point_value;
    if dollar_volatility <= 0.0 || sizing_equity <= 0.0 || risk_fraction <= 0.0 {
        return 0;
    }

    let raw = sizing_equity * risk_fraction / dollar_volatility;
    if raw >= 1.0 {
        raw.floor() as i64
    } else if raw >= 0.5 {
        1
    } else {
        0
    }
}
