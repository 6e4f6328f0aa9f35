//! N (Wilder-smoothed average true range) — the strategy's volatility unit.
//!
//! Seed with the simple mean of the first P true ranges, then apply
//! Wilder's recurrence: N = ((P-1)*N_prev + TR) / P. Supplying a previous
//! N smooths only the most recent true range against it (incremental
//! mode), which reproduces the same sequence as full recomputation.

use crate::domain::error::TortugaError;
use crate::domain::ohlcv::Bar;

pub const DEFAULT_N_PERIOD: usize = 20;

/// True range per bar, oldest first. The first bar has no previous close
/// and uses high - low only.
pub fn true_ranges(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.raw_range()
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect()
}

/// Compute N over `bars` (oldest first).
///
/// With `prev_n` supplied, only the most recent true range is folded into
/// the recurrence; otherwise at least `period + 1` bars are required (the
/// unseeded first bar contributes no usable true range).
pub fn calculate_n(
    bars: &[Bar],
    period: usize,
    prev_n: Option<f64>,
) -> Result<f64, TortugaError> {
    if let Some(prev) = prev_n {
        let last = bars.last().ok_or_else(|| TortugaError::InsufficientData {
            symbol: String::new(),
            bars: 0,
            minimum: 1,
        })?;
        let tr = if bars.len() >= 2 {
            last.true_range(bars[bars.len() - 2].close)
        } else {
            last.raw_range()
        };
        return Ok(wilder_step(prev, tr, period));
    }

    if bars.len() < period + 1 {
        return Err(TortugaError::InsufficientData {
            symbol: bars.first().map(|b| b.symbol.clone()).unwrap_or_default(),
            bars: bars.len(),
            minimum: period + 1,
        });
    }

    let trs = true_ranges(bars);

    // Seed from bars 1..=period, then recurse over the remainder.
    let seed: f64 = trs[1..=period].iter().sum::<f64>() / period as f64;
    let mut n = seed;
    for &tr in &trs[period + 1..] {
        n = wilder_step(n, tr, period);
    }
    Ok(n)
}

fn wilder_step(prev_n: f64, tr: f64, period: usize) -> f64 {
    ((period as f64 - 1.0) * prev_n + tr) / period as f64
}
