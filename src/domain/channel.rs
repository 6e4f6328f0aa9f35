//! Donchian channels: rolling highest-high / lowest-low over a lookback
//! window.
//!
//! Entry tests are strict (a genuine breach of the channel) while exit
//! tests are inclusive (defensive trigger at the boundary). Three periods
//! matter to the strategy: 10 (fast-system exit), 20 (fast-system entry
//! and slow-system exit), 55 (slow-system entry).

use crate::domain::error::TortugaError;
use crate::domain::ohlcv::Bar;

pub const FAST_ENTRY_PERIOD: usize = 20;
pub const FAST_EXIT_PERIOD: usize = 10;
pub const SLOW_ENTRY_PERIOD: usize = 55;
pub const SLOW_EXIT_PERIOD: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct DonchianChannel {
    pub period: usize,
    pub upper: f64,
    pub lower: f64,
}

impl DonchianChannel {
    /// Strict breakout above the channel.
    pub fn breaks_above(&self, price: f64) -> bool {
        price > self.upper
    }

    /// Strict breakout below the channel.
    pub fn breaks_below(&self, price: f64) -> bool {
        price < self.lower
    }

    /// Inclusive touch of the upper boundary (short exit trigger).
    pub fn touches_upper(&self, price: f64) -> bool {
        price >= self.upper
    }

    /// Inclusive touch of the lower boundary (long exit trigger).
    pub fn touches_lower(&self, price: f64) -> bool {
        price <= self.lower
    }
}

/// Compute the channel over the last `period` bars of `bars`.
pub fn calculate_channel(bars: &[Bar], period: usize) -> Result<DonchianChannel, TortugaError> {
    if bars.len() < period || period == 0 {
        return Err(TortugaError::InsufficientData {
            symbol: bars.first().map(|b| b.symbol.clone()).unwrap_or_default(),
            bars: bars.len(),
            minimum: period,
        });
    }

    let window = &bars[bars.len() - period..];
    let upper = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let lower = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);

    Ok(DonchianChannel {
        period,
        upper,
        lower,
    })
}
