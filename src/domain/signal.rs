//! Breakout signal detection for the two entry systems.
//!
//! System 1 (fast) enters on a 20-day breakout, System 2 (slow) on a
//! 55-day breakout. When both fire in the same direction on the same day
//! only the fast signal is kept; opposite-direction signals may coexist.

use std::fmt;

use crate::domain::channel::DonchianChannel;
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short; used to sign P&L and stop offsets.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// The two independent breakout lookback systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum System {
    Fast,
    Slow,
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            System::Fast => write!(f, "fast"),
            System::Slow => write!(f, "slow"),
        }
    }
}

/// A breakout candidate, produced and consumed within one simulated day.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub symbol: String,
    pub direction: Direction,
    pub system: System,
    /// Modeled fill: max(channel upper, bar open) for longs,
    /// min(channel lower, bar open) for shorts (gap-through fills).
    pub entry_price: f64,
    pub channel_value: f64,
}

/// Detect breakout signals for one symbol on one day.
///
/// `fast_channel` and `slow_channel` are the entry channels (20/55 day)
/// computed over the window ending the previous day.
pub fn detect_signals(
    bar: &Bar,
    fast_channel: Option<&DonchianChannel>,
    slow_channel: Option<&DonchianChannel>,
    allow_short: bool,
) -> Vec<Signal> {
    let mut signals = Vec::new();

    for (system, channel) in [(System::Fast, fast_channel), (System::Slow, slow_channel)] {
        let Some(channel) = channel else {
            continue;
        };

        if channel.breaks_above(bar.high) {
            signals.push(Signal {
                symbol: bar.symbol.clone(),
                direction: Direction::Long,
                system,
                entry_price: channel.upper.max(bar.open),
                channel_value: channel.upper,
            });
        }

        if allow_short && channel.breaks_below(bar.low) {
            signals.push(Signal {
                symbol: bar.symbol.clone(),
                direction: Direction::Short,
                system,
                entry_price: channel.lower.min(bar.open),
                channel_value: channel.lower,
            });
        }
    }

    suppress_redundant(signals)
}

/// When both systems fire in the same direction, keep only the fast one.
fn suppress_redundant(signals: Vec<Signal>) -> Vec<Signal> {
    let fast_long = signals
        .iter()
        .any(|s| s.system == System::Fast && s.direction == Direction::Long);
    let fast_short = signals
        .iter()
        .any(|s| s.system == System::Fast && s.direction == Direction::Short);

    signals
        .into_iter()
        .filter(|s| {
            if s.system == System::Slow {
                match s.direction {
                    Direction::Long => !fast_long,
                    Direction::Short => !fast_short,
                }
            } else {
                true
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bar(open: f64, high: f64, low: f64) -> Bar {
        Bar {
            symbol: "GC".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            open,
            high,
            low,
            close: (high + low) / 2.0,
            volume: 1000,
        }
    }

    fn channel(period: usize, upper: f64, lower: f64) -> DonchianChannel {
        DonchianChannel {
            period,
            upper,
            lower,
        }
    }

    #[test]
    fn long_breakout_on_fast_system() {
        let bar = make_bar(100.0, 112.0, 99.0);
        let fast = channel(20, 110.0, 90.0);
        let signals = detect_signals(&bar, Some(&fast), None, true);

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].direction, Direction::Long);
        assert_eq!(signals[0].system, System::Fast);
        // Open below the channel: fill at the channel boundary.
        assert!((signals[0].entry_price - 110.0).abs() < f64::EPSILON);
        assert!((signals[0].channel_value - 110.0).abs() < f64::EPSILON);
    }

    #[test]
    fn gap_through_open_sets_entry_price() {
        // Opens above the channel: fill at the open, not the channel.
        let bar = make_bar(115.0, 116.0, 113.0);
        let fast = channel(20, 110.0, 90.0);
        let signals = detect_signals(&bar, Some(&fast), None, true);

        assert_eq!(signals.len(), 1);
        assert!((signals[0].entry_price - 115.0).abs() < f64::EPSILON);
    }

    #[test]
    fn short_breakout_requires_short_selling_enabled() {
        let bar = make_bar(95.0, 96.0, 88.0);
        let fast = channel(20, 110.0, 90.0);

        let with_shorts = detect_signals(&bar, Some(&fast), None, true);
        assert_eq!(with_shorts.len(), 1);
        assert_eq!(with_shorts[0].direction, Direction::Short);
        assert!((with_shorts[0].entry_price - 90.0).abs() < f64::EPSILON);

        let without_shorts = detect_signals(&bar, Some(&fast), None, false);
        assert!(without_shorts.is_empty());
    }

    #[test]
    fn short_gap_through_fill() {
        let bar = make_bar(85.0, 87.0, 84.0);
        let fast = channel(20, 110.0, 90.0);
        let signals = detect_signals(&bar, Some(&fast), None, true);
        assert_eq!(signals.len(), 1);
        assert!((signals[0].entry_price - 85.0).abs() < f64::EPSILON);
    }

    #[test]
    fn touching_the_channel_is_not_a_breakout() {
        let bar = make_bar(100.0, 110.0, 90.0);
        let fast = channel(20, 110.0, 90.0);
        let signals = detect_signals(&bar, Some(&fast), None, true);
        assert!(signals.is_empty());
    }

    #[test]
    fn same_direction_slow_signal_is_suppressed() {
        let bar = make_bar(100.0, 125.0, 99.0);
        let fast = channel(20, 110.0, 90.0);
        let slow = channel(55, 120.0, 85.0);
        let signals = detect_signals(&bar, Some(&fast), Some(&slow), true);

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].system, System::Fast);
    }

    #[test]
    fn slow_system_fires_alone() {
        let bar = make_bar(100.0, 125.0, 99.0);
        let fast = channel(20, 130.0, 90.0);
        let slow = channel(55, 120.0, 85.0);
        let signals = detect_signals(&bar, Some(&fast), Some(&slow), true);

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].system, System::Slow);
        assert!((signals[0].channel_value - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn opposite_direction_signals_coexist() {
        // Wide-ranging day: fast long breakout and slow short breakout.
        let bar = make_bar(100.0, 112.0, 80.0);
        let fast = channel(20, 110.0, 75.0);
        let slow = channel(55, 120.0, 85.0);
        let signals = detect_signals(&bar, Some(&fast), Some(&slow), true);

        assert_eq!(signals.len(), 2);
        assert!(signals
            .iter()
            .any(|s| s.system == System::Fast && s.direction == Direction::Long));
        assert!(signals
            .iter()
            .any(|s| s.system == System::Slow && s.direction == Direction::Short));
    }

    #[test]
    fn missing_channels_produce_no_signals() {
        let bar = make_bar(100.0, 112.0, 99.0);
        assert!(detect_signals(&bar, None, None, true).is_empty());
    }
}
