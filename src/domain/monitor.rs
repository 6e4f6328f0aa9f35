//! Per-position daily decision: stop hit, breakout exit, pyramid, hold.
//!
//! Strict priority, first match wins — only one action per position per
//! day, and lower-priority checks are not evaluated once one matches.

use crate::domain::channel::DonchianChannel;
use crate::domain::ohlcv::Bar;
use crate::domain::position::OpenPosition;
use crate::domain::signal::Direction;
use crate::domain::stops::is_stop_hit;

/// Favorable move past the latest entry, in N, that triggers an add.
pub const PYRAMID_TRIGGER_N: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub enum PositionAction {
    /// The day's adverse extreme reached the stop; fill at the stop.
    ExitStop { price: f64 },
    /// The exit channel boundary was touched; fill at the boundary.
    ExitBreakout { price: f64 },
    /// Price moved half an N beyond the latest entry; add a unit at the
    /// modeled fill (gap-through aware).
    AddUnit { price: f64 },
    Hold,
}

/// Evaluate one open position against one day's bar.
///
/// `exit_channel` is the system-specific exit channel (10-day for fast,
/// 20-day for slow) computed over the window ending the previous day;
/// `None` skips the breakout-exit check for the day.
pub fn evaluate(
    position: &OpenPosition,
    bar: &Bar,
    exit_channel: Option<&DonchianChannel>,
    pyramiding_enabled: bool,
    max_units: usize,
) -> PositionAction {
    let adverse_extreme = if position.is_long() { bar.low } else { bar.high };
    if is_stop_hit(adverse_extreme, position.stop_price, position.direction) {
        return PositionAction::ExitStop {
            price: position.stop_price,
        };
    }

    if let Some(channel) = exit_channel {
        match position.direction {
            Direction::Long if channel.touches_lower(bar.low) => {
                return PositionAction::ExitBreakout {
                    price: channel.lower,
                };
            }
            Direction::Short if channel.touches_upper(bar.high) => {
                return PositionAction::ExitBreakout {
                    price: channel.upper,
                };
            }
            _ => {}
        }
    }

    if pyramiding_enabled && position.unit_count() < max_units.min(crate::domain::position::MAX_PYRAMID_LEVELS) {
        let latest = position.latest_level();
        let trigger = latest.entry_price
            + position.direction.sign() * PYRAMID_TRIGGER_N * latest.n_at_entry;
        match position.direction {
            Direction::Long if bar.high >= trigger => {
                return PositionAction::AddUnit {
                    price: trigger.max(bar.open),
                };
            }
            Direction::Short if bar.low <= trigger => {
                return PositionAction::AddUnit {
                    price: trigger.min(bar.open),
                };
            }
            _ => {}
        }
    }

    PositionAction::Hold
}
