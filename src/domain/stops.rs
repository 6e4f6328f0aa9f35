//! Stop price calculation.
//!
//! The initial stop sits `multiplier * N` on the loss side of the entry.
//! When a unit is added, the whole position's stop is replaced by one
//! computed from the newest entry price and its N — the only mechanism
//! that re-anchors a position's aggregate risk.

use crate::domain::signal::Direction;

pub const DEFAULT_STOP_MULTIPLIER: f64 = 2.0;

/// Stop for a fresh entry: entry - mult*N for longs, entry + mult*N for
/// shorts.
pub fn initial_stop(entry_price: f64, n: f64, direction: Direction, multiplier: f64) -> f64 {
    entry_price - direction.sign() * multiplier * n
}

/// Replacement stop after a pyramid add, anchored on the newest level.
pub fn pyramid_stop(
    newest_entry_price: f64,
    newest_n: f64,
    direction: Direction,
    multiplier: f64,
) -> f64 {
    initial_stop(newest_entry_price, newest_n, direction, multiplier)
}

/// Inclusive stop test: the stop is hit when price reaches or crosses it.
pub fn is_stop_hit(price: f64, stop_price: f64, direction: Direction) -> bool {
    match direction {
        Direction::Long => price <= stop_price,
        Direction::Short => price >= stop_price,
    }
}
