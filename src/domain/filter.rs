//! Trade-history filter (whipsaw avoidance).
//!
//! A fast-system entry is skipped when the most recent closed fast-system
//! trade on the same symbol was profitable. Slow-system entries are the
//! strategy's failsafe and always pass.

use crate::domain::position::TradeRecord;
use crate::domain::signal::{Signal, System};

/// Whether `signal` survives the trade-history filter given the closed
/// trades recorded so far (oldest first).
pub fn passes_filter(signal: &Signal, trades: &[TradeRecord]) -> bool {
    if signal.system == System::Slow {
        return true;
    }

    let last_fast_trade = trades
        .iter()
        .rev()
        .find(|t| t.symbol == signal.symbol && t.system == System::Fast);

    match last_fast_trade {
        Some(trade) => !trade.is_profitable(),
        None => true,
    }
}
