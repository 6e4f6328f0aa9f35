//! Open positions, pyramid levels, and the closed-trade ledger record.

use chrono::NaiveDate;
use std::fmt;

use crate::domain::error::TortugaError;
use crate::domain::signal::{Direction, System};

/// Hard cap on pyramid levels per position. Configuration may lower this
/// but never raise it.
pub const MAX_PYRAMID_LEVELS: usize = 4;

/// One sizing unit within a position. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct PyramidLevel {
    /// Ordinal within the position, 1-based.
    pub level: usize,
    pub entry_price: f64,
    pub contracts: i64,
    /// N in effect when this level was entered; pyramid triggers and the
    /// recomputed whole-position stop key off the newest level's N.
    pub n_at_entry: f64,
    pub entry_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub symbol: String,
    pub direction: Direction,
    pub system: System,
    pub correlation_group: Option<String>,
    /// Ordered, append-only; 1..=MAX_PYRAMID_LEVELS elements.
    pub levels: Vec<PyramidLevel>,
    /// One stop covers every level; replaced wholesale on each pyramid add.
    pub stop_price: f64,
    pub entry_date: NaiveDate,
    /// Entry-side commissions accumulated so far, folded into the trade
    /// record at close.
    pub commission_paid: f64,
}

impl OpenPosition {
    pub fn new(
        symbol: String,
        direction: Direction,
        system: System,
        correlation_group: Option<String>,
        first_level: PyramidLevel,
        stop_price: f64,
    ) -> Self {
        let entry_date = first_level.entry_date;
        OpenPosition {
            symbol,
            direction,
            system,
            correlation_group,
            levels: vec![first_level],
            stop_price,
            entry_date,
            commission_paid: 0.0,
        }
    }

    pub fn is_long(&self) -> bool {
        self.direction == Direction::Long
    }

    pub fn is_short(&self) -> bool {
        self.direction == Direction::Short
    }

    /// Number of units (pyramid levels) held.
    pub fn unit_count(&self) -> usize {
        self.levels.len()
    }

    pub fn total_contracts(&self) -> i64 {
        self.levels.iter().map(|l| l.contracts).sum()
    }

    /// Contract-weighted average entry price across levels.
    pub fn avg_entry_price(&self) -> f64 {
        let contracts = self.total_contracts();
        if contracts == 0 {
            return 0.0;
        }
        let weighted: f64 = self
            .levels
            .iter()
            .map(|l| l.entry_price * l.contracts as f64)
            .sum();
        weighted / contracts as f64
    }

    /// The most recently added level. A position always has at least one.
    pub fn latest_level(&self) -> &PyramidLevel {
        self.levels
            .last()
            .expect("position invariant: at least one pyramid level")
    }

    /// Append a pyramid level. The caller recomputes the stop afterwards.
    pub fn add_level(&mut self, level: PyramidLevel, max_units: usize) -> Result<(), TortugaError> {
        let cap = max_units.min(MAX_PYRAMID_LEVELS);
        if self.levels.len() >= cap {
            return Err(TortugaError::MaxPyramidLevels {
                symbol: self.symbol.clone(),
                max: cap,
            });
        }
        self.levels.push(level);
        Ok(())
    }

    /// Mark-to-market P&L at `price`, in dollars.
    pub fn unrealized_pnl(&self, price: f64, point_value: f64) -> f64 {
        self.levels
            .iter()
            .map(|l| self.direction.sign() * (price - l.entry_price) * l.contracts as f64 * point_value)
            .sum()
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    BreakoutExit,
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss => write!(f, "stop"),
            ExitReason::BreakoutExit => write!(f, "breakout exit"),
            ExitReason::EndOfData => write!(f, "end of data"),
        }
    }
}

/// Closed-trade audit entry. Immutable once created; the sole input to
/// the trade-history filter and to performance metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub symbol: String,
    pub direction: Direction,
    pub system: System,
    pub contracts: i64,
    pub unit_count: usize,
    /// Contract-weighted average across pyramid levels.
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub gross_pnl: f64,
    pub commission: f64,
    pub net_pnl: f64,
    pub exit_reason: ExitReason,
}

impl TradeRecord {
    pub fn is_profitable(&self) -> bool {
        self.net_pnl > 0.0
    }
}
