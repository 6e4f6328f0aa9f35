//! Portfolio state: open positions, cash, equity curve, and the
//! closed-trade ledger.
//!
//! At most one open position per symbol. Cash accounting is
//! futures-style: cash moves only on realized P&L and commissions, and
//! daily equity is cash plus mark-to-market unrealized P&L.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::domain::position::{OpenPosition, TradeRecord};

/// One appended record per simulated day, ordered by date.
#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
    pub cash: f64,
    /// Mark-to-market unrealized P&L across open positions.
    pub position_value: f64,
    /// Drawdown from the running high-water mark, as a fraction.
    pub drawdown_pct: f64,
    pub high_water_mark: f64,
    pub open_positions: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: HashMap<String, OpenPosition>,
    pub closed_trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            positions: HashMap::new(),
            closed_trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn add_position(&mut self, position: OpenPosition) {
        self.positions.insert(position.symbol.clone(), position);
    }

    pub fn get_position(&self, symbol: &str) -> Option<&OpenPosition> {
        self.positions.get(symbol)
    }

    pub fn get_position_mut(&mut self, symbol: &str) -> Option<&mut OpenPosition> {
        self.positions.get_mut(symbol)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn remove_position(&mut self, symbol: &str) -> Option<OpenPosition> {
        self.positions.remove(symbol)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Units (pyramid levels) held across every open position.
    pub fn total_units(&self) -> usize {
        self.positions.values().map(|p| p.unit_count()).sum()
    }

    /// Units held in one correlation group.
    pub fn units_in_group(&self, group: &str) -> usize {
        self.positions
            .values()
            .filter(|p| p.correlation_group.as_deref() == Some(group))
            .map(|p| p.unit_count())
            .sum()
    }

    /// Units held in one market (0 when the symbol has no position).
    pub fn units_for_symbol(&self, symbol: &str) -> usize {
        self.positions
            .get(symbol)
            .map(|p| p.unit_count())
            .unwrap_or(0)
    }

    pub fn record_trade(&mut self, trade: TradeRecord) {
        self.closed_trades.push(trade);
    }

    /// Append one equity point, carrying the high-water mark forward.
    pub fn record_equity(&mut self, date: NaiveDate, cash: f64, position_value: f64) {
        let equity = cash + position_value;
        let open_positions = self.position_count();
        let prev_hwm = self
            .equity_curve
            .last()
            .map(|p| p.high_water_mark)
            .unwrap_or(self.initial_capital);
        let high_water_mark = prev_hwm.max(equity);
        let drawdown_pct = if high_water_mark > 0.0 {
            (high_water_mark - equity) / high_water_mark
        } else {
            0.0
        };
        self.equity_curve.push(EquityPoint {
            date,
            equity,
            cash,
            position_value,
            drawdown_pct,
            high_water_mark,
            open_positions,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::PyramidLevel;
    use crate::domain::signal::{Direction, System};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample_position(symbol: &str, units: usize, group: Option<&str>) -> OpenPosition {
        let mut pos = OpenPosition::new(
            symbol.to_string(),
            Direction::Long,
            System::Fast,
            group.map(String::from),
            PyramidLevel {
                level: 1,
                entry_price: 100.0,
                contracts: 2,
                n_at_entry: 4.0,
                entry_date: date(2),
            },
            92.0,
        );
        for i in 2..=units {
            pos.add_level(
                PyramidLevel {
                    level: i,
                    entry_price: 100.0 + 2.0 * i as f64,
                    contracts: 2,
                    n_at_entry: 4.0,
                    entry_date: date(2 + i as u32),
                },
                4,
            )
            .unwrap();
        }
        pos
    }

    #[test]
    fn new_portfolio() {
        let portfolio = Portfolio::new(100_000.0);
        assert!((portfolio.cash - 100_000.0).abs() < f64::EPSILON);
        assert!(portfolio.positions.is_empty());
        assert!(portfolio.closed_trades.is_empty());
        assert!(portfolio.equity_curve.is_empty());
    }

    #[test]
    fn one_position_per_symbol() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.add_position(sample_position("GC", 1, None));
        portfolio.add_position(sample_position("GC", 2, None));
        assert_eq!(portfolio.position_count(), 1);
        assert_eq!(portfolio.units_for_symbol("GC"), 2);
    }

    #[test]
    fn remove_position() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.add_position(sample_position("GC", 1, None));
        assert!(portfolio.remove_position("GC").is_some());
        assert!(!portfolio.has_position("GC"));
        assert!(portfolio.remove_position("GC").is_none());
    }

    #[test]
    fn unit_aggregates() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.add_position(sample_position("GC", 3, Some("metals")));
        portfolio.add_position(sample_position("SI", 2, Some("metals")));
        portfolio.add_position(sample_position("CL", 1, Some("energy")));

        assert_eq!(portfolio.total_units(), 6);
        assert_eq!(portfolio.units_in_group("metals"), 5);
        assert_eq!(portfolio.units_in_group("energy"), 1);
        assert_eq!(portfolio.units_in_group("grains"), 0);
        assert_eq!(portfolio.units_for_symbol("GC"), 3);
        assert_eq!(portfolio.units_for_symbol("ZC"), 0);
    }

    #[test]
    fn record_equity_tracks_high_water_mark() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.record_equity(date(2), 100_000.0, 5_000.0);
        portfolio.record_equity(date(3), 100_000.0, -2_000.0);
        portfolio.record_equity(date(4), 100_000.0, 10_000.0);

        assert_eq!(portfolio.equity_curve.len(), 3);
        let p1 = &portfolio.equity_curve[0];
        assert!((p1.high_water_mark - 105_000.0).abs() < f64::EPSILON);
        assert!((p1.drawdown_pct - 0.0).abs() < f64::EPSILON);

        let p2 = &portfolio.equity_curve[1];
        assert!((p2.equity - 98_000.0).abs() < f64::EPSILON);
        assert!((p2.high_water_mark - 105_000.0).abs() < f64::EPSILON);
        assert!((p2.drawdown_pct - 7_000.0 / 105_000.0).abs() < 1e-12);

        let p3 = &portfolio.equity_curve[2];
        assert!((p3.high_water_mark - 110_000.0).abs() < f64::EPSILON);
        assert!((p3.drawdown_pct - 0.0).abs() < f64::EPSILON);
    }
}
