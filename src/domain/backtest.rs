//! Backtest configuration and the day-by-day simulation engine.
//!
//! The engine owns all mutable run state (portfolio, notional equity
//! tracker, per-symbol N cache) and walks the unified timeline strictly
//! in ascending date order. For each day: stops, breakout exits, pyramid
//! adds, new entries, then mark-to-market. Indicator failures are local
//! to one symbol on one day and never abort the run.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::domain::channel::{
    self, FAST_ENTRY_PERIOD, FAST_EXIT_PERIOD, SLOW_ENTRY_PERIOD, SLOW_EXIT_PERIOD,
};
use crate::domain::drawdown::{
    NotionalEquityTracker, DEFAULT_DRAWDOWN_THRESHOLD, DEFAULT_REDUCTION_FACTOR,
};
use crate::domain::filter::passes_filter;
use crate::domain::limits::{self, LimitConfig};
use crate::domain::market_data::{build_unified_timeline, SymbolData};
use crate::domain::metrics::Metrics;
use crate::domain::monitor::{self, PositionAction};
use crate::domain::portfolio::{EquityPoint, Portfolio};
use crate::domain::position::{ExitReason, OpenPosition, PyramidLevel, TradeRecord};
use crate::domain::signal::{detect_signals, Direction, Signal, System};
use crate::domain::sizing::{unit_size, DEFAULT_RISK_FRACTION};
use crate::domain::stops::{initial_stop, pyramid_stop, DEFAULT_STOP_MULTIPLIER};
use crate::domain::volatility::{calculate_n, DEFAULT_N_PERIOD};

/// How same-day entry candidates are prioritized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalRanking {
    /// Strongest breakout first: (price - channel) / N, descending.
    Strength,
    /// First come, first served (symbol order).
    Arrival,
}

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub risk_fraction: f64,
    pub enable_fast_system: bool,
    pub enable_slow_system: bool,
    pub allow_short: bool,
    pub enable_pyramiding: bool,
    pub max_pyramid_units: usize,
    pub stop_multiplier: f64,
    pub n_period: usize,
    pub limits: LimitConfig,
    pub commission_per_trade: f64,
    pub commission_per_contract: f64,
    pub slippage_ticks: f64,
    pub tick_size: f64,
    /// A new position's notional is capped at this fraction of sizing
    /// equity.
    pub max_notional_fraction: f64,
    pub ranking: SignalRanking,
    pub drawdown_threshold: f64,
    pub drawdown_reduction: f64,
    pub notional_floor_fraction: Option<f64>,
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            initial_capital: 100_000.0,
            risk_fraction: DEFAULT_RISK_FRACTION,
            enable_fast_system: true,
            enable_slow_system: true,
            allow_short: true,
            enable_pyramiding: true,
            max_pyramid_units: crate::domain::position::MAX_PYRAMID_LEVELS,
            stop_multiplier: DEFAULT_STOP_MULTIPLIER,
            n_period: DEFAULT_N_PERIOD,
            limits: LimitConfig::default(),
            commission_per_trade: 0.0,
            commission_per_contract: 0.0,
            slippage_ticks: 0.0,
            tick_size: 0.01,
            max_notional_fraction: 0.25,
            ranking: SignalRanking::Strength,
            drawdown_threshold: DEFAULT_DRAWDOWN_THRESHOLD,
            drawdown_reduction: DEFAULT_REDUCTION_FACTOR,
            notional_floor_fraction: None,
            risk_free_rate: 0.0,
        }
    }
}

/// Everything a run produces, as plain immutable records.
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
    pub metrics: Metrics,
    pub final_equity: f64,
}

pub struct BacktestEngine {
    config: BacktestConfig,
    symbols: Vec<SymbolData>,
    portfolio: Portfolio,
    tracker: NotionalEquityTracker,
    /// Previous day's N per symbol; feeds the incremental Wilder update.
    n_cache: HashMap<String, f64>,
    /// Last seen close per symbol, for marking gap days.
    last_close: HashMap<String, f64>,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig, mut symbols: Vec<SymbolData>) -> Self {
        // Deterministic iteration order regardless of input order.
        symbols.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        let portfolio = Portfolio::new(config.initial_capital);
        let tracker = NotionalEquityTracker::new(
            config.initial_capital,
            config.start_date,
            config.drawdown_threshold,
            config.drawdown_reduction,
            config.notional_floor_fraction,
        );
        BacktestEngine {
            config,
            symbols,
            portfolio,
            tracker,
            n_cache: HashMap::new(),
            last_close: HashMap::new(),
        }
    }

    pub fn run(mut self) -> BacktestResult {
        let timeline: Vec<NaiveDate> = build_unified_timeline(&self.symbols)
            .into_iter()
            .filter(|d| *d >= self.config.start_date && *d <= self.config.end_date)
            .collect();

        for &date in &timeline {
            self.refresh_volatility(date);
            self.manage_open_positions(date);
            self.open_new_positions(date);
            self.mark_to_market(date);
        }

        if let Some(&last_day) = timeline.last() {
            self.close_all_remaining(last_day);
        }

        let metrics = Metrics::compute(&self.portfolio, self.config.risk_free_rate);
        let final_equity = self
            .portfolio
            .equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.portfolio.initial_capital);

        BacktestResult {
            equity_curve: self.portfolio.equity_curve,
            trades: self.portfolio.closed_trades,
            metrics,
            final_equity,
        }
    }

    fn symbol_data(&self, symbol: &str) -> &SymbolData {
        let idx = self
            .symbols
            .binary_search_by(|sd| sd.symbol.as_str().cmp(symbol))
            .expect("engine invariant: positions only exist for known symbols");
        &self.symbols[idx]
    }

    /// Advance each symbol's N by one day where a bar exists. Symbols
    /// without enough history simply stay absent from the cache.
    fn refresh_volatility(&mut self, date: NaiveDate) {
        for sd in &self.symbols {
            if sd.bar_on(date).is_none() {
                continue;
            }
            let window = sd.bars_through(date);
            let prev = self.n_cache.get(&sd.symbol).copied();
            match calculate_n(window, self.config.n_period, prev) {
                Ok(n) => {
                    self.n_cache.insert(sd.symbol.clone(), n);
                }
                Err(_) => {
                    // Not enough bars yet; skip this symbol today.
                }
            }
        }
    }

    /// Stops, breakout exits, pyramid adds. Each position gets at most
    /// one action per day, and actions apply portfolio-wide in that
    /// phase order.
    fn manage_open_positions(&mut self, date: NaiveDate) {
        let mut actions: Vec<(String, PositionAction)> = Vec::new();

        let mut open_symbols: Vec<String> = self.portfolio.positions.keys().cloned().collect();
        open_symbols.sort();

        for symbol in open_symbols {
            let sd = self.symbol_data(&symbol);
            let Some(bar) = sd.bar_on(date) else {
                continue;
            };
            let Some(position) = self.portfolio.get_position(&symbol) else {
                continue;
            };

            let exit_period = match position.system {
                System::Fast => FAST_EXIT_PERIOD,
                System::Slow => SLOW_EXIT_PERIOD,
            };
            let exit_channel = channel::calculate_channel(sd.bars_before(date), exit_period).ok();

            let action = monitor::evaluate(
                position,
                bar,
                exit_channel.as_ref(),
                self.config.enable_pyramiding,
                self.config.max_pyramid_units,
            );
            if action != PositionAction::Hold {
                actions.push((symbol, action));
            }
        }

        // Phase order, not symbol order: every stop, then every breakout
        // exit, then pyramid adds, so a unit freed by a same-day exit is
        // available when the add is limit-checked.
        for (symbol, action) in &actions {
            if let PositionAction::ExitStop { price } = action {
                self.close_position(symbol, *price, date, ExitReason::StopLoss);
            }
        }
        for (symbol, action) in &actions {
            if let PositionAction::ExitBreakout { price } = action {
                self.close_position(symbol, *price, date, ExitReason::BreakoutExit);
            }
        }
        for (symbol, action) in &actions {
            if let PositionAction::AddUnit { price } = action {
                self.add_pyramid_unit(symbol, *price, date);
            }
        }
    }

    fn add_pyramid_unit(&mut self, symbol: &str, trigger_price: f64, date: NaiveDate) {
        let Some(&n) = self.n_cache.get(symbol) else {
            return;
        };
        let sd = self.symbol_data(symbol);
        let point_value = sd.point_value;
        let group = sd.correlation_group.clone();

        if limits::check_add(&self.portfolio, symbol, group.as_deref(), &self.config.limits)
            .is_err()
        {
            return;
        }

        let contracts = unit_size(
            self.tracker.sizing_equity(),
            n,
            point_value,
            self.config.risk_fraction,
        );
        if contracts < 1 {
            return;
        }

        let Some(position) = self.portfolio.get_position_mut(symbol) else {
            return;
        };
        let direction = position.direction;
        let fill = apply_slippage(
            trigger_price,
            direction,
            self.config.slippage_ticks,
            self.config.tick_size,
        );
        let level = PyramidLevel {
            level: position.unit_count() + 1,
            entry_price: fill,
            contracts,
            n_at_entry: n,
            entry_date: date,
        };
        if position
            .add_level(level, self.config.max_pyramid_units)
            .is_err()
        {
            return;
        }

        // One stop covers the whole position, re-anchored on this fill.
        position.stop_price = pyramid_stop(fill, n, direction, self.config.stop_multiplier);

        let commission =
            self.config.commission_per_trade + self.config.commission_per_contract * contracts as f64;
        self.portfolio.cash -= commission;
        if let Some(position) = self.portfolio.get_position_mut(symbol) {
            position.commission_paid += commission;
        }
    }

    /// Steps 4-5: detect, filter, rank, and open new entries.
    fn open_new_positions(&mut self, date: NaiveDate) {
        let mut candidates: Vec<Signal> = Vec::new();

        for sd in &self.symbols {
            if self.portfolio.has_position(&sd.symbol) {
                continue;
            }
            let Some(bar) = sd.bar_on(date) else {
                continue;
            };
            if !self.n_cache.contains_key(&sd.symbol) {
                continue;
            }

            let history = sd.bars_before(date);
            let fast = if self.config.enable_fast_system {
                channel::calculate_channel(history, FAST_ENTRY_PERIOD).ok()
            } else {
                None
            };
            let slow = if self.config.enable_slow_system {
                channel::calculate_channel(history, SLOW_ENTRY_PERIOD).ok()
            } else {
                None
            };

            for signal in detect_signals(bar, fast.as_ref(), slow.as_ref(), self.config.allow_short)
            {
                if passes_filter(&signal, &self.portfolio.closed_trades) {
                    candidates.push(signal);
                }
            }
        }

        if self.config.ranking == SignalRanking::Strength {
            let mut scored: Vec<(f64, Signal)> = candidates
                .into_iter()
                .map(|s| (self.breakout_strength(&s), s))
                .collect();
            scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
            candidates = scored.into_iter().map(|(_, s)| s).collect();
        }

        for signal in candidates {
            // State moves as positions open within the same pass, so the
            // limits are re-checked per candidate.
            self.try_open(&signal, date);
        }
    }

    fn breakout_strength(&self, signal: &Signal) -> f64 {
        let n = self.n_cache.get(&signal.symbol).copied().unwrap_or(0.0);
        if n <= 0.0 {
            return 0.0;
        }
        (signal.entry_price - signal.channel_value).abs() / n
    }

    fn try_open(&mut self, signal: &Signal, date: NaiveDate) {
        if self.portfolio.has_position(&signal.symbol) {
            return;
        }
        let Some(&n) = self.n_cache.get(&signal.symbol) else {
            return;
        };
        let sd = self.symbol_data(&signal.symbol);
        let point_value = sd.point_value;
        let group = sd.correlation_group.clone();

        if limits::check_add(
            &self.portfolio,
            &signal.symbol,
            group.as_deref(),
            &self.config.limits,
        )
        .is_err()
        {
            return;
        }

        let sizing_equity = self.tracker.sizing_equity();
        let mut contracts = unit_size(sizing_equity, n, point_value, self.config.risk_fraction);
        if contracts < 1 {
            return;
        }

        let fill = apply_slippage(
            signal.entry_price,
            signal.direction,
            self.config.slippage_ticks,
            self.config.tick_size,
        );

        // Cap the position's notional at a fraction of sizing equity.
        let notional_cap = self.config.max_notional_fraction * sizing_equity;
        let contract_notional = fill * point_value;
        if contract_notional > 0.0 {
            let max_contracts = (notional_cap / contract_notional).floor() as i64;
            contracts = contracts.min(max_contracts);
        }
        if contracts < 1 {
            return;
        }

        let stop = initial_stop(fill, n, signal.direction, self.config.stop_multiplier);
        let mut position = OpenPosition::new(
            signal.symbol.clone(),
            signal.direction,
            signal.system,
            group,
            PyramidLevel {
                level: 1,
                entry_price: fill,
                contracts,
                n_at_entry: n,
                entry_date: date,
            },
            stop,
        );

        let commission =
            self.config.commission_per_trade + self.config.commission_per_contract * contracts as f64;
        self.portfolio.cash -= commission;
        position.commission_paid = commission;
        self.portfolio.add_position(position);
    }

    fn close_position(&mut self, symbol: &str, price: f64, date: NaiveDate, reason: ExitReason) {
        let Some(position) = self.portfolio.remove_position(symbol) else {
            return;
        };
        let point_value = self.symbol_data(symbol).point_value;

        let contracts = position.total_contracts();
        let gross_pnl = position.unrealized_pnl(price, point_value);
        let exit_commission =
            self.config.commission_per_trade + self.config.commission_per_contract * contracts as f64;
        let commission = position.commission_paid + exit_commission;
        let net_pnl = gross_pnl - commission;

        self.portfolio.cash += gross_pnl - exit_commission;

        self.portfolio.record_trade(TradeRecord {
            symbol: position.symbol.clone(),
            direction: position.direction,
            system: position.system,
            contracts,
            unit_count: position.unit_count(),
            entry_price: position.avg_entry_price(),
            exit_price: price,
            entry_date: position.entry_date,
            exit_date: date,
            gross_pnl,
            commission,
            net_pnl,
            exit_reason: reason,
        });
    }

    /// Step 6: mark open positions at the close and append the day's
    /// equity point; the result feeds the notional equity tracker.
    fn mark_to_market(&mut self, date: NaiveDate) {
        for sd in &self.symbols {
            if let Some(bar) = sd.bar_on(date) {
                self.last_close.insert(sd.symbol.clone(), bar.close);
            }
        }

        let position_value: f64 = self
            .portfolio
            .positions
            .values()
            .filter_map(|pos| {
                let price = self.last_close.get(&pos.symbol)?;
                let point_value = self.symbol_data(&pos.symbol).point_value;
                Some(pos.unrealized_pnl(*price, point_value))
            })
            .sum();

        self.portfolio.record_equity(date, self.portfolio.cash, position_value);
        let equity = self.portfolio.cash + position_value;
        self.tracker.update(date, equity);
    }

    /// Force-close whatever is still open at the last available price.
    fn close_all_remaining(&mut self, last_day: NaiveDate) {
        let mut open_symbols: Vec<String> = self.portfolio.positions.keys().cloned().collect();
        open_symbols.sort();

        for symbol in open_symbols {
            let sd = self.symbol_data(&symbol);
            let (price, date) = match sd.bars_through(last_day).last() {
                Some(bar) => (bar.close, bar.date),
                None => continue,
            };
            self.close_position(&symbol, price, date, ExitReason::EndOfData);
        }

        // The final equity point reflects the forced exits.
        if let Some(last) = self.portfolio.equity_curve.last() {
            if last.date == last_day {
                self.portfolio.equity_curve.pop();
            }
        }
        self.portfolio.record_equity(last_day, self.portfolio.cash, 0.0);
        self.tracker.update(last_day, self.portfolio.cash);
    }
}

/// Adverse fill adjustment for market-style entries. Stops and channel
/// exits fill at the stop/boundary itself and bypass this.
fn apply_slippage(price: f64, direction: Direction, slippage_ticks: f64, tick_size: f64) -> f64 {
    price + direction.sign() * slippage_ticks * tick_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_coherent() {
        let c = BacktestConfig::default();
        assert!(c.start_date < c.end_date);
        assert!((c.risk_fraction - 0.005).abs() < f64::EPSILON);
        assert_eq!(c.n_period, 20);
        assert_eq!(c.max_pyramid_units, 4);
        assert!((c.stop_multiplier - 2.0).abs() < f64::EPSILON);
        assert!(c.enable_fast_system && c.enable_slow_system);
        assert!(c.notional_floor_fraction.is_none());
    }

    #[test]
    fn slippage_is_adverse_for_both_directions() {
        let long = apply_slippage(100.0, Direction::Long, 2.0, 0.25);
        assert!((long - 100.5).abs() < f64::EPSILON);
        let short = apply_slippage(100.0, Direction::Short, 2.0, 0.25);
        assert!((short - 99.5).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_slippage_leaves_price_untouched() {
        let price = apply_slippage(100.0, Direction::Long, 0.0, 0.01);
        assert!((price - 100.0).abs() < f64::EPSILON);
    }
}
