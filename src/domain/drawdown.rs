//! Drawdown-driven notional equity tracking.
//!
//! Sizing consumes a risk-reduced "notional" equity, never the actual
//! account equity. Drawdown is measured against the yearly starting
//! equity; every full threshold of drawdown cuts notional equity by the
//! reduction factor, cascading multiplicatively. Recovery to the yearly
//! start resets notional to actual and the reduction level to zero.

use chrono::{Datelike, NaiveDate};

pub const DEFAULT_DRAWDOWN_THRESHOLD: f64 = 0.10;
pub const DEFAULT_REDUCTION_FACTOR: f64 = 0.20;

#[derive(Debug, Clone)]
pub struct NotionalEquityTracker {
    yearly_start_equity: f64,
    actual_equity: f64,
    notional_equity: f64,
    reduction_level: u32,
    threshold: f64,
    reduction_factor: f64,
    /// Optional floor as a fraction of yearly start equity; keeps small
    /// accounts from spiralling into permanent zero-contract sizing.
    floor_fraction: Option<f64>,
    anchor_year: i32,
}

impl NotionalEquityTracker {
    pub fn new(
        initial_equity: f64,
        start_date: NaiveDate,
        threshold: f64,
        reduction_factor: f64,
        floor_fraction: Option<f64>,
    ) -> Self {
        NotionalEquityTracker {
            yearly_start_equity: initial_equity,
            actual_equity: initial_equity,
            notional_equity: initial_equity,
            reduction_level: 0,
            threshold,
            reduction_factor,
            floor_fraction,
            anchor_year: start_date.year(),
        }
    }

    /// The equity figure all position sizing consumes.
    pub fn sizing_equity(&self) -> f64 {
        self.notional_equity
    }

    pub fn actual_equity(&self) -> f64 {
        self.actual_equity
    }

    pub fn yearly_start_equity(&self) -> f64 {
        self.yearly_start_equity
    }

    pub fn reduction_level(&self) -> u32 {
        self.reduction_level
    }

    /// (yearly start - actual) / yearly start; negative when above the
    /// yearly start.
    pub fn drawdown_pct(&self) -> f64 {
        if self.yearly_start_equity <= 0.0 {
            return 0.0;
        }
        (self.yearly_start_equity - self.actual_equity) / self.yearly_start_equity
    }

    /// Re-anchor the yearly start to the current equity on demand.
    pub fn reset_yearly_start(&mut self, equity: f64) {
        self.yearly_start_equity = equity;
        self.apply_rules(equity);
    }

    /// Fold one day's closing equity into the tracker. The first
    /// observation of a new calendar year re-anchors the yearly start.
    pub fn update(&mut self, date: NaiveDate, equity: f64) {
        if date.year() != self.anchor_year {
            self.anchor_year = date.year();
            self.yearly_start_equity = equity;
        }
        self.apply_rules(equity);
    }

    fn apply_rules(&mut self, equity: f64) {
        self.actual_equity = equity;

        if equity >= self.yearly_start_equity || self.yearly_start_equity <= 0.0 {
            // Recovery is measured against the yearly start, not a
            // rolling high-water mark.
            self.notional_equity = equity;
            self.reduction_level = 0;
        } else {
            let level = (self.drawdown_pct() / self.threshold).floor() as u32;
            if level > self.reduction_level {
                self.reduction_level = level;
                self.notional_equity = self.yearly_start_equity
                    * (1.0 - self.reduction_factor).powi(level as i32);
            }
            // A level once raised is only lowered by the recovery rule.
        }

        if let Some(floor) = self.floor_fraction {
            let min_notional = floor * self.yearly_start_equity;
            if self.notional_equity < min_notional {
                self.notional_equity = min_notional;
            }
        }
    }
}
