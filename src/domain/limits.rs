//! Pre-add limit enforcement.
//!
//! Checks run in a fixed order — total exposure, then correlated group,
//! then per-market — so the breach reported when several limits would
//! trip simultaneously is always the same. Boundary values (landing
//! exactly at a cap) are allowed; one unit past the cap is rejected.

use crate::domain::portfolio::Portfolio;

pub const DEFAULT_MAX_MARKET_UNITS: usize = 4;
pub const DEFAULT_MAX_GROUP_UNITS: usize = 6;
pub const DEFAULT_MAX_TOTAL_UNITS: usize = 12;
pub const DEFAULT_MAX_TOTAL_RISK_FRACTION: f64 = 0.20;

/// How total exposure is capped. Selected by configuration, never
/// auto-detected; the two modes are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalLimitMode {
    /// Classic: total units across the portfolio.
    UnitCount,
    /// Modern: total units x risk-per-unit as a fraction of equity.
    RiskCap,
}

#[derive(Debug, Clone)]
pub struct LimitConfig {
    pub total_mode: TotalLimitMode,
    pub max_total_units: usize,
    pub max_total_risk_fraction: f64,
    /// Risk fraction one unit represents (the sizing risk fraction).
    pub risk_per_unit: f64,
    pub max_group_units: usize,
    pub max_market_units: usize,
    pub correlation_limits: bool,
}

impl Default for LimitConfig {
    fn default() -> Self {
        LimitConfig {
            total_mode: TotalLimitMode::UnitCount,
            max_total_units: DEFAULT_MAX_TOTAL_UNITS,
            max_total_risk_fraction: DEFAULT_MAX_TOTAL_RISK_FRACTION,
            risk_per_unit: crate::domain::sizing::DEFAULT_RISK_FRACTION,
            max_group_units: DEFAULT_MAX_GROUP_UNITS,
            max_market_units: DEFAULT_MAX_MARKET_UNITS,
            correlation_limits: true,
        }
    }
}

/// The first limit a requested add would breach.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LimitBreach {
    #[error("total unit cap reached ({limit} units)")]
    TotalUnits { limit: usize },

    #[error("total risk cap reached ({:.1}% of equity)", .limit * 100.0)]
    TotalRisk { limit: f64 },

    #[error("correlated group {group} at cap ({limit} units)")]
    CorrelatedGroup { group: String, limit: usize },

    #[error("market {symbol} at cap ({limit} units)")]
    PerMarket { symbol: String, limit: usize },
}

/// Would adding one unit of `symbol` breach a limit? Checked in the
/// documented order: total, correlated group, per-market.
pub fn check_add(
    portfolio: &Portfolio,
    symbol: &str,
    correlation_group: Option<&str>,
    config: &LimitConfig,
) -> Result<(), LimitBreach> {
    let projected_total = portfolio.total_units() + 1;
    match config.total_mode {
        TotalLimitMode::UnitCount => {
            if projected_total > config.max_total_units {
                return Err(LimitBreach::TotalUnits {
                    limit: config.max_total_units,
                });
            }
        }
        TotalLimitMode::RiskCap => {
            let projected_risk = projected_total as f64 * config.risk_per_unit;
            if projected_risk > config.max_total_risk_fraction + 1e-12 {
                return Err(LimitBreach::TotalRisk {
                    limit: config.max_total_risk_fraction,
                });
            }
        }
    }

    if config.correlation_limits {
        if let Some(group) = correlation_group {
            if portfolio.units_in_group(group) + 1 > config.max_group_units {
                return Err(LimitBreach::CorrelatedGroup {
                    group: group.to_string(),
                    limit: config.max_group_units,
                });
            }
        }
    }

    if portfolio.units_for_symbol(symbol) + 1 > config.max_market_units {
        return Err(LimitBreach::PerMarket {
            symbol: symbol.to_string(),
            limit: config.max_market_units,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{OpenPosition, PyramidLevel};
    use crate::domain::signal::{Direction, System};
    use chrono::NaiveDate;

    fn position_with_units(symbol: &str, units: usize, group: Option<&str>) -> OpenPosition {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut pos = OpenPosition::new(
            symbol.to_string(),
            Direction::Long,
            System::Fast,
            group.map(String::from),
            PyramidLevel {
                level: 1,
                entry_price: 100.0,
                contracts: 1,
                n_at_entry: 2.0,
                entry_date: date,
            },
            96.0,
        );
        for i in 2..=units {
            pos.add_level(
                PyramidLevel {
                    level: i,
                    entry_price: 100.0 + i as f64,
                    contracts: 1,
                    n_at_entry: 2.0,
                    entry_date: date,
                },
                4,
            )
            .unwrap();
        }
        pos
    }

    fn portfolio_with(positions: Vec<OpenPosition>) -> Portfolio {
        let mut portfolio = Portfolio::new(100_000.0);
        for pos in positions {
            portfolio.add_position(pos);
        }
        portfolio
    }

    #[test]
    fn empty_portfolio_accepts() {
        let portfolio = Portfolio::new(100_000.0);
        let config = LimitConfig::default();
        assert!(check_add(&portfolio, "GC", Some("metals"), &config).is_ok());
    }

    #[test]
    fn per_market_boundary() {
        let config = LimitConfig::default();

        // 3 units held: the 4th lands exactly at the cap and is allowed.
        let portfolio = portfolio_with(vec![position_with_units("GC", 3, None)]);
        assert!(check_add(&portfolio, "GC", None, &config).is_ok());

        // 4 units held: a 5th is one past the cap.
        let portfolio = portfolio_with(vec![position_with_units("GC", 4, None)]);
        assert_eq!(
            check_add(&portfolio, "GC", None, &config),
            Err(LimitBreach::PerMarket {
                symbol: "GC".into(),
                limit: 4
            })
        );
    }

    #[test]
    fn correlated_group_boundary() {
        let config = LimitConfig::default();

        let portfolio = portfolio_with(vec![
            position_with_units("GC", 3, Some("metals")),
            position_with_units("SI", 2, Some("metals")),
        ]);
        // 5 in group: the 6th is exactly at cap.
        assert!(check_add(&portfolio, "HG", Some("metals"), &config).is_ok());

        let portfolio = portfolio_with(vec![
            position_with_units("GC", 4, Some("metals")),
            position_with_units("SI", 2, Some("metals")),
        ]);
        assert_eq!(
            check_add(&portfolio, "HG", Some("metals"), &config),
            Err(LimitBreach::CorrelatedGroup {
                group: "metals".into(),
                limit: 6
            })
        );
    }

    #[test]
    fn group_limit_skipped_without_tag() {
        let config = LimitConfig::default();
        let portfolio = portfolio_with(vec![
            position_with_units("GC", 4, Some("metals")),
            position_with_units("SI", 2, Some("metals")),
        ]);
        // Untagged symbol bypasses the group check entirely.
        assert!(check_add(&portfolio, "ZC", None, &config).is_ok());
    }

    #[test]
    fn group_limit_disabled_by_config() {
        let config = LimitConfig {
            correlation_limits: false,
            ..LimitConfig::default()
        };
        let portfolio = portfolio_with(vec![
            position_with_units("GC", 4, Some("metals")),
            position_with_units("SI", 2, Some("metals")),
        ]);
        assert!(check_add(&portfolio, "HG", Some("metals"), &config).is_ok());
    }

    #[test]
    fn total_unit_boundary() {
        let config = LimitConfig {
            max_total_units: 6,
            ..LimitConfig::default()
        };

        let portfolio = portfolio_with(vec![
            position_with_units("GC", 3, None),
            position_with_units("CL", 2, None),
        ]);
        assert!(check_add(&portfolio, "ZC", None, &config).is_ok());

        let portfolio = portfolio_with(vec![
            position_with_units("GC", 4, None),
            position_with_units("CL", 2, None),
        ]);
        assert_eq!(
            check_add(&portfolio, "ZC", None, &config),
            Err(LimitBreach::TotalUnits { limit: 6 })
        );
    }

    #[test]
    fn risk_cap_mode_boundary() {
        let config = LimitConfig {
            total_mode: TotalLimitMode::RiskCap,
            max_total_risk_fraction: 0.02,
            risk_per_unit: 0.005,
            ..LimitConfig::default()
        };

        // 3 units at 0.5% each: a 4th is exactly 2% — allowed.
        let portfolio = portfolio_with(vec![position_with_units("GC", 3, None)]);
        assert!(check_add(&portfolio, "CL", None, &config).is_ok());

        // 4 units held: a 5th would be 2.5%.
        let portfolio = portfolio_with(vec![position_with_units("GC", 4, None)]);
        assert_eq!(
            check_add(&portfolio, "CL", None, &config),
            Err(LimitBreach::TotalRisk { limit: 0.02 })
        );
    }

    #[test]
    fn total_checked_before_group_and_market() {
        // Everything over cap at once: the total breach wins.
        let config = LimitConfig {
            max_total_units: 4,
            ..LimitConfig::default()
        };
        let portfolio = portfolio_with(vec![position_with_units("GC", 4, Some("metals"))]);
        assert_eq!(
            check_add(&portfolio, "GC", Some("metals"), &config),
            Err(LimitBreach::TotalUnits { limit: 4 })
        );
    }

    #[test]
    fn group_checked_before_market() {
        let config = LimitConfig {
            max_group_units: 4,
            ..LimitConfig::default()
        };
        let portfolio = portfolio_with(vec![position_with_units("GC", 4, Some("metals"))]);
        assert_eq!(
            check_add(&portfolio, "GC", Some("metals"), &config),
            Err(LimitBreach::CorrelatedGroup {
                group: "metals".into(),
                limit: 4
            })
        );
    }
}
