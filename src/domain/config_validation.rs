//! Configuration validation.
//!
//! Turns a raw [`ConfigPort`] into a validated [`BacktestConfig`] before
//! any simulation runs. Every field is range-checked here so the engine
//! can assume sane values.

use chrono::NaiveDate;

use crate::domain::backtest::{BacktestConfig, SignalRanking};
use crate::domain::error::TortugaError;
use crate::domain::limits::{LimitConfig, TotalLimitMode};
use crate::ports::config_port::ConfigPort;

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TortugaError {
    TortugaError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> TortugaError {
    TortugaError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

/// Build a fully validated engine configuration from raw config values.
pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, TortugaError> {
    let defaults = BacktestConfig::default();

    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;
    if start_date >= end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }

    let initial_capital = config.get_double("backtest", "initial_capital", defaults.initial_capital);
    if initial_capital <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }

    let commission_per_trade =
        config.get_double("backtest", "commission_per_trade", defaults.commission_per_trade);
    if commission_per_trade < 0.0 {
        return Err(invalid(
            "backtest",
            "commission_per_trade",
            "commission_per_trade must be non-negative",
        ));
    }
    let commission_per_contract = config.get_double(
        "backtest",
        "commission_per_contract",
        defaults.commission_per_contract,
    );
    if commission_per_contract < 0.0 {
        return Err(invalid(
            "backtest",
            "commission_per_contract",
            "commission_per_contract must be non-negative",
        ));
    }

    let slippage_ticks = config.get_double("backtest", "slippage_ticks", defaults.slippage_ticks);
    if slippage_ticks < 0.0 {
        return Err(invalid(
            "backtest",
            "slippage_ticks",
            "slippage_ticks must be non-negative",
        ));
    }
    let tick_size = config.get_double("backtest", "tick_size", defaults.tick_size);
    if tick_size <= 0.0 {
        return Err(invalid("backtest", "tick_size", "tick_size must be positive"));
    }

    let risk_free_rate = config.get_double("backtest", "risk_free_rate", defaults.risk_free_rate);
    if !(0.0..1.0).contains(&risk_free_rate) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }

    let risk_fraction = config.get_double("strategy", "risk_fraction", defaults.risk_fraction);
    if risk_fraction <= 0.0 || risk_fraction > 0.1 {
        return Err(invalid(
            "strategy",
            "risk_fraction",
            "risk_fraction must be in (0, 0.1]",
        ));
    }

    let stop_multiplier = config.get_double("strategy", "stop_multiplier", defaults.stop_multiplier);
    if stop_multiplier <= 0.0 {
        return Err(invalid(
            "strategy",
            "stop_multiplier",
            "stop_multiplier must be positive",
        ));
    }

    let n_period = config.get_int("strategy", "n_period", defaults.n_period as i64);
    if n_period < 2 {
        return Err(invalid("strategy", "n_period", "n_period must be at least 2"));
    }

    let max_pyramid_units =
        config.get_int("strategy", "max_pyramid_units", defaults.max_pyramid_units as i64);
    if !(1..=crate::domain::position::MAX_PYRAMID_LEVELS as i64).contains(&max_pyramid_units) {
        return Err(invalid(
            "strategy",
            "max_pyramid_units",
            "max_pyramid_units must be between 1 and 4",
        ));
    }

    let ranking = match config
        .get_string("strategy", "ranking")
        .unwrap_or_else(|| "strength".to_string())
        .to_lowercase()
        .as_str()
    {
        "strength" => SignalRanking::Strength,
        "arrival" => SignalRanking::Arrival,
        other => {
            return Err(invalid(
                "strategy",
                "ranking",
                format!("unknown ranking '{}', expected strength or arrival", other),
            ))
        }
    };

    let max_notional_fraction = config.get_double(
        "strategy",
        "max_notional_fraction",
        defaults.max_notional_fraction,
    );
    if max_notional_fraction <= 0.0 || max_notional_fraction > 1.0 {
        return Err(invalid(
            "strategy",
            "max_notional_fraction",
            "max_notional_fraction must be in (0, 1]",
        ));
    }

    let limits = load_limit_config(config, risk_fraction)?;
    let (drawdown_threshold, drawdown_reduction, notional_floor_fraction) =
        load_drawdown_config(config)?;

    Ok(BacktestConfig {
        start_date,
        end_date,
        initial_capital,
        risk_fraction,
        enable_fast_system: config.get_bool("strategy", "enable_fast_system", true),
        enable_slow_system: config.get_bool("strategy", "enable_slow_system", true),
        allow_short: config.get_bool("strategy", "allow_short", true),
        enable_pyramiding: config.get_bool("strategy", "enable_pyramiding", true),
        max_pyramid_units: max_pyramid_units as usize,
        stop_multiplier,
        n_period: n_period as usize,
        limits,
        commission_per_trade,
        commission_per_contract,
        slippage_ticks,
        tick_size,
        max_notional_fraction,
        ranking,
        drawdown_threshold,
        drawdown_reduction,
        notional_floor_fraction,
        risk_free_rate,
    })
}

fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<NaiveDate, TortugaError> {
    match config.get_string("backtest", key) {
        None => Err(missing("backtest", key)),
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| {
            invalid(
                "backtest",
                key,
                format!("invalid {} format, expected YYYY-MM-DD", key),
            )
        }),
    }
}

fn load_limit_config(
    config: &dyn ConfigPort,
    risk_fraction: f64,
) -> Result<LimitConfig, TortugaError> {
    let defaults = LimitConfig::default();

    let total_mode = match config
        .get_string("limits", "total_mode")
        .unwrap_or_else(|| "units".to_string())
        .to_lowercase()
        .as_str()
    {
        "units" => TotalLimitMode::UnitCount,
        "risk" => TotalLimitMode::RiskCap,
        other => {
            return Err(invalid(
                "limits",
                "total_mode",
                format!("unknown total_mode '{}', expected units or risk", other),
            ))
        }
    };

    let max_total_units = config.get_int("limits", "max_total_units", defaults.max_total_units as i64);
    if max_total_units < 1 {
        return Err(invalid(
            "limits",
            "max_total_units",
            "max_total_units must be at least 1",
        ));
    }

    let max_total_risk_fraction = config.get_double(
        "limits",
        "max_total_risk_fraction",
        defaults.max_total_risk_fraction,
    );
    if max_total_risk_fraction <= 0.0 || max_total_risk_fraction > 1.0 {
        return Err(invalid(
            "limits",
            "max_total_risk_fraction",
            "max_total_risk_fraction must be in (0, 1]",
        ));
    }

    let max_group_units = config.get_int("limits", "max_group_units", defaults.max_group_units as i64);
    if max_group_units < 1 {
        return Err(invalid(
            "limits",
            "max_group_units",
            "max_group_units must be at least 1",
        ));
    }

    let max_market_units =
        config.get_int("limits", "max_market_units", defaults.max_market_units as i64);
    if max_market_units < 1 {
        return Err(invalid(
            "limits",
            "max_market_units",
            "max_market_units must be at least 1",
        ));
    }

    Ok(LimitConfig {
        total_mode,
        max_total_units: max_total_units as usize,
        max_total_risk_fraction,
        risk_per_unit: risk_fraction,
        max_group_units: max_group_units as usize,
        max_market_units: max_market_units as usize,
        correlation_limits: config.get_bool("limits", "correlation_limits", true),
    })
}

fn load_drawdown_config(config: &dyn ConfigPort) -> Result<(f64, f64, Option<f64>), TortugaError> {
    let defaults = BacktestConfig::default();

    let threshold = config.get_double("drawdown", "threshold", defaults.drawdown_threshold);
    if threshold <= 0.0 || threshold >= 1.0 {
        return Err(invalid(
            "drawdown",
            "threshold",
            "threshold must be between 0 and 1",
        ));
    }

    let reduction_factor =
        config.get_double("drawdown", "reduction_factor", defaults.drawdown_reduction);
    if reduction_factor <= 0.0 || reduction_factor >= 1.0 {
        return Err(invalid(
            "drawdown",
            "reduction_factor",
            "reduction_factor must be between 0 and 1",
        ));
    }

    let floor = config.get_double("drawdown", "floor_fraction", -1.0);
    let floor_fraction = if floor < 0.0 {
        None
    } else if floor > 0.0 && floor < 1.0 {
        Some(floor)
    } else {
        return Err(invalid(
            "drawdown",
            "floor_fraction",
            "floor_fraction must be between 0 and 1",
        ));
    };

    Ok((threshold, reduction_factor, floor_fraction))
}

/// The configured symbol list (comma-separated `symbols` key).
pub fn configured_symbols(config: &dyn ConfigPort) -> Result<String, TortugaError> {
    match config.get_string("backtest", "symbols") {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(missing("backtest", "symbols")),
    }
}

/// Dollar value of one point for `symbol`, from the `[points]` section.
pub fn symbol_point_value(config: &dyn ConfigPort, symbol: &str) -> Result<f64, TortugaError> {
    let default = config.get_double("points", "default", 1.0);
    let value = config.get_double("points", &symbol.to_lowercase(), default);
    if value <= 0.0 {
        return Err(invalid(
            "points",
            symbol,
            "point value must be positive",
        ));
    }
    Ok(value)
}

/// Correlation group tag for `symbol`, from the `[groups]` section.
pub fn symbol_group(config: &dyn ConfigPort, symbol: &str) -> Option<String> {
    config
        .get_string("groups", &symbol.to_lowercase())
        .filter(|s| !s.trim().is_empty())
}
