//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestEngine, BacktestResult};
use crate::domain::config_validation::{
    configured_symbols, load_backtest_config, symbol_group, symbol_point_value,
};
use crate::domain::error::TortugaError;
use crate::domain::market_data::SymbolData;
use crate::domain::universe::{parse_symbols, validate_universe, MIN_BARS};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

/// Calendar days fetched before the start date so indicators are warm on
/// day one. Generous: 56 trading days fit comfortably in 120 calendar
/// days.
const WARMUP_CALENDAR_DAYS: i64 = 120;

#[derive(Parser, Debug)]
#[command(name = "tortuga", about = "Turtle trading rules backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Override the data directory from config
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Override the configured symbol list
        #[arg(long)]
        symbols: Option<String>,
        /// Write the trade ledger to a CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write the daily equity curve to a CSV file
        #[arg(long)]
        equity: Option<PathBuf>,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
    /// Show data range for configured symbols
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbols: Option<String>,
    },
    /// Validate a configuration file without running
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            symbols,
            output,
            equity,
        } => run_backtest(
            &config,
            data.as_ref(),
            symbols.as_deref(),
            output.as_ref(),
            equity.as_ref(),
        ),
        Command::ListSymbols { config, data } => run_list_symbols(config.as_ref(), data.as_ref()),
        Command::Info { config, symbols } => run_info(&config, symbols.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = TortugaError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn resolve_data_dir(data_override: Option<&PathBuf>, config: &dyn ConfigPort) -> Option<PathBuf> {
    data_override
        .cloned()
        .or_else(|| config.get_string("data", "path").map(PathBuf::from))
}

fn resolve_symbols(
    symbols_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, ExitCode> {
    let raw = match symbols_override {
        Some(s) => s.to_string(),
        None => match configured_symbols(config) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return Err((&e).into());
            }
        },
    };
    parse_symbols(&raw).map_err(|e| {
        eprintln!("error: failed to parse symbols: {e}");
        ExitCode::from(2)
    })
}

fn run_backtest(
    config_path: &PathBuf,
    data_override: Option<&PathBuf>,
    symbols_override: Option<&str>,
    output_path: Option<&PathBuf>,
    equity_path: Option<&PathBuf>,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let bt_config = match load_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 2: Resolve symbols and data directory
    let symbols = match resolve_symbols(symbols_override, &adapter) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let data_dir = match resolve_data_dir(data_override, &adapter) {
        Some(d) => d,
        None => {
            eprintln!("error: no data directory (use --data or set [data] path)");
            return ExitCode::from(2);
        }
    };
    let data_port = CsvAdapter::new(data_dir);

    // Stage 3: Validate universe over the warmed-up range
    let fetch_start = bt_config.start_date - chrono::Duration::days(WARMUP_CALENDAR_DAYS);
    eprintln!("Validating {} symbols...", symbols.len());
    let validation =
        match validate_universe(&data_port, symbols, fetch_start, bt_config.end_date) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

    // Stage 4: Fetch bars and attach per-symbol metadata
    let symbol_data = match build_symbol_data(
        &data_port,
        &adapter,
        &validation.universe.symbols,
        fetch_start,
        bt_config.end_date,
    ) {
        Ok(sd) => sd,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if symbol_data.is_empty() {
        eprintln!("error: no valid symbols with data to backtest");
        return ExitCode::from(5);
    }

    // Stage 5: Run the simulation
    eprintln!(
        "Running backtest: {} symbols, {} to {}",
        symbol_data.len(),
        bt_config.start_date,
        bt_config.end_date,
    );
    let result = BacktestEngine::new(bt_config.clone(), symbol_data).run();

    // Stage 6: Console summary
    print_summary(&bt_config, &result);

    // Stage 7: Optional CSV exports
    if let Some(path) = output_path {
        if let Err(e) = write_trades_csv(path, &result) {
            eprintln!("error: failed to write trades: {e}");
            return ExitCode::from(1);
        }
        eprintln!("Trades written to: {}", path.display());
    }
    if let Some(path) = equity_path {
        if let Err(e) = write_equity_csv(path, &result) {
            eprintln!("error: failed to write equity curve: {e}");
            return ExitCode::from(1);
        }
        eprintln!("Equity curve written to: {}", path.display());
    }

    ExitCode::SUCCESS
}

fn build_symbol_data(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    symbols: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Vec<SymbolData>, TortugaError> {
    let mut out = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let bars = match data_port.fetch_bars(symbol, start_date, end_date) {
            Ok(bars) => bars,
            Err(e) => {
                eprintln!("warning: skipping {} ({})", symbol, e);
                continue;
            }
        };
        let point_value = symbol_point_value(config, symbol)?;
        let group = symbol_group(config, symbol);
        out.push(SymbolData::new(symbol.clone(), bars, point_value, group));
    }
    Ok(out)
}

fn print_summary(config: &BacktestConfig, result: &BacktestResult) {
    let m = &result.metrics;
    eprintln!("\n=== Results ===");
    eprintln!(
        "Final Equity:     ${:.2} (from ${:.2})",
        result.final_equity, config.initial_capital
    );
    eprintln!("Total Return:     {:.2}%", m.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", m.annualized_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", m.sortino_ratio);
    eprintln!("Calmar Ratio:     {:.2}", m.calmar_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", m.max_drawdown * 100.0);
    eprintln!("Exposure:         {:.1}%", m.exposure * 100.0);
    eprintln!(
        "Trades:           {} ({} won / {} lost / {} flat)",
        result.trades.len(),
        m.trades_won,
        m.trades_lost,
        m.trades_breakeven
    );
    eprintln!("Win Rate:         {:.1}%", m.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", m.profit_factor);
    eprintln!("Expectancy:       ${:.2}", m.expectancy);
    eprintln!("Commission Paid:  ${:.2}", m.total_commission);
}

fn write_trades_csv(path: &PathBuf, result: &BacktestResult) -> Result<(), TortugaError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| TortugaError::Data {
        reason: format!("failed to open {}: {}", path.display(), e),
    })?;
    wtr.write_record([
        "symbol",
        "direction",
        "system",
        "contracts",
        "units",
        "entry_date",
        "entry_price",
        "exit_date",
        "exit_price",
        "gross_pnl",
        "commission",
        "net_pnl",
        "exit_reason",
    ])
    .map_err(csv_error)?;

    for trade in &result.trades {
        wtr.write_record([
            trade.symbol.clone(),
            trade.direction.to_string(),
            trade.system.to_string(),
            trade.contracts.to_string(),
            trade.unit_count.to_string(),
            trade.entry_date.to_string(),
            format!("{:.4}", trade.entry_price),
            trade.exit_date.to_string(),
            format!("{:.4}", trade.exit_price),
            format!("{:.2}", trade.gross_pnl),
            format!("{:.2}", trade.commission),
            format!("{:.2}", trade.net_pnl),
            trade.exit_reason.to_string(),
        ])
        .map_err(csv_error)?;
    }

    wtr.flush().map_err(|e| TortugaError::Data {
        reason: format!("failed to flush {}: {}", path.display(), e),
    })
}

fn write_equity_csv(path: &PathBuf, result: &BacktestResult) -> Result<(), TortugaError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| TortugaError::Data {
        reason: format!("failed to open {}: {}", path.display(), e),
    })?;
    wtr.write_record([
        "date",
        "equity",
        "cash",
        "position_value",
        "drawdown_pct",
        "open_positions",
    ])
    .map_err(csv_error)?;

    for point in &result.equity_curve {
        wtr.write_record([
            point.date.to_string(),
            format!("{:.2}", point.equity),
            format!("{:.2}", point.cash),
            format!("{:.2}", point.position_value),
            format!("{:.4}", point.drawdown_pct),
            point.open_positions.to_string(),
        ])
        .map_err(csv_error)?;
    }

    wtr.flush().map_err(|e| TortugaError::Data {
        reason: format!("failed to flush {}: {}", path.display(), e),
    })
}

fn csv_error(e: csv::Error) -> TortugaError {
    TortugaError::Data {
        reason: format!("CSV write error: {}", e),
    }
}

fn run_list_symbols(config_path: Option<&PathBuf>, data_override: Option<&PathBuf>) -> ExitCode {
    let data_dir = match data_override {
        Some(d) => d.clone(),
        None => {
            let config_path = match config_path {
                Some(p) => p,
                None => {
                    eprintln!("error: --config or --data is required for list-symbols");
                    return ExitCode::from(1);
                }
            };
            let config = match load_config(config_path) {
                Ok(c) => c,
                Err(code) => return code,
            };
            match resolve_data_dir(None, &config) {
                Some(d) => d,
                None => {
                    eprintln!("error: no data directory configured");
                    return ExitCode::from(2);
                }
            }
        }
    };

    let adapter = CsvAdapter::new(data_dir);
    let symbols = match adapter.list_symbols() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if symbols.is_empty() {
        eprintln!("No symbols found");
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}

fn run_info(config_path: &PathBuf, symbols_override: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let symbols = match resolve_symbols(symbols_override, &config) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let data_dir = match resolve_data_dir(None, &config) {
        Some(d) => d,
        None => {
            eprintln!("error: no data directory configured");
            return ExitCode::from(2);
        }
    };
    let adapter = CsvAdapter::new(data_dir);

    for symbol in &symbols {
        match adapter.data_range(symbol) {
            Ok(Some((min_date, max_date, count))) => {
                let note = if count < MIN_BARS {
                    format!(" (below the {} bar minimum)", MIN_BARS)
                } else {
                    String::new()
                };
                println!("{}: {} bars, {} to {}{}", symbol, count, min_date, max_date, note);
            }
            Ok(None) => {
                eprintln!("{}: no data found", symbol);
            }
            Err(e) => {
                eprintln!("error querying {}: {}", symbol, e);
            }
        }
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let bt_config = match load_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let symbols = match resolve_symbols(None, &adapter) {
        Ok(s) => s,
        Err(code) => return code,
    };

    for symbol in &symbols {
        match symbol_point_value(&adapter, symbol) {
            Ok(pv) => {
                let group = symbol_group(&adapter, symbol).unwrap_or_else(|| "-".to_string());
                eprintln!("  {}: point value {}, group {}", symbol, pv, group);
            }
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    }

    eprintln!(
        "Config is valid: {} symbols, {} to {}",
        symbols.len(),
        bt_config.start_date,
        bt_config.end_date
    );
    ExitCode::SUCCESS
}
