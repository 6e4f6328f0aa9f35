//! Symbol universe parsing and data validation.
//!
//! Parses the configured symbol list and drops symbols that cannot
//! support the strategy's longest lookback before the engine ever sees
//! them.

use chrono::NaiveDate;
use std::collections::HashSet;

use crate::domain::channel::SLOW_ENTRY_PERIOD;
use crate::domain::error::TortugaError;
use crate::ports::data_port::DataPort;

/// Longest warm-up any indicator needs: the 55-bar slow entry channel
/// plus one bar for the Wilder seed.
pub const MIN_BARS: usize = SLOW_ENTRY_PERIOD + 1;

#[derive(Debug, Clone)]
pub struct Universe {
    pub symbols: Vec<String>,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.symbols.len()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

/// Parse a comma-separated symbol list. Symbols are upper-cased,
/// whitespace-trimmed, and must be unique.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if seen.contains(&symbol) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        seen.insert(symbol.clone());
        symbols.push(symbol);
    }

    Ok(symbols)
}

pub struct UniverseValidationResult {
    pub universe: Universe,
    pub skipped: Vec<SkippedSymbol>,
}

#[derive(Debug, Clone)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub enum SkipReason {
    NoData,
    InsufficientBars { bars: usize },
}

/// Check each symbol has enough history in the requested range. Symbols
/// that fail are skipped with a warning; the run only aborts when none
/// survive.
pub fn validate_universe(
    data_port: &dyn DataPort,
    symbols: Vec<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<UniverseValidationResult, TortugaError> {
    let mut valid = Vec::new();
    let mut skipped = Vec::new();

    for symbol in symbols {
        let bars = match data_port.fetch_bars(&symbol, start_date, end_date) {
            Ok(bars) => bars,
            Err(e) => {
                eprintln!("Warning: skipping {} ({})", symbol, e);
                skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: SkipReason::NoData,
                });
                continue;
            }
        };

        if bars.is_empty() {
            eprintln!("Warning: skipping {} (no data found)", symbol);
            skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: SkipReason::NoData,
            });
            continue;
        }

        if bars.len() < MIN_BARS {
            eprintln!(
                "Warning: skipping {} (only {} bars, minimum {} required)",
                symbol,
                bars.len(),
                MIN_BARS
            );
            skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: SkipReason::InsufficientBars { bars: bars.len() },
            });
            continue;
        }

        valid.push(symbol);
    }

    if valid.is_empty() {
        return Err(TortugaError::InsufficientData {
            symbol: "all".to_string(),
            bars: 0,
            minimum: MIN_BARS,
        });
    }

    if !skipped.is_empty() {
        eprintln!(
            "Backtesting {} of {} symbols",
            valid.len(),
            valid.len() + skipped.len()
        );
    }

    Ok(UniverseValidationResult {
        universe: Universe { symbols: valid },
        skipped,
    })
}
