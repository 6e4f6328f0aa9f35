//! Domain error types.

/// Top-level error type for tortuga.
#[derive(Debug, thiserror::Error)]
pub enum TortugaError {
    /// Not enough bars to compute an indicator. The simulation loop treats
    /// this as "skip this symbol today", never as fatal.
    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    /// A caller tried to add a pyramid level past the cap. Indicates a
    /// caller invariant violation.
    #[error("{symbol} already holds the maximum of {max} pyramid levels")]
    MaxPyramidLevels { symbol: String, max: usize },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config value [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TortugaError> for std::process::ExitCode {
    fn from(err: &TortugaError) -> Self {
        let code: u8 = match err {
            TortugaError::Io(_) => 1,
            TortugaError::ConfigParse { .. }
            | TortugaError::ConfigMissing { .. }
            | TortugaError::ConfigInvalid { .. } => 2,
            TortugaError::Data { .. } => 3,
            TortugaError::MaxPyramidLevels { .. } => 4,
            TortugaError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_message() {
        let err = TortugaError::InsufficientData {
            symbol: "GC".into(),
            bars: 10,
            minimum: 21,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for GC: have 10 bars, need 21"
        );
    }

    #[test]
    fn max_pyramid_message() {
        let err = TortugaError::MaxPyramidLevels {
            symbol: "CL".into(),
            max: 4,
        };
        assert_eq!(
            err.to_string(),
            "CL already holds the maximum of 4 pyramid levels"
        );
    }

    #[test]
    fn exit_codes_are_stable() {
        let insufficient = TortugaError::InsufficientData {
            symbol: "GC".into(),
            bars: 0,
            minimum: 21,
        };
        let invalid = TortugaError::ConfigInvalid {
            section: "backtest".into(),
            key: "risk_fraction".into(),
            reason: "must be positive".into(),
        };
        // Just exercise the conversion; exact values matter to scripts.
        let _: std::process::ExitCode = (&insufficient).into();
        let _: std::process::ExitCode = (&invalid).into();
    }
}
