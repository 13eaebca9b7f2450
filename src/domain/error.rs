//! Domain error types.

/// A parse error with position information for condition parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
    /// Set when the input named an indicator outside the supported set.
    pub unknown_indicator: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
            unknown_indicator: None,
        }
    }

    pub fn unknown_indicator(name: &str, position: usize) -> Self {
        Self {
            message: format!("unknown indicator '{}'", name),
            position,
            unknown_indicator: Some(name.to_string()),
        }
    }

    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for signalguard.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    ConditionParse(#[from] ParseError),

    #[error("candle feed error for {instrument}: {reason}")]
    CandleFeed { instrument: String, reason: String },

    #[error("order execution failed for {instrument}: {reason}")]
    Execution { instrument: String, reason: String },

    #[error("order execution for {instrument} timed out after {timeout_ms} ms")]
    ExecutionTimeout { instrument: String, timeout_ms: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SignalError {
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        SignalError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&SignalError> for std::process::ExitCode {
    fn from(err: &SignalError) -> Self {
        let code: u8 = match err {
            SignalError::Io(_) => 1,
            SignalError::ConfigParse { .. }
            | SignalError::ConfigMissing { .. }
            | SignalError::ConfigInvalid { .. } => 2,
            SignalError::CandleFeed { .. } => 3,
            SignalError::ConditionParse(_) => 4,
            SignalError::Execution { .. } | SignalError::ExecutionTimeout { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_context_points_at_position() {
        let err = ParseError::new("expected operator", 8);
        let rendered = err.display_with_context("RSI(14) ABOVEX 30");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "RSI(14) ABOVEX 30");
        assert_eq!(lines[1], "        ^");
        assert!(lines[2].contains("position 8"));
    }

    #[test]
    fn unknown_indicator_is_flagged() {
        let err = ParseError::unknown_indicator("FOO", 0);
        assert_eq!(err.unknown_indicator.as_deref(), Some("FOO"));
        assert!(err.to_string().contains("unknown indicator 'FOO'"));
    }

    #[test]
    fn config_invalid_message() {
        let err = SignalError::invalid("scorer", "min_score", "must be non-negative");
        assert_eq!(
            err.to_string(),
            "invalid config value [scorer] min_score: must be non-negative"
        );
    }

    #[test]
    fn execution_timeout_message() {
        let err = SignalError::ExecutionTimeout {
            instrument: "BTCUSDT".into(),
            timeout_ms: 1500,
        };
        assert_eq!(
            err.to_string(),
            "order execution for BTCUSDT timed out after 1500 ms"
        );
    }
}
