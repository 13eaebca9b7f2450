//! CLI integration tests.
//!
//! Tests cover:
//! - Config building (scorer, orchestrator, strategy, instruments)
//! - `validate`, `evaluate` and `run` against real INI and CSV files on disk

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Duration;
use signalguard::adapters::file_config_adapter::FileConfigAdapter;
use signalguard::cli;
use signalguard::domain::error::SignalError;
use signalguard::domain::indicator::crossover::MaKind;
use signalguard::domain::market::{Side, Timeframe};
use signalguard::domain::scorer::ScorerConfig;
use signalguard::domain::strategy::StrategyMode;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// `ExitCode` has no `PartialEq`; compare through its debug form.
fn assert_exit(code: ExitCode, expected: u8) {
    assert_eq!(format!("{:?}", code), format!("{:?}", ExitCode::from(expected)));
}

fn write_candles(dir: &Path, instrument: &str, closes: &[f64]) {
    let mut csv = String::from("timestamp,open,high,low,close,volume\n");
    for (i, close) in closes.iter().enumerate() {
        csv.push_str(&format!(
            "2024-01-01T{:02}:00:00Z,{},{},{},{},1000\n",
            i % 24,
            close,
            close + 1.0,
            close - 1.0,
            close
        ));
    }
    std::fs::write(dir.join(format!("{}_1h.csv", instrument)), csv).unwrap();
}

const AUTOMATIC_INI: &str = r#"
[feed]
data_dir = ./data
candle_count = 150

[orchestrator]
instruments = btcusd, ethusd
timeframe = 15m
order_size = 0.25
tick_interval_secs = 30
min_evaluation_interval_secs = 10
cooldown_ms = 5000
order_timeout_ms = 2500

[strategy]
name = Momentum
mode = automatic

[scorer]
macd_weight = 35
rsi_oversold = 20
ma_type = sma
ma_fast = 5
ma_slow = 13
min_separation = 12
min_candles = 40
"#;

fn declarative_ini(data_dir: &Path, conditions: &str) -> String {
    format!(
        "[feed]\ndata_dir = {}\n\
         [orchestrator]\ninstruments = ETHUSD\norder_size = 1\n\
         tick_interval_secs = 1\nmin_evaluation_interval_secs = 0\n\
         [strategy]\nname = Dip\nmode = declarative\ndirection = long\n\
         entry_conditions = {}\n",
        data_dir.display(),
        conditions
    )
}

mod config_building {
    use super::*;

    #[test]
    fn scorer_config_reads_overrides_and_defaults() {
        let adapter = FileConfigAdapter::from_string(AUTOMATIC_INI).unwrap();
        let scorer = cli::build_scorer_config(&adapter);
        let defaults = ScorerConfig::default();

        assert_eq!(scorer.macd_weight, 35.0);
        assert_eq!(scorer.rsi_oversold, 20.0);
        assert_eq!(scorer.ma_crossover.kind, MaKind::Sma);
        assert_eq!(scorer.ma_crossover.fast, 5);
        assert_eq!(scorer.ma_crossover.slow, 13);
        assert_eq!(scorer.min_separation, 12.0);
        assert_eq!(scorer.min_candles, 40);

        assert_eq!(scorer.rsi_overbought, defaults.rsi_overbought);
        assert_eq!(scorer.macd, defaults.macd);
        assert_eq!(scorer.support_resistance, defaults.support_resistance);
        assert_eq!(scorer.min_score, defaults.min_score);
    }

    #[test]
    fn empty_scorer_section_is_default() {
        let adapter = FileConfigAdapter::from_string("[feed]\ndata_dir = x\n").unwrap();
        assert_eq!(cli::build_scorer_config(&adapter), ScorerConfig::default());
    }

    #[test]
    fn orchestrator_config_reads_timings() {
        let adapter = FileConfigAdapter::from_string(AUTOMATIC_INI).unwrap();
        let config = cli::build_orchestrator_config(&adapter);

        assert_eq!(config.candle_count, 150);
        assert_eq!(config.cooldown, Duration::milliseconds(5_000));
        assert_eq!(config.order_timeout, std::time::Duration::from_millis(2_500));
        assert_eq!(config.tick_interval, std::time::Duration::from_secs(30));
        assert_eq!(config.min_evaluation_interval, Duration::seconds(10));
    }

    #[test]
    fn automatic_strategy_and_instruments() {
        let adapter = FileConfigAdapter::from_string(AUTOMATIC_INI).unwrap();
        let strategy = Arc::new(cli::build_strategy(&adapter).unwrap());
        assert_eq!(strategy.name, "Momentum");
        assert!(strategy.is_automatic());

        let instruments = cli::build_instruments(&adapter, strategy).unwrap();
        let symbols: Vec<&str> = instruments.iter().map(|i| i.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTCUSD", "ETHUSD"]);
        assert!(instruments.iter().all(|i| i.timeframe == Timeframe::M15));
        assert!(instruments.iter().all(|i| i.order_size == 0.25));
    }

    #[test]
    fn declarative_strategy_parses_conditions() {
        let ini = declarative_ini(Path::new("."), "RSI(14) BELOW 30; MACD BULLISH_CROSSOVER");
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        let strategy = cli::build_strategy(&adapter).unwrap();

        match strategy.mode {
            StrategyMode::Declarative {
                direction,
                conditions,
                unresolved,
            } => {
                assert_eq!(direction, Side::Long);
                assert_eq!(conditions.len(), 2);
                assert_eq!(conditions[1].to_string(), "MACD(12,26,9) BULLISH_CROSSOVER");
                assert!(unresolved.is_empty());
            }
            other => panic!("expected declarative, got {:?}", other),
        }
    }

    #[test]
    fn declarative_syntax_error_is_condition_parse() {
        let ini = declarative_ini(Path::new("."), "RSI(14) BELOWISH 30");
        let adapter = FileConfigAdapter::from_string(&ini).unwrap();
        let err = cli::build_strategy(&adapter).unwrap_err();
        assert!(matches!(err, SignalError::ConditionParse(_)));
        assert_exit(ExitCode::from(&err), 4);
    }

    #[test]
    fn strategy_name_defaults_to_mode() {
        let adapter = FileConfigAdapter::from_string("[strategy]\nmode = automatic\n").unwrap();
        assert_eq!(cli::build_strategy(&adapter).unwrap().name, "automatic");
    }
}

mod commands {
    use super::*;

    #[test]
    fn validate_accepts_valid_config() {
        let file = write_temp_ini(AUTOMATIC_INI);
        assert_exit(cli::run_validate(file.path()), 0);
    }

    #[test]
    fn validate_missing_file_is_config_error() {
        let code = cli::run_validate(&PathBuf::from("/nonexistent/signalguard.ini"));
        assert_exit(code, 2);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let file = write_temp_ini(&AUTOMATIC_INI.replace("order_size = 0.25", "order_size = 0"));
        assert_exit(cli::run_validate(file.path()), 2);
    }

    #[test]
    fn validate_reports_condition_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = write_temp_ini(&declarative_ini(dir.path(), "RSI(14) BELOW"));
        assert_exit(cli::run_validate(file.path()), 4);

        let file = write_temp_ini(&declarative_ini(dir.path(), "ICHIMOKU(9) ABOVE 1"));
        assert_exit(cli::run_validate(file.path()), 4);

        let file = write_temp_ini(&declarative_ini(dir.path(), "SMA(5) ABOVE 1; RSI BELOW 30"));
        assert_exit(cli::run_validate(file.path()), 0);
    }

    #[test]
    fn evaluate_prints_verdict_for_csv_candles() {
        let dir = tempfile::TempDir::new().unwrap();
        write_candles(dir.path(), "ETHUSD", &[10.0, 11.0, 12.0, 13.0]);
        let file = write_temp_ini(&declarative_ini(dir.path(), "SMA(2) ABOVE 12"));

        assert_exit(cli::run_evaluate(file.path(), "ethusd"), 0);
    }

    #[test]
    fn evaluate_missing_candles_is_feed_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = write_temp_ini(&declarative_ini(dir.path(), "SMA(2) ABOVE 12"));

        assert_exit(cli::run_evaluate(file.path(), "XRPUSD"), 3);
    }

    #[test]
    fn run_with_tick_limit_finishes() {
        let dir = tempfile::TempDir::new().unwrap();
        write_candles(dir.path(), "ETHUSD", &[10.0, 11.0, 12.0, 13.0]);
        let file = write_temp_ini(&declarative_ini(dir.path(), "SMA(1) ABOVE 0"));

        assert_exit(cli::run_orchestrator(file.path(), Some(2)), 0);
    }
}
