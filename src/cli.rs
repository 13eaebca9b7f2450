//! CLI definition and dispatch.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand};
use tokio::sync::watch;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::adapters::csv_adapter::CsvCandleFeed;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::paper_executor::PaperExecutor;
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::condition_parser::{self, split_conditions};
use crate::domain::config_validation::{
    DEFAULT_CANDLE_COUNT, parse_instruments, strategy_mode, validate_config,
};
use crate::domain::error::SignalError;
use crate::domain::indicator::crossover::MaKind;
use crate::domain::indicator::support_resistance::SupportResistanceParams;
use crate::domain::indicator::{BollingerParams, MaCrossoverParams, MacdParams};
use crate::domain::market::{Side, Timeframe};
use crate::domain::orchestrator::{
    EntryOrchestrator, ManagedInstrument, OrchestratorConfig, PauseFlag,
};
use crate::domain::scorer::{ScoreSheet, ScorerConfig, Verdict};
use crate::domain::strategy::{Strategy, StrategyMode};
use crate::ports::candle_port::CandleFeed;
use crate::ports::config_port::ConfigPort;
use crate::ports::execution_port::OrderExecutor;

#[derive(Parser, Debug)]
#[command(
    name = "signalguard",
    about = "Indicator-driven entry signals behind a position guard"
)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score one instrument once and print the votes and verdict
    Evaluate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        instrument: String,
    },
    /// Validate a configuration and parse every entry condition
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Run the orchestrator over the CSV feed with paper execution
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Stop after this many ticks instead of waiting for Ctrl-C
        #[arg(long)]
        ticks: Option<usize>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);
    match cli.command {
        Command::Evaluate { config, instrument } => run_evaluate(&config, &instrument),
        Command::Validate { config } => run_validate(&config),
        Command::Run { config, ticks } => run_orchestrator(&config, ticks),
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    // a second call (tests, embedding) keeps the first subscriber
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn fail(err: &SignalError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

/// Loads and validates; every failure is already reported on stderr.
fn load_validated(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    eprintln!("Loading config from {}", path.display());
    let adapter = load_config(path)?;
    validate_config(&adapter).map_err(|e| fail(&e))?;
    Ok(adapter)
}

fn scorer_usize(config: &dyn ConfigPort, key: &str, default: usize) -> usize {
    config.get_int("scorer", key, default as i64).max(0) as usize
}

pub fn build_scorer_config(config: &dyn ConfigPort) -> ScorerConfig {
    let d = ScorerConfig::default();
    let kind = match config
        .get_string("scorer", "ma_type")
        .map(|k| k.to_lowercase())
        .as_deref()
    {
        Some("sma") => MaKind::Sma,
        Some("ema") => MaKind::Ema,
        _ => d.ma_crossover.kind,
    };

    ScorerConfig {
        macd: MacdParams {
            fast: scorer_usize(config, "macd_fast", d.macd.fast),
            slow: scorer_usize(config, "macd_slow", d.macd.slow),
            signal: scorer_usize(config, "macd_signal", d.macd.signal),
        },
        macd_weight: config.get_double("scorer", "macd_weight", d.macd_weight),
        rsi_period: scorer_usize(config, "rsi_period", d.rsi_period),
        rsi_oversold: config.get_double("scorer", "rsi_oversold", d.rsi_oversold),
        rsi_overbought: config.get_double("scorer", "rsi_overbought", d.rsi_overbought),
        rsi_weight: config.get_double("scorer", "rsi_weight", d.rsi_weight),
        bollinger: BollingerParams {
            period: scorer_usize(config, "bollinger_period", d.bollinger.period),
            multiplier: config.get_double("scorer", "bollinger_multiplier", d.bollinger.multiplier),
        },
        bollinger_buffer_pct: config.get_double(
            "scorer",
            "bollinger_buffer_pct",
            d.bollinger_buffer_pct,
        ),
        bollinger_weight: config.get_double("scorer", "bollinger_weight", d.bollinger_weight),
        volume_period: scorer_usize(config, "volume_period", d.volume_period),
        volume_multiplier: config.get_double("scorer", "volume_multiplier", d.volume_multiplier),
        volume_weight: config.get_double("scorer", "volume_weight", d.volume_weight),
        ma_crossover: MaCrossoverParams {
            fast: scorer_usize(config, "ma_fast", d.ma_crossover.fast),
            slow: scorer_usize(config, "ma_slow", d.ma_crossover.slow),
            kind,
        },
        ma_weight: config.get_double("scorer", "ma_weight", d.ma_weight),
        support_resistance: SupportResistanceParams {
            lookback: scorer_usize(config, "sr_lookback", d.support_resistance.lookback),
            ..d.support_resistance
        },
        sr_breakout_weight: config.get_double("scorer", "sr_breakout_weight", d.sr_breakout_weight),
        sr_strong_weight: config.get_double("scorer", "sr_strong_weight", d.sr_strong_weight),
        sr_weak_weight: config.get_double("scorer", "sr_weak_weight", d.sr_weak_weight),
        sr_strong_touches: scorer_usize(config, "sr_strong_touches", d.sr_strong_touches),
        atr_period: scorer_usize(config, "atr_period", d.atr_period),
        high_volatility_pct: config.get_double(
            "scorer",
            "high_volatility_pct",
            d.high_volatility_pct,
        ),
        min_separation: config.get_double("scorer", "min_separation", d.min_separation),
        high_volatility_separation: config.get_double(
            "scorer",
            "high_volatility_separation",
            d.high_volatility_separation,
        ),
        min_score: config.get_double("scorer", "min_score", d.min_score),
        rsi_exhaustion_high: config.get_double(
            "scorer",
            "rsi_exhaustion_high",
            d.rsi_exhaustion_high,
        ),
        rsi_exhaustion_low: config.get_double("scorer", "rsi_exhaustion_low", d.rsi_exhaustion_low),
        min_candles: scorer_usize(config, "min_candles", d.min_candles),
    }
}

pub fn build_orchestrator_config(config: &dyn ConfigPort) -> OrchestratorConfig {
    let d = OrchestratorConfig::default();
    let int = |key: &str, default: i64| config.get_int("orchestrator", key, default).max(0);

    OrchestratorConfig {
        candle_count: config
            .get_int("feed", "candle_count", DEFAULT_CANDLE_COUNT)
            .max(1) as usize,
        cooldown: chrono::Duration::milliseconds(int(
            "cooldown_ms",
            d.cooldown.num_milliseconds(),
        )),
        order_timeout: std::time::Duration::from_millis(
            int("order_timeout_ms", d.order_timeout.as_millis() as i64) as u64,
        ),
        tick_interval: std::time::Duration::from_secs(
            int("tick_interval_secs", d.tick_interval.as_secs() as i64) as u64,
        ),
        min_evaluation_interval: chrono::Duration::seconds(int(
            "min_evaluation_interval_secs",
            d.min_evaluation_interval.num_seconds(),
        )),
    }
}

pub fn build_strategy(config: &dyn ConfigPort) -> Result<Strategy, SignalError> {
    let mode = strategy_mode(config);
    let name = config
        .get_string("strategy", "name")
        .unwrap_or_else(|| mode.clone());

    if mode == "declarative" {
        let direction = config
            .get_string("strategy", "direction")
            .unwrap_or_default()
            .parse::<Side>()
            .map_err(|reason| SignalError::invalid("strategy", "direction", reason))?;
        let conditions = config
            .get_string("strategy", "entry_conditions")
            .unwrap_or_default();
        Strategy::declarative(name, direction, &conditions)
    } else {
        Ok(Strategy::automatic(name, build_scorer_config(config)))
    }
}

pub fn build_instruments(
    config: &dyn ConfigPort,
    strategy: Arc<Strategy>,
) -> Result<Vec<ManagedInstrument>, SignalError> {
    let raw = config
        .get_string("orchestrator", "instruments")
        .unwrap_or_default();
    let timeframe = timeframe(config)?;
    let order_size = config.get_double("orchestrator", "order_size", 0.0);

    Ok(parse_instruments(&raw)?
        .into_iter()
        .map(|symbol| ManagedInstrument {
            symbol,
            timeframe,
            order_size,
            strategy: Arc::clone(&strategy),
        })
        .collect())
}

fn timeframe(config: &dyn ConfigPort) -> Result<Timeframe, SignalError> {
    match config.get_string("orchestrator", "timeframe") {
        Some(tf) => tf
            .parse::<Timeframe>()
            .map_err(|reason| SignalError::invalid("orchestrator", "timeframe", reason)),
        None => Ok(Timeframe::H1),
    }
}

fn data_dir(config: &dyn ConfigPort) -> PathBuf {
    PathBuf::from(
        config
            .get_string("feed", "data_dir")
            .unwrap_or_else(|| ".".to_string()),
    )
}

fn runtime() -> Result<tokio::runtime::Runtime, ExitCode> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| fail(&SignalError::Io(e)))
}

pub fn run_validate(config_path: &Path) -> ExitCode {
    let adapter = match load_validated(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    eprintln!("Config validated successfully");

    if let Some(raw) = adapter.get_string("orchestrator", "instruments")
        && let Ok(instruments) = parse_instruments(&raw)
    {
        eprintln!("\nInstruments: {}", instruments.join(", "));
    }
    let orchestrator = build_orchestrator_config(&adapter);
    eprintln!(
        "Tick every {}s, cooldown {}ms, order timeout {}ms",
        orchestrator.tick_interval.as_secs(),
        orchestrator.cooldown.num_milliseconds(),
        orchestrator.order_timeout.as_millis()
    );

    if strategy_mode(&adapter) != "declarative" {
        let scorer = build_scorer_config(&adapter);
        eprintln!("\nAutomatic scoring:");
        eprintln!("  min separation: {}", scorer.min_separation);
        eprintln!("  min score:      {}", scorer.min_score);
        eprintln!("  min candles:    {}", scorer.min_candles);
        eprintln!("\nConfiguration is valid.");
        return ExitCode::SUCCESS;
    }

    let raw = adapter
        .get_string("strategy", "entry_conditions")
        .unwrap_or_default();
    eprintln!("\nEntry conditions:");
    let mut parsed = 0;
    for source in split_conditions(&raw) {
        match condition_parser::parse(source) {
            Ok(condition) => {
                eprintln!("  Parsed: {}", condition);
                eprintln!("  Raw:    {}", source);
                parsed += 1;
            }
            Err(e) => {
                eprintln!("  error: {}", e.display_with_context(source));
                return fail(&SignalError::from(e));
            }
        }
    }
    if parsed == 0 {
        return fail(&SignalError::invalid(
            "strategy",
            "entry_conditions",
            "no conditions given",
        ));
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn print_sheet(sheet: &ScoreSheet) {
    println!("votes:");
    if sheet.votes.is_empty() {
        println!("  (none)");
    }
    for vote in &sheet.votes {
        println!(
            "  {:<5} {:>5.1}  {:<18} {}",
            vote.side.to_string(),
            vote.weight,
            vote.source.to_string(),
            vote.reason
        );
    }
    println!("bullish {:.1} / bearish {:.1}", sheet.bullish, sheet.bearish);
    if let Some(rsi) = sheet.rsi {
        println!("rsi {:.1}", rsi);
    }
    if let Some(volatility) = sheet.volatility_pct {
        println!("volatility {:.2}%", volatility);
    }
}

pub fn run_evaluate(config_path: &Path, instrument: &str) -> ExitCode {
    let adapter = match load_validated(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let strategy = match build_strategy(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let instrument = instrument.trim().to_uppercase();
    let timeframe = match timeframe(&adapter) {
        Ok(tf) => tf,
        Err(e) => return fail(&e),
    };
    let count = build_orchestrator_config(&adapter).candle_count;
    let feed = CsvCandleFeed::new(data_dir(&adapter));

    let rt = match runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };
    let candles = match rt.block_on(feed.get_candles(&instrument, timeframe, count)) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    println!(
        "{} {}: {} candles, strategy '{}'",
        instrument,
        timeframe,
        candles.len(),
        strategy.name
    );
    if let Some(last) = candles.last() {
        println!("last close {} at {}", last.close, last.timestamp);
    }

    let (sheet, verdict) = strategy.assess(&candles);
    if let Some(sheet) = &sheet {
        print_sheet(sheet);
    }
    if let StrategyMode::Declarative { conditions, .. } = &strategy.mode {
        for condition in conditions {
            println!("  condition {}", condition);
        }
    }

    match verdict {
        Verdict::Signal(decision) => println!(
            "verdict: {} (confidence {:.0})",
            decision.direction.as_str().to_uppercase(),
            decision.confidence
        ),
        Verdict::NoSignal(reason) => println!("verdict: no signal ({})", reason),
    }
    ExitCode::SUCCESS
}

pub fn run_orchestrator(config_path: &Path, ticks: Option<usize>) -> ExitCode {
    let adapter = match load_validated(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let strategy = match build_strategy(&adapter) {
        Ok(s) => Arc::new(s),
        Err(e) => return fail(&e),
    };
    let instruments = match build_instruments(&adapter, strategy) {
        Ok(i) => i,
        Err(e) => return fail(&e),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let feed: Arc<dyn CandleFeed> = Arc::new(CsvCandleFeed::new(data_dir(&adapter)));
    let paper = Arc::new(
        PaperExecutor::new(Arc::clone(&clock))
            .with_slippage_pct(adapter.get_double("paper", "slippage_pct", 0.0)),
    );
    let executor: Arc<dyn OrderExecutor> = paper.clone();
    let paused = PauseFlag::new(adapter.get_bool("orchestrator", "paused", false));

    let orchestrator = EntryOrchestrator::new(
        build_orchestrator_config(&adapter),
        feed,
        executor,
        clock,
    )
    .with_pause_flag(paused)
    .with_instruments(instruments);

    eprintln!(
        "Running {} instrument(s), tick every {}s{}",
        orchestrator.instruments().len(),
        orchestrator.config().tick_interval.as_secs(),
        if orchestrator.pause_flag().is_paused() {
            " (paused)"
        } else {
            ""
        }
    );

    let rt = match runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };
    let ran = rt.block_on(async {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(true);
            }
        });

        orchestrator
            .run(shutdown_rx, ticks, |tick, reports| {
                for report in reports {
                    eprintln!("[tick {}] {}: {}", tick, report.instrument, report.outcome);
                }
            })
            .await
    });

    let fills = paper.fills();
    eprintln!("\n{} tick(s), {} paper fill(s)", ran, fills.len());
    for fill in &fills {
        println!(
            "{}  {} {} x{} @ {}",
            fill.order_id,
            fill.side,
            fill.instrument,
            fill.size,
            fill.fill_price
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }
    ExitCode::SUCCESS
}
