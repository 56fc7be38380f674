//! CLI definition and dispatch.
//!
//! Startup is staged: load config, validate, assemble the immutable
//! session, open collaborators, then hand off to the backtest replay or
//! the polling loop. Configuration problems abort before any cycle runs
//! with a distinct exit code; a clean operator stop of live polling exits
//! zero.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::info;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::live_executor::LiveExecutor;
use crate::adapters::notify::{FanoutNotifier, LogNotifier, TelegramNotifier};
use crate::adapters::rest_source::RestBarSource;
use crate::adapters::rest_venue::RestVenue;
use crate::adapters::sim_executor::SimExecutor;
use crate::adapters::sqlite_store::SqliteStore;
use crate::domain::backtest::run_backtest;
use crate::domain::config_validation::{
    validate_backtest_config, validate_live_config, validate_session_config,
};
use crate::domain::error::TradewindError;
use crate::domain::indicator::IndicatorParams;
use crate::domain::poller::Poller;
use crate::domain::session::{Interval, SessionConfig};
use crate::ports::bar_source::BarSourcePort;
use crate::ports::bar_store::BarStorePort;
use crate::ports::config_port::ConfigPort;
use crate::ports::execution::ExecutionPort;
use crate::ports::notifier::NotifierPort;

const DEFAULT_SOURCE_URL: &str = "https://api.binance.com";

#[derive(Parser, Debug)]
#[command(name = "tradewind", about = "Trend-following trading pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay cached or fetched history against the simulated ledger
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Start date override (YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,
        /// End date override (YYYY-MM-DD)
        #[arg(long)]
        until: Option<String>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        interval: Option<String>,
    },
    /// Poll the market on the bar cadence and trade on crossovers
    LivePoll {
        #[arg(short, long)]
        config: PathBuf,
        /// Execute against the simulated ledger instead of the live venue
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        interval: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            since,
            until,
            symbol,
            interval,
        } => run_backtest_command(
            &config,
            since.as_deref(),
            until.as_deref(),
            symbol.as_deref(),
            interval.as_deref(),
        ),
        Command::LivePoll {
            config,
            dry_run,
            interval,
        } => run_live_poll_command(&config, dry_run, interval.as_deref()),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = TradewindError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Config view with CLI arguments shadowing their file counterparts.
struct OverrideConfig<'a> {
    inner: &'a dyn ConfigPort,
    symbol: Option<String>,
    interval: Option<String>,
    since: Option<String>,
    until: Option<String>,
}

impl<'a> OverrideConfig<'a> {
    fn new(inner: &'a dyn ConfigPort) -> Self {
        OverrideConfig {
            inner,
            symbol: None,
            interval: None,
            since: None,
            until: None,
        }
    }

    fn overridden(&self, section: &str, key: &str) -> Option<&String> {
        match (section, key) {
            ("market", "symbol") => self.symbol.as_ref(),
            ("market", "interval") => self.interval.as_ref(),
            ("backtest", "start_date") => self.since.as_ref(),
            ("backtest", "end_date") => self.until.as_ref(),
            _ => None,
        }
    }
}

impl ConfigPort for OverrideConfig<'_> {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.overridden(section, key)
            .cloned()
            .or_else(|| self.inner.get_string(section, key))
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.inner.get_int(section, key, default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.inner.get_double(section, key, default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.inner.get_bool(section, key, default)
    }
}

pub fn build_session_config(config: &dyn ConfigPort) -> Result<SessionConfig, TradewindError> {
    let symbol = config
        .get_string("market", "symbol")
        .ok_or_else(|| TradewindError::ConfigMissing {
            section: "market".into(),
            key: "symbol".into(),
        })?;
    let interval_label =
        config
            .get_string("market", "interval")
            .ok_or_else(|| TradewindError::ConfigMissing {
                section: "market".into(),
                key: "interval".into(),
            })?;
    let interval =
        Interval::parse(&interval_label).map_err(|reason| TradewindError::ConfigInvalid {
            section: "market".into(),
            key: "interval".into(),
            reason,
        })?;

    Ok(SessionConfig {
        symbol,
        interval,
        initial_capital: config.get_double("trading", "initial_capital", 10_000.0),
        sizing_fraction: config.get_double("trading", "sizing_fraction", 0.2),
        indicators: IndicatorParams {
            short_window: config.get_int("indicators", "short_window", 20) as usize,
            long_window: config.get_int("indicators", "long_window", 50) as usize,
            rsi_period: config.get_int("indicators", "rsi_period", 14) as usize,
            macd_fast: config.get_int("indicators", "macd_fast", 12) as usize,
            macd_slow: config.get_int("indicators", "macd_slow", 26) as usize,
            macd_signal: config.get_int("indicators", "macd_signal", 9) as usize,
        },
    })
}

pub fn build_backtest_range(
    config: &dyn ConfigPort,
) -> Result<(NaiveDate, NaiveDate), TradewindError> {
    let mut dates = Vec::new();
    for key in ["start_date", "end_date"] {
        let value =
            config
                .get_string("backtest", key)
                .ok_or_else(|| TradewindError::ConfigMissing {
                    section: "backtest".into(),
                    key: key.into(),
                })?;
        let date = NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| {
            TradewindError::ConfigInvalid {
                section: "backtest".into(),
                key: key.into(),
                reason: "invalid date format (expected YYYY-MM-DD)".into(),
            }
        })?;
        dates.push(date);
    }
    Ok((dates[0], dates[1]))
}

/// Cache key for one fetched range, matching the layout of the store.
pub fn dataset_key(symbol: &str, interval: &Interval, since: NaiveDate, until: NaiveDate) -> String {
    format!(
        "{symbol}_{interval}_{since}_{until}",
        since = since.format("%Y%m%d"),
        until = until.format("%Y%m%d"),
    )
}

fn build_source(config: &dyn ConfigPort, session: &SessionConfig) -> RestBarSource {
    let base_url = config
        .get_string("source", "base_url")
        .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string());
    // The evaluation window must cover the longest warm-up with room to spare.
    let default_lookback = (session.indicators.long_window as i64 * 3).max(200);
    let lookback = config.get_int("source", "lookback", default_lookback) as usize;
    RestBarSource::new(base_url, lookback)
}

fn build_notifier(config: &dyn ConfigPort) -> FanoutNotifier {
    let mut fanout = FanoutNotifier::new().with_target(Box::new(LogNotifier));

    let token = config.get_string("telegram", "token");
    let chat_id = config.get_string("telegram", "chat_id");
    if let (Some(token), Some(chat_id)) = (token, chat_id) {
        fanout = fanout.with_target(Box::new(TelegramNotifier::new(token, chat_id)));
    }

    fanout
}

fn run_backtest_command(
    config_path: &PathBuf,
    since: Option<&str>,
    until: Option<&str>,
    symbol: Option<&str>,
    interval: Option<&str>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let mut config = OverrideConfig::new(&adapter);
    config.symbol = symbol.map(str::to_string);
    config.interval = interval.map(str::to_string);
    config.since = since.map(str::to_string);
    config.until = until.map(str::to_string);

    if let Err(e) = validate_session_config(&config).and_then(|_| validate_backtest_config(&config))
    {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let session = match build_session_config(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let (start_date, end_date) = match build_backtest_range(&config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let store = match SqliteStore::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let source = build_source(&config, &session);
    let notifier = build_notifier(&config);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(1);
        }
    };

    let key = dataset_key(&session.symbol, &session.interval, start_date, end_date);
    eprintln!(
        "Backtesting {} {} from {} to {}",
        session.symbol, session.interval, start_date, end_date
    );

    let bars = match runtime.block_on(obtain_bars(
        &store, &source, &session, &key, start_date, end_date,
    )) {
        Ok(bars) => bars,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let (report, snapshot) = run_backtest(&bars, &session);
    let summary = report.summary();
    info!(
        trades = snapshot.trades.len(),
        signals = report.signals.len(),
        "backtest finished"
    );
    runtime.block_on(notifier.send(&summary));
    println!("{summary}");

    ExitCode::SUCCESS
}

/// Load the requested range from the cache, fetching and saving it on a
/// miss. An empty result either way is fatal: the backtest has nothing
/// to evaluate.
async fn obtain_bars(
    store: &SqliteStore,
    source: &RestBarSource,
    session: &SessionConfig,
    key: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Vec<crate::domain::bar::Bar>, TradewindError> {
    let cached = store.load(key)?;
    if !cached.is_empty() {
        info!(bars = cached.len(), key = %key, "loaded bars from store");
        return Ok(cached);
    }

    info!(key = %key, "no cached bars, fetching from source");
    let since = start_date.and_hms_opt(0, 0, 0).expect("midnight").and_utc();
    let until = end_date.and_hms_opt(0, 0, 0).expect("midnight").and_utc();
    let bars = source
        .fetch_bars(&session.symbol, &session.interval, since, until)
        .await?;

    if bars.is_empty() {
        return Err(TradewindError::NoData {
            symbol: session.symbol.clone(),
            interval: session.interval.label().to_string(),
        });
    }

    store.save(key, &bars)?;
    info!(bars = bars.len(), key = %key, "fetched and cached bars");
    Ok(bars)
}

fn run_live_poll_command(
    config_path: &PathBuf,
    dry_run: bool,
    interval: Option<&str>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let mut config = OverrideConfig::new(&adapter);
    config.interval = interval.map(str::to_string);

    let validation = validate_session_config(&config).and_then(|_| {
        if dry_run {
            Ok(())
        } else {
            validate_live_config(&config)
        }
    });
    if let Err(e) = validation {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let session = match build_session_config(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let source = build_source(&config, &session);
    let notifier = build_notifier(&config);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(1);
        }
    };

    // Stop flag flipped by ctrl-c, observed by the poller at every
    // suspension point.
    let (stop_tx, stop_rx) = watch::channel(false);
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("stop requested");
            let _ = stop_tx.send(true);
        }
    });

    if dry_run {
        let executor = SimExecutor::new(session.initial_capital);
        runtime.block_on(drive_poller(session, source, executor, notifier, stop_rx));
    } else {
        let base_url = config
            .get_string("venue", "base_url")
            .expect("validated above");
        let api_key = config.get_string("venue", "api_key").expect("validated above");
        let venue = RestVenue::new(base_url, api_key);

        let executor = match runtime.block_on(LiveExecutor::connect(
            venue,
            session.symbol.clone(),
            session.initial_capital,
        )) {
            Ok(e) => e,
            Err(e) => {
                eprintln!("error: venue unavailable at startup: {e}");
                return ExitCode::from(4);
            }
        };
        runtime.block_on(drive_poller(session, source, executor, notifier, stop_rx));
    }

    ExitCode::SUCCESS
}

async fn drive_poller<S, E, N>(
    session: SessionConfig,
    source: S,
    executor: E,
    notifier: N,
    stop: watch::Receiver<bool>,
) where
    S: BarSourcePort,
    E: ExecutionPort,
    N: NotifierPort,
{
    Poller::new(session, source, executor, notifier, stop)
        .run()
        .await;
}
