//! ReboundLab CLI: drop scans, backtests, parameter search and walk-forward runs.
//!
//! Commands:
//! - `scan`: list drop events for a fixed threshold (no outcomes)
//! - `backtest`: resolve and trade events under fixed parameters
//! - `optimize`: Monte Carlo search over a training window
//! - `walk-forward`: search on training, replay on the following window
//! - `trace`: drop, gain and stop-loss crossings within one intraday session

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use reboundlab_core::data::{
    CircuitBreaker, CsvProvider, DataProvider, SyntheticProvider, YahooProvider,
};
use reboundlab_core::domain::{DropEvent, Interval, RuleParameters};
use reboundlab_core::session_trace::{trace_session, SessionTrace, TracePoint};
use reboundlab_core::{
    detect_until, simulate, ForwardWindow, OutcomeSummary, ReferenceOpenPolicy, Simulation,
    DEFAULT_INITIAL_CASH,
};
use reboundlab_runner::{
    export_events_csv, load_exact, load_window, run_walk_forward, save_report, save_simulation,
    search, BestParameters, RunConfig, SearchConfig, SearchSection, SearchSpace,
    WalkForwardReport, WindowSpec,
};

#[derive(Parser)]
#[command(
    name = "reboundlab",
    about = "ReboundLab CLI: intraday drop-and-rebound research"
)]
struct Cli {
    /// Debug-level logging (RUST_LOG overrides).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List drop events without resolving them.
    Scan {
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        window: WindowArgs,

        /// Drop threshold as a fraction (0.05 = 5%).
        #[arg(long = "drop")]
        drop_threshold: f64,

        /// Write `events.csv` into this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Resolve and trade every event under fixed parameters.
    Backtest {
        #[command(flatten)]
        range: RangeArgs,
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        window: WindowArgs,
        #[command(flatten)]
        rule: RuleArgs,

        /// Starting cash per instrument.
        #[arg(long, default_value_t = DEFAULT_INITIAL_CASH)]
        cash: f64,

        /// Write per-instrument trade and outcome CSVs into this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Search the training window for the best parameters.
    Optimize {
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        data: DataArgs,

        /// Write `best_params.json` into this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Search on the training window, validate on the following window.
    WalkForward {
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        data: DataArgs,

        /// Validation window length in days.
        #[arg(long)]
        validation_days: Option<i64>,

        /// Validation bar interval (1d or 1m).
        #[arg(long)]
        validation_interval: Option<Interval>,

        /// Validation reference open (bar_open or session_open).
        #[arg(long)]
        validation_reference: Option<ReferenceOpenPolicy>,

        /// Output directory for the report artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Trace one intraday session against drop, gain and stop-loss levels.
    Trace {
        /// Instrument symbol.
        #[arg(long)]
        symbol: String,

        /// Trading day (YYYY-MM-DD).
        #[arg(long)]
        day: NaiveDate,

        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        rule: RuleArgs,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProviderKind {
    Yahoo,
    Csv,
    Synthetic,
}

#[derive(Args, Debug)]
struct DataArgs {
    /// Price data source.
    #[arg(long, value_enum, default_value_t = ProviderKind::Yahoo)]
    provider: ProviderKind,

    /// Directory holding `<SYMBOL>.csv` / `<SYMBOL>_1m.csv` for `--provider csv`.
    #[arg(long, default_value = "data")]
    csv_dir: PathBuf,

    /// Seed for `--provider synthetic`.
    #[arg(long, default_value_t = 42)]
    synthetic_seed: u64,
}

#[derive(Args, Debug)]
struct RangeArgs {
    /// Symbols, comma separated (e.g. AMD,NVDA).
    #[arg(long, required = true, value_delimiter = ',')]
    symbols: Vec<String>,

    /// Start date (YYYY-MM-DD).
    #[arg(long)]
    start: NaiveDate,

    /// End date (YYYY-MM-DD). Events are detected up to this day.
    #[arg(long)]
    end: NaiveDate,
}

#[derive(Args, Debug)]
struct WindowArgs {
    /// Bar interval (1d or 1m).
    #[arg(long, default_value = "1d")]
    interval: Interval,

    /// Reference open (bar_open or session_open).
    #[arg(long, default_value = "bar_open")]
    reference: ReferenceOpenPolicy,

    /// Horizon counting (present_bars or elapsed).
    #[arg(long, default_value = "present_bars")]
    window: ForwardWindow,
}

impl WindowArgs {
    fn spec(&self) -> WindowSpec {
        WindowSpec {
            interval: self.interval,
            reference: self.reference,
            window: self.window,
        }
    }
}

#[derive(Args, Debug)]
struct RuleArgs {
    /// Drop threshold as a fraction.
    #[arg(long = "drop", default_value_t = 0.05)]
    drop_threshold: f64,

    /// Gain threshold as a fraction of the event low.
    #[arg(long = "gain", default_value_t = 0.03)]
    gain_threshold: f64,

    /// Stop-loss threshold as a fraction of the event low.
    #[arg(long = "stop", default_value_t = 0.03)]
    stop_loss_threshold: f64,

    /// Disable the stop-loss.
    #[arg(long, default_value_t = false)]
    no_stop: bool,

    /// Forward window length in bars.
    #[arg(long, default_value_t = 10)]
    horizon: usize,
}

impl RuleArgs {
    fn params(&self) -> Result<RuleParameters> {
        let params = RuleParameters {
            drop_threshold: self.drop_threshold,
            gain_threshold: self.gain_threshold,
            stop_loss_threshold: (!self.no_stop).then_some(self.stop_loss_threshold),
            horizon: self.horizon,
        };
        params.validate()?;
        Ok(params)
    }
}

/// Search/walk-forward options. Flags override values read from `--config`.
#[derive(Args, Debug)]
struct RunArgs {
    /// TOML run configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Symbols, comma separated.
    #[arg(long, value_delimiter = ',')]
    symbols: Vec<String>,

    /// Training start date (YYYY-MM-DD).
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Training end date (YYYY-MM-DD).
    #[arg(long)]
    end: Option<NaiveDate>,

    #[arg(long)]
    trials: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads (0 = all cores).
    #[arg(long)]
    threads: Option<usize>,

    /// Forward window length in bars.
    #[arg(long)]
    horizon: Option<usize>,

    /// Training bar interval (1d or 1m).
    #[arg(long)]
    interval: Option<Interval>,

    /// Training reference open (bar_open or session_open).
    #[arg(long)]
    reference: Option<ReferenceOpenPolicy>,

    /// Search without a stop-loss.
    #[arg(long, default_value_t = false)]
    no_stop: bool,
}

impl RunArgs {
    fn resolve(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::parse_file(path)?,
            None => {
                let (Some(start), Some(end)) = (self.start, self.end) else {
                    bail!("--start and --end are required without --config");
                };
                RunConfig {
                    instruments: Vec::new(),
                    train_start: start,
                    train_end: end,
                    search: SearchSection::default(),
                    space: SearchSpace::default(),
                    training: WindowSpec::default(),
                    validation: WindowSpec::default(),
                    validation_days: 30,
                    initial_cash: DEFAULT_INITIAL_CASH,
                    parallel_instruments: true,
                    universe: None,
                }
            }
        };

        if !self.symbols.is_empty() {
            config.instruments = self.symbols.clone();
        }
        if let Some(start) = self.start {
            config.train_start = start;
        }
        if let Some(end) = self.end {
            config.train_end = end;
        }
        if let Some(trials) = self.trials {
            config.search.trials = trials;
        }
        if let Some(seed) = self.seed {
            config.search.seed = seed;
        }
        if let Some(threads) = self.threads {
            config.search.threads = threads;
        }
        if let Some(horizon) = self.horizon {
            config.space.horizon = horizon;
        }
        if let Some(interval) = self.interval {
            config.training.interval = interval;
        }
        if let Some(reference) = self.reference {
            config.training.reference = reference;
        }
        if self.no_stop {
            config.search.disable_stop_loss = true;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Scan {
            range,
            data,
            window,
            drop_threshold,
            output_dir,
        } => run_scan(&range, &data, &window, drop_threshold, output_dir.as_deref()),
        Commands::Backtest {
            range,
            data,
            window,
            rule,
            cash,
            output_dir,
        } => run_backtest(&range, &data, &window, &rule, cash, output_dir.as_deref()),
        Commands::Optimize {
            run,
            data,
            output_dir,
        } => run_optimize(&run, &data, output_dir.as_deref()),
        Commands::WalkForward {
            run,
            data,
            validation_days,
            validation_interval,
            validation_reference,
            output_dir,
        } => {
            let mut config = run.resolve()?;
            if let Some(days) = validation_days {
                config.validation_days = days;
            }
            if let Some(interval) = validation_interval {
                config.validation.interval = interval;
            }
            if let Some(reference) = validation_reference {
                config.validation.reference = reference;
            }
            run_walk_forward_cmd(config, &data, &output_dir)
        }
        Commands::Trace {
            symbol,
            day,
            data,
            rule,
        } => run_trace(&symbol, day, &data, &rule),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_provider(args: &DataArgs) -> Result<Box<dyn DataProvider>> {
    let provider: Box<dyn DataProvider> = match args.provider {
        ProviderKind::Yahoo => {
            let breaker = Arc::new(CircuitBreaker::default_provider());
            Box::new(YahooProvider::new(breaker)?)
        }
        ProviderKind::Csv => Box::new(CsvProvider::new(args.csv_dir.clone())),
        ProviderKind::Synthetic => Box::new(SyntheticProvider::new(args.synthetic_seed)),
    };
    tracing::debug!(provider = provider.name(), "data provider ready");
    Ok(provider)
}

fn check_range(range: &RangeArgs) -> Result<()> {
    if range.start > range.end {
        bail!("--start {} is after --end {}", range.start, range.end);
    }
    Ok(())
}

fn check_cash(cash: f64) -> Result<()> {
    if !(cash.is_finite() && cash > 0.0) {
        bail!("--cash must be a positive amount (got {cash})");
    }
    Ok(())
}

// ─── scan ────────────────────────────────────────────────────────────

fn run_scan(
    range: &RangeArgs,
    data: &DataArgs,
    window: &WindowArgs,
    drop_threshold: f64,
    output_dir: Option<&Path>,
) -> Result<()> {
    check_range(range)?;
    reboundlab_core::domain::params::check_unit_open("drop_threshold", drop_threshold)?;
    let provider = build_provider(data)?;

    let mut events: Vec<DropEvent> = Vec::new();
    for symbol in &range.symbols {
        let series = load_exact(&*provider, symbol, range.start, range.end, window.interval)
            .with_context(|| format!("loading {symbol}"))?;
        let found = detect_until(&series, window.reference, drop_threshold, range.end);
        println!("{symbol}: {} bars, {} drop events", series.len(), found.len());
        events.extend(found);
    }

    print_events(&events);

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("events.csv");
        std::fs::write(&path, export_events_csv(&events)?)?;
        println!("Events saved to: {}", path.display());
    }
    Ok(())
}

fn print_events(events: &[DropEvent]) {
    if events.is_empty() {
        println!("No drop events.");
        return;
    }
    println!();
    println!(
        "{:<8} {:<20} {:>10} {:>10} {:>8}",
        "Symbol", "Detected", "Ref Open", "Low", "Drop"
    );
    println!("{}", "-".repeat(60));
    for e in events {
        println!(
            "{:<8} {:<20} {:>10.2} {:>10.2} {:>7.2}%",
            e.instrument,
            e.detected_at.format("%Y-%m-%d %H:%M"),
            e.reference_open,
            e.event_low,
            e.drop_fraction * 100.0
        );
    }
}

// ─── backtest ────────────────────────────────────────────────────────

fn run_backtest(
    range: &RangeArgs,
    data: &DataArgs,
    window: &WindowArgs,
    rule: &RuleArgs,
    cash: f64,
    output_dir: Option<&Path>,
) -> Result<()> {
    check_range(range)?;
    check_cash(cash)?;
    let params = rule.params()?;
    let provider = build_provider(data)?;
    let settings = window.spec().settings(range.end);

    for symbol in &range.symbols {
        let loaded = load_window(
            &*provider,
            symbol,
            range.start,
            range.end,
            window.interval,
            params.horizon,
        )
        .with_context(|| format!("loading {symbol}"))?;
        let sim = simulate(&loaded.series, &params, &settings, cash);
        let summary = OutcomeSummary::from_resolved(symbol, &sim.resolved, &params);
        print_simulation(&sim, &summary);

        if let Some(dir) = output_dir {
            for path in save_simulation(&sim, dir)? {
                println!("Saved: {}", path.display());
            }
        }
    }
    Ok(())
}

fn print_simulation(sim: &Simulation, summary: &OutcomeSummary) {
    println!();
    println!("=== {} ===", sim.instrument);
    print_outcomes(summary);
    println!("Trades:         {}", sim.trades.len());
    println!("Initial Cash:   {:.2}", sim.initial_cash);
    println!("Final Cash:     {:.2}", sim.final_state.cash);
    println!(
        "P&L:            {:.2} ({:.2}%)",
        sim.profit_loss(),
        sim.return_pct() * 100.0
    );
    if !sim.trades.is_empty() {
        println!();
        for t in &sim.trades {
            println!(
                "  {:<22} {} @ {:.2} x {}",
                t.action.label(),
                t.timestamp.format("%Y-%m-%d %H:%M"),
                t.price,
                t.shares
            );
        }
    }
}

fn print_outcomes(summary: &OutcomeSummary) {
    println!(
        "Events:         {} ({} recovered, {} stopped, {} unresolved)",
        summary.event_count(),
        summary.recovered,
        summary.stopped_out,
        summary.unresolved
    );
    println!("Recovery Rate:  {:.1}%", summary.recovery_rate() * 100.0);
    println!(
        "Avg Unresolved: {:+.2}%",
        summary.avg_unresolved_change * 100.0
    );
    println!("Score:          {:.4}", summary.score);
}

// ─── optimize ────────────────────────────────────────────────────────

fn run_optimize(run: &RunArgs, data: &DataArgs, output_dir: Option<&Path>) -> Result<()> {
    let config = run.resolve()?;
    config.validate()?;
    let wf = config.walk_forward();
    let provider = build_provider(data)?;

    let search_config = SearchConfig {
        trials: wf.trials,
        seed: wf.seed,
        threads: wf.threads,
        space: wf.space,
        settings: wf.training.settings(config.train_end),
    };

    let mut winners: Vec<BestParameters> = Vec::with_capacity(config.instruments.len());
    for symbol in &config.instruments {
        let loaded = load_window(
            &*provider,
            symbol,
            config.train_start,
            config.train_end,
            wf.training.interval,
            wf.space.horizon,
        )
        .with_context(|| format!("loading {symbol}"))?;
        let best = search(&loaded.series, &search_config)?;
        print_best(&best);
        winners.push(best);
    }

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("best_params.json");
        std::fs::write(&path, serde_json::to_string_pretty(&winners)?)?;
        println!("Best parameters saved to: {}", path.display());
    }
    Ok(())
}

fn print_best(best: &BestParameters) {
    println!();
    println!("=== {} ===", best.instrument);
    println!(
        "Best Trial:     {} of {}",
        best.trial, best.trials_run
    );
    println!("Drop:           {:.2}%", best.params.drop_threshold * 100.0);
    println!("Gain:           {:.2}%", best.params.gain_threshold * 100.0);
    match best.params.stop_loss_threshold {
        Some(stop) => println!("Stop Loss:      {:.2}%", stop * 100.0),
        None => println!("Stop Loss:      (disabled)"),
    }
    println!("Horizon:        {} bars", best.params.horizon);
    print_outcomes(&best.summary);
}

// ─── walk-forward ────────────────────────────────────────────────────

fn run_walk_forward_cmd(config: RunConfig, data: &DataArgs, output_dir: &Path) -> Result<()> {
    config.validate()?;
    let provider = build_provider(data)?;
    let report = run_walk_forward(
        &*provider,
        &config.instruments,
        config.train_start,
        config.train_end,
        &config.walk_forward(),
    )?;

    print_report(&report);
    save_report(&report, output_dir)?;
    println!("Artifacts saved to: {}", output_dir.display());
    Ok(())
}

fn print_report(report: &WalkForwardReport) {
    println!();
    println!("=== Walk-Forward ===");
    println!(
        "Training:       {} to {}",
        report.train_start, report.train_end
    );
    println!(
        "Validation:     {} to {}",
        report.validation_start, report.validation_end
    );
    println!();
    println!(
        "{:<8} {:>7} {:>7} {:>7} {:>5} {:>5} {:>5} {:>10} {:>12}",
        "Symbol", "Drop", "Gain", "Stop", "Rec", "Stop", "Unres", "Train", "P&L"
    );
    println!("{}", "-".repeat(78));
    for r in &report.results {
        let p = &r.best.params;
        let s = &r.validation.summary;
        let stop = p
            .stop_loss_threshold
            .map(|v| format!("{:.2}%", v * 100.0))
            .unwrap_or_else(|| "-".into());
        println!(
            "{:<8} {:>6.2}% {:>6.2}% {:>7} {:>5} {:>5} {:>5} {:>10.4} {:>12.2}",
            r.instrument,
            p.drop_threshold * 100.0,
            p.gain_threshold * 100.0,
            stop,
            s.recovered,
            s.stopped_out,
            s.unresolved,
            r.best.score,
            r.validation.simulation.profit_loss()
        );
    }
    for symbol in &report.filtered_out {
        println!("{symbol:<8} (filtered out)");
    }

    let agg = &report.aggregate;
    println!();
    println!(
        "Instruments:    {} ({} events, {} trades)",
        agg.instruments, agg.events, agg.trades
    );
    println!(
        "Outcomes:       {} recovered, {} stopped, {} unresolved",
        agg.recovered, agg.stopped_out, agg.unresolved
    );
    println!(
        "Total P&L:      {:.2} ({:.2}%)",
        agg.profit_loss,
        agg.return_pct() * 100.0
    );
}

// ─── trace ───────────────────────────────────────────────────────────

fn run_trace(symbol: &str, day: NaiveDate, data: &DataArgs, rule: &RuleArgs) -> Result<()> {
    let params = rule.params()?;
    let provider = build_provider(data)?;
    let series = load_exact(&*provider, symbol, day, day, Interval::Minute)
        .with_context(|| format!("loading {symbol} minute bars"))?;

    let Some(trace) = trace_session(&series, day, &params) else {
        bail!("no intraday bars for {symbol} on {day}");
    };
    print_trace(&trace);
    Ok(())
}

fn print_trace(trace: &SessionTrace) {
    println!();
    println!("=== {} {} ===", trace.instrument, trace.day);
    println!("Session Open:   {:.2}", trace.session_open);
    println!("Drop Level:     {:.2}", trace.drop_level);
    println!("Gain Level:     {:.2}", trace.gain_level);
    if let Some(level) = trace.stop_loss_level {
        println!("Stop Level:     {level:.2}");
    }
    println!();

    let row = |label: &str, point: &Option<TracePoint>| match point {
        Some(p) => println!(
            "{label:<15} {} @ {:.2}",
            p.timestamp.format("%H:%M"),
            p.price
        ),
        None => println!("{label:<15} not reached"),
    };
    row("Drop:", &trace.drop);
    row("Gain:", &trace.gain);
    if trace.stop_loss_level.is_some() {
        row("Stop Loss:", &trace.stop_loss);
    }
}
