//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report::CsvReport;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::text_report::{self, TextReport};
use crate::domain::benchmark::{leverage_ladder, run_benchmark, strategy_benchmarks, BenchmarkResult};
use crate::domain::config_validation::{
    read_run_settings, read_strategy, read_sweep_settings, validate_run_config, RunSettings,
};
use crate::domain::dataset::load_role_series;
use crate::domain::error::SimError;
use crate::domain::frame::{align, AlignedFrame, AssetRole};
use crate::domain::moving_average::DEFAULT_MA_WINDOW;
use crate::domain::overlap;
use crate::domain::simulation::{simulate, SimulationResult};
use crate::domain::strategy::Strategy;
use crate::domain::sweep::{grid, run_sweep, SweepOutcome};
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PriceSource;
use crate::ports::report_port::{ReportPort, RunReport};

#[derive(Parser, Debug)]
#[command(name = "regimesim", about = "Moving-average regime switching portfolio simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a regime-switching simulation
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of <SYMBOL>.csv files (overrides [data] path)
        #[arg(long)]
        data: Option<PathBuf>,
        /// Daily CSV report (overrides [report] output)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compare buy-and-hold benchmarks at several leverages
    Benchmark {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long, value_delimiter = ',', default_value = "1,2,3")]
        leverages: Vec<f64>,
    },
    /// Measure how often assets share the same side of their moving average
    Overlap {
        #[arg(long)]
        data: PathBuf,
        #[arg(long, value_delimiter = ',', required = true)]
        symbols: Vec<String>,
        #[arg(long, default_value_t = DEFAULT_MA_WINDOW)]
        window: usize,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Run the strategy over a grid of MA windows, leverages and tax rates
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data: Option<PathBuf>,
    },
    /// Validate a configuration file without loading data
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the data range for the configured or given symbols
    Info {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        data: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Simulate {
            config,
            data,
            output,
        } => run_simulate(&config, data.as_deref(), output.as_deref()),
        Command::Benchmark {
            config,
            data,
            leverages,
        } => run_benchmarks(&config, data.as_deref(), &leverages),
        Command::Overlap {
            data,
            symbols,
            window,
            start,
            end,
        } => run_overlap(&data, &symbols, window, start, end),
        Command::Sweep { config, data } => run_sweep_command(&config, data.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info {
            config,
            data,
            symbol,
        } => run_info(config.as_deref(), data.as_deref(), symbol.as_deref()),
        Command::ListSymbols { config, data } => run_list_symbols(config.as_deref(), data.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            if let SimError::AllocationParse { formula, source, .. } = &e {
                eprintln!("{}", source.display_with_context(formula));
            }
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SimError> {
    info!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

/// `--data` wins over `[data] path`.
pub fn resolve_data_path(
    data_override: Option<&Path>,
    config: Option<&dyn ConfigPort>,
) -> Result<PathBuf, SimError> {
    if let Some(p) = data_override {
        return Ok(p.to_path_buf());
    }
    config
        .and_then(|c| c.get_string("data", "path"))
        .map(PathBuf::from)
        .ok_or_else(|| SimError::missing("data", "path"))
}

fn stdout_write(text: &str) -> Result<(), SimError> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Load the series a strategy needs and align them.
pub fn load_frame(
    source: &dyn PriceSource,
    settings: &RunSettings,
    roles: &[AssetRole],
) -> Result<AlignedFrame, SimError> {
    let data = load_role_series(
        source,
        &settings.assets,
        roles,
        settings.start_date,
        settings.end_date,
    )?;
    let frame = align(&data.inputs(), settings.ma_window);
    match (frame.first_date(), frame.last_date()) {
        (Some(first), Some(last)) => info!(
            "Aligned {} rows from {} to {} ({}-day MA)",
            frame.len(),
            first,
            last,
            settings.ma_window
        ),
        _ => warn!("No aligned rows with a full {}-day MA", settings.ma_window),
    }
    Ok(frame)
}

/// Output of the simulate pipeline.
#[derive(Debug)]
pub struct SimulationRun {
    pub strategy: Strategy,
    pub result: SimulationResult,
    pub benchmarks: Vec<BenchmarkResult>,
}

/// Validate, load, align, simulate and benchmark.
pub fn run_simulation_pipeline(
    source: &dyn PriceSource,
    config: &dyn ConfigPort,
) -> Result<SimulationRun, SimError> {
    // Stage 1: read and validate config before touching data
    let settings = read_run_settings(config)?;
    let strategy = read_strategy(config, &settings.assets)?;

    // Stage 2: load prices and align
    let frame = load_frame(source, &settings, &strategy.required_roles())?;

    // Stage 3: simulate
    info!(
        "Running '{}': {:?} classifier, {} switch rule",
        strategy.name, strategy.classifier, strategy.switch_rule
    );
    let result = simulate(&frame, &strategy)?;
    info!(
        "Final value {:.2} after {} switches",
        result.summary.metrics.final_value, result.summary.switches
    );

    // Stage 4: benchmarks over the same frame
    let mut benchmarks = Vec::new();
    if settings.benchmarks {
        for b in strategy_benchmarks(&frame, strategy.risk_leverage(), strategy.returns.direction) {
            benchmarks.push(run_benchmark(
                &frame,
                &b,
                strategy.returns.cash_return,
                strategy.baseline,
                strategy.year_convention,
            )?);
        }
    }

    Ok(SimulationRun {
        strategy,
        result,
        benchmarks,
    })
}

fn run_simulate(
    config_path: &Path,
    data_override: Option<&Path>,
    output_override: Option<&Path>,
) -> Result<(), SimError> {
    let config = load_config(config_path)?;
    validate_run_config(&config)?;
    let source = CsvAdapter::new(resolve_data_path(data_override, Some(&config))?);

    let run = run_simulation_pipeline(&source, &config)?;
    let report = RunReport {
        strategy: &run.strategy,
        result: &run.result,
        benchmarks: &run.benchmarks,
    };

    let mut stdout = io::stdout().lock();
    TextReport.write(&report, &mut stdout)?;
    stdout.flush()?;

    let output = output_override
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("report", "output").map(PathBuf::from));
    if let Some(path) = output {
        let mut file = BufWriter::new(File::create(&path)?);
        CsvReport.write(&report, &mut file)?;
        file.flush()?;
        info!("Daily report written to {}", path.display());
    }
    Ok(())
}

fn run_benchmarks(
    config_path: &Path,
    data_override: Option<&Path>,
    leverages: &[f64],
) -> Result<(), SimError> {
    if let Some(bad) = leverages.iter().find(|l| !l.is_finite() || **l <= 0.0) {
        return Err(SimError::invalid("benchmark", "leverages", format!("{bad} is not positive")));
    }
    let config = load_config(config_path)?;
    let settings = read_run_settings(&config)?;
    let strategy = read_strategy(&config, &settings.assets)?;
    let source = CsvAdapter::new(resolve_data_path(data_override, Some(&config))?);

    let mut roles = vec![AssetRole::Risk];
    if settings.assets.symbol(AssetRole::Hedge).is_some() {
        roles.push(AssetRole::Hedge);
    }
    let frame = load_frame(&source, &settings, &roles)?;

    let mut results = Vec::new();
    for b in leverage_ladder(&frame, leverages) {
        results.push(run_benchmark(
            &frame,
            &b,
            strategy.returns.cash_return,
            strategy.baseline,
            strategy.year_convention,
        )?);
    }
    stdout_write(&text_report::render_benchmarks(&results))
}

fn run_overlap(
    data: &Path,
    symbols: &[String],
    window: usize,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), SimError> {
    if window < 1 {
        return Err(SimError::invalid("overlap", "window", "window must be at least 1"));
    }
    let source = CsvAdapter::new(data.to_path_buf());
    let start = start.unwrap_or(NaiveDate::MIN);
    let end = end.unwrap_or(NaiveDate::MAX);

    let mut series = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let s = source.fetch_closes(symbol, start, end)?;
        if s.is_empty() {
            return Err(SimError::NoData {
                symbol: symbol.clone(),
            });
        }
        info!("Loaded {} prices for {}", s.len(), symbol);
        series.push(s);
    }

    let report = overlap::analyze(&series, window);
    stdout_write(&text_report::render_overlap(&report))
}

/// Validate, load every series once, then run the grid in parallel.
pub fn run_sweep_pipeline(
    source: &dyn PriceSource,
    config: &dyn ConfigPort,
) -> Result<Vec<SweepOutcome>, SimError> {
    let settings = read_run_settings(config)?;
    let strategy = read_strategy(config, &settings.assets)?;
    let sweep = read_sweep_settings(config, &settings, &strategy)?;

    let data = load_role_series(
        source,
        &settings.assets,
        &strategy.required_roles(),
        settings.start_date,
        settings.end_date,
    )?;
    let points = grid(&sweep.ma_windows, &sweep.leverages, &sweep.tax_rates);
    info!("Sweeping {} parameter combinations", points.len());

    let outcomes = run_sweep(&data, &strategy, &points);
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        warn!("{} of {} sweep runs failed", failed, outcomes.len());
    }
    Ok(outcomes)
}

fn run_sweep_command(config_path: &Path, data_override: Option<&Path>) -> Result<(), SimError> {
    let config = load_config(config_path)?;
    validate_run_config(&config)?;
    let source = CsvAdapter::new(resolve_data_path(data_override, Some(&config))?);
    let outcomes = run_sweep_pipeline(&source, &config)?;
    stdout_write(&text_report::render_sweep(&outcomes))
}

fn run_validate(config_path: &Path) -> Result<(), SimError> {
    let config = load_config(config_path)?;
    validate_run_config(&config)?;

    let settings = read_run_settings(&config)?;
    let strategy = read_strategy(&config, &settings.assets)?;

    let mut out = String::new();
    out.push_str(&format!("Strategy:    {}\n", strategy.name));
    out.push_str(&format!("MA window:   {}\n", settings.ma_window));
    out.push_str(&format!("Switch rule: {}\n", strategy.switch_rule));
    out.push_str("Assets:\n");
    for role in settings.assets.roles() {
        if let Some(symbol) = settings.assets.symbol(role) {
            out.push_str(&format!("  {:<17} {}\n", role.config_key(), symbol));
        }
    }
    out.push_str("Allocations:\n");
    for regime in strategy.classifier.regimes() {
        let formula = strategy
            .allocations
            .get(*regime)
            .map(|a| a.to_string())
            .unwrap_or_else(|| "flat".to_string());
        out.push_str(&format!("  {:<22} {}\n", regime.label(), formula));
    }
    if let Some(tilt) = &strategy.tilt {
        out.push_str(&format!(
            "Tilt:        {:.0}% at {}x while above its MA\n",
            tilt.weight * 100.0,
            tilt.leverage
        ));
    }
    out.push_str("\nConfiguration is valid.\n");
    stdout_write(&out)
}

fn run_info(
    config_path: Option<&Path>,
    data_override: Option<&Path>,
    symbol: Option<&str>,
) -> Result<(), SimError> {
    let config = config_path.map(load_config).transpose()?;
    let config_ref = config.as_ref().map(|c| c as &dyn ConfigPort);
    let source = CsvAdapter::new(resolve_data_path(data_override, config_ref)?);

    let symbols: Vec<String> = match (symbol, config_ref) {
        (Some(s), _) => vec![s.to_string()],
        (None, Some(cfg)) => {
            let mut configured: Vec<String> = Vec::new();
            for role in AssetRole::ALL {
                if let Some(s) = cfg.get_string("assets", role.config_key()) {
                    if !configured.contains(&s) {
                        configured.push(s);
                    }
                }
            }
            configured
        }
        (None, None) => source.list_symbols()?,
    };

    let mut out = String::new();
    for s in &symbols {
        match source.data_range(s) {
            Ok(Some((first, last, count))) => {
                out.push_str(&format!("{}: {} prices, {} to {}\n", s, count, first, last));
            }
            Ok(None) => out.push_str(&format!("{}: no data found\n", s)),
            Err(e) => warn!("error querying {}: {}", s, e),
        }
    }
    stdout_write(&out)
}

fn run_list_symbols(config_path: Option<&Path>, data_override: Option<&Path>) -> Result<(), SimError> {
    let config = config_path.map(load_config).transpose()?;
    let config_ref = config.as_ref().map(|c| c as &dyn ConfigPort);
    let source = CsvAdapter::new(resolve_data_path(data_override, config_ref)?);

    let symbols = source.list_symbols()?;
    if symbols.is_empty() {
        warn!("No symbols found");
    } else {
        info!("{} symbols found", symbols.len());
    }
    let mut out = String::new();
    for s in &symbols {
        out.push_str(s);
        out.push('\n');
    }
    stdout_write(&out)
}
