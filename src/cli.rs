//! CLI definition and dispatch.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, Level};

use crate::adapters::csv_adapter::CsvDataSource;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report::JsonReport;
use crate::adapters::text_report::TextReport;
use crate::domain::analytics::ResultsRecord;
use crate::domain::config::RunSettings;
use crate::domain::error::QuantsimError;
use crate::domain::scheduler::Backtest;
use crate::domain::sweep::{param_grid, run_sweep};
use crate::ports::data_port::MarketDataSource;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "quantsim", about = "Deterministic bar-by-bar strategy backtester")]
pub struct Cli {
    /// Debug-level logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command that loads a run configuration.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(short, long)]
    pub config: PathBuf,
    /// Directory holding `<INSTRUMENT>.csv` files (overrides `backtest.data_dir`)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Starting cash (overrides `backtest.starting_cash`)
    #[arg(long)]
    pub cash: Option<f64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one backtest and print its results
    Backtest {
        #[command(flatten)]
        run: RunArgs,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check configuration and data without running
    Validate {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Run one backtest per value of a strategy parameter, in parallel
    Sweep {
        #[command(flatten)]
        run: RunArgs,
        /// Strategy parameter to vary, e.g. long_period
        #[arg(long)]
        param: String,
        /// Comma-separated values, e.g. 20,40,60
        #[arg(long, value_delimiter = ',', required = true)]
        values: Vec<String>,
        #[arg(long)]
        json: bool,
    },
}

pub fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    // A subscriber may already be installed (tests call `run` repeatedly).
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = match cli.command {
        Command::Backtest { run, json } => run_backtest(&run, json, &mut out),
        Command::Validate { run } => run_validate(&run, &mut out),
        Command::Sweep {
            run,
            param,
            values,
            json,
        } => run_sweep_command(&run, &param, &values, json, &mut out),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_error(&e),
    }
}

fn report_error(e: &QuantsimError) -> ExitCode {
    eprintln!("error: {}: {}", e.kind(), e);
    e.into()
}

/// Load and validate the INI file, then apply command-line overrides.
pub fn load_settings(args: &RunArgs) -> Result<RunSettings, QuantsimError> {
    info!(config = %args.config.display(), "loading configuration");
    let adapter = FileConfigAdapter::from_file(&args.config)?;
    let mut settings = RunSettings::from_config(&adapter)?;
    settings.data_dir = resolve_data_dir(&args.config, &settings.data_dir);
    if let Some(dir) = &args.data_dir {
        settings.data_dir = dir.clone();
    }
    if let Some(cash) = args.cash {
        settings.set_starting_cash(cash)?;
    }
    Ok(settings)
}

fn data_source(settings: &RunSettings) -> CsvDataSource {
    CsvDataSource::new(&settings.data_dir)
}

/// Load every series and build a ready-to-run backtest.
pub fn prepare(settings: &RunSettings, source: &dyn MarketDataSource) -> Result<Backtest, QuantsimError> {
    let series = settings.load_series(source)?;
    Backtest::new(settings.backtest_config(series)?)
}

fn reporter(json: bool) -> Box<dyn ReportPort> {
    if json {
        Box::new(JsonReport { pretty: true })
    } else {
        Box::new(TextReport)
    }
}

pub fn run_backtest(args: &RunArgs, json: bool, out: &mut dyn Write) -> Result<(), QuantsimError> {
    let settings = load_settings(args)?;
    let backtest = prepare(&settings, &data_source(&settings))?;
    let results = backtest.run()?;
    reporter(json).write(&results, out)
}

pub fn run_validate(args: &RunArgs, out: &mut dyn Write) -> Result<(), QuantsimError> {
    let settings = load_settings(args)?;
    let source = data_source(&settings);
    let backtest = prepare(&settings, &source)?;
    writeln!(
        out,
        "ok: {} strategy over {} ({} aligned bars from {})",
        settings.strategy_kind,
        backtest.instruments().join(", "),
        backtest.aligned_len(),
        source.base_path().display()
    )?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct SweepRow<'a> {
    param: &'a str,
    value: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<&'a ResultsRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run_sweep_command(
    args: &RunArgs,
    param: &str,
    values: &[String],
    json: bool,
    out: &mut dyn Write,
) -> Result<(), QuantsimError> {
    let settings = load_settings(args)?;
    let overrides = param_grid(&settings, param, values)?;
    let base = prepare(&settings, &data_source(&settings))?.config().clone();
    let outcomes = run_sweep(&base, &overrides);

    if json {
        let rows: Vec<SweepRow<'_>> = values
            .iter()
            .zip(&outcomes)
            .map(|(value, outcome)| SweepRow {
                param,
                value,
                results: outcome.as_ref().ok(),
                error: outcome.as_ref().err().map(|e| format!("{}: {}", e.kind(), e)),
            })
            .collect();
        serde_json::to_writer_pretty(&mut *out, &rows)
            .map_err(|e| QuantsimError::Io(io::Error::other(e)))?;
        writeln!(out)?;
    } else {
        for (value, outcome) in values.iter().zip(&outcomes) {
            writeln!(out, "== {} = {}", param, value)?;
            match outcome {
                Ok(results) => TextReport.write(results, out)?,
                Err(e) => writeln!(out, "error: {}: {}", e.kind(), e)?,
            }
        }
    }

    // The first failing case decides the exit code.
    match outcomes.into_iter().find_map(Result::err) {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// A relative `data_dir` from the INI file is taken relative to that file.
pub fn resolve_data_dir(config_path: &Path, data_dir: &Path) -> PathBuf {
    if data_dir.is_absolute() {
        data_dir.to_path_buf()
    } else {
        config_path
            .parent()
            .map(|p| p.join(data_dir))
            .unwrap_or_else(|| data_dir.to_path_buf())
    }
}
