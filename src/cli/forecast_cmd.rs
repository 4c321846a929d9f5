use anyhow::{bail, Context, Result};
use std::io::Read;

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::cli::renderer;
use crate::core::analysis::analyze;
use crate::core::config::AppConfig;
use crate::core::diag::Diagnostics;
use crate::core::engine::{generate_forecast, ForecastOptions};
use crate::core::models::observation::Observation;
use crate::core::series::build_series;

/// Per-run overrides for the engine options; anything unset falls back
/// to the config file, which falls back to built-in defaults.
#[derive(Debug, Default)]
pub struct ForecastArgs {
    pub input: String,
    pub months: Option<usize>,
    pub horizon: Option<usize>,
    pub levels: Option<String>,
    pub samples: Option<usize>,
    pub seed: Option<u64>,
}

/// Read observations from a JSON file, or stdin when the path is "-".
pub fn read_observations(input: &str) -> Result<Vec<Observation>> {
    let content = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read observations from stdin")?;
        buf
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read observations from {}", input))?
    };

    let observations: Vec<Observation> =
        serde_json::from_str(&content).context("Failed to parse observations JSON")?;

    for (i, obs) in observations.iter().enumerate() {
        if !obs.cost.is_finite() || obs.cost < 0.0 {
            bail!(
                "observation {} ({}, {}): cost must be a non-negative number, got {}",
                i,
                obs.date,
                obs.resource_type,
                obs.cost
            );
        }
    }
    Ok(observations)
}

fn parse_levels(raw: &str) -> Result<Vec<f64>> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid confidence level '{}'", part.trim()))
        })
        .collect()
}

fn build_options(args: &ForecastArgs, config: &AppConfig) -> Result<ForecastOptions> {
    let mut opts = config.forecast.to_options();
    if let Some(months) = args.months {
        opts.lookback_months = months;
    }
    if let Some(horizon) = args.horizon {
        opts.horizon = horizon;
    }
    if let Some(levels) = &args.levels {
        opts.confidence_levels = parse_levels(levels)?;
    }
    if let Some(samples) = args.samples {
        opts.sample_count = samples;
    }
    if let Some(seed) = args.seed {
        opts.seed = seed;
    }
    Ok(opts)
}

fn emit_diagnostics(diag: &Diagnostics, opts: &OutputOptions) {
    if opts.verbose && !diag.is_empty() {
        for note in diag.notes() {
            eprintln!("note: {}", note);
        }
    }
}

pub fn run_forecast(args: &ForecastArgs, opts: &OutputOptions) -> Result<()> {
    let config = AppConfig::load().unwrap_or_default();
    let engine_opts = build_options(args, &config)?;
    let observations = read_observations(&args.input)?;

    let mut diag = Diagnostics::new();
    let report = generate_forecast(&observations, &engine_opts, &mut diag)?;
    emit_diagnostics(&diag, opts);

    match opts.format {
        OutputFormat::Json => {
            let json = if opts.pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!("{}", renderer::render_report(&report, opts.use_color));
        }
    }
    Ok(())
}

pub fn run_analyze(input: &str, months: Option<usize>, opts: &OutputOptions) -> Result<()> {
    let config = AppConfig::load().unwrap_or_default();
    let lookback = months.unwrap_or(config.forecast.lookback_months);
    let observations = read_observations(input)?;

    let mut diag = Diagnostics::new();
    let series = build_series(&observations, lookback)?;
    let analysis = analyze(&series, &observations, &mut diag);
    emit_diagnostics(&diag, opts);

    match opts.format {
        OutputFormat::Json => {
            let json = if opts.pretty {
                serde_json::to_string_pretty(&analysis)?
            } else {
                serde_json::to_string(&analysis)?
            };
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!("{}", renderer::render_analysis(&analysis, opts.use_color));
        }
    }
    Ok(())
}
