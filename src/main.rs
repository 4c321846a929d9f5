mod cli;
mod core;

use clap::{Parser, Subcommand};

use crate::cli::forecast_cmd::ForecastArgs;
use crate::cli::output::OutputOptions;
use crate::core::config::AppConfig;

#[derive(Parser)]
#[command(name = "cct", about = "Cloud spend analysis and forecasting CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Shorthand for --format json
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Print degraded-statistic notes to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast future spend from a history of cost observations
    Forecast {
        /// Observations JSON file ("-" for stdin)
        #[arg(short, long)]
        input: String,

        /// Lookback window in months
        #[arg(short, long)]
        months: Option<usize>,

        /// Forecast horizon in months
        #[arg(long)]
        horizon: Option<usize>,

        /// Comma-separated confidence levels (e.g. 0.95,0.8)
        #[arg(long)]
        levels: Option<String>,

        /// Bootstrap samples per forecast period
        #[arg(long)]
        samples: Option<usize>,

        /// Random seed for the ensemble
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Analyze historical spend without forecasting
    Analyze {
        /// Observations JSON file ("-" for stdin)
        #[arg(short, long)]
        input: String,

        /// Lookback window in months
        #[arg(short, long)]
        months: Option<usize>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Generate default config file
    Init,
    /// Validate config file
    Check,
    /// Print the effective configuration
    Show,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = AppConfig::load().map(|c| c.settings).unwrap_or_default();
    let output_opts = OutputOptions::resolve(
        &settings,
        cli.format.as_deref(),
        cli.json,
        cli.pretty,
        cli.no_color,
        cli.verbose,
    );

    match cli.command {
        Commands::Forecast {
            input,
            months,
            horizon,
            levels,
            samples,
            seed,
        } => {
            let args = ForecastArgs {
                input,
                months,
                horizon,
                levels,
                samples,
                seed,
            };
            cli::forecast_cmd::run_forecast(&args, &output_opts)?;
        }
        Commands::Analyze { input, months } => {
            cli::forecast_cmd::run_analyze(&input, months, &output_opts)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Init => cli::config_cmd::init(&output_opts)?,
            ConfigAction::Check => cli::config_cmd::check(&output_opts)?,
            ConfigAction::Show => cli::config_cmd::show(&output_opts)?,
        },
    }

    Ok(())
}
