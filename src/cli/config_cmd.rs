use anyhow::Result;

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::core::config::AppConfig;

pub fn init(_opts: &OutputOptions) -> Result<()> {
    let path = AppConfig::config_path();
    if path.exists() {
        eprintln!("Config file already exists at {}", path.display());
        eprintln!("Remove it first if you want to regenerate.");
        return Ok(());
    }

    let config = AppConfig::default();
    match config.save() {
        Ok(path) => {
            println!("Generated config at {}", path.display());
            println!(
                "  lookback {} months, horizon {} months, {} bootstrap samples",
                config.forecast.lookback_months,
                config.forecast.horizon,
                config.forecast.sample_count
            );
        }
        Err(e) => {
            eprintln!("Failed to generate config: {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}

pub fn check(_opts: &OutputOptions) -> Result<()> {
    let path = AppConfig::config_path();
    if !path.exists() {
        eprintln!("No config file found at {}", path.display());
        eprintln!("Run `cct config init` to create one.");
        return Ok(());
    }

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let issues = config.validate();
    if issues.is_empty() {
        println!("Config is valid: {}", path.display());
        println!(
            "  lookback {} months, horizon {} months, levels {:?}",
            config.forecast.lookback_months,
            config.forecast.horizon,
            config.forecast.confidence_levels
        );
    } else {
        eprintln!("Config issues found in {}:", path.display());
        for issue in &issues {
            eprintln!("  - {}", issue);
        }
        std::process::exit(1);
    }
    Ok(())
}

pub fn show(opts: &OutputOptions) -> Result<()> {
    let config = AppConfig::load().unwrap_or_default();
    match opts.format {
        OutputFormat::Json => {
            let json = if opts.pretty {
                serde_json::to_string_pretty(&config)?
            } else {
                serde_json::to_string(&config)?
            };
            println!("{}", json);
        }
        OutputFormat::Text => {
            let toml = toml::to_string_pretty(&config)
                .unwrap_or_else(|_| "# failed to render config".to_string());
            print!("{}", toml);
        }
    }
    Ok(())
}
