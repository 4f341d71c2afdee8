#![forbid(unsafe_code)]

mod demo;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{Level as TraceLevel, info, warn};
use tracing_subscriber::FmtSubscriber;

use property_group::ConfigManager;
use property_group::constants::logging;

use demo::{DemoConfig, DemoSettings};

/// Headless settings dialog: load, edit, then OK or Cancel
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Config file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Edit a setting, e.g. --set appearance.theme=dark (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    edits: Vec<String>,

    /// Discard the edits instead of applying them
    #[arg(long)]
    cancel: bool,

    /// Apply the edits but do not write the config file
    #[arg(long)]
    dry_run: bool,
}

fn init_logging() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var(logging::LEVEL_ENV)
        .unwrap_or_else(|_| logging::DEFAULT_LEVEL.to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")
}

fn main() -> Result<()> {
    init_logging()?;
    let args = Args::parse();

    let path = args
        .config
        .clone()
        .unwrap_or_else(ConfigManager::<DemoConfig>::default_path);
    let mut settings = DemoSettings::new()?;
    let mut manager = ConfigManager::new(DemoConfig::default());

    let existed = manager
        .load_or_default(&path, &mut settings)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    info!(path = %path.display(), existed, "Settings loaded");

    // loaded values become the committed baseline
    settings
        .dialog
        .apply()
        .context("Failed to commit loaded settings")?;
    settings.log_commits()?;

    for edit in &args.edits {
        settings.edit(edit)?;
    }

    println!("Settings{}:", if settings.dialog.is_changed() { " (modified)" } else { "" });
    print!("{}", settings.describe());

    if args.cancel {
        settings.dialog.cancel();
        println!("Edits discarded");
        return Ok(());
    }

    settings
        .dialog
        .ok()
        .context("Failed to apply settings")?;

    if args.dry_run {
        warn!("Dry run, not writing {}", path.display());
        return Ok(());
    }

    if existed || !args.edits.is_empty() {
        manager
            .save(&settings)
            .with_context(|| format!("Failed to save settings to {}", path.display()))?;
        println!("Saved {}", path.display());
    }
    Ok(())
}
