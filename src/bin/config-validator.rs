//! # Robot States Configuration Validator
//!
//! Command-line tool for validating mission configuration files across
//! environments before a mission is started.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use robot_task_states::config::loader::BASE_CONFIG_NAME;
use robot_task_states::config::{ConfigManager, MissionConfig};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use robot_task_states::logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate robot task-state configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment to validate (development, test, production, ...)
    #[arg(short, long, default_value = "development")]
    environment: String,

    /// Configuration directory path (default: config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate the effective configuration of one environment
    All,

    /// Print the effective configuration as JSON
    Show,

    /// List environments with an override file
    Environments,

    /// Compare the effective configurations of two environments
    Compare {
        /// Base environment for comparison
        #[arg(short, long, default_value = "development")]
        base: String,

        /// Target environment for comparison
        #[arg(short, long)]
        target: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    logging::init_structured_logging_with_level(Some(level));

    let result = match &cli.command {
        Some(Commands::All) | None => validate_all_config(&cli),
        Some(Commands::Show) => show_config(&cli),
        Some(Commands::Environments) => list_environments(&cli),
        Some(Commands::Compare { base, target }) => compare_configs(&cli, base, target),
    };

    match result {
        Ok(()) => {
            info!("Configuration validation completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration validation failed: {:#}", e);
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
    }
}

fn load(cli: &Cli, environment: &str) -> Result<ConfigManager> {
    ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), environment)
        .with_context(|| format!("loading configuration for environment '{environment}'"))
}

fn validate_all_config(cli: &Cli) -> Result<()> {
    println!("🔧 Validating Robot States Configuration");
    println!("Environment: {}", cli.environment);

    let manager = load(cli, &cli.environment)?;
    println!("Config Directory: {}", manager.config_directory().display());
    println!("✅ Configuration loaded and validated");
    println!();

    let config = manager.config();
    report_retry(config);
    report_polling(config);
    report_delivery(config);
    report_detection(config);

    println!("\n🎉 All configuration validation checks passed!");
    Ok(())
}

fn report_retry(config: &MissionConfig) {
    println!("🔁 Retry");
    println!("   ✅ max_retries: {}", config.retry.max_retries);
}

fn report_polling(config: &MissionConfig) {
    let budget = config.approach_budget();
    println!("⏱️  Approach polling");
    println!("   ✅ cadence: {:?}", budget.cadence);
    println!("   ✅ idle budget: {} ticks", config.poll.max_idle_ticks);
}

fn report_delivery(config: &MissionConfig) {
    println!("📦 Delivery");
    println!("   ✅ deadline: {:?}", Duration::from_millis(config.delivery.deadline_ms));
    if config.delivery.manual_confirmation_fallback {
        println!("   ℹ️  Manual confirmation fallback enabled");
    } else {
        println!("   ℹ️  Manual confirmation fallback disabled");
    }
}

fn report_detection(config: &MissionConfig) {
    println!("👀 Detection");
    println!(
        "   ✅ inspection poses: {}",
        config.detection.inspection_poses.join(", ")
    );
    println!(
        "   ✅ max distance: {} m, grasp height switch: {} m",
        config.selection.max_detection_distance, config.selection.height_switch
    );
}

fn show_config(cli: &Cli) -> Result<()> {
    let manager = load(cli, &cli.environment)?;
    println!("{}", serde_json::to_string_pretty(&manager.debug_config())?);
    Ok(())
}

fn list_environments(cli: &Cli) -> Result<()> {
    println!("📋 Available Environments:");

    let config_dir = cli.config_dir.clone().unwrap_or_else(|| PathBuf::from("config"));
    let environments = discover_environments(&config_dir)?;

    if environments.is_empty() {
        println!("  (no environment override files in {})", config_dir.display());
    }
    for env in environments {
        println!("  • {env}");
    }
    Ok(())
}

/// Environment names taken from `robot-states.<environment>.yaml` files
fn discover_environments(config_dir: &Path) -> Result<Vec<String>> {
    if !config_dir.exists() {
        bail!("configuration directory not found: {}", config_dir.display());
    }

    let prefix = format!("{BASE_CONFIG_NAME}.");
    let mut environments = Vec::new();
    for entry in std::fs::read_dir(config_dir)? {
        let name = entry?.file_name();
        let name = name.to_string_lossy();
        if let Some(env) = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(".yaml"))
        {
            environments.push(env.to_string());
        }
    }
    environments.sort();
    Ok(environments)
}

fn compare_configs(cli: &Cli, base: &str, target: &str) -> Result<()> {
    println!("🔍 Comparing Configurations: {base} vs {target}");

    let base_values = flatten(&load(cli, base)?.debug_config());
    let target_values = flatten(&load(cli, target)?.debug_config());

    let mut keys: Vec<_> = base_values.keys().chain(target_values.keys()).collect();
    keys.sort();
    keys.dedup();

    let mut differences = 0;
    for key in keys {
        let left = base_values.get(key);
        let right = target_values.get(key);
        if left != right {
            differences += 1;
            println!(
                "  {key}: {} -> {}",
                left.map_or("<unset>", String::as_str),
                right.map_or("<unset>", String::as_str)
            );
        }
    }

    if differences == 0 {
        println!("✅ No differences");
    }
    Ok(())
}

/// Dotted-path view of a JSON document
fn flatten(value: &serde_json::Value) -> HashMap<String, String> {
    fn walk(prefix: &str, value: &serde_json::Value, out: &mut HashMap<String, String>) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, child) in map {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    walk(&path, child, out);
                }
            }
            other => {
                out.insert(prefix.to_string(), other.to_string());
            }
        }
    }

    let mut out = HashMap::new();
    walk("", value, &mut out);
    out
}
