//! # Structured Logging Module
//!
//! Environment-aware structured logging for task-state execution. Console output
//! is human readable by default; `ROBOT_LOG_FORMAT=json` switches to one JSON
//! object per event for log shippers on the robot.

use chrono::Utc;
use std::fmt::Display;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::collaborators::MotionTarget;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    init_structured_logging_with_level(None);
}

/// Initialize structured logging, using `default_level` instead of the
/// environment's level when `RUST_LOG` is not set
pub fn init_structured_logging_with_level(default_level: Option<&str>) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = default_level
            .map(str::to_string)
            .unwrap_or_else(|| get_log_level(&environment));
        let json = use_json_format();

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));
        let layer = if json {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed()
        };

        // An embedding process may already own the global subscriber
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            pid = process::id(),
            environment = %environment,
            format = if json { "json" } else { "pretty" },
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
pub fn get_environment() -> String {
    resolve_environment(std::env::var("ROBOT_ENV").ok(), std::env::var("APP_ENV").ok())
}

/// `ROBOT_ENV` wins over `APP_ENV`; names are case-insensitive
pub fn resolve_environment(robot_env: Option<String>, app_env: Option<String>) -> String {
    robot_env
        .or(app_env)
        .unwrap_or_else(|| "development".to_string())
        .to_lowercase()
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "test" => "debug".to_string(),
        "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

fn use_json_format() -> bool {
    std::env::var("ROBOT_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Log the outcome a task state reported to its orchestrator
pub fn log_state_outcome(state: &str, outcome: &str, retries: Option<u32>, details: Option<&str>) {
    tracing::info!(
        state = %state,
        outcome = %outcome,
        retries = retries,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🤖 STATE_OUTCOME"
    );
}

/// Log a transient failure that a state turned into a `retry` outcome
pub fn log_retry(state: &str, retries: u32, max_retries: u32, reason: &str) {
    tracing::warn!(
        state = %state,
        retries = retries,
        max_retries = max_retries,
        reason = %reason,
        "🔁 RETRY"
    );
}

/// Log a failed collaborator call with the service name and the underlying error text
pub fn log_service_error(service: &str, operation: &str, error: &dyn Display) {
    tracing::error!(
        service = %service,
        operation = %operation,
        error = %error,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ SERVICE_ERROR"
    );
}

/// Log a motion command before it is dispatched
pub fn log_motion_command(group: &str, target: &MotionTarget, blocking: bool) {
    tracing::debug!(
        group = %group,
        target = %target,
        blocking = blocking,
        "🦾 MOTION_COMMAND"
    );
}
