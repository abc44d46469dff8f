//! Configuration Loader
//!
//! Environment-aware configuration loading. Sources are layered in order:
//! built-in defaults, `robot-states.yaml`, `robot-states.<environment>.yaml`,
//! then `ROBOT_STATES__*` environment variables (`__` separates nested keys, so
//! `ROBOT_STATES__RETRY__MAX_RETRIES=3` sets `retry.max_retries`).

use super::error::{ConfigResult, ConfigurationError};
use super::MissionConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const BASE_CONFIG_NAME: &str = "robot-states";
pub const ENV_PREFIX: &str = "ROBOT_STATES";

pub struct ConfigManager {
    config: MissionConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<ConfigManager> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<ConfigManager> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<ConfigManager> {
        Self::load_from_directory_with_overrides(config_dir, environment, None)
    }

    /// Load with an explicit set of `ROBOT_STATES__*` variables instead of the
    /// process environment. Useful for testing without touching global state.
    pub fn load_from_directory_with_overrides(
        config_dir: Option<PathBuf>,
        environment: &str,
        env_vars: Option<HashMap<String, String>>,
    ) -> ConfigResult<ConfigManager> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config = Self::load_and_merge_config(&config_directory, environment, env_vars)?;
        config.validate()?;

        debug!(
            "Configuration loaded successfully: {}",
            serde_json::to_string_pretty(&config)
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );
        info!(
            environment = %environment,
            max_retries = config.retry.max_retries,
            max_idle_ticks = config.poll.max_idle_ticks,
            "⚙️ CONFIG: loaded"
        );

        Ok(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        })
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &MissionConfig {
        &self.config
    }

    pub fn into_config(self) -> MissionConfig {
        self.config
    }

    /// JSON view of the effective configuration, for diagnostics
    pub fn debug_config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null)
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect current environment from environment variables
    pub fn detect_environment() -> String {
        crate::logging::get_environment()
    }

    fn default_config_directory() -> PathBuf {
        let possible_dirs = [PathBuf::from("config"), PathBuf::from("../config")];

        for dir in possible_dirs {
            if Self::base_config_file(&dir).exists() {
                debug!("Found config directory: {}", dir.display());
                return dir;
            }
        }

        PathBuf::from("config")
    }

    pub fn base_config_file(config_directory: &Path) -> PathBuf {
        config_directory.join(format!("{BASE_CONFIG_NAME}.yaml"))
    }

    pub fn environment_config_file(config_directory: &Path, environment: &str) -> PathBuf {
        config_directory.join(format!("{BASE_CONFIG_NAME}.{environment}.yaml"))
    }

    fn read_layer(path: &Path) -> ConfigResult<String> {
        std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))
    }

    /// Layer defaults, base file, environment file and environment variables
    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
        env_vars: Option<HashMap<String, String>>,
    ) -> ConfigResult<MissionConfig> {
        let base_file = Self::base_config_file(config_directory);
        let env_file = Self::environment_config_file(config_directory, environment);
        let origin = config_directory.display().to_string();

        let defaults = ::config::Config::try_from(&MissionConfig::default())
            .map_err(|e| ConfigurationError::parse_error("<defaults>", e))?;
        let mut builder = ::config::Config::builder().add_source(defaults);

        if base_file.is_file() {
            let contents = Self::read_layer(&base_file)?;
            builder = builder.add_source(::config::File::from_str(&contents, ::config::FileFormat::Yaml));
        } else {
            warn!(
                path = %base_file.display(),
                "base configuration file not found, using built-in defaults"
            );
        }

        if env_file.is_file() {
            debug!(
                "Applying environment-specific overrides for: {}",
                environment
            );
            let contents = Self::read_layer(&env_file)?;
            builder = builder.add_source(::config::File::from_str(&contents, ::config::FileFormat::Yaml));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(env_vars),
        );

        let merged = builder
            .build()
            .map_err(|e| ConfigurationError::parse_error(origin.clone(), e))?;

        merged
            .try_deserialize::<MissionConfig>()
            .map_err(|e| ConfigurationError::parse_error(origin, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_config_yaml() -> &'static str {
        r#"
retry:
  max_retries: 2
poll:
  cadence_ms: 500
selection:
  height_switch: 0.6
detection:
  inspection_poses: [front_left, front_right]
"#
    }

    fn setup_test_config_dir() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let config_dir = temp_dir.path().to_path_buf();
        fs::write(
            ConfigManager::base_config_file(&config_dir),
            create_test_config_yaml(),
        )
        .unwrap();
        (temp_dir, config_dir)
    }

    #[test]
    fn test_basic_config_loading() {
        let (_temp_dir, config_dir) = setup_test_config_dir();
        let manager =
            ConfigManager::load_from_directory_with_overrides(Some(config_dir), "test", Some(HashMap::new()))
                .unwrap();
        let config = manager.config();

        assert_eq!(manager.environment(), "test");
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.poll.cadence_ms, 500);
        // untouched keys keep their defaults
        assert_eq!(config.poll.max_idle_ticks, 10);
        assert_eq!(config.timeouts.door_goal(), Duration::from_secs(20));
        assert_eq!(
            config.detection.inspection_poses,
            vec!["front_left".to_string(), "front_right".to_string()]
        );
    }

    #[test]
    fn test_unreadable_layer_reports_file_read_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_dir = temp_dir.path().to_path_buf();
        // not valid UTF-8
        fs::write(ConfigManager::base_config_file(&config_dir), [0xff, 0xfe, 0xfd]).unwrap();

        let result = ConfigManager::load_from_directory_with_overrides(
            Some(config_dir),
            "test",
            Some(HashMap::new()),
        );

        assert!(matches!(result, Err(ConfigurationError::FileReadError { .. })));
    }

    #[test]
    fn test_environment_specific_overrides() {
        let (_temp_dir, config_dir) = setup_test_config_dir();
        fs::write(
            ConfigManager::environment_config_file(&config_dir, "production"),
            "retry:\n  max_retries: 4\ndelivery:\n  manual_confirmation_fallback: false\n",
        )
        .unwrap();

        let production = ConfigManager::load_from_directory_with_overrides(
            Some(config_dir.clone()),
            "production",
            Some(HashMap::new()),
        )
        .unwrap();
        assert_eq!(production.config().retry.max_retries, 4);
        assert!(!production.config().delivery.manual_confirmation_fallback);
        assert_eq!(production.config().selection.height_switch, 0.6);

        let test = ConfigManager::load_from_directory_with_overrides(
            Some(config_dir),
            "test",
            Some(HashMap::new()),
        )
        .unwrap();
        assert_eq!(test.config().retry.max_retries, 2);
    }

    #[test]
    fn test_environment_variables_override_files() {
        let (_temp_dir, config_dir) = setup_test_config_dir();
        let vars = HashMap::from([
            ("ROBOT_STATES__RETRY__MAX_RETRIES".to_string(), "7".to_string()),
            ("ROBOT_STATES__POLL__MAX_IDLE_TICKS".to_string(), "3".to_string()),
        ]);

        let manager =
            ConfigManager::load_from_directory_with_overrides(Some(config_dir), "test", Some(vars))
                .unwrap();
        assert_eq!(manager.config().retry.max_retries, 7);
        assert_eq!(manager.config().poll.max_idle_ticks, 3);
    }

    #[test]
    fn test_missing_base_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::load_from_directory_with_overrides(
            Some(temp_dir.path().to_path_buf()),
            "development",
            Some(HashMap::new()),
        )
        .unwrap();
        assert_eq!(manager.config(), &MissionConfig::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_dir = temp_dir.path().to_path_buf();
        fs::write(
            ConfigManager::base_config_file(&config_dir),
            "poll:\n  cadence_ms: 0\n",
        )
        .unwrap();

        let result = ConfigManager::load_from_directory_with_overrides(
            Some(config_dir),
            "test",
            Some(HashMap::new()),
        );
        assert!(matches!(result, Err(ConfigurationError::InvalidValue { .. })));
    }

    #[test]
    fn test_malformed_yaml_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_dir = temp_dir.path().to_path_buf();
        fs::write(
            ConfigManager::base_config_file(&config_dir),
            "retry: [unterminated\n",
        )
        .unwrap();

        let result = ConfigManager::load_from_directory_with_overrides(
            Some(config_dir),
            "test",
            Some(HashMap::new()),
        );
        assert!(matches!(result, Err(ConfigurationError::ParseError { .. })));
    }
}
