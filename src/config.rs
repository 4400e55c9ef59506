//! Configuration for the Synheart Mood Engine.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the mood engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model-building parameters
    pub model: ModelConfig,

    /// Root for models, raw-day spool and transparency stats
    pub data_path: PathBuf,

    /// IANA timezone used to decide what "yesterday" means
    pub timezone: String,

    /// Default forecast horizon for inference (minutes)
    pub forecast_minutes: u32,

    /// Port for the HTTP server
    pub server_port: u16,

    /// Worker threads for multi-user builds
    pub build_workers: usize,

    /// Upstream raw-data service (if any)
    pub upstream: Option<UpstreamSettings>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("synheart-mood-engine");

        Self {
            model: ModelConfig::default(),
            data_path: data_dir,
            timezone: "UTC".to_string(),
            forecast_minutes: 30,
            server_port: 3000,
            build_workers: 4,
            upstream: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("synheart-mood-engine")
            .join("config.json")
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.model.validate()?;
        self.tz()?;
        if self.build_workers == 0 {
            return Err(ConfigError::Invalid(
                "build_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parsed timezone.
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| ConfigError::Invalid(format!("unknown timezone '{}': {e}", self.timezone)))
    }

    /// Calendar day before `now` in the configured timezone.
    pub fn day_before(&self, now: DateTime<Utc>) -> NaiveDate {
        let tz = self.tz().unwrap_or(Tz::UTC);
        let today = now.with_timezone(&tz).date_naive();
        today.pred_opt().unwrap_or(today)
    }

    /// Directory holding persisted daily models.
    pub fn models_path(&self) -> PathBuf {
        self.data_path.join("models")
    }

    /// Directory holding raw day files.
    pub fn raw_path(&self) -> PathBuf {
        self.data_path.join("raw")
    }

    /// File holding transparency statistics.
    pub fn transparency_path(&self) -> PathBuf {
        self.data_path.join("transparency.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(self.models_path())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(self.raw_path())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// How forecasts at horizons beyond one step are obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizonPolicy {
    /// Estimate each configured horizon from the label sequence; powers of the
    /// one-step matrix only for horizons that were not estimated.
    #[default]
    Direct,
    /// Estimate only the one-step matrix and raise it to the needed power.
    MatrixPower,
}

/// Parameters of the daily model build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Minutes between slots
    pub slot_minutes: u32,
    /// Slots per window
    pub window_length: usize,
    /// Number of states (K)
    pub clusters: usize,
    /// Assignment/update rounds of the clusterer
    pub max_iterations: usize,
    /// Refinement passes per barycenter update
    pub barycenter_iterations: usize,
    /// Sakoe-Chiba band radius (slots)
    pub warping_radius: usize,
    /// Seed for deterministic initialisation
    pub seed: u64,
    /// Step horizons estimated at build time
    pub horizons: Vec<usize>,
    /// Trailing frames averaged into each endpoint mean
    pub endpoint_tail: usize,
    pub horizon_policy: HorizonPolicy,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            slot_minutes: 10,
            window_length: 24,
            clusters: 5,
            max_iterations: 5,
            barycenter_iterations: 3,
            warping_radius: 2,
            seed: 42,
            horizons: vec![1, 3],
            endpoint_tail: 3,
            horizon_policy: HorizonPolicy::Direct,
        }
    }
}

impl ModelConfig {
    /// Slots in one full day at this cadence.
    pub fn slots_per_day(&self) -> usize {
        if self.slot_minutes == 0 {
            return 0;
        }
        (24 * 60 / self.slot_minutes) as usize
    }

    /// Horizons that a build estimates directly, sorted and de-duplicated.
    pub fn estimated_horizons(&self) -> Vec<usize> {
        let mut horizons = vec![1];
        if self.horizon_policy == HorizonPolicy::Direct {
            horizons.extend(self.horizons.iter().copied());
        }
        horizons.sort_unstable();
        horizons.dedup();
        horizons
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slot_minutes == 0 {
            return Err(ConfigError::Invalid("slot_minutes must be positive".to_string()));
        }
        if self.window_length == 0 {
            return Err(ConfigError::Invalid("window_length must be positive".to_string()));
        }
        if self.clusters == 0 {
            return Err(ConfigError::Invalid("clusters must be positive".to_string()));
        }
        if self.endpoint_tail == 0 || self.endpoint_tail > self.window_length {
            return Err(ConfigError::Invalid(format!(
                "endpoint_tail must be within 1..={}",
                self.window_length
            )));
        }
        if self.horizons.is_empty() || self.horizons.contains(&0) {
            return Err(ConfigError::Invalid(
                "horizons must be a non-empty list of positive step counts".to_string(),
            ));
        }
        Ok(())
    }
}

/// Connection settings for the upstream raw-data service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamSettings {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
}

fn default_upstream_timeout() -> u64 {
    5
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.slot_minutes, 10);
        assert_eq!(config.model.window_length, 24);
        assert_eq!(config.model.clusters, 5);
        assert_eq!(config.model.slots_per_day(), 144);
        assert_eq!(config.forecast_minutes, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_estimated_horizons() {
        let mut model = ModelConfig {
            horizons: vec![3, 1, 6, 3],
            ..Default::default()
        };
        assert_eq!(model.estimated_horizons(), vec![1, 3, 6]);

        model.horizon_policy = HorizonPolicy::MatrixPower;
        assert_eq!(model.estimated_horizons(), vec![1]);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.model.endpoint_tail = 30;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.model.horizons = vec![];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.timezone = "Mars/Olympus_Mons".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.timezone = "Asia/Seoul".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_file() {
        let path = std::env::temp_dir()
            .join(format!("mood-config-{}", uuid::Uuid::new_v4()))
            .join("config.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"timezone": "Asia/Seoul", "model": {"clusters": 3, "horizon_policy": "matrix_power"}}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.timezone, "Asia/Seoul");
        assert_eq!(config.model.clusters, 3);
        assert_eq!(config.model.window_length, 24);
        assert_eq!(config.model.horizon_policy, HorizonPolicy::MatrixPower);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir()
            .join(format!("mood-config-{}", uuid::Uuid::new_v4()))
            .join("config.json");
        let mut config = Config::default();
        config.upstream = Some(UpstreamSettings {
            base_url: "http://127.0.0.1:9000".to_string(),
            token: None,
            timeout_secs: 5,
        });
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.upstream, config.upstream);
        assert_eq!(loaded.model, config.model);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
