//! Application configuration. Data paths, simulated backend timings and failure rates.

use serde::Deserialize;
use std::time::Duration;

/// Storage key under which filter/sort preferences are persisted.
pub const PREFERENCES_KEY: &str = "sellerConsoleFilters";

pub const DEFAULT_LOAD_DELAY_MS: u64 = 800;
pub const DEFAULT_UPDATE_DELAY_MS: u64 = 500;
pub const DEFAULT_UPDATE_FAILURE_RATE: f64 = 0.2;
pub const DEFAULT_CONVERT_DELAY_MS: u64 = 800;
pub const DEFAULT_CONVERT_FAILURE_RATE: f64 = 0.15;

/// Backend used for preference storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefsBackend {
    #[default]
    Json,
    Sqlite,
    Memory,
}

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Directory for preference files. Read from SELLER_CONSOLE_DATA_DIR.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// `json`, `sqlite` or `memory`. Read from SELLER_CONSOLE_PREFS_BACKEND.
    #[serde(default)]
    pub prefs_backend: Option<PrefsBackend>,

    /// Optional path to a leads JSON file replacing the embedded fixture.
    #[serde(default)]
    pub leads_fixture: Option<String>,

    /// Simulated delay of the initial lead load.
    #[serde(default)]
    pub load_delay_ms: Option<u64>,

    /// Probability in [0, 1] that the initial load fails.
    #[serde(default)]
    pub load_failure_rate: Option<f64>,

    #[serde(default)]
    pub update_delay_ms: Option<u64>,

    #[serde(default)]
    pub update_failure_rate: Option<f64>,

    #[serde(default)]
    pub convert_delay_ms: Option<u64>,

    #[serde(default)]
    pub convert_failure_rate: Option<f64>,

    /// Reject a second mutation on a lead while one is pending.
    #[serde(default)]
    pub guard_in_flight: Option<bool>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        if let Ok(path) = std::env::var("SELLER_CONSOLE_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c = c.add_source(config::Environment::with_prefix("SELLER_CONSOLE").try_parsing(true));
        c.build()?.try_deserialize()
    }

    pub fn data_dir_or_default(&self) -> &str {
        self.data_dir.as_deref().unwrap_or("./data")
    }

    pub fn prefs_backend_or_default(&self) -> PrefsBackend {
        self.prefs_backend.unwrap_or_default()
    }

    pub fn load_delay(&self) -> Duration {
        Duration::from_millis(self.load_delay_ms.unwrap_or(DEFAULT_LOAD_DELAY_MS))
    }

    pub fn load_failure_rate_or_default(&self) -> f64 {
        clamp_rate(self.load_failure_rate.unwrap_or(0.0))
    }

    pub fn update_delay(&self) -> Duration {
        Duration::from_millis(self.update_delay_ms.unwrap_or(DEFAULT_UPDATE_DELAY_MS))
    }

    pub fn update_failure_rate_or_default(&self) -> f64 {
        clamp_rate(self.update_failure_rate.unwrap_or(DEFAULT_UPDATE_FAILURE_RATE))
    }

    pub fn convert_delay(&self) -> Duration {
        Duration::from_millis(self.convert_delay_ms.unwrap_or(DEFAULT_CONVERT_DELAY_MS))
    }

    pub fn convert_failure_rate_or_default(&self) -> f64 {
        clamp_rate(
            self.convert_failure_rate
                .unwrap_or(DEFAULT_CONVERT_FAILURE_RATE),
        )
    }

    pub fn guard_in_flight_or_default(&self) -> bool {
        self.guard_in_flight.unwrap_or(false)
    }
}

/// Rates outside [0, 1] (or NaN) are pinned to the nearest valid value.
pub fn clamp_rate(rate: f64) -> f64 {
    if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_simulated_backend() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.update_delay(), Duration::from_millis(500));
        assert_eq!(cfg.convert_delay(), Duration::from_millis(800));
        assert_eq!(cfg.load_delay(), Duration::from_millis(800));
        assert_eq!(cfg.update_failure_rate_or_default(), 0.2);
        assert_eq!(cfg.convert_failure_rate_or_default(), 0.15);
        assert_eq!(cfg.load_failure_rate_or_default(), 0.0);
        assert_eq!(cfg.prefs_backend_or_default(), PrefsBackend::Json);
        assert!(!cfg.guard_in_flight_or_default());
    }

    #[test]
    fn test_clamp_rate() {
        assert_eq!(clamp_rate(1.5), 1.0);
        assert_eq!(clamp_rate(-0.1), 0.0);
        assert_eq!(clamp_rate(f64::NAN), 0.0);
        assert_eq!(clamp_rate(0.3), 0.3);
    }

    #[test]
    fn test_prefs_backend_from_string() {
        let cfg: AppConfig = serde_json::from_str(r#"{"prefs_backend":"sqlite"}"#).unwrap();
        assert_eq!(cfg.prefs_backend_or_default(), PrefsBackend::Sqlite);
    }
}
