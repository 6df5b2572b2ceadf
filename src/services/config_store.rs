// Configuration Storage Service
// Handles config file read/write; every field falls back to a default

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub version: String,
    /// `name[:model]` used for generation when no override is given.
    #[serde(default)]
    pub generator: Option<String>,
    /// `name[:model]` used for refinement; falls back to the generator.
    #[serde(default)]
    pub refiner: Option<String>,
    /// `name[:model]` used for the internal analysis.
    #[serde(default)]
    pub analyzer: Option<String>,
    #[serde(default)]
    pub refine: RefineConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineConfig {
    #[serde(default = "default_target_score")]
    pub target_score: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,
    #[serde(default = "default_analysis_timeout_ms")]
    pub analysis_timeout_ms: u64,
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    #[serde(default = "default_generation_temperature")]
    pub generation_temperature: f64,
    #[serde(default = "default_refinement_temperature")]
    pub refinement_temperature: f64,
    /// Refined text shorter than this fraction of its input is discarded.
    #[serde(default = "default_min_length_ratio")]
    pub min_length_ratio: f64,
    #[serde(default = "default_top_deviations")]
    pub top_deviations: usize,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            target_score: default_target_score(),
            max_iterations: default_max_iterations(),
            retry_attempts: default_retry_attempts(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            analysis_timeout_ms: default_analysis_timeout_ms(),
            call_timeout_ms: default_call_timeout_ms(),
            generation_temperature: default_generation_temperature(),
            refinement_temperature: default_refinement_temperature(),
            min_length_ratio: default_min_length_ratio(),
            top_deviations: default_top_deviations(),
        }
    }
}

impl RefineConfig {
    pub fn retry_initial_delay(&self) -> Duration {
        Duration::from_millis(self.retry_initial_delay_ms)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_millis(self.analysis_timeout_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_detector_min_chars")]
    pub min_chars: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            url: None,
            min_chars: default_detector_min_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
}

fn default_target_score() -> f64 { 92.0 }
fn default_max_iterations() -> u32 { 3 }
fn default_retry_attempts() -> u32 { 3 }
fn default_retry_initial_delay_ms() -> u64 { 1_000 }
fn default_analysis_timeout_ms() -> u64 { 90_000 }
fn default_call_timeout_ms() -> u64 { 120_000 }
fn default_generation_temperature() -> f64 { 0.9 }
fn default_refinement_temperature() -> f64 { 0.8 }
fn default_min_length_ratio() -> f64 { 0.5 }
fn default_top_deviations() -> usize { 3 }
fn default_cache_capacity() -> usize { 100 }
fn default_cache_ttl_secs() -> u64 { 600 }
fn default_detector_min_chars() -> usize { 50 }

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("humanizer"))
    }

    pub fn config_file(&self) -> &PathBuf {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), String> {
        fs::create_dir_all(&self.config_dir)
            .map_err(|e| format!("Failed to create config dir: {}", e))
    }

    /// Load configuration from file
    pub fn load(&self) -> Result<AppConfig, String> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), String> {
        self.ensure_dir()?;

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(&self.config_file, content)
            .map_err(|e| format!("Failed to write config: {}", e))
    }

    /// Store provider API key in config file
    pub fn set_api_key(&self, provider: &str, key: &str) -> Result<(), String> {
        let mut config = self.load()?;
        config.api_keys.insert(provider.to_string(), key.to_string());
        self.save(&config)
    }
}

/// Load the config at `HUMANIZER_CONFIG_DIR` or the platform default,
/// falling back to built-in defaults when it is missing or unreadable.
pub fn load_or_default() -> AppConfig {
    let dir = match std::env::var("HUMANIZER_CONFIG_DIR") {
        Ok(p) if !p.trim().is_empty() => Some(PathBuf::from(p)),
        _ => ConfigStore::default_config_dir(),
    };
    let Some(dir) = dir else {
        return AppConfig::default();
    };

    match ConfigStore::new(dir).load() {
        Ok(config) => config,
        Err(e) => {
            warn!("[CONFIG] {}; using defaults", e);
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.refine.target_score, 92.0);
        assert_eq!(config.refine.max_iterations, 3);
        assert_eq!(config.refine.analysis_timeout(), Duration::from_secs(90));
        assert_eq!(config.cache.capacity, 100);
        assert_eq!(config.detector.min_chars, 50);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{"refine": {"targetScore": 80, "maxIterations": 5}, "generator": "openai:gpt-4o"}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.refine.target_score, 80.0);
        assert_eq!(config.refine.max_iterations, 5);
        assert_eq!(config.refine.retry_attempts, 3);
        assert_eq!(config.refine.min_length_ratio, 0.5);
        assert_eq!(config.generator.as_deref(), Some("openai:gpt-4o"));
        assert_eq!(config.cache.ttl_secs, 600);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("humanizer"));
        assert_eq!(store.load().unwrap().refine.target_score, 92.0);

        store.set_api_key("openai", "sk-test").unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.api_keys.get("openai").map(String::as_str), Some("sk-test"));
        assert!(store.config_file().exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        fs::write(store.config_file(), "{not json").unwrap();
        assert!(store.load().is_err());
    }
}
