use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sample rate used when no config file overrides it
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;

/// Remote engine configuration parameters
///
/// The credential is deliberately an explicit field handed to the client at
/// construction; there is no process-wide singleton to configure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// API key sent in the `authorization` header; empty means unconfigured
    pub api_key: String,
    /// Base URL of the diarization engine
    pub base_url: String,
    /// Seconds to wait between poll attempts
    pub poll_interval_secs: u64,
    /// Maximum number of poll attempts before giving up
    pub max_poll_attempts: u32,
    /// Smallest encoded payload worth uploading, in bytes
    pub min_audio_bytes: usize,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.assemblyai.com/v2".to_string(),
            poll_interval_secs: 5,
            max_poll_attempts: 60, // ~5 minutes at the default interval
            min_audio_bytes: 16000, // ~0.5s of 16kHz mono PCM
            request_timeout_secs: 120,
        }
    }
}

/// Capture configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Capture sample rate in Hz
    pub sample_rate: u32,
    /// Number of capture channels
    pub channels: u16,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Remote engine configuration
    pub engine: EngineSettings,
    /// Capture configuration
    pub audio: AudioSettings,
}

/// Helper function to read the application configuration
///
/// Falls back to the default configuration when the file is missing or does
/// not parse, logging what happened.
pub fn read_app_config(path: &Path) -> AppConfig {
    match std::fs::read_to_string(path) {
        Ok(config_str) => match toml::from_str(&config_str) {
            Ok(config) => config,
            Err(e) => {
                log::warn!(
                    "Failed to parse {}: {}. Using default configuration.",
                    path.display(),
                    e
                );
                AppConfig::default()
            }
        },
        Err(e) => {
            log::info!(
                "Failed to read {}: {}. Using default configuration.",
                path.display(),
                e
            );
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_a_five_minute_poll_budget() {
        let config = AppConfig::default();
        assert_eq!(config.engine.poll_interval_secs, 5);
        assert_eq!(config.engine.max_poll_attempts, 60);
        assert!(config.engine.api_key.is_empty());
    }

    #[test]
    fn partial_toml_fills_missing_sections_with_defaults() {
        let config: AppConfig =
            toml::from_str("[engine]\napi_key = \"k\"\n").expect("partial config should parse");
        assert_eq!(config.engine.api_key, "k");
        assert_eq!(config.engine.max_poll_attempts, 60);
        assert_eq!(config.audio.sample_rate, DEFAULT_SAMPLE_RATE);
    }
}
