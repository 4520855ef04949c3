use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AisError, Result};

pub const DEFAULT_DETECTOR_ENDPOINT: &str = "https://detective.builddev.in/api/detect";

/// Minimum rendered width or height for an image to qualify as a candidate.
pub const DEFAULT_MIN_IMAGE_SIZE: u32 = 150;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Candidate size threshold in logical pixels (width OR height).
    pub min_image_size: u32,
    /// Delay before re-measuring dynamically inserted images, so layout can settle.
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,
    /// Pause inserted between consecutive images of a pass.
    #[serde(with = "humantime_serde")]
    pub inter_image_pause: Duration,
    pub detector: DetectorConfig,
    /// Path of the JSON result store; defaults next to the central config.
    pub store_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub endpoint: String,
    /// JPEG quality for the uploaded copy (1-100).
    pub jpeg_quality: u8,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_DETECTOR_ENDPOINT.to_string(),
            jpeg_quality: 90,
            timeout: Duration::from_secs(30),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_image_size: DEFAULT_MIN_IMAGE_SIZE,
            settle_delay: Duration::from_millis(500),
            inter_image_pause: Duration::from_millis(500),
            detector: DetectorConfig::default(),
            store_path: None,
        }
    }
}

impl Config {
    /// Load config from a TOML file, the central config, or defaults.
    /// Priority: explicit path > ~/.config/ais/config.toml > defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let candidate = path
            .map(Path::to_path_buf)
            .or_else(|| Self::central_config_path().filter(|p| p.exists()));

        let config = match candidate {
            Some(p) => {
                let raw = std::fs::read_to_string(&p).map_err(|e| {
                    AisError::Config(format!("Failed to read config {}: {}", p.display(), e))
                })?;
                toml::from_str(&raw).map_err(|e| {
                    AisError::Config(format!("Invalid config ({}): {}", p.display(), e))
                })?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn central_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ais").join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_image_size == 0 {
            return Err(AisError::config("min_image_size must be positive"));
        }
        if self.detector.jpeg_quality == 0 || self.detector.jpeg_quality > 100 {
            return Err(AisError::config("detector.jpeg_quality must be in 1..=100"));
        }
        Url::parse(&self.detector.endpoint).map_err(|e| {
            AisError::Config(format!(
                "detector.endpoint is not a valid URL ({}): {}",
                self.detector.endpoint, e
            ))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_match_expected() {
        let cfg = Config::default();

        assert_eq!(cfg.min_image_size, 150);
        assert_eq!(cfg.settle_delay, Duration::from_millis(500));
        assert_eq!(cfg.inter_image_pause, Duration::from_millis(500));
        assert_eq!(cfg.detector.endpoint, DEFAULT_DETECTOR_ENDPOINT);
        assert_eq!(cfg.detector.jpeg_quality, 90);
        assert_eq!(cfg.detector.timeout, Duration::from_secs(30));
        cfg.validate().expect("defaults validate");
    }

    #[test]
    fn parses_partial_toml_with_humantime_durations() {
        let cfg: Config = toml::from_str(
            r#"
            min_image_size = 200
            inter_image_pause = "250ms"

            [detector]
            endpoint = "http://localhost:8080/api/detect"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.min_image_size, 200);
        assert_eq!(cfg.inter_image_pause, Duration::from_millis(250));
        // Unset fields keep their defaults.
        assert_eq!(cfg.settle_delay, Duration::from_millis(500));
        assert_eq!(cfg.detector.jpeg_quality, 90);
        assert_eq!(cfg.detector.endpoint, "http://localhost:8080/api/detect");
    }

    #[test]
    fn validate_rejects_zero_threshold_and_bad_quality() {
        let mut cfg = Config {
            min_image_size: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());

        cfg.min_image_size = 150;
        cfg.detector.jpeg_quality = 0;
        assert!(cfg.validate().is_err());

        cfg.detector.jpeg_quality = 101;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_malformed_endpoint() {
        let cfg = Config {
            detector: DetectorConfig {
                endpoint: "not a url".to_string(),
                ..DetectorConfig::default()
            },
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(AisError::Config(_))));
    }
}
