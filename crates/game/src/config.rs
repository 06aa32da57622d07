use retkit_kernel::SchedulerConfig;
use retkit_render::Batch;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Canvas, batch and timing settings. Missing JSON fields take defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Logical canvas width in pixels.
    pub width: u32,
    pub height: u32,
    /// Physical pixels per logical pixel.
    pub scale: u32,
    /// Quads per batch.
    pub batch_capacity: usize,
    pub scheduler: SchedulerConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 200,
            scale: 2,
            batch_capacity: 4096,
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl GameConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_reader(std::fs::File::open(path.as_ref())?)?;
        config.validate()?;
        tracing::debug!(path = %path.as_ref().display(), "config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 || self.scale == 0 {
            return Err(ConfigError::Invalid(format!(
                "canvas {}x{} at scale {} has no pixels",
                self.width, self.height, self.scale
            )));
        }
        if self.width.checked_mul(self.scale).is_none()
            || self.height.checked_mul(self.scale).is_none()
        {
            return Err(ConfigError::Invalid(format!(
                "canvas {}x{} at scale {} overflows the viewport",
                self.width, self.height, self.scale
            )));
        }
        if self.batch_capacity == 0 {
            return Err(ConfigError::Invalid("batch capacity must be at least 1".into()));
        }
        Batch::check_capacity(self.batch_capacity)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.scheduler
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    /// Physical output size: the canvas at its display scale.
    pub fn viewport(&self) -> (u32, u32) {
        (
            self.width.saturating_mul(self.scale),
            self.height.saturating_mul(self.scale),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_canvas() {
        let c = GameConfig::default();
        assert_eq!((c.width, c.height, c.scale), (320, 200, 2));
        assert_eq!(c.batch_capacity, 4096);
        assert_eq!(c.viewport(), (640, 400));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c = GameConfig::from_json(r#"{ "scale": 3, "scheduler": { "fixed_delta": 0.01 } }"#)
            .unwrap();
        assert_eq!(c.scale, 3);
        assert_eq!(c.width, 320);
        assert_eq!(c.scheduler.fixed_delta, 0.01);
        assert_eq!(c.scheduler.max_frame_time, 0.25);
    }

    #[test]
    fn oversized_batch_is_invalid() {
        let err = GameConfig::from_json(r#"{ "batch_capacity": 16385 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(GameConfig::from_json(r#"{ "batch_capacity": 16384 }"#).is_ok());
    }

    #[test]
    fn bad_scheduler_and_canvas_are_invalid() {
        assert!(matches!(
            GameConfig::from_json(r#"{ "scheduler": { "fixed_delta": 0.0 } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            GameConfig::from_json(r#"{ "width": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn viewport_overflow_is_invalid() {
        assert!(matches!(
            GameConfig::from_json(r#"{ "width": 70000, "height": 200, "scale": 70000 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            GameConfig::from_json(r#"{ "height": 70000, "scale": 70000 }"#),
            Err(ConfigError::Invalid(_))
        ));
        let huge = GameConfig {
            width: u32::MAX,
            scale: 2,
            ..GameConfig::default()
        };
        assert_eq!(huge.viewport(), (u32::MAX, 400));
    }

    #[test]
    fn malformed_json_and_missing_file() {
        assert!(matches!(GameConfig::from_json("{"), Err(ConfigError::Json(_))));
        assert!(matches!(
            GameConfig::load("/nonexistent/retkit.json"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let path = std::env::temp_dir().join(format!("retkit-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "width": 160, "height": 100 }"#).unwrap();
        let c = GameConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(c.viewport(), (320, 200));
    }
}
