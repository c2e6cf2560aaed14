//! Editor tunables.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("invalid editor config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{field} must be positive")]
    NotPositive { field: &'static str },

    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
}

/// Session settings. Every field has a default, so a config file only needs
/// the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum number of history entries kept.
    pub history_depth: usize,
    /// Distance between grid guide lines, in canvas pixels.
    pub grid_spacing: f64,
    pub nudge_step: f64,
    /// Nudge distance with shift held.
    pub nudge_step_large: f64,
    /// Offset applied to both axes when duplicating.
    pub duplicate_offset: f64,
    /// Scale of the preview image stored with a template.
    pub thumbnail_scale: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_depth: 50,
            grid_spacing: 50.0,
            nudge_step: 1.0,
            nudge_step_large: 10.0,
            duplicate_offset: 20.0,
            thumbnail_scale: 0.25,
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("historyDepth", self.history_depth as f64),
            ("gridSpacing", self.grid_spacing),
            ("nudgeStep", self.nudge_step),
            ("nudgeStepLarge", self.nudge_step_large),
            ("thumbnailScale", self.thumbnail_scale),
        ];
        if let Some((field, _)) = checks.into_iter().find(|(_, v)| !(v.is_finite() && *v > 0.0)) {
            return Err(ConfigError::NotPositive { field });
        }
        if !self.duplicate_offset.is_finite() {
            return Err(ConfigError::NotFinite {
                field: "duplicateOffset",
            });
        }
        Ok(())
    }
}
