//! # FoxWorks Editor
//!
//! Composition of the vessel object tree with its 3D renderers.
//!
//! ## Features
//! - Tree edits that keep renderers, meshes and transforms in sync
//! - Main-thread event pump for background LOD completions
//! - JSON editor configuration

pub mod view;

pub use view::{VesselView, ViewStats};

use std::path::{Path, PathBuf};
use std::time::Duration;

use foxworks_core::CoreError;
use foxworks_renderer::{RendererConfig, RendererError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Editor errors
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LOD generation did not settle within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Renderer(#[from] RendererError),
}

/// Result type for editor operations
pub type EditorResult<T> = Result<T, EditorError>;

/// Editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Renderer and LOD settings
    pub renderer: RendererConfig,
    /// Interval between event pumps while waiting for LODs, in milliseconds
    pub pump_interval_ms: u64,
}

impl EditorConfig {
    /// Parse a JSON configuration; missing fields take their defaults
    pub fn from_json(json: &str) -> EditorResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.renderer.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> EditorResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| EditorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded editor config from {}", path.display());
        Ok(config)
    }

    /// Serialize as pretty JSON
    pub fn to_json(&self) -> EditorResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn pump_interval(&self) -> Duration {
        Duration::from_millis(self.pump_interval_ms.max(1))
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            renderer: RendererConfig::default(),
            pump_interval_ms: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let json = r#"{
            "renderer": {
                "lod_levels": 2,
                "cutaway": { "normal": [0.0, 1.0, 0.0], "offset": 0.0 }
            }
        }"#;
        let config = EditorConfig::from_json(json).unwrap();
        assert_eq!(config.renderer.lod_levels, 2);
        assert!(config.renderer.cutaway.is_some());
        assert_eq!(config.pump_interval_ms, 5);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = EditorConfig::from_json(r#"{ "renderer": { "lod_levels": 0 } }"#);
        assert!(matches!(
            result,
            Err(EditorError::Renderer(RendererError::InvalidConfig(_)))
        ));
        let result = EditorConfig::from_json(r#"{ "renderer": { "lod_levels": 1000000000 } }"#);
        assert!(result.is_err());
        assert!(matches!(
            EditorConfig::from_json("not json"),
            Err(EditorError::Parse(_))
        ));
    }

    #[test]
    fn test_config_round_trip() {
        let config = EditorConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(EditorConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_missing_config_file() {
        let result = EditorConfig::load("/nonexistent/foxworks.json");
        assert!(matches!(result, Err(EditorError::Io { .. })));
    }
}
