//! # FoxWorks Renderer
//!
//! Render-side state for vessel objects in the 3D viewport.
//!
//! ## Features
//! - Background LOD mesh generation with restart-on-change
//! - Displayable meshes rebuilt from completed LOD sets
//! - Instance registry keyed by stable identity
//! - Parent-first world transform propagation through the object tree

pub mod collection;
pub mod events;
pub mod lod;
pub mod material;
pub mod mesh;
pub mod object_renderer;

pub use collection::{Instance, InstanceId, RenderCollection};
pub use events::{EventQueue, EventSender, RenderEvent};
pub use lod::{GeneratorId, LodGenerator, LodSet};
pub use material::Material;
pub use mesh::{DisplayableMesh, LodBatch};
pub use object_renderer::{ObjectRenderer, RendererRegistry};

use std::time::Duration;

use foxworks_core::{CoreError, MeshFlags};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on LOD levels per object
pub const MAX_LOD_LEVELS: usize = 16;

/// Renderer errors
#[derive(Error, Debug)]
pub enum RendererError {
    #[error("invalid renderer configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for renderer operations
pub type RendererResult<T> = Result<T, RendererError>;

/// Plane splitting the model for a cutaway view.
///
/// Triangles are drawn only when all three corners lie strictly on the
/// side the normal points to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutawayPlane {
    /// Plane normal, towards the kept half
    pub normal: Vec3,
    /// Signed distance of the plane from the origin along `normal`
    pub offset: f32,
}

impl CutawayPlane {
    /// Keep everything above the XZ plane
    pub fn upper_half() -> Self {
        Self {
            normal: Vec3::Y,
            offset: 0.0,
        }
    }

    /// Check if a point is on the kept side
    pub fn keeps(&self, point: Vec3) -> bool {
        self.normal.dot(point) > self.offset
    }
}

/// Renderer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Number of LOD levels generated per object
    pub lod_levels: usize,
    /// Resolution of the finest level
    pub base_resolution: f32,
    /// Resolution added per coarser level
    pub resolution_step: f32,
    /// Flags passed to the geometry evaluator
    pub mesh_flags: MeshFlags,
    /// Idle poll interval of the LOD worker in milliseconds
    pub poll_interval_ms: u64,
    /// Optional cutaway applied when building displayable meshes
    pub cutaway: Option<CutawayPlane>,
    /// Evaluate the coarsest level on the calling thread after each edit
    /// instead of showing the last completed set. Blocks for one evaluation.
    pub quick_preview: bool,
}

impl RendererConfig {
    /// Resolution of LOD `level`, where level 0 is the finest.
    ///
    /// Resolution is an element size, so it grows towards coarser levels.
    pub fn lod_resolution(&self, level: usize) -> f32 {
        self.base_resolution + self.resolution_step * level as f32
    }

    /// Resolution of the coarsest level
    pub fn coarsest_resolution(&self) -> f32 {
        self.lod_resolution(self.lod_levels.saturating_sub(1))
    }

    /// Idle poll interval of the LOD worker
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Check the configuration for values the pipeline cannot use
    pub fn validate(&self) -> RendererResult<()> {
        if self.lod_levels == 0 {
            return Err(RendererError::InvalidConfig(
                "lod_levels must be at least 1".to_string(),
            ));
        }
        if self.lod_levels > MAX_LOD_LEVELS {
            return Err(RendererError::InvalidConfig(format!(
                "lod_levels must be at most {}, got {}",
                MAX_LOD_LEVELS, self.lod_levels
            )));
        }
        if !self.base_resolution.is_finite() || self.base_resolution <= 0.0 {
            return Err(RendererError::InvalidConfig(format!(
                "base_resolution must be positive, got {}",
                self.base_resolution
            )));
        }
        if !self.resolution_step.is_finite() || self.resolution_step <= 0.0 {
            return Err(RendererError::InvalidConfig(format!(
                "resolution_step must be positive, got {}",
                self.resolution_step
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(RendererError::InvalidConfig(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            lod_levels: 6,
            base_resolution: 32.0,
            resolution_step: 32.0,
            mesh_flags: MeshFlags::default(),
            poll_interval_ms: 100,
            cutaway: None,
            quick_preview: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RendererConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lod_levels, 6);
        assert_eq!(config.coarsest_resolution(), 192.0);
    }

    #[test]
    fn test_resolution_grows_towards_coarsest() {
        let config = RendererConfig::default();
        for level in 1..config.lod_levels {
            assert!(config.lod_resolution(level) > config.lod_resolution(level - 1));
        }
        assert_eq!(config.lod_resolution(0), 32.0);
    }

    #[test]
    fn test_invalid_configs() {
        let config = RendererConfig {
            lod_levels: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RendererError::InvalidConfig(_))));

        let config = RendererConfig {
            lod_levels: MAX_LOD_LEVELS + 1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RendererError::InvalidConfig(_))));

        let config = RendererConfig {
            lod_levels: MAX_LOD_LEVELS,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = RendererConfig {
            resolution_step: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cutaway_plane() {
        let plane = CutawayPlane::upper_half();
        assert!(plane.keeps(Vec3::new(0.0, 0.5, 0.0)));
        assert!(!plane.keeps(Vec3::new(3.0, 0.0, 1.0)));
        assert!(!plane.keeps(Vec3::new(0.0, -1.0, 0.0)));
    }

    #[test]
    fn test_config_json_defaults() {
        let config: RendererConfig = serde_json::from_str(r#"{ "lod_levels": 3 }"#).unwrap();
        assert_eq!(config.lod_levels, 3);
        assert_eq!(config.base_resolution, 32.0);
        assert!(config.cutaway.is_none());
        assert!(!config.quick_preview);
    }
}
