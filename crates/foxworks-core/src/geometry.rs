//! Geometry Evaluation
//!
//! Triangle meshes and the evaluator interface that turns an object snapshot
//! into a mesh at a given resolution.

use bitflags::bitflags;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::Aabb;
use crate::snapshot::ObjectSnapshot;

/// Geometry evaluation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("invalid value {value} for parameter '{name}'")]
    InvalidParameter { name: String, value: f64 },

    #[error("invalid resolution {0}")]
    InvalidResolution(f32),

    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

/// Result type for geometry evaluation
pub type GeometryResult<T> = Result<T, GeometryError>;

bitflags! {
    /// Evaluator options
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct MeshFlags: u32 {
        /// Close the open ends of revolved bodies
        const CAPS = 1 << 0;
        /// Average normals across shared vertices instead of faceting
        const SMOOTH_NORMALS = 1 << 1;
    }
}

impl Default for MeshFlags {
    fn default() -> Self {
        Self::CAPS | Self::SMOOTH_NORMALS
    }
}

/// Evaluated triangle mesh. Zero triangles is a valid, empty result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions
    pub vertices: Vec<Vec3>,
    /// Per-vertex normals, parallel to `vertices`
    pub normals: Vec<Vec3>,
    /// Triangle vertex indices
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// True when the mesh has no triangles
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Push a vertex, returning its index
    pub fn push_vertex(&mut self, position: Vec3, normal: Vec3) -> u32 {
        self.vertices.push(position);
        self.normals.push(normal);
        (self.vertices.len() - 1) as u32
    }

    /// Corner positions of triangle `index`
    pub fn triangle_positions(&self, index: usize) -> Option<[Vec3; 3]> {
        let [a, b, c] = *self.triangles.get(index)?;
        Some([
            *self.vertices.get(a as usize)?,
            *self.vertices.get(b as usize)?,
            *self.vertices.get(c as usize)?,
        ])
    }

    /// Bounding box of all vertices
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.vertices)
    }
}

/// Turns object snapshots into triangle meshes.
///
/// `resolution` is an element size: larger values produce coarser meshes.
/// Implementations must be pure and safe to call from any thread.
pub trait GeometryEvaluator: Send + Sync {
    /// Evaluate the snapshot at the given resolution
    fn evaluate(
        &self,
        snapshot: &ObjectSnapshot,
        resolution: f32,
        flags: MeshFlags,
    ) -> GeometryResult<Mesh>;

    /// Get the evaluator name for debugging
    fn name(&self) -> &str {
        "unnamed_evaluator"
    }
}
