//! Displayable Meshes
//!
//! GPU-facing geometry accumulated from evaluated LOD meshes. A displayable
//! mesh is rebuilt from scratch whenever its source changes.

use foxworks_core::Mesh;
use glam::Vec3;

use crate::CutawayPlane;
use crate::material::Material;

/// Triangles of one LOD level drawn with one material
#[derive(Debug, Clone, PartialEq)]
pub struct LodBatch {
    /// LOD level, 0 is the finest
    pub lod: usize,
    /// Batch material
    pub material: Material,
    /// Triangle indices into the shared vertex buffer
    pub indices: Vec<u32>,
}

impl LodBatch {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Accumulated vertex, normal and per-LOD index buffers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayableMesh {
    vertices: Vec<Vec3>,
    normals: Vec<Vec3>,
    batches: Vec<LodBatch>,
    finished: bool,
}

impl DisplayableMesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all geometry
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.normals.clear();
        self.batches.clear();
        self.finished = false;
    }

    /// Append an evaluated mesh as LOD `lod`.
    ///
    /// A mesh without triangles, or whose triangles are all removed by the
    /// cutaway, is stored as one degenerate triangle so no level is ever
    /// drawn with zero primitives. `None` (level not available) adds nothing.
    pub fn add_lod(
        &mut self,
        lod: usize,
        mesh: Option<&Mesh>,
        material: Material,
        cutaway: Option<&CutawayPlane>,
    ) {
        let Some(mesh) = mesh else {
            return;
        };
        if mesh.is_empty() {
            self.add_placeholder(lod);
            return;
        }

        let first_vertex = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&mesh.vertices);
        self.normals.extend_from_slice(&mesh.normals);
        self.normals.resize(self.vertices.len(), Vec3::ZERO);

        let mut indices = Vec::with_capacity(mesh.triangle_count() * 3);
        for (index, triangle) in mesh.triangles.iter().enumerate() {
            if let Some(plane) = cutaway {
                let kept = mesh
                    .triangle_positions(index)
                    .is_some_and(|corners| corners.iter().all(|&c| plane.keeps(c)));
                if !kept {
                    continue;
                }
            }
            indices.extend(triangle.iter().map(|&i| i + first_vertex));
        }

        if indices.is_empty() {
            indices.extend([first_vertex; 3]);
        }
        self.batches.push(LodBatch {
            lod,
            material,
            indices,
        });
    }

    fn add_placeholder(&mut self, lod: usize) {
        let vertex = self.vertices.len() as u32;
        self.vertices.push(Vec3::ZERO);
        self.normals.push(Vec3::ZERO);
        self.batches.push(LodBatch {
            lod,
            material: Material::DEFAULT,
            indices: vec![vertex; 3],
        });
    }

    /// Mark the buffers complete and ready for upload
    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn batches(&self) -> &[LodBatch] {
        &self.batches
    }

    /// Batches of one LOD level
    pub fn lod_batches(&self, lod: usize) -> impl Iterator<Item = &LodBatch> {
        self.batches.iter().filter(move |b| b.lod == lod)
    }

    /// Triangles stored for one LOD level
    pub fn triangle_count(&self, lod: usize) -> usize {
        self.lod_batches(lod).map(LodBatch::triangle_count).sum()
    }

    /// Triangles across all levels
    pub fn total_triangle_count(&self) -> usize {
        self.batches.iter().map(LodBatch::triangle_count).sum()
    }

    /// Number of distinct LOD levels with geometry
    pub fn lod_count(&self) -> usize {
        let mut levels: Vec<usize> = self.batches.iter().map(|b| b.lod).collect();
        levels.sort_unstable();
        levels.dedup();
        levels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_triangles() -> Mesh {
        let mut mesh = Mesh::new();
        let a = mesh.push_vertex(Vec3::new(0.0, 1.0, 0.0), Vec3::Z);
        let b = mesh.push_vertex(Vec3::new(1.0, 1.0, 0.0), Vec3::Z);
        let c = mesh.push_vertex(Vec3::new(0.0, 2.0, 0.0), Vec3::Z);
        let d = mesh.push_vertex(Vec3::new(0.0, -1.0, 0.0), Vec3::Z);
        mesh.triangles.push([a, b, c]);
        mesh.triangles.push([a, b, d]);
        mesh
    }

    #[test]
    fn test_empty_mesh_becomes_one_degenerate_triangle() {
        let mut displayable = DisplayableMesh::new();
        displayable.add_lod(2, Some(&Mesh::new()), Material::FUEL, None);

        assert_eq!(displayable.triangle_count(2), 1);
        let batch = displayable.lod_batches(2).next().unwrap();
        let [a, b, c] = [batch.indices[0], batch.indices[1], batch.indices[2]];
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(displayable.vertices()[a as usize], Vec3::ZERO);
    }

    #[test]
    fn test_missing_level_adds_nothing() {
        let mut displayable = DisplayableMesh::new();
        displayable.add_lod(0, None, Material::DEFAULT, None);
        assert_eq!(displayable.total_triangle_count(), 0);
        assert_eq!(displayable.lod_count(), 0);
    }

    #[test]
    fn test_indices_offset_per_level() {
        let mesh = two_triangles();
        let mut displayable = DisplayableMesh::new();
        displayable.add_lod(0, Some(&mesh), Material::DEFAULT, None);
        displayable.add_lod(1, Some(&mesh), Material::DEFAULT, None);
        displayable.finish();

        assert!(displayable.is_finished());
        assert_eq!(displayable.vertices().len(), 8);
        assert_eq!(displayable.normals().len(), 8);
        assert_eq!(displayable.lod_count(), 2);
        assert_eq!(displayable.triangle_count(0), 2);
        let second = displayable.lod_batches(1).next().unwrap();
        assert_eq!(&second.indices[..3], &[4, 5, 6]);
    }

    #[test]
    fn test_cutaway_filters_triangles() {
        let mesh = two_triangles();
        let plane = CutawayPlane::upper_half();
        let mut displayable = DisplayableMesh::new();
        displayable.add_lod(0, Some(&mesh), Material::DEFAULT, Some(&plane));
        assert_eq!(displayable.triangle_count(0), 1);
    }

    #[test]
    fn test_fully_cut_level_keeps_placeholder() {
        let mesh = two_triangles();
        let plane = CutawayPlane {
            normal: Vec3::Y,
            offset: 10.0,
        };
        let mut displayable = DisplayableMesh::new();
        displayable.add_lod(0, Some(&mesh), Material::DEFAULT, Some(&plane));
        assert_eq!(displayable.triangle_count(0), 1);
    }

    #[test]
    fn test_clear() {
        let mut displayable = DisplayableMesh::new();
        displayable.add_lod(0, Some(&two_triangles()), Material::DEFAULT, None);
        displayable.finish();
        displayable.clear();
        assert!(displayable.vertices().is_empty());
        assert!(!displayable.is_finished());
        assert_eq!(displayable.total_triangle_count(), 0);
    }
}
