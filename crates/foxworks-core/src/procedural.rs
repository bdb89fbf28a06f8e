//! Procedural Geometry
//!
//! Built-in evaluator producing bodies of revolution about the +X axis from
//! the `length`, `radius`, `radius1` and `radius2` object parameters.

use std::f32::consts::TAU;

use glam::Vec3;

use crate::geometry::{GeometryError, GeometryEvaluator, GeometryResult, Mesh, MeshFlags};
use crate::snapshot::ObjectSnapshot;

/// Segment budget around the axis at unit resolution
const DETAIL: f32 = 1024.0;
const MIN_SEGMENTS: u32 = 3;
const MAX_SEGMENTS: u32 = 512;

/// Evaluates cylinders and truncated cones.
///
/// Objects without any dimension parameter evaluate to an empty mesh.
#[derive(Debug, Clone, Copy, Default)]
pub struct RevolvedBodyEvaluator;

impl RevolvedBodyEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Segments around the axis for a resolution; coarser resolutions use fewer
    pub fn segments_for(resolution: f32) -> u32 {
        ((DETAIL / resolution).round() as u32).clamp(MIN_SEGMENTS, MAX_SEGMENTS)
    }

    fn dimension(snapshot: &ObjectSnapshot, name: &str) -> GeometryResult<Option<f32>> {
        match snapshot.float(name) {
            None => Ok(None),
            Some(value) if value.is_finite() && value >= 0.0 => Ok(Some(value as f32)),
            Some(value) => Err(GeometryError::InvalidParameter {
                name: name.to_string(),
                value,
            }),
        }
    }
}

impl GeometryEvaluator for RevolvedBodyEvaluator {
    fn evaluate(
        &self,
        snapshot: &ObjectSnapshot,
        resolution: f32,
        flags: MeshFlags,
    ) -> GeometryResult<Mesh> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(GeometryError::InvalidResolution(resolution));
        }

        let length = Self::dimension(snapshot, "length")?;
        let radius = Self::dimension(snapshot, "radius")?;
        let radius1 = Self::dimension(snapshot, "radius1")?.or(radius);
        let radius2 = Self::dimension(snapshot, "radius2")?.or(radius1);
        if length.is_none() && radius1.is_none() {
            return Ok(Mesh::new());
        }

        let length = length.unwrap_or(0.0);
        let (r1, r2) = (radius1.unwrap_or(0.0), radius2.unwrap_or(0.0));
        if length == 0.0 && r1 == 0.0 && r2 == 0.0 {
            return Ok(Mesh::new());
        }

        let segments = Self::segments_for(resolution);
        let mut mesh = Mesh::new();
        if length > 0.0 {
            build_side(&mut mesh, length, r1, r2, segments);
        }
        if flags.contains(MeshFlags::CAPS) {
            build_cap(&mut mesh, 0.0, r1, -Vec3::X, segments);
            build_cap(&mut mesh, length, r2, Vec3::X, segments);
        }

        if flags.contains(MeshFlags::SMOOTH_NORMALS) {
            Ok(mesh)
        } else {
            Ok(facet(&mesh))
        }
    }

    fn name(&self) -> &str {
        "revolved_body"
    }
}

fn ring_point(x: f32, radius: f32, angle: f32) -> Vec3 {
    Vec3::new(x, radius * angle.cos(), radius * angle.sin())
}

fn build_side(mesh: &mut Mesh, length: f32, r1: f32, r2: f32, segments: u32) {
    let rings = (segments / 4).max(1);
    let slope = (r1 - r2) / length;
    let base = mesh.vertex_count() as u32;

    for ring in 0..=rings {
        let t = ring as f32 / rings as f32;
        let x = t * length;
        let radius = r1 + (r2 - r1) * t;
        for segment in 0..segments {
            let angle = TAU * segment as f32 / segments as f32;
            let normal = Vec3::new(slope, angle.cos(), angle.sin()).normalize_or_zero();
            mesh.push_vertex(ring_point(x, radius, angle), normal);
        }
    }

    for ring in 0..rings {
        for segment in 0..segments {
            let next = (segment + 1) % segments;
            let a = base + ring * segments + segment;
            let b = base + ring * segments + next;
            let c = base + (ring + 1) * segments + segment;
            let d = base + (ring + 1) * segments + next;
            mesh.triangles.push([a, c, b]);
            mesh.triangles.push([b, c, d]);
        }
    }
}

fn build_cap(mesh: &mut Mesh, x: f32, radius: f32, normal: Vec3, segments: u32) {
    if radius <= 0.0 {
        return;
    }
    let center = mesh.push_vertex(Vec3::new(x, 0.0, 0.0), normal);
    let rim = mesh.vertex_count() as u32;
    for segment in 0..segments {
        let angle = TAU * segment as f32 / segments as f32;
        mesh.push_vertex(ring_point(x, radius, angle), normal);
    }
    for segment in 0..segments {
        let a = rim + segment;
        let b = rim + (segment + 1) % segments;
        if normal.x < 0.0 {
            mesh.triangles.push([center, b, a]);
        } else {
            mesh.triangles.push([center, a, b]);
        }
    }
}

/// Split shared vertices so every triangle carries its face normal
fn facet(mesh: &Mesh) -> Mesh {
    let mut faceted = Mesh::new();
    for index in 0..mesh.triangle_count() {
        let Some([a, b, c]) = mesh.triangle_positions(index) else {
            continue;
        };
        let normal = (b - a).cross(c - a).normalize_or_zero();
        let ia = faceted.push_vertex(a, normal);
        let ib = faceted.push_vertex(b, normal);
        let ic = faceted.push_vertex(c, normal);
        faceted.triangles.push([ia, ib, ic]);
    }
    faceted
}
