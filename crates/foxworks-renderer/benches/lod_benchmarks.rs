//! LOD Benchmarks
//!
//! Geometry evaluation per level and displayable mesh assembly

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use foxworks_core::{
    GeometryEvaluator, MeshFlags, ObjectSnapshot, ObjectTree, ObjectType, RevolvedBodyEvaluator,
};
use foxworks_renderer::{CutawayPlane, DisplayableMesh, Material, RendererConfig};

fn tank_snapshot() -> ObjectSnapshot {
    let mut tree = ObjectTree::new();
    let tank = tree
        .add_object(None, "Tank", ObjectType::FuelTank)
        .expect("add tank");
    tree.set_parameter(tank, "length", 6.0).expect("set length");
    tree.set_parameter(tank, "radius1", 1.5).expect("set radius1");
    tree.set_parameter(tank, "radius2", 1.0).expect("set radius2");
    ObjectSnapshot::capture(tree.get(tank).expect("tank exists"))
}

fn bench_evaluate_levels(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_level");
    let config = RendererConfig::default();
    let snapshot = tank_snapshot();
    let evaluator = RevolvedBodyEvaluator::new();

    for level in 0..config.lod_levels {
        let resolution = config.lod_resolution(level);
        group.bench_with_input(BenchmarkId::from_parameter(level), &resolution, |b, &res| {
            b.iter(|| {
                let mesh = evaluator
                    .evaluate(&snapshot, res, MeshFlags::default())
                    .expect("evaluate");
                black_box(mesh.triangle_count())
            });
        });
    }

    group.finish();
}

fn bench_assemble_displayable(c: &mut Criterion) {
    let config = RendererConfig::default();
    let snapshot = tank_snapshot();
    let evaluator = RevolvedBodyEvaluator::new();
    let meshes: Vec<_> = (0..config.lod_levels)
        .map(|level| {
            evaluator
                .evaluate(&snapshot, config.lod_resolution(level), config.mesh_flags)
                .expect("evaluate")
        })
        .collect();

    c.bench_function("assemble_all_levels", |b| {
        b.iter(|| {
            let mut displayable = DisplayableMesh::new();
            for (lod, mesh) in meshes.iter().enumerate() {
                displayable.add_lod(lod, Some(mesh), Material::FUEL, None);
            }
            displayable.finish();
            black_box(displayable.total_triangle_count())
        });
    });

    let plane = CutawayPlane::upper_half();
    c.bench_function("assemble_all_levels_cutaway", |b| {
        b.iter(|| {
            let mut displayable = DisplayableMesh::new();
            for (lod, mesh) in meshes.iter().enumerate() {
                displayable.add_lod(lod, Some(mesh), Material::FUEL, Some(&plane));
            }
            displayable.finish();
            black_box(displayable.total_triangle_count())
        });
    });
}

criterion_group!(benches, bench_evaluate_levels, bench_assemble_displayable);

criterion_main!(benches);
