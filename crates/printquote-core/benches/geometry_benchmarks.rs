//! Geometry Benchmarks
//!
//! Volume, bounds and overhang classification over UV spheres of growing size

use std::f64::consts::PI;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use printquote_core::mesh::{OverhangConfig, TriangleMesh, analyze_geometry, classify_overhangs};
use printquote_core::math::{DVec3, Orientation};

fn uv_sphere(radius: f64, rings: u32, segments: u32) -> TriangleMesh {
    let point = |ring: u32, segment: u32| {
        let theta = PI * f64::from(ring) / f64::from(rings);
        let phi = 2.0 * PI * f64::from(segment) / f64::from(segments);
        DVec3::new(
            radius * theta.sin() * phi.cos(),
            radius * theta.sin() * phi.sin(),
            radius * theta.cos(),
        )
    };

    let mut triangles = Vec::new();
    for ring in 0..rings {
        for segment in 0..segments {
            let a = point(ring, segment);
            let b = point(ring + 1, segment);
            let c = point(ring + 1, segment + 1);
            let d = point(ring, segment + 1);
            triangles.push([a, b, c]);
            triangles.push([a, c, d]);
        }
    }
    TriangleMesh::from_triangles(triangles)
}

fn bench_analyze_geometry(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze_geometry");
    let orientation = Orientation::from_euler_degrees(30.0, 15.0, 0.0);

    for rings in [16, 64, 256].iter() {
        let mesh = uv_sphere(50.0, *rings, *rings * 2);
        group.bench_with_input(BenchmarkId::from_parameter(mesh.facet_count()), &mesh, |b, mesh| {
            b.iter(|| black_box(analyze_geometry(mesh, &orientation)));
        });
    }

    group.finish();
}

fn bench_classify_overhangs(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_overhangs");
    let orientation = Orientation::from_euler_degrees(30.0, 15.0, 0.0);
    let config = OverhangConfig::default();

    for rings in [16, 64, 256].iter() {
        let mesh = uv_sphere(50.0, *rings, *rings * 2);
        group.bench_with_input(BenchmarkId::from_parameter(mesh.facet_count()), &mesh, |b, mesh| {
            b.iter(|| black_box(classify_overhangs(mesh, &orientation, &config)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_analyze_geometry, bench_classify_overhangs);
criterion_main!(benches);
