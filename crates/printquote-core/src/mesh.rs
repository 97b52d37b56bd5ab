//! Mesh Geometry Analysis
//!
//! Metric volume, bounding dimensions and per-facet overhang classification
//! computed directly from a triangle soup or an indexed triangle mesh.
//!
//! Volume uses the signed-tetrahedron identity: each facet forms a
//! tetrahedron with the origin and the signed volumes sum to the enclosed
//! volume of a closed, consistently wound surface. Closure is not verified.

use serde::Serialize;

use crate::error::{QuoteError, QuoteResult};
use crate::math::{Aabb, DVec3, Orientation};

/// Facets whose normal is further than this from world up are overhangs.
pub const DEFAULT_OVERHANG_THRESHOLD_DEG: f64 = 151.0;

const MM3_PER_CM3: f64 = 1000.0;

/// Triangulated surface as handed over by a mesh loader.
///
/// Without an index buffer every three consecutive positions form a facet.
/// With one, every three consecutive indices do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    positions: Vec<DVec3>,
    indices: Option<Vec<u32>>,
}

impl TriangleMesh {
    /// Create a mesh from a list of independent triangles
    pub fn from_triangles<I: IntoIterator<Item = [DVec3; 3]>>(triangles: I) -> Self {
        Self {
            positions: triangles.into_iter().flatten().collect(),
            indices: None,
        }
    }

    /// Create a mesh from a shared vertex pool and an index buffer
    pub fn indexed(positions: Vec<DVec3>, indices: Vec<u32>) -> QuoteResult<Self> {
        if indices.len() % 3 != 0 {
            return Err(QuoteError::InvalidMesh(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(QuoteError::InvalidMesh(format!(
                "index {bad} out of range for {} vertices",
                positions.len()
            )));
        }
        Ok(Self {
            positions,
            indices: Some(indices),
        })
    }

    /// Create a mesh from a flat `[x, y, z, x, y, z, ...]` position buffer
    /// and an optional index buffer, the layout mesh loaders hand out.
    pub fn from_buffers(positions: &[f32], indices: Option<&[u32]>) -> QuoteResult<Self> {
        if positions.len() % 3 != 0 {
            return Err(QuoteError::InvalidMesh(format!(
                "position buffer length {} is not a multiple of 3",
                positions.len()
            )));
        }
        let vertices: Vec<DVec3> = positions
            .chunks_exact(3)
            .map(|p| DVec3::new(f64::from(p[0]), f64::from(p[1]), f64::from(p[2])))
            .collect();

        match indices {
            Some(indices) => Self::indexed(vertices, indices.to_vec()),
            None => {
                if vertices.len() % 3 != 0 {
                    return Err(QuoteError::InvalidMesh(format!(
                        "vertex count {} is not a multiple of 3 for a non-indexed mesh",
                        vertices.len()
                    )));
                }
                Ok(Self {
                    positions: vertices,
                    indices: None,
                })
            }
        }
    }

    /// Closed box spanning `min..max` with outward-facing winding
    pub fn cuboid(min: DVec3, max: DVec3) -> Self {
        let corner = |i: u32| {
            DVec3::new(
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            )
        };
        let positions = (0..8).map(corner).collect();
        let indices = vec![
            0, 2, 3, 0, 3, 1, // -Z
            4, 5, 7, 4, 7, 6, // +Z
            0, 1, 5, 0, 5, 4, // -Y
            2, 6, 7, 2, 7, 3, // +Y
            0, 4, 6, 0, 6, 2, // -X
            1, 3, 7, 1, 7, 5, // +X
        ];
        Self {
            positions,
            indices: Some(indices),
        }
    }

    /// Number of facets
    pub fn facet_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.facet_count() == 0
    }

    /// Vertex pool
    pub fn positions(&self) -> &[DVec3] {
        &self.positions
    }

    /// Iterate over facets as corner triples
    pub fn facets(&self) -> impl Iterator<Item = [DVec3; 3]> + '_ {
        let count = self.facet_count();
        (0..count).map(move |facet| match &self.indices {
            Some(indices) => {
                let base = facet * 3;
                [
                    self.positions[indices[base] as usize],
                    self.positions[indices[base + 1] as usize],
                    self.positions[indices[base + 2] as usize],
                ]
            }
            None => {
                let base = facet * 3;
                [
                    self.positions[base],
                    self.positions[base + 1],
                    self.positions[base + 2],
                ]
            }
        })
    }

    /// Copy of this mesh with `f` applied to every vertex
    pub fn map_positions(&self, f: impl Fn(DVec3) -> DVec3) -> Self {
        Self {
            positions: self.positions.iter().map(|&p| f(p)).collect(),
            indices: self.indices.clone(),
        }
    }
}

/// Volume and extents of a mesh instance
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeometryAnalysis {
    /// Enclosed volume in cm³
    pub volume_cm3: f64,
    /// Bounding box size in mm, after orientation
    pub dimensions_mm: DVec3,
    /// Number of facets analyzed
    pub facet_count: usize,
}

impl GeometryAnalysis {
    /// Zero facets, zero volume or a flat bounding box.
    ///
    /// Such a result is structurally valid but must not be priced as a real
    /// model.
    pub fn is_degenerate(&self) -> bool {
        self.facet_count == 0
            || self.volume_cm3 <= 0.0
            || self.dimensions_mm.cmple(DVec3::ZERO).any()
    }
}

/// Signed enclosed volume in mm³.
///
/// Positive for outward winding, negative for an inside-out surface.
pub fn signed_volume_mm3(mesh: &TriangleMesh) -> f64 {
    mesh.facets()
        .map(|[p1, p2, p3]| p1.dot(p2.cross(p3)))
        .sum::<f64>()
        / 6.0
}

/// Bounding box of the mesh after orientation
pub fn oriented_bounds(mesh: &TriangleMesh, orientation: &Orientation) -> Aabb {
    if orientation.is_identity() {
        Aabb::from_points(mesh.positions().iter().copied())
    } else {
        Aabb::from_points(mesh.positions().iter().map(|&p| orientation.apply(p)))
    }
}

/// Compute volume and oriented dimensions.
///
/// An empty mesh yields zero volume and zero dimensions rather than an
/// error; check [`GeometryAnalysis::is_degenerate`].
pub fn analyze_geometry(mesh: &TriangleMesh, orientation: &Orientation) -> GeometryAnalysis {
    let volume_cm3 = signed_volume_mm3(mesh).abs() / MM3_PER_CM3;
    let dimensions_mm = oriented_bounds(mesh, orientation).size();

    log::debug!(
        "analyzed {} facets: {:.3} cm3, {:.2} x {:.2} x {:.2} mm",
        mesh.facet_count(),
        volume_cm3,
        dimensions_mm.x,
        dimensions_mm.y,
        dimensions_mm.z
    );

    GeometryAnalysis {
        volume_cm3,
        dimensions_mm,
        facet_count: mesh.facet_count(),
    }
}

/// Overhang detection settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverhangConfig {
    /// Angle between facet normal and `up` above which a facet overhangs
    pub threshold_deg: f64,
    /// World up direction
    pub up: DVec3,
}

impl Default for OverhangConfig {
    fn default() -> Self {
        Self {
            threshold_deg: DEFAULT_OVERHANG_THRESHOLD_DEG,
            up: DVec3::Z,
        }
    }
}

/// Facet normal from its winding, or `None` for a zero-area facet
fn facet_normal([p1, p2, p3]: [DVec3; 3]) -> Option<DVec3> {
    (p2 - p1).cross(p3 - p1).try_normalize()
}

fn is_overhang(normal: DVec3, orientation: &Orientation, config: &OverhangConfig) -> bool {
    let rotated = orientation.apply(normal);
    rotated.angle_between(config.up).to_degrees() > config.threshold_deg
}

/// Classify every facet as overhanging or not, in facet order.
///
/// Zero-area facets are never overhangs.
pub fn classify_overhangs(
    mesh: &TriangleMesh,
    orientation: &Orientation,
    config: &OverhangConfig,
) -> Vec<bool> {
    mesh.facets()
        .map(|facet| facet_normal(facet).is_some_and(|n| is_overhang(n, orientation, config)))
        .collect()
}

/// Aggregate overhang statistics for a mesh instance
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct OverhangSummary {
    pub facet_count: usize,
    pub overhang_count: usize,
    /// Surface area of overhanging facets in mm²
    pub overhang_area_mm2: f64,
    /// Total surface area in mm²
    pub total_area_mm2: f64,
}

impl OverhangSummary {
    /// Share of the surface area that overhangs, `0.0` for an empty mesh
    pub fn area_fraction(&self) -> f64 {
        if self.total_area_mm2 > 0.0 {
            self.overhang_area_mm2 / self.total_area_mm2
        } else {
            0.0
        }
    }
}

/// Count overhanging facets and their area
pub fn summarize_overhangs(
    mesh: &TriangleMesh,
    orientation: &Orientation,
    config: &OverhangConfig,
) -> OverhangSummary {
    let mut summary = OverhangSummary {
        facet_count: mesh.facet_count(),
        ..OverhangSummary::default()
    };

    for [p1, p2, p3] in mesh.facets() {
        let cross = (p2 - p1).cross(p3 - p1);
        let area = cross.length() * 0.5;
        summary.total_area_mm2 += area;

        if let Some(normal) = cross.try_normalize() {
            if is_overhang(normal, orientation, config) {
                summary.overhang_count += 1;
                summary.overhang_area_mm2 += area;
            }
        }
    }

    summary
}
