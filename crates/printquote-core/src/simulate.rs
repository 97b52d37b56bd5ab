//! Print Simulator
//!
//! Layer-based estimate of print duration and filament mass. Every layer is
//! treated as the same rectangular silhouette: perimeter from the bounding
//! box footprint, area from the average cross-section `volume / height`.
//! No toolpaths are generated.

use serde::Serialize;

use crate::error::{QuoteError, QuoteResult, ensure_percent};
use crate::flow::{line_width, speed_scaling_factor};
use crate::math::DVec3;
use crate::settings::{MaterialProfile, ProcessParameters, ProcessSettings};

const MM3_PER_CM3: f64 = 1000.0;
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Absorbs float noise such as `1.2 / 0.1 = 12.000000000000002` before rounding
/// solid layer counts up.
const LAYER_COUNT_EPSILON: f64 = 1e-9;

/// Estimated time and material for one copy of a part
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationResult {
    pub time_hours: f64,
    pub material_grams: f64,
    pub speed_scaling_factor: f64,
}

/// Every intermediate quantity of a simulation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationBreakdown {
    pub line_width_mm: f64,
    pub layer_count: f64,
    /// Average cross-sectional area per layer in mm²
    pub layer_area_mm2: f64,
    pub perimeter_mm: f64,

    pub wall_path_mm: f64,
    pub infill_path_mm: f64,
    pub solid_path_mm: f64,
    /// Solid layers at top and bottom combined
    pub top_bottom_layers: u32,

    pub wall_time_s: f64,
    pub infill_time_s: f64,
    pub top_bottom_time_s: f64,
    pub travel_time_s: f64,
    pub support_time_s: f64,
    /// After acceleration overhead and material speed modifier
    pub total_time_s: f64,

    pub wall_volume_mm3: f64,
    pub infill_volume_mm3: f64,
    pub top_bottom_volume_mm3: f64,
    pub support_volume_cm3: f64,

    pub result: SimulationResult,
}

/// Estimate time and material for one copy.
///
/// `volume_cm3` and `dimensions_mm` come from geometry analysis; either
/// being absent fails with [`QuoteError::MissingGeometry`].
/// `support_percent` is the external support-overhead estimate in `0..=100`.
pub fn simulate_print(
    volume_cm3: Option<f64>,
    dimensions_mm: Option<DVec3>,
    material: &MaterialProfile,
    params: &ProcessParameters,
    settings: &ProcessSettings,
    support_percent: f64,
) -> QuoteResult<SimulationResult> {
    simulate_print_detailed(volume_cm3, dimensions_mm, material, params, settings, support_percent)
        .map(|breakdown| breakdown.result)
}

/// Same as [`simulate_print`], keeping every intermediate quantity
pub fn simulate_print_detailed(
    volume_cm3: Option<f64>,
    dimensions_mm: Option<DVec3>,
    material: &MaterialProfile,
    params: &ProcessParameters,
    settings: &ProcessSettings,
    support_percent: f64,
) -> QuoteResult<SimulationBreakdown> {
    let (Some(volume_cm3), Some(dimensions)) = (volume_cm3, dimensions_mm) else {
        return Err(QuoteError::MissingGeometry);
    };
    if !(volume_cm3.is_finite() && volume_cm3 > 0.0) {
        return Err(QuoteError::DegenerateMesh(format!("volume is {volume_cm3} cm3")));
    }
    if !dimensions.is_finite() || dimensions.cmplt(DVec3::ZERO).any() || dimensions.z <= 0.0 {
        return Err(QuoteError::DegenerateMesh(format!(
            "bounding box is {:.3} x {:.3} x {:.3} mm",
            dimensions.x, dimensions.y, dimensions.z
        )));
    }
    params.validate()?;
    settings.validate()?;
    material.validate()?;
    ensure_percent("support_percent", support_percent)?;

    let scaling = speed_scaling_factor(
        params.nozzle_diameter_mm,
        params.layer_height_mm,
        settings.infill_speed_mm_s,
        material.max_flow_rate_mm3_s,
    )?;

    // Layer geometry
    let width = line_width(params.nozzle_diameter_mm);
    let layer_height = params.layer_height_mm;
    let layer_count = dimensions.z / layer_height;
    let layer_area = volume_cm3 * MM3_PER_CM3 / dimensions.z;
    let perimeter = 2.0 * (dimensions.x + dimensions.y);
    let walls = f64::from(params.wall_count);

    // Per-layer paths
    let wall_path = perimeter * walls;
    let wall_area = wall_path * width;
    let infill_area = (layer_area - wall_area).max(0.0);
    let infill_path = infill_area * (params.infill_percent / 100.0) / width;
    let top_bottom_thickness = params.nozzle_diameter_mm * walls;
    let layers_per_side = (top_bottom_thickness / layer_height - LAYER_COUNT_EPSILON)
        .ceil()
        .max(0.0);
    let top_bottom_layers = layers_per_side as u32 * 2;
    let solid_layers = f64::from(top_bottom_layers);
    let solid_path = layer_area / width;

    // Time
    let wall_speed = settings.wall_speed_mm_s * scaling;
    let infill_speed = settings.infill_speed_mm_s * scaling;
    let top_bottom_speed = settings.top_bottom_speed_mm_s * scaling;

    let wall_time = wall_path * layer_count / wall_speed;
    let infill_time = infill_path * layer_count / infill_speed;
    let top_bottom_time = solid_path * solid_layers / top_bottom_speed;
    let travel_path = layer_count * settings.travel_fraction * (dimensions.x + dimensions.y);
    let travel_time = travel_path / settings.travel_speed_mm_s;
    let extrusion_time = wall_time + infill_time + top_bottom_time;
    let support_time = extrusion_time * support_percent / 100.0;

    let total_time = (extrusion_time + travel_time + support_time)
        * settings.acceleration_overhead_factor
        * material.time_multiplier();

    // Material
    let wall_volume = wall_path * width * layer_height * layer_count;
    let infill_volume = infill_path * width * layer_height * layer_count;
    let top_bottom_volume = solid_path * width * layer_height * solid_layers;
    let support_volume_cm3 = volume_cm3 * support_percent / 100.0;
    let extruded_volume_cm3 = (wall_volume + infill_volume + top_bottom_volume) / MM3_PER_CM3;
    let total_volume_cm3 = extruded_volume_cm3 + support_volume_cm3;
    let material_grams = total_volume_cm3 * material.density_g_cm3;

    let result = SimulationResult {
        time_hours: total_time / SECONDS_PER_HOUR,
        material_grams,
        speed_scaling_factor: scaling,
    };

    log::debug!(
        "{layer_count:.0} layers, {top_bottom_layers} solid, scaling {scaling:.3}: {:.2} h {:.1} g",
        result.time_hours,
        result.material_grams
    );

    Ok(SimulationBreakdown {
        line_width_mm: width,
        layer_count,
        layer_area_mm2: layer_area,
        perimeter_mm: perimeter,
        wall_path_mm: wall_path,
        infill_path_mm: infill_path,
        solid_path_mm: solid_path,
        top_bottom_layers,
        wall_time_s: wall_time,
        infill_time_s: infill_time,
        top_bottom_time_s: top_bottom_time,
        travel_time_s: travel_time,
        support_time_s: support_time,
        total_time_s: total_time,
        wall_volume_mm3: wall_volume,
        infill_volume_mm3: infill_volume,
        top_bottom_volume_mm3: top_bottom_volume,
        support_volume_cm3,
        result,
    })
}
