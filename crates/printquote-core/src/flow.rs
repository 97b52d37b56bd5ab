//! Flow-limited speed model
//!
//! A hotend can only melt so much plastic per second. When the volumetric
//! flow demanded at the configured infill speed exceeds a material's ceiling,
//! every extruding move is slowed by the same factor.

use crate::error::{QuoteError, QuoteResult, ensure_positive};

/// Extrusion line width as a multiple of nozzle diameter
pub const LINE_WIDTH_FACTOR: f64 = 1.2;

/// Extrusion line width in mm
pub fn line_width(nozzle_diameter_mm: f64) -> f64 {
    nozzle_diameter_mm * LINE_WIDTH_FACTOR
}

/// Volumetric flow in mm³/s when extruding at `speed_mm_s`
pub fn theoretical_flow_rate(
    nozzle_diameter_mm: f64,
    layer_height_mm: f64,
    speed_mm_s: f64,
) -> f64 {
    layer_height_mm * line_width(nozzle_diameter_mm) * speed_mm_s
}

/// Speed scaling factor in `(0, 1]`.
///
/// `None` for `max_flow_rate_mm3_s` means the material has no known ceiling
/// and nothing is derated. A ceiling that is present but zero, negative or
/// not finite is a configuration error.
pub fn speed_scaling_factor(
    nozzle_diameter_mm: f64,
    layer_height_mm: f64,
    infill_speed_mm_s: f64,
    max_flow_rate_mm3_s: Option<f64>,
) -> QuoteResult<f64> {
    ensure_positive("nozzle_diameter_mm", nozzle_diameter_mm)?;
    ensure_positive("layer_height_mm", layer_height_mm)?;
    ensure_positive("infill_speed_mm_s", infill_speed_mm_s)?;

    let Some(max_flow) = max_flow_rate_mm3_s else {
        return Ok(1.0);
    };
    if !(max_flow.is_finite() && max_flow > 0.0) {
        return Err(QuoteError::InvalidConfig(format!(
            "max flow rate must be positive, got {max_flow}"
        )));
    }

    let demanded = theoretical_flow_rate(nozzle_diameter_mm, layer_height_mm, infill_speed_mm_s);
    if demanded > max_flow {
        let factor = max_flow / demanded;
        log::debug!("flow {demanded:.2} mm3/s over {max_flow:.2} mm3/s, derating to {factor:.3}");
        Ok(factor)
    } else {
        Ok(1.0)
    }
}
