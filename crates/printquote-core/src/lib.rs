//! # Printquote Core
//!
//! Cost and print-time estimation for 3D-printable meshes.
//!
//! This crate provides the deterministic core of a print quoting service:
//! - **Mesh**: signed volume, oriented bounding box and overhang classification
//! - **Flow**: volumetric flow ceiling and the resulting speed derating
//! - **Simulate**: layer-based time and material estimate
//! - **Pricing**: material and machine cost with hour-banded discounts
//! - **Settings**: material, process and pricing tables
//! - **Advisory**: typed results from an external printability classifier
//!
//! Every function is pure. Nothing is cached and nothing is shared between
//! calls; an [`Estimator`] only holds the settings it was built with.

pub mod advisory;
pub mod error;
pub mod flow;
pub mod math;
pub mod mesh;
pub mod pricing;
pub mod settings;
pub mod simulate;

use serde::{Deserialize, Serialize};

pub use advisory::{AdvisoryReport, OrientationSuggestion};
pub use error::{QuoteError, QuoteResult};
pub use math::{Aabb, DVec3, Orientation};
pub use mesh::{
    GeometryAnalysis, OverhangConfig, OverhangSummary, TriangleMesh, analyze_geometry,
    classify_overhangs, summarize_overhangs,
};
pub use pricing::{MachineRates, PriceQuote, PricingTier, RoundingPolicy, TierTable, price_quote};
pub use settings::{MaterialProfile, ProcessParameters, ProcessSettings, SettingsTable};
pub use simulate::{SimulationBreakdown, SimulationResult, simulate_print, simulate_print_detailed};

/// One quote request against a mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    /// Material name, looked up case-insensitively
    pub material: String,
    pub params: ProcessParameters,
    /// Support overhead from the advisory classifier
    #[serde(default)]
    pub support_percent: f64,
    /// XYZ Euler rotation in degrees applied before measuring
    #[serde(default)]
    pub rotation_deg: [f64; 3],
    pub quantity: u32,
    /// Reject parameters outside the settings' allowed sets
    #[serde(default)]
    pub enforce_allowed: bool,
}

impl QuoteRequest {
    pub fn new(material: impl Into<String>, params: ProcessParameters, quantity: u32) -> Self {
        Self {
            material: material.into(),
            params,
            support_percent: 0.0,
            rotation_deg: [0.0; 3],
            quantity,
            enforce_allowed: false,
        }
    }

    /// Take support overhead and orientation from a classifier report
    pub fn with_advisory(mut self, report: &AdvisoryReport) -> Self {
        self.support_percent = report.support_percent;
        self.rotation_deg = report.orientation.rotation_deg;
        self
    }

    pub fn orientation(&self) -> Orientation {
        let [x, y, z] = self.rotation_deg;
        Orientation::from_euler_degrees(x, y, z)
    }
}

/// Full result of an estimate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    pub material: String,
    pub currency: String,
    pub geometry: GeometryAnalysis,
    pub overhangs: OverhangSummary,
    /// Whether the oriented part fits the material's build volume
    pub fits_build_volume: bool,
    pub simulation: SimulationBreakdown,
    pub price: PriceQuote,
}

/// Runs analyze, simulate and price with one settings table
#[derive(Debug, Clone, Default)]
pub struct Estimator {
    settings: SettingsTable,
    overhang: OverhangConfig,
}

impl Estimator {
    /// Create an estimator, validating the settings table
    pub fn new(settings: SettingsTable) -> QuoteResult<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            overhang: OverhangConfig::default(),
        })
    }

    /// Override overhang detection settings
    pub fn with_overhang_config(mut self, config: OverhangConfig) -> Self {
        self.overhang = config;
        self
    }

    pub fn settings(&self) -> &SettingsTable {
        &self.settings
    }

    /// Quote `request` for `mesh`.
    ///
    /// A degenerate mesh is rejected here rather than priced at zero.
    pub fn estimate(&self, mesh: &TriangleMesh, request: &QuoteRequest) -> QuoteResult<Estimate> {
        let material = self.settings.material(&request.material)?;
        if request.enforce_allowed {
            request.params.check_allowed(&self.settings.allowed)?;
        }

        let orientation = request.orientation();
        let geometry = analyze_geometry(mesh, &orientation);
        if geometry.is_degenerate() {
            return Err(QuoteError::DegenerateMesh(format!(
                "{} facets enclosing {:.6} cm3",
                geometry.facet_count, geometry.volume_cm3
            )));
        }
        let overhangs = summarize_overhangs(mesh, &orientation, &self.overhang);

        let fits_build_volume = material.fits(geometry.dimensions_mm);
        if !fits_build_volume {
            log::warn!(
                "part {:?} mm exceeds {} build volume {:?} mm",
                geometry.dimensions_mm.to_array(),
                material.name,
                material.max_build_volume_mm.to_array()
            );
        }

        let simulation = simulate_print_detailed(
            Some(geometry.volume_cm3),
            Some(geometry.dimensions_mm),
            material,
            &request.params,
            &self.settings.process,
            request.support_percent,
        )?;

        let pricing = &self.settings.pricing;
        let price = price_quote(
            &simulation.result,
            &pricing.rates_for(material),
            request.quantity,
            &pricing.tiers,
            pricing.rounding,
        )?;

        log::info!(
            "quoted {} of a {}-facet mesh in {}: {:.2} h, {:.1} g, {} {:.2}",
            request.quantity,
            geometry.facet_count,
            material.name,
            simulation.result.time_hours,
            simulation.result.material_grams,
            pricing.currency,
            price.total_cost
        );

        Ok(Estimate {
            material: material.name.clone(),
            currency: pricing.currency.clone(),
            geometry,
            overhangs,
            fits_build_volume,
            simulation,
            price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(size: f64) -> TriangleMesh {
        TriangleMesh::cuboid(DVec3::ZERO, DVec3::splat(size))
    }

    #[test]
    fn test_estimator_creation() {
        let estimator = Estimator::new(SettingsTable::default()).unwrap();
        assert_eq!(estimator.settings().materials.len(), 4);
    }

    #[test]
    fn test_reference_cube_estimate() {
        let estimator = Estimator::default();
        let request = QuoteRequest::new("PLA", ProcessParameters::new(0.4, 0.2, 20.0, 2), 1);
        let estimate = estimator.estimate(&cube(100.0), &request).unwrap();

        assert!((estimate.geometry.volume_cm3 - 1000.0).abs() < 1e-9);
        assert!(estimate.fits_build_volume);
        assert_eq!(estimate.overhangs.overhang_count, 2);

        let result = estimate.simulation.result;
        assert!(result.material_grams > 0.0 && result.material_grams < 1240.0);
        assert!(result.time_hours.is_finite() && result.time_hours > 0.0);
        assert!(estimate.price.total_cost > 0.0);
        assert_eq!(estimate.currency, "USD");
    }

    #[test]
    fn test_support_from_advisory_raises_price() {
        let estimator = Estimator::default();
        let report = AdvisoryReport::from_json_str(
            r#"{ "printable": true, "issues": [], "support_percent": 25,
                 "orientation": { "rotation_deg": [0, 0, 0], "reason": "as loaded" } }"#,
        )
        .unwrap();

        let plain = QuoteRequest::new("PLA", ProcessParameters::default(), 1);
        let supported = plain.clone().with_advisory(&report);
        assert_eq!(supported.support_percent, 25.0);

        let a = estimator.estimate(&cube(40.0), &plain).unwrap();
        let b = estimator.estimate(&cube(40.0), &supported).unwrap();
        assert!(b.simulation.result.time_hours > a.simulation.result.time_hours);
        assert!(b.simulation.result.material_grams > a.simulation.result.material_grams);
        assert!(b.price.total_cost > a.price.total_cost);
    }

    #[test]
    fn test_empty_mesh_is_rejected() {
        let estimator = Estimator::default();
        let request = QuoteRequest::new("PLA", ProcessParameters::default(), 1);
        assert!(matches!(
            estimator.estimate(&TriangleMesh::default(), &request),
            Err(QuoteError::DegenerateMesh(_))
        ));
    }

    #[test]
    fn test_unknown_material_is_rejected() {
        let estimator = Estimator::default();
        let request = QuoteRequest::new("unobtainium", ProcessParameters::default(), 1);
        assert!(matches!(
            estimator.estimate(&cube(10.0), &request),
            Err(QuoteError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_enforce_allowed_parameters() {
        let estimator = Estimator::default();
        let mut request = QuoteRequest::new("PLA", ProcessParameters::new(0.5, 0.2, 20.0, 2), 1);
        assert!(estimator.estimate(&cube(10.0), &request).is_ok());

        request.enforce_allowed = true;
        assert!(matches!(
            estimator.estimate(&cube(10.0), &request),
            Err(QuoteError::InvalidParameter { name: "nozzle_diameter_mm", .. })
        ));
    }

    #[test]
    fn test_oversized_part_is_flagged_not_failed() {
        let estimator = Estimator::default();
        let request = QuoteRequest::new("ABS", ProcessParameters::default(), 1);
        let estimate = estimator.estimate(&cube(240.0), &request).unwrap();
        assert!(!estimate.fits_build_volume);
    }

    #[test]
    fn test_rotation_changes_footprint() {
        let estimator = Estimator::default();
        let mesh = TriangleMesh::cuboid(DVec3::ZERO, DVec3::new(100.0, 20.0, 10.0));
        let flat = QuoteRequest::new("PLA", ProcessParameters::default(), 1);
        let mut standing = flat.clone();
        standing.rotation_deg = [0.0, 90.0, 0.0];

        let a = estimator.estimate(&mesh, &flat).unwrap();
        let b = estimator.estimate(&mesh, &standing).unwrap();
        assert!((a.geometry.volume_cm3 - b.geometry.volume_cm3).abs() < 1e-9);
        assert!((b.geometry.dimensions_mm.z - 100.0).abs() < 1e-9);
        assert!(b.simulation.layer_count > a.simulation.layer_count);
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: QuoteRequest = serde_json::from_str(
            r#"{ "material": "PETG",
                 "params": { "nozzle_diameter_mm": 0.4, "layer_height_mm": 0.2,
                             "infill_percent": 15, "wall_count": 3 },
                 "quantity": 4 }"#,
        )
        .unwrap();
        assert_eq!(request.support_percent, 0.0);
        assert_eq!(request.rotation_deg, [0.0; 3]);
        assert!(!request.enforce_allowed);
        assert!(request.orientation().is_identity());
    }
}
