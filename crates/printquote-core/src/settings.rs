//! Settings
//!
//! Material and process tables, passed by reference into every calculation.
//! Nothing here is global: a caller loads a [`SettingsTable`] once (from JSON
//! or the built-in defaults) and hands out borrows.

use serde::{Deserialize, Serialize};

use crate::error::{QuoteError, QuoteResult, ensure_percent, ensure_positive};
use crate::math::DVec3;
use crate::pricing::{MachineRates, RoundingPolicy, TierTable};

/// Floats in allowed-value lists match within this tolerance
const ALLOWED_VALUE_TOLERANCE: f64 = 1e-6;

/// Filament material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialProfile {
    pub name: String,
    /// Density in g/cm³
    pub density_g_cm3: f64,
    /// Highest sustainable volumetric flow in mm³/s, if known
    #[serde(default)]
    pub max_flow_rate_mm3_s: Option<f64>,
    /// Positive values shorten print time, negative values lengthen it
    #[serde(default)]
    pub speed_modifier_percent: f64,
    /// Largest printable bounding box in mm
    pub max_build_volume_mm: DVec3,
    /// Price per kilogram in the quote currency
    pub price_per_kg: f64,
}

impl MaterialProfile {
    pub fn new(name: impl Into<String>, density_g_cm3: f64, price_per_kg: f64) -> Self {
        Self {
            name: name.into(),
            density_g_cm3,
            max_flow_rate_mm3_s: None,
            speed_modifier_percent: 0.0,
            max_build_volume_mm: DVec3::splat(256.0),
            price_per_kg,
        }
    }

    pub fn with_max_flow_rate(mut self, mm3_s: f64) -> Self {
        self.max_flow_rate_mm3_s = Some(mm3_s);
        self
    }

    pub fn with_speed_modifier(mut self, percent: f64) -> Self {
        self.speed_modifier_percent = percent;
        self
    }

    pub fn with_build_volume(mut self, size_mm: DVec3) -> Self {
        self.max_build_volume_mm = size_mm;
        self
    }

    /// Multiplier applied to total print time
    pub fn time_multiplier(&self) -> f64 {
        1.0 - self.speed_modifier_percent / 100.0
    }

    /// Whether a part of the given size fits this material's build volume
    pub fn fits(&self, dimensions_mm: DVec3) -> bool {
        dimensions_mm.cmple(self.max_build_volume_mm).all()
    }

    pub fn validate(&self) -> QuoteResult<()> {
        let invalid = |reason: String| {
            QuoteError::InvalidConfig(format!("material `{}`: {reason}", self.name))
        };

        if !(self.density_g_cm3.is_finite() && self.density_g_cm3 > 0.0) {
            return Err(invalid(format!("density must be positive, got {}", self.density_g_cm3)));
        }
        if let Some(flow) = self.max_flow_rate_mm3_s {
            if !(flow.is_finite() && flow > 0.0) {
                return Err(invalid(format!("max flow rate must be positive, got {flow}")));
            }
        }
        if !(self.speed_modifier_percent.is_finite() && self.speed_modifier_percent < 100.0) {
            return Err(invalid(format!(
                "speed modifier must be below 100%, got {}",
                self.speed_modifier_percent
            )));
        }
        if !(self.price_per_kg.is_finite() && self.price_per_kg >= 0.0) {
            return Err(invalid(format!(
                "price per kg must be non-negative, got {}",
                self.price_per_kg
            )));
        }
        let build = self.max_build_volume_mm;
        if !build.is_finite() || build.cmple(DVec3::ZERO).any() {
            return Err(invalid("build volume must be positive on every axis".to_string()));
        }
        Ok(())
    }
}

/// Per-job slicer parameters chosen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessParameters {
    pub nozzle_diameter_mm: f64,
    pub layer_height_mm: f64,
    pub infill_percent: f64,
    pub wall_count: u32,
}

impl ProcessParameters {
    pub fn new(
        nozzle_diameter_mm: f64,
        layer_height_mm: f64,
        infill_percent: f64,
        wall_count: u32,
    ) -> Self {
        Self {
            nozzle_diameter_mm,
            layer_height_mm,
            infill_percent,
            wall_count,
        }
    }

    /// Reject values that make no physical sense
    pub fn validate(&self) -> QuoteResult<()> {
        ensure_positive("nozzle_diameter_mm", self.nozzle_diameter_mm)?;
        ensure_positive("layer_height_mm", self.layer_height_mm)?;
        ensure_percent("infill_percent", self.infill_percent)
    }

    /// Check every parameter against the allowed sets
    pub fn check_allowed(&self, allowed: &AllowedParameters) -> QuoteResult<()> {
        fn contains(values: &[f64], value: f64) -> bool {
            values.iter().any(|v| (v - value).abs() < ALLOWED_VALUE_TOLERANCE)
        }

        if !contains(&allowed.nozzle_diameters_mm, self.nozzle_diameter_mm) {
            return Err(QuoteError::parameter(
                "nozzle_diameter_mm",
                format!(
                    "{} is not one of {:?}",
                    self.nozzle_diameter_mm, allowed.nozzle_diameters_mm
                ),
            ));
        }
        if !contains(&allowed.layer_heights_mm, self.layer_height_mm) {
            return Err(QuoteError::parameter(
                "layer_height_mm",
                format!("{} is not one of {:?}", self.layer_height_mm, allowed.layer_heights_mm),
            ));
        }
        if !contains(&allowed.infill_percents, self.infill_percent) {
            return Err(QuoteError::parameter(
                "infill_percent",
                format!("{} is not one of {:?}", self.infill_percent, allowed.infill_percents),
            ));
        }
        if !allowed.wall_counts.contains(&self.wall_count) {
            return Err(QuoteError::parameter(
                "wall_count",
                format!("{} is not one of {:?}", self.wall_count, allowed.wall_counts),
            ));
        }
        Ok(())
    }
}

impl Default for ProcessParameters {
    fn default() -> Self {
        Self::new(0.4, 0.2, 20.0, 2)
    }
}

/// Machine-wide motion settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessSettings {
    pub wall_speed_mm_s: f64,
    pub infill_speed_mm_s: f64,
    pub top_bottom_speed_mm_s: f64,
    pub travel_speed_mm_s: f64,
    /// Multiplier covering time lost to acceleration and deceleration
    pub acceleration_overhead_factor: f64,
    /// Share of the bounding box half-perimeter travelled per layer
    pub travel_fraction: f64,
}

/// Travel per layer as a share of `x + y`
pub const TRAVEL_DIAGONAL_FRACTION: f64 = 0.5;

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            wall_speed_mm_s: 45.0,
            infill_speed_mm_s: 80.0,
            top_bottom_speed_mm_s: 40.0,
            travel_speed_mm_s: 150.0,
            acceleration_overhead_factor: 1.15,
            travel_fraction: TRAVEL_DIAGONAL_FRACTION,
        }
    }
}

impl ProcessSettings {
    pub fn validate(&self) -> QuoteResult<()> {
        ensure_positive("wall_speed_mm_s", self.wall_speed_mm_s)?;
        ensure_positive("infill_speed_mm_s", self.infill_speed_mm_s)?;
        ensure_positive("top_bottom_speed_mm_s", self.top_bottom_speed_mm_s)?;
        ensure_positive("travel_speed_mm_s", self.travel_speed_mm_s)?;
        ensure_positive("acceleration_overhead_factor", self.acceleration_overhead_factor)?;
        if !(self.travel_fraction.is_finite() && self.travel_fraction >= 0.0) {
            return Err(QuoteError::parameter(
                "travel_fraction",
                format!("must be non-negative, got {}", self.travel_fraction),
            ));
        }
        Ok(())
    }
}

/// Finite sets the caller may choose process parameters from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowedParameters {
    pub nozzle_diameters_mm: Vec<f64>,
    pub layer_heights_mm: Vec<f64>,
    pub infill_percents: Vec<f64>,
    pub wall_counts: Vec<u32>,
}

impl Default for AllowedParameters {
    fn default() -> Self {
        Self {
            nozzle_diameters_mm: vec![0.2, 0.4, 0.6, 0.8],
            layer_heights_mm: vec![0.1, 0.12, 0.16, 0.2, 0.24, 0.28, 0.3],
            infill_percents: (0..=10).map(|step| f64::from(step) * 10.0).collect(),
            wall_counts: (1..=6).collect(),
        }
    }
}

/// Currency and machine pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingSettings {
    pub currency: String,
    pub machine_rate_per_hour: f64,
    pub rounding: RoundingPolicy,
    pub tiers: TierTable,
}

impl PricingSettings {
    /// Rates for pricing a job in `material`
    pub fn rates_for(&self, material: &MaterialProfile) -> MachineRates {
        MachineRates {
            price_per_kg: material.price_per_kg,
            rate_per_hour: self.machine_rate_per_hour,
        }
    }
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            machine_rate_per_hour: 2.5,
            rounding: RoundingPolicy::Cents,
            tiers: TierTable::standard(),
        }
    }
}

/// Everything a quote needs besides the mesh and the job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsTable {
    pub materials: Vec<MaterialProfile>,
    pub process: ProcessSettings,
    pub allowed: AllowedParameters,
    pub pricing: PricingSettings,
}

impl Default for SettingsTable {
    fn default() -> Self {
        let bed = DVec3::splat(256.0);
        Self {
            materials: vec![
                MaterialProfile::new("PLA", 1.24, 20.0)
                    .with_max_flow_rate(15.0)
                    .with_build_volume(bed),
                MaterialProfile::new("PETG", 1.27, 24.0)
                    .with_max_flow_rate(12.0)
                    .with_speed_modifier(-10.0)
                    .with_build_volume(bed),
                MaterialProfile::new("ABS", 1.04, 22.0)
                    .with_max_flow_rate(14.0)
                    .with_speed_modifier(-5.0)
                    .with_build_volume(DVec3::new(230.0, 230.0, 230.0)),
                MaterialProfile::new("TPU", 1.21, 35.0)
                    .with_max_flow_rate(3.6)
                    .with_speed_modifier(-50.0)
                    .with_build_volume(bed),
            ],
            process: ProcessSettings::default(),
            allowed: AllowedParameters::default(),
            pricing: PricingSettings::default(),
        }
    }
}

impl SettingsTable {
    /// Parse and validate a JSON settings document
    pub fn from_json_str(json: &str) -> QuoteResult<Self> {
        let table: Self = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    pub fn to_json_string(&self) -> QuoteResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> QuoteResult<()> {
        for material in &self.materials {
            material.validate()?;
        }
        self.process.validate()?;
        self.pricing.rounding.validate()?;
        let machine_rate = self.pricing.machine_rate_per_hour;
        if !(machine_rate.is_finite() && machine_rate >= 0.0) {
            return Err(QuoteError::InvalidConfig(format!(
                "machine rate must be non-negative, got {machine_rate}"
            )));
        }
        Ok(())
    }

    /// Look up a material by name, ignoring case
    pub fn material(&self, name: &str) -> QuoteResult<&MaterialProfile> {
        self.materials
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| QuoteError::InvalidConfig(format!("unknown material `{name}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_valid() {
        let table = SettingsTable::default();
        table.validate().unwrap();
        assert_eq!(table.pricing.tiers.tiers().len(), 4);
        assert_eq!(table.material("pla").unwrap().density_g_cm3, 1.24);
        assert!(table.material("nylon").is_err());
    }

    #[test]
    fn test_json_round_trip_preserves_table() {
        let table = SettingsTable::default();
        let json = table.to_json_string().unwrap();
        assert_eq!(SettingsTable::from_json_str(&json).unwrap(), table);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let table = SettingsTable::from_json_str(
            r#"{
                "materials": [{
                    "name": "PLA",
                    "density_g_cm3": 1.24,
                    "max_build_volume_mm": [220, 220, 250],
                    "price_per_kg": 250000
                }],
                "process": { "infill_speed_mm_s": 120 }
            }"#,
        )
        .unwrap();

        assert_eq!(table.materials.len(), 1);
        assert_eq!(table.materials[0].max_flow_rate_mm3_s, None);
        assert_eq!(table.process.infill_speed_mm_s, 120.0);
        assert_eq!(table.process.wall_speed_mm_s, 45.0);
    }

    #[test]
    fn test_missing_material_field_fails() {
        let result = SettingsTable::from_json_str(r#"{ "materials": [{ "name": "PLA" }] }"#);
        assert!(matches!(result, Err(QuoteError::Serialization(_))));
    }

    #[test]
    fn test_invalid_tiers_fail_to_load() {
        let result = SettingsTable::from_json_str(
            r#"{ "pricing": {
                "currency": "USD",
                "machine_rate_per_hour": 2.0,
                "rounding": { "mode": "cents" },
                "tiers": [
                    { "from_hours": 0, "to_hours": 5, "discount_percent": 0 },
                    { "from_hours": 8, "discount_percent": 5 }
                ]
            } }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_material_validation() {
        assert!(MaterialProfile::new("X", 0.0, 10.0).validate().is_err());
        assert!(MaterialProfile::new("X", 1.0, 10.0).with_max_flow_rate(0.0).validate().is_err());
        let stalled = MaterialProfile::new("X", 1.0, 10.0).with_speed_modifier(100.0);
        assert!(stalled.validate().is_err());
        assert!(MaterialProfile::new("X", 1.0, -1.0).validate().is_err());
        assert!(MaterialProfile::new("X", 1.0, 10.0)
            .with_build_volume(DVec3::new(200.0, 0.0, 200.0))
            .validate()
            .is_err());
    }

    #[test]
    fn test_speed_modifier_time_multiplier() {
        let faster = MaterialProfile::new("X", 1.0, 1.0).with_speed_modifier(20.0);
        assert!((faster.time_multiplier() - 0.8).abs() < 1e-12);
        let slower = MaterialProfile::new("X", 1.0, 1.0).with_speed_modifier(-50.0);
        assert!((slower.time_multiplier() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_material_fits_build_volume() {
        let pla = MaterialProfile::new("PLA", 1.24, 20.0).with_build_volume(DVec3::splat(200.0));
        assert!(pla.fits(DVec3::new(200.0, 100.0, 50.0)));
        assert!(!pla.fits(DVec3::new(200.1, 100.0, 50.0)));
    }

    #[test]
    fn test_process_parameter_validation() {
        assert!(ProcessParameters::default().validate().is_ok());
        assert!(ProcessParameters::new(0.4, 0.0, 20.0, 2).validate().is_err());
        assert!(ProcessParameters::new(0.4, 0.2, 120.0, 2).validate().is_err());
    }

    #[test]
    fn test_allowed_parameters() {
        let allowed = AllowedParameters::default();
        assert!(ProcessParameters::new(0.4, 0.2, 20.0, 2).check_allowed(&allowed).is_ok());
        assert!(ProcessParameters::new(0.4, 0.12, 30.0, 3).check_allowed(&allowed).is_ok());

        let err = ProcessParameters::new(0.5, 0.2, 20.0, 2).check_allowed(&allowed).unwrap_err();
        assert!(matches!(err, QuoteError::InvalidParameter { name: "nozzle_diameter_mm", .. }));
        assert!(ProcessParameters::new(0.4, 0.2, 25.0, 2).check_allowed(&allowed).is_err());
        assert!(ProcessParameters::new(0.4, 0.2, 20.0, 9).check_allowed(&allowed).is_err());
    }

    #[test]
    fn test_process_settings_validation() {
        assert!(ProcessSettings::default().validate().is_ok());
        let stalled = ProcessSettings {
            travel_speed_mm_s: 0.0,
            ..ProcessSettings::default()
        };
        assert!(stalled.validate().is_err());
    }
}
