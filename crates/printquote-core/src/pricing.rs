//! Pricing Engine
//!
//! Turns a simulation result and a quantity into a price. Material is charged
//! by weight, machine time by the hour, and machine time alone earns an
//! hour-banded volume discount.

use serde::{Deserialize, Serialize};

use crate::error::{QuoteError, QuoteResult, ensure_percent};
use crate::math::{ceil_to_multiple, round_to_decimals};
use crate::simulate::SimulationResult;

/// Adjacent tier bounds closer than this are treated as touching
const TIER_BOUND_TOLERANCE: f64 = 1e-9;

/// Discount applied to machine time within `[from_hours, to_hours)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingTier {
    pub from_hours: f64,
    /// `None` for an open-ended last tier
    #[serde(default)]
    pub to_hours: Option<f64>,
    pub discount_percent: f64,
}

impl PricingTier {
    pub fn new(from_hours: f64, to_hours: Option<f64>, discount_percent: f64) -> Self {
        Self {
            from_hours,
            to_hours,
            discount_percent,
        }
    }

    /// Whether `hours` falls inside this tier's half-open interval
    pub fn contains(&self, hours: f64) -> bool {
        hours >= self.from_hours && self.to_hours.is_none_or(|to| hours < to)
    }
}

/// Ordered, gap-free and non-overlapping set of pricing tiers.
///
/// Construction sorts by `from_hours` and rejects tables where the first tier
/// does not start at zero, neighbours do not touch, or a tier other than the
/// last is open-ended. Hours past a bounded last tier earn no discount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PricingTier>", into = "Vec<PricingTier>")]
pub struct TierTable {
    tiers: Vec<PricingTier>,
}

impl TierTable {
    pub fn new(mut tiers: Vec<PricingTier>) -> QuoteResult<Self> {
        for tier in &tiers {
            if !(tier.from_hours.is_finite() && tier.from_hours >= 0.0) {
                return Err(QuoteError::InvalidTierTable(format!(
                    "tier start {} must be a non-negative number",
                    tier.from_hours
                )));
            }
            if let Some(to) = tier.to_hours {
                if to.is_nan() || to <= tier.from_hours {
                    return Err(QuoteError::InvalidTierTable(format!(
                        "tier [{}, {}) is empty",
                        tier.from_hours, to
                    )));
                }
            }
            ensure_percent("discount_percent", tier.discount_percent)
                .map_err(|e| QuoteError::InvalidTierTable(e.to_string()))?;
        }

        tiers.sort_by(|a, b| a.from_hours.total_cmp(&b.from_hours));

        if let Some(first) = tiers.first() {
            if first.from_hours > TIER_BOUND_TOLERANCE {
                return Err(QuoteError::InvalidTierTable(format!(
                    "first tier starts at {} hours, leaving [0, {}) uncovered",
                    first.from_hours, first.from_hours
                )));
            }
        }

        for pair in tiers.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            let Some(to) = current.to_hours else {
                return Err(QuoteError::InvalidTierTable(format!(
                    "open-ended tier starting at {} overlaps tier starting at {}",
                    current.from_hours, next.from_hours
                )));
            };
            if (to - next.from_hours).abs() > TIER_BOUND_TOLERANCE {
                let kind = if to > next.from_hours { "overlaps" } else { "leaves a gap before" };
                return Err(QuoteError::InvalidTierTable(format!(
                    "tier [{}, {}) {} tier starting at {}",
                    current.from_hours, to, kind, next.from_hours
                )));
            }
        }

        Ok(Self { tiers })
    }

    /// Table without any discount
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in hour bands: none below 10 h, then 5%, 10% and 15% from 200 h
    pub fn standard() -> Self {
        Self {
            tiers: vec![
                PricingTier::new(0.0, Some(10.0), 0.0),
                PricingTier::new(10.0, Some(50.0), 5.0),
                PricingTier::new(50.0, Some(200.0), 10.0),
                PricingTier::new(200.0, None, 15.0),
            ],
        }
    }

    pub fn tiers(&self) -> &[PricingTier] {
        &self.tiers
    }

    /// First tier, by ascending start, containing `hours`
    pub fn lookup(&self, hours: f64) -> Option<&PricingTier> {
        self.tiers.iter().find(|tier| tier.contains(hours))
    }

    /// Discount percentage for `hours` of machine time
    pub fn discount_percent(&self, hours: f64) -> f64 {
        match self.lookup(hours) {
            Some(tier) => tier.discount_percent,
            None => {
                if !self.tiers.is_empty() {
                    log::warn!("no pricing tier covers {hours:.2} h, applying no discount");
                }
                0.0
            }
        }
    }
}

impl TryFrom<Vec<PricingTier>> for TierTable {
    type Error = QuoteError;

    fn try_from(tiers: Vec<PricingTier>) -> Result<Self, Self::Error> {
        Self::new(tiers)
    }
}

impl From<TierTable> for Vec<PricingTier> {
    fn from(table: TierTable) -> Self {
        table.tiers
    }
}

/// Currency display rounding
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Round up to the next multiple of `unit`, for currencies priced in
    /// whole thousands
    RoundUpToUnit { unit: f64 },
    /// Round to two decimal places
    Cents,
}

impl RoundingPolicy {
    pub fn validate(&self) -> QuoteResult<()> {
        match *self {
            Self::RoundUpToUnit { unit } if !(unit.is_finite() && unit > 0.0) => Err(
                QuoteError::InvalidConfig(format!("rounding unit must be positive, got {unit}")),
            ),
            _ => Ok(()),
        }
    }

    pub fn apply(&self, amount: f64) -> f64 {
        match *self {
            Self::RoundUpToUnit { unit } => ceil_to_multiple(amount, unit),
            Self::Cents => round_to_decimals(amount, 2),
        }
    }
}

impl Default for RoundingPolicy {
    fn default() -> Self {
        Self::Cents
    }
}

/// Unit rates in the quote currency
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MachineRates {
    /// Material price per kilogram
    pub price_per_kg: f64,
    /// Machine time price per hour
    pub rate_per_hour: f64,
}

/// Final price for an order
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceQuote {
    pub quantity: u32,
    /// Machine hours across the whole order, used for tier lookup
    pub total_hours: f64,
    pub discount_percent: f64,
    /// Material cost across the order
    pub material_cost: f64,
    /// Machine cost across the order, before discount
    pub machine_cost: f64,
    pub discount_amount: f64,
    pub total_cost: f64,
    pub per_unit_cost: f64,
}

/// Price `quantity` copies of a simulated print.
///
/// Monetary outputs are rounded with `rounding`; the discount is computed on
/// machine cost only.
pub fn price_quote(
    simulation: &SimulationResult,
    rates: &MachineRates,
    quantity: u32,
    tiers: &TierTable,
    rounding: RoundingPolicy,
) -> QuoteResult<PriceQuote> {
    if quantity == 0 {
        return Err(QuoteError::parameter("quantity", "must be at least 1"));
    }
    for (name, rate) in [
        ("price_per_kg", rates.price_per_kg),
        ("rate_per_hour", rates.rate_per_hour),
    ] {
        if !(rate.is_finite() && rate >= 0.0) {
            return Err(QuoteError::parameter(name, format!("must be non-negative, got {rate}")));
        }
    }
    rounding.validate()?;

    let count = f64::from(quantity);
    let unit_material_cost = simulation.material_grams / 1000.0 * rates.price_per_kg;
    let unit_machine_cost = simulation.time_hours * rates.rate_per_hour;

    let total_hours = simulation.time_hours * count;
    let discount_percent = tiers.discount_percent(total_hours);

    let material_cost = unit_material_cost * count;
    let machine_cost = unit_machine_cost * count;
    let discount_amount = machine_cost * discount_percent / 100.0;
    let total_cost = material_cost + machine_cost - discount_amount;

    log::debug!(
        "{quantity} x {:.2} h = {total_hours:.2} h, {discount_percent}% off {machine_cost:.2}",
        simulation.time_hours
    );

    Ok(PriceQuote {
        quantity,
        total_hours,
        discount_percent,
        material_cost: rounding.apply(material_cost),
        machine_cost: rounding.apply(machine_cost),
        discount_amount: rounding.apply(discount_amount),
        total_cost: rounding.apply(total_cost),
        per_unit_cost: rounding.apply(total_cost / count),
    })
}
