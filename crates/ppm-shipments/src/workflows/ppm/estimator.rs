use tracing::debug;

use crate::config::PpmConfig;

use super::domain::{Address, Cents, PpmShipment, PpmShipmentStatus};
use super::error::ServiceError;
use super::repository::{IncentiveEstimator, PpmEstimate};
use super::validation::{estimator_checks, ValidationPipeline};

/// Storage-in-transit rates, charged per hundred pounds stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SitRates {
    pub first_day_per_cwt: Cents,
    pub additional_day_per_cwt: Cents,
}

impl From<&PpmConfig> for SitRates {
    fn from(config: &PpmConfig) -> Self {
        Self {
            first_day_per_cwt: Cents(config.sit_first_day_cents_per_cwt),
            additional_day_per_cwt: Cents(config.sit_additional_day_cents_per_cwt),
        }
    }
}

/// Flat-rate pricing: a base amount plus a per-pound rate on the estimated weight, and a
/// first-day plus daily rate for storage in transit.
#[derive(Debug)]
pub struct RateTableEstimator {
    base: Cents,
    per_pound: Cents,
    sit: SitRates,
    checks: ValidationPipeline,
}

impl RateTableEstimator {
    pub fn new(base: Cents, per_pound: Cents) -> Self {
        Self::with_sit_rates(base, per_pound, SitRates::from(&PpmConfig::default()))
    }

    pub fn with_sit_rates(base: Cents, per_pound: Cents, sit: SitRates) -> Self {
        Self {
            base,
            per_pound,
            sit,
            checks: estimator_checks(),
        }
    }

    pub fn from_config(config: &PpmConfig) -> Self {
        Self::with_sit_rates(
            Cents(config.incentive_base_cents),
            Cents(config.incentive_cents_per_pound),
            SitRates::from(config),
        )
    }

    fn price(&self, ppm: &PpmShipment) -> Cents {
        let pounds = ppm.estimated_weight.map(|weight| weight.0).unwrap_or(0);
        Cents(
            self.base
                .0
                .saturating_add(pounds.saturating_mul(self.per_pound.0)),
        )
    }

    /// First day at the first-day rate, every later day at the daily rate.
    fn price_sit(&self, ppm: &PpmShipment) -> Option<Cents> {
        let pounds = ppm.sit_estimated_weight?.0;
        let entry = ppm.sit_estimated_entry_date?;
        let departure = ppm.sit_estimated_departure_date?;
        let additional_days = (departure - entry).num_days().max(0);

        let first_day = pounds.saturating_mul(self.sit.first_day_per_cwt.0) / 100;
        let additional = pounds
            .saturating_mul(self.sit.additional_day_per_cwt.0)
            .saturating_mul(additional_days)
            / 100;
        Some(Cents(first_day.saturating_add(additional)))
    }
}

impl Default for RateTableEstimator {
    fn default() -> Self {
        Self::from_config(&PpmConfig::default())
    }
}

fn postal_code(address: &Option<Address>) -> Option<&str> {
    address.as_ref().map(|address| address.postal_code.as_str())
}

fn pricing_inputs_unchanged(old: &PpmShipment, new: &PpmShipment) -> bool {
    old.expected_departure_date == new.expected_departure_date
        && postal_code(&old.pickup_address) == postal_code(&new.pickup_address)
        && postal_code(&old.destination_address) == postal_code(&new.destination_address)
        && old.estimated_weight == new.estimated_weight
}

/// Storage is priced once the counselor has supplied a location, and again whenever any
/// storage input or the route changes.
fn sit_needs_pricing(old: &PpmShipment, new: &PpmShipment) -> bool {
    if new.sit_expected != Some(true) || new.sit_location.is_none() {
        return false;
    }

    if old.sit_location.is_none()
        || old.sit_estimated_weight.is_none()
        || old.sit_estimated_entry_date.is_none()
        || old.sit_estimated_departure_date.is_none()
    {
        return true;
    }

    new.sit_location != old.sit_location
        || new.sit_estimated_weight != old.sit_estimated_weight
        || new.sit_estimated_entry_date != old.sit_estimated_entry_date
        || new.sit_estimated_departure_date != old.sit_estimated_departure_date
        || postal_code(&new.pickup_address) != postal_code(&old.pickup_address)
        || postal_code(&new.destination_address) != postal_code(&old.destination_address)
        || new.expected_departure_date != old.expected_departure_date
}

impl IncentiveEstimator for RateTableEstimator {
    fn estimate_incentive(
        &self,
        old: &PpmShipment,
        new: &mut PpmShipment,
    ) -> Result<PpmEstimate, ServiceError> {
        if !matches!(
            new.status,
            Some(PpmShipmentStatus::Draft | PpmShipmentStatus::Submitted)
        ) {
            return Ok(PpmEstimate {
                incentive: old.estimated_incentive,
                sit_cost: old.sit_estimated_cost,
            });
        }

        match self.checks.validate(new, Some(old), Some(&old.shipment)) {
            Ok(()) => {}
            Err(ServiceError::InvalidInput { .. }) => return Ok(PpmEstimate::default()),
            Err(err) => return Err(err),
        }

        let price_sit = sit_needs_pricing(old, new);
        let mut estimate = PpmEstimate {
            incentive: old.estimated_incentive,
            sit_cost: old.sit_estimated_cost,
        };
        if new.sit_expected == Some(false) {
            new.sit_estimated_cost = None;
            estimate.sit_cost = None;
        }

        if old.estimated_incentive.is_none() || !pricing_inputs_unchanged(old, new) {
            // A fresh estimate invalidates any advance sized against the previous one.
            new.has_requested_advance = None;
            new.advance_amount_requested = None;

            let incentive = self.price(new);
            debug!(incentive_cents = incentive.0, "estimated ppm incentive");
            estimate.incentive = Some(incentive);
        }

        if price_sit {
            estimate.sit_cost = self.price_sit(new);
            debug!(sit_cost = ?estimate.sit_cost, "estimated ppm storage cost");
        }

        Ok(estimate)
    }
}
