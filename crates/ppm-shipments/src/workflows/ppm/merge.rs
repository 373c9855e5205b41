use chrono::NaiveDate;
use uuid::Uuid;

use super::domain::{Address, AddressId, PpmShipment};
use super::error::ServiceError;

pub(crate) const FUTURE_ACTUAL_MOVE_DATE: &str = "Actual move date cannot be set to the future.";

/// Result of folding a partial update into a persisted record. A rejected field does not stop
/// the rest of the candidate from merging, so both halves travel together.
#[derive(Debug)]
pub struct MergeOutcome {
    pub merged: PpmShipment,
    pub rejection: Option<ServiceError>,
}

impl MergeOutcome {
    pub fn into_result(self) -> Result<PpmShipment, ServiceError> {
        match self.rejection {
            Some(err) => Err(err),
            None => Ok(self.merged),
        }
    }
}

fn overlay<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if let Some(value) = source {
        *target = Some(value.clone());
    }
}

/// Replaces the persisted address with the candidate's while keeping the persisted identity.
fn overlay_address(
    address: &mut Option<Address>,
    address_id: &mut Option<AddressId>,
    candidate: &Option<Address>,
) {
    let Some(incoming) = candidate else {
        return;
    };

    let id = address
        .as_ref()
        .and_then(|existing| existing.id)
        .or(*address_id)
        .or(incoming.id);

    let mut replacement = incoming.clone();
    replacement.id = id;
    *address = Some(replacement);
    *address_id = id;
}

/// Folds `candidate` into `persisted`. Identity, status, the parent shipment, timestamps and the
/// signed certification always come from `persisted`; only fields present on the candidate are
/// taken from it.
pub fn merge_ppm_shipment(
    candidate: &PpmShipment,
    persisted: &PpmShipment,
    today: NaiveDate,
) -> MergeOutcome {
    let mut merged = persisted.clone();
    let mut rejection = None;

    match candidate.actual_move_date {
        Some(date) if date > today => {
            rejection = Some(ServiceError::Update {
                id: persisted.id.map(|id| id.0).unwrap_or_else(Uuid::nil),
                message: FUTURE_ACTUAL_MOVE_DATE.to_string(),
            });
        }
        Some(date) => merged.actual_move_date = Some(date),
        None => {}
    }

    overlay(
        &mut merged.expected_departure_date,
        &candidate.expected_departure_date,
    );
    overlay(
        &mut merged.actual_pickup_postal_code,
        &candidate.actual_pickup_postal_code,
    );
    overlay(
        &mut merged.actual_destination_postal_code,
        &candidate.actual_destination_postal_code,
    );

    overlay(&mut merged.sit_expected, &candidate.sit_expected);
    overlay(&mut merged.sit_location, &candidate.sit_location);
    overlay(
        &mut merged.sit_estimated_weight,
        &candidate.sit_estimated_weight,
    );
    overlay(
        &mut merged.sit_estimated_entry_date,
        &candidate.sit_estimated_entry_date,
    );
    overlay(
        &mut merged.sit_estimated_departure_date,
        &candidate.sit_estimated_departure_date,
    );

    overlay(&mut merged.estimated_weight, &candidate.estimated_weight);
    overlay(&mut merged.has_pro_gear, &candidate.has_pro_gear);
    overlay(&mut merged.pro_gear_weight, &candidate.pro_gear_weight);
    overlay(
        &mut merged.spouse_pro_gear_weight,
        &candidate.spouse_pro_gear_weight,
    );

    overlay(&mut merged.final_incentive, &candidate.final_incentive);
    overlay(
        &mut merged.has_requested_advance,
        &candidate.has_requested_advance,
    );
    overlay(
        &mut merged.advance_amount_requested,
        &candidate.advance_amount_requested,
    );
    overlay(&mut merged.advance_status, &candidate.advance_status);
    overlay(
        &mut merged.has_received_advance,
        &candidate.has_received_advance,
    );
    overlay(
        &mut merged.advance_amount_received,
        &candidate.advance_amount_received,
    );

    overlay(
        &mut merged.has_secondary_pickup_address,
        &candidate.has_secondary_pickup_address,
    );
    overlay(
        &mut merged.has_tertiary_pickup_address,
        &candidate.has_tertiary_pickup_address,
    );
    overlay(
        &mut merged.has_secondary_destination_address,
        &candidate.has_secondary_destination_address,
    );
    overlay(
        &mut merged.has_tertiary_destination_address,
        &candidate.has_tertiary_destination_address,
    );

    merge_addresses(&mut merged, candidate);
    gate_address_sequences(&mut merged, candidate);
    clear_dependent_fields(&mut merged);

    if !candidate.weight_tickets.is_empty() {
        merged.weight_tickets = candidate.weight_tickets.clone();
    }
    if !candidate.progear_weight_tickets.is_empty() {
        merged.progear_weight_tickets = candidate.progear_weight_tickets.clone();
    }
    if !candidate.moving_expenses.is_empty() {
        merged.moving_expenses = candidate.moving_expenses.clone();
    }

    MergeOutcome { merged, rejection }
}

fn merge_addresses(merged: &mut PpmShipment, candidate: &PpmShipment) {
    overlay_address(
        &mut merged.pickup_address,
        &mut merged.pickup_address_id,
        &candidate.pickup_address,
    );
    overlay_address(
        &mut merged.secondary_pickup_address,
        &mut merged.secondary_pickup_address_id,
        &candidate.secondary_pickup_address,
    );
    overlay_address(
        &mut merged.tertiary_pickup_address,
        &mut merged.tertiary_pickup_address_id,
        &candidate.tertiary_pickup_address,
    );
    overlay_address(
        &mut merged.destination_address,
        &mut merged.destination_address_id,
        &candidate.destination_address,
    );
    overlay_address(
        &mut merged.secondary_destination_address,
        &mut merged.secondary_destination_address_id,
        &candidate.secondary_destination_address,
    );
    overlay_address(
        &mut merged.tertiary_destination_address,
        &mut merged.tertiary_destination_address_id,
        &candidate.tertiary_destination_address,
    );
    overlay_address(
        &mut merged.w2_address,
        &mut merged.w2_address_id,
        &candidate.w2_address,
    );
}

/// Dropping a secondary address takes the tertiary one with it.
fn gate_address_sequences(merged: &mut PpmShipment, candidate: &PpmShipment) {
    if candidate.has_secondary_pickup_address == Some(false) {
        merged.secondary_pickup_address = None;
        merged.secondary_pickup_address_id = None;
        merged.has_tertiary_pickup_address = Some(false);
    }
    if candidate.has_secondary_pickup_address == Some(false)
        || candidate.has_tertiary_pickup_address == Some(false)
    {
        merged.tertiary_pickup_address = None;
        merged.tertiary_pickup_address_id = None;
    }

    if candidate.has_secondary_destination_address == Some(false) {
        merged.secondary_destination_address = None;
        merged.secondary_destination_address_id = None;
        merged.has_tertiary_destination_address = Some(false);
    }
    if candidate.has_secondary_destination_address == Some(false)
        || candidate.has_tertiary_destination_address == Some(false)
    {
        merged.tertiary_destination_address = None;
        merged.tertiary_destination_address_id = None;
    }
}

fn clear_dependent_fields(merged: &mut PpmShipment) {
    if merged.sit_expected == Some(false) {
        merged.sit_location = None;
        merged.sit_estimated_weight = None;
        merged.sit_estimated_entry_date = None;
        merged.sit_estimated_departure_date = None;
        merged.sit_estimated_cost = None;
    }

    if merged.has_pro_gear == Some(false) {
        merged.pro_gear_weight = None;
        merged.spouse_pro_gear_weight = None;
    }

    if merged.has_requested_advance == Some(false) {
        merged.advance_amount_requested = None;
    }

    if merged.has_received_advance == Some(false) {
        merged.advance_amount_received = None;
    }
}
