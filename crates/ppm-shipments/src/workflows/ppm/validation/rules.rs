use std::sync::Arc;

use super::super::domain::{
    Address, AddressId, Document, PpmShipment, Pounds, Shipment, ShipmentStatus, ShipmentType,
};
use super::super::error::{ServiceError, ValidationErrors};
use super::super::repository::UploadCounter;
use super::policy::AdvancePolicy;
use super::PpmShipmentValidator;

type CheckResult = Result<ValidationErrors, ServiceError>;

pub(crate) fn check_shipment_type(
    _new: &PpmShipment,
    _old: Option<&PpmShipment>,
    shipment: Option<&Shipment>,
) -> CheckResult {
    let mut errors = ValidationErrors::new();
    if let Some(shipment) = shipment {
        if shipment.shipment_type != Some(ShipmentType::Ppm) {
            errors.add("shipment_type", "Shipment type must be PPM");
        }
    }
    Ok(errors)
}

pub(crate) fn check_shipment_status_for_create(
    _new: &PpmShipment,
    _old: Option<&PpmShipment>,
    shipment: Option<&Shipment>,
) -> CheckResult {
    let mut errors = ValidationErrors::new();
    if let Some(status) = shipment.and_then(|shipment| shipment.status) {
        if !matches!(status, ShipmentStatus::Draft | ShipmentStatus::Submitted) {
            errors.add(
                "shipment_status",
                "Must have a DRAFT or SUBMITTED status associated with MTO shipment",
            );
        }
    }
    Ok(errors)
}

pub(crate) fn check_create_ids(
    new: &PpmShipment,
    _old: Option<&PpmShipment>,
    _shipment: Option<&Shipment>,
) -> CheckResult {
    let mut errors = ValidationErrors::new();
    if new.id.is_some() {
        errors.add("id", "cannot manually set a new PPM Shipment's UUID");
    }
    if new.shipment_id.is_none() {
        errors.add("shipment_id", "Shipment ID is required");
    }
    Ok(errors)
}

pub(crate) fn check_update_ids(
    new: &PpmShipment,
    old: Option<&PpmShipment>,
    _shipment: Option<&Shipment>,
) -> CheckResult {
    let mut errors = ValidationErrors::new();
    if let Some(old) = old {
        if new.id != old.id {
            errors.add("id", "new PPMShipmentID must match original PPMShipmentID");
        }
        if new.shipment_id != old.shipment_id {
            errors.add("shipment_id", "new ShipmentID must match original ShipmentID");
        }
    }
    Ok(errors)
}

/// Status, review outcomes and attestations are set by the workflows once the record exists.
pub(crate) fn check_workflow_fields_unset(
    new: &PpmShipment,
    _old: Option<&PpmShipment>,
    _shipment: Option<&Shipment>,
) -> CheckResult {
    const SET_BY_WORKFLOW: &str = "cannot be set when creating a PPM shipment";

    let mut errors = ValidationErrors::new();
    let preset = [
        ("status", new.status.is_some()),
        ("submitted_at", new.submitted_at.is_some()),
        ("approved_at", new.approved_at.is_some()),
        ("final_incentive", new.final_incentive.is_some()),
        ("advance_status", new.advance_status.is_some()),
        ("signed_certification", new.signed_certification.is_some()),
        ("reviewed_certification", new.reviewed_certification.is_some()),
        ("weight_tickets", !new.weight_tickets.is_empty()),
        ("progear_weight_tickets", !new.progear_weight_tickets.is_empty()),
        ("moving_expenses", !new.moving_expenses.is_empty()),
    ];
    for (field, set) in preset {
        if set {
            errors.add(field, SET_BY_WORKFLOW);
        }
    }
    Ok(errors)
}

fn has_reference(address: &Option<Address>, address_id: &Option<AddressId>) -> bool {
    address.is_some() || address_id.is_some()
}

pub(crate) fn check_required_fields(
    new: &PpmShipment,
    _old: Option<&PpmShipment>,
    _shipment: Option<&Shipment>,
) -> CheckResult {
    let mut errors = ValidationErrors::new();

    if new.expected_departure_date.is_none() {
        errors.add("expected_departure_date", "cannot be a zero value");
    }
    if !has_reference(&new.pickup_address, &new.pickup_address_id) {
        errors.add("pickup_address_id", "Pickup address is required");
    }
    if !has_reference(&new.destination_address, &new.destination_address_id) {
        errors.add("destination_address_id", "Destination address is required");
    }
    if new.sit_expected.is_none() {
        errors.add("sit_expected", "cannot be nil");
    }

    Ok(errors)
}

struct AddressSlots {
    label: &'static str,
    secondary: bool,
    tertiary: bool,
}

fn sequence_errors(slots: &[AddressSlots]) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for slot in slots {
        if slot.tertiary && !slot.secondary {
            errors.add(
                format!("tertiary_{}_address", slot.label),
                format!(
                    "A tertiary {} address cannot be set without a secondary {} address",
                    slot.label, slot.label
                ),
            );
        }
    }
    errors
}

/// Judged on the record as it will be stored; on update that is the merged record, which
/// already carries any secondary address on file.
pub(crate) fn check_address_sequence(
    new: &PpmShipment,
    _old: Option<&PpmShipment>,
    _shipment: Option<&Shipment>,
) -> CheckResult {
    Ok(sequence_errors(&[
        AddressSlots {
            label: "pickup",
            secondary: has_reference(
                &new.secondary_pickup_address,
                &new.secondary_pickup_address_id,
            ),
            tertiary: has_reference(
                &new.tertiary_pickup_address,
                &new.tertiary_pickup_address_id,
            ),
        },
        AddressSlots {
            label: "destination",
            secondary: has_reference(
                &new.secondary_destination_address,
                &new.secondary_destination_address_id,
            ),
            tertiary: has_reference(
                &new.tertiary_destination_address,
                &new.tertiary_destination_address_id,
            ),
        },
    ]))
}

/// Advance requests must agree with their flag and stay under the policy cap.
#[derive(Debug, Clone, Copy)]
pub struct AdvanceAmountCheck {
    policy: AdvancePolicy,
}

impl AdvanceAmountCheck {
    pub fn new(policy: AdvancePolicy) -> Self {
        Self { policy }
    }
}

impl PpmShipmentValidator for AdvanceAmountCheck {
    fn validate(
        &self,
        new: &PpmShipment,
        old: Option<&PpmShipment>,
        _shipment: Option<&Shipment>,
    ) -> CheckResult {
        let mut errors = ValidationErrors::new();

        match (new.has_requested_advance, new.advance_amount_requested) {
            (Some(false), Some(_)) => {
                errors.add(
                    "advance_amount_requested",
                    "An advance amount cannot be set when no advance is requested",
                );
            }
            (Some(true), None) => {
                errors.add(
                    "advance_amount_requested",
                    "An advance amount is required when an advance is requested",
                );
            }
            (Some(true), Some(amount)) => {
                if amount.0 < 0 {
                    errors.add(
                        "advance_amount_requested",
                        "Advance amount requested cannot be negative",
                    );
                }

                let incentive = new
                    .estimated_incentive
                    .or_else(|| old.and_then(|old| old.estimated_incentive));
                if let Some(incentive) = incentive {
                    if amount > self.policy.max_advance_for(incentive) {
                        errors.add(
                            "advance_amount_requested",
                            format!(
                                "Advance amount requested cannot be greater than {}% of estimated incentive",
                                self.policy.cap_percent()
                            ),
                        );
                    }
                }
            }
            _ => {}
        }

        Ok(errors)
    }
}

pub(crate) fn check_estimated_weight(
    new: &PpmShipment,
    _old: Option<&PpmShipment>,
    _shipment: Option<&Shipment>,
) -> CheckResult {
    let mut errors = ValidationErrors::new();
    if new.estimated_weight.is_none() {
        errors.add(
            "estimated_weight",
            "Estimated weight must be set before an incentive can be estimated",
        );
    }
    Ok(errors)
}

/// With SIT expected the details are either all deferred to a counselor or all supplied.
pub(crate) fn check_sit_required_fields(
    new: &PpmShipment,
    _old: Option<&PpmShipment>,
    _shipment: Option<&Shipment>,
) -> CheckResult {
    let mut errors = ValidationErrors::new();
    if new.sit_expected != Some(true) {
        return Ok(errors);
    }

    let supplied = [
        ("sit_location", new.sit_location.is_some()),
        ("sit_estimated_weight", new.sit_estimated_weight.is_some()),
        (
            "sit_estimated_entry_date",
            new.sit_estimated_entry_date.is_some(),
        ),
        (
            "sit_estimated_departure_date",
            new.sit_estimated_departure_date.is_some(),
        ),
    ];

    if supplied.iter().all(|(_, present)| !present) {
        return Ok(errors);
    }

    for (field, present) in supplied {
        if !present {
            errors.add(field, "is required when SIT details are supplied");
        }
    }

    if let (Some(entry), Some(departure)) = (
        new.sit_estimated_entry_date,
        new.sit_estimated_departure_date,
    ) {
        if departure < entry {
            errors.add(
                "sit_estimated_departure_date",
                "SIT estimated departure date must not be before the entry date",
            );
        }
    }

    Ok(errors)
}

pub(crate) fn check_weights_non_negative(
    new: &PpmShipment,
    _old: Option<&PpmShipment>,
    _shipment: Option<&Shipment>,
) -> CheckResult {
    let mut errors = ValidationErrors::new();
    let weights: [(&str, Option<Pounds>); 4] = [
        ("estimated_weight", new.estimated_weight),
        ("pro_gear_weight", new.pro_gear_weight),
        ("spouse_pro_gear_weight", new.spouse_pro_gear_weight),
        ("sit_estimated_weight", new.sit_estimated_weight),
    ];

    for (field, weight) in weights {
        if weight.is_some_and(|weight| weight.0 < 0) {
            errors.add(field, "cannot be negative");
        }
    }

    Ok(errors)
}

/// Every live close-out document needs at least one upload that has not been deleted.
pub struct CloseOutUploadsCheck {
    uploads: Arc<dyn UploadCounter>,
}

impl CloseOutUploadsCheck {
    pub fn new(uploads: Arc<dyn UploadCounter>) -> Self {
        Self { uploads }
    }

    fn require_upload(
        &self,
        errors: &mut ValidationErrors,
        field: &str,
        document: &Document,
        description: String,
    ) -> Result<(), ServiceError> {
        let count = self
            .uploads
            .count_active_uploads(&document.id)
            .map_err(|err| ServiceError::query("Upload", "unable to count uploads", err))?;

        if count == 0 {
            errors.add(field, description);
        }
        Ok(())
    }
}

impl PpmShipmentValidator for CloseOutUploadsCheck {
    fn validate(
        &self,
        new: &PpmShipment,
        _old: Option<&PpmShipment>,
        _shipment: Option<&Shipment>,
    ) -> CheckResult {
        let mut errors = ValidationErrors::new();

        let live_tickets: Vec<_> = new
            .weight_tickets
            .iter()
            .filter(|ticket| ticket.deleted_at.is_none())
            .collect();
        if live_tickets.is_empty() {
            errors.add(
                "weight_tickets",
                "At least one weight ticket is required to submit close-out documentation",
            );
        }

        for ticket in live_tickets {
            self.require_upload(
                &mut errors,
                "weight_tickets",
                &ticket.empty_document,
                format!("weight ticket {} is missing an empty weight document", ticket.id),
            )?;
            self.require_upload(
                &mut errors,
                "weight_tickets",
                &ticket.full_document,
                format!("weight ticket {} is missing a full weight document", ticket.id),
            )?;
        }

        for ticket in new
            .progear_weight_tickets
            .iter()
            .filter(|ticket| ticket.deleted_at.is_none())
        {
            self.require_upload(
                &mut errors,
                "progear_weight_tickets",
                &ticket.document,
                format!("pro-gear weight ticket {} is missing a document", ticket.id),
            )?;
        }

        for expense in new
            .moving_expenses
            .iter()
            .filter(|expense| expense.deleted_at.is_none())
        {
            self.require_upload(
                &mut errors,
                "moving_expenses",
                &expense.document,
                format!("moving expense {} is missing a receipt", expense.id),
            )?;
        }

        Ok(errors)
    }
}
