use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for PPM shipment records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PpmShipmentId(pub Uuid);

/// Identifier of the generic parent shipment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipmentId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub Uuid);

/// Identifier shared by the close-out child records (weight tickets, pro-gear tickets, expenses).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PpmDocumentId(pub Uuid);

macro_rules! display_uuid {
    ($($name:ident),*) => {
        $(
            impl $name {
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    self.0.fmt(f)
                }
            }
        )*
    };
}

display_uuid!(PpmShipmentId, ShipmentId, AddressId, DocumentId, PpmDocumentId);

/// Weight in pounds. Signed so that invalid inbound values can be reported instead of rejected by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pounds(pub i64);

/// Monetary amount in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cents(pub i64);

/// Lifecycle status of a PPM shipment. A record with no status is new.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PpmShipmentStatus {
    Draft,
    Submitted,
    WaitingOnCustomer,
    NeedsAdvanceApproval,
    /// Also surfaced as "needs payment approval" to counselors.
    NeedsCloseout,
    CloseoutComplete,
    PaymentApproved,
    Complete,
}

impl PpmShipmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PpmShipmentStatus::Draft => "Draft",
            PpmShipmentStatus::Submitted => "Submitted",
            PpmShipmentStatus::WaitingOnCustomer => "WaitingOnCustomer",
            PpmShipmentStatus::NeedsAdvanceApproval => "NeedsAdvanceApproval",
            PpmShipmentStatus::NeedsCloseout => "NeedsCloseout",
            PpmShipmentStatus::CloseoutComplete => "CloseoutComplete",
            PpmShipmentStatus::PaymentApproved => "PaymentApproved",
            PpmShipmentStatus::Complete => "Complete",
        }
    }
}

impl fmt::Display for PpmShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Status of the generic parent shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShipmentStatus {
    Draft,
    Submitted,
    Approved,
    ApprovalsRequested,
    Rejected,
    CancellationRequested,
    Canceled,
    Diversion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShipmentType {
    Ppm,
    Hhg,
    NtsRelease,
    Nts,
    BoatHaulAway,
    MobileHome,
}

/// Status of the move the parent shipment belongs to; drives the initial PPM status on create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveStatus {
    Draft,
    NeedsServiceCounseling,
    ServiceCounselingCompleted,
    Submitted,
    ApprovalsRequested,
    Approved,
    Canceled,
}

/// Generic parent shipment whose status the PPM router keeps loosely in sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Shipment {
    pub id: Option<ShipmentId>,
    pub shipment_type: Option<ShipmentType>,
    pub status: Option<ShipmentStatus>,
    pub approved_date: Option<DateTime<Utc>>,
    pub move_status: Option<MoveStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub id: Option<AddressId>,
    pub street_address_1: String,
    pub street_address_2: Option<String>,
    pub street_address_3: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SitLocation {
    Origin,
    Destination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvanceStatus {
    Approved,
    Edited,
    Rejected,
}

/// Counselor review outcome recorded on each close-out document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PpmDocumentStatus {
    Approved,
    Excluded,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    pub id: Uuid,
    pub filename: String,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Aggregate owning the uploads attached to a single close-out document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    #[serde(default)]
    pub uploads: Vec<Upload>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            id: DocumentId::new(),
            uploads: Vec::new(),
            deleted_at: None,
        }
    }

    pub fn active_uploads(&self) -> impl Iterator<Item = &Upload> {
        self.uploads
            .iter()
            .filter(|upload| upload.deleted_at.is_none())
    }

    pub(crate) fn soft_delete(&mut self, at: DateTime<Utc>) {
        self.deleted_at = Some(at);
        for upload in self.uploads.iter_mut() {
            if upload.deleted_at.is_none() {
                upload.deleted_at = Some(at);
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTicket {
    pub id: PpmDocumentId,
    pub vehicle_description: Option<String>,
    pub empty_weight: Option<Pounds>,
    pub full_weight: Option<Pounds>,
    pub empty_document: Document,
    pub full_document: Document,
    pub proof_of_trailer_ownership_document: Document,
    pub status: Option<PpmDocumentStatus>,
    pub reason: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgearWeightTicket {
    pub id: PpmDocumentId,
    pub belongs_to_self: Option<bool>,
    pub weight: Option<Pounds>,
    pub document: Document,
    pub status: Option<PpmDocumentStatus>,
    pub reason: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovingExpenseType {
    ContractedExpense,
    Oil,
    PackingMaterials,
    RentalEquipment,
    Storage,
    Tolls,
    WeighingFee,
    SmallPackage,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingExpense {
    pub id: PpmDocumentId,
    pub expense_type: Option<MovingExpenseType>,
    pub description: Option<String>,
    pub amount: Option<Cents>,
    pub paid_with_gtcc: Option<bool>,
    pub document: Document,
    pub status: Option<PpmDocumentStatus>,
    pub reason: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificationType {
    /// Customer attests to the close-out documentation.
    PpmPayment,
    /// Counselor attests to the reviewed close-out documentation.
    CloseoutReviewedPpmPayment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCertification {
    pub id: Uuid,
    pub ppm_shipment_id: PpmShipmentId,
    pub certification_type: CertificationType,
    pub certification_text: String,
    pub signature: String,
    pub date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The personally procured move shipment. The same shape carries a persisted record and a
/// partial update candidate: `None` means "not supplied".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PpmShipment {
    pub id: Option<PpmShipmentId>,
    pub shipment_id: Option<ShipmentId>,
    pub shipment: Shipment,
    pub status: Option<PpmShipmentStatus>,

    pub expected_departure_date: Option<NaiveDate>,
    pub actual_move_date: Option<NaiveDate>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,

    pub pickup_address_id: Option<AddressId>,
    pub pickup_address: Option<Address>,
    pub has_secondary_pickup_address: Option<bool>,
    pub secondary_pickup_address_id: Option<AddressId>,
    pub secondary_pickup_address: Option<Address>,
    pub has_tertiary_pickup_address: Option<bool>,
    pub tertiary_pickup_address_id: Option<AddressId>,
    pub tertiary_pickup_address: Option<Address>,
    pub actual_pickup_postal_code: Option<String>,

    pub destination_address_id: Option<AddressId>,
    pub destination_address: Option<Address>,
    pub has_secondary_destination_address: Option<bool>,
    pub secondary_destination_address_id: Option<AddressId>,
    pub secondary_destination_address: Option<Address>,
    pub has_tertiary_destination_address: Option<bool>,
    pub tertiary_destination_address_id: Option<AddressId>,
    pub tertiary_destination_address: Option<Address>,
    pub actual_destination_postal_code: Option<String>,

    pub w2_address_id: Option<AddressId>,
    pub w2_address: Option<Address>,

    pub sit_expected: Option<bool>,
    pub sit_location: Option<SitLocation>,
    pub sit_estimated_weight: Option<Pounds>,
    pub sit_estimated_entry_date: Option<NaiveDate>,
    pub sit_estimated_departure_date: Option<NaiveDate>,
    /// Priced by the estimator; never taken from a candidate.
    pub sit_estimated_cost: Option<Cents>,

    pub estimated_weight: Option<Pounds>,
    pub has_pro_gear: Option<bool>,
    pub pro_gear_weight: Option<Pounds>,
    pub spouse_pro_gear_weight: Option<Pounds>,

    pub estimated_incentive: Option<Cents>,
    pub final_incentive: Option<Cents>,
    pub has_requested_advance: Option<bool>,
    pub advance_amount_requested: Option<Cents>,
    pub advance_status: Option<AdvanceStatus>,
    pub has_received_advance: Option<bool>,
    pub advance_amount_received: Option<Cents>,

    pub weight_tickets: Vec<WeightTicket>,
    pub progear_weight_tickets: Vec<ProgearWeightTicket>,
    pub moving_expenses: Vec<MovingExpense>,
    /// Customer's close-out attestation.
    pub signed_certification: Option<SignedCertification>,
    /// Counselor's attestation from the latest document review.
    pub reviewed_certification: Option<SignedCertification>,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl PpmShipment {
    /// Opaque version token for optimistic concurrency; `None` until the record is persisted.
    pub fn etag(&self) -> Option<String> {
        self.updated_at.map(etag)
    }

    /// True when any live weight ticket, pro-gear ticket, or moving expense was rejected in review.
    pub fn has_rejected_documents(&self) -> bool {
        let rejected = |status: Option<PpmDocumentStatus>, deleted_at: Option<DateTime<Utc>>| {
            deleted_at.is_none() && status == Some(PpmDocumentStatus::Rejected)
        };

        self.weight_tickets
            .iter()
            .any(|ticket| rejected(ticket.status, ticket.deleted_at))
            || self
                .progear_weight_tickets
                .iter()
                .any(|ticket| rejected(ticket.status, ticket.deleted_at))
            || self
                .moving_expenses
                .iter()
                .any(|expense| rejected(expense.status, expense.deleted_at))
    }
}

/// Fields a customer supplies when starting a PPM shipment. Status, review outcomes, pricing,
/// timestamps and certifications are owned by the workflows and cannot be set here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewPpmShipment {
    pub shipment_id: Option<ShipmentId>,
    pub shipment: Shipment,
    pub expected_departure_date: Option<NaiveDate>,

    pub pickup_address: Option<Address>,
    pub has_secondary_pickup_address: Option<bool>,
    pub secondary_pickup_address: Option<Address>,
    pub has_tertiary_pickup_address: Option<bool>,
    pub tertiary_pickup_address: Option<Address>,

    pub destination_address: Option<Address>,
    pub has_secondary_destination_address: Option<bool>,
    pub secondary_destination_address: Option<Address>,
    pub has_tertiary_destination_address: Option<bool>,
    pub tertiary_destination_address: Option<Address>,

    pub sit_expected: Option<bool>,
    pub sit_location: Option<SitLocation>,
    pub sit_estimated_weight: Option<Pounds>,
    pub sit_estimated_entry_date: Option<NaiveDate>,
    pub sit_estimated_departure_date: Option<NaiveDate>,

    pub estimated_weight: Option<Pounds>,
    pub has_pro_gear: Option<bool>,
    pub pro_gear_weight: Option<Pounds>,
    pub spouse_pro_gear_weight: Option<Pounds>,

    pub has_requested_advance: Option<bool>,
    pub advance_amount_requested: Option<Cents>,
}

impl From<NewPpmShipment> for PpmShipment {
    fn from(new: NewPpmShipment) -> Self {
        PpmShipment {
            shipment_id: new.shipment_id,
            shipment: new.shipment,
            expected_departure_date: new.expected_departure_date,
            pickup_address: new.pickup_address,
            has_secondary_pickup_address: new.has_secondary_pickup_address,
            secondary_pickup_address: new.secondary_pickup_address,
            has_tertiary_pickup_address: new.has_tertiary_pickup_address,
            tertiary_pickup_address: new.tertiary_pickup_address,
            destination_address: new.destination_address,
            has_secondary_destination_address: new.has_secondary_destination_address,
            secondary_destination_address: new.secondary_destination_address,
            has_tertiary_destination_address: new.has_tertiary_destination_address,
            tertiary_destination_address: new.tertiary_destination_address,
            sit_expected: new.sit_expected,
            sit_location: new.sit_location,
            sit_estimated_weight: new.sit_estimated_weight,
            sit_estimated_entry_date: new.sit_estimated_entry_date,
            sit_estimated_departure_date: new.sit_estimated_departure_date,
            estimated_weight: new.estimated_weight,
            has_pro_gear: new.has_pro_gear,
            pro_gear_weight: new.pro_gear_weight,
            spouse_pro_gear_weight: new.spouse_pro_gear_weight,
            has_requested_advance: new.has_requested_advance,
            advance_amount_requested: new.advance_amount_requested,
            ..PpmShipment::default()
        }
    }
}

/// Version token derived from a record's last-modified timestamp.
pub fn etag(updated_at: DateTime<Utc>) -> String {
    STANDARD.encode(updated_at.to_rfc3339_opts(SecondsFormat::Nanos, true))
}
