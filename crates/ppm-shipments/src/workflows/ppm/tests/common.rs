use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::workflows::ppm::domain::{
    Address, AddressId, Cents, Document, DocumentId, MoveStatus, MovingExpense,
    MovingExpenseType, Pounds, PpmDocumentId, PpmDocumentStatus, PpmShipment, PpmShipmentId,
    PpmShipmentStatus, ProgearWeightTicket, Shipment, ShipmentId, ShipmentStatus, ShipmentType,
    SitLocation, Upload, WeightTicket,
};
use crate::workflows::ppm::error::ServiceError;
use crate::workflows::ppm::memory::{MemoryPpmStore, MemoryTransaction};
use crate::workflows::ppm::repository::{
    PpmRepository, RepositoryError, ShipmentRouter, UploadCounter,
};
use crate::workflows::ppm::service::{CertificationSubmission, PpmShipmentService};
use crate::workflows::ppm::{AdvancePolicy, RateTableEstimator};

pub(super) const BASE_CENTS: i64 = 150_000;
pub(super) const CENTS_PER_POUND: i64 = 55;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn address(street: &str, postal_code: &str) -> Address {
    Address {
        id: None,
        street_address_1: street.to_string(),
        street_address_2: None,
        street_address_3: None,
        city: "Fort Liberty".to_string(),
        state: "NC".to_string(),
        postal_code: postal_code.to_string(),
    }
}

pub(super) fn stored_address(street: &str, postal_code: &str) -> Address {
    Address {
        id: Some(AddressId::new()),
        ..address(street, postal_code)
    }
}

pub(super) fn parent_shipment(move_status: MoveStatus) -> Shipment {
    Shipment {
        id: Some(ShipmentId::new()),
        shipment_type: Some(ShipmentType::Ppm),
        status: Some(ShipmentStatus::Draft),
        approved_date: None,
        move_status: Some(move_status),
    }
}

/// A valid create candidate for a draft move.
pub(super) fn candidate() -> PpmShipment {
    candidate_for(MoveStatus::Draft)
}

pub(super) fn candidate_for(move_status: MoveStatus) -> PpmShipment {
    let shipment = parent_shipment(move_status);
    PpmShipment {
        shipment_id: shipment.id,
        shipment,
        expected_departure_date: Some(date(2030, 6, 1)),
        pickup_address: Some(address("100 Main St", "28310")),
        destination_address: Some(address("200 Harbor Way", "98433")),
        has_secondary_pickup_address: Some(false),
        has_secondary_destination_address: Some(false),
        sit_expected: Some(false),
        estimated_weight: Some(Pounds(4_000)),
        has_pro_gear: Some(false),
        ..PpmShipment::default()
    }
}

/// A consistent persisted record, as the store would hand it back.
pub(super) fn persisted() -> PpmShipment {
    let shipment = parent_shipment(MoveStatus::Draft);
    let pickup = stored_address("100 Main St", "28310");
    let destination = stored_address("200 Harbor Way", "98433");
    let secondary_pickup = stored_address("12 Side Rd", "28311");
    let tertiary_pickup = stored_address("14 Side Rd", "28312");
    let stamp = Utc
        .with_ymd_and_hms(2025, 1, 15, 12, 0, 0)
        .single()
        .expect("valid timestamp");

    PpmShipment {
        id: Some(PpmShipmentId::new()),
        shipment_id: shipment.id,
        shipment,
        status: Some(PpmShipmentStatus::Draft),
        expected_departure_date: Some(date(2030, 6, 1)),
        pickup_address_id: pickup.id,
        pickup_address: Some(pickup),
        has_secondary_pickup_address: Some(true),
        secondary_pickup_address_id: secondary_pickup.id,
        secondary_pickup_address: Some(secondary_pickup),
        has_tertiary_pickup_address: Some(true),
        tertiary_pickup_address_id: tertiary_pickup.id,
        tertiary_pickup_address: Some(tertiary_pickup),
        destination_address_id: destination.id,
        destination_address: Some(destination),
        has_secondary_destination_address: Some(false),
        sit_expected: Some(true),
        sit_location: Some(SitLocation::Origin),
        sit_estimated_weight: Some(Pounds(1_200)),
        sit_estimated_entry_date: Some(date(2030, 6, 2)),
        sit_estimated_departure_date: Some(date(2030, 6, 20)),
        estimated_weight: Some(Pounds(4_000)),
        has_pro_gear: Some(true),
        pro_gear_weight: Some(Pounds(300)),
        spouse_pro_gear_weight: Some(Pounds(120)),
        estimated_incentive: Some(Cents(1_000_000)),
        has_requested_advance: Some(true),
        advance_amount_requested: Some(Cents(400_000)),
        has_received_advance: Some(false),
        created_at: Some(stamp),
        updated_at: Some(stamp),
        ..PpmShipment::default()
    }
}

pub(super) fn upload(name: &str) -> Upload {
    Upload {
        id: Uuid::new_v4(),
        filename: name.to_string(),
        deleted_at: None,
    }
}

pub(super) fn document_with(uploads: Vec<Upload>) -> Document {
    Document {
        id: DocumentId::new(),
        uploads,
        deleted_at: None,
    }
}

pub(super) fn weight_ticket(status: Option<PpmDocumentStatus>) -> WeightTicket {
    WeightTicket {
        id: PpmDocumentId::new(),
        vehicle_description: Some("2019 pickup".to_string()),
        empty_weight: Some(Pounds(5_200)),
        full_weight: Some(Pounds(8_900)),
        empty_document: document_with(vec![upload("empty.pdf")]),
        full_document: document_with(vec![upload("full.pdf")]),
        proof_of_trailer_ownership_document: document_with(Vec::new()),
        status,
        reason: None,
        deleted_at: None,
    }
}

pub(super) fn progear_ticket(status: Option<PpmDocumentStatus>) -> ProgearWeightTicket {
    ProgearWeightTicket {
        id: PpmDocumentId::new(),
        belongs_to_self: Some(true),
        weight: Some(Pounds(250)),
        document: document_with(vec![upload("progear.pdf")]),
        status,
        reason: None,
        deleted_at: None,
    }
}

pub(super) fn moving_expense(status: Option<PpmDocumentStatus>) -> MovingExpense {
    MovingExpense {
        id: PpmDocumentId::new(),
        expense_type: Some(MovingExpenseType::Tolls),
        description: Some("Turnpike".to_string()),
        amount: Some(Cents(2_450)),
        paid_with_gtcc: Some(false),
        document: document_with(vec![upload("receipt.pdf")]),
        status,
        reason: None,
        deleted_at: None,
    }
}

pub(super) fn signature(text: &str) -> CertificationSubmission {
    CertificationSubmission {
        certification_text: text.to_string(),
        signature: "Jordan Rivera".to_string(),
    }
}

/// Shipment router stub that always succeeds and records what it was asked to do.
#[derive(Debug, Default)]
pub(super) struct RecordingShipmentRouter {
    calls: Mutex<Vec<&'static str>>,
}

impl RecordingShipmentRouter {
    pub(super) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("router mutex poisoned").clone()
    }
}

impl ShipmentRouter for RecordingShipmentRouter {
    fn submit(&self, shipment: &mut Shipment) -> Result<(), ServiceError> {
        self.calls.lock().expect("router mutex poisoned").push("submit");
        shipment.status = Some(ShipmentStatus::Submitted);
        Ok(())
    }

    fn approve(&self, shipment: &mut Shipment) -> Result<(), ServiceError> {
        self.calls
            .lock()
            .expect("router mutex poisoned")
            .push("approve");
        shipment.status = Some(ShipmentStatus::Approved);
        shipment.approved_date = Some(
            Utc.with_ymd_and_hms(2025, 2, 1, 9, 30, 0)
                .single()
                .expect("valid timestamp"),
        );
        Ok(())
    }
}

pub(super) const REFUSAL: &str = "shipment router refused";

/// Shipment router stub that refuses every request.
pub(super) struct RefusingShipmentRouter;

impl ShipmentRouter for RefusingShipmentRouter {
    fn submit(&self, shipment: &mut Shipment) -> Result<(), ServiceError> {
        Err(ServiceError::Conflict {
            id: shipment.id.map(|id| id.0).unwrap_or_else(Uuid::nil),
            message: REFUSAL.to_string(),
        })
    }

    fn approve(&self, shipment: &mut Shipment) -> Result<(), ServiceError> {
        Err(ServiceError::Conflict {
            id: shipment.id.map(|id| id.0).unwrap_or_else(Uuid::nil),
            message: REFUSAL.to_string(),
        })
    }
}

pub(super) type TestService =
    PpmShipmentService<MemoryPpmStore, Arc<RecordingShipmentRouter>, RateTableEstimator>;

pub(super) fn build_service() -> (
    TestService,
    Arc<MemoryPpmStore>,
    Arc<RecordingShipmentRouter>,
) {
    let store = Arc::new(MemoryPpmStore::new());
    let router = Arc::new(RecordingShipmentRouter::default());
    let service = PpmShipmentService::new(
        store.clone(),
        router.clone(),
        Arc::new(RateTableEstimator::new(
            Cents(BASE_CENTS),
            Cents(CENTS_PER_POUND),
        )),
        AdvancePolicy::default(),
    );
    (service, store, router)
}

pub(super) fn etag_of(ppm: &PpmShipment) -> String {
    ppm.etag().expect("persisted record carries an etag")
}

/// Creates a draft PPM shipment and walks it to `WaitingOnCustomer`.
pub(super) fn waiting_on_customer(service: &TestService) -> PpmShipment {
    let created = service
        .create_with_default_checks(candidate())
        .expect("create succeeds");
    let id = created.id.expect("id assigned");
    let submitted = service
        .submit(id, &etag_of(&created))
        .expect("submit succeeds");
    service
        .send_to_customer(id, &etag_of(&submitted))
        .expect("send to customer succeeds")
}

/// Attaches close-out documents through the regular update flow.
pub(super) fn with_documents(
    service: &TestService,
    ppm: &PpmShipment,
    weight_tickets: Vec<WeightTicket>,
    progear_weight_tickets: Vec<ProgearWeightTicket>,
    moving_expenses: Vec<MovingExpense>,
) -> PpmShipment {
    let update = PpmShipment {
        weight_tickets,
        progear_weight_tickets,
        moving_expenses,
        ..PpmShipment::default()
    };
    service
        .update_with_default_checks(
            update,
            ppm.shipment_id.expect("shipment id"),
            &etag_of(ppm),
        )
        .expect("documents attach")
}

/// Walks a shipment to `NeedsCloseout` with the given documents attached.
pub(super) fn needs_closeout(
    service: &TestService,
    weight_tickets: Vec<WeightTicket>,
    progear_weight_tickets: Vec<ProgearWeightTicket>,
    moving_expenses: Vec<MovingExpense>,
) -> PpmShipment {
    let waiting = waiting_on_customer(service);
    let documented = with_documents(
        service,
        &waiting,
        weight_tickets,
        progear_weight_tickets,
        moving_expenses,
    );
    service
        .submit_close_out_documentation(
            documented.id.expect("id"),
            &etag_of(&documented),
            signature("I certify the close-out documents are accurate."),
        )
        .expect("close-out submission succeeds")
}

pub(super) struct UnavailableRepository;

impl PpmRepository for UnavailableRepository {
    type Transaction = MemoryTransaction;

    fn begin(&self) -> Result<Self::Transaction, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

impl UploadCounter for UnavailableRepository {
    fn count_active_uploads(&self, _document: &DocumentId) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) struct UnavailableUploads;

impl UploadCounter for UnavailableUploads {
    fn count_active_uploads(&self, _document: &DocumentId) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("upload store offline".to_string()))
    }
}

/// Upload counter that reports every document as empty.
pub(super) struct EmptyUploads;

impl UploadCounter for EmptyUploads {
    fn count_active_uploads(&self, _document: &DocumentId) -> Result<usize, RepositoryError> {
        Ok(0)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
