use std::sync::Arc;

use chrono::{TimeZone, Utc};

use super::common::*;
use crate::workflows::ppm::domain::{
    MoveStatus, PpmDocumentStatus, PpmShipment, PpmShipmentStatus, ShipmentStatus,
};
use crate::workflows::ppm::error::ServiceError;
use crate::workflows::ppm::repository::ShipmentRouter;
use crate::workflows::ppm::status_router::{PpmShipmentRouter, StandardShipmentRouter};

const ALL_STATUSES: [PpmShipmentStatus; 8] = [
    PpmShipmentStatus::Draft,
    PpmShipmentStatus::Submitted,
    PpmShipmentStatus::WaitingOnCustomer,
    PpmShipmentStatus::NeedsAdvanceApproval,
    PpmShipmentStatus::NeedsCloseout,
    PpmShipmentStatus::CloseoutComplete,
    PpmShipmentStatus::PaymentApproved,
    PpmShipmentStatus::Complete,
];

fn recording_router() -> (
    PpmShipmentRouter<Arc<RecordingShipmentRouter>>,
    Arc<RecordingShipmentRouter>,
) {
    let shipments = Arc::new(RecordingShipmentRouter::default());
    (PpmShipmentRouter::new(shipments.clone()), shipments)
}

fn in_status(status: Option<PpmShipmentStatus>) -> PpmShipment {
    PpmShipment {
        status,
        ..persisted()
    }
}

fn expect_conflict(result: Result<(), ServiceError>) {
    match result {
        Err(ServiceError::Conflict { .. }) => {}
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[test]
fn set_to_draft_initialises_new_shipment() {
    let (router, _) = recording_router();
    let mut ppm = in_status(None);

    router.set_to_draft(&mut ppm).expect("new shipment moves to draft");

    assert_eq!(ppm.status, Some(PpmShipmentStatus::Draft));
    assert_eq!(ppm.shipment.status, Some(ShipmentStatus::Draft));
}

#[test]
fn submit_delegates_parent_transition() {
    let (router, shipments) = recording_router();
    for status in [None, Some(PpmShipmentStatus::Draft)] {
        let mut ppm = in_status(status);
        router.submit(&mut ppm).expect("draft shipment submits");

        assert_eq!(ppm.status, Some(PpmShipmentStatus::Submitted));
        assert_eq!(ppm.shipment.status, Some(ShipmentStatus::Submitted));
    }
    assert_eq!(shipments.calls(), vec!["submit", "submit"]);
}

#[test]
fn submit_surfaces_parent_router_failure_without_mutation() {
    let router = PpmShipmentRouter::new(RefusingShipmentRouter);
    let mut ppm = in_status(Some(PpmShipmentStatus::Draft));
    let before = ppm.clone();

    match router.submit(&mut ppm) {
        Err(ServiceError::Conflict { message, .. }) => assert_eq!(message, REFUSAL),
        other => panic!("expected parent router conflict, got {other:?}"),
    }
    assert_eq!(ppm, before);
}

#[test]
fn disallowed_transitions_conflict_and_leave_record_untouched() {
    let (router, shipments) = recording_router();

    for status in ALL_STATUSES {
        let original = in_status(Some(status));

        let mut ppm = original.clone();
        expect_conflict(router.set_to_draft(&mut ppm));
        assert_eq!(ppm, original, "set_to_draft mutated {status}");

        if status != PpmShipmentStatus::Draft {
            let mut ppm = original.clone();
            expect_conflict(router.submit(&mut ppm));
            assert_eq!(ppm, original, "submit mutated {status}");
        }

        if !matches!(
            status,
            PpmShipmentStatus::Submitted | PpmShipmentStatus::NeedsCloseout
        ) {
            let mut ppm = original.clone();
            expect_conflict(router.send_to_customer(&mut ppm));
            assert_eq!(ppm, original, "send_to_customer mutated {status}");
        }

        if status != PpmShipmentStatus::WaitingOnCustomer {
            let mut ppm = original.clone();
            expect_conflict(router.submit_close_out_documentation(&mut ppm));
            assert_eq!(ppm, original, "close-out mutated {status}");
        }

        if status != PpmShipmentStatus::NeedsCloseout {
            let mut ppm = original.clone();
            expect_conflict(router.submit_reviewed_documents(&mut ppm));
            assert_eq!(ppm, original, "review mutated {status}");
        }
    }

    assert!(shipments.calls().is_empty());
}

#[test]
fn new_shipment_cannot_skip_ahead() {
    let (router, _) = recording_router();

    let mut ppm = in_status(None);
    expect_conflict(router.send_to_customer(&mut ppm));
    expect_conflict(router.submit_close_out_documentation(&mut ppm));
    expect_conflict(router.submit_reviewed_documents(&mut ppm));
    assert_eq!(ppm.status, None);
}

#[test]
fn send_to_customer_approves_parent_and_records_approval_time() {
    let (router, shipments) = recording_router();
    let mut ppm = in_status(Some(PpmShipmentStatus::Submitted));
    ppm.shipment.status = Some(ShipmentStatus::Submitted);

    router
        .send_to_customer(&mut ppm)
        .expect("submitted shipment goes to customer");

    assert_eq!(ppm.status, Some(PpmShipmentStatus::WaitingOnCustomer));
    assert_eq!(ppm.shipment.status, Some(ShipmentStatus::Approved));
    assert_eq!(ppm.approved_at, ppm.shipment.approved_date);
    assert!(ppm.approved_at.is_some());
    assert_eq!(shipments.calls(), vec!["approve"]);
}

#[test]
fn send_to_customer_skips_approval_when_parent_already_approved() {
    let (router, shipments) = recording_router();
    let approved_date = Utc
        .with_ymd_and_hms(2024, 11, 5, 8, 0, 0)
        .single()
        .expect("valid timestamp");
    let mut ppm = in_status(Some(PpmShipmentStatus::NeedsCloseout));
    ppm.shipment.status = Some(ShipmentStatus::Approved);
    ppm.shipment.approved_date = Some(approved_date);

    router
        .send_to_customer(&mut ppm)
        .expect("closeout shipment goes back to customer");

    assert!(shipments.calls().is_empty());
    assert_eq!(ppm.approved_at, Some(approved_date));
}

#[test]
fn approval_time_is_never_overwritten() {
    let (router, _) = recording_router();
    let first_approval = Utc
        .with_ymd_and_hms(2024, 10, 1, 15, 0, 0)
        .single()
        .expect("valid timestamp");
    let mut ppm = in_status(Some(PpmShipmentStatus::NeedsCloseout));
    ppm.approved_at = Some(first_approval);

    router
        .send_to_customer(&mut ppm)
        .expect("closeout shipment goes back to customer");

    assert_eq!(ppm.approved_at, Some(first_approval));

    expect_conflict(router.send_to_customer(&mut ppm));
    assert_eq!(ppm.approved_at, Some(first_approval));
}

#[test]
fn close_out_submission_keeps_first_submission_time() {
    let (router, _) = recording_router();
    let first_submission = Utc
        .with_ymd_and_hms(2025, 3, 2, 10, 0, 0)
        .single()
        .expect("valid timestamp");

    let mut fresh = in_status(Some(PpmShipmentStatus::WaitingOnCustomer));
    router
        .submit_close_out_documentation(&mut fresh)
        .expect("waiting shipment submits close-out");
    assert_eq!(fresh.status, Some(PpmShipmentStatus::NeedsCloseout));
    assert!(fresh.submitted_at.is_some());

    let mut resubmitted = in_status(Some(PpmShipmentStatus::WaitingOnCustomer));
    resubmitted.submitted_at = Some(first_submission);
    router
        .submit_close_out_documentation(&mut resubmitted)
        .expect("waiting shipment submits close-out again");
    assert_eq!(resubmitted.submitted_at, Some(first_submission));
}

#[test]
fn reviewed_documents_route_on_rejections() {
    let (router, _) = recording_router();

    let mut rejected = in_status(Some(PpmShipmentStatus::NeedsCloseout));
    rejected.weight_tickets = vec![weight_ticket(Some(PpmDocumentStatus::Approved))];
    rejected.moving_expenses = vec![moving_expense(Some(PpmDocumentStatus::Rejected))];
    router
        .submit_reviewed_documents(&mut rejected)
        .expect("review completes");
    assert_eq!(rejected.status, Some(PpmShipmentStatus::WaitingOnCustomer));

    let mut accepted = in_status(Some(PpmShipmentStatus::NeedsCloseout));
    accepted.weight_tickets = vec![weight_ticket(Some(PpmDocumentStatus::Approved))];
    accepted.progear_weight_tickets = vec![progear_ticket(Some(PpmDocumentStatus::Excluded))];
    router
        .submit_reviewed_documents(&mut accepted)
        .expect("review completes");
    assert_eq!(accepted.status, Some(PpmShipmentStatus::CloseoutComplete));
}

#[test]
fn deleted_rejections_do_not_send_shipment_back() {
    let (router, _) = recording_router();
    let mut deleted = weight_ticket(Some(PpmDocumentStatus::Rejected));
    deleted.deleted_at = Some(Utc::now());

    let mut ppm = in_status(Some(PpmShipmentStatus::NeedsCloseout));
    ppm.weight_tickets = vec![deleted, weight_ticket(Some(PpmDocumentStatus::Approved))];
    router
        .submit_reviewed_documents(&mut ppm)
        .expect("review completes");

    assert_eq!(ppm.status, Some(PpmShipmentStatus::CloseoutComplete));
}

#[test]
fn full_lifecycle_round_trip() {
    let (router, shipments) = recording_router();
    let mut ppm = in_status(None);
    ppm.shipment.status = None;

    router.set_to_draft(&mut ppm).expect("draft");
    router.submit(&mut ppm).expect("submit");
    router.send_to_customer(&mut ppm).expect("send to customer");
    router
        .submit_close_out_documentation(&mut ppm)
        .expect("close-out");
    router
        .submit_reviewed_documents(&mut ppm)
        .expect("review");

    assert_eq!(ppm.status, Some(PpmShipmentStatus::CloseoutComplete));
    assert_eq!(ppm.shipment.status, Some(ShipmentStatus::Approved));
    assert!(ppm.approved_at.is_some());
    assert!(ppm.submitted_at.is_some());
    assert_eq!(shipments.calls(), vec!["submit", "approve"]);
}

#[test]
fn standard_router_guards_parent_transitions() {
    let router = StandardShipmentRouter;
    let mut shipment = parent_shipment(MoveStatus::Draft);

    router
        .approve(&mut shipment)
        .expect_err("draft parent cannot be approved");
    assert_eq!(shipment.status, Some(ShipmentStatus::Draft));

    router.submit(&mut shipment).expect("draft parent submits");
    router
        .approve(&mut shipment)
        .expect("submitted parent approves");

    assert_eq!(shipment.status, Some(ShipmentStatus::Approved));
    assert!(shipment.approved_date.is_some());
}
