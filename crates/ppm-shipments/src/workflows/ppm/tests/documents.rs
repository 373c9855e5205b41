use super::common::*;
use crate::workflows::ppm::documents::PpmDocumentKind;
use crate::workflows::ppm::domain::{PpmDocumentId, PpmDocumentStatus, PpmShipmentStatus};
use crate::workflows::ppm::error::ServiceError;
use crate::workflows::ppm::repository::UploadCounter;

#[test]
fn deleting_weight_ticket_cascades_to_documents_and_uploads() {
    let (service, store, _) = build_service();
    let waiting = waiting_on_customer(&service);
    let documented = with_documents(
        &service,
        &waiting,
        vec![weight_ticket(None), weight_ticket(None)],
        Vec::new(),
        Vec::new(),
    );
    let id = documented.id.expect("id");
    let doomed = documented.weight_tickets[0].clone();

    let after = service
        .delete_weight_ticket(id, doomed.id)
        .expect("delete succeeds");

    let deleted = &after.weight_tickets[0];
    assert!(deleted.deleted_at.is_some());
    assert!(deleted.empty_document.deleted_at.is_some());
    assert!(deleted.full_document.deleted_at.is_some());
    assert!(deleted.proof_of_trailer_ownership_document.deleted_at.is_some());
    assert!(deleted
        .empty_document
        .uploads
        .iter()
        .all(|upload| upload.deleted_at.is_some()));
    assert!(after.weight_tickets[1].deleted_at.is_none());

    assert_eq!(
        store
            .count_active_uploads(&doomed.empty_document.id)
            .expect("count"),
        0
    );

    let parent = service.fetch(id).expect("parent still readable");
    assert!(parent.deleted_at.is_none());
    assert_eq!(parent.status, Some(PpmShipmentStatus::WaitingOnCustomer));
    assert_eq!(parent.weight_tickets.len(), 2);
}

#[test]
fn deleting_missing_or_deleted_child_is_not_found() {
    let (service, _, _) = build_service();
    let waiting = waiting_on_customer(&service);
    let documented = with_documents(
        &service,
        &waiting,
        Vec::new(),
        Vec::new(),
        vec![moving_expense(None)],
    );
    let id = documented.id.expect("id");
    let expense = documented.moving_expenses[0].id;

    service
        .delete_moving_expense(id, expense)
        .expect("first delete succeeds");

    match service.delete_moving_expense(id, expense) {
        Err(ServiceError::NotFound { id: missing, message }) => {
            assert_eq!(missing, expense.0);
            assert_eq!(message, "while looking for MovingExpense");
        }
        other => panic!("expected not found, got {other:?}"),
    }

    let unknown = PpmDocumentId::new();
    match service.soft_delete(id, PpmDocumentKind::ProgearWeightTicket, unknown) {
        Err(ServiceError::NotFound { message, .. }) => {
            assert_eq!(message, "while looking for ProgearWeightTicket")
        }
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn deleted_progear_ticket_no_longer_needs_uploads() {
    let (service, _, _) = build_service();
    let waiting = waiting_on_customer(&service);
    let mut empty_progear = progear_ticket(None);
    empty_progear.document.uploads.clear();
    let documented = with_documents(
        &service,
        &waiting,
        vec![weight_ticket(None)],
        vec![empty_progear.clone()],
        Vec::new(),
    );
    let id = documented.id.expect("id");

    let trimmed = service
        .delete_progear_weight_ticket(id, empty_progear.id)
        .expect("delete succeeds");
    let closeout = service
        .submit_close_out_documentation(id, &etag_of(&trimmed), signature("I certify."))
        .expect("close-out succeeds once the empty ticket is gone");

    assert_eq!(closeout.status, Some(PpmShipmentStatus::NeedsCloseout));
}

#[test]
fn deleting_rejected_ticket_lets_review_complete() {
    let (service, _, _) = build_service();
    let rejected = weight_ticket(Some(PpmDocumentStatus::Rejected));
    let closeout = needs_closeout(
        &service,
        vec![weight_ticket(Some(PpmDocumentStatus::Approved)), rejected.clone()],
        Vec::new(),
        Vec::new(),
    );
    let id = closeout.id.expect("id");

    service
        .delete_weight_ticket(id, rejected.id)
        .expect("delete succeeds");
    let reviewed = service
        .submit_reviewed_documents(id, signature("Reviewed."))
        .expect("review succeeds");

    assert_eq!(reviewed.status, Some(PpmShipmentStatus::CloseoutComplete));
}
