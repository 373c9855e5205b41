use chrono::{DateTime, Utc};
use tracing::info;

use super::domain::{PpmDocumentId, PpmShipment, PpmShipmentId};
use super::error::ServiceError;
use super::repository::{transact, IncentiveEstimator, PpmRepository, ShipmentRouter};
use super::service::{find_by_id, persist, PpmShipmentService};

/// Close-out child records that can be removed from a PPM shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PpmDocumentKind {
    WeightTicket,
    ProgearWeightTicket,
    MovingExpense,
}

impl PpmDocumentKind {
    pub const fn model(self) -> &'static str {
        match self {
            PpmDocumentKind::WeightTicket => "WeightTicket",
            PpmDocumentKind::ProgearWeightTicket => "ProgearWeightTicket",
            PpmDocumentKind::MovingExpense => "MovingExpense",
        }
    }
}

/// Stamps `deleted_at` on the matching live child, the documents it owns and their uploads.
fn mark_deleted(
    ppm: &mut PpmShipment,
    kind: PpmDocumentKind,
    id: PpmDocumentId,
    at: DateTime<Utc>,
) -> bool {
    match kind {
        PpmDocumentKind::WeightTicket => {
            let Some(ticket) = ppm
                .weight_tickets
                .iter_mut()
                .find(|ticket| ticket.id == id && ticket.deleted_at.is_none())
            else {
                return false;
            };
            ticket.deleted_at = Some(at);
            ticket.empty_document.soft_delete(at);
            ticket.full_document.soft_delete(at);
            ticket.proof_of_trailer_ownership_document.soft_delete(at);
        }
        PpmDocumentKind::ProgearWeightTicket => {
            let Some(ticket) = ppm
                .progear_weight_tickets
                .iter_mut()
                .find(|ticket| ticket.id == id && ticket.deleted_at.is_none())
            else {
                return false;
            };
            ticket.deleted_at = Some(at);
            ticket.document.soft_delete(at);
        }
        PpmDocumentKind::MovingExpense => {
            let Some(expense) = ppm
                .moving_expenses
                .iter_mut()
                .find(|expense| expense.id == id && expense.deleted_at.is_none())
            else {
                return false;
            };
            expense.deleted_at = Some(at);
            expense.document.soft_delete(at);
        }
    }
    true
}

impl<R, S, E> PpmShipmentService<R, S, E>
where
    R: PpmRepository + 'static,
    S: ShipmentRouter,
    E: IncentiveEstimator,
{
    pub fn delete_weight_ticket(
        &self,
        ppm_id: PpmShipmentId,
        ticket_id: PpmDocumentId,
    ) -> Result<PpmShipment, ServiceError> {
        self.soft_delete(ppm_id, PpmDocumentKind::WeightTicket, ticket_id)
    }

    pub fn delete_progear_weight_ticket(
        &self,
        ppm_id: PpmShipmentId,
        ticket_id: PpmDocumentId,
    ) -> Result<PpmShipment, ServiceError> {
        self.soft_delete(ppm_id, PpmDocumentKind::ProgearWeightTicket, ticket_id)
    }

    pub fn delete_moving_expense(
        &self,
        ppm_id: PpmShipmentId,
        expense_id: PpmDocumentId,
    ) -> Result<PpmShipment, ServiceError> {
        self.soft_delete(ppm_id, PpmDocumentKind::MovingExpense, expense_id)
    }

    /// Soft-deletes one child record. The PPM shipment itself is never deleted here.
    pub fn soft_delete(
        &self,
        ppm_id: PpmShipmentId,
        kind: PpmDocumentKind,
        document_id: PpmDocumentId,
    ) -> Result<PpmShipment, ServiceError> {
        transact(self.repository.as_ref(), None, |tx| {
            let mut ppm = find_by_id(tx, ppm_id)?;

            if !mark_deleted(&mut ppm, kind, document_id, Utc::now()) {
                return Err(ServiceError::NotFound {
                    id: document_id.0,
                    message: format!("while looking for {}", kind.model()),
                });
            }

            persist(tx, &mut ppm)?;
            info!(
                ppm_shipment_id = %ppm_id,
                document_id = %document_id,
                kind = kind.model(),
                "ppm document soft deleted"
            );
            Ok(ppm)
        })
    }
}
