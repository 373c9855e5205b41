use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use super::domain::{PpmShipment, PpmShipmentStatus, Shipment, ShipmentStatus};
use super::error::ServiceError;
use super::repository::ShipmentRouter;

const NOT_NEW_FOR_DRAFT: &str = "PPM shipment can't be set to Draft because it's not new.";
const NOT_DRAFT_FOR_SUBMIT: &str =
    "PPM shipment can't be set to Submitted because it's not new or in the Draft status.";
const NOT_REVIEWABLE_FOR_CUSTOMER: &str = "PPM shipment can't be set to WaitingOnCustomer because it's not in a Submitted or NeedsCloseout status.";
const NOT_WAITING_FOR_CLOSEOUT: &str =
    "PPM shipment can't be set to NeedsCloseout because it's not in the WaitingOnCustomer status.";
const NOT_IN_CLOSEOUT_FOR_REVIEW: &str =
    "PPM shipment documents cannot be submitted because it's not in the NeedsCloseout status.";

fn record_id(ppm: &PpmShipment) -> Uuid {
    ppm.id.map(|id| id.0).unwrap_or_else(Uuid::nil)
}

/// Guarded status transitions for a PPM shipment. Each operation checks its source state
/// before touching the record; a failed guard leaves both the PPM shipment and its parent
/// shipment untouched.
#[derive(Debug, Clone)]
pub struct PpmShipmentRouter<S> {
    shipment_router: S,
}

impl<S> PpmShipmentRouter<S>
where
    S: ShipmentRouter,
{
    pub fn new(shipment_router: S) -> Self {
        Self { shipment_router }
    }

    pub fn set_to_draft(&self, ppm: &mut PpmShipment) -> Result<(), ServiceError> {
        if ppm.status.is_some() {
            return Err(ServiceError::conflict(record_id(ppm), NOT_NEW_FOR_DRAFT));
        }

        ppm.status = Some(PpmShipmentStatus::Draft);
        ppm.shipment.status = Some(ShipmentStatus::Draft);
        debug!(ppm_shipment_id = %record_id(ppm), "ppm shipment set to draft");
        Ok(())
    }

    pub fn submit(&self, ppm: &mut PpmShipment) -> Result<(), ServiceError> {
        if !matches!(ppm.status, None | Some(PpmShipmentStatus::Draft)) {
            return Err(ServiceError::conflict(record_id(ppm), NOT_DRAFT_FOR_SUBMIT));
        }

        let mut shipment = ppm.shipment.clone();
        self.shipment_router.submit(&mut shipment)?;

        ppm.shipment = shipment;
        ppm.status = Some(PpmShipmentStatus::Submitted);
        debug!(ppm_shipment_id = %record_id(ppm), "ppm shipment submitted");
        Ok(())
    }

    /// Hands the shipment back to the customer after counseling or a close-out review.
    pub fn send_to_customer(&self, ppm: &mut PpmShipment) -> Result<(), ServiceError> {
        if !matches!(
            ppm.status,
            Some(PpmShipmentStatus::Submitted | PpmShipmentStatus::NeedsCloseout)
        ) {
            return Err(ServiceError::conflict(
                record_id(ppm),
                NOT_REVIEWABLE_FOR_CUSTOMER,
            ));
        }

        let mut shipment = ppm.shipment.clone();
        if shipment.status != Some(ShipmentStatus::Approved) {
            self.shipment_router.approve(&mut shipment)?;
        }

        ppm.shipment = shipment;
        ppm.status = Some(PpmShipmentStatus::WaitingOnCustomer);
        if ppm.approved_at.is_none() {
            ppm.approved_at = Some(ppm.shipment.approved_date.unwrap_or_else(Utc::now));
        }
        debug!(ppm_shipment_id = %record_id(ppm), "ppm shipment sent to customer");
        Ok(())
    }

    pub fn submit_close_out_documentation(&self, ppm: &mut PpmShipment) -> Result<(), ServiceError> {
        if ppm.status != Some(PpmShipmentStatus::WaitingOnCustomer) {
            return Err(ServiceError::conflict(
                record_id(ppm),
                NOT_WAITING_FOR_CLOSEOUT,
            ));
        }

        ppm.status = Some(PpmShipmentStatus::NeedsCloseout);
        if ppm.submitted_at.is_none() {
            ppm.submitted_at = Some(Utc::now());
        }
        debug!(ppm_shipment_id = %record_id(ppm), "close-out documentation submitted");
        Ok(())
    }

    /// Routes a reviewed shipment back to the customer when any live document was rejected,
    /// otherwise marks close-out complete.
    pub fn submit_reviewed_documents(&self, ppm: &mut PpmShipment) -> Result<(), ServiceError> {
        if ppm.status != Some(PpmShipmentStatus::NeedsCloseout) {
            return Err(ServiceError::conflict(
                record_id(ppm),
                NOT_IN_CLOSEOUT_FOR_REVIEW,
            ));
        }

        let next = if ppm.has_rejected_documents() {
            PpmShipmentStatus::WaitingOnCustomer
        } else {
            PpmShipmentStatus::CloseoutComplete
        };
        ppm.status = Some(next);
        debug!(ppm_shipment_id = %record_id(ppm), status = %next, "reviewed documents routed");
        Ok(())
    }
}

/// Default router for the generic parent shipment.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardShipmentRouter;

impl ShipmentRouter for StandardShipmentRouter {
    fn submit(&self, shipment: &mut Shipment) -> Result<(), ServiceError> {
        if !matches!(shipment.status, None | Some(ShipmentStatus::Draft)) {
            return Err(ServiceError::conflict(
                shipment.id.map(|id| id.0).unwrap_or_else(Uuid::nil),
                "Shipment can't be set to Submitted because it's not in the Draft status.",
            ));
        }

        shipment.status = Some(ShipmentStatus::Submitted);
        Ok(())
    }

    fn approve(&self, shipment: &mut Shipment) -> Result<(), ServiceError> {
        if !matches!(
            shipment.status,
            Some(ShipmentStatus::Submitted | ShipmentStatus::ApprovalsRequested)
        ) {
            return Err(ServiceError::conflict(
                shipment.id.map(|id| id.0).unwrap_or_else(Uuid::nil),
                "Shipment can't be set to Approved because it's not in a Submitted or ApprovalsRequested status.",
            ));
        }

        shipment.status = Some(ShipmentStatus::Approved);
        shipment.approved_date = Some(Utc::now());
        Ok(())
    }
}

impl<T> ShipmentRouter for std::sync::Arc<T>
where
    T: ShipmentRouter + ?Sized,
{
    fn submit(&self, shipment: &mut Shipment) -> Result<(), ServiceError> {
        (**self).submit(shipment)
    }

    fn approve(&self, shipment: &mut Shipment) -> Result<(), ServiceError> {
        (**self).approve(shipment)
    }
}
