use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::domain::{
    CertificationType, MoveStatus, PpmShipment, PpmShipmentId, PpmShipmentStatus, ShipmentId,
    ShipmentStatus, SignedCertification,
};
use super::error::ServiceError;
use super::merge::{merge_ppm_shipment, MergeOutcome};
use super::repository::{
    transact, IncentiveEstimator, PpmRepository, PpmTransaction, RepositoryError,
    ShipmentRouter, UploadCounter,
};
use super::status_router::PpmShipmentRouter;
use super::validation::{
    close_out_checks, creator_checks, updater_checks, AdvancePolicy, ValidationPipeline,
};

pub(crate) const MODEL: &str = "PPMShipment";

/// Signature captured when a customer or counselor attests to close-out documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationSubmission {
    pub certification_text: String,
    pub signature: String,
}

/// Orchestrates merges, validation, status routing and pricing inside one transaction per call.
pub struct PpmShipmentService<R, S, E> {
    pub(super) repository: Arc<R>,
    router: PpmShipmentRouter<S>,
    estimator: Arc<E>,
    policy: AdvancePolicy,
    creator_checks: ValidationPipeline,
    updater_checks: ValidationPipeline,
    close_out_checks: ValidationPipeline,
}

pub(super) fn find_by_id<T: PpmTransaction>(
    tx: &mut T,
    id: PpmShipmentId,
) -> Result<PpmShipment, ServiceError> {
    tx.find_ppm_shipment(id).map_err(|err| match err {
        RepositoryError::NotFound => ServiceError::NotFound {
            id: id.0,
            message: "while looking for PPMShipment".to_string(),
        },
        other => other.into_service_error(Some(id.0), MODEL, "fetch the PPM shipment"),
    })
}

pub(super) fn persist<T: PpmTransaction>(
    tx: &mut T,
    ppm: &mut PpmShipment,
) -> Result<(), ServiceError> {
    let id = ppm.id.map(|id| id.0);
    tx.save_shipment(&mut ppm.shipment)
        .map_err(|err| err.into_service_error(id, "MTOShipment", "save the parent shipment"))?;
    tx.update_ppm_shipment(ppm)
        .map_err(|err| err.into_service_error(id, MODEL, "update the PPM shipment"))
}

fn check_etag(ppm: &PpmShipment, etag: &str) -> Result<(), ServiceError> {
    if ppm.etag().as_deref() == Some(etag) {
        return Ok(());
    }

    Err(ServiceError::stale(
        ppm.id.map(|id| id.0).unwrap_or_else(Uuid::nil),
    ))
}

/// Creates or re-signs the certification of the given kind.
fn sign(
    slot: &mut Option<SignedCertification>,
    ppm_shipment_id: PpmShipmentId,
    certification_type: CertificationType,
    submission: CertificationSubmission,
) {
    let now = Utc::now();
    match slot {
        Some(existing) if existing.certification_type == certification_type => {
            existing.certification_text = submission.certification_text;
            existing.signature = submission.signature;
            existing.date = now;
            existing.updated_at = now;
        }
        _ => {
            *slot = Some(SignedCertification {
                id: Uuid::new_v4(),
                ppm_shipment_id,
                certification_type,
                certification_text: submission.certification_text,
                signature: submission.signature,
                date: now,
                updated_at: now,
            });
        }
    }
}

/// Seeds the status of a new PPM shipment from where its move currently stands. Callers never
/// choose the initial status; the creator checks reject a preset one.
fn apply_initial_status(ppm: &mut PpmShipment) {
    match ppm.shipment.move_status {
        None | Some(MoveStatus::Draft) => {
            ppm.status = Some(PpmShipmentStatus::Draft);
        }
        Some(MoveStatus::NeedsServiceCounseling) => {
            ppm.status = Some(PpmShipmentStatus::Submitted);
        }
        Some(_) => {
            let approved_at = *ppm.shipment.approved_date.get_or_insert_with(Utc::now);
            ppm.shipment.status = Some(ShipmentStatus::Approved);
            ppm.status = Some(PpmShipmentStatus::WaitingOnCustomer);
            ppm.approved_at = Some(approved_at);
        }
    }
}

impl<R, S, E> PpmShipmentService<R, S, E>
where
    R: PpmRepository + 'static,
    S: ShipmentRouter,
    E: IncentiveEstimator,
{
    pub fn new(
        repository: Arc<R>,
        shipment_router: S,
        estimator: Arc<E>,
        policy: AdvancePolicy,
    ) -> Self {
        let uploads: Arc<dyn UploadCounter> = repository.clone();
        Self {
            repository,
            router: PpmShipmentRouter::new(shipment_router),
            estimator,
            policy,
            creator_checks: creator_checks(policy),
            updater_checks: updater_checks(policy),
            close_out_checks: close_out_checks(uploads),
        }
    }

    pub fn policy(&self) -> AdvancePolicy {
        self.policy
    }

    pub fn create_with_default_checks(
        &self,
        candidate: PpmShipment,
    ) -> Result<PpmShipment, ServiceError> {
        self.create_in(None, candidate)
    }

    /// Create flow. Pass an open transaction to make the create part of a larger unit of work.
    pub fn create_in(
        &self,
        tx: Option<&mut R::Transaction>,
        candidate: PpmShipment,
    ) -> Result<PpmShipment, ServiceError> {
        transact(self.repository.as_ref(), tx, |tx| {
            let mut ppm = candidate;
            self.creator_checks.validate(&ppm, None, Some(&ppm.shipment))?;

            apply_initial_status(&mut ppm);

            if ppm.shipment.id.is_none() {
                ppm.shipment.id = ppm.shipment_id;
            }
            tx.save_shipment(&mut ppm.shipment).map_err(|err| {
                err.into_service_error(None, "MTOShipment", "save the parent shipment")
            })?;
            ppm.shipment_id = ppm.shipment.id;

            tx.create_ppm_shipment(&mut ppm)
                .map_err(|err| err.into_service_error(None, MODEL, "create the PPM shipment"))?;

            let estimate = self
                .estimator
                .estimate_incentive(&PpmShipment::default(), &mut ppm)?;
            ppm.estimated_incentive = estimate.incentive;
            ppm.sit_estimated_cost = estimate.sit_cost;

            let id = ppm.id.map(|id| id.0);
            tx.update_ppm_shipment(&mut ppm)
                .map_err(|err| err.into_service_error(id, MODEL, "update the PPM shipment"))?;

            info!(
                ppm_shipment_id = ?ppm.id,
                status = ?ppm.status,
                "ppm shipment created"
            );
            Ok(ppm)
        })
    }

    pub fn update_with_default_checks(
        &self,
        candidate: PpmShipment,
        shipment_id: ShipmentId,
        etag: &str,
    ) -> Result<PpmShipment, ServiceError> {
        self.update_in(None, candidate, shipment_id, etag)
    }

    /// Update flow: the version token is checked before anything is merged.
    pub fn update_in(
        &self,
        tx: Option<&mut R::Transaction>,
        candidate: PpmShipment,
        shipment_id: ShipmentId,
        etag: &str,
    ) -> Result<PpmShipment, ServiceError> {
        transact(self.repository.as_ref(), tx, |tx| {
            let old = tx.find_by_shipment_id(shipment_id).map_err(|err| match err {
                RepositoryError::NotFound => ServiceError::NotFound {
                    id: shipment_id.0,
                    message: "while looking for PPMShipment by MTO ShipmentID".to_string(),
                },
                other => other.into_service_error(
                    Some(shipment_id.0),
                    MODEL,
                    "fetch the PPM shipment by shipment id",
                ),
            })?;
            check_etag(&old, etag)?;

            let MergeOutcome { merged, rejection } =
                merge_ppm_shipment(&candidate, &old, Utc::now().date_naive());
            if let Some(err) = rejection {
                return Err(err);
            }

            let mut merged = merged;
            self.updater_checks
                .validate(&merged, Some(&old), Some(&old.shipment))?;

            let estimate = self.estimator.estimate_incentive(&old, &mut merged)?;
            merged.estimated_incentive = estimate.incentive;
            merged.sit_estimated_cost = estimate.sit_cost;

            persist(tx, &mut merged)?;
            info!(ppm_shipment_id = ?merged.id, "ppm shipment updated");
            Ok(merged)
        })
    }

    pub fn fetch(&self, id: PpmShipmentId) -> Result<PpmShipment, ServiceError> {
        transact(self.repository.as_ref(), None, |tx| find_by_id(tx, id))
    }

    pub fn submit(&self, id: PpmShipmentId, etag: &str) -> Result<PpmShipment, ServiceError> {
        transact(self.repository.as_ref(), None, |tx| {
            let mut ppm = find_by_id(tx, id)?;
            check_etag(&ppm, etag)?;
            self.router.submit(&mut ppm)?;
            persist(tx, &mut ppm)?;
            info!(ppm_shipment_id = %id, "ppm shipment submitted");
            Ok(ppm)
        })
    }

    pub fn send_to_customer(
        &self,
        id: PpmShipmentId,
        etag: &str,
    ) -> Result<PpmShipment, ServiceError> {
        transact(self.repository.as_ref(), None, |tx| {
            let mut ppm = find_by_id(tx, id)?;
            check_etag(&ppm, etag)?;
            self.router.send_to_customer(&mut ppm)?;
            persist(tx, &mut ppm)?;
            info!(ppm_shipment_id = %id, "ppm shipment sent to customer");
            Ok(ppm)
        })
    }

    /// Customer hands in close-out paperwork and signs for it.
    pub fn submit_close_out_documentation(
        &self,
        id: PpmShipmentId,
        etag: &str,
        submission: CertificationSubmission,
    ) -> Result<PpmShipment, ServiceError> {
        transact(self.repository.as_ref(), None, |tx| {
            let mut ppm = find_by_id(tx, id)?;
            check_etag(&ppm, etag)?;
            self.close_out_checks
                .validate(&ppm, None, Some(&ppm.shipment))?;
            self.router.submit_close_out_documentation(&mut ppm)?;
            sign(
                &mut ppm.signed_certification,
                id,
                CertificationType::PpmPayment,
                submission,
            );
            persist(tx, &mut ppm)?;
            info!(ppm_shipment_id = %id, "close-out documentation submitted");
            Ok(ppm)
        })
    }

    /// Counselor finishes a document review. Reviews can repeat, so the reviewer signature
    /// is updated in place rather than duplicated.
    pub fn submit_reviewed_documents(
        &self,
        id: PpmShipmentId,
        submission: CertificationSubmission,
    ) -> Result<PpmShipment, ServiceError> {
        transact(self.repository.as_ref(), None, |tx| {
            let old = find_by_id(tx, id)?;
            let mut ppm = old.clone();
            self.router.submit_reviewed_documents(&mut ppm)?;
            self.updater_checks
                .validate(&ppm, Some(&old), Some(&old.shipment))?;
            sign(
                &mut ppm.reviewed_certification,
                id,
                CertificationType::CloseoutReviewedPpmPayment,
                submission,
            );
            persist(tx, &mut ppm)?;
            debug!(ppm_shipment_id = %id, status = ?ppm.status, "reviewed documents recorded");
            Ok(ppm)
        })
    }
}
