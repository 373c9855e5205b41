use uuid::Uuid;

use super::domain::{Cents, DocumentId, PpmShipment, PpmShipmentId, Shipment, ShipmentId};
use super::error::{ServiceError, ValidationErrors};

/// Error enumeration for persistence failures. Structural rejections are kept apart from
/// infrastructure failures so callers can surface them as invalid input.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record failed validation: {0}")]
    Validation(ValidationErrors),
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    /// The record changed after this transaction read it.
    #[error("record {id} was modified by another transaction")]
    StaleVersion { id: Uuid },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// Maps a persistence failure onto the service taxonomy with the attempted operation.
    pub(crate) fn into_service_error(
        self,
        id: Option<Uuid>,
        model: &'static str,
        attempted: &str,
    ) -> ServiceError {
        match self {
            RepositoryError::Validation(errors) => ServiceError::invalid_input(id, errors),
            RepositoryError::NotFound => ServiceError::NotFound {
                id: id.unwrap_or(Uuid::nil()),
                message: format!("while looking for {model}"),
            },
            RepositoryError::StaleVersion { id } => ServiceError::stale(id),
            other => ServiceError::query(model, format!("unable to {attempted}"), other),
        }
    }
}

/// Unit of work against the PPM shipment store. Dropping a transaction without committing
/// discards every write made through it.
pub trait PpmTransaction {
    fn find_ppm_shipment(&mut self, id: PpmShipmentId) -> Result<PpmShipment, RepositoryError>;

    fn find_by_shipment_id(&mut self, id: ShipmentId) -> Result<PpmShipment, RepositoryError>;

    /// Inserts the parent shipment when it has no id yet, otherwise updates it in place.
    fn save_shipment(&mut self, shipment: &mut Shipment) -> Result<(), RepositoryError>;

    /// Validate-and-create. Assigns the id, address ids, and timestamps on success.
    fn create_ppm_shipment(&mut self, ppm: &mut PpmShipment) -> Result<(), RepositoryError>;

    /// Validate-and-update of the whole aggregate, refreshing `updated_at`.
    fn update_ppm_shipment(&mut self, ppm: &mut PpmShipment) -> Result<(), RepositoryError>;

    fn commit(self) -> Result<(), RepositoryError>;

    fn rollback(self);
}

/// Storage abstraction so the service can be exercised in isolation.
pub trait PpmRepository: UploadCounter + Send + Sync {
    type Transaction: PpmTransaction;

    fn begin(&self) -> Result<Self::Transaction, RepositoryError>;
}

/// Counts the non-deleted uploads attached to a document.
pub trait UploadCounter: Send + Sync {
    fn count_active_uploads(&self, document: &DocumentId) -> Result<usize, RepositoryError>;
}

/// Transitions for the generic parent shipment.
pub trait ShipmentRouter: Send + Sync {
    fn submit(&self, shipment: &mut Shipment) -> Result<(), ServiceError>;
    fn approve(&self, shipment: &mut Shipment) -> Result<(), ServiceError>;
}

/// Prices produced for one shipment. `None` means the record is not ready to be priced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PpmEstimate {
    pub incentive: Option<Cents>,
    pub sit_cost: Option<Cents>,
}

/// Pricing collaborator for the incentive and the storage-in-transit cost.
pub trait IncentiveEstimator: Send + Sync {
    fn estimate_incentive(
        &self,
        old: &PpmShipment,
        new: &mut PpmShipment,
    ) -> Result<PpmEstimate, ServiceError>;
}

/// Runs `work` inside a transaction. An open transaction passed by the caller is reused and
/// left for the caller to finish; otherwise one is opened here, committed on success and
/// rolled back on any error.
pub fn transact<R, T, F>(
    repository: &R,
    open: Option<&mut R::Transaction>,
    work: F,
) -> Result<T, ServiceError>
where
    R: PpmRepository + ?Sized,
    F: FnOnce(&mut R::Transaction) -> Result<T, ServiceError>,
{
    if let Some(tx) = open {
        return work(tx);
    }

    let mut tx = repository
        .begin()
        .map_err(|err| ServiceError::query("PPMShipment", "unable to open a transaction", err))?;

    match work(&mut tx) {
        Ok(value) => {
            tx.commit().map_err(|err| match err {
                RepositoryError::StaleVersion { id } => ServiceError::stale(id),
                other => {
                    ServiceError::query("PPMShipment", "unable to commit the transaction", other)
                }
            })?;
            Ok(value)
        }
        Err(err) => {
            tx.rollback();
            Err(err)
        }
    }
}
