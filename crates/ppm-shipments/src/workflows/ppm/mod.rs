//! Personally procured move (PPM) shipments: guarded status routing, partial-update merging,
//! rule validation and the transactional service that ties them together.

pub mod documents;
pub mod domain;
pub mod error;
pub mod estimator;
pub mod memory;
pub mod merge;
pub mod repository;
pub mod router;
pub mod service;
pub mod status_router;
pub mod validation;

#[cfg(test)]
mod tests;

pub use documents::PpmDocumentKind;
pub use domain::{
    etag, Address, AddressId, AdvanceStatus, CertificationType, Cents, Document, DocumentId,
    MoveStatus, MovingExpense, MovingExpenseType, NewPpmShipment, Pounds, PpmDocumentId,
    PpmDocumentStatus, PpmShipment, PpmShipmentId, PpmShipmentStatus, ProgearWeightTicket,
    Shipment, ShipmentId, ShipmentStatus, ShipmentType, SignedCertification, SitLocation, Upload,
    WeightTicket,
};
pub use error::{ServiceError, ValidationErrors};
pub use estimator::RateTableEstimator;
pub use memory::{MemoryPpmStore, MemoryTransaction};
pub use merge::{merge_ppm_shipment, MergeOutcome};
pub use repository::{
    transact, IncentiveEstimator, PpmEstimate, PpmRepository, PpmTransaction, RepositoryError,
    ShipmentRouter, UploadCounter,
};
pub use router::ppm_shipment_router;
pub use service::{CertificationSubmission, PpmShipmentService};
pub use status_router::{PpmShipmentRouter, StandardShipmentRouter};
pub use validation::{AdvancePolicy, PpmShipmentValidator, ValidationPipeline};
