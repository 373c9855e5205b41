mod policy;
mod rules;

use std::sync::Arc;

pub use policy::AdvancePolicy;
pub use rules::{AdvanceAmountCheck, CloseOutUploadsCheck};

use super::domain::{PpmShipment, Shipment};
use super::error::{ServiceError, ValidationErrors};
use super::repository::UploadCounter;

/// A single business rule. Structural problems go into the returned error set; an `Err` is
/// reserved for infrastructure failures and stops the pipeline.
pub trait PpmShipmentValidator: Send + Sync {
    fn validate(
        &self,
        new: &PpmShipment,
        old: Option<&PpmShipment>,
        shipment: Option<&Shipment>,
    ) -> Result<ValidationErrors, ServiceError>;
}

impl<F> PpmShipmentValidator for F
where
    F: Fn(
            &PpmShipment,
            Option<&PpmShipment>,
            Option<&Shipment>,
        ) -> Result<ValidationErrors, ServiceError>
        + Send
        + Sync,
{
    fn validate(
        &self,
        new: &PpmShipment,
        old: Option<&PpmShipment>,
        shipment: Option<&Shipment>,
    ) -> Result<ValidationErrors, ServiceError> {
        self(new, old, shipment)
    }
}

pub fn boxed<V>(check: V) -> Box<dyn PpmShipmentValidator>
where
    V: PpmShipmentValidator + 'static,
{
    Box::new(check)
}

/// Ordered list of checks run against one record.
pub struct ValidationPipeline {
    checks: Vec<Box<dyn PpmShipmentValidator>>,
}

impl ValidationPipeline {
    pub fn new(checks: Vec<Box<dyn PpmShipmentValidator>>) -> Self {
        Self { checks }
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Runs every check and accumulates their findings. Any findings become a single
    /// `InvalidInput` carrying the full set.
    pub fn validate(
        &self,
        new: &PpmShipment,
        old: Option<&PpmShipment>,
        shipment: Option<&Shipment>,
    ) -> Result<(), ServiceError> {
        let mut errors = ValidationErrors::new();
        for check in &self.checks {
            errors.append(check.validate(new, old, shipment)?);
        }

        if errors.has_any() {
            return Err(ServiceError::invalid_input(new.id.map(|id| id.0), errors));
        }

        Ok(())
    }
}

impl std::fmt::Debug for ValidationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationPipeline")
            .field("checks", &self.checks.len())
            .finish()
    }
}

pub fn creator_checks(policy: AdvancePolicy) -> ValidationPipeline {
    ValidationPipeline::new(vec![
        boxed(rules::check_shipment_type),
        boxed(rules::check_shipment_status_for_create),
        boxed(rules::check_create_ids),
        boxed(rules::check_workflow_fields_unset),
        boxed(rules::check_required_fields),
        boxed(rules::check_address_sequence),
        boxed(AdvanceAmountCheck::new(policy)),
        boxed(rules::check_sit_required_fields),
        boxed(rules::check_weights_non_negative),
    ])
}

pub fn updater_checks(policy: AdvancePolicy) -> ValidationPipeline {
    ValidationPipeline::new(vec![
        boxed(rules::check_shipment_type),
        boxed(rules::check_update_ids),
        boxed(rules::check_required_fields),
        boxed(rules::check_address_sequence),
        boxed(AdvanceAmountCheck::new(policy)),
        boxed(rules::check_sit_required_fields),
        boxed(rules::check_weights_non_negative),
    ])
}

/// Fields the incentive estimator needs before it can price a shipment.
pub fn estimator_checks() -> ValidationPipeline {
    ValidationPipeline::new(vec![
        boxed(rules::check_required_fields),
        boxed(rules::check_estimated_weight),
    ])
}

pub fn close_out_checks(uploads: Arc<dyn UploadCounter>) -> ValidationPipeline {
    ValidationPipeline::new(vec![boxed(CloseOutUploadsCheck::new(uploads))])
}
