use std::collections::BTreeMap;
use std::fmt;

use axum::http::StatusCode;
use serde::Serialize;
use uuid::Uuid;

use super::repository::RepositoryError;

/// Field-keyed set of structural validation failures, accumulated across checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn has_any(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Merges another set into this one, keeping message order per field.
    pub fn append(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Typed failures surfaced by the PPM shipment workflows.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Status transition attempted from an invalid source state.
    #[error("ID: {id} is in a conflicting state {message}")]
    Conflict { id: Uuid, message: String },
    #[error("{message} {errors}")]
    InvalidInput {
        id: Option<Uuid>,
        errors: ValidationErrors,
        message: String,
    },
    #[error("ID: {id} not found {message}")]
    NotFound { id: Uuid, message: String },
    #[error("Precondition failed on update to ID: {id}. {message}")]
    PreconditionFailed { id: Uuid, message: String },
    /// Infrastructure failure, wrapped with what was being attempted.
    #[error("Could not complete query related to object of type: {model}. {message}")]
    Query {
        model: &'static str,
        message: String,
        #[source]
        source: RepositoryError,
    },
    #[error("Update Error {message}")]
    Update { id: Uuid, message: String },
    #[error("Data received from requester is bad: {0}")]
    BadData(String),
}

pub(crate) const INVALID_INPUT_MESSAGE: &str =
    "Invalid input found while validating the PPM shipment.";

pub(crate) const ETAG_MISMATCH_MESSAGE: &str =
    "The If-Match header value did not match the eTag for this record.";

impl ServiceError {
    pub(crate) fn conflict(id: Uuid, message: impl Into<String>) -> Self {
        ServiceError::Conflict {
            id,
            message: message.into(),
        }
    }

    /// A concurrent writer got there first; surfaced like any other version mismatch.
    pub(crate) fn stale(id: Uuid) -> Self {
        ServiceError::PreconditionFailed {
            id,
            message: ETAG_MISMATCH_MESSAGE.to_string(),
        }
    }

    pub(crate) fn invalid_input(id: Option<Uuid>, errors: ValidationErrors) -> Self {
        ServiceError::InvalidInput {
            id,
            errors,
            message: INVALID_INPUT_MESSAGE.to_string(),
        }
    }

    pub(crate) fn query(
        model: &'static str,
        message: impl Into<String>,
        source: RepositoryError,
    ) -> Self {
        ServiceError::Query {
            model,
            message: message.into(),
            source,
        }
    }

    /// HTTP status a caller should surface for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Conflict { .. } => StatusCode::CONFLICT,
            ServiceError::InvalidInput { .. } | ServiceError::Update { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::PreconditionFailed { .. } => StatusCode::PRECONDITION_FAILED,
            ServiceError::Query { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::BadData(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            ServiceError::InvalidInput { errors, .. } => Some(errors),
            _ => None,
        }
    }
}
