use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use super::documents::PpmDocumentKind;
use super::domain::{NewPpmShipment, PpmDocumentId, PpmShipment, PpmShipmentId, ShipmentId};
use super::error::ServiceError;
use super::repository::{IncentiveEstimator, PpmRepository, ShipmentRouter};
use super::service::{CertificationSubmission, PpmShipmentService};

type SharedService<R, S, E> = State<Arc<PpmShipmentService<R, S, E>>>;

/// Router builder exposing the PPM shipment workflows over HTTP.
pub fn ppm_shipment_router<R, S, E>(service: Arc<PpmShipmentService<R, S, E>>) -> Router
where
    R: PpmRepository + 'static,
    S: ShipmentRouter + 'static,
    E: IncentiveEstimator + 'static,
{
    Router::new()
        .route("/api/v1/ppm-shipments", post(create_handler::<R, S, E>))
        .route(
            "/api/v1/ppm-shipments/:ppm_shipment_id",
            get(fetch_handler::<R, S, E>),
        )
        .route(
            "/api/v1/shipments/:shipment_id/ppm-shipment",
            patch(update_handler::<R, S, E>),
        )
        .route(
            "/api/v1/ppm-shipments/:ppm_shipment_id/submit",
            post(submit_handler::<R, S, E>),
        )
        .route(
            "/api/v1/ppm-shipments/:ppm_shipment_id/send-to-customer",
            post(send_to_customer_handler::<R, S, E>),
        )
        .route(
            "/api/v1/ppm-shipments/:ppm_shipment_id/submit-close-out",
            post(close_out_handler::<R, S, E>),
        )
        .route(
            "/api/v1/ppm-shipments/:ppm_shipment_id/submit-reviewed-documents",
            post(reviewed_documents_handler::<R, S, E>),
        )
        .route(
            "/api/v1/ppm-shipments/:ppm_shipment_id/weight-tickets/:document_id",
            delete(delete_weight_ticket_handler::<R, S, E>),
        )
        .route(
            "/api/v1/ppm-shipments/:ppm_shipment_id/progear-weight-tickets/:document_id",
            delete(delete_progear_handler::<R, S, E>),
        )
        .route(
            "/api/v1/ppm-shipments/:ppm_shipment_id/moving-expenses/:document_id",
            delete(delete_moving_expense_handler::<R, S, E>),
        )
        .with_state(service)
}

fn error_kind(error: &ServiceError) -> &'static str {
    match error {
        ServiceError::Conflict { .. } => "conflict",
        ServiceError::InvalidInput { .. } => "invalid_input",
        ServiceError::NotFound { .. } => "not_found",
        ServiceError::PreconditionFailed { .. } => "precondition_failed",
        ServiceError::Query { .. } => "query",
        ServiceError::Update { .. } => "update",
        ServiceError::BadData(_) => "bad_data",
    }
}

pub(crate) fn error_response(error: ServiceError) -> Response {
    let status = error.status_code();
    if status.is_server_error() {
        warn!(error = %error, "ppm shipment request failed");
    }

    let mut payload = json!({
        "error": error_kind(&error),
        "message": error.to_string(),
    });
    if let Some(errors) = error.validation_errors() {
        payload["invalid_fields"] = json!(errors);
    }

    (status, Json(payload)).into_response()
}

fn shipment_response(status: StatusCode, ppm: PpmShipment) -> Response {
    let etag = ppm.etag();
    let mut response = (status, Json(ppm)).into_response();
    if let Some(value) = etag.and_then(|etag| HeaderValue::from_str(&etag).ok()) {
        response.headers_mut().insert(header::ETAG, value);
    }
    response
}

fn respond(status: StatusCode, result: Result<PpmShipment, ServiceError>) -> Response {
    match result {
        Ok(ppm) => shipment_response(status, ppm),
        Err(error) => error_response(error),
    }
}

fn if_match(headers: &HeaderMap) -> Result<String, ServiceError> {
    headers
        .get(header::IF_MATCH)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ServiceError::BadData("If-Match header is required".to_string()))
}

pub(crate) async fn create_handler<R, S, E>(
    State(service): SharedService<R, S, E>,
    Json(payload): Json<NewPpmShipment>,
) -> Response
where
    R: PpmRepository + 'static,
    S: ShipmentRouter + 'static,
    E: IncentiveEstimator + 'static,
{
    respond(
        StatusCode::CREATED,
        service.create_with_default_checks(payload.into()),
    )
}

pub(crate) async fn fetch_handler<R, S, E>(
    State(service): SharedService<R, S, E>,
    Path(ppm_shipment_id): Path<Uuid>,
) -> Response
where
    R: PpmRepository + 'static,
    S: ShipmentRouter + 'static,
    E: IncentiveEstimator + 'static,
{
    respond(
        StatusCode::OK,
        service.fetch(PpmShipmentId(ppm_shipment_id)),
    )
}

pub(crate) async fn update_handler<R, S, E>(
    State(service): SharedService<R, S, E>,
    Path(shipment_id): Path<Uuid>,
    headers: HeaderMap,
    Json(candidate): Json<PpmShipment>,
) -> Response
where
    R: PpmRepository + 'static,
    S: ShipmentRouter + 'static,
    E: IncentiveEstimator + 'static,
{
    let result = if_match(&headers).and_then(|etag| {
        service.update_with_default_checks(candidate, ShipmentId(shipment_id), &etag)
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn submit_handler<R, S, E>(
    State(service): SharedService<R, S, E>,
    Path(ppm_shipment_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response
where
    R: PpmRepository + 'static,
    S: ShipmentRouter + 'static,
    E: IncentiveEstimator + 'static,
{
    let result =
        if_match(&headers).and_then(|etag| service.submit(PpmShipmentId(ppm_shipment_id), &etag));
    respond(StatusCode::OK, result)
}

pub(crate) async fn send_to_customer_handler<R, S, E>(
    State(service): SharedService<R, S, E>,
    Path(ppm_shipment_id): Path<Uuid>,
    headers: HeaderMap,
) -> Response
where
    R: PpmRepository + 'static,
    S: ShipmentRouter + 'static,
    E: IncentiveEstimator + 'static,
{
    let result = if_match(&headers)
        .and_then(|etag| service.send_to_customer(PpmShipmentId(ppm_shipment_id), &etag));
    respond(StatusCode::OK, result)
}

pub(crate) async fn close_out_handler<R, S, E>(
    State(service): SharedService<R, S, E>,
    Path(ppm_shipment_id): Path<Uuid>,
    headers: HeaderMap,
    Json(submission): Json<CertificationSubmission>,
) -> Response
where
    R: PpmRepository + 'static,
    S: ShipmentRouter + 'static,
    E: IncentiveEstimator + 'static,
{
    let result = if_match(&headers).and_then(|etag| {
        service.submit_close_out_documentation(PpmShipmentId(ppm_shipment_id), &etag, submission)
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn reviewed_documents_handler<R, S, E>(
    State(service): SharedService<R, S, E>,
    Path(ppm_shipment_id): Path<Uuid>,
    Json(submission): Json<CertificationSubmission>,
) -> Response
where
    R: PpmRepository + 'static,
    S: ShipmentRouter + 'static,
    E: IncentiveEstimator + 'static,
{
    respond(
        StatusCode::OK,
        service.submit_reviewed_documents(PpmShipmentId(ppm_shipment_id), submission),
    )
}

fn deleted_response(result: Result<PpmShipment, ServiceError>) -> Response {
    match result {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_weight_ticket_handler<R, S, E>(
    State(service): SharedService<R, S, E>,
    Path((ppm_shipment_id, document_id)): Path<(Uuid, Uuid)>,
) -> Response
where
    R: PpmRepository + 'static,
    S: ShipmentRouter + 'static,
    E: IncentiveEstimator + 'static,
{
    deleted_response(service.soft_delete(
        PpmShipmentId(ppm_shipment_id),
        PpmDocumentKind::WeightTicket,
        PpmDocumentId(document_id),
    ))
}

pub(crate) async fn delete_progear_handler<R, S, E>(
    State(service): SharedService<R, S, E>,
    Path((ppm_shipment_id, document_id)): Path<(Uuid, Uuid)>,
) -> Response
where
    R: PpmRepository + 'static,
    S: ShipmentRouter + 'static,
    E: IncentiveEstimator + 'static,
{
    deleted_response(service.soft_delete(
        PpmShipmentId(ppm_shipment_id),
        PpmDocumentKind::ProgearWeightTicket,
        PpmDocumentId(document_id),
    ))
}

pub(crate) async fn delete_moving_expense_handler<R, S, E>(
    State(service): SharedService<R, S, E>,
    Path((ppm_shipment_id, document_id)): Path<(Uuid, Uuid)>,
) -> Response
where
    R: PpmRepository + 'static,
    S: ShipmentRouter + 'static,
    E: IncentiveEstimator + 'static,
{
    deleted_response(service.soft_delete(
        PpmShipmentId(ppm_shipment_id),
        PpmDocumentKind::MovingExpense,
        PpmDocumentId(document_id),
    ))
}
