use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

use stockledger_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> Response {
    match err {
        ServiceError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
        ServiceError::AlreadyExists(msg) => json_error(StatusCode::CONFLICT, "already_exists", msg),
        ServiceError::ActiveReservations => json_error(
            StatusCode::CONFLICT,
            "active_reservations",
            "warehouse has active reservations",
        ),
        ServiceError::InsufficientStock { requested, available } => {
            shortage("insufficient_stock", requested, available)
        }
        ServiceError::InsufficientAvailable { requested, available } => {
            shortage("insufficient_available", requested, available)
        }
        ServiceError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        ServiceError::Transient(msg) => json_error(StatusCode::SERVICE_UNAVAILABLE, "transient", msg),
        ServiceError::Backend(msg) => {
            tracing::error!(error = %msg, "backend failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "backend_error", "internal error")
        }
    }
}

fn shortage(code: &'static str, requested: i64, available: i64) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        axum::Json(json!({
            "error": code,
            "message": format!("requested {requested}, available {available}"),
            "requested": requested,
            "available": available,
        })),
    )
        .into_response()
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Serialize a service result with `status`, or map its error.
pub fn respond<T: Serialize>(status: StatusCode, result: Result<T, ServiceError>) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(e) => service_error_to_response(e),
    }
}
