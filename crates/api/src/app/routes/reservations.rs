use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    routing::post,
    Json, Router,
};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::TenantContext;

pub fn router() -> Router {
    Router::new()
        .route("/reserve", post(reserve))
        .route("/release", post(release))
        .route("/confirm", post(confirm))
}

/// Per-item outcome; a partially failed order still answers 200.
pub async fn reserve(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<dto::ReserveRequest>,
) -> axum::response::Response {
    let result = services
        .inventory
        .reservations
        .reserve_from_warehouse(tenant.tenant_id(), &body.warehouse_id, &body.items, &body.order_id)
        .await;
    errors::respond(StatusCode::OK, result)
}

pub async fn release(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<dto::HeldItemsRequest>,
) -> axum::response::Response {
    let result = services
        .inventory
        .reservations
        .release_reservation(tenant.tenant_id(), &body.items, body.order_id.as_ref())
        .await;
    errors::respond(StatusCode::OK, result)
}

pub async fn confirm(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<dto::HeldItemsRequest>,
) -> axum::response::Response {
    let result = services
        .inventory
        .reservations
        .confirm_reservation(tenant.tenant_id(), &body.items, body.order_id.as_ref())
        .await;
    errors::respond(StatusCode::OK, result)
}
