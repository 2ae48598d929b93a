use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use stockledger_core::WarehouseId;
use stockledger_inventory::WarehousePatch;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::TenantContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_warehouses).post(create_warehouse))
        .route(
            "/:id",
            get(get_warehouse).put(update_warehouse).delete(delete_warehouse),
        )
}

pub async fn create_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<dto::CreateWarehouseRequest>,
) -> axum::response::Response {
    let result = services
        .inventory
        .warehouses
        .create_warehouse(tenant.tenant_id(), &body.name, body.location)
        .await;
    errors::respond(StatusCode::CREATED, result)
}

pub async fn list_warehouses(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> axum::response::Response {
    let result = services.inventory.warehouses.list_warehouses(tenant.tenant_id()).await;
    errors::respond(StatusCode::OK, result)
}

pub async fn get_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<WarehouseId>,
) -> axum::response::Response {
    let result = services
        .inventory
        .warehouses
        .get_warehouse(tenant.tenant_id(), &id)
        .await;
    errors::respond(StatusCode::OK, result)
}

pub async fn update_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<WarehouseId>,
    Json(patch): Json<WarehousePatch>,
) -> axum::response::Response {
    let result = services
        .inventory
        .warehouses
        .update_warehouse(tenant.tenant_id(), &id, &patch)
        .await;
    errors::respond(StatusCode::OK, result)
}

pub async fn delete_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<WarehouseId>,
) -> axum::response::Response {
    let result = services
        .inventory
        .warehouses
        .delete_warehouse(tenant.tenant_id(), &id)
        .await
        .map(|()| serde_json::json!({ "deleted": true }));
    errors::respond(StatusCode::OK, result)
}
