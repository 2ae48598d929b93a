use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use stockledger_core::{AlertId, ProductId};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::TenantContext;

pub fn router() -> Router {
    Router::new()
        // Default-warehouse stock.
        .route("/stock", get(list_inventory).post(add_stock))
        .route("/stock/reserve", post(reserve_stock))
        .route("/stock/confirm", post(confirm_stock))
        .route("/stock/release", post(release_stock))
        .route("/stock/:product_id", get(get_inventory))
        // Per-warehouse stock levels.
        .route("/stock/levels/:product_id", get(get_stock_level))
        .route("/stock/update", post(update_stock))
        .route("/stock/damage", post(mark_damaged))
        .route("/stock/transfer", post(transfer_stock))
        .route("/stock/reorder-level", post(set_reorder_level))
        .route("/alerts", get(list_alerts))
        .route("/alerts/:id/resolve", post(resolve_alert))
}

pub async fn add_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<dto::AddStockRequest>,
) -> axum::response::Response {
    let result = services
        .inventory
        .legacy
        .add_stock(tenant.tenant_id(), &body.product_id, body.quantity)
        .await;
    errors::respond(StatusCode::CREATED, result)
}

pub async fn reserve_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<dto::StockMovementRequest>,
) -> axum::response::Response {
    let result = services
        .inventory
        .legacy
        .reserve_stock(tenant.tenant_id(), &body.product_id, body.quantity, body.order_id.as_ref())
        .await;
    errors::respond(StatusCode::OK, result)
}

pub async fn confirm_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<dto::StockMovementRequest>,
) -> axum::response::Response {
    let result = services
        .inventory
        .legacy
        .confirm_stock(tenant.tenant_id(), &body.product_id, body.quantity, body.order_id.as_ref())
        .await;
    errors::respond(StatusCode::OK, result)
}

pub async fn release_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<dto::StockMovementRequest>,
) -> axum::response::Response {
    let result = services
        .inventory
        .legacy
        .release_stock(tenant.tenant_id(), &body.product_id, body.quantity, body.order_id.as_ref())
        .await;
    errors::respond(StatusCode::OK, result)
}

pub async fn list_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<dto::ListQuery>,
) -> axum::response::Response {
    let result = services
        .inventory
        .legacy
        .list_inventory(tenant.tenant_id(), query.limit)
        .await;
    errors::respond(StatusCode::OK, result)
}

pub async fn get_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(product_id): Path<ProductId>,
) -> axum::response::Response {
    let result = services
        .inventory
        .legacy
        .get_inventory(tenant.tenant_id(), &product_id)
        .await;
    errors::respond(StatusCode::OK, result)
}

pub async fn get_stock_level(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(product_id): Path<ProductId>,
    Query(query): Query<dto::StockLevelQuery>,
) -> axum::response::Response {
    let result = services
        .inventory
        .stock_levels
        .get_stock_level(tenant.tenant_id(), &product_id, query.warehouse_id.as_ref())
        .await;
    errors::respond(StatusCode::OK, result)
}

pub async fn update_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<dto::UpdateStockRequest>,
) -> axum::response::Response {
    let result = services
        .inventory
        .stock_levels
        .update_stock(tenant.tenant_id(), &body.product_id, &body.warehouse_id, body.delta_quantity)
        .await;
    errors::respond(StatusCode::OK, result)
}

pub async fn mark_damaged(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<dto::DamageRequest>,
) -> axum::response::Response {
    let result = services
        .inventory
        .stock_levels
        .mark_damaged(tenant.tenant_id(), &body.product_id, &body.warehouse_id, body.quantity)
        .await;
    errors::respond(StatusCode::OK, result)
}

pub async fn transfer_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<dto::TransferRequest>,
) -> axum::response::Response {
    let result = services
        .inventory
        .stock_levels
        .transfer_stock(
            tenant.tenant_id(),
            &body.product_id,
            &body.from_warehouse_id,
            &body.to_warehouse_id,
            body.quantity,
        )
        .await
        .map(|(source, destination)| serde_json::json!({ "source": source, "destination": destination }));
    errors::respond(StatusCode::OK, result)
}

pub async fn set_reorder_level(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<dto::ReorderLevelRequest>,
) -> axum::response::Response {
    let result = services
        .inventory
        .stock_levels
        .set_reorder_level(tenant.tenant_id(), &body.product_id, &body.warehouse_id, body.level)
        .await;
    errors::respond(StatusCode::OK, result)
}

pub async fn list_alerts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<dto::AlertsQuery>,
) -> axum::response::Response {
    let result = services
        .inventory
        .stock_levels
        .list_alerts(tenant.tenant_id(), query.include_resolved)
        .await;
    errors::respond(StatusCode::OK, result)
}

pub async fn resolve_alert(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<AlertId>,
) -> axum::response::Response {
    let result = services
        .inventory
        .stock_levels
        .resolve_alert(tenant.tenant_id(), &id)
        .await;
    errors::respond(StatusCode::OK, result)
}
