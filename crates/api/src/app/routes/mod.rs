use axum::Router;

pub mod reservations;
pub mod stock;
pub mod system;
pub mod warehouses;

/// Router for all tenant-scoped endpoints (mounted under `/inventory`).
pub fn router() -> Router {
    Router::new()
        .merge(stock::router())
        .nest("/warehouses", warehouses::router())
        .nest("/reservations", reservations::router())
}
