//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: infrastructure wiring (stores, bus, coordinator)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use stockledger_core::TenantId;
use stockledger_infra::config::HttpConfig;
use tower::ServiceBuilder;

use crate::middleware::{self, TenantState, TimeoutState};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(services: Arc<services::AppServices>, http: &HttpConfig, default_tenant: TenantId) -> Router {
    let tenant_state = TenantState { default_tenant };
    let timeout_state = TimeoutState {
        timeout: http.request_timeout(),
    };

    let tenant_scoped = Router::new()
        .nest("/inventory", routes::router())
        .layer(axum::middleware::from_fn_with_state(
            tenant_state,
            middleware::tenant_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/metrics", get(routes::system::metrics))
        .merge(tenant_scoped)
        .layer(
            ServiceBuilder::new()
                .layer(Extension(services))
                .layer(axum::middleware::from_fn_with_state(
                    timeout_state,
                    middleware::timeout_middleware,
                )),
        )
}
