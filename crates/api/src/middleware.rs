use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use stockledger_core::TenantId;

use crate::app::errors::json_error;
use crate::context::{TenantContext, TENANT_HEADER};

#[derive(Clone)]
pub struct TenantState {
    pub default_tenant: TenantId,
}

/// Resolve the tenant from `x-tenant-id`, falling back to the configured default.
pub async fn tenant_middleware(
    State(state): State<TenantState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let tenant_id = match extract_tenant(req.headers(), &state.default_tenant) {
        Ok(tenant_id) => tenant_id,
        Err(resp) => return resp,
    };

    req.extensions_mut().insert(TenantContext::new(tenant_id));
    next.run(req).await
}

fn extract_tenant(headers: &HeaderMap, default: &TenantId) -> Result<TenantId, Response> {
    let Some(header) = headers.get(TENANT_HEADER) else {
        return Ok(default.clone());
    };

    let raw = header.to_str().map_err(|_| {
        json_error(StatusCode::BAD_REQUEST, "invalid_tenant", "x-tenant-id must be visible ASCII")
    })?;
    TenantId::parse(raw).map_err(|e| json_error(StatusCode::BAD_REQUEST, "invalid_tenant", e.to_string()))
}

#[derive(Clone, Copy)]
pub struct TimeoutState {
    pub timeout: Duration,
}

/// Bound each request; an expired handler is dropped and answered with 503.
pub async fn timeout_middleware(
    State(state): State<TimeoutState>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match tokio::time::timeout(state.timeout, next.run(req)).await {
        Ok(resp) => resp,
        Err(_) => {
            warn!(%method, %path, timeout_ms = state.timeout.as_millis() as u64, "request timed out");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "transient", "request timed out; retry")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn missing_header_uses_default_tenant() {
        let default = TenantId::parse("default").unwrap();
        let tenant = extract_tenant(&HeaderMap::new(), &default).unwrap();
        assert_eq!(tenant, default);
    }

    #[test]
    fn header_overrides_default_and_blank_is_rejected() {
        let default = TenantId::parse("default").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_static("acme"));
        assert_eq!(extract_tenant(&headers, &default).unwrap().as_str(), "acme");

        headers.insert(TENANT_HEADER, HeaderValue::from_static("   "));
        let resp = extract_tenant(&headers, &default).unwrap_err();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
