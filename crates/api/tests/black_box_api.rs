use reqwest::StatusCode;
use serde_json::{json, Value};

use stockledger_core::TenantId;
use stockledger_infra::AppConfig;

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over in-memory stores and bus, bound to an ephemeral port.
        let config = AppConfig::default();
        let runtime = stockledger_api::app::services::build_services(&config, None)
            .await
            .expect("failed to build services");
        let app = stockledger_api::app::build_app(
            runtime.services.clone(),
            &config.http,
            TenantId::parse(&config.inventory.default_tenant).unwrap(),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            let _runtime = runtime;
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    async fn post(&self, tenant: &str, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("x-tenant-id", tenant)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, tenant: &str, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header("x-tenant-id", tenant)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn create_warehouse(&self, tenant: &str, name: &str) -> String {
        let (status, body) = self
            .post(tenant, "/inventory/warehouses", json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_reports_service() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv.get("t1", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "inventory-service");
}

#[tokio::test]
async fn warehouse_stock_reserve_and_partial_failure() {
    let srv = TestServer::spawn().await;
    let warehouse = srv.create_warehouse("t1", "Main").await;

    let (status, record) = srv
        .post(
            "t1",
            "/inventory/stock/update",
            json!({ "productId": "sku-1", "warehouseId": warehouse, "deltaQuantity": 10 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["available"], 10);

    let (status, result) = srv
        .post(
            "t1",
            "/inventory/reservations/reserve",
            json!({
                "warehouseId": warehouse,
                "orderId": "o-1",
                "items": [
                    { "productId": "sku-1", "quantity": 4 },
                    { "productId": "sku-missing", "quantity": 1 }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["reserved"].as_array().unwrap().len(), 1);
    assert_eq!(result["failed"][0]["productId"], "sku-missing");
    assert_eq!(result["failed"][0]["reason"], "stock_not_found");

    let (status, level) = srv
        .get("t1", &format!("/inventory/stock/levels/sku-1?warehouseId={warehouse}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(level["reserved"], 4);
    assert_eq!(level["available"], 6);
}

#[tokio::test]
async fn transfer_shortage_maps_to_unprocessable() {
    let srv = TestServer::spawn().await;
    let a = srv.create_warehouse("t1", "A").await;
    let b = srv.create_warehouse("t1", "B").await;
    srv.post(
        "t1",
        "/inventory/stock/update",
        json!({ "productId": "sku-1", "warehouseId": a, "deltaQuantity": 3 }),
    )
    .await;

    let (status, body) = srv
        .post(
            "t1",
            "/inventory/stock/transfer",
            json!({ "productId": "sku-1", "fromWarehouseId": a, "toWarehouseId": b, "quantity": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["requested"], 5);
    assert_eq!(body["available"], 3);
}

#[tokio::test]
async fn unknown_warehouse_and_duplicate_name_map_to_errors() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv.get("t1", "/inventory/warehouses/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    srv.create_warehouse("t1", "Main").await;
    let (status, _) = srv
        .post("t1", "/inventory/warehouses", json!({ "name": "Main" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn tenants_are_isolated_by_header() {
    let srv = TestServer::spawn().await;
    srv.create_warehouse("tenant-a", "Main").await;

    let (status, body) = srv.get("tenant-a", "/inventory/warehouses").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = srv.get("tenant-b", "/inventory/warehouses").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn default_warehouse_lifecycle() {
    let srv = TestServer::spawn().await;

    let (status, record) = srv
        .post("t1", "/inventory/stock", json!({ "productId": "sku-1", "quantity": 10 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["quantity"], 10);

    let (status, record) = srv
        .post(
            "t1",
            "/inventory/stock/reserve",
            json!({ "productId": "sku-1", "quantity": 5, "orderId": "o-1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["reserved"], 5);

    let (status, record) = srv
        .post(
            "t1",
            "/inventory/stock/confirm",
            json!({ "productId": "sku-1", "quantity": 5, "orderId": "o-1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["quantity"], 5);
    assert_eq!(record["reserved"], 0);

    let (status, body) = srv
        .post("t1", "/inventory/stock/reserve", json!({ "productId": "sku-1", "quantity": 50 }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["available"], 5);

    let (status, list) = srv.get("t1", "/inventory/stock?limit=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, record) = srv.get("t1", "/inventory/stock/sku-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["available"], 5);
}

#[tokio::test]
async fn low_stock_alert_can_be_resolved() {
    let srv = TestServer::spawn().await;
    let warehouse = srv.create_warehouse("t1", "Main").await;
    srv.post(
        "t1",
        "/inventory/stock/update",
        json!({ "productId": "sku-1", "warehouseId": warehouse, "deltaQuantity": 3 }),
    )
    .await;

    let (status, alerts) = srv.get("t1", "/inventory/alerts").await;
    assert_eq!(status, StatusCode::OK);
    let alerts = alerts.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["alertType"], "LOW_STOCK");
    let id = alerts[0]["id"].as_str().unwrap().to_string();

    let (status, resolved) = srv
        .post("t1", &format!("/inventory/alerts/{id}/resolve"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["isResolved"], true);

    let (_, open) = srv.get("t1", "/inventory/alerts").await;
    assert!(open.as_array().unwrap().is_empty());
    let (_, all) = srv.get("t1", "/inventory/alerts?includeResolved=true").await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}
