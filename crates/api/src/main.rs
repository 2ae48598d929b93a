use anyhow::Context;

use stockledger_core::TenantId;
use stockledger_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockledger_observability::init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let prometheus = stockledger_observability::metrics::install()?;
    stockledger_infra::metrics::describe();

    let default_tenant = TenantId::parse(&config.inventory.default_tenant)?;
    let runtime = stockledger_api::app::services::build_services(&config, Some(prometheus)).await?;
    let app = stockledger_api::app::build_app(runtime.services.clone(), &config.http, default_tenant);

    let listener = tokio::net::TcpListener::bind(&config.http.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.http.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        store = ?config.store.backend,
        bus = ?config.bus.backend,
        "inventory service listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    runtime.shutdown().await;
    Ok(())
}
