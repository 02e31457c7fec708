use anyhow::Context;

use labinv_infra::{AppConfig, open_store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    labinv_observability::init(config.log_format);

    let store = match open_store(&config.store, config.limits).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, backend = ?config.store.backend, "failed to open store");
            return Err(e).context("failed to open store");
        }
    };

    let app = labinv_api::build_app(store);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
