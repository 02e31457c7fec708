use anyhow::Context;

use labinv_console::Console;
use labinv_infra::{AppConfig, open_store};

#[tokio::main(flavor = "current_thread")]
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

    let stdin = std::io::stdin().lock();
    let stdout = std::io::stdout().lock();
    Console::new(store, stdin, stdout)
        .run()
        .await
        .context("console i/o failed")
}
