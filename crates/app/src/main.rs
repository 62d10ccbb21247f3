use std::sync::Arc;

use engine::{Engine, LedgerStore, MemoryStore};
use sheets::SheetsStore;

mod error;
mod settings;

async fn build_store(
    store: &settings::Store,
) -> Result<Arc<dyn LedgerStore>, error::AppError> {
    match store.sheets_config()? {
        Some(config) => {
            tracing::info!(
                "using spreadsheet {} (worksheet {:?})",
                config.spreadsheet_id,
                config.worksheet
            );
            Ok(Arc::new(SheetsStore::connect(config).await?))
        }
        None => {
            tracing::warn!("no spreadsheet configured, the ledger is kept in memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "sms_ledger={level},server={level},engine={level},sheets={level}",
            level = settings.app.level
        ))
        .init();

    let timezone = engine::parse_timezone(&settings.ledger.timezone)?;
    let engine = Engine::builder()
        .timezone(timezone)
        .self_accounts(settings.ledger.self_accounts.clone())
        .store(build_store(&settings.store).await?)
        .build()?;

    if let Err(err) = engine.prepare_store().await {
        tracing::warn!("could not prepare the ledger worksheet: {err}");
    }

    let listener = match tokio::net::TcpListener::bind(settings.address()).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return Err(err.into());
        }
    };

    server::run_with_listener(Arc::new(engine), listener).await?;

    Ok(())
}
