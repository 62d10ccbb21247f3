use api_types::health::{Banner, Health};
use axum::{Json, extract::State};
use chrono::Utc;

use crate::server::ServerState;

pub async fn banner() -> Json<Banner> {
    Json(Banner {
        message: "Transaction SMS Processor API".to_string(),
        status: "running".to_string(),
    })
}

/// Liveness check. Does not touch the ledger store.
pub async fn health(State(state): State<ServerState>) -> Json<Health> {
    let now = Utc::now().with_timezone(&state.engine.timezone());
    Json(Health {
        status: "healthy".to_string(),
        timestamp: now.fixed_offset(),
    })
}
