//! Ledger snapshot endpoints

use api_types::{Response, balances::Balances};
use axum::{Json, extract::State};

use crate::{ServerError, server::ServerState};

/// Handle requests for the latest balances and expense counters
pub async fn get(
    State(state): State<ServerState>,
) -> Result<Json<Response<Balances>>, ServerError> {
    let latest = state.engine.balances().await?;

    Ok(Json(Response::success(Balances {
        ebl_balance: latest.balance_ebl.to_string(),
        bkash_balance: latest.balance_bkash.to_string(),
        total_balance: latest.total.to_string(),
        today_expense: latest.today_expense.to_string(),
        monthly_expense: latest.month_expense.to_string(),
        expense_day: latest
            .expense_day
            .map(|day| day.format("%Y-%m-%d").to_string()),
    })))
}

pub async fn setup_worksheet(
    State(state): State<ServerState>,
) -> Result<Json<Response<String>>, ServerError> {
    tracing::info!("preparing ledger worksheet");
    state.engine.prepare_store().await?;

    Ok(Json(Response::success(
        "worksheet is set up with the ledger headers".to_string(),
    )))
}
