//! SMS intake endpoint

use api_types::{
    Response,
    sms::{SmsMessage, Timestamp, TransactionData, TransactionType},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use engine::{CategorizedTransaction, Outcome, RawMessage};

use crate::{ServerError, server::ServerState};

fn transaction_type(t: engine::TransactionType) -> TransactionType {
    match t {
        engine::TransactionType::Income => TransactionType::Income,
        engine::TransactionType::Expense => TransactionType::Expense,
        engine::TransactionType::Transfer => TransactionType::Transfer,
    }
}

fn transaction_data(t: &CategorizedTransaction) -> TransactionData {
    TransactionData {
        platform: t.provider.as_str().to_string(),
        transaction_type: transaction_type(t.transaction_type),
        amount: t.amount.to_string(),
        balance: t.balance_after.to_string(),
        description: t.description.clone(),
        fee: t.fee.to_string(),
        transaction_id: t.transaction_id.clone(),
        occurred_at: t.occurred_at.fixed_offset(),
    }
}

/// Handle a forwarded notification.
///
/// Texts that are not bKash/EBL transactions are answered with HTTP 200 and
/// `status: "error"`; nothing is written for them.
pub async fn process(
    State(state): State<ServerState>,
    payload: Result<Json<SmsMessage>, JsonRejection>,
) -> Result<Json<Response<TransactionData>>, ServerError> {
    let Json(payload) = payload?;

    let message = RawMessage::new(payload.message);
    let message = match payload.timestamp {
        Some(Timestamp::Zoned(ts)) => message.with_timestamp(ts),
        Some(Timestamp::Local(ts)) => message.with_local_timestamp(ts),
        None => message,
    };

    match state.engine.process(&message).await? {
        Outcome::Recorded { transaction, .. } => {
            Ok(Json(Response::success(transaction_data(&transaction))))
        }
        Outcome::Ignored(failure) => Ok(Json(Response::error(failure.to_string()))),
    }
}
