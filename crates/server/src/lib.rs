use api_types::Response;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::IntoResponse,
};
use engine::EngineError;

pub use server::{ServerState, router, run_with_listener, spawn_with_listener};

mod balances;
mod health;
mod server;
mod sms;

pub enum ServerError {
    Engine(EngineError),
    /// Request body that axum could not read as the expected JSON.
    Payload(JsonRejection),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Store(_) => StatusCode::BAD_GATEWAY,
        EngineError::InvalidAmount(_) | EngineError::InvalidRow(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        EngineError::InvalidTimezone(_)
        | EngineError::Template(_)
        | EngineError::MissingField(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Store(store_err) => {
            tracing::error!("ledger store error: {store_err}");
            format!("ledger store error: {store_err}")
        }
        EngineError::Template(regex_err) => {
            tracing::error!("template error: {regex_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Payload(rejection) => (rejection.status(), rejection.body_text()),
        };

        (status, Json(Response::<()>::error(error))).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<JsonRejection> for ServerError {
    fn from(value: JsonRejection) -> Self {
        Self::Payload(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::StoreError;

    #[test]
    fn store_errors_map_to_502() {
        let res = ServerError::from(EngineError::Store(StoreError::Unavailable(
            "timeout".to_string(),
        )))
        .into_response();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn corrupt_rows_map_to_422() {
        let res =
            ServerError::from(EngineError::InvalidRow("bad cell".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
