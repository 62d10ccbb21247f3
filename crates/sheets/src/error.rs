use engine::StoreError;
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("service account key: {0}")]
    Key(String),
    #[error("token signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("token exchange failed: {0}")]
    Auth(String),
    #[error("{status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error("invalid url: {0}")]
    Url(String),
    #[error("unexpected data: {0}")]
    Data(String),
}

impl From<SheetsError> for StoreError {
    fn from(err: SheetsError) -> Self {
        match err {
            SheetsError::Api { status, .. } if status.is_client_error() => {
                StoreError::Rejected(err.to_string())
            }
            SheetsError::Url(_) => StoreError::Rejected(err.to_string()),
            SheetsError::Data(_) => StoreError::Malformed(err.to_string()),
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}
