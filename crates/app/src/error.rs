use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("engine error: {0}")]
    Engine(#[from] engine::EngineError),
    #[error("sheets error: {0}")]
    Sheets(#[from] sheets::SheetsError),
    #[error("store.kind = \"sheets\" needs store.service_account_path or store.access_token")]
    MissingCredentials,
}
