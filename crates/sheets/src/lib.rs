//! Google Sheets backed [`LedgerStore`].
//!
//! One worksheet holds the ledger: a header row, then one row per
//! transaction with the aggregate snapshot after it in columns L..Q. The
//! latest snapshot is therefore the summary block of the last non-empty row,
//! and only that block is downloaded to read it.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use engine::{
    AggregateState, HEADERS, LAST_COLUMN, LedgerRow, LedgerStore, SUMMARY_COLUMN, StoreError,
};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use auth::{SHEETS_SCOPE, ServiceAccountKey, TokenSource};
pub use error::SheetsError;

mod auth;
mod error;

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4";
pub const DEFAULT_WORKSHEET: &str = "Transactions";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    /// Path to a service-account JSON key file.
    ServiceAccount(PathBuf),
    /// Pre-issued OAuth bearer token.
    AccessToken(String),
}

#[derive(Clone, Debug)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub worksheet: String,
    pub credentials: Credentials,
    pub api_base: String,
    pub timeout: Duration,
}

impl SheetsConfig {
    pub fn new(spreadsheet_id: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            worksheet: DEFAULT_WORKSHEET.to_string(),
            credentials,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValuesBody<'a> {
    major_dimension: &'static str,
    values: &'a [Vec<String>],
}

#[derive(Debug, Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    message: String,
}

#[derive(Debug)]
pub struct SheetsStore {
    http: reqwest::Client,
    tokens: TokenSource,
    base: Url,
    spreadsheet_id: String,
    worksheet: String,
}

impl SheetsStore {
    /// Builds the HTTP client and loads the credentials. No request is made
    /// to the spreadsheet yet.
    pub async fn connect(config: SheetsConfig) -> Result<Self, SheetsError> {
        let tokens = match &config.credentials {
            Credentials::AccessToken(token) => TokenSource::Static(token.clone()),
            Credentials::ServiceAccount(path) => {
                TokenSource::service_account(ServiceAccountKey::from_file(path).await?)
            }
        };
        Self::with_token_source(config, tokens)
    }

    pub fn with_token_source(
        config: SheetsConfig,
        tokens: TokenSource,
    ) -> Result<Self, SheetsError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        let base = Url::parse(config.api_base.trim_end_matches('/'))
            .map_err(|err| SheetsError::Url(format!("{}: {err}", config.api_base)))?;

        Ok(Self {
            http,
            tokens,
            base,
            spreadsheet_id: config.spreadsheet_id,
            worksheet: config.worksheet,
        })
    }

    /// A1 range on the ledger worksheet, e.g. `'Transactions'!L2:Q`.
    fn range(&self, cells: &str) -> String {
        format!("'{}'!{cells}", self.worksheet.replace('\'', "''"))
    }

    /// `{base}/spreadsheets/{id}` followed by `segments`, each percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SheetsError::Url(self.base.to_string()))?
            .push("spreadsheets")
            .push(&self.spreadsheet_id)
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&impl Serialize>,
    ) -> Result<T, SheetsError> {
        let token = self.tokens.token(&self.http).await?;
        let mut request = self.http.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GoogleError>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(SheetsError::Api { status, message });
        }

        Ok(response.json().await?)
    }

    async fn get_values(&self, cells: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let url = self.url(&["values", &self.range(cells)])?;
        let range: ValueRange = self.send(Method::GET, url, None::<&()>).await?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn worksheet_exists(&self) -> Result<bool, SheetsError> {
        let mut url = self.url(&[])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties.title");
        let spreadsheet: Spreadsheet = self.send(Method::GET, url, None::<&()>).await?;
        Ok(spreadsheet
            .sheets
            .iter()
            .any(|sheet| sheet.properties.title == self.worksheet))
    }

    async fn add_worksheet(&self) -> Result<(), SheetsError> {
        let mut url = self.url(&[])?;
        let path = format!("{}:batchUpdate", url.path());
        url.set_path(&path);
        let body = serde_json::json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": self.worksheet,
                        "gridProperties": { "columnCount": HEADERS.len() }
                    }
                }
            }]
        });
        let _: Value = self.send(Method::POST, url, Some(&body)).await?;
        tracing::info!("created worksheet {:?}", self.worksheet);
        Ok(())
    }

    /// Latest snapshot from the summary block (L..Q) of the last row.
    ///
    /// Rows whose summary cannot be decoded (e.g. after a hand edit) are
    /// skipped in favour of the previous one.
    async fn read_latest(&self) -> Result<AggregateState, SheetsError> {
        let blocks = self
            .get_values(&format!("{SUMMARY_COLUMN}2:{LAST_COLUMN}"))
            .await?;

        let mut undecodable = None;
        for (idx, block) in blocks.iter().enumerate().rev() {
            if block.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            match engine::summary_from_block(block) {
                Ok(state) => return Ok(state),
                Err(err) => {
                    tracing::warn!("skipping row {} of {:?}: {err}", idx + 2, self.worksheet);
                    undecodable.get_or_insert(err);
                }
            }
        }

        match undecodable {
            Some(err) => Err(SheetsError::Data(err.to_string())),
            None => Ok(AggregateState::default()),
        }
    }

    async fn append(&self, row: &LedgerRow, state: &AggregateState) -> Result<(), SheetsError> {
        let segment = format!("{}:append", self.range(&format!("A:{LAST_COLUMN}")));
        let mut url = self.url(&["values", &segment])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let values = [row.to_cells(state)];
        let body = ValuesBody {
            major_dimension: "ROWS",
            values: &values,
        };
        let _: Value = self.send(Method::POST, url, Some(&body)).await?;
        Ok(())
    }

    async fn write_headers_if_missing(&self) -> Result<(), SheetsError> {
        if !self.worksheet_exists().await? {
            self.add_worksheet().await?;
        }

        let header_range = format!("A1:{LAST_COLUMN}1");
        let existing = self.get_values(&header_range).await?;
        let first = existing.first().and_then(|row| row.first());
        if first.is_some_and(|cell| !cell.trim().is_empty()) {
            tracing::debug!("worksheet {:?} already has headers", self.worksheet);
            return Ok(());
        }

        let mut url = self.url(&["values", &self.range(&header_range)])?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let values = [HEADERS.iter().map(|h| h.to_string()).collect::<Vec<_>>()];
        let body = ValuesBody {
            major_dimension: "ROWS",
            values: &values,
        };
        let _: Value = self.send(Method::PUT, url, Some(&body)).await?;
        tracing::info!("wrote headers to worksheet {:?}", self.worksheet);
        Ok(())
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl LedgerStore for SheetsStore {
    async fn read_latest_aggregate(&self) -> Result<AggregateState, StoreError> {
        Ok(self.read_latest().await?)
    }

    async fn append_row_and_write_aggregate(
        &self,
        row: &LedgerRow,
        new_state: &AggregateState,
    ) -> Result<(), StoreError> {
        Ok(self.append(row, new_state).await?)
    }

    async fn ensure_headers(&self) -> Result<(), StoreError> {
        Ok(self.write_headers_if_missing().await?)
    }
}
