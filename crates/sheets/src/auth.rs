//! OAuth access tokens for the Sheets API.
//!
//! A service account signs an RS256 JWT assertion and exchanges it at the
//! key's `token_uri` for a short-lived bearer token, which is cached until
//! shortly before it expires.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::SheetsError;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

/// The fields of a service-account JSON key file that are needed for the
/// token exchange.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub token_uri: String,
}

impl core::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, SheetsError> {
        serde_json::from_str(json).map_err(|err| SheetsError::Key(err.to_string()))
    }

    pub async fn from_file(path: &Path) -> Result<Self, SheetsError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| SheetsError::Key(format!("{}: {err}", path.display())))?;
        Self::from_json(&json)
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Clone, Debug)]
pub struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Where bearer tokens come from.
#[derive(Debug)]
pub enum TokenSource {
    /// Pre-issued token, used as is.
    Static(String),
    ServiceAccount {
        key: ServiceAccountKey,
        cache: Mutex<Option<CachedToken>>,
    },
}

impl TokenSource {
    pub fn service_account(key: ServiceAccountKey) -> Self {
        TokenSource::ServiceAccount {
            key,
            cache: Mutex::new(None),
        }
    }

    /// Current bearer token, exchanging a fresh assertion when the cached
    /// one is missing or about to expire.
    pub async fn token(&self, http: &reqwest::Client) -> Result<String, SheetsError> {
        let (key, cache) = match self {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::ServiceAccount { key, cache } => (key, cache),
        };

        let mut cache = cache.lock().await;
        let now = Utc::now();
        if let Some(cached) = cache.as_ref()
            && cached.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
        {
            return Ok(cached.value.clone());
        }

        let fresh = exchange(http, key, now).await?;
        tracing::debug!("access token refreshed, valid until {}", fresh.expires_at);
        let value = fresh.value.clone();
        *cache = Some(fresh);
        Ok(value)
    }
}

fn assertion(key: &ServiceAccountKey, now: DateTime<Utc>) -> Result<String, SheetsError> {
    let iat = now.timestamp();
    let claims = Claims {
        iss: &key.client_email,
        scope: SHEETS_SCOPE,
        aud: &key.token_uri,
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
    Ok(jsonwebtoken::encode(&header, &claims, &signing_key)?)
}

async fn exchange(
    http: &reqwest::Client,
    key: &ServiceAccountKey,
    now: DateTime<Utc>,
) -> Result<CachedToken, SheetsError> {
    let assertion = assertion(key, now)?;

    let response = http
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SheetsError::Auth(format!("{status}: {body}")));
    }

    let token: TokenResponse = response.json().await?;
    Ok(CachedToken {
        value: token.access_token,
        expires_at: now + Duration::seconds(token.expires_in),
    })
}
