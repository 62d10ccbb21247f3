//! Application settings.
//!
//! Read from an optional TOML file (`settings.toml` unless `--config` says
//! otherwise), then from `SMS_LEDGER_*` environment variables, with `__`
//! between nested keys (e.g. `SMS_LEDGER_STORE__KIND=sheets`).
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use config::Config;
use serde::Deserialize;

use engine::SelfAccounts;
use sheets::{Credentials, SheetsConfig};

use crate::error::{AppError, Result};

const DEFAULT_CONFIG_PATH: &str = "settings";
const ENV_PREFIX: &str = "SMS_LEDGER";

#[derive(Debug, Parser)]
#[command(name = "sms_ledger", version)]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override the listening port.
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: String,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Ledger {
    /// IANA name of the timezone day and month boundaries follow.
    pub timezone: String,
    pub self_accounts: SelfAccounts,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            timezone: engine::DEFAULT_TIMEZONE.name().to_string(),
            self_accounts: SelfAccounts::default(),
        }
    }
}

fn default_worksheet() -> String {
    sheets::DEFAULT_WORKSHEET.to_string()
}

fn default_timeout_secs() -> u64 {
    sheets::DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Store {
    /// Keeps the ledger in process memory. Lost on restart.
    #[default]
    Memory,
    Sheets {
        spreadsheet_id: String,
        #[serde(default = "default_worksheet")]
        worksheet: String,
        #[serde(default)]
        service_account_path: Option<PathBuf>,
        #[serde(default)]
        access_token: Option<String>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
        #[serde(default)]
        api_base: Option<String>,
    },
}

impl Store {
    /// Client configuration for the sheets store, `None` for the memory one.
    pub fn sheets_config(&self) -> Result<Option<SheetsConfig>> {
        let Store::Sheets {
            spreadsheet_id,
            worksheet,
            service_account_path,
            access_token,
            timeout_secs,
            api_base,
        } = self
        else {
            return Ok(None);
        };

        let credentials = match (service_account_path, access_token) {
            (Some(path), _) => Credentials::ServiceAccount(path.clone()),
            (None, Some(token)) => Credentials::AccessToken(token.clone()),
            (None, None) => return Err(AppError::MissingCredentials),
        };

        let mut config = SheetsConfig::new(spreadsheet_id, credentials);
        config.worksheet = worksheet.clone();
        config.timeout = Duration::from_secs(*timeout_secs);
        if let Some(api_base) = api_base {
            config.api_base = api_base.clone();
        }
        Ok(Some(config))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub ledger: Ledger,
    pub store: Store,
}

impl Settings {
    /// Settings from the command line, the config file and the environment.
    pub fn load() -> Result<Self> {
        let args = Args::parse();

        let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
        let config = Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("ledger.self_accounts.bkash")
                    .with_list_parse_key("ledger.self_accounts.ebl")
                    .try_parsing(true),
            )
            .build()?;
        let mut settings = Self::from_config(config)?;

        if let Some(port) = args.port {
            settings.server.port = port;
        }

        Ok(settings)
    }

    fn from_config(config: Config) -> Result<Self> {
        Ok(config.try_deserialize()?)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}
