use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Top-level `status` of every JSON answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Error,
}

/// Envelope shared by the API endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct Response<T> {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Response<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            data: None,
            error: Some(error.into()),
        }
    }
}

pub mod sms {
    use core::str::FromStr;

    use serde::{Deserializer, Serializer, de};

    use super::*;

    const LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    /// ISO 8601 date-time, with or without a UTC offset.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Timestamp {
        Zoned(DateTime<FixedOffset>),
        /// No offset given; the server reads it in the ledger timezone.
        Local(NaiveDateTime),
    }

    impl FromStr for Timestamp {
        type Err = String;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            let s = s.trim();
            if let Ok(zoned) = DateTime::parse_from_rfc3339(s) {
                return Ok(Timestamp::Zoned(zoned));
            }
            LOCAL_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
                .map(Timestamp::Local)
                .ok_or_else(|| format!("invalid ISO 8601 timestamp: {s:?}"))
        }
    }

    impl Serialize for Timestamp {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                Timestamp::Zoned(ts) => serializer.serialize_str(&ts.to_rfc3339()),
                Timestamp::Local(ts) => serializer.collect_str(&ts.format(LOCAL_FORMATS[0])),
            }
        }
    }

    impl<'de> Deserialize<'de> for Timestamp {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let raw = String::deserialize(deserializer)?;
            raw.parse().map_err(de::Error::custom)
        }
    }

    /// Body of `POST /process-sms`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SmsMessage {
        pub message: String,
        /// Time the phone received the SMS. Used only when the text itself
        /// carries no readable timestamp.
        #[serde(default)]
        pub timestamp: Option<Timestamp>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionType {
        Income,
        Expense,
        Transfer,
    }

    /// Recorded transaction as returned to the caller.
    ///
    /// Amounts are decimal strings with two fractional digits (`"1022.94"`).
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionData {
        /// `bKash` or `EBL`.
        pub platform: String,
        pub transaction_type: TransactionType,
        pub amount: String,
        pub balance: String,
        pub description: String,
        pub fee: String,
        pub transaction_id: Option<String>,
        /// RFC3339 timestamp in the ledger timezone.
        pub occurred_at: DateTime<FixedOffset>,
    }
}

pub mod balances {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Balances {
        pub ebl_balance: String,
        pub bkash_balance: String,
        pub total_balance: String,
        pub today_expense: String,
        pub monthly_expense: String,
        /// `YYYY-MM-DD` of the last expense, if any.
        pub expense_day: Option<String>,
    }
}

pub mod health {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Health {
        pub status: String,
        pub timestamp: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Banner {
        pub message: String,
        pub status: String,
    }
}
