//! SMS ledger engine.
//!
//! Turns bKash / EBL notification texts into categorized transactions and
//! keeps the running balance and expense snapshot of the ledger up to date.
//!
//! ```text
//! raw text -> Parser -> ParsedTransaction -> Classifier -> CategorizedTransaction
//!          -> AggregateState::apply (under the writer lock) -> LedgerStore
//! ```
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;

pub use aggregate::{AggregateState, apply};
pub use classifier::{
    CategorizedTransaction, Classifier, SelfAccounts, TransactionType, default_type,
};
pub use error::{EngineError, StoreError};
pub use money::Money;
pub use parser::{FailureReason, ParseFailure, ParsedTransaction, Parser, TimestampSource};
pub use provider::{MessageKind, Provider};
pub use row::{
    COLUMN_COUNT, HEADERS, LAST_COLUMN, LedgerRow, SUMMARY_COLUMN, summary_from_block,
    summary_from_cells,
};
pub use store::{LedgerStore, MemoryStore};

mod aggregate;
mod classifier;
mod error;
mod money;
mod parser;
mod provider;
mod row;
mod store;

type ResultEngine<T> = Result<T, EngineError>;

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Dhaka;

/// Parses an IANA timezone name (e.g. `Asia/Dhaka`).
pub fn parse_timezone(name: &str) -> ResultEngine<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| EngineError::InvalidTimezone(name.to_string()))
}

/// Client-side receive time of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceivedAt {
    Zoned(DateTime<FixedOffset>),
    /// Wall-clock time without offset, read in the ledger timezone.
    Local(NaiveDateTime),
}

/// Notification text as received, with the optional client timestamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawMessage {
    pub text: String,
    pub timestamp: Option<ReceivedAt>,
}

impl RawMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<FixedOffset>) -> Self {
        self.timestamp = Some(ReceivedAt::Zoned(timestamp));
        self
    }

    pub fn with_local_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(ReceivedAt::Local(timestamp));
        self
    }
}

/// Result of processing one message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Recorded {
        transaction: CategorizedTransaction,
        aggregate: AggregateState,
    },
    Ignored(ParseFailure),
}

pub struct Engine {
    parser: Parser,
    classifier: Classifier,
    store: Arc<dyn LedgerStore>,
    // Serialises the read-apply-write round trip against the store.
    writer: Mutex<()>,
}

impl core::fmt::Debug for Engine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Engine")
            .field("parser", &self.parser)
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn timezone(&self) -> Tz {
        self.parser.timezone()
    }

    /// Parses a message. The fallback timestamp is the client's one when
    /// present, otherwise the current time, both in the configured timezone.
    pub fn parse(&self, message: &RawMessage) -> Result<ParsedTransaction, ParseFailure> {
        let tz = self.timezone();
        let received_at = match message.timestamp {
            Some(ReceivedAt::Zoned(ts)) => Some(ts.with_timezone(&tz)),
            // Earliest reading for a repeated hour, none inside a DST gap.
            Some(ReceivedAt::Local(naive)) => tz.from_local_datetime(&naive).earliest(),
            None => None,
        };
        let received_at = received_at.unwrap_or_else(|| Utc::now().with_timezone(&tz));
        self.parser.parse(&message.text, received_at)
    }

    pub fn classify(&self, parsed: ParsedTransaction) -> CategorizedTransaction {
        self.classifier.classify(parsed)
    }

    /// Applies `t` to the latest snapshot and appends it to the store.
    ///
    /// Holds the writer lock for the whole round trip, so concurrent callers
    /// in this process accumulate instead of overwriting each other.
    pub async fn record(&self, t: &CategorizedTransaction) -> ResultEngine<AggregateState> {
        let _guard = self.writer.lock().await;

        let current = self.store.read_latest_aggregate().await?;
        let next = current.apply(t);
        self.store
            .append_row_and_write_aggregate(&LedgerRow::from(t), &next)
            .await?;

        Ok(next)
    }

    /// Full pipeline: parse, classify, record.
    ///
    /// Unrecognised messages are returned as [`Outcome::Ignored`]; only store
    /// failures are errors.
    pub async fn process(&self, message: &RawMessage) -> ResultEngine<Outcome> {
        let parsed = match self.parse(message) {
            Ok(parsed) => parsed,
            Err(failure) => {
                tracing::info!("message ignored: {failure}");
                tracing::debug!("ignored message text: {:?}", failure.raw_message);
                return Ok(Outcome::Ignored(failure));
            }
        };

        let transaction = self.classify(parsed);
        let aggregate = match self.record(&transaction).await {
            Ok(aggregate) => aggregate,
            Err(err) => {
                tracing::error!("failed to record {} transaction: {err}", transaction.provider);
                return Err(err);
            }
        };

        tracing::info!(
            "recorded {} {} of {} (balance {}, total {})",
            transaction.provider,
            transaction.transaction_type.as_str(),
            transaction.amount,
            transaction.balance_after,
            aggregate.total
        );

        Ok(Outcome::Recorded {
            transaction,
            aggregate,
        })
    }

    /// Latest snapshot from the store.
    pub async fn balances(&self) -> ResultEngine<AggregateState> {
        Ok(self.store.read_latest_aggregate().await?)
    }

    /// Writes the header row if the store does not have one yet.
    pub async fn prepare_store(&self) -> ResultEngine<()> {
        Ok(self.store.ensure_headers().await?)
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    timezone: Option<Tz>,
    self_accounts: SelfAccounts,
    store: Option<Arc<dyn LedgerStore>>,
}

impl EngineBuilder {
    /// Timezone used for message timestamps and day/month boundaries.
    /// Defaults to [`DEFAULT_TIMEZONE`].
    pub fn timezone(mut self, timezone: Tz) -> EngineBuilder {
        self.timezone = Some(timezone);
        self
    }

    /// Owner's own account identifiers used for transfer detection.
    pub fn self_accounts(mut self, self_accounts: SelfAccounts) -> EngineBuilder {
        self.self_accounts = self_accounts;
        self
    }

    /// Pass the required ledger store
    pub fn store(mut self, store: Arc<dyn LedgerStore>) -> EngineBuilder {
        self.store = Some(store);
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> ResultEngine<Engine> {
        let store = self.store.ok_or(EngineError::MissingField("store"))?;
        Ok(Engine {
            parser: Parser::new(self.timezone.unwrap_or(DEFAULT_TIMEZONE))?,
            classifier: Classifier::new(self.self_accounts),
            store,
            writer: Mutex::new(()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timezone_names_are_validated() {
        assert_eq!(parse_timezone("Asia/Dhaka").unwrap(), chrono_tz::Asia::Dhaka);
        assert_eq!(
            parse_timezone("Mars/Olympus").unwrap_err(),
            EngineError::InvalidTimezone("Mars/Olympus".to_string())
        );
    }

    #[test]
    fn builder_requires_a_store() {
        let err = Engine::builder().build().unwrap_err();
        assert_eq!(err, EngineError::MissingField("store"));
    }

    #[test]
    fn client_timestamp_is_the_fallback() {
        let engine = Engine::builder()
            .store(Arc::new(MemoryStore::new()))
            .build()
            .unwrap();
        let ts = DateTime::parse_from_rfc3339("2025-08-08T23:30:00+00:00").unwrap();
        let message = RawMessage::new(
            "Cash In Tk 500.00 from 01712345678 successful. Fee Tk 0.00. \
             Balance Tk 1,522.94. TrxID CI00000001",
        )
        .with_timestamp(ts);

        let parsed = engine.parse(&message).unwrap();
        assert_eq!(parsed.occurred_at_source, TimestampSource::Received);
        assert_eq!(parsed.occurred_at.to_rfc3339(), "2025-08-09T05:30:00+06:00");
    }

    #[test]
    fn local_client_timestamp_is_read_in_ledger_timezone() {
        let engine = Engine::builder()
            .store(Arc::new(MemoryStore::new()))
            .build()
            .unwrap();
        let naive = NaiveDateTime::parse_from_str("2025-08-08 23:30:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        let message = RawMessage::new(
            "Cash In Tk 500.00 from 01712345678 successful. Fee Tk 0.00. \
             Balance Tk 1,522.94. TrxID CI00000001",
        )
        .with_local_timestamp(naive);

        let parsed = engine.parse(&message).unwrap();
        assert_eq!(parsed.occurred_at_source, TimestampSource::Received);
        assert_eq!(parsed.occurred_at.to_rfc3339(), "2025-08-08T23:30:00+06:00");
    }
}
