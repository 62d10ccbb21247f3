//! Message parser.
//!
//! A notification is matched against an ordered table of templates, EBL first
//! and bKash second. The first template that matches wins and its named
//! captures are turned into a [`ParsedTransaction`].
//!
//! Capture names shared by every template:
//!
//! | name           | required | meaning                                   |
//! |----------------|----------|-------------------------------------------|
//! | `amount`       | yes      | transaction amount, thousands separated   |
//! | `balance`      | yes      | balance after the transaction             |
//! | `fee`          | no       | fee charged by the provider               |
//! | `counterparty` | no       | the "from/to/as" token                    |
//! | `reference`    | no       | free text reference (bKash `Ref ...`)     |
//! | `trx_id`       | no       | provider transaction id                   |
//! | `date`         | no       | timestamp in the provider's native format |

use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use regex::{Captures, Regex, RegexBuilder};
use serde::Serialize;

use crate::{MessageKind, Money, Provider, ResultEngine};

const AMOUNT: &str = r"[\d,]+(?:\.\d{2})?";

const EBL_DATE: &str = r"(?P<date>\d{2}-[A-Za-z]{3}-\d{2}\s+\d{1,2}:\d{2}:\d{2}\s+[AP]M)";
const EBL_DATE_FORMAT: &str = "%d-%b-%y %I:%M:%S %p";

const BKASH_TAIL: &str = concat!(
    r"Fee\s+Tk\s*(?P<fee>{AMT})\.\s+",
    r"Balance\s+Tk\s*(?P<balance>{AMT})\.?\s+",
    r"TrxID\s+(?P<trx_id>\w+)",
    r"(?:\s+at\s+(?P<date>\d{2}/\d{2}/\d{4}\s+\d{1,2}:\d{2}))?"
);
const BKASH_DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// `(kind, pattern, date format)` in priority order.
const TEMPLATES: &[(MessageKind, &str, &str)] = &[
    (
        MessageKind::Debited,
        concat!(
            r"AC\s+\d+\*+\d+\s+is\s+debited\s+with\s+BDT\s*(?P<amount>{AMT})\s+",
            r"as\s+(?P<counterparty>.+?)\s+on\s+{EBL_DATE}\s+",
            r"Balance\s+is\s+BDT\s*(?P<balance>{AMT})"
        ),
        EBL_DATE_FORMAT,
    ),
    (
        MessageKind::Credited,
        concat!(
            r"AC\s+\d+\*+\d+\s+is\s+credited\s+with\s+BDT\s*(?P<amount>{AMT})\s+",
            r"as\s+(?P<counterparty>.+?)\s+on\s+{EBL_DATE}\s+",
            r"Balance\s+is\s+BDT\s*(?P<balance>{AMT})"
        ),
        EBL_DATE_FORMAT,
    ),
    (
        MessageKind::CashWithdrawal,
        concat!(
            r"Cash\s+WD\s+BDT\s*(?P<amount>{AMT})\s+from\s+(?P<counterparty>.+?)\s*\.\s*",
            r"Card\s+\d+\*+\d+\s+on\s+{EBL_DATE}(?:\s+BST)?\s*\.\s*",
            r"Your\s+A/C\s+\d+\*+\d+\s+Balance\s+BDT\s*(?P<balance>{AMT})"
        ),
        EBL_DATE_FORMAT,
    ),
    (
        MessageKind::FundTransfer,
        concat!(
            r"Fund\s+Transfer\s+of\s+BDT\s*(?P<amount>{AMT})\s+from\s+(?P<counterparty>.+?)\s*\.\s*",
            r"Card\s+\d+\*+\d+\s+on\s+{EBL_DATE}(?:\s+BST)?\s*\.\s*",
            r"Your\s+A/C\s+\d+\*+\d+\s+Balance\s+BDT\s*(?P<balance>{AMT})"
        ),
        EBL_DATE_FORMAT,
    ),
    (
        MessageKind::Deposit,
        concat!(
            r"You\s+have\s+received\s+deposit\s+of\s+Tk\s*(?P<amount>{AMT})\s+",
            r"from\s+(?P<counterparty>.+?)\.\s+{BKASH_TAIL}"
        ),
        BKASH_DATE_FORMAT,
    ),
    (
        MessageKind::CashIn,
        concat!(
            r"Cash\s+In\s+Tk\s*(?P<amount>{AMT})\s+from\s+(?P<counterparty>\d+)\s+successful\.\s+",
            r"{BKASH_TAIL}"
        ),
        BKASH_DATE_FORMAT,
    ),
    (
        MessageKind::CashOut,
        concat!(
            r"Cash\s+Out\s+Tk\s*(?P<amount>{AMT})\s+to\s+(?P<counterparty>\d+)\s+successful\.\s+",
            r"{BKASH_TAIL}"
        ),
        BKASH_DATE_FORMAT,
    ),
    (
        MessageKind::SendMoney,
        concat!(
            r"Send\s+Money\s+Tk\s*(?P<amount>{AMT})\s+to\s+(?P<counterparty>\d+)\s+successful\.\s+",
            r"(?:Ref\s+(?P<reference>.+?)\.\s+)?{BKASH_TAIL}"
        ),
        BKASH_DATE_FORMAT,
    ),
    (
        MessageKind::Payment,
        concat!(
            r"Payment\s+Tk\s*(?P<amount>{AMT})\s+to\s+(?P<counterparty>\d+)\s+successful\.\s+",
            r"(?:Ref\s+(?P<reference>.+?)\.\s+)?{BKASH_TAIL}"
        ),
        BKASH_DATE_FORMAT,
    ),
];

/// Where `occurred_at` came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampSource {
    /// Parsed from the message text.
    Message,
    /// The message had no usable timestamp; request/server time was used.
    Received,
}

/// Typed fields extracted from a recognised notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParsedTransaction {
    pub provider: Provider,
    pub kind: MessageKind,
    pub amount: Money,
    pub fee: Money,
    pub balance_after: Money,
    pub counterparty: Option<String>,
    pub description: String,
    pub transaction_id: Option<String>,
    pub occurred_at: DateTime<Tz>,
    pub occurred_at_source: TimestampSource,
    pub raw_message: String,
}

/// Why a message could not be turned into a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    NoTemplateMatch,
    FieldExtractionFailed {
        kind: MessageKind,
        field: &'static str,
        detail: String,
    },
}

impl FailureReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoTemplateMatch => "NO_TEMPLATE_MATCH",
            Self::FieldExtractionFailed { .. } => "FIELD_EXTRACTION_FAILED",
        }
    }
}

/// Recoverable parse outcome. Carries the original text for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParseFailure {
    pub reason: FailureReason,
    pub raw_message: String,
}

impl core::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self.reason {
            FailureReason::NoTemplateMatch => {
                write!(f, "{}: no known message shape matched", self.reason.code())
            }
            FailureReason::FieldExtractionFailed {
                kind,
                field,
                detail,
            } => write!(
                f,
                "{}: {} message has an unreadable {field} ({detail})",
                self.reason.code(),
                kind.as_str()
            ),
        }
    }
}

struct Template {
    kind: MessageKind,
    regex: Regex,
    date_format: &'static str,
}

/// Compiled template table bound to the configured timezone.
pub struct Parser {
    templates: Vec<Template>,
    timezone: Tz,
}

impl core::fmt::Debug for Parser {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Parser")
            .field("templates", &self.templates.len())
            .field("timezone", &self.timezone)
            .finish()
    }
}

impl Parser {
    /// Compiles every template. Fails only if a pattern is invalid.
    pub fn new(timezone: Tz) -> ResultEngine<Self> {
        let templates = TEMPLATES
            .iter()
            .map(|(kind, pattern, date_format)| -> ResultEngine<Template> {
                let pattern = pattern
                    .replace("{BKASH_TAIL}", BKASH_TAIL)
                    .replace("{EBL_DATE}", EBL_DATE)
                    .replace("{AMT}", AMOUNT);
                let regex = RegexBuilder::new(&pattern).case_insensitive(true).build()?;
                Ok(Template {
                    kind: *kind,
                    regex,
                    date_format: *date_format,
                })
            })
            .collect::<ResultEngine<Vec<_>>>()?;

        Ok(Self {
            templates,
            timezone,
        })
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Parses `text` into a transaction. Templates are matched against the
    /// trimmed text; `raw_message` keeps it as received.
    ///
    /// `received_at` is used as `occurred_at` when the message has no
    /// timestamp or the embedded one cannot be read.
    pub fn parse(
        &self,
        text: &str,
        received_at: DateTime<Tz>,
    ) -> Result<ParsedTransaction, ParseFailure> {
        let message = text.trim();

        let Some((template, caps)) = self
            .templates
            .iter()
            .find_map(|t| t.regex.captures(message).map(|caps| (t, caps)))
        else {
            return Err(ParseFailure {
                reason: FailureReason::NoTemplateMatch,
                raw_message: text.to_string(),
            });
        };

        let kind = template.kind;
        let money = |field: &'static str, required: bool| -> Result<Money, ParseFailure> {
            match caps.name(field) {
                Some(m) => m.as_str().parse::<Money>().map_err(|err| ParseFailure {
                    reason: FailureReason::FieldExtractionFailed {
                        kind,
                        field,
                        detail: err.to_string(),
                    },
                    raw_message: text.to_string(),
                }),
                None if required => Err(ParseFailure {
                    reason: FailureReason::FieldExtractionFailed {
                        kind,
                        field,
                        detail: "missing".to_string(),
                    },
                    raw_message: text.to_string(),
                }),
                None => Ok(Money::ZERO),
            }
        };

        let amount = money("amount", true)?;
        let balance_after = money("balance", true)?;
        let fee = money("fee", false)?;

        let counterparty = capture(&caps, "counterparty");
        let reference = capture(&caps, "reference");
        let transaction_id = capture(&caps, "trx_id");

        let embedded = caps
            .name("date")
            .and_then(|m| self.local_datetime(m.as_str(), template.date_format));
        let (occurred_at, occurred_at_source) = match embedded {
            Some(dt) => (dt, TimestampSource::Message),
            None => {
                if let Some(m) = caps.name("date") {
                    tracing::warn!(
                        "unreadable {} timestamp {:?}, using received time",
                        kind.as_str(),
                        m.as_str()
                    );
                }
                (
                    received_at.with_timezone(&self.timezone),
                    TimestampSource::Received,
                )
            }
        };

        Ok(ParsedTransaction {
            provider: kind.provider(),
            kind,
            amount,
            fee,
            balance_after,
            description: describe(kind, counterparty.as_deref(), reference.as_deref()),
            counterparty,
            transaction_id,
            occurred_at,
            occurred_at_source,
            raw_message: text.to_string(),
        })
    }

    fn local_datetime(&self, raw: &str, format: &str) -> Option<DateTime<Tz>> {
        let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        let naive = NaiveDateTime::parse_from_str(&normalized, format).ok()?;
        self.timezone.from_local_datetime(&naive).single()
    }
}

fn capture(caps: &Captures<'_>, name: &str) -> Option<String> {
    caps.name(name)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn describe(kind: MessageKind, counterparty: Option<&str>, reference: Option<&str>) -> String {
    let who = counterparty.unwrap_or("unknown");
    let with_ref = |base: String| match reference {
        Some(r) => format!("{base} - {r}"),
        None => base,
    };

    match kind {
        MessageKind::Deposit => format!("Deposit from {who}"),
        MessageKind::CashIn => format!("Cash In from {who}"),
        MessageKind::Payment => with_ref(format!("Payment to {who}")),
        MessageKind::CashOut => format!("Cash Out to {who}"),
        MessageKind::SendMoney => with_ref(format!("Send Money to {who}")),
        MessageKind::Credited | MessageKind::Debited => who.to_string(),
        MessageKind::CashWithdrawal => format!("Cash WD from {who}"),
        MessageKind::FundTransfer => format!("Fund Transfer from {who}"),
    }
}
