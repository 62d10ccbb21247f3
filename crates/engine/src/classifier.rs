//! Transaction classifier.
//!
//! Every [`MessageKind`] has a default income/expense mapping. A transaction is
//! re-labelled as a transfer when its counterparty names one of the owner's own
//! accounts on the *other* provider (e.g. an EBL debit "as Transfer to bKash",
//! or a bKash deposit "from VISA Card" when that card is the owner's EBL card).

use serde::{Deserialize, Serialize};

use crate::{MessageKind, Money, ParsedTransaction, Provider};

/// Income / expense / transfer category of a recorded transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
}

impl TransactionType {
    /// Value written to the sheet's Transaction Type column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }
}

impl TryFrom<&str> for TransactionType {
    type Error = crate::EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            other => Err(crate::EngineError::InvalidRow(format!(
                "invalid transaction type: {other}"
            ))),
        }
    }
}

/// Default mapping from message shape to category.
pub const fn default_type(kind: MessageKind) -> TransactionType {
    match kind {
        MessageKind::Deposit
        | MessageKind::CashIn
        | MessageKind::Credited
        | MessageKind::FundTransfer => TransactionType::Income,
        MessageKind::Payment
        | MessageKind::CashOut
        | MessageKind::SendMoney
        | MessageKind::Debited
        | MessageKind::CashWithdrawal => TransactionType::Expense,
    }
}

/// Identifiers of the owner's own accounts, as they appear in the *other*
/// provider's messages.
///
/// `bkash` holds strings that denote the owner's bKash wallet inside EBL
/// messages (e.g. `"bKash"`); `ebl` holds strings that denote the owner's EBL
/// account or card inside bKash messages (e.g. `"VISA Card"`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfAccounts {
    pub bkash: Vec<String>,
    pub ebl: Vec<String>,
}

impl SelfAccounts {
    fn identifiers(&self, provider: Provider) -> &[String] {
        match provider {
            Provider::Bkash => &self.bkash,
            Provider::Ebl => &self.ebl,
        }
    }
}

/// A parsed transaction with its category attached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategorizedTransaction {
    #[serde(flatten)]
    pub parsed: ParsedTransaction,
    pub transaction_type: TransactionType,
}

impl CategorizedTransaction {
    /// Amount plus fee, the value that counts against expense totals.
    pub fn outflow(&self) -> Money {
        self.parsed.amount + self.parsed.fee
    }
}

impl core::ops::Deref for CategorizedTransaction {
    type Target = ParsedTransaction;

    fn deref(&self) -> &Self::Target {
        &self.parsed
    }
}

#[derive(Clone, Debug, Default)]
pub struct Classifier {
    self_accounts: SelfAccounts,
}

impl Classifier {
    pub fn new(self_accounts: SelfAccounts) -> Self {
        let normalize = |ids: Vec<String>| {
            ids.into_iter()
                .map(|id| id.trim().to_lowercase())
                .filter(|id| !id.is_empty())
                .collect()
        };
        Self {
            self_accounts: SelfAccounts {
                bkash: normalize(self_accounts.bkash),
                ebl: normalize(self_accounts.ebl),
            },
        }
    }

    /// Assigns a [`TransactionType`]. Pure and deterministic.
    pub fn classify(&self, parsed: ParsedTransaction) -> CategorizedTransaction {
        let transaction_type = if self.is_transfer(&parsed) {
            TransactionType::Transfer
        } else {
            default_type(parsed.kind)
        };

        CategorizedTransaction {
            parsed,
            transaction_type,
        }
    }

    fn is_transfer(&self, parsed: &ParsedTransaction) -> bool {
        let haystack = parsed
            .counterparty
            .as_deref()
            .unwrap_or(&parsed.description)
            .to_lowercase();

        self.self_accounts
            .identifiers(parsed.provider.other())
            .iter()
            .any(|id| haystack.contains(id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::TimestampSource;

    fn parsed(kind: MessageKind, counterparty: &str) -> ParsedTransaction {
        ParsedTransaction {
            provider: kind.provider(),
            kind,
            amount: Money::from_minor(10_000),
            fee: Money::from_minor(500),
            balance_after: Money::from_minor(50_000),
            counterparty: Some(counterparty.to_string()),
            description: counterparty.to_string(),
            transaction_id: None,
            occurred_at: chrono_tz::Asia::Dhaka
                .with_ymd_and_hms(2025, 8, 7, 10, 0, 0)
                .unwrap(),
            occurred_at_source: TimestampSource::Message,
            raw_message: String::new(),
        }
    }

    fn owner() -> Classifier {
        Classifier::new(SelfAccounts {
            bkash: vec!["bKash".to_string()],
            ebl: vec!["VISA Card".to_string(), "  ".to_string()],
        })
    }

    #[test]
    fn default_rules_without_self_accounts() {
        let classifier = Classifier::default();
        let cases = [
            (MessageKind::Deposit, TransactionType::Income),
            (MessageKind::CashIn, TransactionType::Income),
            (MessageKind::Payment, TransactionType::Expense),
            (MessageKind::CashOut, TransactionType::Expense),
            (MessageKind::SendMoney, TransactionType::Expense),
            (MessageKind::Credited, TransactionType::Income),
            (MessageKind::Debited, TransactionType::Expense),
            (MessageKind::CashWithdrawal, TransactionType::Expense),
            (MessageKind::FundTransfer, TransactionType::Income),
        ];
        for (kind, expected) in cases {
            let t = classifier.classify(parsed(kind, "VISA Card via bKash"));
            assert_eq!(t.transaction_type, expected, "{kind:?}");
        }
    }

    #[test]
    fn ebl_debit_to_own_bkash_is_transfer() {
        let t = owner().classify(parsed(MessageKind::Debited, "Transfer to BKASH wallet"));
        assert_eq!(t.transaction_type, TransactionType::Transfer);
    }

    #[test]
    fn bkash_deposit_from_own_card_is_transfer() {
        let t = owner().classify(parsed(MessageKind::Deposit, "VISA Card"));
        assert_eq!(t.transaction_type, TransactionType::Transfer);
    }

    #[test]
    fn identifier_of_same_provider_does_not_count() {
        // "bKash" names the owner's wallet only when seen from the EBL side.
        let t = owner().classify(parsed(MessageKind::Payment, "bKash merchant"));
        assert_eq!(t.transaction_type, TransactionType::Expense);
    }

    #[test]
    fn blank_identifiers_never_match() {
        let t = owner().classify(parsed(MessageKind::CashIn, "01712345678"));
        assert_eq!(t.transaction_type, TransactionType::Income);
    }

    #[test]
    fn classification_is_deterministic() {
        let classifier = owner();
        let input = parsed(MessageKind::SendMoney, "01612345678");
        let first = classifier.classify(input.clone());
        for _ in 0..10 {
            assert_eq!(classifier.classify(input.clone()), first);
        }
    }

    #[test]
    fn outflow_includes_fee() {
        let t = Classifier::default().classify(parsed(MessageKind::CashOut, "01912345678"));
        assert_eq!(t.outflow().minor(), 10_500);
    }
}
