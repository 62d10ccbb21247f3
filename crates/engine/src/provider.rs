//! Providers and the message shapes they send.

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Money-movement service a notification comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Provider {
    /// bKash mobile wallet.
    Bkash,
    /// Eastern Bank Limited retail account.
    Ebl,
}

impl Provider {
    /// Name written to the sheet's Platform column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bkash => "bKash",
            Self::Ebl => "EBL",
        }
    }

    /// The counterpart provider, used for cross-provider transfer detection.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Bkash => Self::Ebl,
            Self::Ebl => Self::Bkash,
        }
    }
}

impl core::fmt::Display for Provider {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Provider {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bkash" => Ok(Self::Bkash),
            "ebl" => Ok(Self::Ebl),
            other => Err(EngineError::InvalidRow(format!("unknown platform: {other}"))),
        }
    }
}

/// Shape of a recognised notification.
///
/// Each template of the parser yields exactly one kind, and the classifier's
/// default income/expense mapping is keyed on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    // bKash
    Deposit,
    CashIn,
    Payment,
    CashOut,
    SendMoney,
    // EBL
    Credited,
    Debited,
    CashWithdrawal,
    FundTransfer,
}

impl MessageKind {
    #[must_use]
    pub const fn provider(self) -> Provider {
        match self {
            Self::Deposit | Self::CashIn | Self::Payment | Self::CashOut | Self::SendMoney => {
                Provider::Bkash
            }
            Self::Credited | Self::Debited | Self::CashWithdrawal | Self::FundTransfer => {
                Provider::Ebl
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::CashIn => "cash_in",
            Self::Payment => "payment",
            Self::CashOut => "cash_out",
            Self::SendMoney => "send_money",
            Self::Credited => "credited",
            Self::Debited => "debited",
            Self::CashWithdrawal => "cash_withdrawal",
            Self::FundTransfer => "fund_transfer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_is_an_involution() {
        assert_eq!(Provider::Bkash.other(), Provider::Ebl);
        assert_eq!(Provider::Ebl.other().other(), Provider::Ebl);
    }

    #[test]
    fn platform_names_parse_back() {
        for provider in [Provider::Bkash, Provider::Ebl] {
            assert_eq!(Provider::try_from(provider.as_str()).unwrap(), provider);
        }
        assert!(Provider::try_from("nagad").is_err());
    }

    #[test]
    fn kinds_belong_to_their_provider() {
        assert_eq!(MessageKind::SendMoney.provider(), Provider::Bkash);
        assert_eq!(MessageKind::CashWithdrawal.provider(), Provider::Ebl);
    }
}
