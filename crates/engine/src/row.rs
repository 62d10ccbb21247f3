//! Fixed-order spreadsheet row.
//!
//! Columns A..J describe the transaction, K is a blank separator and L..Q
//! carry the aggregate snapshot computed after that transaction. The summary
//! block of the last row is therefore the latest aggregate.

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::{
    AggregateState, CategorizedTransaction, EngineError, Money, Provider, ResultEngine,
    TransactionType,
};

pub const HEADERS: [&str; COLUMN_COUNT] = [
    "Date",
    "Time",
    "Platform",
    "Transaction Type",
    "Transaction Amount",
    "Balance After",
    "Description",
    "Fee",
    "Transaction ID",
    "Raw Message",
    "",
    "Current Amount in EBL",
    "Current Amount in bKash",
    "Current Total Amount",
    "Today's Expense",
    "Monthly Expense",
    "Expense Day",
];

pub const COLUMN_COUNT: usize = 17;

/// Index of the first summary column.
pub const SUMMARY_START: usize = 11;

/// Spreadsheet column letter of the first summary column (L).
pub const SUMMARY_COLUMN: char = 'L';

/// Spreadsheet column letter of the last column (Q).
pub const LAST_COLUMN: char = 'Q';

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Transaction half of a sheet row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub platform: Provider,
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub balance_after: Money,
    pub description: String,
    pub fee: Money,
    pub transaction_id: Option<String>,
    pub raw_message: String,
}

impl From<&CategorizedTransaction> for LedgerRow {
    fn from(t: &CategorizedTransaction) -> Self {
        let local = t.occurred_at.naive_local();
        let time = NaiveTime::from_hms_opt(local.hour(), local.minute(), local.second())
            .unwrap_or_default();
        Self {
            date: local.date(),
            time,
            platform: t.provider,
            transaction_type: t.transaction_type,
            amount: t.amount,
            balance_after: t.balance_after,
            description: t.description.clone(),
            fee: t.fee,
            transaction_id: t.transaction_id.clone(),
            raw_message: t.raw_message.clone(),
        }
    }
}

impl LedgerRow {
    /// Encodes the row plus the snapshot into the 17 sheet cells.
    pub fn to_cells(&self, state: &AggregateState) -> Vec<String> {
        let mut cells = vec![
            self.date.format(DATE_FORMAT).to_string(),
            self.time.format(TIME_FORMAT).to_string(),
            self.platform.as_str().to_string(),
            self.transaction_type.as_str().to_string(),
            self.amount.to_string(),
            self.balance_after.to_string(),
            self.description.clone(),
            self.fee.to_string(),
            self.transaction_id.clone().unwrap_or_default(),
            self.raw_message.clone(),
            String::new(),
        ];
        cells.extend(summary_to_cells(state));
        cells
    }

    /// Decodes cells written by [`LedgerRow::to_cells`].
    pub fn from_cells(cells: &[String]) -> ResultEngine<(LedgerRow, AggregateState)> {
        let cell = |idx: usize| cells.get(idx).map(|c| c.trim()).unwrap_or("");
        let money = |idx: usize| -> ResultEngine<Money> { cell(idx).parse() };

        let date = NaiveDate::parse_from_str(cell(0), DATE_FORMAT)
            .map_err(|err| EngineError::InvalidRow(format!("date {:?}: {err}", cell(0))))?;
        let time = NaiveTime::parse_from_str(cell(1), TIME_FORMAT)
            .map_err(|err| EngineError::InvalidRow(format!("time {:?}: {err}", cell(1))))?;

        let row = LedgerRow {
            date,
            time,
            platform: Provider::try_from(cell(2))?,
            transaction_type: TransactionType::try_from(cell(3))?,
            amount: money(4)?,
            balance_after: money(5)?,
            description: cells.get(6).cloned().unwrap_or_default(),
            fee: money(7)?,
            transaction_id: Some(cell(8).to_string()).filter(|id| !id.is_empty()),
            raw_message: cells.get(9).cloned().unwrap_or_default(),
        };

        Ok((row, summary_from_cells(cells)?))
    }
}

pub fn summary_to_cells(state: &AggregateState) -> [String; COLUMN_COUNT - SUMMARY_START] {
    [
        state.balance_ebl.to_string(),
        state.balance_bkash.to_string(),
        state.total.to_string(),
        state.today_expense.to_string(),
        state.month_expense.to_string(),
        state
            .expense_day
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default(),
    ]
}

/// Reads the summary block (L..Q) of a full row. Empty cells read as zero.
pub fn summary_from_cells(cells: &[String]) -> ResultEngine<AggregateState> {
    summary_from_block(cells.get(SUMMARY_START..).unwrap_or_default())
}

/// Reads a summary block on its own, as returned for an `L:Q` range.
///
/// `total` is recomputed from the balances rather than trusted.
pub fn summary_from_block(block: &[String]) -> ResultEngine<AggregateState> {
    let cell = |offset: usize| block.get(offset).map(|c| c.trim()).unwrap_or("");
    let money = |offset: usize| -> ResultEngine<Money> {
        match cell(offset) {
            "" => Ok(Money::ZERO),
            raw => raw.parse(),
        }
    };

    let expense_day = match cell(5) {
        "" => None,
        raw => Some(
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .map_err(|err| EngineError::InvalidRow(format!("expense day {raw:?}: {err}")))?,
        ),
    };

    Ok(AggregateState::new(
        money(1)?,
        money(0)?,
        money(3)?,
        money(4)?,
        expense_day,
    ))
}
