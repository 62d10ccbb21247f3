//! Running balances and expense counters.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{CategorizedTransaction, Money, Provider, TransactionType};

/// Snapshot of balances and expense totals, as stored alongside each row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateState {
    pub balance_bkash: Money,
    pub balance_ebl: Money,
    /// Always `balance_bkash + balance_ebl`.
    pub total: Money,
    pub today_expense: Money,
    pub month_expense: Money,
    /// Local date the expense counters were last advanced.
    pub expense_day: Option<NaiveDate>,
}

impl AggregateState {
    /// Builds a snapshot, deriving `total` from the two balances.
    pub fn new(
        balance_bkash: Money,
        balance_ebl: Money,
        today_expense: Money,
        month_expense: Money,
        expense_day: Option<NaiveDate>,
    ) -> Self {
        Self {
            balance_bkash,
            balance_ebl,
            total: balance_bkash + balance_ebl,
            today_expense,
            month_expense,
            expense_day,
        }
    }

    /// Computes the next snapshot after `t`.
    ///
    /// The provider's own message is authoritative for its balance, so the
    /// balance is overwritten, never recomputed from deltas.
    #[must_use]
    pub fn apply(&self, t: &CategorizedTransaction) -> AggregateState {
        let mut next = *self;
        match t.provider {
            Provider::Bkash => next.balance_bkash = t.balance_after,
            Provider::Ebl => next.balance_ebl = t.balance_after,
        }
        next.total = next.balance_bkash + next.balance_ebl;

        if t.transaction_type == TransactionType::Expense {
            next.add_expense(t.occurred_at.date_naive(), t.outflow());
        }

        next
    }

    fn add_expense(&mut self, day: NaiveDate, outflow: Money) {
        match self.expense_day {
            None => {
                self.today_expense = outflow;
                self.month_expense = outflow;
                self.expense_day = Some(day);
            }
            Some(stored) if day == stored => {
                self.today_expense += outflow;
                self.month_expense += outflow;
            }
            Some(stored) if day > stored => {
                self.today_expense = outflow;
                if same_month(day, stored) {
                    self.month_expense += outflow;
                } else {
                    self.month_expense = outflow;
                }
                self.expense_day = Some(day);
            }
            Some(stored) => {
                // Late message from an earlier day: today's counter is not its day.
                if same_month(day, stored) {
                    self.month_expense += outflow;
                }
            }
        }
    }
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Applies `t` to `state`. Free-function form of [`AggregateState::apply`].
pub fn apply(state: &AggregateState, t: &CategorizedTransaction) -> AggregateState {
    state.apply(t)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone};
    use chrono_tz::Tz;

    use super::*;
    use crate::{MessageKind, ParsedTransaction, TimestampSource};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        chrono_tz::Asia::Dhaka
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
    }

    fn tx(
        kind: MessageKind,
        transaction_type: TransactionType,
        amount: i64,
        fee: i64,
        balance: i64,
        when: DateTime<Tz>,
    ) -> CategorizedTransaction {
        CategorizedTransaction {
            parsed: ParsedTransaction {
                provider: kind.provider(),
                kind,
                amount: Money::from_minor(amount),
                fee: Money::from_minor(fee),
                balance_after: Money::from_minor(balance),
                counterparty: None,
                description: String::new(),
                transaction_id: None,
                occurred_at: when,
                occurred_at_source: TimestampSource::Message,
                raw_message: String::new(),
            },
            transaction_type,
        }
    }

    fn expense(amount: i64, when: DateTime<Tz>) -> CategorizedTransaction {
        tx(MessageKind::Payment, TransactionType::Expense, amount, 0, 1_000, when)
    }

    #[test]
    fn balance_is_overwritten_and_total_recomputed() {
        let state = AggregateState::new(
            Money::from_minor(500),
            Money::from_minor(9_000),
            Money::ZERO,
            Money::ZERO,
            None,
        );
        let t = tx(
            MessageKind::Credited,
            TransactionType::Income,
            1_000,
            0,
            10_000,
            at(2025, 8, 7, 10, 0),
        );
        let next = state.apply(&t);
        assert_eq!(next.balance_ebl.minor(), 10_000);
        assert_eq!(next.balance_bkash.minor(), 500);
        assert_eq!(next.total.minor(), 10_500);
        assert_eq!(next.today_expense, Money::ZERO);
        assert_eq!(next.expense_day, None);
    }

    #[test]
    fn total_invariant_holds_over_a_sequence() {
        let sequence = [
            tx(
                MessageKind::Deposit,
                TransactionType::Income,
                1,
                0,
                102_294,
                at(2025, 8, 6, 9, 11),
            ),
            tx(
                MessageKind::Debited,
                TransactionType::Transfer,
                1,
                0,
                1_234_567,
                at(2025, 8, 7, 22, 2),
            ),
            tx(
                MessageKind::Payment,
                TransactionType::Expense,
                25_000,
                0,
                77_294,
                at(2025, 8, 7, 23, 0),
            ),
            tx(
                MessageKind::CashWithdrawal,
                TransactionType::Expense,
                200_000,
                0,
                1_034_567,
                at(2025, 8, 8, 0, 5),
            ),
        ];
        let mut state = AggregateState::default();
        for t in &sequence {
            state = apply(&state, t);
            assert_eq!(state.total, state.balance_bkash + state.balance_ebl);
        }
        assert_eq!(state.total.minor(), 77_294 + 1_034_567);
    }

    #[test]
    fn expense_adds_amount_and_fee() {
        let t = tx(
            MessageKind::CashOut,
            TransactionType::Expense,
            100_000,
            1_850,
            0,
            at(2025, 8, 8, 11, 0),
        );
        let next = AggregateState::default().apply(&t);
        assert_eq!(next.today_expense.minor(), 101_850);
        assert_eq!(next.month_expense.minor(), 101_850);
        assert_eq!(next.expense_day, NaiveDate::from_ymd_opt(2025, 8, 8));
    }

    #[test]
    fn same_day_expenses_accumulate() {
        let state = AggregateState::default()
            .apply(&expense(1_000, at(2025, 8, 8, 9, 0)))
            .apply(&expense(2_000, at(2025, 8, 8, 21, 0)));
        assert_eq!(state.today_expense.minor(), 3_000);
        assert_eq!(state.month_expense.minor(), 3_000);
    }

    #[test]
    fn first_moment_of_new_day_resets_daily_only() {
        let state = AggregateState::default()
            .apply(&expense(1_000, at(2025, 8, 8, 23, 59)))
            .apply(&expense(2_000, at(2025, 8, 9, 0, 0)));
        assert_eq!(state.today_expense.minor(), 2_000);
        assert_eq!(state.month_expense.minor(), 3_000);
        assert_eq!(state.expense_day, NaiveDate::from_ymd_opt(2025, 8, 9));
    }

    #[test]
    fn day_boundary_uses_configured_timezone() {
        // 18:30 UTC on the 8th is 00:30 on the 9th in Dhaka (UTC+6).
        let late_utc = chrono::Utc
            .with_ymd_and_hms(2025, 8, 8, 18, 30, 0)
            .unwrap()
            .with_timezone(&chrono_tz::Asia::Dhaka);
        let state = AggregateState::default()
            .apply(&expense(1_000, at(2025, 8, 8, 12, 0)))
            .apply(&expense(2_000, late_utc));
        assert_eq!(state.today_expense.minor(), 2_000);
    }

    #[test]
    fn new_month_resets_both_counters() {
        let state = AggregateState::default()
            .apply(&expense(1_000, at(2025, 8, 31, 23, 59)))
            .apply(&expense(2_000, at(2025, 9, 1, 0, 0)));
        assert_eq!(state.today_expense.minor(), 2_000);
        assert_eq!(state.month_expense.minor(), 2_000);
    }

    #[test]
    fn same_month_different_year_resets_month() {
        let state = AggregateState::default()
            .apply(&expense(1_000, at(2024, 9, 15, 10, 0)))
            .apply(&expense(2_000, at(2025, 9, 15, 10, 0)));
        assert_eq!(state.month_expense.minor(), 2_000);
    }

    #[test]
    fn late_message_from_earlier_day() {
        let state = AggregateState::default()
            .apply(&expense(1_000, at(2025, 8, 9, 10, 0)))
            .apply(&expense(500, at(2025, 8, 8, 10, 0)))
            .apply(&expense(700, at(2025, 7, 31, 10, 0)));
        assert_eq!(state.today_expense.minor(), 1_000);
        assert_eq!(state.month_expense.minor(), 1_500);
        assert_eq!(state.expense_day, NaiveDate::from_ymd_opt(2025, 8, 9));
    }

    #[test]
    fn transfer_and_income_never_touch_counters() {
        let before = AggregateState::default().apply(&expense(1_000, at(2025, 8, 8, 10, 0)));
        let transfer = tx(
            MessageKind::Debited,
            TransactionType::Transfer,
            5_000,
            0,
            7_000,
            at(2025, 8, 9, 10, 0),
        );
        let income = tx(
            MessageKind::CashIn,
            TransactionType::Income,
            5_000,
            0,
            6_000,
            at(2025, 9, 1, 10, 0),
        );

        let after = before.apply(&transfer).apply(&income);
        assert_eq!(after.today_expense, before.today_expense);
        assert_eq!(after.month_expense, before.month_expense);
        assert_eq!(after.expense_day, before.expense_day);
        assert_eq!(after.balance_ebl.minor(), 7_000);
        assert_eq!(after.balance_bkash.minor(), 6_000);
    }
}
