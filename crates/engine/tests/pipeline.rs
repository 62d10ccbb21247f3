use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use engine::{
    AggregateState, Engine, EngineError, FailureReason, LedgerRow, LedgerStore, MemoryStore,
    Money, Outcome, Provider, RawMessage, SelfAccounts, StoreError, TransactionType,
};

const DEPOSIT: &str = "You have received deposit of Tk 1,000.00 from VISA Card. Fee Tk 0.00. Balance Tk 1,022.94. TrxID CH68AABJH6 at 06/08/2025 09:11";
const EBL_TO_BKASH: &str = "AC 1234***5678 is debited with BDT 5,000.00 as Transfer to bKash on 07-AUG-25 10:02:47 PM Balance is BDT 12,345.67";

fn payment(amount: &str, balance: &str, at: &str) -> String {
    format!(
        "Payment Tk {amount} to 01812345678 successful. Fee Tk 0.00. Balance Tk {balance}. TrxID PAY{} at {at}",
        amount.replace([',', '.'], "")
    )
}

fn engine_with_store(self_accounts: SelfAccounts) -> (Engine, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::builder()
        .timezone(chrono_tz::Asia::Dhaka)
        .self_accounts(self_accounts)
        .store(store.clone())
        .build()
        .unwrap();
    (engine, store)
}

fn owner_accounts() -> SelfAccounts {
    SelfAccounts {
        bkash: vec!["bKash".to_string()],
        ebl: vec!["VISA Card".to_string()],
    }
}

#[tokio::test]
async fn deposit_is_recorded_as_income() {
    let (engine, store) = engine_with_store(SelfAccounts::default());

    let outcome = engine.process(&RawMessage::new(DEPOSIT)).await.unwrap();
    let Outcome::Recorded {
        transaction,
        aggregate,
    } = outcome
    else {
        panic!("deposit should be recorded");
    };

    assert_eq!(transaction.provider, Provider::Bkash);
    assert_eq!(transaction.transaction_type, TransactionType::Income);
    assert_eq!(transaction.amount.minor(), 100_000);
    assert_eq!(transaction.fee, Money::ZERO);
    assert_eq!(transaction.balance_after.minor(), 102_294);
    assert_eq!(transaction.transaction_id.as_deref(), Some("CH68AABJH6"));
    assert_eq!(aggregate.balance_bkash.minor(), 102_294);
    assert_eq!(aggregate.total.minor(), 102_294);
    assert_eq!(aggregate.today_expense, Money::ZERO);

    let rows = store.rows().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0.date, NaiveDate::from_ymd_opt(2025, 8, 6).unwrap());
}

#[tokio::test]
async fn unrecognised_message_is_ignored_and_not_written() {
    let (engine, store) = engine_with_store(SelfAccounts::default());

    let outcome = engine
        .process(&RawMessage::new("Your OTP is 482913. Do not share it."))
        .await
        .unwrap();

    match outcome {
        Outcome::Ignored(failure) => {
            assert_eq!(failure.reason, FailureReason::NoTemplateMatch);
            assert_eq!(failure.raw_message, "Your OTP is 482913. Do not share it.");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(store.rows().await.is_empty());
}

#[tokio::test]
async fn own_transfers_keep_expense_counters() {
    let (engine, _store) = engine_with_store(owner_accounts());

    engine
        .process(&RawMessage::new(payment("100.00", "900.00", "07/08/2025 09:00")))
        .await
        .unwrap();

    let Outcome::Recorded {
        transaction,
        aggregate,
    } = engine
        .process(&RawMessage::new(EBL_TO_BKASH))
        .await
        .unwrap()
    else {
        panic!("transfer should be recorded");
    };

    assert_eq!(transaction.transaction_type, TransactionType::Transfer);
    assert_eq!(aggregate.today_expense.minor(), 10_000);
    assert_eq!(aggregate.month_expense.minor(), 10_000);
    assert_eq!(aggregate.balance_ebl.minor(), 1_234_567);
    assert_eq!(aggregate.balance_bkash.minor(), 90_000);
    assert_eq!(aggregate.total.minor(), 1_234_567 + 90_000);
}

#[tokio::test]
async fn expenses_roll_over_at_local_midnight() {
    let (engine, _store) = engine_with_store(SelfAccounts::default());

    for (amount, balance, at) in [
        ("100.00", "900.00", "07/08/2025 23:59"),
        ("50.00", "850.00", "08/08/2025 00:00"),
        ("25.00", "825.00", "08/08/2025 12:00"),
    ] {
        engine
            .process(&RawMessage::new(payment(amount, balance, at)))
            .await
            .unwrap();
    }

    let state = engine.balances().await.unwrap();
    assert_eq!(state.today_expense.minor(), 7_500);
    assert_eq!(state.month_expense.minor(), 17_500);
    assert_eq!(state.expense_day, NaiveDate::from_ymd_opt(2025, 8, 8));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_expenses_all_accumulate() {
    let (engine, store) = engine_with_store(SelfAccounts::default());
    let engine = Arc::new(engine);

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..32 {
        let engine = engine.clone();
        tasks.spawn(async move {
            let text = payment("10.00", &format!("{}.00", 1_000 - i), "09/08/2025 10:00");
            engine.process(&RawMessage::new(text)).await
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    let state = engine.balances().await.unwrap();
    assert_eq!(state.today_expense.minor(), 32 * 1_000);
    assert_eq!(state.month_expense.minor(), 32 * 1_000);
    assert_eq!(store.rows().await.len(), 32);
}

struct BrokenStore;

#[async_trait]
impl LedgerStore for BrokenStore {
    async fn read_latest_aggregate(&self) -> Result<AggregateState, StoreError> {
        Err(StoreError::Unavailable("sheet offline".to_string()))
    }

    async fn append_row_and_write_aggregate(
        &self,
        _row: &LedgerRow,
        _new_state: &AggregateState,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("sheet offline".to_string()))
    }

    async fn ensure_headers(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("sheet offline".to_string()))
    }
}

#[tokio::test]
async fn store_failures_surface_as_errors() {
    let engine = Engine::builder()
        .store(Arc::new(BrokenStore))
        .build()
        .unwrap();

    let err = engine.process(&RawMessage::new(DEPOSIT)).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::Store(StoreError::Unavailable("sheet offline".to_string()))
    );

    // Parse failures never reach the store.
    let outcome = engine.process(&RawMessage::new("hello")).await.unwrap();
    assert!(matches!(outcome, Outcome::Ignored(_)));
}
