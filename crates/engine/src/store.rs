//! Boundary to the system of record.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{AggregateState, LedgerRow, StoreError};

/// External ledger the engine reads snapshots from and appends rows to.
///
/// Implementations only move data; they never compute aggregates.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Latest aggregate snapshot, or the default (all zero) for an empty ledger.
    async fn read_latest_aggregate(&self) -> Result<AggregateState, StoreError>;

    /// Appends `row` together with the snapshot computed after it.
    async fn append_row_and_write_aggregate(
        &self,
        row: &LedgerRow,
        new_state: &AggregateState,
    ) -> Result<(), StoreError>;

    /// Makes sure the ledger carries its header row.
    async fn ensure_headers(&self) -> Result<(), StoreError>;
}

/// In-process ledger, used when no spreadsheet is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<(LedgerRow, AggregateState)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every appended row, oldest first.
    pub async fn rows(&self) -> Vec<(LedgerRow, AggregateState)> {
        self.rows.lock().await.clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn read_latest_aggregate(&self) -> Result<AggregateState, StoreError> {
        Ok(self
            .rows
            .lock()
            .await
            .last()
            .map(|(_, state)| *state)
            .unwrap_or_default())
    }

    async fn append_row_and_write_aggregate(
        &self,
        row: &LedgerRow,
        new_state: &AggregateState,
    ) -> Result<(), StoreError> {
        self.rows.lock().await.push((row.clone(), *new_state));
        Ok(())
    }

    async fn ensure_headers(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
