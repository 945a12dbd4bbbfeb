use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use psyflow_core::{Record, SaveError};
use tokio::sync::RwLock;

use crate::adapter::PersistenceAdapter;

/// In-process store. Backs mock mode and the test suites.
#[derive(Debug, Default)]
pub struct MemoryStore {
    partial: RwLock<Vec<Record>>,
    complete: RwLock<Vec<Vec<Record>>>,
    fail_partial: AtomicBool,
    fail_complete: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `save_partial` reject.
    pub fn failing_partial(self) -> Self {
        self.fail_partial.store(true, Ordering::SeqCst);
        self
    }

    /// Makes every `save_complete` reject.
    pub fn failing_complete(self) -> Self {
        self.fail_complete.store(true, Ordering::SeqCst);
        self
    }

    pub async fn partial_calls(&self) -> usize {
        self.partial.read().await.len()
    }

    pub async fn partial_records(&self) -> Vec<Record> {
        self.partial.read().await.clone()
    }

    pub async fn complete_calls(&self) -> usize {
        self.complete.read().await.len()
    }

    /// Batches passed to `save_complete`, in call order.
    pub async fn complete_batches(&self) -> Vec<Vec<Record>> {
        self.complete.read().await.clone()
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn save_partial(&self, record: Record) -> Result<(), SaveError> {
        // calls are counted whether or not they succeed
        self.partial.write().await.push(record);
        if self.fail_partial.load(Ordering::SeqCst) {
            return Err(SaveError::Rejected("partial saves disabled".into()));
        }
        Ok(())
    }

    async fn save_complete(&self, records: Vec<Record>) -> Result<(), SaveError> {
        self.complete.write().await.push(records);
        if self.fail_complete.load(Ordering::SeqCst) {
            return Err(SaveError::Rejected("complete saves disabled".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psyflow_core::TrialDataEvent;
    use serde_json::Map;

    fn record(i: usize) -> Record {
        Record::new(
            "p",
            "s",
            TrialDataEvent {
                trial_index: i,
                trial_name: format!("t{i}"),
                task: None,
                stimulus_kind: "text".into(),
                block: None,
                response: None,
                correct: None,
                rt_ms: None,
                time_elapsed_ms: 0,
                save_incrementally: true,
                data: Map::new(),
            },
        )
    }

    #[tokio::test]
    async fn records_every_call() {
        let store = MemoryStore::new();
        store.save_partial(record(0)).await.unwrap();
        store.save_partial(record(1)).await.unwrap();
        store.save_complete(vec![record(0), record(1)]).await.unwrap();

        assert_eq!(store.partial_calls().await, 2);
        assert_eq!(store.complete_calls().await, 1);
        assert_eq!(store.complete_batches().await[0].len(), 2);
    }

    #[tokio::test]
    async fn failing_store_still_counts_calls() {
        let store = MemoryStore::new().failing_partial().failing_complete();
        assert!(store.save_partial(record(0)).await.is_err());
        assert!(store.save_complete(vec![]).await.is_err());
        assert_eq!(store.partial_calls().await, 1);
        assert_eq!(store.complete_calls().await, 1);
    }
}
