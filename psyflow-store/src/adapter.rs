use async_trait::async_trait;
use psyflow_core::{Record, SaveError};

/// Remote store for session records.
///
/// Implementations must tolerate overlapping `save_partial` calls for
/// distinct records; no ordering between them is implied.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Stores one record mid-session.
    async fn save_partial(&self, record: Record) -> Result<(), SaveError>;

    /// Stores the consolidated session. One outcome for the whole batch.
    async fn save_complete(&self, records: Vec<Record>) -> Result<(), SaveError>;
}
