use std::path::{Path, PathBuf};

use async_trait::async_trait;
use psyflow_core::{Record, SaveError};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::adapter::PersistenceAdapter;

/// Writes a session to disk: partial records as JSON lines, the final set
/// as one pretty-printed JSON array.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    session_id: String,
    // serializes appends so lines never interleave
    append_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            session_id: session_id.into(),
            append_lock: Mutex::new(()),
        }
    }

    pub fn partial_path(&self) -> PathBuf {
        self.dir.join(format!("{}.partial.jsonl", self.session_id))
    }

    pub fn complete_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.session_id))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl PersistenceAdapter for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn save_partial(&self, record: Record) -> Result<(), SaveError> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let _guard = self.append_lock.lock().await;
        fs::create_dir_all(&self.dir).await?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.partial_path())
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        debug!(trial = record.event.trial_index, "appended partial record");
        Ok(())
    }

    async fn save_complete(&self, records: Vec<Record>) -> Result<(), SaveError> {
        let body = serde_json::to_vec_pretty(&records)?;
        fs::create_dir_all(&self.dir).await?;

        // write-then-rename so a crash never leaves half a file behind
        let target = self.complete_path();
        let tmp = target.with_extension("json.tmp");
        fs::write(&tmp, body).await?;
        fs::rename(&tmp, &target).await?;
        debug!(count = records.len(), path = %target.display(), "wrote session file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psyflow_core::TrialDataEvent;
    use serde_json::{Map, Value};

    fn record(i: usize) -> Record {
        Record::new(
            "p-1",
            "sess",
            TrialDataEvent {
                trial_index: i,
                trial_name: format!("t{i}"),
                task: Some("response".into()),
                stimulus_kind: "text".into(),
                block: Some("test".into()),
                response: Some("f".into()),
                correct: Some(i % 2 == 0),
                rt_ms: Some(350.0),
                time_elapsed_ms: 10,
                save_incrementally: true,
                data: Map::new(),
            },
        )
    }

    #[tokio::test]
    async fn partial_saves_append_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), "sess");
        store.save_partial(record(0)).await.unwrap();
        store.save_partial(record(1)).await.unwrap();

        let text = tokio::fs::read_to_string(store.partial_path()).await.unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["trial_index"], 1);
    }

    #[tokio::test]
    async fn complete_save_writes_array() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"), "sess");
        store
            .save_complete(vec![record(0), record(1), record(2)])
            .await
            .unwrap();

        let text = tokio::fs::read_to_string(store.complete_path()).await.unwrap();
        let back: Vec<Record> = serde_json::from_str(&text).unwrap();
        assert_eq!(back.len(), 3);
        assert_eq!(back[2].event.trial_name, "t2");
    }
}
