use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::trial::TrialDataEvent;

/// Persisted form of a [`TrialDataEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub participant_id: String,
    pub session_id: String,
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: TrialDataEvent,
}

impl Record {
    pub fn new(participant_id: &str, session_id: &str, event: TrialDataEvent) -> Self {
        Self {
            participant_id: participant_id.to_string(),
            session_id: session_id.to_string(),
            recorded_at: Utc::now(),
            event,
        }
    }
}

/// Every event of a session, in completion order. Append-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CollectedDataSet {
    events: Vec<TrialDataEvent>,
}

impl CollectedDataSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            events: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, event: TrialDataEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[TrialDataEvent] {
        &self.events
    }

    pub fn last(&self) -> Option<&TrialDataEvent> {
        self.events.last()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn to_records(&self, participant_id: &str, session_id: &str) -> Vec<Record> {
        self.events
            .iter()
            .cloned()
            .map(|e| Record::new(participant_id, session_id, e))
            .collect()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.events)
    }
}

impl FromIterator<TrialDataEvent> for CollectedDataSet {
    fn from_iter<I: IntoIterator<Item = TrialDataEvent>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}
