use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConstructionError;
use crate::stimulus::StimulusType;

/// Declarative description of one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialDescriptor {
    pub name: String,
    pub stimulus: StimulusType,
    /// `None` waits for a response indefinitely.
    pub duration_ms: Option<u64>,
    /// Accepted keys. Empty means the unit takes no response.
    pub choices: Vec<String>,
    pub correct_response: Option<String>,
    /// Task category tag, e.g. `"response"` or `"fixation"`.
    pub task: Option<String>,
    pub save_incrementally: bool,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl TrialDescriptor {
    pub fn new(name: impl Into<String>, stimulus: StimulusType) -> Self {
        Self {
            name: name.into(),
            stimulus,
            duration_ms: None,
            choices: Vec::new(),
            correct_response: None,
            task: None,
            save_incrementally: false,
            data: Map::new(),
        }
    }

    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_correct_response(mut self, key: impl Into<String>) -> Self {
        self.correct_response = Some(key.into());
        self
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    pub fn save_incrementally(mut self, yes: bool) -> Self {
        self.save_incrementally = yes;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn accepts_response(&self) -> bool {
        !self.choices.is_empty()
    }

    /// Compares a response against the correct-response key. `None` when the
    /// trial has no key or nothing was pressed.
    /// `None` only for units without a key. A missing response against a
    /// key scores as incorrect.
    pub fn score(&self, response: Option<&str>) -> Option<bool> {
        let key = self.correct_response.as_deref()?;
        Some(response.is_some_and(|r| r.eq_ignore_ascii_case(key)))
    }

    pub fn validate(&self) -> Result<(), ConstructionError> {
        if self.name.trim().is_empty() {
            return Err(ConstructionError::malformed("<unnamed>", "trial name is empty"));
        }
        self.stimulus.validate(&self.name)?;
        if !self.accepts_response() && self.duration_ms.is_none() {
            return Err(ConstructionError::malformed(
                &self.name,
                "a trial without choices needs a duration",
            ));
        }
        if let Some(key) = &self.correct_response {
            if !self.choices.iter().any(|c| c.eq_ignore_ascii_case(key)) {
                return Err(ConstructionError::malformed(
                    &self.name,
                    format!("correct response '{key}' is not among the choices"),
                ));
            }
        }
        Ok(())
    }
}

/// Data produced by one completed unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialDataEvent {
    pub trial_index: usize,
    pub trial_name: String,
    pub task: Option<String>,
    pub stimulus_kind: String,
    pub block: Option<String>,
    pub response: Option<String>,
    pub correct: Option<bool>,
    pub rt_ms: Option<f64>,
    pub time_elapsed_ms: u64,
    pub save_incrementally: bool,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl TrialDataEvent {
    pub fn has_task(&self, task: &str) -> bool {
        self.task.as_deref() == Some(task)
    }

    pub fn is_correct(&self) -> bool {
        self.correct == Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_trial() -> TrialDescriptor {
        TrialDescriptor::new("arrow_left", StimulusType::text("<"))
            .with_choices(["f", "j"])
            .with_correct_response("f")
            .with_task("response")
    }

    #[test]
    fn score_compares_against_key() {
        let t = response_trial();
        assert_eq!(t.score(Some("f")), Some(true));
        assert_eq!(t.score(Some("F")), Some(true));
        assert_eq!(t.score(Some("j")), Some(false));
    }

    #[test]
    fn timed_out_keyed_trial_is_incorrect() {
        let t = response_trial();
        assert_eq!(t.score(None), Some(false));
    }

    #[test]
    fn score_without_key_is_none() {
        let t = TrialDescriptor::new("welcome", StimulusType::text("hi")).with_choices([" "]);
        assert_eq!(t.score(Some(" ")), None);
    }

    #[test]
    fn key_outside_choices_is_malformed() {
        let t = response_trial().with_correct_response("k");
        assert!(matches!(
            t.validate(),
            Err(ConstructionError::MalformedDescriptor { .. })
        ));
    }

    #[test]
    fn passive_unit_needs_duration() {
        let isi = TrialDescriptor::new("isi", StimulusType::fixation());
        assert!(isi.validate().is_err());
        assert!(isi.with_duration_ms(500).validate().is_ok());
    }
}
