use std::fmt;

use psyflow_core::TrialDataEvent;

/// Accuracy and reaction time over the response trials of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebriefSummary {
    pub trials: usize,
    pub correct: usize,
    /// Percent correct, `None` when no response trials were recorded.
    pub accuracy: Option<u32>,
    /// Mean RT over correct trials in ms, `None` without correct trials.
    pub reaction_time_ms: Option<u32>,
}

/// Summarizes the events tagged with `task`.
pub fn summarize(events: &[TrialDataEvent], task: &str) -> DebriefSummary {
    let trials: Vec<_> = events.iter().filter(|e| e.has_task(task)).collect();
    let correct: Vec<_> = trials.iter().filter(|e| e.is_correct()).collect();

    let accuracy = (!trials.is_empty())
        .then(|| (100.0 * correct.len() as f64 / trials.len() as f64).round() as u32);

    let rts: Vec<f64> = correct.iter().filter_map(|e| e.rt_ms).collect();
    let reaction_time_ms =
        (!rts.is_empty()).then(|| (rts.iter().sum::<f64>() / rts.len() as f64).round() as u32);

    DebriefSummary {
        trials: trials.len(),
        correct: correct.len(),
        accuracy,
        reaction_time_ms,
    }
}

impl fmt::Display for DebriefSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.accuracy {
            Some(a) => write!(f, "You responded correctly on {a}% of the trials.")?,
            None => write!(f, "Accuracy: N/A.")?,
        }
        match self.reaction_time_ms {
            Some(rt) => write!(f, " Your average response time was {rt}ms."),
            None => write!(f, " Average response time: N/A."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(task: &str, correct: bool, rt: f64) -> TrialDataEvent {
        TrialDataEvent {
            trial_index: 0,
            trial_name: "t".into(),
            task: Some(task.into()),
            stimulus_kind: "text".into(),
            block: None,
            response: Some("f".into()),
            correct: Some(correct),
            rt_ms: Some(rt),
            time_elapsed_ms: 0,
            save_incrementally: true,
            data: Default::default(),
        }
    }

    #[test]
    fn accuracy_and_mean_rt_over_correct_trials() {
        let events = vec![
            ev("response", true, 500.0),
            ev("response", false, 700.0),
            ev("response", true, 300.0),
        ];
        let s = summarize(&events, "response");
        assert_eq!(s.accuracy, Some(67));
        assert_eq!(s.reaction_time_ms, Some(400));
        assert_eq!((s.trials, s.correct), (3, 2));
    }

    #[test]
    fn other_tasks_are_ignored() {
        let events = vec![ev("fixation", true, 1.0), ev("response", false, 600.0)];
        let s = summarize(&events, "response");
        assert_eq!(s.trials, 1);
        assert_eq!(s.accuracy, Some(0));
        assert_eq!(s.reaction_time_ms, None);
    }

    #[test]
    fn no_response_trials_reports_na() {
        let s = summarize(&[ev("fixation", true, 1.0)], "response");
        assert_eq!(s.accuracy, None);
        assert_eq!(s.reaction_time_ms, None);
        assert_eq!(
            s.to_string(),
            "Accuracy: N/A. Average response time: N/A."
        );
    }

    #[test]
    fn summary_is_stable_across_calls() {
        let events = vec![ev("response", true, 451.0), ev("response", true, 452.0)];
        assert_eq!(summarize(&events, "response"), summarize(&events, "response"));
        assert_eq!(summarize(&events, "response").reaction_time_ms, Some(452));
    }
}
