use serde::{Deserialize, Serialize};

/// Lifecycle of one experiment session.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Finishing,
    Completed,
    Failed,
}

impl SessionState {
    /// States the session may move to from `self`.
    pub fn successors(&self) -> &'static [SessionState] {
        use SessionState::*;
        match self {
            Idle => &[Running],
            Running => &[Finishing],
            Finishing => &[Completed, Failed],
            Completed | Failed => &[],
        }
    }

    pub fn can_transition_to(&self, next: SessionState) -> bool {
        self.successors().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// True while units are being presented.
    pub fn allows_units(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Result of the final save. Only drives which terminal screen is shown.
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Saved,
    SaveFailed,
}

impl SessionOutcome {
    pub fn terminal_state(&self) -> SessionState {
        match self {
            SessionOutcome::Saved => SessionState::Completed,
            SessionOutcome::SaveFailed => SessionState::Failed,
        }
    }
}
