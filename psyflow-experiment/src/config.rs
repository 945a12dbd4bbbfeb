use std::time::Duration;

/// Session-wide settings, resolved once at startup and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub debug: bool,
    pub mock_backend: bool,
    pub participant_id: String,
    pub session_id: String,
    pub completion_url: String,
    pub completion_code: String,
    /// Task tag the debrief summary is computed over.
    pub response_task: String,
    pub redirect_delay: Duration,
    pub data_display_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debug: false,
            mock_backend: false,
            participant_id: "anonymous".to_string(),
            session_id: uuid::Uuid::new_v4().to_string(),
            completion_url: "https://app.prolific.com/submissions/complete".to_string(),
            completion_code: String::new(),
            response_task: "response".to_string(),
            redirect_delay: Duration::from_secs(3),
            data_display_delay: Duration::from_secs(2),
        }
    }
}

impl SessionConfig {
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_mock_backend(mut self, mock: bool) -> Self {
        self.mock_backend = mock;
        self
    }

    pub fn with_participant(mut self, id: impl Into<String>) -> Self {
        self.participant_id = id.into();
        self
    }

    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = id.into();
        self
    }

    pub fn with_completion(mut self, url: impl Into<String>, code: impl Into<String>) -> Self {
        self.completion_url = url.into();
        self.completion_code = code.into();
        self
    }

    pub fn with_redirect_delay(mut self, d: Duration) -> Self {
        self.redirect_delay = d;
        self
    }

    pub fn with_data_display_delay(mut self, d: Duration) -> Self {
        self.data_display_delay = d;
        self
    }

    /// Completion URL with the completion code appended as `cc`.
    pub fn redirect_url(&self) -> String {
        if self.completion_code.is_empty() {
            return self.completion_url.clone();
        }
        let sep = if self.completion_url.contains('?') { '&' } else { '?' };
        format!("{}{}cc={}", self.completion_url, sep, self.completion_code)
    }

    /// Debug-panel refreshes only make sense against the mock backend.
    pub fn refreshes_debug_panel(&self) -> bool {
        self.debug && self.mock_backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_url_appends_code() {
        let cfg = SessionConfig::default().with_completion("https://x.org/done", "C0DE");
        assert_eq!(cfg.redirect_url(), "https://x.org/done?cc=C0DE");

        let cfg = cfg.with_completion("https://x.org/done?study=4", "C0DE");
        assert_eq!(cfg.redirect_url(), "https://x.org/done?study=4&cc=C0DE");
    }

    #[test]
    fn debug_panel_needs_both_flags() {
        let cfg = SessionConfig::default().with_debug(true);
        assert!(!cfg.refreshes_debug_panel());
        assert!(cfg.with_mock_backend(true).refreshes_debug_panel());
    }

    #[test]
    fn sessions_get_distinct_ids() {
        assert_ne!(
            SessionConfig::default().session_id,
            SessionConfig::default().session_id
        );
    }
}
