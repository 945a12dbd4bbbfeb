use std::sync::Arc;

use psyflow_core::{
    CollectedDataSet, Record, SaveError, SessionOutcome, SessionState, TrialDataEvent,
};
use psyflow_store::PersistenceAdapter;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::debrief::{summarize, DebriefSummary};
use crate::engine::{self, EngineError, EngineHooks, RenderingEngine};
use crate::timeline::Timeline;
use crate::view::{Screen, SessionView};

/// Development-only callback fired after a successful incremental save.
pub type DebugPanelRefresh = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("cannot move session from {from:?} to {to:?}")]
    InvalidTransition { from: SessionState, to: SessionState },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Drives one session: timeline through the engine, every event through
/// the incremental save, the whole data set through the final save, then
/// one of the terminal screens.
pub struct ExperimentRunner<V: SessionView> {
    config: SessionConfig,
    store: Arc<dyn PersistenceAdapter>,
    view: V,
    state: SessionState,
    debug_refresh: Option<DebugPanelRefresh>,
    in_flight: Vec<JoinHandle<()>>,
    final_save: Option<JoinHandle<Result<(), SaveError>>>,
    events_seen: usize,
    abandoned: usize,
    summary: Option<DebriefSummary>,
}

impl<V: SessionView> ExperimentRunner<V> {
    pub fn new(config: SessionConfig, store: Arc<dyn PersistenceAdapter>, view: V) -> Self {
        Self {
            config,
            store,
            view,
            state: SessionState::Idle,
            debug_refresh: None,
            in_flight: Vec::new(),
            final_save: None,
            events_seen: 0,
            abandoned: 0,
            summary: None,
        }
    }

    /// Registers the debug-panel refresh. Only fired when both `debug` and
    /// `mock_backend` are set.
    pub fn on_debug_refresh(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.debug_refresh = Some(Arc::new(f));
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }

    /// Events received through `on_data_update` so far.
    pub fn events_seen(&self) -> usize {
        self.events_seen
    }

    /// Summary computed when the session reached `Finishing`.
    pub fn summary(&self) -> Option<&DebriefSummary> {
        self.summary.as_ref()
    }

    /// Incremental saves dispatched and not yet settled.
    pub fn pending_incremental(&self) -> usize {
        self.in_flight.iter().filter(|h| !h.is_finished()).count()
    }

    /// Incremental saves still pending when the session reached `Finishing`.
    pub fn abandoned_incremental(&self) -> usize {
        self.abandoned
    }

    /// Runs `timeline` to the end and resolves with the final-save outcome
    /// once the terminal screens have been shown.
    pub async fn start<E>(
        &mut self,
        engine: &mut E,
        timeline: &Timeline,
    ) -> Result<SessionOutcome, RunnerError>
    where
        E: RenderingEngine + ?Sized,
    {
        self.transition(SessionState::Running)?;
        info!(
            units = timeline.len(),
            participant = %self.config.participant_id,
            session = %self.config.session_id,
            "session started"
        );

        let data = engine::run(engine, timeline, &mut *self).await?;

        let outcome = self.await_final_save().await;
        self.conclude(outcome, &data).await?;
        Ok(outcome)
    }

    fn transition(&mut self, next: SessionState) -> Result<(), RunnerError> {
        if !self.state.can_transition_to(next) {
            return Err(RunnerError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        info!(from = ?self.state, to = ?next, "session state");
        self.state = next;
        Ok(())
    }

    fn dispatch_incremental(&mut self, event: &TrialDataEvent) {
        if !event.save_incrementally {
            return;
        }
        self.in_flight.retain(|h| !h.is_finished());

        let record = Record::new(
            &self.config.participant_id,
            &self.config.session_id,
            event.clone(),
        );
        let store = Arc::clone(&self.store);
        let refresh = self
            .config
            .refreshes_debug_panel()
            .then(|| self.debug_refresh.clone())
            .flatten();
        let trial = event.trial_index;

        self.in_flight.push(tokio::spawn(async move {
            match store.save_partial(record).await {
                Ok(()) => {
                    debug!(trial, backend = store.name(), "incremental save ok");
                    if let Some(refresh) = refresh {
                        refresh();
                    }
                }
                Err(e) => warn!(trial, backend = store.name(), error = %e, "incremental save failed"),
            }
        }));
    }

    fn dispatch_final(&mut self, data: &CollectedDataSet) {
        let records = data.to_records(&self.config.participant_id, &self.config.session_id);
        let store = Arc::clone(&self.store);
        info!(records = records.len(), backend = store.name(), "final save dispatched");
        self.final_save = Some(tokio::spawn(
            async move { store.save_complete(records).await },
        ));
    }

    async fn await_final_save(&mut self) -> SessionOutcome {
        let Some(handle) = self.final_save.take() else {
            error!("session finished without a final save");
            return SessionOutcome::SaveFailed;
        };
        match handle.await {
            Ok(Ok(())) => {
                info!("final save succeeded");
                SessionOutcome::Saved
            }
            Ok(Err(e)) => {
                error!(error = %e, "final save failed");
                SessionOutcome::SaveFailed
            }
            Err(e) => {
                error!(error = %e, "final save task did not complete");
                SessionOutcome::SaveFailed
            }
        }
    }

    async fn conclude(
        &mut self,
        outcome: SessionOutcome,
        data: &CollectedDataSet,
    ) -> Result<(), RunnerError> {
        self.transition(outcome.terminal_state())?;

        if outcome == SessionOutcome::Saved && self.config.debug {
            let summary = self.summary.unwrap_or_default();
            self.view.render(Screen::SuccessNotice(&summary));
            tokio::time::sleep(self.config.data_display_delay).await;
            self.view.render(Screen::DataDump(data));
            return Ok(());
        }

        // failed saves end exactly like successful ones for the participant
        let url = self.config.redirect_url();
        self.view.render(Screen::ExitNotice {
            completion_code: &self.config.completion_code,
            redirect_url: self.config.debug.then_some(url.as_str()),
        });
        tokio::time::sleep(self.config.redirect_delay).await;
        info!(%url, "redirecting participant");
        self.view.render(Screen::Redirect(&url));
        Ok(())
    }
}

impl<V: SessionView> EngineHooks for ExperimentRunner<V> {
    fn on_data_update(&mut self, event: &TrialDataEvent) {
        if !self.state.allows_units() {
            warn!(trial = event.trial_index, state = ?self.state, "data event outside a running session");
            return;
        }
        self.events_seen += 1;
        self.dispatch_incremental(event);
    }

    fn on_finish(&mut self, data: &CollectedDataSet) {
        if let Err(e) = self.transition(SessionState::Finishing) {
            error!(error = %e, "ignoring duplicate finish");
            return;
        }
        self.view.render(Screen::PleaseWait);

        self.abandoned = self.pending_incremental();
        if self.abandoned > 0 {
            debug!(pending = self.abandoned, "leaving incremental saves in flight");
        }
        // dropping the handles detaches the tasks
        self.in_flight.clear();

        self.summary = Some(summarize(data.events(), &self.config.response_task));
        self.dispatch_final(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psyflow_store::MemoryStore;

    #[derive(Default)]
    struct Screens(Vec<String>);

    impl SessionView for Screens {
        fn render(&mut self, screen: Screen<'_>) {
            self.0.push(screen.name().to_string());
        }
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut runner = ExperimentRunner::new(
            SessionConfig::default(),
            Arc::new(MemoryStore::new()),
            Screens::default(),
        );
        runner.state = SessionState::Completed;
        let err = runner.transition(SessionState::Running).unwrap_err();
        assert!(matches!(
            err,
            RunnerError::InvalidTransition {
                from: SessionState::Completed,
                to: SessionState::Running
            }
        ));
    }

    #[tokio::test]
    async fn events_before_start_are_dropped() {
        let store = Arc::new(MemoryStore::new());
        let mut runner =
            ExperimentRunner::new(SessionConfig::default(), store.clone(), Screens::default());
        let event = TrialDataEvent {
            trial_index: 0,
            trial_name: "t".into(),
            task: None,
            stimulus_kind: "text".into(),
            block: None,
            response: None,
            correct: None,
            rt_ms: None,
            time_elapsed_ms: 0,
            save_incrementally: true,
            data: Default::default(),
        };
        runner.on_data_update(&event);
        tokio::task::yield_now().await;
        assert_eq!(runner.events_seen(), 0);
        assert_eq!(store.partial_calls().await, 0);
    }

    #[tokio::test]
    async fn finish_shows_please_wait_and_dispatches_once() {
        let store = Arc::new(MemoryStore::new());
        let mut runner =
            ExperimentRunner::new(SessionConfig::default(), store.clone(), Screens::default());
        runner.transition(SessionState::Running).unwrap();

        let data = CollectedDataSet::new();
        runner.on_finish(&data);
        runner.on_finish(&data);

        assert_eq!(runner.state(), SessionState::Finishing);
        assert_eq!(runner.view().0, vec!["please_wait"]);
        assert_eq!(runner.await_final_save().await, SessionOutcome::Saved);
        assert_eq!(store.complete_calls().await, 1);
    }

    struct Stalled;

    #[async_trait::async_trait]
    impl PersistenceAdapter for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn save_partial(&self, _record: Record) -> Result<(), SaveError> {
            std::future::pending().await
        }

        async fn save_complete(&self, _records: Vec<Record>) -> Result<(), SaveError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn finish_detaches_pending_incremental_saves() {
        let mut runner =
            ExperimentRunner::new(SessionConfig::default(), Arc::new(Stalled), Screens::default());
        runner.transition(SessionState::Running).unwrap();

        let mut data = CollectedDataSet::new();
        for i in 0..2 {
            data.push(TrialDataEvent {
                trial_index: i,
                trial_name: "t".into(),
                task: None,
                stimulus_kind: "text".into(),
                block: None,
                response: None,
                correct: None,
                rt_ms: None,
                time_elapsed_ms: 0,
                save_incrementally: true,
                data: Default::default(),
            });
            if let Some(event) = data.last() {
                runner.on_data_update(event);
            }
        }
        tokio::task::yield_now().await;
        assert_eq!(runner.pending_incremental(), 2);

        runner.on_finish(&data);
        assert_eq!(runner.abandoned_incremental(), 2);
        assert_eq!(runner.pending_incremental(), 0);
        assert_eq!(runner.await_final_save().await, SessionOutcome::Saved);
    }
}
