use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use psyflow_core::SessionOutcome;
use psyflow_experiment::{ExperimentRunner, RenderingEngine, SessionConfig, TimelineBuilder};
use psyflow_store::{FileStore, HttpStore, MemoryStore, PersistenceAdapter};
use psyflow_timing::HighPrecisionTimer;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::Cli;
use crate::demo;
use crate::engine::{SimulatedEngine, TerminalEngine};
use crate::view::TerminalView;

pub struct App {
    config: SessionConfig,
    store: Arc<dyn PersistenceAdapter>,
    timeline: TimelineBuilder,
    seed: u64,
    autopilot: bool,
}

impl App {
    pub fn new(cli: Cli) -> Result<Self> {
        let config = session_config(&cli);
        let store = open_store(&cli, &config.session_id)?;
        let seed = cli.seed.unwrap_or_else(rand::random);

        Ok(Self {
            config,
            store,
            timeline: demo::timeline(),
            seed,
            autopilot: cli.autopilot,
        })
    }

    pub async fn run(self) -> Result<SessionOutcome> {
        let timeline = self
            .timeline
            .build_seeded(self.seed)
            .context("demo timeline is malformed")?;

        println!("=== PSYFLOW SESSION ===");
        println!("Participant: {}", self.config.participant_id);
        println!("Backend: {}", self.store.name());
        println!("Type `quit` to abort.\n");
        info!(seed = self.seed, units = timeline.len(), "timeline ready");

        let saved = Arc::new(AtomicUsize::new(0));
        let panel = Arc::clone(&saved);
        let mut runner = ExperimentRunner::new(self.config, self.store, TerminalView::stdout())
            .on_debug_refresh(move || {
                let n = panel.fetch_add(1, Ordering::SeqCst) + 1;
                eprintln!("[debug panel] {n} partial records stored");
            });

        let mut engine: Box<dyn RenderingEngine> = if self.autopilot {
            Box::new(SimulatedEngine::new(StdRng::seed_from_u64(self.seed), 0.8))
        } else {
            Box::new(TerminalEngine::new(HighPrecisionTimer::new()))
        };

        let outcome = runner
            .start(engine.as_mut(), &timeline)
            .await
            .context("session aborted")?;

        info!(?outcome, events = runner.events_seen(), "session over");
        Ok(outcome)
    }
}

fn session_config(cli: &Cli) -> SessionConfig {
    SessionConfig::default()
        .with_debug(cli.debug)
        .with_mock_backend(cli.mock)
        .with_participant(cli.participant.clone())
        .with_completion(cli.completion_url.clone(), cli.completion_code.clone())
        .with_redirect_delay(Duration::from_millis(cli.redirect_delay_ms))
}

fn open_store(cli: &Cli, session_id: &str) -> Result<Arc<dyn PersistenceAdapter>> {
    if cli.mock {
        return Ok(Arc::new(MemoryStore::new()));
    }
    if let Some(endpoint) = &cli.endpoint {
        let store = HttpStore::new(endpoint.as_str())
            .with_context(|| format!("cannot set up HTTP backend for {endpoint}"))?;
        return Ok(Arc::new(store));
    }
    Ok(Arc::new(FileStore::new(cli.store_dir.clone(), session_id)))
}
