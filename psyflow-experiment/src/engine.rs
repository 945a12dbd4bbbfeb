//! Boundary with the rendering engine.
//!
//! The engine presents one [`Unit`] at a time and reports what the
//! participant did. [`run`] turns those reports into [`TrialDataEvent`]s,
//! keeps the [`CollectedDataSet`], and notifies the registered
//! [`EngineHooks`].

use async_trait::async_trait;
use psyflow_core::{CollectedDataSet, TrialDataEvent};
use thiserror::Error;
use tracing::debug;

use crate::timeline::{Timeline, Unit};

/// Raw outcome of presenting one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitResponse {
    pub response: Option<String>,
    pub rt_ms: Option<f64>,
    /// Milliseconds since the session started, taken when the unit ended.
    pub time_elapsed_ms: u64,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("participant input closed")]
    InputClosed,

    #[error("session aborted by participant")]
    Aborted,

    #[error("engine i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait RenderingEngine: Send {
    /// Shows `unit` and resolves once it is over.
    async fn present(&mut self, unit: &Unit) -> Result<UnitResponse, EngineError>;
}

/// Callbacks invoked by [`run`].
pub trait EngineHooks {
    /// Called once per completed unit, before the next one starts.
    fn on_data_update(&mut self, event: &TrialDataEvent);

    /// Called once after the last unit.
    fn on_finish(&mut self, data: &CollectedDataSet);
}

/// Presents every unit of `timeline` in order. Resolves only after the
/// last unit has completed and `on_finish` has been called.
pub async fn run<E, H>(
    engine: &mut E,
    timeline: &Timeline,
    hooks: &mut H,
) -> Result<CollectedDataSet, EngineError>
where
    E: RenderingEngine + ?Sized,
    H: EngineHooks + ?Sized,
{
    let mut data = CollectedDataSet::with_capacity(timeline.len());
    for (index, unit) in timeline.iter().enumerate() {
        let response = engine.present(unit).await?;
        let event = to_event(index, unit, response);
        debug!(
            trial = index,
            name = %event.trial_name,
            response = ?event.response,
            correct = ?event.correct,
            "unit complete"
        );
        data.push(event);
        if let Some(event) = data.last() {
            hooks.on_data_update(event);
        }
    }
    hooks.on_finish(&data);
    Ok(data)
}

fn to_event(index: usize, unit: &Unit, r: UnitResponse) -> TrialDataEvent {
    let d = &unit.descriptor;
    TrialDataEvent {
        trial_index: index,
        trial_name: d.name.clone(),
        task: d.task.clone(),
        stimulus_kind: d.stimulus.kind().to_string(),
        block: unit.block.clone(),
        correct: d.score(r.response.as_deref()),
        response: r.response,
        rt_ms: r.rt_ms,
        time_elapsed_ms: r.time_elapsed_ms,
        save_incrementally: d.save_incrementally,
        data: d.data.clone(),
    }
}
