//! Experiment execution: timeline construction, the session state machine
//! and its save protocols, and the end-of-session debrief.

pub mod config;
pub mod debrief;
pub mod engine;
pub mod state;
pub mod timeline;
pub mod view;

pub use config::SessionConfig;
pub use debrief::{summarize, DebriefSummary};
pub use engine::{EngineError, EngineHooks, RenderingEngine, UnitResponse};
pub use state::{DebugPanelRefresh, ExperimentRunner, RunnerError};
pub use timeline::{ProceduralBlock, Timeline, TimelineBuilder, TimelineNode, Unit};
pub use view::{Screen, SessionView};
