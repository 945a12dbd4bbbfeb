pub mod data;
pub mod error;
pub mod session;
pub mod stimulus;
pub mod trial;

pub use data::{CollectedDataSet, Record};
pub use error::{ConstructionError, SaveError};
pub use session::{SessionOutcome, SessionState};
pub use stimulus::{Aperture, DotMotion, StimulusType};
pub use trial::{TrialDataEvent, TrialDescriptor};
