mod condition;
mod model;
mod selection;
mod training;

pub use condition::FlightCondition;
pub use model::{ConditionModel, ModelRecord, OutputFit};
pub(crate) use model::is_yaml;
pub use selection::{RankedChannel, RejectedChannel, SelectionReport, SelectionStep, Termination};
pub use training::TrainingMatrix;
