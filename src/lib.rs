//! Linear state-transition system identification for flying vehicles.
//!
//! A flight log is split into flight-condition bins, candidate regressors are
//! chosen greedily by correlation with the remaining prediction error, and
//! each output state gets a least-squares row of the transition operator.

pub mod components;
pub mod resources;
pub mod systems;
pub mod utils;

pub use components::{ConditionModel, FlightCondition, ModelRecord, TrainingMatrix};
pub use resources::{SysIdConfig, SysIdConfigBuilder};
pub use systems::{
    ConditionEvaluator, CorrelationSelector, EvaluationReport, FlightLog, LeastSquaresSolver,
    TrainingDataBuilder,
};
pub use utils::{Result, SysIdError};
