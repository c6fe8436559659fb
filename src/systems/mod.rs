pub mod correlation;
pub mod evaluator;
pub mod least_squares;
pub mod observer;
pub mod selector;
pub mod training_builder;

pub use correlation::CorrelationMatrix;
pub use evaluator::{
    freeze, ConditionEvaluator, ConditionFailure, ConditionResult, EvaluationReport,
};
pub use least_squares::{predict, LeastSquaresFit, LeastSquaresSolver, ThinSvd};
pub use observer::{CsvDumpObserver, NoopObserver, SelectionObserver, TracingObserver};
pub use selector::{gain_ranking, CorrelationSelector};
pub use training_builder::{
    FlightLog, TermExpr, TermFactor, TermFn, TrainingDataBuilder, TrainingDataSource,
};
