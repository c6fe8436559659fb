use flyer_sysid::{
    components::{FlightCondition, SelectionStep, TrainingMatrix},
    resources::{SysIdConfig, SysIdConfigBuilder},
    systems::{ConditionEvaluator, SelectionObserver, TrainingDataSource},
    Result, SysIdError,
};
use pretty_assertions::assert_eq;

use crate::common::{
    coefficient, create_ramp_config, flaps, ramp_system, transition_with_noise, MemorySource,
};

#[test]
fn test_identical_conditions_identical_records() {
    let source = MemorySource::new(ramp_system(100));
    let report = ConditionEvaluator::new(create_ramp_config(2))
        .evaluate(&source)
        .unwrap();

    assert!(report.failures.is_empty());
    assert_eq!(report.record.conditions.len(), 2);
    assert_eq!(report.record.conditions[0], report.record.conditions[1]);
}

#[test]
fn test_ramp_model_record() {
    let source = MemorySource::new(ramp_system(100));
    let report = ConditionEvaluator::new(create_ramp_config(1))
        .evaluate(&source)
        .unwrap();

    let record = &report.record;
    assert_eq!(record.rows, 1);
    assert_eq!(record.cols, 3);
    assert_eq!(record.dt, source.dt);

    let model = &record.conditions[0];
    assert_eq!(model.channels, vec!["x", "u"]);
    assert!((coefficient(model, 0, "x") - 0.8).abs() < 1e-3);
    assert!((coefficient(model, 0, "u") - 0.5).abs() < 1e-3);
    assert_eq!(model.outputs[0].state, "x");
}

#[test]
fn test_parallel_matches_sequential() {
    let matrix = transition_with_noise(300, 3, 5);
    let builder = || {
        SysIdConfigBuilder::new()
            .inceptors(&["a", "b", "noise0", "noise1", "noise2", "bias"])
            .direct(&["y"])
            .outputs(&["y"])
            .condition(flaps(0.0))
            .condition(flaps(0.5))
            .condition(flaps(1.0))
    };
    let sequential = builder().build().unwrap();
    let parallel = builder().parallel_conditions(true).build().unwrap();

    let source = MemorySource::new(matrix);
    let a = ConditionEvaluator::new(sequential).evaluate(&source).unwrap();
    let b = ConditionEvaluator::new(parallel).evaluate(&source).unwrap();

    assert_eq!(a.record, b.record);
    let order: Vec<_> = b.conditions.iter().map(|c| c.index).collect();
    assert_eq!(order, vec![0, 1, 2]);
}

/// Fails the conditions whose flap setting is listed in `broken`
struct FlakySource {
    matrix: TrainingMatrix,
    broken: Vec<f64>,
    fatal: bool,
}

impl TrainingDataSource for FlakySource {
    fn dt(&self) -> f64 {
        0.01
    }

    fn training_matrix(&self, condition: &FlightCondition) -> Result<TrainingMatrix> {
        let setting = condition.predicates()["flaps"];
        if !self.broken.contains(&setting) {
            return Ok(self.matrix.clone());
        }
        if self.fatal {
            Err(SysIdError::ShapeMismatch("rows out of step".into()))
        } else {
            Err(SysIdError::UnknownChannel("flaps".into()))
        }
    }
}

fn three_conditions() -> SysIdConfig {
    SysIdConfigBuilder::new()
        .inceptors(&["u"])
        .direct(&["x"])
        .outputs(&["x"])
        .condition(flaps(0.0))
        .condition(flaps(0.5))
        .condition(flaps(1.0))
        .build()
        .unwrap()
}

#[test]
fn test_failure_isolated_to_condition() {
    let source = FlakySource {
        matrix: ramp_system(100),
        broken: vec![0.5],
        fatal: false,
    };
    let report = ConditionEvaluator::new(three_conditions())
        .evaluate(&source)
        .unwrap();

    assert_eq!(report.record.conditions.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert_eq!(report.failures[0].condition, flaps(0.5));
    assert!(report.failures[0].error.contains("flaps"));
    assert_eq!(report.record.conditions[1].condition, flaps(1.0));
}

#[test]
fn test_shape_mismatch_aborts_run() {
    let source = FlakySource {
        matrix: ramp_system(100),
        broken: vec![0.5],
        fatal: true,
    };
    let result = ConditionEvaluator::new(three_conditions()).evaluate(&source);
    assert!(matches!(result, Err(SysIdError::ShapeMismatch(_))));
}

#[derive(Default)]
struct Recorder {
    conditions: Vec<usize>,
    steps: Vec<(String, usize, usize)>,
}

impl SelectionObserver for Recorder {
    fn begin_condition(&mut self, index: usize, _condition: &FlightCondition) {
        self.conditions.push(index);
    }

    fn on_step(&mut self, target: &str, step: &SelectionStep, signal: &[f64], estimate: &[f64]) {
        assert_eq!(signal.len(), estimate.len());
        self.steps.push((target.to_string(), step.iteration, signal.len()));
    }
}

#[test]
fn test_observer_sees_every_step() {
    let source = MemorySource::new(ramp_system(100));
    let mut recorder = Recorder::default();
    let report = ConditionEvaluator::new(create_ramp_config(2))
        .evaluate_observed(&source, &mut recorder)
        .unwrap();

    assert_eq!(recorder.conditions, vec![0, 1]);
    assert_eq!(
        recorder.steps,
        vec![("x".to_string(), 0, 100), ("x".to_string(), 0, 100)]
    );
    assert_eq!(report.conditions[0].reports[0].steps.len(), 1);
}
