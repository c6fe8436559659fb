use approx::assert_relative_eq;
use flyer_sysid::{
    components::ModelRecord,
    resources::{SolverConfig, SvdStrategy},
    systems::{ConditionEvaluator, CsvDumpObserver, FlightLog, TrainingDataBuilder},
    SysIdConfig, SysIdError,
};
use pretty_assertions::assert_eq;

use crate::common::{
    coefficient, create_test_log_config, flap_dynamics, flaps, two_flap_log_csv,
    write_temp_file, LOG_DT,
};

fn load_log(n: usize) -> FlightLog {
    let file = write_temp_file(&two_flap_log_csv(n), ".csv");
    FlightLog::from_csv_path(file.path()).unwrap()
}

fn two_flap_config() -> SysIdConfig {
    create_test_log_config()
        .condition(flaps(0.0))
        .condition(flaps(0.5))
        .build()
        .unwrap()
}

#[test]
fn test_recovers_dynamics_per_condition() {
    let config = two_flap_config();
    let builder = TrainingDataBuilder::new(load_log(400), &config).unwrap();
    let report = ConditionEvaluator::new(config).evaluate(&builder).unwrap();

    assert!(report.failures.is_empty());
    assert_relative_eq!(report.record.dt, LOG_DT, epsilon = 1e-9);
    assert_eq!(report.record.rows, 1);
    assert_eq!(report.record.cols, 3);

    for (model, setting) in report.record.conditions.iter().zip([0.0, 0.5]) {
        let (a, b) = flap_dynamics(setting);
        assert_eq!(model.condition, flaps(setting));
        assert_relative_eq!(coefficient(model, 0, "x"), a, epsilon = 1e-6);
        assert_relative_eq!(coefficient(model, 0, "u"), b, epsilon = 1e-6);
    }
    for result in &report.conditions {
        assert_eq!(result.samples, 200);
        assert_eq!(result.channels, 3);
    }
}

#[test]
fn test_identical_flight_conditions() {
    let config = create_test_log_config()
        .condition(flaps(0.0))
        .condition(flaps(0.0))
        .build()
        .unwrap();
    let builder = TrainingDataBuilder::new(load_log(300), &config).unwrap();
    let report = ConditionEvaluator::new(config).evaluate(&builder).unwrap();

    assert_eq!(report.record.conditions.len(), 2);
    assert_eq!(report.record.conditions[0], report.record.conditions[1]);
}

#[test]
fn test_empty_condition_skipped() {
    let config = create_test_log_config()
        .condition(flaps(0.0))
        .condition(flaps(1.0))
        .condition(flaps(0.5))
        .build()
        .unwrap();
    let builder = TrainingDataBuilder::new(load_log(400), &config).unwrap();
    let report = ConditionEvaluator::new(config).evaluate(&builder).unwrap();

    assert_eq!(report.record.conditions.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert!(report.failures[0].error.contains("Insufficient samples"));
}

#[test]
fn test_chunked_agrees_with_dense() {
    let dense = two_flap_config();
    let mut chunked = dense.clone();
    chunked.solver = SolverConfig {
        svd: SvdStrategy::Chunked { chunk_size: 64 },
        ..SolverConfig::default()
    };

    let builder = TrainingDataBuilder::new(load_log(400), &dense).unwrap();
    let a = ConditionEvaluator::new(dense).evaluate(&builder).unwrap();
    let b = ConditionEvaluator::new(chunked).evaluate(&builder).unwrap();

    for (ma, mb) in a.record.conditions.iter().zip(&b.record.conditions) {
        for channel in ["x", "u"] {
            assert_relative_eq!(
                coefficient(ma, 0, channel),
                coefficient(mb, 0, channel),
                epsilon = 1e-6
            );
        }
    }
}

#[test]
fn test_record_round_trip() {
    let config = two_flap_config();
    let builder = TrainingDataBuilder::new(load_log(400), &config).unwrap();
    let record = ConditionEvaluator::new(config)
        .evaluate(&builder)
        .unwrap()
        .record;

    let dir = tempfile::tempdir().unwrap();
    for name in ["model.json", "model.yaml"] {
        let path = dir.path().join(name);
        record.save(&path).unwrap();
        let loaded = ModelRecord::load(&path).unwrap();
        assert_eq!(loaded.rows, record.rows);
        assert_eq!(loaded.cols, record.cols);
        assert_eq!(loaded.conditions.len(), 2);
        assert_eq!(loaded.conditions[0].channels, record.conditions[0].channels);
        assert_relative_eq!(
            coefficient(&loaded.conditions[1], 0, "u"),
            coefficient(&record.conditions[1], 0, "u"),
            epsilon = 1e-12
        );
    }

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("model.json")).unwrap())
            .unwrap();
    for key in ["dt", "rows", "cols", "conditions"] {
        assert!(json.get(key).is_some(), "missing {}", key);
    }
}

#[test]
fn test_dump_fits_written() {
    let config = two_flap_config();
    let builder = TrainingDataBuilder::new(load_log(400), &config).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut observer = CsvDumpObserver::new(dir.path()).unwrap();
    let report = ConditionEvaluator::new(config)
        .evaluate_observed(&builder, &mut observer)
        .unwrap();

    let steps: usize = report
        .conditions
        .iter()
        .flat_map(|c| &c.reports)
        .map(|r| r.steps.len())
        .sum();
    assert_eq!(observer.written().len(), steps);
    assert!(dir.path().join("cond1_x_step0.csv").exists());
}

#[test]
fn test_invert_elevator() {
    let config = create_test_log_config().invert_elevator(true).build().unwrap();
    let original = load_log(50);
    let builder = TrainingDataBuilder::new(original.clone(), &config).unwrap();

    let before = original.channel("elevator").unwrap();
    let after = builder.log().channel("elevator").unwrap();
    for (b, a) in before.iter().zip(after) {
        assert_eq!(*a, -*b);
    }
}

#[test]
fn test_missing_condition_channel() {
    let config = create_test_log_config()
        .condition(flaps(0.0).with("gear", 1.0))
        .build()
        .unwrap();
    let builder = TrainingDataBuilder::new(load_log(100), &config).unwrap();
    let report = ConditionEvaluator::new(config).evaluate(&builder).unwrap();

    assert!(report.record.conditions.is_empty());
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        builder.sample_mask(&flaps(0.0).with("gear", 1.0)),
        Err(SysIdError::UnknownChannel(_))
    ));
}
