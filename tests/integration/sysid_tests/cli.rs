use std::{fs, path::Path, process::Command};

use approx::assert_relative_eq;
use flyer_sysid::components::ModelRecord;
use pretty_assertions::assert_eq;

use crate::common::{coefficient, flap_dynamics, flaps, two_flap_log_csv};

fn config_yaml(parallel: bool) -> String {
    format!(
        r#"
vehicle: wing
states:
  inceptors: [u]
  direct: [x]
  outputs: [x]
conditions:
  - flaps: 0.0
  - flaps: 0.0
    gear: 1.0
  - flaps: 0.5
parallel_conditions: {}
"#,
        parallel
    )
}

fn run_fit(dir: &Path, parallel: bool) -> ModelRecord {
    let log = dir.join("flight.csv");
    let config = dir.join(format!("sysid_{}.yaml", parallel));
    let model = dir.join(format!("model_{}.json", parallel));
    fs::write(&log, two_flap_log_csv(400)).unwrap();
    fs::write(&config, config_yaml(parallel)).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_sysid_fit"))
        .arg(&log)
        .arg("--write")
        .arg(&model)
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "sysid_fit failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    ModelRecord::load(&model).unwrap()
}

#[test]
fn test_missing_condition_channel_skips_condition() {
    let dir = tempfile::tempdir().unwrap();
    let record = run_fit(dir.path(), false);

    // the gear condition has no channel in the log and is dropped
    assert_eq!(record.conditions.len(), 2);
    assert_eq!(record.conditions[0].condition, flaps(0.0));
    assert_eq!(record.conditions[1].condition, flaps(0.5));
    for model in &record.conditions {
        let setting = model.condition.predicates()["flaps"];
        let (a, b) = flap_dynamics(setting);
        assert_relative_eq!(coefficient(model, 0, "x"), a, epsilon = 1e-3);
        assert_relative_eq!(coefficient(model, 0, "u"), b, epsilon = 1e-3);
    }
}

#[test]
fn test_parallel_conditions_matches_sequential() {
    let dir = tempfile::tempdir().unwrap();
    let sequential = run_fit(dir.path(), false);
    let parallel = run_fit(dir.path(), true);

    assert_eq!(parallel.conditions.len(), sequential.conditions.len());
    for (p, s) in parallel.conditions.iter().zip(&sequential.conditions) {
        assert_eq!(p.condition, s.condition);
        assert_eq!(p.channels, s.channels);
        for (row_p, row_s) in p.operator.iter().zip(&s.operator) {
            for (a, b) in row_p.iter().zip(row_s) {
                assert_relative_eq!(*a, *b, epsilon = 1e-12);
            }
        }
    }
}
