use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{
    components::{FlightCondition, SelectionStep},
    utils::Result,
};

/// Hook invoked by the selector after every accepted step.
///
/// Keeps visualisation and dumps out of the numeric core.
pub trait SelectionObserver {
    fn begin_condition(&mut self, _index: usize, _condition: &FlightCondition) {}

    fn on_step(&mut self, target: &str, step: &SelectionStep, signal: &[f64], estimate: &[f64]);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SelectionObserver for NoopObserver {
    fn on_step(&mut self, _: &str, _: &SelectionStep, _: &[f64], _: &[f64]) {}
}

/// Logs one line per step.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SelectionObserver for TracingObserver {
    fn begin_condition(&mut self, index: usize, condition: &FlightCondition) {
        info!("condition {}: {}", index, condition);
    }

    fn on_step(&mut self, target: &str, step: &SelectionStep, _: &[f64], _: &[f64]) {
        info!(
            "{} step {}: +{} (corr {:.3}) -> residual std {:.6}, prediction std {:.6}, terms {:?}",
            target,
            step.iteration,
            step.added,
            step.correlation,
            step.residual_std,
            step.prediction_std,
            step.included
        );
    }
}

/// Writes `signal`, `estimate` and `error` columns of every step to CSV files
/// named `cond{c}_{target}_step{i}.csv`.
#[derive(Debug)]
pub struct CsvDumpObserver {
    dir: PathBuf,
    condition: usize,
    written: Vec<PathBuf>,
}

impl CsvDumpObserver {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            condition: 0,
            written: Vec::new(),
        })
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write(&self, path: &Path, signal: &[f64], estimate: &[f64]) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["sample", "signal", "estimate", "error"])?;
        for (i, (s, e)) in signal.iter().zip(estimate).enumerate() {
            writer.write_record(&[
                i.to_string(),
                s.to_string(),
                e.to_string(),
                (s - e).to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl SelectionObserver for CsvDumpObserver {
    fn begin_condition(&mut self, index: usize, _condition: &FlightCondition) {
        self.condition = index;
    }

    fn on_step(&mut self, target: &str, step: &SelectionStep, signal: &[f64], estimate: &[f64]) {
        let file = format!(
            "cond{}_{}_step{}.csv",
            self.condition,
            sanitize(target),
            step.iteration
        );
        let path = self.dir.join(file);
        match self.write(&path, signal, estimate) {
            Ok(()) => self.written.push(path),
            Err(e) => warn!("failed to dump fit to {}: {}", path.display(), e),
        }
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '-' })
        .collect()
}
