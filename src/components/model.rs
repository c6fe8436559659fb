use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::{components::FlightCondition, utils::Result};

/// Frozen fit of one output state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFit {
    pub state: String,
    pub channels: Vec<String>,
    pub coefficients: Vec<f64>,
    pub residual_std: f64,
    pub prediction_std: f64,
    pub rank: usize,
    pub design_rank: usize,
}

/// Identified operator for one flight condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionModel {
    pub condition: FlightCondition,
    /// Union of the channels used by any output, in training-matrix order
    pub channels: Vec<String>,
    /// Row-major operator, one row per output state
    pub operator: Vec<Vec<f64>>,
    pub outputs: Vec<OutputFit>,
}

impl ConditionModel {
    /// Merge per-output fits into a single operator. Channels an output does
    /// not use get a zero coefficient.
    pub fn from_fits(condition: FlightCondition, channel_order: &[String], fits: Vec<OutputFit>) -> Self {
        let channels: Vec<String> = channel_order
            .iter()
            .filter(|name| fits.iter().any(|f| f.channels.contains(name)))
            .cloned()
            .collect();

        let operator = fits
            .iter()
            .map(|fit| {
                let mut row = vec![0.0; channels.len()];
                for (name, coeff) in fit.channels.iter().zip(&fit.coefficients) {
                    if let Some(col) = channels.iter().position(|c| c == name) {
                        row[col] = *coeff;
                    }
                }
                row
            })
            .collect();

        Self {
            condition,
            channels,
            operator,
            outputs: fits,
        }
    }

    pub fn operator_matrix(&self) -> DMatrix<f64> {
        let rows = self.operator.len();
        let cols = self.channels.len();
        let flat: Vec<f64> = self.operator.iter().flatten().copied().collect();
        DMatrix::from_row_slice(rows, cols, &flat)
    }
}

/// Exported model: `{dt, rows, cols, conditions}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub dt: f64,
    /// Output dimension
    pub rows: usize,
    /// State dimension
    pub cols: usize,
    pub conditions: Vec<ConditionModel>,
}

impl ModelRecord {
    pub fn new(dt: f64, rows: usize, cols: usize) -> Self {
        Self {
            dt,
            rows,
            cols,
            conditions: Vec::new(),
        }
    }

    pub fn push(&mut self, condition: ConditionModel) {
        self.conditions.push(condition);
    }

    /// Write as YAML for `.yaml`/`.yml`, JSON otherwise.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = if is_yaml(path) {
            serde_yaml::to_string(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        if is_yaml(path) {
            Ok(serde_yaml::from_str(&contents)?)
        } else {
            Ok(serde_json::from_str(&contents)?)
        }
    }
}

pub(crate) fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}
