use nalgebra::DMatrix;
use std::collections::HashSet;

use crate::utils::{Result, SysIdError};

/// Named channels (rows) sampled over time (columns).
///
/// Row order is significant: downstream code addresses channels by index, so
/// the names and the matrix rows always stay aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingMatrix {
    names: Vec<String>,
    data: DMatrix<f64>,
}

impl TrainingMatrix {
    pub fn new(names: Vec<String>, data: DMatrix<f64>) -> Result<Self> {
        if names.len() != data.nrows() {
            return Err(SysIdError::ShapeMismatch(format!(
                "{} channel names for {} matrix rows",
                names.len(),
                data.nrows()
            )));
        }
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(SysIdError::Config(format!(
                    "duplicate channel name '{}'",
                    name
                )));
            }
        }
        Ok(Self { names, data })
    }

    /// Build from `(name, samples)` pairs. All rows must have the same length.
    pub fn from_rows(rows: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let samples = rows.first().map(|(_, r)| r.len()).unwrap_or(0);
        if let Some((name, row)) = rows.iter().find(|(_, r)| r.len() != samples) {
            return Err(SysIdError::ShapeMismatch(format!(
                "channel '{}' has {} samples, expected {}",
                name,
                row.len(),
                samples
            )));
        }

        let n_rows = rows.len();
        let mut names = Vec::with_capacity(n_rows);
        let mut flat = Vec::with_capacity(n_rows * samples);
        for (name, row) in rows {
            names.push(name);
            flat.extend(row);
        }
        Self::new(names, DMatrix::from_row_slice(n_rows, samples, &flat))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    pub fn num_channels(&self) -> usize {
        self.data.nrows()
    }

    pub fn num_samples(&self) -> usize {
        self.data.ncols()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn require_index(&self, name: &str) -> Result<usize> {
        self.index_of(name)
            .ok_or_else(|| SysIdError::UnknownChannel(name.to_string()))
    }

    pub fn row(&self, index: usize) -> Vec<f64> {
        self.data.row(index).iter().copied().collect()
    }

    /// Sub-matrix holding only `indices`, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> DMatrix<f64> {
        self.data.select_rows(indices.iter())
    }
}
