use serde::{Deserialize, Serialize};

use crate::utils::{DEFAULT_RECONSTRUCTION_TOLERANCE, DEFAULT_SINGULAR_TOLERANCE};

/// How the SVD of the design matrix is computed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SvdStrategy {
    /// Single in-memory factorization
    Dense,
    /// QR reduction over blocks of `chunk_size` samples
    Chunked { chunk_size: usize },
}

impl Default for SvdStrategy {
    fn default() -> Self {
        SvdStrategy::Dense
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub svd: SvdStrategy,
    /// Singular values at or below `singular_tolerance * s_max` are treated as zero
    pub singular_tolerance: f64,
    /// Max abs error of `U S Vt` vs the input before a warning is logged
    pub reconstruction_tolerance: f64,
    pub check_reconstruction: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            svd: SvdStrategy::Dense,
            singular_tolerance: DEFAULT_SINGULAR_TOLERANCE,
            reconstruction_tolerance: DEFAULT_RECONSTRUCTION_TOLERANCE,
            check_reconstruction: true,
        }
    }
}
