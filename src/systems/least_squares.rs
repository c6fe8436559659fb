use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::{
    resources::{SolverConfig, SvdStrategy},
    utils::{Result, SysIdError},
};

const SVD_MAX_ITERATIONS: usize = 1000;
const OPERATOR_RANK_EPS: f64 = 1e-12;

/// Thin SVD `X = U * diag(S) * Vt` of an M x N design matrix.
#[derive(Debug, Clone)]
pub struct ThinSvd {
    /// M x k
    pub u: DMatrix<f64>,
    /// k singular values, k = min(M, N)
    pub singular_values: DVector<f64>,
    /// k x N
    pub v_t: DMatrix<f64>,
}

impl ThinSvd {
    pub fn reconstruct(&self) -> DMatrix<f64> {
        &self.u * DMatrix::from_diagonal(&self.singular_values) * &self.v_t
    }

    /// Number of singular values above `tolerance * s_max`
    pub fn numerical_rank(&self, tolerance: f64) -> usize {
        let s_max = self.singular_values.amax();
        self.singular_values
            .iter()
            .filter(|&&s| s > tolerance * s_max)
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct LeastSquaresFit {
    /// 1 x M operator mapping the previous sample of every row to the next
    /// sample of the target row
    pub operator: DMatrix<f64>,
    /// Numerical rank of the operator
    pub rank: usize,
    /// Numerical rank of the design matrix
    pub design_rank: usize,
    pub singular_values: DVector<f64>,
    pub reconstruction_error: Option<f64>,
}

impl LeastSquaresFit {
    pub fn coefficients(&self) -> Vec<f64> {
        self.operator.iter().copied().collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LeastSquaresSolver {
    config: SolverConfig,
}

impl LeastSquaresSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Fit `Y = A * X` where X is every row of `matrix` over samples
    /// `0..N-1` and Y is row `target` over samples `1..N`.
    pub fn solve(&self, target: usize, matrix: &DMatrix<f64>) -> Result<LeastSquaresFit> {
        let (m, n) = matrix.shape();
        if target >= m {
            return Err(SysIdError::ShapeMismatch(format!(
                "target row {} out of range for {} rows",
                target, m
            )));
        }
        if n < 2 {
            return Err(SysIdError::ShapeMismatch(format!(
                "need at least 2 samples to pair states, got {}",
                n
            )));
        }

        let x = matrix.columns(0, n - 1).into_owned();
        let y = DMatrix::from_iterator(1, n - 1, matrix.row(target).iter().skip(1).copied());
        debug!("X: {:?}, Y: {:?}", x.shape(), y.shape());

        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(SysIdError::DegenerateFit(
                "training data contains non-finite samples".into(),
            ));
        }

        let svd = self.decompose(&x)?;
        debug!("singular values: {}", svd.singular_values.transpose());

        let reconstruction_error = if self.config.check_reconstruction {
            let err = (svd.reconstruct() - &x).amax();
            debug!("svd reconstruction error: {:e}", err);
            if err > self.config.reconstruction_tolerance {
                warn!(
                    "svd reconstruction error {:e} above tolerance {:e}",
                    err, self.config.reconstruction_tolerance
                );
            }
            Some(err)
        } else {
            None
        };

        let s = &svd.singular_values;
        if s.len() < m {
            return Err(SysIdError::DegenerateFit(format!(
                "{} samples cannot determine {} coefficients",
                n - 1,
                m
            )));
        }
        let s_max = s.amax();
        if let Some(i) = s
            .iter()
            .position(|&v| v == 0.0 || v <= self.config.singular_tolerance * s_max)
        {
            return Err(SysIdError::DegenerateFit(format!(
                "singular value {} is {:e} (max {:e})",
                i, s[i], s_max
            )));
        }

        // A = Y * V[:, ..M] * S^-1 * Ut
        let v = svd.v_t.transpose();
        let s_inv = DMatrix::from_diagonal(&s.map(|v| 1.0 / v));
        let operator = y * v.columns(0, m) * s_inv * svd.u.transpose();

        let rank = operator.rank(OPERATOR_RANK_EPS);
        let design_rank = svd.numerical_rank(self.config.singular_tolerance);
        debug!("A rank: {}, design rank: {}, A: {}", rank, design_rank, operator);

        Ok(LeastSquaresFit {
            operator,
            rank,
            design_rank,
            singular_values: svd.singular_values,
            reconstruction_error,
        })
    }

    pub fn decompose(&self, x: &DMatrix<f64>) -> Result<ThinSvd> {
        match self.config.svd {
            SvdStrategy::Dense => dense_svd(x),
            SvdStrategy::Chunked { chunk_size } => chunked_svd(x, chunk_size),
        }
    }
}

/// `A * matrix`, the estimate of the target at every sample
pub fn predict(operator: &DMatrix<f64>, matrix: &DMatrix<f64>) -> Result<Vec<f64>> {
    if operator.nrows() != 1 || operator.ncols() != matrix.nrows() {
        return Err(SysIdError::ShapeMismatch(format!(
            "operator {:?} cannot be applied to {:?}",
            operator.shape(),
            matrix.shape()
        )));
    }
    Ok((operator * matrix).iter().copied().collect())
}

/// Thin SVD with singular values sorted largest first.
fn dense_svd(x: &DMatrix<f64>) -> Result<ThinSvd> {
    let svd = x
        .clone()
        .try_svd(true, true, f64::EPSILON, SVD_MAX_ITERATIONS)
        .ok_or_else(|| SysIdError::DegenerateFit("svd did not converge".into()))?;
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return Err(SysIdError::DegenerateFit("svd factors not computed".into())),
    };

    let s = svd.singular_values;
    let mut order: Vec<usize> = (0..s.len()).collect();
    order.sort_by(|&a, &b| s[b].total_cmp(&s[a]));

    Ok(ThinSvd {
        u: DMatrix::from_fn(u.nrows(), order.len(), |r, c| u[(r, order[c])]),
        singular_values: DVector::from_iterator(order.len(), order.iter().map(|&i| s[i])),
        v_t: DMatrix::from_fn(order.len(), v_t.ncols(), |r, c| v_t[(order[r], c)]),
    })
}

/// SVD of a wide matrix built from per-chunk pieces.
///
/// Each column block of X is reduced to the R factor of its transpose and the
/// R factors are merged pairwise in parallel, so `Xt = Q * R` without ever
/// holding Q. The small M x M matrix `Rt` has the same U and S as X, and
/// `Vt = S^-1 * Ut * X` is assembled block by block.
fn chunked_svd(x: &DMatrix<f64>, chunk_size: usize) -> Result<ThinSvd> {
    let (m, n) = x.shape();
    if chunk_size == 0 {
        return Err(SysIdError::Config("chunk_size must be positive".into()));
    }
    if n < m {
        // a wide X is needed for R to be square
        return dense_svd(x);
    }

    let starts: Vec<usize> = (0..n).step_by(chunk_size).collect();
    let r = starts
        .par_iter()
        .map(|&start| {
            let block = x.columns(start, chunk_size.min(n - start)).transpose();
            block.qr().r()
        })
        .reduce(|| DMatrix::zeros(0, m), merge_r_factors);
    debug!("chunked R factor: {:?} from {} blocks", r.shape(), starts.len());

    let small = dense_svd(&r.transpose())?;
    let u = small.u;
    let singular_values = small.singular_values;

    if let Some(i) = singular_values.iter().position(|&s| s == 0.0) {
        return Err(SysIdError::DegenerateFit(format!(
            "singular value {} is zero",
            i
        )));
    }

    let projector = DMatrix::from_diagonal(&singular_values.map(|s| 1.0 / s)) * u.transpose();
    let blocks: Vec<(usize, DMatrix<f64>)> = starts
        .par_iter()
        .map(|&start| {
            let block = x.columns(start, chunk_size.min(n - start));
            (start, &projector * block)
        })
        .collect();

    let mut v_t = DMatrix::zeros(m, n);
    for (start, block) in blocks {
        v_t.columns_mut(start, block.ncols()).copy_from(&block);
    }

    Ok(ThinSvd {
        u,
        singular_values,
        v_t,
    })
}

/// R factor of the row-wise stack `[a; b]`
fn merge_r_factors(a: DMatrix<f64>, b: DMatrix<f64>) -> DMatrix<f64> {
    if a.nrows() == 0 {
        return b;
    }
    if b.nrows() == 0 {
        return a;
    }
    let mut stacked = DMatrix::zeros(a.nrows() + b.nrows(), a.ncols());
    stacked.rows_mut(0, a.nrows()).copy_from(&a);
    stacked.rows_mut(a.nrows(), b.nrows()).copy_from(&b);
    stacked.qr().r()
}
