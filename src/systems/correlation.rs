use nalgebra::DMatrix;

/// Pearson correlation between every pair of rows.
///
/// Rows with zero variance have no defined correlation; their entries are
/// stored as NaN and reported as `None` by [`CorrelationMatrix::get`].
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    values: DMatrix<f64>,
}

impl CorrelationMatrix {
    pub fn pearson(data: &DMatrix<f64>) -> Self {
        let (m, n) = data.shape();
        if n == 0 {
            return Self {
                values: DMatrix::from_element(m, m, f64::NAN),
            };
        }

        let mut centered = data.clone();
        let mut constant = vec![false; m];
        for (i, mut row) in centered.row_iter_mut().enumerate() {
            let first = row[0];
            constant[i] = row.iter().all(|&v| v == first);
            let mean = row.mean();
            row.add_scalar_mut(-mean);
        }

        let cov = &centered * centered.transpose();
        let std: Vec<f64> = (0..m).map(|i| cov[(i, i)].sqrt()).collect();

        let values = DMatrix::from_fn(m, m, |i, j| {
            if constant[i] || constant[j] || std[i] == 0.0 || std[j] == 0.0 {
                f64::NAN
            } else {
                (cov[(i, j)] / (std[i] * std[j])).clamp(-1.0, 1.0)
            }
        });
        Self { values }
    }

    pub fn dim(&self) -> usize {
        self.values.nrows()
    }

    /// Correlation of rows `i` and `j`, `None` when undefined
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        let v = self.values[(i, j)];
        v.is_finite().then_some(v)
    }

    /// Absolute correlation with undefined entries scored as zero
    pub fn abs_or_zero(&self, i: usize, j: usize) -> f64 {
        self.get(i, j).map(f64::abs).unwrap_or(0.0)
    }
}
