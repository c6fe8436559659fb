use serde::{Deserialize, Serialize};

/// One accepted step of the greedy forward selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionStep {
    pub iteration: usize,
    /// Channel added in this step
    pub added: String,
    pub added_index: usize,
    /// Signed correlation of the added channel with the residual error row
    pub correlation: f64,
    /// Included channels in training-matrix order (target included)
    pub included: Vec<String>,
    pub included_indices: Vec<usize>,
    /// Fitted operator row, aligned with `included`
    pub coefficients: Vec<f64>,
    /// Std dev of target minus estimate, sample for sample
    pub residual_std: f64,
    /// Std dev of the one-step prediction error `y[t+1] - A x[t]`
    pub prediction_std: f64,
    pub rank: usize,
    pub design_rank: usize,
}

/// Candidate that was picked but could not be fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedChannel {
    pub channel: String,
    pub index: usize,
    pub reason: String,
}

/// Entry of the gain ranking.
///
/// `gain` is `None` when the correlation with the target is undefined
/// (zero-variance channel); such entries always sort last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedChannel {
    pub channel: String,
    pub index: usize,
    pub correlation: f64,
    pub gain: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Configured term limit reached
    MaxTerms,
    /// No candidate with a defined, non-zero correlation left
    CandidatesExhausted,
    /// Residual improvement fell below the configured threshold
    Converged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionReport {
    pub target: String,
    pub target_index: usize,
    /// Standard deviation of the target itself (residual of the zero predictor)
    pub baseline_std: f64,
    pub steps: Vec<SelectionStep>,
    pub rejected: Vec<RejectedChannel>,
    pub ranking: Vec<RankedChannel>,
    pub termination: Termination,
}

impl SelectionReport {
    /// Step with the smallest one-step prediction error; earlier steps win ties.
    pub fn best_step(&self) -> Option<&SelectionStep> {
        self.steps.iter().fold(None, |best: Option<&SelectionStep>, step| match best {
            Some(b) if b.prediction_std <= step.prediction_std => Some(b),
            _ => Some(step),
        })
    }

    /// Channels in the order the greedy loop added them.
    pub fn inclusion_order(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.added.as_str()).collect()
    }
}
