use serde::{Deserialize, Serialize};

/// Termination rule and options of the greedy selector.
///
/// The loop always ends once no candidate with a defined, non-zero
/// correlation to the residual remains, so the defaults are finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Maximum number of terms added besides the target itself
    pub max_terms: Option<usize>,
    /// Stop once a step improves the residual std by less than this fraction
    pub min_improvement: Option<f64>,
    /// Also compute the gain ranking report
    pub compute_ranking: bool,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            max_terms: None,
            min_improvement: None,
            compute_ranking: true,
        }
    }
}

impl SelectorConfig {
    pub fn with_max_terms(mut self, max_terms: usize) -> Self {
        self.max_terms = Some(max_terms);
        self
    }

    pub fn with_min_improvement(mut self, min_improvement: f64) -> Self {
        self.min_improvement = Some(min_improvement);
        self
    }
}
