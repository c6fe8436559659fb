use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::{
    components::{
        RankedChannel, RejectedChannel, SelectionReport, SelectionStep, Termination,
        TrainingMatrix,
    },
    resources::SelectorConfig,
    systems::{
        correlation::CorrelationMatrix,
        least_squares::{predict, LeastSquaresSolver},
        observer::{NoopObserver, SelectionObserver},
    },
    utils::{relative_improvement, std_dev, Result, SysIdError},
};

/// Greedy forward selection of predictor channels for one output state.
///
/// Each iteration correlates every channel with the current residual of the
/// target and adds the best-correlated channel that is not yet included,
/// then refits the operator on the included rows.
#[derive(Debug, Clone, Default)]
pub struct CorrelationSelector {
    solver: LeastSquaresSolver,
    config: SelectorConfig,
}

impl CorrelationSelector {
    pub fn new(solver: LeastSquaresSolver, config: SelectorConfig) -> Self {
        Self { solver, config }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    pub fn select_features(
        &self,
        candidates: &[String],
        matrix: &TrainingMatrix,
        target: &str,
    ) -> Result<SelectionReport> {
        self.select_features_observed(candidates, matrix, target, &mut NoopObserver)
    }

    pub fn select_features_observed(
        &self,
        candidates: &[String],
        matrix: &TrainingMatrix,
        target: &str,
        observer: &mut dyn SelectionObserver,
    ) -> Result<SelectionReport> {
        let target_index = matrix.require_index(target)?;
        let candidate_set = candidates
            .iter()
            .map(|name| matrix.require_index(name))
            .collect::<Result<BTreeSet<usize>>>()?;

        let m = matrix.num_channels();
        let n = matrix.num_samples();
        if n < 3 {
            return Err(SysIdError::InsufficientSamples {
                samples: n,
                channels: m,
            });
        }

        let signal = matrix.row(target_index);
        if signal.iter().all(|&v| v == signal[0]) {
            return Err(SysIdError::UndefinedCorrelation(target.to_string()));
        }

        let baseline_std = std_dev(&signal);

        let names = matrix.names();
        let mut included = BTreeSet::from([target_index]);
        let mut rejected: Vec<RejectedChannel> = Vec::new();
        let mut steps: Vec<SelectionStep> = Vec::new();
        let mut previous_std = baseline_std;

        // zero predictor: the whole signal is unexplained
        let mut error: Vec<f64> = signal.iter().map(|v| -v).collect();

        let termination = loop {
            if let Some(max_terms) = self.config.max_terms {
                if steps.len() >= max_terms {
                    break Termination::MaxTerms;
                }
            }

            let mut augmented = matrix.data().clone().insert_row(m, 0.0);
            for (j, e) in error.iter().enumerate() {
                augmented[(m, j)] = *e;
            }
            let corr = CorrelationMatrix::pearson(&augmented);

            // strict `>` keeps the first channel in matrix order on ties;
            // undefined correlations never qualify
            let mut best: Option<(usize, f64)> = None;
            let mut best_abs = 0.0;
            for &j in &candidate_set {
                if included.contains(&j) || rejected.iter().any(|r| r.index == j) {
                    continue;
                }
                if let Some(c) = corr.get(m, j) {
                    if c.abs() > best_abs {
                        best = Some((j, c));
                        best_abs = c.abs();
                    }
                }
            }
            let Some((chosen, correlation)) = best else {
                break Termination::CandidatesExhausted;
            };
            debug!(
                "{}: max correlation parameter {} ({:.4})",
                target, names[chosen], correlation
            );

            included.insert(chosen);
            let includes: Vec<usize> = included.iter().copied().collect();
            let local_target = includes
                .iter()
                .position(|&i| i == target_index)
                .ok_or_else(|| SysIdError::ShapeMismatch("target dropped from fit".into()))?;
            let subset = matrix.select_rows(&includes);

            let fit = match self.solver.solve(local_target, &subset) {
                Ok(fit) => fit,
                Err(SysIdError::DegenerateFit(reason)) => {
                    warn!("{}: rejecting {}: {}", target, names[chosen], reason);
                    included.remove(&chosen);
                    rejected.push(RejectedChannel {
                        channel: names[chosen].clone(),
                        index: chosen,
                        reason,
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            let estimate = predict(&fit.operator, &subset)?;
            error = signal.iter().zip(&estimate).map(|(s, e)| s - e).collect();
            let residual_std = std_dev(&error);

            // estimate[t] is the operator's prediction of sample t+1
            let prediction_error: Vec<f64> = signal[1..]
                .iter()
                .zip(&estimate[..n - 1])
                .map(|(s, e)| s - e)
                .collect();
            let prediction_std = std_dev(&prediction_error);

            let step = SelectionStep {
                iteration: steps.len(),
                added: names[chosen].clone(),
                added_index: chosen,
                correlation,
                included: includes.iter().map(|&i| names[i].clone()).collect(),
                included_indices: includes,
                coefficients: fit.coefficients(),
                residual_std,
                prediction_std,
                rank: fit.rank,
                design_rank: fit.design_rank,
            };
            debug!(
                "{}: error std {:.6}, one-step prediction std {:.6}",
                target, residual_std, prediction_std
            );
            observer.on_step(target, &step, &signal, &estimate);
            steps.push(step);

            if let Some(min_improvement) = self.config.min_improvement {
                if relative_improvement(previous_std, residual_std) < min_improvement {
                    break Termination::Converged;
                }
            }
            previous_std = residual_std;
        };

        let ranking = if self.config.compute_ranking {
            let candidates: Vec<usize> = candidate_set.iter().copied().collect();
            let corr = CorrelationMatrix::pearson(matrix.data());
            gain_ranking(&corr, target_index, &candidates, names)
        } else {
            Vec::new()
        };

        info!(
            "{}: {} terms selected ({:?}), {} rejected",
            target,
            steps.len(),
            termination,
            rejected.len()
        );

        Ok(SelectionReport {
            target: target.to_string(),
            target_index,
            baseline_std,
            steps,
            rejected,
            ranking,
            termination,
        })
    }
}

/// Rank candidates by relevance to `target` without redundancy.
///
/// `gain(j) = |corr(target, j)| - max |corr(j, k)|` over the channels already
/// ranked. The highest gain is taken each round, lowest index on ties.
/// Channels whose correlation with the target is undefined go last, in index
/// order, with no gain.
pub fn gain_ranking(
    corr: &CorrelationMatrix,
    target: usize,
    candidates: &[usize],
    names: &[String],
) -> Vec<RankedChannel> {
    let mut remaining: Vec<usize> = candidates.iter().copied().filter(|&j| j != target).collect();
    remaining.sort_unstable();
    remaining.dedup();

    let mut chosen: Vec<usize> = Vec::with_capacity(remaining.len());
    let mut ranking = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let mut best: Option<(usize, f64)> = None;
        for (pos, &j) in remaining.iter().enumerate() {
            let Some(c) = corr.get(target, j) else {
                continue;
            };
            let redundancy = chosen
                .iter()
                .map(|&k| corr.abs_or_zero(j, k))
                .fold(0.0, f64::max);
            let gain = c.abs() - redundancy;
            if best.map_or(true, |(_, g)| gain > g) {
                best = Some((pos, gain));
            }
        }

        match best {
            Some((pos, gain)) => {
                let j = remaining.remove(pos);
                chosen.push(j);
                ranking.push(RankedChannel {
                    channel: names[j].clone(),
                    index: j,
                    correlation: corr.get(target, j).unwrap_or(0.0),
                    gain: Some(gain),
                });
            }
            None => {
                ranking.extend(remaining.drain(..).map(|j| RankedChannel {
                    channel: names[j].clone(),
                    index: j,
                    correlation: 0.0,
                    gain: None,
                }));
            }
        }
    }

    ranking
}
