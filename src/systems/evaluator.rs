use rayon::prelude::*;
use tracing::{error, info};

use crate::{
    components::{ConditionModel, FlightCondition, ModelRecord, OutputFit, SelectionReport},
    resources::SysIdConfig,
    systems::{
        least_squares::LeastSquaresSolver,
        observer::{NoopObserver, SelectionObserver},
        selector::CorrelationSelector,
        training_builder::TrainingDataSource,
    },
    utils::{Result, SysIdError},
};

/// Everything produced for one successfully evaluated condition.
#[derive(Debug, Clone)]
pub struct ConditionResult {
    pub index: usize,
    pub samples: usize,
    pub channels: usize,
    pub reports: Vec<SelectionReport>,
    pub model: ConditionModel,
}

#[derive(Debug, Clone)]
pub struct ConditionFailure {
    pub index: usize,
    pub condition: FlightCondition,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub record: ModelRecord,
    pub conditions: Vec<ConditionResult>,
    pub failures: Vec<ConditionFailure>,
}

/// Runs feature selection for every configured flight condition and collects
/// the frozen fits into a [`ModelRecord`].
///
/// A failing condition is logged and skipped. Only errors that indicate a
/// logic fault ([`SysIdError::is_fatal`]) abort the run.
#[derive(Debug, Clone)]
pub struct ConditionEvaluator {
    config: SysIdConfig,
    selector: CorrelationSelector,
}

impl ConditionEvaluator {
    pub fn new(config: SysIdConfig) -> Self {
        let selector =
            CorrelationSelector::new(LeastSquaresSolver::new(config.solver), config.selector);
        Self { config, selector }
    }

    pub fn config(&self) -> &SysIdConfig {
        &self.config
    }

    pub fn evaluate<S>(&self, source: &S) -> Result<EvaluationReport>
    where
        S: TrainingDataSource + Sync,
    {
        if !self.config.parallel_conditions {
            return self.evaluate_observed(source, &mut NoopObserver);
        }

        let results: Vec<Result<ConditionResult>> = self
            .config
            .conditions
            .par_iter()
            .enumerate()
            .map(|(index, condition)| {
                self.evaluate_condition(index, condition, source, &mut NoopObserver)
            })
            .collect();

        let mut report = self.empty_report(source);
        for (index, result) in results.into_iter().enumerate() {
            self.record_result(&mut report, index, result)?;
        }
        Ok(report)
    }

    /// Sequential evaluation in declaration order, reporting every selection
    /// step to `observer`.
    pub fn evaluate_observed<S>(
        &self,
        source: &S,
        observer: &mut dyn SelectionObserver,
    ) -> Result<EvaluationReport>
    where
        S: TrainingDataSource + ?Sized,
    {
        let mut report = self.empty_report(source);
        for (index, condition) in self.config.conditions.iter().enumerate() {
            observer.begin_condition(index, condition);
            let result = self.evaluate_condition(index, condition, source, observer);
            self.record_result(&mut report, index, result)?;
        }
        Ok(report)
    }

    pub fn evaluate_condition<S>(
        &self,
        index: usize,
        condition: &FlightCondition,
        source: &S,
        observer: &mut dyn SelectionObserver,
    ) -> Result<ConditionResult>
    where
        S: TrainingDataSource + ?Sized,
    {
        let matrix = source.training_matrix(condition)?;
        let samples = matrix.num_samples();
        let channels = matrix.num_channels();
        info!(
            "condition {} ({}): {} samples, {} channels",
            index, condition, samples, channels
        );

        if samples < channels + 2 {
            return Err(SysIdError::InsufficientSamples { samples, channels });
        }

        let candidates = matrix.names().to_vec();
        let mut reports = Vec::with_capacity(self.config.states.outputs.len());
        let mut fits = Vec::with_capacity(self.config.states.outputs.len());
        for output in &self.config.states.outputs {
            let report =
                self.selector
                    .select_features_observed(&candidates, &matrix, output, observer)?;
            log_ranking(&report);
            fits.push(freeze(&report)?);
            reports.push(report);
        }

        let model = ConditionModel::from_fits(condition.clone(), matrix.names(), fits);
        Ok(ConditionResult {
            index,
            samples,
            channels,
            reports,
            model,
        })
    }

    fn empty_report<S>(&self, source: &S) -> EvaluationReport
    where
        S: TrainingDataSource + ?Sized,
    {
        EvaluationReport {
            record: ModelRecord::new(
                source.dt(),
                self.config.states.outputs.len(),
                self.config.states.state_list().len(),
            ),
            conditions: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn record_result(
        &self,
        report: &mut EvaluationReport,
        index: usize,
        result: Result<ConditionResult>,
    ) -> Result<()> {
        match result {
            Ok(result) => {
                report.record.push(result.model.clone());
                report.conditions.push(result);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                let condition = self.config.conditions[index].clone();
                error!("condition {} ({}) skipped: {}", index, condition, e);
                report.failures.push(ConditionFailure {
                    index,
                    condition,
                    error: e.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Freeze the best selection step of `report` as the output's fit.
pub fn freeze(report: &SelectionReport) -> Result<OutputFit> {
    let best = report.best_step().ok_or_else(|| {
        SysIdError::DegenerateFit(format!("no usable terms for '{}'", report.target))
    })?;
    Ok(OutputFit {
        state: report.target.clone(),
        channels: best.included.clone(),
        coefficients: best.coefficients.clone(),
        residual_std: best.residual_std,
        prediction_std: best.prediction_std,
        rank: best.rank,
        design_rank: best.design_rank,
    })
}

fn log_ranking(report: &SelectionReport) {
    if report.ranking.is_empty() {
        return;
    }
    let ranked: Vec<String> = report
        .ranking
        .iter()
        .map(|r| format!("{:.3} {}", r.correlation, r.channel))
        .collect();
    info!("{}: {}", report.target, ranked.join(", "));
}
