use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs, path::Path};

use crate::{
    components::{is_yaml, FlightCondition},
    resources::config::{
        FlyingThreshold, SelectorConfig, SolverConfig, StateNames, SvdStrategy, VehicleType,
    },
    utils::{Result, SysIdError, DEFAULT_CONDITION_TOLERANCE},
};

/// Everything a system-identification run needs besides the flight log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SysIdConfig {
    pub vehicle: VehicleType,
    pub states: StateNames,
    /// Combination terms, e.g. `elevator*qbar` or `sin(alpha_prev1)*qbar`
    pub terms: Vec<String>,
    /// Bins of unique flight conditions, evaluated in order
    pub conditions: Vec<FlightCondition>,
    pub condition_tolerance: f64,
    /// Overrides the vehicle default is-flying rule
    pub flying_threshold: Option<FlyingThreshold>,
    /// Used when the log has no time channel
    pub dt: Option<f64>,
    pub invert_elevator: bool,
    pub invert_rudder: bool,
    pub solver: SolverConfig,
    pub selector: SelectorConfig,
    pub parallel_conditions: bool,
}

impl Default for SysIdConfig {
    fn default() -> Self {
        Self {
            vehicle: VehicleType::Wing,
            states: StateNames::default(),
            terms: Vec::new(),
            conditions: vec![FlightCondition::new()],
            condition_tolerance: DEFAULT_CONDITION_TOLERANCE,
            flying_threshold: None,
            dt: None,
            invert_elevator: false,
            invert_rudder: false,
            solver: SolverConfig::default(),
            selector: SelectorConfig::default(),
            parallel_conditions: false,
        }
    }
}

impl SysIdConfig {
    /// Load from YAML (`.yaml`/`.yml`) or JSON.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: SysIdConfig = if is_yaml(path) {
            serde_yaml::from_str(&contents)?
        } else {
            serde_json::from_str(&contents)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Rows of the training matrix: inceptors, direct states, then terms.
    pub fn train_states(&self) -> Vec<String> {
        self.states
            .inceptors
            .iter()
            .chain(&self.states.direct)
            .chain(&self.terms)
            .cloned()
            .collect()
    }

    pub fn flying_threshold(&self) -> Option<FlyingThreshold> {
        self.flying_threshold
            .clone()
            .or_else(|| self.vehicle.default_flying_threshold())
    }

    pub fn validate(&self) -> Result<()> {
        if self.states.outputs.is_empty() {
            return Err(SysIdError::Config("no output states configured".into()));
        }
        if self.conditions.is_empty() {
            return Err(SysIdError::Config("no flight conditions configured".into()));
        }

        let train_states = self.train_states();
        let mut seen = HashSet::new();
        for name in &train_states {
            if !seen.insert(name.as_str()) {
                return Err(SysIdError::Config(format!(
                    "train state '{}' listed twice",
                    name
                )));
            }
        }
        if let Some(missing) = self.states.outputs.iter().find(|o| !seen.contains(o.as_str())) {
            return Err(SysIdError::Config(format!(
                "output state '{}' is not a train state",
                missing
            )));
        }

        if let Some(dt) = self.dt {
            if !(dt > 0.0) {
                return Err(SysIdError::Config(format!("dt must be positive, got {}", dt)));
            }
        }
        if !(self.condition_tolerance >= 0.0) {
            return Err(SysIdError::Config(
                "condition_tolerance must be non-negative".into(),
            ));
        }
        if let SvdStrategy::Chunked { chunk_size: 0 } = self.solver.svd {
            return Err(SysIdError::Config("chunk_size must be positive".into()));
        }
        if let Some(threshold) = &self.flying_threshold {
            if threshold.off > threshold.on {
                return Err(SysIdError::Config(format!(
                    "flying threshold off ({}) above on ({})",
                    threshold.off, threshold.on
                )));
            }
        }
        if let Some(min) = self.selector.min_improvement {
            if !min.is_finite() || min < 0.0 {
                return Err(SysIdError::Config(format!(
                    "min_improvement must be a non-negative number, got {}",
                    min
                )));
            }
        }
        Ok(())
    }
}

#[derive(Default, Debug, Clone)]
pub struct SysIdConfigBuilder {
    pub vehicle: Option<VehicleType>,
    pub inceptors: Option<Vec<String>>,
    pub direct: Option<Vec<String>>,
    pub outputs: Option<Vec<String>>,
    pub terms: Option<Vec<String>>,
    pub conditions: Option<Vec<FlightCondition>>,
    pub condition_tolerance: Option<f64>,
    pub flying_threshold: Option<FlyingThreshold>,
    pub dt: Option<f64>,
    pub invert_elevator: Option<bool>,
    pub invert_rudder: Option<bool>,
    pub solver: Option<SolverConfig>,
    pub selector: Option<SelectorConfig>,
    pub parallel_conditions: Option<bool>,
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl SysIdConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vehicle(mut self, vehicle: VehicleType) -> Self {
        self.vehicle = Some(vehicle);
        self
    }

    pub fn inceptors(mut self, names: &[&str]) -> Self {
        self.inceptors = Some(owned(names));
        self
    }

    pub fn direct(mut self, names: &[&str]) -> Self {
        self.direct = Some(owned(names));
        self
    }

    pub fn outputs(mut self, names: &[&str]) -> Self {
        self.outputs = Some(owned(names));
        self
    }

    pub fn terms(mut self, terms: &[&str]) -> Self {
        self.terms = Some(owned(terms));
        self
    }

    pub fn condition(mut self, condition: FlightCondition) -> Self {
        self.conditions.get_or_insert_with(Vec::new).push(condition);
        self
    }

    pub fn condition_tolerance(mut self, tolerance: f64) -> Self {
        self.condition_tolerance = Some(tolerance);
        self
    }

    pub fn flying_threshold(mut self, threshold: FlyingThreshold) -> Self {
        self.flying_threshold = Some(threshold);
        self
    }

    pub fn dt(mut self, dt: f64) -> Self {
        self.dt = Some(dt);
        self
    }

    pub fn invert_elevator(mut self, invert: bool) -> Self {
        self.invert_elevator = Some(invert);
        self
    }

    pub fn invert_rudder(mut self, invert: bool) -> Self {
        self.invert_rudder = Some(invert);
        self
    }

    pub fn solver(mut self, solver: SolverConfig) -> Self {
        self.solver = Some(solver);
        self
    }

    pub fn selector(mut self, selector: SelectorConfig) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn parallel_conditions(mut self, parallel: bool) -> Self {
        self.parallel_conditions = Some(parallel);
        self
    }

    pub fn build(self) -> Result<SysIdConfig> {
        let mut config = SysIdConfig::default();

        if let Some(vehicle) = self.vehicle {
            config.vehicle = vehicle;
        }
        if let Some(inceptors) = self.inceptors {
            config.states.inceptors = inceptors;
        }
        if let Some(direct) = self.direct {
            config.states.direct = direct;
        }
        if let Some(outputs) = self.outputs {
            config.states.outputs = outputs;
        }
        if let Some(terms) = self.terms {
            config.terms = terms;
        }
        if let Some(conditions) = self.conditions {
            config.conditions = conditions;
        }
        if let Some(tolerance) = self.condition_tolerance {
            config.condition_tolerance = tolerance;
        }
        config.flying_threshold = self.flying_threshold;
        config.dt = self.dt;
        if let Some(invert) = self.invert_elevator {
            config.invert_elevator = invert;
        }
        if let Some(invert) = self.invert_rudder {
            config.invert_rudder = invert;
        }
        if let Some(solver) = self.solver {
            config.solver = solver;
        }
        if let Some(selector) = self.selector {
            config.selector = selector;
        }
        if let Some(parallel) = self.parallel_conditions {
            config.parallel_conditions = parallel;
        }

        config.validate()?;
        Ok(config)
    }
}
