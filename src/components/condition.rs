use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

use crate::utils::{Result, SysIdError};

/// Operating regime used to partition samples, e.g. `{flaps: 0.5}`.
///
/// A sample belongs to the condition when every named channel is within the
/// match tolerance of the predicate value. An empty condition matches all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlightCondition {
    predicates: BTreeMap<String, f64>,
}

impl FlightCondition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, channel: impl Into<String>, value: f64) -> Self {
        self.predicates.insert(channel.into(), value);
        self
    }

    pub fn predicates(&self) -> &BTreeMap<String, f64> {
        &self.predicates
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.predicates.keys().map(String::as_str)
    }

    pub fn matches<F>(&self, lookup: F, tolerance: f64) -> Result<bool>
    where
        F: Fn(&str) -> Option<f64>,
    {
        for (channel, target) in &self.predicates {
            let value =
                lookup(channel).ok_or_else(|| SysIdError::UnknownChannel(channel.clone()))?;
            if (value - target).abs() > tolerance {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl fmt::Display for FlightCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.predicates.is_empty() {
            return write!(f, "(all)");
        }
        let parts: Vec<String> = self
            .predicates
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}
