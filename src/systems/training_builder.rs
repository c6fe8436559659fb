use std::{collections::BTreeMap, fs::File, io::Read, path::Path, str::FromStr};
use tracing::{debug, info};

use crate::{
    components::{FlightCondition, TrainingMatrix},
    resources::SysIdConfig,
    utils::{Result, SysIdError, DEFAULT_TIME_CHANNEL, ELEVATOR_CHANNEL, RUDDER_CHANNEL},
};

/// Supplies one training matrix per flight condition.
pub trait TrainingDataSource {
    /// Sample period in seconds
    fn dt(&self) -> f64;

    fn training_matrix(&self, condition: &FlightCondition) -> Result<TrainingMatrix>;
}

/// Column oriented flight log: one named series per recorded channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlightLog {
    channels: BTreeMap<String, Vec<f64>>,
    len: usize,
}

impl FlightLog {
    pub fn from_channels(channels: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let len = channels.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut map = BTreeMap::new();
        for (name, values) in channels {
            if values.len() != len {
                return Err(SysIdError::ShapeMismatch(format!(
                    "channel '{}' has {} samples, expected {}",
                    name,
                    values.len(),
                    len
                )));
            }
            if map.insert(name.clone(), values).is_some() {
                return Err(SysIdError::Config(format!("duplicate channel '{}'", name)));
            }
        }
        Ok(Self { channels: map, len })
    }

    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let log = Self::from_csv_reader(file)?;
        info!(
            "loaded {} samples of {} channels from {}",
            log.len(),
            log.channels.len(),
            path.display()
        );
        Ok(log)
    }

    /// Header row holds the channel names; empty fields are read as NaN.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];

        for (row, record) in reader.records().enumerate() {
            let record = record?;
            for (col, field) in record.iter().enumerate() {
                let value = if field.is_empty() {
                    f64::NAN
                } else {
                    field.parse::<f64>().map_err(|_| {
                        SysIdError::Config(format!(
                            "row {} column '{}': invalid number '{}'",
                            row + 1,
                            headers[col],
                            field
                        ))
                    })?
                };
                columns[col].push(value);
            }
        }

        Self::from_channels(headers.into_iter().zip(columns).collect())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        self.channels.get(name).map(Vec::as_slice)
    }

    pub fn require(&self, name: &str) -> Result<&[f64]> {
        self.channel(name)
            .ok_or_else(|| SysIdError::UnknownChannel(name.to_string()))
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    /// Mean spacing of the `time` channel
    pub fn dt(&self) -> Option<f64> {
        let time = self.channel(DEFAULT_TIME_CHANNEL)?;
        if time.len() < 2 {
            return None;
        }
        let dt = (time[time.len() - 1] - time[0]) / (time.len() - 1) as f64;
        (dt.is_finite() && dt > 0.0).then_some(dt)
    }

    pub fn negate(&mut self, name: &str) -> Result<()> {
        let values = self
            .channels
            .get_mut(name)
            .ok_or_else(|| SysIdError::UnknownChannel(name.to_string()))?;
        values.iter_mut().for_each(|v| *v = -*v);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermFn {
    Abs,
    Sin,
    Cos,
}

impl TermFn {
    fn apply(&self, v: f64) -> f64 {
        match self {
            TermFn::Abs => v.abs(),
            TermFn::Sin => v.sin(),
            TermFn::Cos => v.cos(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TermFactor {
    pub name: String,
    pub func: Option<TermFn>,
}

impl TermFactor {
    /// Values of the factor at every sample. A name that is not a channel
    /// but ends in `_prevN` reads channel `name` N samples back; the first N
    /// samples repeat the first value.
    fn evaluate(&self, log: &FlightLog) -> Result<Vec<f64>> {
        let values: Vec<f64> = match log.channel(&self.name) {
            Some(values) => values.to_vec(),
            None => {
                let (base, lag) = split_lag(&self.name)
                    .ok_or_else(|| SysIdError::UnknownChannel(self.name.clone()))?;
                let source = log.require(base)?;
                (0..source.len())
                    .map(|t| source[t.saturating_sub(lag)])
                    .collect()
            }
        };
        Ok(match self.func {
            Some(func) => values.into_iter().map(|v| func.apply(v)).collect(),
            None => values,
        })
    }
}

fn split_lag(name: &str) -> Option<(&str, usize)> {
    let (base, lag) = name.rsplit_once("_prev")?;
    if base.is_empty() || lag.is_empty() || !lag.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    lag.parse().ok().map(|lag| (base, lag))
}

/// Product of channel factors, e.g. `abs(elevator)*qbar` or `sin(alpha_prev1)*qbar`.
#[derive(Debug, Clone, PartialEq)]
pub struct TermExpr {
    pub source: String,
    pub factors: Vec<TermFactor>,
}

impl TermExpr {
    pub fn evaluate(&self, log: &FlightLog) -> Result<Vec<f64>> {
        let mut result = vec![1.0; log.len()];
        for factor in &self.factors {
            for (r, v) in result.iter_mut().zip(factor.evaluate(log)?) {
                *r *= v;
            }
        }
        Ok(result)
    }
}

impl FromStr for TermExpr {
    type Err = SysIdError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| SysIdError::InvalidTerm {
            term: s.to_string(),
            reason: reason.to_string(),
        };

        let mut factors = Vec::new();
        for part in s.split('*').map(str::trim) {
            if part.is_empty() {
                return Err(invalid("empty factor"));
            }
            let factor = match part.split_once('(') {
                Some((func, rest)) => {
                    let inner = rest
                        .strip_suffix(')')
                        .ok_or_else(|| invalid("missing closing parenthesis"))?
                        .trim();
                    let func = match func.trim() {
                        "abs" => TermFn::Abs,
                        "sin" => TermFn::Sin,
                        "cos" => TermFn::Cos,
                        other => return Err(invalid(&format!("unknown function '{}'", other))),
                    };
                    if inner.is_empty() || inner.contains(['(', ')']) {
                        return Err(invalid("function argument must be a channel name"));
                    }
                    TermFactor {
                        name: inner.to_string(),
                        func: Some(func),
                    }
                }
                None if part.contains(')') => return Err(invalid("unbalanced parenthesis")),
                None => TermFactor {
                    name: part.to_string(),
                    func: None,
                },
            };
            factors.push(factor);
        }

        Ok(Self {
            source: s.to_string(),
            factors,
        })
    }
}

/// Builds per-condition training matrices from a flight log.
#[derive(Debug, Clone)]
pub struct TrainingDataBuilder {
    log: FlightLog,
    dt: f64,
    flying: Vec<bool>,
    rows: Vec<(String, Vec<f64>)>,
    condition_tolerance: f64,
}

impl TrainingDataBuilder {
    pub fn new(mut log: FlightLog, config: &SysIdConfig) -> Result<Self> {
        if config.invert_elevator {
            log.negate(ELEVATOR_CHANNEL)?;
        }
        if config.invert_rudder {
            log.negate(RUDDER_CHANNEL)?;
        }

        let dt = log.dt().or(config.dt).ok_or_else(|| {
            SysIdError::Config("log has no time channel and no dt is configured".into())
        })?;

        let flying = match config.flying_threshold() {
            Some(threshold) => threshold.mask(log.require(&threshold.channel)?),
            None => vec![true; log.len()],
        };
        debug!(
            "{} of {} samples flying",
            flying.iter().filter(|f| **f).count(),
            log.len()
        );

        let rows = config
            .train_states()
            .into_iter()
            .map(|name| {
                let values = name.parse::<TermExpr>()?.evaluate(&log)?;
                Ok((name, values))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            log,
            dt,
            flying,
            rows,
            condition_tolerance: config.condition_tolerance,
        })
    }

    pub fn log(&self) -> &FlightLog {
        &self.log
    }

    pub fn flying_samples(&self) -> usize {
        self.flying.iter().filter(|f| **f).count()
    }

    /// Samples that are flying and satisfy `condition`
    pub fn sample_mask(&self, condition: &FlightCondition) -> Result<Vec<bool>> {
        let lookups = condition
            .channels()
            .map(|c| Ok((c, self.log.require(c)?)))
            .collect::<Result<Vec<_>>>()?;

        (0..self.log.len())
            .map(|t| {
                if !self.flying[t] {
                    return Ok(false);
                }
                condition.matches(
                    |name| {
                        lookups
                            .iter()
                            .find(|(c, _)| *c == name)
                            .map(|(_, values)| values[t])
                    },
                    self.condition_tolerance,
                )
            })
            .collect()
    }
}

impl TrainingDataSource for TrainingDataBuilder {
    fn dt(&self) -> f64 {
        self.dt
    }

    fn training_matrix(&self, condition: &FlightCondition) -> Result<TrainingMatrix> {
        let mask = self.sample_mask(condition)?;
        let rows = self
            .rows
            .iter()
            .map(|(name, values)| {
                let kept = values
                    .iter()
                    .zip(&mask)
                    .filter(|(_, keep)| **keep)
                    .map(|(v, _)| *v)
                    .collect();
                (name.clone(), kept)
            })
            .collect();
        TrainingMatrix::from_rows(rows)
    }
}
