use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::utils::{
    SysIdError, DEFAULT_AIRSPEED_CHANNEL, KT_TO_MPS, WING_FLYING_OFF_KT, WING_FLYING_ON_KT,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    #[default]
    #[serde(alias = "fixed-wing")]
    Wing,
    #[serde(alias = "multirotor")]
    Quad,
}

impl VehicleType {
    /// Fixed wing aircraft are "flying" above a stall-ish airspeed; multirotor
    /// logs are used as recorded.
    pub fn default_flying_threshold(&self) -> Option<FlyingThreshold> {
        match self {
            VehicleType::Wing => Some(FlyingThreshold {
                channel: DEFAULT_AIRSPEED_CHANNEL.to_string(),
                on: WING_FLYING_ON_KT * KT_TO_MPS,
                off: WING_FLYING_OFF_KT * KT_TO_MPS,
            }),
            VehicleType::Quad => None,
        }
    }
}

impl FromStr for VehicleType {
    type Err = SysIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wing" | "fixed-wing" => Ok(VehicleType::Wing),
            "quad" | "multirotor" => Ok(VehicleType::Quad),
            other => Err(SysIdError::Config(format!(
                "unknown vehicle type '{}', use wing or quad",
                other
            ))),
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleType::Wing => write!(f, "wing"),
            VehicleType::Quad => write!(f, "quad"),
        }
    }
}

/// Hysteresis on a single channel: flying starts above `on` and ends below `off`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlyingThreshold {
    pub channel: String,
    pub on: f64,
    pub off: f64,
}

impl FlyingThreshold {
    pub fn mask(&self, values: &[f64]) -> Vec<bool> {
        let mut flying = false;
        values
            .iter()
            .map(|&v| {
                if flying && v < self.off {
                    flying = false;
                } else if !flying && v > self.on {
                    flying = true;
                }
                flying
            })
            .collect()
    }
}

/// Named state groups of the vehicle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateNames {
    /// Pilot / autopilot inputs
    #[serde(default)]
    pub inceptors: Vec<String>,
    /// Directly sensed or converted states
    #[serde(default)]
    pub direct: Vec<String>,
    /// States to predict
    pub outputs: Vec<String>,
}

impl StateNames {
    /// Full state vector: inceptors, direct states, then outputs.
    pub fn state_list(&self) -> Vec<String> {
        self.inceptors
            .iter()
            .chain(&self.direct)
            .chain(&self.outputs)
            .cloned()
            .collect()
    }
}
