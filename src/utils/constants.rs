pub const KT_TO_MPS: f64 = 0.514_444_444; // knots -> m/s

// Default fixed wing "is flying" airspeed hysteresis
pub const WING_FLYING_ON_KT: f64 = 75.0;
pub const WING_FLYING_OFF_KT: f64 = 65.0;

pub const DEFAULT_AIRSPEED_CHANNEL: &str = "airspeed_mps";
pub const DEFAULT_TIME_CHANNEL: &str = "time";
pub const ELEVATOR_CHANNEL: &str = "elevator";
pub const RUDDER_CHANNEL: &str = "rudder";

pub const DEFAULT_CONDITION_TOLERANCE: f64 = 0.1; // predicate match band
pub const DEFAULT_SINGULAR_TOLERANCE: f64 = 1e-12; // relative to largest singular value
pub const DEFAULT_RECONSTRUCTION_TOLERANCE: f64 = 1e-6;
