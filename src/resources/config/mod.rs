pub mod selection;
pub mod solver;
pub mod states;
pub mod sysid;

pub use selection::SelectorConfig;
pub use solver::{SolverConfig, SvdStrategy};
pub use states::{FlyingThreshold, StateNames, VehicleType};
pub use sysid::{SysIdConfig, SysIdConfigBuilder};
