//! Configuration Module
//!
//! Configuration loading for the simulator: environment settings and
//! optional JSON seed files.

mod seed_file;
mod settings;

pub use seed_file::{SeedFileError, load_seed_file};
pub use settings::{
    BroadcastSettings, ConfigError, SeedSettings, ServerSettings, SimulationSettings,
    SimulatorConfig, parse_clock_time,
};
