//! Scenario description, loading and execution.

mod config;
mod loader;
mod runner;

pub use config::{PatternSpec, ScenarioConfig, StepSpec};
pub use loader::ConfigError;
pub use runner::{Scenario, ScenarioReport, ScenarioRunner, ScenarioState, Step};
