//! Small, dependency-free state types shared by every subsystem.

pub mod health;
pub mod lifecycle;

pub use health::{HealthAggregator, HealthReport};
pub use lifecycle::{ModulePhase, ModuleState, RunState};
