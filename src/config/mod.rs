//! Typed configuration pipeline: feeders populate registered sections,
//! tracking per-field provenance and static/dynamic classification
//! (`spec.md` §4.3).

mod env_feeder;
mod feeder;
mod pipeline;
mod target;

pub use env_feeder::EnvFeeder;
pub use feeder::{FieldPopulation, Feeder};
pub use pipeline::{ConfigPipeline, ConfigSectionHandle, SetupHook};
pub use target::{ConfigTarget, FieldDescriptor};

pub(crate) use target::merge_json;
