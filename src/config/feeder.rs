use super::target::ConfigTarget;
use crate::errors::ConfigurationError;
use std::collections::HashMap;

/// One leaf-field write reported by a field-tracking-enabled feeder
/// (`spec.md` §4.3). `instance_key` is set by instance-aware feeders (e.g.
/// environment variables keyed as `PREFIX_{INSTANCE}_{SUFFIX}`).
#[derive(Debug, Clone)]
pub struct FieldPopulation {
    pub field_path: String,
    pub value: serde_json::Value,
    pub source_type: String,
    pub source_key: String,
    pub instance_key: Option<String>,
}

impl FieldPopulation {
    pub fn new(
        field_path: impl Into<String>,
        value: serde_json::Value,
        source_type: impl Into<String>,
        source_key: impl Into<String>,
    ) -> Self {
        Self {
            field_path: field_path.into(),
            value,
            source_type: source_type.into(),
            source_key: source_key.into(),
            instance_key: None,
        }
    }

    pub fn with_instance_key(mut self, instance_key: impl Into<String>) -> Self {
        self.instance_key = Some(instance_key.into());
        self
    }
}

/// An input to the configuration pipeline. A feeder is either a **base**
/// feeder, driven once with the whole section aggregate, or a **per-section**
/// feeder, driven once per registered section via `feed_key` — signalled by
/// `supports_feed_key`.
pub trait Feeder: Send + Sync {
    fn source_type(&self) -> &str;

    fn supports_feed_key(&self) -> bool {
        false
    }

    fn feed_key(
        &self,
        _key: &str,
        _target: &mut dyn ConfigTarget,
    ) -> Result<Vec<FieldPopulation>, ConfigurationError> {
        Ok(Vec::new())
    }

    fn feed(
        &self,
        _sections: &mut HashMap<String, Box<dyn ConfigTarget>>,
    ) -> Result<Vec<FieldPopulation>, ConfigurationError> {
        Ok(Vec::new())
    }
}
