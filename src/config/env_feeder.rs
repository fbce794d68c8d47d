use super::feeder::{FieldPopulation, Feeder};
use super::target::ConfigTarget;
use crate::errors::ConfigurationError;
use std::collections::HashMap;

/// Reference [`Feeder`] that populates a section from `{PREFIX}_{KEY}`
/// environment variables, e.g. `DB_HOST`/`DB_PORT` for prefix `DB`. Offered
/// as a convenience, not a product-grade config source — concrete parsers
/// remain external collaborators per `spec.md` §1.
///
/// [`EnvFeeder::with_instances`] builds the instance-aware variant instead:
/// it reads `{PREFIX}_{INSTANCE}_{SUFFIX}` per named instance and writes
/// each instance's fields under `instances.{instance}` in the target,
/// tagging every population with its instance key (`spec.md` §4.3, §6).
pub struct EnvFeeder {
    prefix: String,
    instances: Vec<String>,
}

impl EnvFeeder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            instances: Vec::new(),
        }
    }

    pub fn with_instances(prefix: impl Into<String>, instances: Vec<String>) -> Self {
        Self {
            prefix: prefix.into(),
            instances,
        }
    }

    fn collect(&self) -> HashMap<String, String> {
        let marker = format!("{}_", self.prefix.to_uppercase());
        std::env::vars()
            .filter_map(|(k, v)| {
                let upper = k.to_uppercase();
                upper
                    .strip_prefix(&marker)
                    .map(|field| (field.to_lowercase(), v))
            })
            .collect()
    }

    fn collect_for_instance(&self, instance: &str) -> HashMap<String, String> {
        let marker = format!("{}_{}_", self.prefix.to_uppercase(), instance.to_uppercase());
        std::env::vars()
            .filter_map(|(k, v)| {
                let upper = k.to_uppercase();
                upper
                    .strip_prefix(&marker)
                    .map(|field| (field.to_lowercase(), v))
            })
            .collect()
    }

    /// Environment variables are always strings; infer the JSON scalar type
    /// so they can merge into typed (non-string) target fields.
    fn coerce(raw: &str) -> serde_json::Value {
        if let Ok(i) = raw.parse::<i64>() {
            return serde_json::Value::from(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return serde_json::Value::from(f);
        }
        if let Ok(b) = raw.parse::<bool>() {
            return serde_json::Value::from(b);
        }
        serde_json::Value::String(raw.to_string())
    }
}

impl Feeder for EnvFeeder {
    fn source_type(&self) -> &str {
        "env"
    }

    fn supports_feed_key(&self) -> bool {
        true
    }

    fn feed_key(
        &self,
        key: &str,
        target: &mut dyn ConfigTarget,
    ) -> Result<Vec<FieldPopulation>, ConfigurationError> {
        if self.instances.is_empty() {
            let vars = self.collect();
            if vars.is_empty() {
                return Ok(Vec::new());
            }
            let patch: serde_json::Map<String, serde_json::Value> = vars
                .iter()
                .map(|(k, v)| (k.clone(), Self::coerce(v)))
                .collect();
            target.apply_json(&serde_json::Value::Object(patch))?;

            return Ok(vars
                .into_iter()
                .map(|(field, value)| {
                    let coerced = Self::coerce(&value);
                    FieldPopulation::new(
                        format!("{key}.{field}"),
                        coerced,
                        "env",
                        format!("{}_{}", self.prefix.to_uppercase(), field.to_uppercase()),
                    )
                })
                .collect());
        }

        let mut populations = Vec::new();
        for instance in &self.instances {
            let vars = self.collect_for_instance(instance);
            if vars.is_empty() {
                continue;
            }
            let inner: serde_json::Map<String, serde_json::Value> = vars
                .iter()
                .map(|(k, v)| (k.clone(), Self::coerce(v)))
                .collect();
            let mut instances_map = serde_json::Map::new();
            instances_map.insert(instance.clone(), serde_json::Value::Object(inner));
            let mut patch = serde_json::Map::new();
            patch.insert("instances".to_string(), serde_json::Value::Object(instances_map));
            target.apply_json(&serde_json::Value::Object(patch))?;

            populations.extend(vars.into_iter().map(|(field, value)| {
                FieldPopulation::new(
                    format!("{key}.instances.{instance}.{field}"),
                    Self::coerce(&value),
                    "env",
                    format!(
                        "{}_{}_{}",
                        self.prefix.to_uppercase(),
                        instance.to_uppercase(),
                        field.to_uppercase()
                    ),
                )
                .with_instance_key(instance.clone())
            }));
        }
        Ok(populations)
    }
}
