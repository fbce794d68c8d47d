use crate::errors::ConfigurationError;
use std::any::Any;

/// A registered config section's typed payload, type-erased so the pipeline
/// can hold heterogeneous section types in one registry. Implemented via a
/// blanket impl for any `Serialize + DeserializeOwned` struct — there is no
/// struct-tag reflection in Rust, so section authors interact with this
/// through the concrete type via [`crate::config::ConfigPipeline::get_section`].
pub trait ConfigTarget: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn apply_json(&mut self, value: &serde_json::Value) -> Result<(), ConfigurationError>;
    fn to_json(&self) -> serde_json::Value;
    fn clone_target(&self) -> Box<dyn ConfigTarget>;
}

impl<T> ConfigTarget for T
where
    T: serde::Serialize + serde::de::DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn apply_json(&mut self, value: &serde_json::Value) -> Result<(), ConfigurationError> {
        let merged = merge_json(self.to_json(), value.clone());
        *self = serde_json::from_value(merged).map_err(|e| ConfigurationError::InvalidValue {
            field: std::any::type_name::<T>().to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn clone_target(&self) -> Box<dyn ConfigTarget> {
        Box::new(self.clone())
    }
}

/// Deep-merge `patch` over `base`: objects merge key-by-key, anything else
/// (scalars, arrays) is replaced wholesale by `patch`. Shared with the
/// tenant config loader, which merges base/environment/tenant files with
/// the identical rule (`spec.md` §4.5).
pub(crate) fn merge_json(base: serde_json::Value, patch: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match (base, patch) {
        (Value::Object(mut base_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                let merged = match base_map.remove(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, patch) => patch,
    }
}

/// `{field_path, dynamic}` — whether a leaf field may be changed by a
/// reload without restarting the owning module (`spec.md` §4.3). Hand-
/// authored per section at registration time, since Rust has no runtime
/// struct-tag reflection.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub field_path: String,
    pub dynamic: bool,
}

impl FieldDescriptor {
    pub fn dynamic(field_path: impl Into<String>) -> Self {
        Self {
            field_path: field_path.into(),
            dynamic: true,
        }
    }

    pub fn static_field(field_path: impl Into<String>) -> Self {
        Self {
            field_path: field_path.into(),
            dynamic: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Sample {
        host: String,
        port: u16,
    }

    #[test]
    fn apply_json_merges_partial_patch() {
        let mut sample = Sample {
            host: "localhost".into(),
            port: 8080,
        };
        sample
            .apply_json(&serde_json::json!({ "port": 9090 }))
            .unwrap();
        assert_eq!(
            sample,
            Sample {
                host: "localhost".into(),
                port: 9090
            }
        );
    }

    #[test]
    fn apply_json_rejects_wrong_shape() {
        let mut sample = Sample {
            host: "localhost".into(),
            port: 8080,
        };
        let err = sample
            .apply_json(&serde_json::json!({ "port": "not-a-number" }))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
    }
}
