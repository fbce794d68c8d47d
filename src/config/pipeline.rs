use super::feeder::{FieldPopulation, Feeder};
use super::target::{ConfigTarget, FieldDescriptor};
use crate::errors::{CompositeError, ConfigurationError, CoreError};
use crate::logging::Logger;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub type SetupHook = Arc<dyn Fn(&mut dyn ConfigTarget) -> Result<(), ConfigurationError> + Send + Sync>;

struct RegisteredSection {
    is_pointer: bool,
    target: Arc<RwLock<Box<dyn ConfigTarget>>>,
    field_descriptors: Vec<FieldDescriptor>,
    setup: Option<SetupHook>,
}

/// A handle to a registered section's live, populated target. Cloning the
/// handle is cheap (it shares the underlying `Arc`); cloning the data out
/// requires going through [`ConfigPipeline::get_section_value`].
#[derive(Clone)]
pub struct ConfigSectionHandle {
    pub key: String,
    target: Arc<RwLock<Box<dyn ConfigTarget>>>,
    pub field_descriptors: Vec<FieldDescriptor>,
}

impl ConfigSectionHandle {
    pub fn value<T: Clone + Send + Sync + 'static>(&self) -> Result<T, ConfigurationError> {
        let guard = self.target.read().unwrap();
        guard
            .as_any()
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| ConfigurationError::Other(format!(
                "section '{}' target type mismatch",
                self.key
            )))
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.target.read().unwrap().to_json()
    }

    /// Overwrite the target with `value` (a deep-merge of a complete
    /// snapshot over the current state, which is equivalent to a replace).
    /// Used by the reload orchestrator to restore a rejected candidate.
    pub fn apply_raw(&self, value: &serde_json::Value) -> Result<(), ConfigurationError> {
        self.target.write().unwrap().apply_json(value)
    }
}

/// Populates typed config sections from an ordered list of feeders, exactly
/// once per `load` (`spec.md` §4.3). The sole call site that activates
/// feeders is [`ConfigPipeline::load`]; sections are only ever mutated there.
pub struct ConfigPipeline {
    sections: RwLock<HashMap<String, RegisteredSection>>,
    order: RwLock<Vec<String>>,
    feeders: RwLock<Vec<Box<dyn Feeder>>>,
    provenance: RwLock<HashMap<String, Vec<FieldPopulation>>>,
    logger: Arc<dyn Logger>,
}

impl ConfigPipeline {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            sections: RwLock::new(HashMap::new()),
            order: RwLock::new(Vec::new()),
            feeders: RwLock::new(Vec::new()),
            provenance: RwLock::new(HashMap::new()),
            logger,
        }
    }

    pub fn add_feeder(&self, feeder: Box<dyn Feeder>) {
        self.feeders.write().unwrap().push(feeder);
    }

    /// Bind `key` to a typed target. Duplicate registration replaces the
    /// prior provider (`spec.md` §4.3).
    pub fn register_section<T>(
        &self,
        key: &str,
        initial: T,
        is_pointer: bool,
        field_descriptors: Vec<FieldDescriptor>,
    ) where
        T: serde::Serialize + serde::de::DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.register_section_with_setup(key, initial, is_pointer, field_descriptors, None)
    }

    pub fn register_section_with_setup<T>(
        &self,
        key: &str,
        initial: T,
        is_pointer: bool,
        field_descriptors: Vec<FieldDescriptor>,
        setup: Option<SetupHook>,
    ) where
        T: serde::Serialize + serde::de::DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let mut sections = self.sections.write().unwrap();
        if sections
            .insert(
                key.to_string(),
                RegisteredSection {
                    is_pointer,
                    target: Arc::new(RwLock::new(Box::new(initial))),
                    field_descriptors,
                    setup,
                },
            )
            .is_some()
        {
            self.logger.warn(
                "config section registration replaced an existing provider",
                crate::fields!("section" => key),
            );
        } else {
            self.order.write().unwrap().push(key.to_string());
        }
    }

    pub fn get_section(&self, key: &str) -> Result<ConfigSectionHandle, ConfigurationError> {
        let sections = self.sections.read().unwrap();
        let section = sections
            .get(key)
            .ok_or_else(|| ConfigurationError::UnknownSection {
                section: key.to_string(),
            })?;
        Ok(ConfigSectionHandle {
            key: key.to_string(),
            target: section.target.clone(),
            field_descriptors: section.field_descriptors.clone(),
        })
    }

    pub fn section_keys(&self) -> Vec<String> {
        self.order.read().unwrap().clone()
    }

    pub fn provenance_for(&self, key: &str) -> Vec<FieldPopulation> {
        self.provenance
            .read()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Drive every feeder, in registration order, over a staging copy of
    /// every registered section's target, then commit. Per-section `Setup`
    /// hooks run after commit; their errors are collected and returned
    /// together rather than aborting the rest.
    pub fn load(&self) -> Result<(), CoreError> {
        let order = self.order.read().unwrap().clone();
        let mut staging: HashMap<String, Box<dyn ConfigTarget>> = HashMap::new();
        {
            let sections = self.sections.read().unwrap();
            for key in &order {
                let section = &sections[key];
                staging.insert(key.clone(), section.target.read().unwrap().clone_target());
            }
        }

        let mut provenance: HashMap<String, Vec<FieldPopulation>> = HashMap::new();

        let feeders = self.feeders.read().unwrap();
        for feeder in feeders.iter() {
            if feeder.supports_feed_key() {
                for key in &order {
                    let target = staging.get_mut(key).expect("staged section exists");
                    let populations = feeder.feed_key(key, target.as_mut()).map_err(|e| {
                        CoreError::Configuration(ConfigurationError::FeederFailed {
                            feeder: feeder.source_type().to_string(),
                            section: key.clone(),
                            message: e.to_string(),
                        })
                    })?;
                    provenance.entry(key.clone()).or_default().extend(populations);
                }
            } else {
                let populations = feeder.feed(&mut staging).map_err(|e| {
                    CoreError::Configuration(ConfigurationError::FeederFailed {
                        feeder: feeder.source_type().to_string(),
                        section: "<aggregate>".to_string(),
                        message: e.to_string(),
                    })
                })?;
                for population in populations {
                    provenance
                        .entry(population.field_path.split('.').next().unwrap_or("").to_string())
                        .or_default()
                        .push(population);
                }
            }
        }
        drop(feeders);

        // Commit. By-pointer sections mutate the existing shared target in
        // place, so every previously issued `ConfigSectionHandle` observes
        // the new state. By-value sections are committed by swapping in a
        // brand-new `Arc`, so a handle issued before this `load()` keeps
        // seeing the pre-reload snapshot it was handed (`spec.md` §4.3).
        {
            let mut sections = self.sections.write().unwrap();
            for (key, staged) in staging {
                let section = sections.get_mut(&key).expect("staged section exists");
                if section.is_pointer {
                    *section.target.write().unwrap() = staged;
                } else {
                    section.target = Arc::new(RwLock::new(staged));
                }
            }
        }

        *self.provenance.write().unwrap() = provenance;

        let mut setup_errors = Vec::new();
        let sections = self.sections.read().unwrap();
        for key in &order {
            let section = &sections[key];
            if let Some(setup) = &section.setup {
                let mut guard = section.target.write().unwrap();
                if let Err(e) = setup(guard.as_mut()) {
                    self.logger.error(
                        "config section setup hook failed",
                        crate::fields!("section" => key.as_str(), "error" => e.to_string()),
                    );
                    setup_errors.push(CoreError::Configuration(ConfigurationError::SetupFailed {
                        section: key.clone(),
                        message: e.to_string(),
                    }));
                }
            }
        }

        if setup_errors.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Composite(CompositeError::from_errors(setup_errors)))
        }
    }
}
