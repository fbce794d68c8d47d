use super::backoff::Backoff;
use super::change::{diff_section, ConfigChange};
use crate::config::ConfigPipeline;
use crate::errors::ReloadError;
use crate::logging::Logger;
use crate::observer::{event_types, Event, ObserverBus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

/// A module-side capability: reacts to a dynamic-only config change.
#[async_trait]
pub trait Reloadable: Send + Sync {
    /// Section-key prefixes this reloadable cares about. A change whose
    /// section matches none of these is never passed to `reload`.
    fn interested_sections(&self) -> Vec<String>;

    async fn reload(&self, changes: &[ConfigChange]) -> Result<(), ReloadError>;
}

/// Outcome of one `request_reload` call.
#[derive(Debug)]
pub enum ReloadOutcome {
    NoOp,
    Applied(Vec<ConfigChange>),
}

/// Coordinates re-feeding configuration, diffing against the committed
/// snapshot, and invoking reloadable modules with the dynamic subset
/// (`spec.md` §4.4).
pub struct ReloadOrchestrator {
    config: Arc<ConfigPipeline>,
    observers: Arc<ObserverBus>,
    logger: Arc<dyn Logger>,
    reloadables: RwLock<Vec<(String, Arc<dyn Reloadable>)>>,
    backoff: Mutex<Backoff>,
    in_flight: tokio::sync::Mutex<()>,
}

impl ReloadOrchestrator {
    pub fn new(config: Arc<ConfigPipeline>, observers: Arc<ObserverBus>, logger: Arc<dyn Logger>) -> Self {
        Self {
            config,
            observers,
            logger,
            reloadables: RwLock::new(Vec::new()),
            backoff: Mutex::new(Backoff::default()),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    pub fn register_reloadable(&self, module_name: impl Into<String>, reloadable: Arc<dyn Reloadable>) {
        self.reloadables.write().unwrap().push((module_name.into(), reloadable));
    }

    pub fn set_backoff(&self, base: std::time::Duration, max: std::time::Duration) {
        self.backoff.lock().unwrap().set(base, max);
    }

    fn emit(&self, event_type: &str, payload: serde_json::Value) {
        self.observers
            .notify_observers(&Event::new(event_type, "reload-orchestrator").with_payload(payload));
    }

    fn snapshot(&self, keys: &[String]) -> Result<HashMap<String, serde_json::Value>, ReloadError> {
        let mut snap = HashMap::new();
        for key in keys {
            let section = self
                .config
                .get_section(key)
                .map_err(|_| ReloadError::ReloadableFailed {
                    module: "<pipeline>".to_string(),
                    message: format!("unknown section '{key}'"),
                })?;
            snap.insert(key.clone(), section.to_json());
        }
        Ok(snap)
    }

    /// `apply_raw` deep-merges, but since `value` is always a complete
    /// section snapshot, merging it back over the current state fully
    /// restores every leaf field.
    fn revert(&self, snapshot: &HashMap<String, serde_json::Value>) {
        for (key, value) in snapshot {
            let Ok(section) = self.config.get_section(key) else {
                continue;
            };
            if let Err(e) = section.apply_raw(value) {
                self.logger.error(
                    "failed to revert section after rejected reload",
                    crate::fields!("section" => key.as_str(), "error" => e.to_string()),
                );
            }
        }
    }

    /// Serialized reload: a concurrent call waits for the one in flight to
    /// finish, then re-evaluates against whatever state that call left
    /// behind, rather than failing outright (`spec.md` §5).
    pub async fn request_reload(
        &self,
        sections: Option<Vec<String>>,
        cancel: CancellationToken,
    ) -> Result<ReloadOutcome, ReloadError> {
        let _guard = self.in_flight.lock().await;

        {
            let backoff = self.backoff.lock().unwrap();
            if !backoff.ready() {
                return Err(ReloadError::BackoffActive {
                    remaining_ms: backoff.remaining().as_millis() as u64,
                });
            }
        }

        let targets = sections.unwrap_or_else(|| self.config.section_keys());
        let before = self.snapshot(&targets)?;

        if cancel.is_cancelled() {
            return self.fail_and_revert(&before, ReloadError::Canceled);
        }

        if let Err(e) = self.config.load() {
            let err = ReloadError::ReloadableFailed {
                module: "<pipeline>".to_string(),
                message: e.to_string(),
            };
            self.backoff.lock().unwrap().record_failure();
            self.emit(
                event_types::CONFIG_RELOAD_FAILED,
                serde_json::json!({ "reason": err.to_string() }),
            );
            return Err(err);
        }

        if cancel.is_cancelled() {
            return self.fail_and_revert(&before, ReloadError::Canceled);
        }

        let mut changes = Vec::new();
        for key in &targets {
            let section = self.config.get_section(key).map_err(|_| ReloadError::ReloadableFailed {
                module: "<pipeline>".to_string(),
                message: format!("unknown section '{key}'"),
            })?;
            let after = section.to_json();
            changes.extend(diff_section(key, &before[key], &after, &section.field_descriptors));
        }

        if changes.is_empty() {
            self.emit(event_types::CONFIG_RELOAD_NOOP, serde_json::Value::Null);
            return Ok(ReloadOutcome::NoOp);
        }

        if let Some(offending) = changes.iter().find(|c| !c.dynamic) {
            let err = ReloadError::StaticFieldChanged {
                section: offending.section.clone(),
                field: offending.field_path.clone(),
            };
            return self.fail_and_revert(&before, err);
        }

        self.emit(event_types::CONFIG_RELOAD_STARTED, serde_json::Value::Null);

        let reloadables = self.reloadables.read().unwrap().clone();
        for (name, reloadable) in &reloadables {
            if cancel.is_cancelled() {
                return self.fail_and_revert(&before, ReloadError::Canceled);
            }
            let relevant: Vec<ConfigChange> = changes
                .iter()
                .filter(|c| {
                    reloadable
                        .interested_sections()
                        .iter()
                        .any(|prefix| c.section == *prefix || c.section.starts_with(prefix.as_str()))
                })
                .cloned()
                .collect();
            if relevant.is_empty() {
                continue;
            }
            if let Err(e) = reloadable.reload(&relevant).await {
                let err = ReloadError::ReloadableFailed {
                    module: name.clone(),
                    message: e.to_string(),
                };
                return self.fail_and_revert(&before, err);
            }
        }

        self.backoff.lock().unwrap().record_success();
        self.emit(event_types::CONFIG_RELOAD_SUCCESS, serde_json::Value::Null);
        Ok(ReloadOutcome::Applied(changes))
    }

    fn fail_and_revert(
        &self,
        before: &HashMap<String, serde_json::Value>,
        err: ReloadError,
    ) -> Result<ReloadOutcome, ReloadError> {
        self.revert(before);
        self.backoff.lock().unwrap().record_failure();
        self.emit(
            event_types::CONFIG_RELOAD_FAILED,
            serde_json::json!({ "reason": err.to_string() }),
        );
        Err(err)
    }
}
