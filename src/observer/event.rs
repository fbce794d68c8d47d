use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A lifecycle event. `event_type` is a reverse-DNS string (`spec.md` §3/§6),
/// e.g. `com.corekit.module.started`. `payload` is an opaque map producers
/// and observers agree on out of band.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: Uuid,
    pub event_type: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
    pub correlation_id: Option<String>,
}

impl Event {
    pub fn new(event_type: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            source: source.into(),
            timestamp: Utc::now(),
            payload: serde_json::Value::Null,
            correlation_id: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

/// Reverse-DNS type strings for the built-in event catalog (`spec.md` §3/§4.6).
pub mod event_types {
    pub const MODULE_REGISTERED: &str = "com.corekit.module.registered";
    pub const MODULE_INITIALIZED: &str = "com.corekit.module.initialized";
    pub const MODULE_STARTED: &str = "com.corekit.module.started";
    pub const MODULE_STOPPED: &str = "com.corekit.module.stopped";
    pub const MODULE_FAILED: &str = "com.corekit.module.failed";
    pub const SERVICE_REGISTERED: &str = "com.corekit.service.registered";
    pub const SERVICE_UNREGISTERED: &str = "com.corekit.service.unregistered";
    pub const SERVICE_REQUESTED: &str = "com.corekit.service.requested";
    pub const CONFIG_LOADED: &str = "com.corekit.config.loaded";
    pub const CONFIG_VALIDATED: &str = "com.corekit.config.validated";
    pub const CONFIG_CHANGED: &str = "com.corekit.config.changed";
    pub const CONFIG_RELOAD_NOOP: &str = "com.corekit.config.reload.noop";
    pub const CONFIG_RELOAD_STARTED: &str = "com.corekit.config.reload.started";
    pub const CONFIG_RELOAD_SUCCESS: &str = "com.corekit.config.reload.success";
    pub const CONFIG_RELOAD_FAILED: &str = "com.corekit.config.reload.failed";
    pub const HEALTH_EVALUATED: &str = "com.corekit.health.evaluated";
    pub const APPLICATION_STARTED: &str = "com.corekit.application.started";
    pub const APPLICATION_STOPPED: &str = "com.corekit.application.stopped";
    pub const APPLICATION_FAILED: &str = "com.corekit.application.failed";
}
