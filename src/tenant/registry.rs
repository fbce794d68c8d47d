use crate::errors::TenantError;
use crate::logging::Logger;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Section-keyed configuration belonging to one tenant. Values are raw JSON
/// rather than typed `ConfigTarget`s: a tenant's sections are produced by
/// the file loader and consumed by lookup, never bound to a Rust struct the
/// way an application-root section is (`spec.md` §4.5).
pub type TenantSections = HashMap<String, serde_json::Value>;

/// A module that wants to react to tenant lifecycle events.
#[async_trait]
pub trait TenantAwareModule: Send + Sync {
    async fn on_tenant_registered(&self, tenant_id: &str);
    async fn on_tenant_removed(&self, tenant_id: &str);
}

/// Per-tenant configuration scoping (`spec.md` §4.5). Registration and
/// lookup are mutually exclusive over the tenant map; the aware-module list
/// is a separate lock so notification never blocks a concurrent lookup.
pub struct TenantRegistry {
    tenants: Mutex<HashMap<String, TenantSections>>,
    aware_modules: RwLock<Vec<Arc<dyn TenantAwareModule>>>,
    logger: Arc<dyn Logger>,
}

impl TenantRegistry {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            tenants: Mutex::new(HashMap::new()),
            aware_modules: RwLock::new(Vec::new()),
            logger,
        }
    }

    pub fn register_tenant_aware_module(&self, module: Arc<dyn TenantAwareModule>) {
        self.aware_modules.write().unwrap().push(module);
    }

    /// Merge `configs` into the tenant's existing section map, overwriting
    /// by section key, then notify every registered tenant-aware module.
    /// Registering the same tenant twice with disjoint section maps yields
    /// the union of both.
    pub async fn register_tenant(&self, id: &str, configs: TenantSections) {
        {
            let mut tenants = self.tenants.lock().unwrap();
            let entry = tenants.entry(id.to_string()).or_default();
            for (section, value) in configs {
                entry.insert(section, value);
            }
        }
        self.logger.info(
            "tenant registered",
            crate::fields!("tenant_id" => id),
        );
        let modules = self.aware_modules.read().unwrap().clone();
        for module in modules {
            module.on_tenant_registered(id).await;
        }
    }

    pub async fn remove_tenant(&self, id: &str) {
        self.tenants.lock().unwrap().remove(id);
        self.logger.info(
            "tenant removed",
            crate::fields!("tenant_id" => id),
        );
        let modules = self.aware_modules.read().unwrap().clone();
        for module in modules {
            module.on_tenant_removed(id).await;
        }
    }

    pub fn get_tenant_config(
        &self,
        id: &str,
        section: &str,
    ) -> Result<serde_json::Value, TenantError> {
        let tenants = self.tenants.lock().unwrap();
        let sections = tenants.get(id).ok_or_else(|| TenantError::UnknownTenant {
            tenant_id: id.to_string(),
        })?;
        sections
            .get(section)
            .cloned()
            .ok_or_else(|| TenantError::MissingSection {
                tenant_id: id.to_string(),
                section: section.to_string(),
            })
    }

    pub fn get_tenants(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tenants.lock().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tenants.lock().unwrap().contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::TracingLogger;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingModule {
        registered: Arc<AtomicUsize>,
        removed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TenantAwareModule for CountingModule {
        async fn on_tenant_registered(&self, _tenant_id: &str) {
            self.registered.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_tenant_removed(&self, _tenant_id: &str) {
            self.removed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn registry() -> TenantRegistry {
        TenantRegistry::new(Arc::new(TracingLogger::new()))
    }

    #[tokio::test]
    async fn duplicate_registration_merges_disjoint_sections() {
        let reg = registry();
        let mut first = HashMap::new();
        first.insert("srv".to_string(), serde_json::json!({ "port": 80 }));
        reg.register_tenant("acme", first).await;

        let mut second = HashMap::new();
        second.insert("db".to_string(), serde_json::json!({ "host": "x" }));
        reg.register_tenant("acme", second).await;

        assert_eq!(
            reg.get_tenant_config("acme", "srv").unwrap(),
            serde_json::json!({ "port": 80 })
        );
        assert_eq!(
            reg.get_tenant_config("acme", "db").unwrap(),
            serde_json::json!({ "host": "x" })
        );
    }

    #[tokio::test]
    async fn same_section_overwrites() {
        let reg = registry();
        let mut first = HashMap::new();
        first.insert("srv".to_string(), serde_json::json!({ "port": 80 }));
        reg.register_tenant("acme", first).await;

        let mut second = HashMap::new();
        second.insert("srv".to_string(), serde_json::json!({ "port": 8080 }));
        reg.register_tenant("acme", second).await;

        assert_eq!(
            reg.get_tenant_config("acme", "srv").unwrap(),
            serde_json::json!({ "port": 8080 })
        );
    }

    #[tokio::test]
    async fn unknown_tenant_and_section_are_errors() {
        let reg = registry();
        assert!(matches!(
            reg.get_tenant_config("ghost", "srv").unwrap_err(),
            TenantError::UnknownTenant { .. }
        ));

        let mut configs = HashMap::new();
        configs.insert("srv".to_string(), serde_json::json!({}));
        reg.register_tenant("acme", configs).await;
        assert!(matches!(
            reg.get_tenant_config("acme", "db").unwrap_err(),
            TenantError::MissingSection { .. }
        ));
    }

    #[tokio::test]
    async fn aware_modules_are_notified() {
        let reg = registry();
        let registered = Arc::new(AtomicUsize::new(0));
        let removed = Arc::new(AtomicUsize::new(0));
        reg.register_tenant_aware_module(Arc::new(CountingModule {
            registered: registered.clone(),
            removed: removed.clone(),
        }));

        reg.register_tenant("acme", HashMap::new()).await;
        reg.remove_tenant("acme").await;

        assert_eq!(registered.load(Ordering::SeqCst), 1);
        assert_eq!(removed.load(Ordering::SeqCst), 1);
        assert!(!reg.contains("acme"));
    }
}
