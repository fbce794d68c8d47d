use crate::config::ConfigPipeline;
use crate::errors::LifecycleError;
use crate::service::{InterfaceId, ServiceRegistry};
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// A service a module intends to publish. Used during dependency resolution
/// to derive implicit edges before any module has actually run
/// (`spec.md` §4.1 step 2) — the module still has to publish the instance
/// itself from [`Module::init`].
#[derive(Debug, Clone)]
pub struct ProvidedService {
    pub name: String,
    pub interfaces: Vec<InterfaceId>,
}

impl ProvidedService {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interfaces: Vec::new(),
        }
    }

    pub fn implementing(mut self, interface: InterfaceId) -> Self {
        self.interfaces.push(interface);
        self
    }
}

/// A service a module needs resolved before `Init` runs.
#[derive(Debug, Clone)]
pub struct RequiredService {
    pub name: String,
    pub interface: Option<InterfaceId>,
    pub required: bool,
}

impl RequiredService {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interface: None,
            required: true,
        }
    }

    pub fn by_interface(name: impl Into<String>, interface: InterfaceId) -> Self {
        Self {
            name: name.into(),
            interface: Some(interface),
            required: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn match_by_interface(&self) -> bool {
        self.interface.is_some()
    }
}

/// Services resolved for one module's turn, keyed by the name it requested
/// them under in `requires_services`.
#[derive(Default)]
pub struct ResolvedServices {
    entries: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl ResolvedServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, instance: Arc<dyn Any + Send + Sync>) {
        self.entries.insert(name.into(), instance);
    }

    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.entries.get(name)?.clone().downcast::<T>().ok()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

/// What a module's turn sees during `Init`: its resolved dependencies, the
/// shared service registry (to publish its own services into), and the
/// configuration pipeline (to read its populated section from).
pub struct ModuleCtx<'a> {
    pub resolved: ResolvedServices,
    pub registry: &'a ServiceRegistry,
    pub config: &'a ConfigPipeline,
}

/// Replaces a module's stored instance with one built from its resolved
/// services, mirroring `spec.md` §4.1's `Constructor()` step. Implemented
/// separately from [`Module`] since it runs *before* the replacement
/// instance exists.
pub trait ModuleConstructor: Send + Sync {
    fn construct(&self, resolved: &ResolvedServices) -> Box<dyn Module>;
}

/// A unit of composition in the assembled runtime. Every method but `name`
/// has a no-op default, mirroring the spec's "each capability optional
/// except the base module" rule — a module always satisfies the full
/// trait, and simply declines the capabilities it doesn't use.
#[async_trait]
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    fn provides_services(&self) -> Vec<ProvidedService> {
        Vec::new()
    }

    fn requires_services(&self) -> Vec<RequiredService> {
        Vec::new()
    }

    fn register_config(&self, _pipeline: &ConfigPipeline) {}

    fn constructor(&self) -> Option<Arc<dyn ModuleConstructor>> {
        None
    }

    async fn init(&mut self, _ctx: &mut ModuleCtx<'_>) -> Result<(), LifecycleError> {
        Ok(())
    }

    async fn start(&mut self, _ctx: &crate::module::LifecycleContext) -> Result<(), LifecycleError> {
        Ok(())
    }

    async fn stop(&mut self, _ctx: &crate::module::LifecycleContext) -> Result<(), LifecycleError> {
        Ok(())
    }

    /// Self-reported health, polled on demand by `Application::health()`.
    /// `None` means the module has no opinion and is omitted from the
    /// aggregate rather than counted as healthy.
    fn health(&self) -> Option<crate::foundation::HealthReport> {
        None
    }
}
