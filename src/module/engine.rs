use super::context::LifecycleContext;
use super::contract::{Module, ModuleCtx, ResolvedServices};
use super::registry::ModuleRegistry;
use crate::config::ConfigPipeline;
use crate::errors::{CompositeError, CoreError, InjectionError, LifecycleError};
use crate::foundation::lifecycle::{ModulePhase, ModuleState};
use crate::logging::Logger;
use crate::observer::{event_types, Event, ObserverBus};
use crate::service::ServiceRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Drives a [`ModuleRegistry`] through the full `Init`/`Start`/`Stop`
/// lifecycle, resolving dependencies, injecting services, and aggregating
/// errors per `spec.md` §4.1.
pub struct LifecycleEngine {
    registry: ModuleRegistry,
    services: Arc<ServiceRegistry>,
    config: Arc<ConfigPipeline>,
    observers: Arc<ObserverBus>,
    logger: Arc<dyn Logger>,
    order: Vec<usize>,
    states: Vec<ModuleState>,
    started: Vec<usize>,
    lifecycle_ctx: Option<LifecycleContext>,
}

impl LifecycleEngine {
    pub fn new(
        registry: ModuleRegistry,
        services: Arc<ServiceRegistry>,
        config: Arc<ConfigPipeline>,
        observers: Arc<ObserverBus>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let states = vec![ModuleState::Registered; registry.len()];
        Self {
            registry,
            services,
            config,
            observers,
            logger,
            order: Vec::new(),
            states,
            started: Vec::new(),
            lifecycle_ctx: None,
        }
    }

    pub fn state_of(&self, idx: usize) -> &ModuleState {
        &self.states[idx]
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.registry.names()
    }

    /// Poll every module's self-reported health. Modules that return `None`
    /// are omitted (`spec.md` §6 `Health()`).
    pub fn health_snapshot(&self) -> Vec<crate::foundation::HealthReport> {
        (0..self.registry.len())
            .filter_map(|idx| self.registry.get(idx).health())
            .collect()
    }

    fn resolve_services_for(&self, idx: usize) -> Result<ResolvedServices, InjectionError> {
        let module = self.registry.get(idx);
        let mut resolved = ResolvedServices::new();
        for req in module.requires_services() {
            let found = if let Some(interface) = req.interface {
                self.services
                    .get_service_by_interface(interface, Some(&req.name))
                    .ok()
            } else {
                self.services.get(&req.name).map(|inst| (req.name.clone(), inst))
            };
            match found {
                Some((_, instance)) => resolved.insert(req.name.clone(), instance),
                None if !req.required => {}
                None => {
                    return Err(InjectionError::RequiredServiceNotFound {
                        module: module.name().to_string(),
                        service: req.name.clone(),
                    })
                }
            }
        }
        Ok(resolved)
    }

    /// `RegisterConfig` sweep, a single config feed pass, dependency
    /// resolution, then construct/init each module in order. Dependency
    /// resolution failure is fatal and is returned immediately, on its own.
    /// A missing required service is likewise a hard invariant and aborts
    /// the remaining sweep; a module's own `Init` failure is recorded and
    /// the sweep continues with independent subtrees.
    pub async fn init(&mut self) -> Result<(), CoreError> {
        for idx in 0..self.registry.len() {
            self.registry.get(idx).register_config(&self.config);
        }

        let mut composite = CompositeError::new();
        if let Err(e) = self.config.load() {
            composite.push(e);
        }

        let order = self.registry.resolve_order()?;
        self.order = order.clone();

        for idx in order {
            let module_name = self.registry.get(idx).name().to_string();

            let resolved = match self.resolve_services_for(idx) {
                Ok(resolved) => resolved,
                Err(e) => {
                    self.states[idx] = self.states[idx].fail(ModulePhase::Init);
                    self.logger.error(
                        "module init aborted: required service unavailable",
                        crate::fields!("module" => module_name.as_str(), "error" => e.to_string()),
                    );
                    composite.push(e);
                    break;
                }
            };

            if let Some(ctor) = self.registry.get(idx).constructor() {
                let original: Vec<String> = self
                    .registry
                    .get(idx)
                    .provides_services()
                    .into_iter()
                    .map(|s| s.name)
                    .collect();
                let replacement = ctor.construct(&resolved);
                let replacement_services: Vec<String> = replacement
                    .provides_services()
                    .into_iter()
                    .map(|s| s.name)
                    .collect();
                for svc in &original {
                    if !replacement_services.contains(svc) {
                        self.logger.warn(
                            "module reconstruction dropped a previously advertised service",
                            crate::fields!("module" => module_name.as_str(), "service" => svc.as_str()),
                        );
                    }
                }
                self.registry.replace(idx, replacement);
                self.states[idx] = ModuleState::Reconstructed;
            }

            let mut ctx = ModuleCtx {
                resolved,
                registry: &self.services,
                config: &self.config,
            };
            let module = self.registry.get_mut(idx);
            match module.init(&mut ctx).await {
                Ok(()) => {
                    self.states[idx] = ModuleState::Initialized;
                    self.observers.notify_observers(
                        &Event::new(event_types::MODULE_INITIALIZED, module_name.clone()),
                    );
                }
                Err(e) => {
                    self.states[idx] = self.states[idx].fail(ModulePhase::Init);
                    self.observers.notify_observers(
                        &Event::new(event_types::MODULE_FAILED, module_name.clone()).with_payload(
                            serde_json::json!({ "phase": "init", "error": e.to_string() }),
                        ),
                    );
                    composite.push(e);
                }
            }
        }

        composite.into_result().map_err(CoreError::from)
    }

    /// Invoke `Start` in initialization order. The first failure stops
    /// forward progress and unwinds already-started modules in reverse
    /// order before returning.
    pub async fn start(&mut self) -> Result<(), CoreError> {
        let ctx = LifecycleContext::new();
        self.lifecycle_ctx = Some(ctx.clone());
        let mut started = Vec::new();

        for idx in self.order.clone() {
            let module_name = self.registry.get(idx).name().to_string();
            let module = self.registry.get_mut(idx);
            match module.start(&ctx).await {
                Ok(()) => {
                    self.states[idx] = ModuleState::Started;
                    self.observers
                        .notify_observers(&Event::new(event_types::MODULE_STARTED, module_name.clone()));
                    started.push(idx);
                }
                Err(e) => {
                    self.states[idx] = self.states[idx].fail(ModulePhase::Start);
                    self.logger.error(
                        "module start failed, unwinding already-started modules",
                        crate::fields!("module" => module_name.as_str(), "error" => e.to_string()),
                    );
                    for &already in started.iter().rev() {
                        let _ = self.registry.get_mut(already).stop(&ctx).await;
                        self.states[already] = ModuleState::Stopped;
                    }
                    return Err(LifecycleError::StartFailed {
                        module: module_name,
                        message: e.to_string(),
                    }
                    .into());
                }
            }
        }

        self.started = started;
        Ok(())
    }

    /// Cancel the lifecycle context, then invoke `Stop` on every started
    /// module in reverse initialization order with a bounded per-module
    /// timeout, aggregating failures.
    pub async fn stop(&mut self, per_module_timeout: Duration) -> Result<(), CoreError> {
        let ctx = self.lifecycle_ctx.clone().unwrap_or_default();
        ctx.cancel();

        let mut composite = CompositeError::new();
        let started = std::mem::take(&mut self.started);
        for &idx in started.iter().rev() {
            let module_name = self.registry.get(idx).name().to_string();
            let module = self.registry.get_mut(idx);
            match tokio::time::timeout(per_module_timeout, module.stop(&ctx)).await {
                Ok(Ok(())) => {
                    self.states[idx] = ModuleState::Stopped;
                    self.observers
                        .notify_observers(&Event::new(event_types::MODULE_STOPPED, module_name));
                }
                Ok(Err(e)) => {
                    self.states[idx] = self.states[idx].fail(ModulePhase::Stop);
                    composite.push(LifecycleError::StopFailed {
                        module: module_name,
                        message: e.to_string(),
                    });
                }
                Err(_) => {
                    self.states[idx] = self.states[idx].fail(ModulePhase::Stop);
                    composite.push(LifecycleError::StopTimedOut { module: module_name });
                }
            }
        }

        composite.into_result().map_err(CoreError::from)
    }
}
