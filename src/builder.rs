//! Application builder: the library surface for assembling modules, config,
//! observers, and the optional tenant/reload layers into a runnable
//! [`crate::application::Application`] (`spec.md` §6, §4.8).

use crate::application::Application;
use crate::config::{ConfigPipeline, Feeder};
use crate::errors::{CoreError, LifecycleError};
use crate::foundation::RunState;
use crate::logging::Logger;
use crate::module::{LifecycleEngine, Module, ModuleRegistry};
use crate::observer::{Observer, ObserverBus};
use crate::reload::ReloadOrchestrator;
use crate::service::ServiceRegistry;
use crate::tenant::{TenantConfigLoader, TenantGuard, TenantGuardSettings, TenantRegistry};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

type ConfigDecorator = Box<dyn Fn(&ConfigPipeline) + Send + Sync>;

/// Builds an [`Application`]. A logger is mandatory unless a base
/// application is supplied to inherit one from (`spec.md` §6).
pub struct ApplicationBuilder {
    logger: Option<Arc<dyn Logger>>,
    modules: ModuleRegistry,
    feeders: Vec<Box<dyn Feeder>>,
    config_decorators: Vec<ConfigDecorator>,
    pending_observers: Vec<(Arc<dyn Observer>, Vec<String>)>,
    tenant_loader: Option<TenantConfigLoader>,
    tenant_guard_mode: Option<String>,
    tenant_guard_settings: TenantGuardSettings,
    dynamic_reload: bool,
    shutdown_timeout: Duration,
}

impl ApplicationBuilder {
    pub fn new() -> Self {
        Self {
            logger: None,
            modules: ModuleRegistry::new(),
            feeders: Vec::new(),
            config_decorators: Vec::new(),
            pending_observers: Vec::new(),
            tenant_loader: None,
            tenant_guard_mode: None,
            tenant_guard_settings: TenantGuardSettings::default(),
            dynamic_reload: false,
            shutdown_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Reuse an existing application's logger, so a fresh builder does not
    /// need its own `WithLogger` call (`spec.md` §6).
    pub fn with_base_application(mut self, base: &Application) -> Self {
        self.logger = Some(base.logger.clone());
        self
    }

    pub fn with_config_provider(mut self, feeder: Box<dyn Feeder>) -> Self {
        self.feeders.push(feeder);
        self
    }

    pub fn with_config_decorator(
        mut self,
        decorator: impl Fn(&ConfigPipeline) + Send + Sync + 'static,
    ) -> Self {
        self.config_decorators.push(Box::new(decorator));
        self
    }

    pub fn with_module(mut self, module: Box<dyn Module>) -> Self {
        self.modules.register(module);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.pending_observers.push((observer, Vec::new()));
        self
    }

    pub fn with_observer_filtered(
        mut self,
        observer: Arc<dyn Observer>,
        event_types: Vec<String>,
    ) -> Self {
        self.pending_observers.push((observer, event_types));
        self
    }

    pub fn with_tenant_aware(mut self, loader: TenantConfigLoader) -> Self {
        self.tenant_loader = Some(loader);
        self
    }

    pub fn with_tenant_guard_mode(mut self, mode: impl Into<String>) -> Self {
        self.tenant_guard_mode = Some(mode.into());
        self
    }

    pub fn with_tenant_guard_mode_config(mut self, settings: TenantGuardSettings) -> Self {
        self.tenant_guard_settings = settings;
        self
    }

    pub fn with_dynamic_reload(mut self) -> Self {
        self.dynamic_reload = true;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Application, CoreError> {
        let logger = self.logger.ok_or(LifecycleError::LoggerNotSet)?;

        let services = Arc::new(ServiceRegistry::new());
        // Published as `Arc<dyn Logger>` (double-boxed so the trait object
        // itself is the `Any`-erased payload); modules pull it back out via
        // `ctx.resolved.get::<Arc<dyn Logger>>("logger")`.
        services.register_instance(
            "logger",
            Arc::new(logger.clone()) as Arc<dyn Any + Send + Sync>,
            "<builder>",
            "ApplicationBuilder",
            vec![],
        )?;

        let observers = Arc::new(ObserverBus::new(logger.clone()));
        for (observer, event_types) in self.pending_observers {
            observers.register_observer(observer, event_types);
        }

        let config = Arc::new(ConfigPipeline::new(logger.clone()));
        for feeder in self.feeders {
            config.add_feeder(feeder);
        }
        for decorator in &self.config_decorators {
            decorator(&config);
        }

        let tenant_guard = if let Some(mode) = &self.tenant_guard_mode {
            let mut settings = self.tenant_guard_settings.clone();
            settings.mode = mode.clone();
            TenantGuard::from_settings(&settings)?.map(Arc::new)
        } else {
            None
        };

        let tenants = if self.tenant_loader.is_some() {
            Some(Arc::new(TenantRegistry::new(logger.clone())))
        } else {
            None
        };

        let engine = LifecycleEngine::new(
            self.modules,
            services.clone(),
            config.clone(),
            observers.clone(),
            logger.clone(),
        );

        let reload = if self.dynamic_reload {
            Some(Arc::new(ReloadOrchestrator::new(
                config.clone(),
                observers.clone(),
                logger.clone(),
            )))
        } else {
            None
        };

        Ok(Application {
            engine,
            services,
            config,
            observers,
            reload,
            tenants,
            tenant_guard,
            tenant_loader: self.tenant_loader,
            logger,
            state: RunState::Created,
            shutdown_signal: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            shutdown_timeout: self.shutdown_timeout,
        })
    }
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}
