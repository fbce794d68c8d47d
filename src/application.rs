//! The assembled runtime: owns the lifecycle engine, service registry,
//! config pipeline, observer bus, and the optional tenant/reload layers
//! (`spec.md` §4.8, §6).

use crate::config::{ConfigPipeline, ConfigSectionHandle, Feeder};
use crate::errors::{CoreError, LifecycleError, RegistryError};
use crate::foundation::{HealthAggregator, RunState};
use crate::logging::Logger;
use crate::module::LifecycleEngine;
use crate::observer::{event_types, Event, ObserverBus};
use crate::reload::{ReloadError, ReloadOrchestrator, ReloadOutcome};
use crate::service::ServiceRegistry;
use crate::tenant::{TenantConfigLoader, TenantGuard, TenantRegistry};
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The assembled application. Built exclusively through
/// [`crate::builder::ApplicationBuilder`].
pub struct Application {
    pub(crate) engine: LifecycleEngine,
    pub(crate) services: Arc<ServiceRegistry>,
    pub(crate) config: Arc<ConfigPipeline>,
    pub(crate) observers: Arc<ObserverBus>,
    pub(crate) reload: Option<Arc<ReloadOrchestrator>>,
    pub(crate) tenants: Option<Arc<TenantRegistry>>,
    pub(crate) tenant_guard: Option<Arc<TenantGuard>>,
    pub(crate) tenant_loader: Option<TenantConfigLoader>,
    pub(crate) logger: Arc<dyn Logger>,
    pub(crate) state: RunState,
    pub(crate) shutdown_signal: Arc<AtomicBool>,
    pub(crate) shutdown_timeout: Duration,
}

impl Application {
    pub fn logger(&self) -> Arc<dyn Logger> {
        self.logger.clone()
    }

    pub fn set_logger(&mut self, logger: Arc<dyn Logger>) {
        self.logger = logger;
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn require_state(&self, expected: RunState) -> Result<(), CoreError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(LifecycleError::InvalidState {
                current: self.state.to_string(),
                expected: expected.to_string(),
            }
            .into())
        }
    }

    /// Runs the full initialization sweep: `RegisterConfig` on every
    /// module, a single config feed pass, dependency resolution, then
    /// construct/`Init` each module in order (`spec.md` §4.1, §6 `Init()`).
    pub async fn init(&mut self) -> Result<(), CoreError> {
        self.require_state(RunState::Created)?;
        self.state = RunState::Initializing;

        if let Some(loader) = &self.tenant_loader {
            if let Some(tenants) = &self.tenants {
                if let Err(e) = loader.load_into(tenants).await {
                    self.state = RunState::Failed;
                    return Err(e.into());
                }
            }
        }

        match self.engine.init().await {
            Ok(()) => {
                self.state = RunState::Initialized;
                Ok(())
            }
            Err(e) => {
                self.state = RunState::Failed;
                self.observers.notify_observers(
                    &Event::new(event_types::APPLICATION_FAILED, "<application>")
                        .with_payload(serde_json::json!({ "phase": "init", "error": e.to_string() })),
                );
                Err(e)
            }
        }
    }

    /// Invokes `Start` on each startable module in initialization order
    /// (`spec.md` §6 `Start()`).
    pub async fn start(&mut self) -> Result<(), CoreError> {
        self.require_state(RunState::Initialized)?;
        self.state = RunState::Starting;

        match self.engine.start().await {
            Ok(()) => {
                self.state = RunState::Running;
                self.observers
                    .notify_observers(&Event::new(event_types::APPLICATION_STARTED, "<application>"));
                Ok(())
            }
            Err(e) => {
                self.state = RunState::Failed;
                self.observers.notify_observers(
                    &Event::new(event_types::APPLICATION_FAILED, "<application>")
                        .with_payload(serde_json::json!({ "phase": "start", "error": e.to_string() })),
                );
                Err(e)
            }
        }
    }

    /// Cancels the lifecycle context and invokes `Stop` on each started
    /// module in reverse order, bounded per-module by the configured
    /// shutdown timeout (`spec.md` §6 `Stop()`).
    pub async fn stop(&mut self) -> Result<(), CoreError> {
        self.state = RunState::Stopping;
        let result = self.engine.stop(self.shutdown_timeout).await;
        self.state = RunState::Stopped;
        self.observers
            .notify_observers(&Event::new(event_types::APPLICATION_STOPPED, "<application>"));
        result
    }

    /// `Init` + `Start`, then block until a termination signal or an
    /// internal shutdown request arrives, then `Stop` (`spec.md` §6 `Run()`).
    pub async fn run(&mut self) -> Result<(), CoreError> {
        self.init().await?;
        self.start().await?;

        let shutdown_signal = self.shutdown_signal.clone();
        #[cfg(unix)]
        {
            let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .map_err(|e| CoreError::other(e.to_string()))?;
            let mut interrupt = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
                .map_err(|e| CoreError::other(e.to_string()))?;
            tokio::select! {
                _ = terminate.recv() => {
                    self.logger.info("received SIGTERM, shutting down", &[]);
                }
                _ = interrupt.recv() => {
                    self.logger.info("received SIGINT, shutting down", &[]);
                }
                _ = Self::wait_for_shutdown_signal(shutdown_signal) => {
                    self.logger.info("shutdown requested, shutting down", &[]);
                }
            }
        }
        #[cfg(not(unix))]
        {
            Self::wait_for_shutdown_signal(shutdown_signal).await;
        }

        self.stop().await
    }

    async fn wait_for_shutdown_signal(signal: Arc<AtomicBool>) {
        loop {
            if signal.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Request an orderly shutdown of a running [`run`](Self::run) loop.
    pub fn request_shutdown(&self) {
        self.shutdown_signal.store(true, Ordering::SeqCst);
    }

    pub fn register_service<T: Send + Sync + 'static>(
        &self,
        name: &str,
        instance: Arc<T>,
    ) -> Result<String, RegistryError> {
        self.services
            .register_instance(name, instance as Arc<dyn Any + Send + Sync>, "<application>", "Application", vec![])
    }

    pub fn get_service<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, RegistryError> {
        self.services.get_typed::<T>(name)
    }

    pub fn register_config_section<T>(
        &self,
        key: &str,
        initial: T,
        is_pointer: bool,
        field_descriptors: Vec<crate::config::FieldDescriptor>,
    ) where
        T: serde::Serialize + serde::de::DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.config.register_section(key, initial, is_pointer, field_descriptors);
    }

    pub fn get_config_section(&self, key: &str) -> Result<ConfigSectionHandle, CoreError> {
        self.config.get_section(key).map_err(CoreError::from)
    }

    pub fn config_sections(&self) -> Vec<String> {
        self.config.section_keys()
    }

    pub fn add_config_provider(&self, feeder: Box<dyn Feeder>) {
        self.config.add_feeder(feeder);
    }

    pub fn reload_orchestrator(&self) -> Option<Arc<ReloadOrchestrator>> {
        self.reload.clone()
    }

    pub fn tenants(&self) -> Option<Arc<TenantRegistry>> {
        self.tenants.clone()
    }

    pub fn tenant_guard(&self) -> Option<Arc<TenantGuard>> {
        self.tenant_guard.clone()
    }

    /// Re-feed configuration and apply any dynamic changes, if dynamic
    /// reload was enabled at build time (`spec.md` §4.4, §6).
    pub async fn request_reload(&self, sections: Option<Vec<String>>) -> Result<ReloadOutcome, ReloadError> {
        let orchestrator = self.reload.as_ref().ok_or(ReloadError::NotEnabled)?;
        orchestrator.request_reload(sections, CancellationToken::new()).await
    }

    /// Poll every module's self-reported health and emit `HEALTH_EVALUATED`
    /// (`spec.md` §6 `Health()`).
    pub fn health(&self) -> HealthAggregator {
        let reports = self.engine.health_snapshot();
        let aggregator = HealthAggregator::new(reports);
        self.observers.notify_observers(
            &Event::new(event_types::HEALTH_EVALUATED, "<application>")
                .with_payload(serde_json::json!({ "healthy": aggregator.all_healthy() })),
        );
        aggregator
    }
}
