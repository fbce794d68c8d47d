//! Integration tests for the module lifecycle runtime: dependency
//! resolution, service injection, config sections, dynamic reload, and
//! secret handling, driven end to end through `Application`.

use async_trait::async_trait;
use corekit::config::{ConfigTarget, Feeder, FieldDescriptor, FieldPopulation};
use corekit::errors::{CoreError, DependencyError, InjectionError, LifecycleError};
use corekit::logging::TracingLogger;
use corekit::module::{LifecycleContext, Module, ModuleCtx, ProvidedService, RequiredService};
use corekit::reload::{ConfigChange, Reloadable};
use corekit::secret::SecretValue;
use corekit::service::InterfaceId;
use corekit::{ApplicationBuilder, RunState};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

fn logger() -> Arc<TracingLogger> {
    Arc::new(TracingLogger::new())
}

/// A module with no capabilities beyond its name, explicit dependencies,
/// and recording its own init/stop into a shared order log.
struct NamedModule {
    name: String,
    deps: Vec<String>,
    order: Arc<Mutex<Vec<String>>>,
}

impl NamedModule {
    fn new(name: &str, deps: &[&str], order: Arc<Mutex<Vec<String>>>) -> Box<dyn Module> {
        Box::new(Self {
            name: name.to_string(),
            deps: deps.iter().map(|s| s.to_string()).collect(),
            order,
        })
    }
}

#[async_trait]
impl Module for NamedModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<String> {
        self.deps.clone()
    }

    async fn init(&mut self, _ctx: &mut ModuleCtx<'_>) -> Result<(), LifecycleError> {
        self.order.lock().unwrap().push(self.name.clone());
        Ok(())
    }

    async fn stop(&mut self, _ctx: &LifecycleContext) -> Result<(), LifecycleError> {
        self.order.lock().unwrap().push(format!("stop:{}", self.name));
        Ok(())
    }
}

#[tokio::test]
async fn linear_init_order_respects_explicit_dependencies() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut app = ApplicationBuilder::new()
        .with_logger(logger())
        .with_module(NamedModule::new("a", &[], order.clone()))
        .with_module(NamedModule::new("c", &["b"], order.clone()))
        .with_module(NamedModule::new("b", &["a"], order.clone()))
        .build()
        .unwrap();

    app.init().await.unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    assert_eq!(app.state(), RunState::Initialized);
}

#[tokio::test]
async fn zero_modules_init_start_stop_are_noops() {
    let mut app = ApplicationBuilder::new().with_logger(logger()).build().unwrap();

    app.init().await.unwrap();
    app.start().await.unwrap();
    app.stop().await.unwrap();

    assert_eq!(app.state(), RunState::Stopped);
}

#[tokio::test]
async fn circular_dependency_aborts_init_with_no_module_initialized() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut app = ApplicationBuilder::new()
        .with_logger(logger())
        .with_module(NamedModule::new("a", &["b"], order.clone()))
        .with_module(NamedModule::new("b", &["a"], order.clone()))
        .build()
        .unwrap();

    let err = app.init().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Dependency(DependencyError::CircularDependency { .. })
    ));
    assert!(order.lock().unwrap().is_empty());
    assert_eq!(app.state(), RunState::Failed);
}

#[tokio::test]
async fn missing_explicit_dependency_is_a_dependency_error() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut app = ApplicationBuilder::new()
        .with_logger(logger())
        .with_module(NamedModule::new("a", &["ghost"], order))
        .build()
        .unwrap();

    let err = app.init().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Dependency(DependencyError::MissingDependency { .. })
    ));
}

#[tokio::test]
async fn stop_order_is_exact_reverse_of_start_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut app = ApplicationBuilder::new()
        .with_logger(logger())
        .with_module(NamedModule::new("a", &[], order.clone()))
        .with_module(NamedModule::new("b", &["a"], order.clone()))
        .with_module(NamedModule::new("c", &["b"], order.clone()))
        .build()
        .unwrap();

    app.init().await.unwrap();
    order.lock().unwrap().clear();
    app.start().await.unwrap();
    app.stop().await.unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["stop:c", "stop:b", "stop:a"]);
}

// --- service injection -------------------------------------------------

trait HandleFunc: Send + Sync {
    fn handle(&self) -> &str;
}

struct Router;

impl HandleFunc for Router {
    fn handle(&self) -> &str {
        "routed"
    }
}

fn handle_func_interface() -> InterfaceId {
    std::any::TypeId::of::<dyn HandleFunc>()
}

struct ProviderModule;

#[async_trait]
impl Module for ProviderModule {
    fn name(&self) -> &str {
        "provider"
    }

    fn provides_services(&self) -> Vec<ProvidedService> {
        vec![ProvidedService::new("router.service")]
    }

    async fn init(&mut self, ctx: &mut ModuleCtx<'_>) -> Result<(), LifecycleError> {
        ctx.registry
            .register_instance(
                "router.service",
                Arc::new(Router) as Arc<dyn Any + Send + Sync>,
                "provider",
                "ProviderModule",
                vec![],
            )
            .map_err(|e| LifecycleError::InitFailed {
                module: "provider".into(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}

struct ConsumerModule {
    injected: Arc<Mutex<Option<Arc<dyn Any + Send + Sync>>>>,
}

#[async_trait]
impl Module for ConsumerModule {
    fn name(&self) -> &str {
        "consumer"
    }

    fn requires_services(&self) -> Vec<RequiredService> {
        vec![RequiredService::by_name("router.service")]
    }

    async fn init(&mut self, ctx: &mut ModuleCtx<'_>) -> Result<(), LifecycleError> {
        let instance = ctx.resolved.get::<Router>("router.service");
        *self.injected.lock().unwrap() = instance.map(|r| r as Arc<dyn Any + Send + Sync>);
        Ok(())
    }
}

#[tokio::test]
async fn service_injection_resolves_regardless_of_registration_order() {
    let injected = Arc::new(Mutex::new(None));
    let mut app = ApplicationBuilder::new()
        .with_logger(logger())
        .with_module(Box::new(ConsumerModule {
            injected: injected.clone(),
        }))
        .with_module(Box::new(ProviderModule))
        .build()
        .unwrap();

    app.init().await.unwrap();

    assert!(injected.lock().unwrap().is_some());
}

#[tokio::test]
async fn required_service_missing_fails_init() {
    struct NeedsGhost;

    #[async_trait]
    impl Module for NeedsGhost {
        fn name(&self) -> &str {
            "needs-ghost"
        }

        fn requires_services(&self) -> Vec<RequiredService> {
            vec![RequiredService::by_name("ghost")]
        }
    }

    let mut app = ApplicationBuilder::new()
        .with_logger(logger())
        .with_module(Box::new(NeedsGhost))
        .build()
        .unwrap();

    let err = app.init().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Injection(InjectionError::RequiredServiceNotFound { .. })
    ));
}

#[tokio::test]
async fn optional_service_missing_still_initializes() {
    struct WantsGhost;

    #[async_trait]
    impl Module for WantsGhost {
        fn name(&self) -> &str {
            "wants-ghost"
        }

        fn requires_services(&self) -> Vec<RequiredService> {
            vec![RequiredService::by_name("ghost").optional()]
        }
    }

    let mut app = ApplicationBuilder::new()
        .with_logger(logger())
        .with_module(Box::new(WantsGhost))
        .build()
        .unwrap();

    app.init().await.unwrap();
    assert_eq!(app.state(), RunState::Initialized);
}

#[tokio::test]
async fn interface_match_with_differing_actual_name_resolves() {
    struct InterfaceProvider;

    #[async_trait]
    impl Module for InterfaceProvider {
        fn name(&self) -> &str {
            "interface-provider"
        }

        fn provides_services(&self) -> Vec<ProvidedService> {
            vec![ProvidedService::new("custom.router").implementing(handle_func_interface())]
        }

        async fn init(&mut self, ctx: &mut ModuleCtx<'_>) -> Result<(), LifecycleError> {
            ctx.registry
                .register_instance(
                    "custom.router",
                    Arc::new(Router) as Arc<dyn Any + Send + Sync>,
                    "interface-provider",
                    "InterfaceProvider",
                    vec![handle_func_interface()],
                )
                .unwrap();
            Ok(())
        }
    }

    struct InterfaceConsumer {
        found: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Module for InterfaceConsumer {
        fn name(&self) -> &str {
            "interface-consumer"
        }

        fn requires_services(&self) -> Vec<RequiredService> {
            vec![RequiredService::by_interface("router", handle_func_interface())]
        }

        async fn init(&mut self, ctx: &mut ModuleCtx<'_>) -> Result<(), LifecycleError> {
            self.found
                .store(ctx.resolved.get::<Router>("router").is_some(), Ordering::SeqCst);
            Ok(())
        }
    }

    let found = Arc::new(AtomicBool::new(false));
    let mut app = ApplicationBuilder::new()
        .with_logger(logger())
        .with_module(Box::new(InterfaceConsumer { found: found.clone() }))
        .with_module(Box::new(InterfaceProvider))
        .build()
        .unwrap();

    app.init().await.unwrap();
    assert!(found.load(Ordering::SeqCst));
}

// --- config sections ----------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
struct SrvConfig {
    port: u16,
}

struct PortFeeder;

impl Feeder for PortFeeder {
    fn source_type(&self) -> &str {
        "test-port"
    }

    fn supports_feed_key(&self) -> bool {
        true
    }

    fn feed_key(
        &self,
        key: &str,
        target: &mut dyn ConfigTarget,
    ) -> Result<Vec<FieldPopulation>, corekit::errors::ConfigurationError> {
        if key == "srv" {
            target.apply_json(&serde_json::json!({ "port": 8080 }))?;
        }
        Ok(vec![FieldPopulation::new(
            "srv.port",
            serde_json::json!(8080),
            "test-port",
            "inline",
        )])
    }
}

struct ConfigSectionModule;

#[async_trait]
impl Module for ConfigSectionModule {
    fn name(&self) -> &str {
        "config-section"
    }

    fn register_config(&self, pipeline: &corekit::config::ConfigPipeline) {
        pipeline.register_section("srv", SrvConfig::default(), true, vec![]);
    }
}

#[tokio::test]
async fn config_section_by_value_target_populates_from_feeder() {
    let mut app = ApplicationBuilder::new()
        .with_logger(logger())
        .with_module(Box::new(ConfigSectionModule))
        .with_config_provider(Box::new(PortFeeder))
        .build()
        .unwrap();

    app.init().await.unwrap();

    let section = app.get_config_section("srv").unwrap();
    let value: SrvConfig = section.value().unwrap();
    assert_eq!(value, SrvConfig { port: 8080 });
}

// --- dynamic reload ------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
struct ServerConfig {
    host: String,
    timeout: u32,
}

struct SwitchFeeder {
    host: Arc<Mutex<String>>,
    timeout: Arc<AtomicU32>,
}

impl Feeder for SwitchFeeder {
    fn source_type(&self) -> &str {
        "switch"
    }

    fn supports_feed_key(&self) -> bool {
        true
    }

    fn feed_key(
        &self,
        key: &str,
        target: &mut dyn ConfigTarget,
    ) -> Result<Vec<FieldPopulation>, corekit::errors::ConfigurationError> {
        if key == "server" {
            let host = self.host.lock().unwrap().clone();
            let timeout = self.timeout.load(Ordering::SeqCst);
            target.apply_json(&serde_json::json!({ "host": host, "timeout": timeout }))?;
        }
        Ok(Vec::new())
    }
}

struct RecordingReloadable {
    changes: Arc<Mutex<Vec<ConfigChange>>>,
}

#[async_trait]
impl Reloadable for RecordingReloadable {
    fn interested_sections(&self) -> Vec<String> {
        vec!["server".to_string()]
    }

    async fn reload(&self, changes: &[ConfigChange]) -> Result<(), corekit::errors::ReloadError> {
        self.changes.lock().unwrap().extend_from_slice(changes);
        Ok(())
    }
}

fn server_module() -> Box<dyn Module> {
    struct ServerModule;

    #[async_trait]
    impl Module for ServerModule {
        fn name(&self) -> &str {
            "server"
        }

        fn register_config(&self, pipeline: &corekit::config::ConfigPipeline) {
            pipeline.register_section(
                "server",
                ServerConfig::default(),
                true,
                vec![
                    FieldDescriptor::static_field("host"),
                    FieldDescriptor::dynamic("timeout"),
                ],
            );
        }
    }

    Box::new(ServerModule)
}

#[tokio::test]
async fn dynamic_only_change_applies_and_invokes_reloadable() {
    let host = Arc::new(Mutex::new("a".to_string()));
    let timeout = Arc::new(AtomicU32::new(5));
    let changes = Arc::new(Mutex::new(Vec::new()));

    let mut app = ApplicationBuilder::new()
        .with_logger(logger())
        .with_module(server_module())
        .with_config_provider(Box::new(SwitchFeeder {
            host: host.clone(),
            timeout: timeout.clone(),
        }))
        .with_dynamic_reload()
        .build()
        .unwrap();

    app.init().await.unwrap();
    app.reload_orchestrator()
        .unwrap()
        .register_reloadable("server", Arc::new(RecordingReloadable { changes: changes.clone() }));

    timeout.store(10, Ordering::SeqCst);
    let outcome = app.request_reload(None).await.unwrap();
    assert!(matches!(outcome, corekit::reload::ReloadOutcome::Applied(_)));

    let section = app.get_config_section("server").unwrap();
    let value: ServerConfig = section.value().unwrap();
    assert_eq!(value.timeout, 10);
    assert_eq!(changes.lock().unwrap().len(), 1);
    assert_eq!(changes.lock().unwrap()[0].field_path, "timeout");
}

#[tokio::test]
async fn static_field_change_is_rejected_and_reverted() {
    let host = Arc::new(Mutex::new("a".to_string()));
    let timeout = Arc::new(AtomicU32::new(5));

    let mut app = ApplicationBuilder::new()
        .with_logger(logger())
        .with_module(server_module())
        .with_config_provider(Box::new(SwitchFeeder {
            host: host.clone(),
            timeout: timeout.clone(),
        }))
        .with_dynamic_reload()
        .build()
        .unwrap();

    app.init().await.unwrap();

    *host.lock().unwrap() = "b".to_string();
    let err = app.request_reload(None).await.unwrap_err();
    assert!(matches!(err, corekit::errors::ReloadError::StaticFieldChanged { .. }));

    let section = app.get_config_section("server").unwrap();
    let value: ServerConfig = section.value().unwrap();
    assert_eq!(value.host, "a");
}

#[tokio::test]
async fn reload_with_no_field_changes_is_a_noop() {
    let host = Arc::new(Mutex::new("a".to_string()));
    let timeout = Arc::new(AtomicU32::new(5));

    let mut app = ApplicationBuilder::new()
        .with_logger(logger())
        .with_module(server_module())
        .with_config_provider(Box::new(SwitchFeeder { host, timeout }))
        .with_dynamic_reload()
        .build()
        .unwrap();

    app.init().await.unwrap();
    let before = app.get_config_section("server").unwrap().to_json();

    let outcome = app.request_reload(None).await.unwrap();
    assert!(matches!(outcome, corekit::reload::ReloadOutcome::NoOp));

    let after = app.get_config_section("server").unwrap().to_json();
    assert_eq!(before, after);
}

#[tokio::test]
async fn reload_requires_dynamic_reload_enabled_at_build_time() {
    let mut app = ApplicationBuilder::new().with_logger(logger()).build().unwrap();
    app.init().await.unwrap();

    let err = app.request_reload(None).await.unwrap_err();
    assert!(matches!(err, corekit::errors::ReloadError::NotEnabled));
}

// --- secrets --------------------------------------------------------------

#[test]
fn secret_value_never_leaks_through_standard_formatting() {
    let secret = SecretValue::new_password("hunter2");

    assert_eq!(format!("{secret}"), "[PASSWORD]");
    assert!(!format!("{secret:?}").contains("hunter2"));

    let json = serde_json::to_string(&secret).unwrap();
    assert!(json.contains("[PASSWORD]"));
    assert!(!json.contains("hunter2"));
}

// --- health ----------------------------------------------------------------

#[tokio::test]
async fn health_aggregates_self_reported_module_status() {
    struct HealthyModule;

    #[async_trait]
    impl Module for HealthyModule {
        fn name(&self) -> &str {
            "healthy"
        }

        fn health(&self) -> Option<corekit::foundation::HealthReport> {
            Some(corekit::foundation::HealthReport::healthy("healthy"))
        }
    }

    let mut app = ApplicationBuilder::new()
        .with_logger(logger())
        .with_module(Box::new(HealthyModule))
        .build()
        .unwrap();

    app.init().await.unwrap();
    let aggregator = app.health();
    assert!(aggregator.all_healthy());
}

// --- builder misuse ---------------------------------------------------------

#[tokio::test]
async fn starting_before_init_is_rejected() {
    let mut app = ApplicationBuilder::new().with_logger(logger()).build().unwrap();
    let err = app.start().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Lifecycle(LifecycleError::InvalidState { .. })
    ));
}
