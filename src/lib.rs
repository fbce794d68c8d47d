//! corekit: a runtime for composing independent modules into one process —
//! lifecycle, service registry, configuration, dynamic reload, multi-tenant
//! scoping, and observability, with no opinion on transport or storage.

pub mod application;
pub mod builder;
pub mod config;
pub mod errors;
pub mod foundation;
pub mod logging;
pub mod module;
pub mod observer;
pub mod reload;
pub mod secret;
pub mod service;
pub mod tenant;

pub use application::Application;
pub use builder::ApplicationBuilder;
pub use errors::{CompositeError, CoreError};
pub use foundation::{HealthAggregator, HealthReport, ModulePhase, ModuleState, RunState};
pub use module::{
    LifecycleContext, LifecycleEngine, Module, ModuleConstructor, ModuleCtx, ModuleRegistry,
    ProvidedService, RequiredService, ResolvedServices,
};
pub use observer::{event_types, Event, Observer, ObserverBus, ObserverHandle};
pub use reload::{ConfigChange, ReloadOrchestrator, ReloadOutcome, Reloadable};
pub use secret::{Maskable, SecretKind, SecretValue};
pub use service::{InterfaceId, ServiceRegistry, ServiceScope};
pub use tenant::{TenantConfigLoader, TenantGuard, TenantGuardMode, TenantGuardSettings, TenantRegistry};

/// Crate version, for diagnostics and `Health()` payloads.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
