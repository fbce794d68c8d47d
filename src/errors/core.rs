use thiserror::Error;

/// Invalid/missing configuration input, feeder failure, section setup failure.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("config: section '{section}' is not registered")]
    UnknownSection { section: String },

    #[error("config: duplicate section registration for '{section}' replaced the prior provider")]
    DuplicateSection { section: String },

    #[error("config: feeder '{feeder}' failed for section '{section}': {message}")]
    FeederFailed {
        feeder: String,
        section: String,
        message: String,
    },

    #[error("config: setup hook for section '{section}' failed: {message}")]
    SetupFailed { section: String, message: String },

    #[error("config: invalid value for field '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("config: missing required field '{field}': {message}")]
    MissingRequired { field: String, message: String },

    #[error("config: {0}")]
    Other(String),
}

/// Missing dependency module, circular dependency. Per `spec.md` §4.1,
/// dependency-resolution failure is fatal and aborts `Init` immediately.
#[derive(Debug, Error)]
pub enum DependencyError {
    #[error("failed to resolve module dependencies: module '{module}' depends on non-existent module '{dependency}'")]
    MissingDependency { module: String, dependency: String },

    #[error("failed to resolve module dependencies: circular dependency detected involving module '{module}'")]
    CircularDependency { module: String },
}

/// Required service not found, ambiguous interface match, invalid target
/// pointer, non-assignable type.
#[derive(Debug, Error)]
pub enum InjectionError {
    #[error("module '{module}' failed to resolve required service '{service}': not found")]
    RequiredServiceNotFound { module: String, service: String },

    #[error("module '{module}' failed to resolve service '{service}': ambiguous service for interface")]
    AmbiguousInterfaceMatch { module: String, service: String },

    #[error("invalid lookup target for service '{service}': target must be a pointer")]
    InvalidTarget { service: String },

    #[error("cannot assign service '{service}' to target type '{target_type}'")]
    NotAssignable { service: String, target_type: String },
}

/// Module `Init`/`Start`/`Stop` failure, constructor failure.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("module '{module}' failed to construct: {message}")]
    ConstructorFailed { module: String, message: String },

    #[error("module '{module}' failed to initialize: {message}")]
    InitFailed { module: String, message: String },

    #[error("module '{module}' failed to start: {message}")]
    StartFailed { module: String, message: String },

    #[error("module '{module}' failed to stop: {message}")]
    StopFailed { module: String, message: String },

    #[error("module '{module}' did not stop within the shutdown timeout")]
    StopTimedOut { module: String },

    #[error("invalid application state: expected '{expected}', found '{current}'")]
    InvalidState { current: String, expected: String },

    #[error("a logger capability is required: supply one with WithLogger or WithBaseApplication")]
    LoggerNotSet,
}

/// Duplicate registration without module context, invalid lookup target.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("service '{name}' is already registered and no owning module context is available")]
    AlreadyRegistered { name: String },

    #[error("service '{name}' not found")]
    NotFound { name: String },

    #[error("invalid lookup target for service '{name}': target must be a pointer")]
    InvalidTarget { name: String },

    #[error("transient service '{name}' may not depend on singleton service '{dependency}'")]
    IncompatibleScope { name: String, dependency: String },
}

/// Unknown tenant, missing section for tenant, invalid tenant guard config,
/// cross-tenant access denied.
#[derive(Debug, Error)]
pub enum TenantError {
    #[error("tenant '{tenant_id}' is not registered")]
    UnknownTenant { tenant_id: String },

    #[error("tenant '{tenant_id}' has no configuration for section '{section}'")]
    MissingSection { tenant_id: String, section: String },

    #[error("invalid tenant guard configuration: {message}")]
    InvalidGuardConfig { message: String },

    #[error("unknown tenant guard mode: '{mode}'")]
    UnknownGuardMode { mode: String },

    #[error("cross-tenant access denied: requester '{requester}' may not access '{target}'")]
    AccessDenied { requester: String, target: String },

    #[error("tenant config load failed for '{path}': {message}")]
    LoadFailed { path: String, message: String },
}

/// Static-field change rejected, reloadable module failure, cancellation
/// mid-reload. Concurrent calls serialize on a queue rather than erroring
/// (`spec.md` §5).
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("reload rejected: static field '{field}' in section '{section}' changed")]
    StaticFieldChanged { section: String, field: String },

    #[error("reload: reloadable module '{module}' failed: {message}")]
    ReloadableFailed { module: String, message: String },

    #[error("reload: canceled before it could complete")]
    Canceled,

    #[error("reload: backoff in effect, retry after {remaining_ms}ms")]
    BackoffActive { remaining_ms: u64 },

    #[error("reload: dynamic reload was not enabled for this application")]
    NotEnabled,
}

/// Observer delivery failure. Never propagated to the producer — captured
/// here purely so it can be logged with a typed shape.
#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("observer '{observer}' failed to handle event '{event_type}': {message}")]
    DeliveryFailed {
        observer: String,
        event_type: String,
        message: String,
    },
}
