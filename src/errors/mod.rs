//! Error taxonomy for every corekit subsystem.
//!
//! Each subsystem gets its own `thiserror` enum so call sites can match on
//! the specific failure shape; all of them fold into [`CoreError`] via
//! `#[from]` so the builder/application surface can return one type.

mod core;

pub use core::{
    ConfigurationError, DependencyError, InjectionError, LifecycleError, ObserverError,
    RegistryError, ReloadError, TenantError,
};

use thiserror::Error;

/// Top-level error type returned from the public application surface.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error(transparent)]
    Injection(#[from] InjectionError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Tenant(#[from] TenantError),

    #[error(transparent)]
    Reload(#[from] ReloadError),

    #[error(transparent)]
    Observer(#[from] ObserverError),

    #[error(transparent)]
    Composite(#[from] CompositeError),

    #[error("{0}")]
    Other(String),
}

impl CoreError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// A composite error joining every recoverable failure collected across a
/// phase (config registration, service injection, module init, ...), per
/// `spec.md` §7's "Init collects ... into one joined error" policy.
#[derive(Debug, Default)]
pub struct CompositeError {
    errors: Vec<CoreError>,
}

impl CompositeError {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn from_errors(errors: Vec<CoreError>) -> Self {
        Self { errors }
    }

    pub fn push(&mut self, error: impl Into<CoreError>) {
        self.errors.push(error.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[CoreError] {
        &self.errors
    }

    /// Fold into a `Result`: `Ok(())` if nothing was collected, else `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for CompositeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} error(s) occurred:", self.errors.len())?;
        for (i, e) in self.errors.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, e)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompositeError {}
