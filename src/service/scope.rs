use std::fmt;

/// Lifetime policy for a registered service (`spec.md` §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceScope {
    /// Factory invoked once; the same instance is returned thereafter.
    Singleton,
    /// Factory invoked on every `Get`; the instance is never cached.
    Transient,
    /// Factory invoked once per scope-key value extracted from the caller's
    /// context; cached under `(scope_key_name, scope_key_value, service_name)`.
    Scoped,
    /// The registered factory itself is the service; callers invoke it
    /// directly. The registry never caches its result.
    Factory,
}

impl ServiceScope {
    pub fn is_singleton(self) -> bool {
        matches!(self, ServiceScope::Singleton)
    }

    pub fn is_transient(self) -> bool {
        matches!(self, ServiceScope::Transient)
    }

    pub fn is_scoped(self) -> bool {
        matches!(self, ServiceScope::Scoped)
    }

    pub fn is_factory(self) -> bool {
        matches!(self, ServiceScope::Factory)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceScope::Singleton => "singleton",
            ServiceScope::Transient => "transient",
            ServiceScope::Scoped => "scoped",
            ServiceScope::Factory => "factory",
        }
    }
}

impl Default for ServiceScope {
    fn default() -> Self {
        ServiceScope::Singleton
    }
}

impl fmt::Display for ServiceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Key/value context a caller supplies to [`crate::service::ServiceRegistry`]
/// so a `Scoped` factory can be cached per scope-key value (e.g. per request,
/// per tenant).
#[derive(Debug, Clone, Default)]
pub struct ScopeContext {
    values: std::collections::HashMap<String, String>,
}

impl ScopeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}
