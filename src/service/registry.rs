use super::scope::{ScopeContext, ServiceScope};
use crate::errors::RegistryError;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// `TypeId` of a caller-defined marker trait used for interface-based
/// lookup (`spec.md` §4.2, `GetServicesByInterface`).
pub type InterfaceId = TypeId;

type AnyArc = Arc<dyn Any + Send + Sync>;
type FactoryFn = dyn Fn(&ScopeContext) -> AnyArc + Send + Sync;

enum EntryKind {
    Instance(AnyArc),
    Factory {
        factory: Arc<FactoryFn>,
        singleton_cache: Mutex<Option<AnyArc>>,
        scoped_cache: Mutex<HashMap<(String, String), AnyArc>>,
    },
}

/// A single published service: its actual name, owning module, declared
/// interfaces, and scope policy.
pub struct ServiceRegistryEntry {
    pub actual_name: String,
    pub providing_module: String,
    pub providing_module_type: String,
    pub interfaces: Vec<InterfaceId>,
    pub scope: ServiceScope,
    pub scope_key: Option<String>,
    pub depends_on: Vec<String>,
    kind: EntryKind,
}

impl ServiceRegistryEntry {
    /// Resolve the instance this entry yields for `ctx`, applying its scope
    /// policy. `Factory`-scoped entries return the factory's own product,
    /// same as any other scope, because callers that want the raw factory
    /// use [`ServiceRegistry::get_factory`] instead.
    fn resolve(&self, ctx: &ScopeContext) -> AnyArc {
        match &self.kind {
            EntryKind::Instance(instance) => instance.clone(),
            EntryKind::Factory {
                factory,
                singleton_cache,
                scoped_cache,
            } => match self.scope {
                ServiceScope::Singleton => {
                    let mut cache = singleton_cache.lock().unwrap();
                    if let Some(existing) = cache.as_ref() {
                        return existing.clone();
                    }
                    let created = factory(ctx);
                    *cache = Some(created.clone());
                    created
                }
                ServiceScope::Scoped => {
                    let key_name = self.scope_key.as_deref().unwrap_or_default();
                    let key_value = ctx.get(key_name).unwrap_or_default().to_string();
                    let mut cache = scoped_cache.lock().unwrap();
                    let cache_key = (key_name.to_string(), key_value);
                    if let Some(existing) = cache.get(&cache_key) {
                        return existing.clone();
                    }
                    let created = factory(ctx);
                    cache.insert(cache_key, created.clone());
                    created
                }
                ServiceScope::Transient | ServiceScope::Factory => factory(ctx),
            },
        }
    }
}

/// Name- and interface-keyed service registry (`spec.md` §4.2). Services are
/// published under a stable "actual name": if the requested name collides,
/// a unique name is derived by appending `.{providing-module}`, then
/// `.{providing-module-type}`, then `.{counter}` — the first free form wins.
pub struct ServiceRegistry {
    entries: RwLock<HashMap<String, ServiceRegistryEntry>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn derive_actual_name(
        requested_name: &str,
        providing_module: &str,
        providing_module_type: &str,
        existing: &HashMap<String, ServiceRegistryEntry>,
    ) -> Option<String> {
        if !existing.contains_key(requested_name) {
            return Some(requested_name.to_string());
        }
        let by_module = format!("{requested_name}.{providing_module}");
        if !existing.contains_key(&by_module) {
            return Some(by_module);
        }
        let by_type = format!("{requested_name}.{providing_module_type}");
        if !existing.contains_key(&by_type) {
            return Some(by_type);
        }
        let mut counter = 1usize;
        loop {
            let candidate = format!("{requested_name}.{counter}");
            if !existing.contains_key(&candidate) {
                return Some(candidate);
            }
            counter += 1;
            if counter > existing.len() + 1 {
                return None;
            }
        }
    }

    fn check_scope_compatibility(
        scope: ServiceScope,
        depends_on: &[String],
        existing: &HashMap<String, ServiceRegistryEntry>,
    ) -> Result<(), RegistryError> {
        if scope != ServiceScope::Transient {
            return Ok(());
        }
        for dep in depends_on {
            if let Some(entry) = existing.get(dep) {
                if entry.scope == ServiceScope::Singleton {
                    return Err(RegistryError::IncompatibleScope {
                        name: dep.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Publish a ready-made instance. Always singleton-equivalent: the same
    /// `Arc` is returned on every `Get`.
    pub fn register_instance(
        &self,
        requested_name: &str,
        instance: AnyArc,
        providing_module: &str,
        providing_module_type: &str,
        interfaces: Vec<InterfaceId>,
    ) -> Result<String, RegistryError> {
        let mut entries = self.entries.write().unwrap();
        let actual_name = Self::derive_actual_name(
            requested_name,
            providing_module,
            providing_module_type,
            &entries,
        )
        .ok_or_else(|| RegistryError::AlreadyRegistered {
            name: requested_name.to_string(),
        })?;
        entries.insert(
            actual_name.clone(),
            ServiceRegistryEntry {
                actual_name: actual_name.clone(),
                providing_module: providing_module.to_string(),
                providing_module_type: providing_module_type.to_string(),
                interfaces,
                scope: ServiceScope::Singleton,
                scope_key: None,
                depends_on: Vec::new(),
                kind: EntryKind::Instance(instance),
            },
        );
        Ok(actual_name)
    }

    /// Publish a factory under an explicit scope policy. `scope_key` is
    /// required (and only meaningful) for [`ServiceScope::Scoped`].
    #[allow(clippy::too_many_arguments)]
    pub fn register_factory(
        &self,
        requested_name: &str,
        factory: Arc<FactoryFn>,
        scope: ServiceScope,
        scope_key: Option<String>,
        providing_module: &str,
        providing_module_type: &str,
        interfaces: Vec<InterfaceId>,
        depends_on: Vec<String>,
    ) -> Result<String, RegistryError> {
        let mut entries = self.entries.write().unwrap();
        Self::check_scope_compatibility(scope, &depends_on, &entries)?;
        let actual_name = Self::derive_actual_name(
            requested_name,
            providing_module,
            providing_module_type,
            &entries,
        )
        .ok_or_else(|| RegistryError::AlreadyRegistered {
            name: requested_name.to_string(),
        })?;
        entries.insert(
            actual_name.clone(),
            ServiceRegistryEntry {
                actual_name: actual_name.clone(),
                providing_module: providing_module.to_string(),
                providing_module_type: providing_module_type.to_string(),
                interfaces,
                scope,
                scope_key,
                depends_on,
                kind: EntryKind::Factory {
                    factory,
                    singleton_cache: Mutex::new(None),
                    scoped_cache: Mutex::new(HashMap::new()),
                },
            },
        );
        Ok(actual_name)
    }

    pub fn get(&self, name: &str) -> Option<AnyArc> {
        self.get_with_context(name, &ScopeContext::new())
    }

    pub fn get_with_context(&self, name: &str, ctx: &ScopeContext) -> Option<AnyArc> {
        let entries = self.entries.read().unwrap();
        entries.get(name).map(|entry| entry.resolve(ctx))
    }

    /// Typed retrieval. Fails if no service is registered under `name`, or
    /// if the stored instance cannot be assigned to `T`.
    pub fn get_typed<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, RegistryError> {
        self.get_typed_with_context(name, &ScopeContext::new())
    }

    pub fn get_typed_with_context<T: Send + Sync + 'static>(
        &self,
        name: &str,
        ctx: &ScopeContext,
    ) -> Result<Arc<T>, RegistryError> {
        let instance = self
            .get_with_context(name, ctx)
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })?;
        instance
            .downcast::<T>()
            .map_err(|_| RegistryError::InvalidTarget {
                name: name.to_string(),
            })
    }

    /// All entries whose declared interfaces include `interface`. Entries
    /// whose resolution fails are skipped defensively rather than propagated.
    pub fn get_services_by_interface(&self, interface: InterfaceId) -> Vec<(String, AnyArc)> {
        let entries = self.entries.read().unwrap();
        let ctx = ScopeContext::new();
        let mut exact = Vec::new();
        let mut others = Vec::new();
        for entry in entries.values() {
            if !entry.interfaces.contains(&interface) {
                continue;
            }
            let instance = entry.resolve(&ctx);
            if entry.actual_name == entry.providing_module {
                exact.push((entry.actual_name.clone(), instance));
            } else {
                others.push((entry.actual_name.clone(), instance));
            }
        }
        exact.extend(others);
        exact
    }

    /// Single-result interface lookup with the tie-break rule: among
    /// ambiguous candidates, prefer the one whose actual name exactly
    /// matches the requested name.
    pub fn get_service_by_interface(
        &self,
        interface: InterfaceId,
        preferred_name: Option<&str>,
    ) -> Result<(String, AnyArc), RegistryError> {
        let candidates = self.get_services_by_interface(interface);
        if candidates.is_empty() {
            return Err(RegistryError::NotFound {
                name: preferred_name.unwrap_or("<interface>").to_string(),
            });
        }
        if candidates.len() == 1 {
            return Ok(candidates.into_iter().next().unwrap());
        }
        if let Some(name) = preferred_name {
            if let Some(exact) = candidates.iter().find(|(n, _)| n == name) {
                return Ok(exact.clone());
            }
        }
        Err(RegistryError::InvalidTarget {
            name: preferred_name.unwrap_or("<interface>").to_string(),
        })
    }

    pub fn get_services_by_module(&self, module_name: &str) -> Vec<String> {
        let entries = self.entries.read().unwrap();
        entries
            .values()
            .filter(|e| e.providing_module == module_name)
            .map(|e| e.actual_name.clone())
            .collect()
    }

    /// A snapshot copy; mutating the returned map never affects the registry.
    pub fn as_flat_map(&self) -> HashMap<String, AnyArc> {
        let entries = self.entries.read().unwrap();
        let ctx = ScopeContext::new();
        entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.resolve(&ctx)))
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().unwrap().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read().unwrap();
        f.debug_struct("ServiceRegistry")
            .field("services", &entries.len())
            .finish()
    }
}
