use super::contract::Module;
use crate::errors::DependencyError;
use std::collections::HashMap;

/// Holds registered modules and computes their initialization order
/// (`spec.md` §4.1). Duplicate registration under the same name overwrites
/// the prior entry — a documented registration-time behavior, not a
/// runtime event.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Box<dyn Module>>,
    index_by_name: HashMap<String, usize>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: Box<dyn Module>) {
        let name = module.name().to_string();
        if let Some(&idx) = self.index_by_name.get(&name) {
            self.modules[idx] = module;
        } else {
            let idx = self.modules.len();
            self.index_by_name.insert(name, idx);
            self.modules.push(module);
        }
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    pub fn get(&self, idx: usize) -> &dyn Module {
        self.modules[idx].as_ref()
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut Box<dyn Module> {
        &mut self.modules[idx]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index_by_name.get(name).copied()
    }

    pub fn replace(&mut self, idx: usize, module: Box<dyn Module>) {
        self.modules[idx] = module;
    }

    /// Build the dependency graph — explicit `dependencies()` edges plus
    /// implicit edges derived from service contracts — and return a
    /// topological order. Cycles and missing explicit dependencies fail
    /// immediately (`spec.md` §4.1 step 1/3); an unmatched service
    /// dependency is *not* a resolution failure here, it is deferred to
    /// injection time.
    pub fn resolve_order(&self) -> Result<Vec<usize>, DependencyError> {
        let n = self.modules.len();
        let mut deps_of: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (idx, module) in self.modules.iter().enumerate() {
            for dep_name in module.dependencies() {
                let dep_idx = *self.index_by_name.get(&dep_name).ok_or_else(|| {
                    DependencyError::MissingDependency {
                        module: module.name().to_string(),
                        dependency: dep_name.clone(),
                    }
                })?;
                if !deps_of[idx].contains(&dep_idx) {
                    deps_of[idx].push(dep_idx);
                }
            }
        }

        for (idx, consumer) in self.modules.iter().enumerate() {
            for req in consumer.requires_services() {
                for (provider_idx, provider) in self.modules.iter().enumerate() {
                    if provider_idx == idx {
                        continue;
                    }
                    let satisfies = provider.provides_services().iter().any(|svc| {
                        if let Some(interface) = req.interface {
                            svc.interfaces.contains(&interface)
                        } else {
                            svc.name == req.name
                        }
                    });
                    if satisfies && !deps_of[idx].contains(&provider_idx) {
                        deps_of[idx].push(provider_idx);
                    }
                }
            }
        }

        let mut visited = vec![false; n];
        let mut temp_mark = vec![false; n];
        let mut order = Vec::with_capacity(n);
        for i in 0..n {
            if !visited[i] {
                self.visit(i, &deps_of, &mut visited, &mut temp_mark, &mut order)?;
            }
        }
        Ok(order)
    }

    fn visit(
        &self,
        idx: usize,
        deps_of: &[Vec<usize>],
        visited: &mut [bool],
        temp_mark: &mut [bool],
        order: &mut Vec<usize>,
    ) -> Result<(), DependencyError> {
        if temp_mark[idx] {
            return Err(DependencyError::CircularDependency {
                module: self.modules[idx].name().to_string(),
            });
        }
        if visited[idx] {
            return Ok(());
        }
        temp_mark[idx] = true;
        for &dep in &deps_of[idx] {
            self.visit(dep, deps_of, visited, temp_mark, order)?;
        }
        temp_mark[idx] = false;
        visited[idx] = true;
        order.push(idx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::contract::{ProvidedService, RequiredService};
    use async_trait::async_trait;

    struct Stub {
        name: &'static str,
        deps: Vec<String>,
        provides: Vec<ProvidedService>,
        requires: Vec<RequiredService>,
    }

    #[async_trait]
    impl Module for Stub {
        fn name(&self) -> &str {
            self.name
        }

        fn dependencies(&self) -> Vec<String> {
            self.deps.clone()
        }

        fn provides_services(&self) -> Vec<ProvidedService> {
            self.provides.clone()
        }

        fn requires_services(&self) -> Vec<RequiredService> {
            self.requires.clone()
        }
    }

    fn stub(name: &'static str, deps: &[&str]) -> Box<dyn Module> {
        Box::new(Stub {
            name,
            deps: deps.iter().map(|s| s.to_string()).collect(),
            provides: Vec::new(),
            requires: Vec::new(),
        })
    }

    #[test]
    fn explicit_dependencies_order_before_dependents() {
        let mut registry = ModuleRegistry::new();
        registry.register(stub("a", &[]));
        registry.register(stub("b", &["a"]));
        registry.register(stub("c", &["b", "a"]));

        let order = registry.resolve_order().unwrap();
        let pos = |name: &str| order.iter().position(|&i| registry.get(i).name() == name).unwrap();

        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
    }

    #[test]
    fn missing_dependency_fails() {
        let mut registry = ModuleRegistry::new();
        registry.register(stub("a", &["ghost"]));
        let err = registry.resolve_order().unwrap_err();
        assert!(matches!(err, DependencyError::MissingDependency { .. }));
    }

    #[test]
    fn circular_dependency_is_detected() {
        let mut registry = ModuleRegistry::new();
        registry.register(stub("a", &["b"]));
        registry.register(stub("b", &["a"]));
        let err = registry.resolve_order().unwrap_err();
        assert!(matches!(err, DependencyError::CircularDependency { .. }));
    }

    #[test]
    fn implicit_service_edge_orders_provider_first() {
        let mut registry = ModuleRegistry::new();
        registry.register(Box::new(Stub {
            name: "consumer",
            deps: Vec::new(),
            provides: Vec::new(),
            requires: vec![RequiredService::by_name("cache")],
        }));
        registry.register(Box::new(Stub {
            name: "provider",
            deps: Vec::new(),
            provides: vec![ProvidedService::new("cache")],
            requires: Vec::new(),
        }));

        let order = registry.resolve_order().unwrap();
        let pos = |name: &str| order.iter().position(|&i| registry.get(i).name() == name).unwrap();
        assert!(pos("provider") < pos("consumer"));
    }

    #[test]
    fn duplicate_registration_overwrites_in_place() {
        let mut registry = ModuleRegistry::new();
        registry.register(stub("a", &[]));
        registry.register(stub("a", &[]));
        assert_eq!(registry.len(), 1);
    }
}
