//! Name- and interface-keyed service registry with scope semantics
//! (`spec.md` §4.2).

mod registry;
mod scope;

pub use registry::{InterfaceId, ServiceRegistry, ServiceRegistryEntry};
pub use scope::{ScopeContext, ServiceScope};
