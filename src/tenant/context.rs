use crate::module::LifecycleContext;

/// Extract the tenant a lifecycle context is scoped to, if any (`spec.md`
/// §4.5 `GetTenantID`).
pub fn get_tenant_id(ctx: &LifecycleContext) -> Option<&str> {
    ctx.tenant_id()
}

/// Resolve the tenant-specific value for `section` out of `tenant_sections`
/// when `ctx` carries a tenant and that tenant has an override, falling
/// back to `default` otherwise. Mirrors the "tenant-aware view of a config
/// provider" described in `spec.md` §4.5 without requiring a trait object:
/// callers already have the typed default and the raw tenant override.
pub fn resolve_section<'a>(
    ctx: &LifecycleContext,
    tenant_sections: Option<&'a serde_json::Value>,
    default: &'a serde_json::Value,
) -> &'a serde_json::Value {
    match (get_tenant_id(ctx), tenant_sections) {
        (Some(_), Some(value)) => value,
        _ => default,
    }
}
