use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The cancelable context passed to `Start`/`Stop`. Cancellation fires when
/// `Application::stop` is called or a shutdown signal arrives
/// (`spec.md` §4.1). Optionally carries the `TenantID` a call is scoped to
/// (`spec.md` §4.5).
#[derive(Clone)]
pub struct LifecycleContext {
    token: CancellationToken,
    tenant_id: Option<Arc<str>>,
}

impl LifecycleContext {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tenant_id: None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn with_tenant_id(mut self, tenant_id: impl Into<Arc<str>>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }
}

impl Default for LifecycleContext {
    fn default() -> Self {
        Self::new()
    }
}
