use crate::errors::TenantError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Cross-tenant access policy (`spec.md` §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantGuardMode {
    Strict,
    Lenient,
    Disabled,
}

impl TenantGuardMode {
    pub fn parse(mode: &str) -> Result<Self, TenantError> {
        match mode {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            "disabled" => Ok(Self::Disabled),
            other => Err(TenantError::UnknownGuardMode {
                mode: other.to_string(),
            }),
        }
    }
}

/// Raw settings as an application would configure them (e.g. from a config
/// section). Negative `violation_log_capacity` is the "invalid configuration"
/// case `spec.md` §4.5 says must be a silent no-op rather than an error.
#[derive(Debug, Clone, Default)]
pub struct TenantGuardSettings {
    pub mode: String,
    pub whitelist: HashMap<String, Vec<String>>,
    pub violation_log_capacity: i64,
}

/// One recorded cross-tenant access, in lenient mode or logged for audit.
#[derive(Debug, Clone)]
pub struct Violation {
    pub requester: String,
    pub target: String,
    pub recorded_at: DateTime<Utc>,
}

/// Decides whether a requester may reach a target resource scoped to
/// another tenant. `ValidateAccess` is the sole decision entry point; the
/// violation log is append-only and mutex-guarded (`spec.md` §5).
pub struct TenantGuard {
    mode: TenantGuardMode,
    whitelist: HashMap<String, Vec<String>>,
    violations: Mutex<Vec<Violation>>,
    capacity: usize,
}

impl TenantGuard {
    pub fn new(mode: TenantGuardMode, whitelist: HashMap<String, Vec<String>>) -> Self {
        Self {
            mode,
            whitelist,
            violations: Mutex::new(Vec::new()),
            capacity: usize::MAX,
        }
    }

    /// Build a guard from settings, honoring the "invalid config is a
    /// no-op" rule: a negative `violation_log_capacity` yields `Ok(None)`,
    /// meaning no guard should be registered at all. An unrecognized mode
    /// is a hard error.
    pub fn from_settings(settings: &TenantGuardSettings) -> Result<Option<Self>, TenantError> {
        let mode = TenantGuardMode::parse(&settings.mode)?;
        if settings.violation_log_capacity < 0 {
            return Ok(None);
        }
        Ok(Some(Self {
            mode,
            whitelist: settings.whitelist.clone(),
            violations: Mutex::new(Vec::new()),
            capacity: settings.violation_log_capacity as usize,
        }))
    }

    fn tenant_segment(target: &str) -> &str {
        target.split('/').next().unwrap_or(target)
    }

    fn whitelisted(&self, requester: &str, target_tenant: &str) -> bool {
        self.whitelist
            .get(requester)
            .map(|allowed| allowed.iter().any(|t| t == target_tenant))
            .unwrap_or(false)
    }

    fn record(&self, requester: &str, target: &str) {
        let mut violations = self.violations.lock().unwrap();
        if violations.len() >= self.capacity {
            violations.remove(0);
        }
        violations.push(Violation {
            requester: requester.to_string(),
            target: target.to_string(),
            recorded_at: Utc::now(),
        });
    }

    /// The single access decision entry point. `requester` is a tenant id;
    /// `target` is a resource path whose leading segment is its owning
    /// tenant (e.g. `"tenant/svc"`).
    pub fn validate_access(&self, requester: &str, target: &str) -> Result<bool, TenantError> {
        if self.mode == TenantGuardMode::Disabled {
            return Ok(true);
        }

        let target_tenant = Self::tenant_segment(target);
        if requester == target_tenant {
            return Ok(true);
        }

        match self.mode {
            TenantGuardMode::Disabled => unreachable!(),
            TenantGuardMode::Lenient => {
                self.record(requester, target);
                Ok(true)
            }
            TenantGuardMode::Strict => {
                if self.whitelisted(requester, target_tenant) {
                    Ok(true)
                } else {
                    self.record(requester, target);
                    Err(TenantError::AccessDenied {
                        requester: requester.to_string(),
                        target: target.to_string(),
                    })
                }
            }
        }
    }

    pub fn recent_violations(&self) -> Vec<Violation> {
        self.violations.lock().unwrap().clone()
    }
}
