use super::registry::{TenantRegistry, TenantSections};
use crate::config::merge_json;
use crate::errors::TenantError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const ENV_VARS: &[&str] = &["APP_ENVIRONMENT", "ENVIRONMENT", "ENV"];
const EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// Loads per-tenant configuration from `<root>/base/tenants/*` and
/// `<root>/environments/<env>/tenants/*`, merging base then environment
/// overlay per tenant file (`spec.md` §4.5, §6 layout).
pub struct TenantConfigLoader {
    root: PathBuf,
    environment: String,
}

impl TenantConfigLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let environment = Self::detect_environment(&root);
        Self { root, environment }
    }

    pub fn with_environment(root: impl Into<PathBuf>, environment: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            environment: environment.into(),
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// `APP_ENVIRONMENT`, `ENVIRONMENT`, `ENV` in order; else the
    /// alphabetically first subdirectory of `environments/`; else `"dev"`.
    fn detect_environment(root: &Path) -> String {
        for var in ENV_VARS {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    return value;
                }
            }
        }
        let environments_dir = root.join("environments");
        if let Ok(entries) = std::fs::read_dir(&environments_dir) {
            let mut names: Vec<String> = entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_dir())
                .filter_map(|e| e.file_name().into_string().ok())
                .collect();
            names.sort();
            if let Some(first) = names.into_iter().next() {
                return first;
            }
        }
        "dev".to_string()
    }

    fn tenants_dir_files(dir: &Path) -> Vec<(String, PathBuf)> {
        let mut found = Vec::new();
        let Ok(entries) = std::fs::read_dir(dir) else {
            return found;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if !EXTENSIONS.contains(&ext) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            found.push((stem.to_string(), path));
        }
        found
    }

    fn read_value_file(path: &Path) -> Result<serde_json::Value, TenantError> {
        let content = std::fs::read_to_string(path).map_err(|e| TenantError::LoadFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let to_err = |e: String| TenantError::LoadFailed {
            path: path.display().to_string(),
            message: e,
        };
        if extension == "json" {
            serde_json::from_str(&content).map_err(|e| to_err(e.to_string()))
        } else {
            serde_yaml::from_str(&content).map_err(|e| to_err(e.to_string()))
        }
    }

    /// Discover tenant files, merge base + environment overlay per tenant,
    /// and produce one provider per declared (top-level) section per tenant.
    pub fn load(&self) -> Result<HashMap<String, TenantSections>, TenantError> {
        let base_dir = self.root.join("base").join("tenants");
        let env_dir = self
            .root
            .join("environments")
            .join(&self.environment)
            .join("tenants");

        let base_files: HashMap<String, PathBuf> = Self::tenants_dir_files(&base_dir).into_iter().collect();
        let env_files: HashMap<String, PathBuf> = Self::tenants_dir_files(&env_dir).into_iter().collect();

        let mut tenant_ids: Vec<String> = base_files.keys().chain(env_files.keys()).cloned().collect();
        tenant_ids.sort();
        tenant_ids.dedup();

        let mut result = HashMap::new();
        for tenant_id in tenant_ids {
            let base_value = match base_files.get(&tenant_id) {
                Some(path) => Self::read_value_file(path)?,
                None => serde_json::json!({}),
            };
            let env_value = match env_files.get(&tenant_id) {
                Some(path) => Self::read_value_file(path)?,
                None => serde_json::json!({}),
            };
            let merged = merge_json(base_value, env_value);
            let sections: TenantSections = match merged {
                serde_json::Value::Object(map) => map.into_iter().collect(),
                _ => TenantSections::new(),
            };
            result.insert(tenant_id, sections);
        }
        Ok(result)
    }

    /// Load and register every discovered tenant in one pass.
    pub async fn load_into(&self, registry: &TenantRegistry) -> Result<(), TenantError> {
        for (tenant_id, sections) in self.load()? {
            registry.register_tenant(&tenant_id, sections).await;
        }
        Ok(())
    }
}
