//! Example: service composition across modules
//!
//! Two modules compose through corekit's lifecycle: a `cache` module
//! publishes a service by name, a `gateway` module depends on it and
//! declares its own config section. Run with `cargo run --example
//! service_composition`.

use async_trait::async_trait;
use corekit::config::{ConfigPipeline, EnvFeeder, FieldDescriptor};
use corekit::errors::LifecycleError;
use corekit::logging::TracingLogger;
use corekit::module::{Module, ModuleCtx, ProvidedService, RequiredService};
use corekit::ApplicationBuilder;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

struct InMemoryCache {
    data: RwLock<HashMap<String, String>>,
}

impl InMemoryCache {
    #[allow(dead_code)]
    fn get(&self, key: &str) -> Option<String> {
        self.data.read().unwrap().get(key).cloned()
    }

    #[allow(dead_code)]
    fn set(&self, key: &str, value: String) {
        self.data.write().unwrap().insert(key.to_string(), value);
    }
}

struct CacheModule;

#[async_trait]
impl Module for CacheModule {
    fn name(&self) -> &str {
        "cache"
    }

    fn provides_services(&self) -> Vec<ProvidedService> {
        vec![ProvidedService::new("cache")]
    }

    async fn init(&mut self, ctx: &mut ModuleCtx<'_>) -> Result<(), LifecycleError> {
        let cache = Arc::new(InMemoryCache {
            data: RwLock::new(HashMap::new()),
        });
        ctx.registry
            .register_instance(
                "cache",
                cache as Arc<dyn Any + Send + Sync>,
                self.name(),
                "CacheModule",
                vec![],
            )
            .map_err(|e| LifecycleError::InitFailed {
                module: self.name().to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GatewayConfig {
    listen_addr: String,
    request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

struct GatewayModule;

#[async_trait]
impl Module for GatewayModule {
    fn name(&self) -> &str {
        "gateway"
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["cache".to_string()]
    }

    fn requires_services(&self) -> Vec<RequiredService> {
        vec![RequiredService::by_name("cache")]
    }

    fn register_config(&self, pipeline: &ConfigPipeline) {
        pipeline.register_section(
            "gateway",
            GatewayConfig::default(),
            false,
            vec![
                FieldDescriptor::dynamic("request_timeout_secs"),
                FieldDescriptor::static_field("listen_addr"),
            ],
        );
    }

    async fn init(&mut self, ctx: &mut ModuleCtx<'_>) -> Result<(), LifecycleError> {
        let section = ctx
            .config
            .get_section("gateway")
            .map_err(|e| LifecycleError::InitFailed {
                module: self.name().to_string(),
                reason: e.to_string(),
            })?;
        let config: GatewayConfig = section.value().map_err(|e| LifecycleError::InitFailed {
            module: self.name().to_string(),
            reason: e.to_string(),
        })?;
        let cache = ctx.resolved.get::<InMemoryCache>("cache");
        println!(
            "gateway listening on {} (timeout {}s, cache wired: {})",
            config.listen_addr,
            config.request_timeout_secs,
            cache.is_some()
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = ApplicationBuilder::new()
        .with_logger(Arc::new(TracingLogger::new()))
        .with_config_provider(Box::new(EnvFeeder::new("GATEWAY")))
        .with_module(Box::new(CacheModule))
        .with_module(Box::new(GatewayModule))
        .build()?;

    app.init().await?;
    app.start().await?;

    let health = app.health();
    println!("healthy: {}", health.all_healthy());

    app.stop().await?;
    Ok(())
}
