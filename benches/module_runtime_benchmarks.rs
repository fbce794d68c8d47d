//! Performance benchmarks for the module lifecycle runtime: dependency
//! resolution and a full init/start/stop sweep at various graph sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use async_trait::async_trait;
use corekit::errors::LifecycleError;
use corekit::logging::TracingLogger;
use corekit::config::ConfigPipeline;
use corekit::module::{LifecycleEngine, Module, ModuleCtx, ModuleRegistry};
use corekit::observer::ObserverBus;
use corekit::service::ServiceRegistry;
use corekit::ApplicationBuilder;
use std::sync::Arc;

struct BenchModule {
    name: String,
    deps: Vec<String>,
}

#[async_trait]
impl Module for BenchModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<String> {
        self.deps.clone()
    }

    async fn init(&mut self, _ctx: &mut ModuleCtx<'_>) -> Result<(), LifecycleError> {
        Ok(())
    }
}

fn linear_chain(size: usize) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    for i in 0..size {
        let deps = if i == 0 {
            Vec::new()
        } else {
            vec![format!("module-{}", i - 1)]
        };
        registry.register(Box::new(BenchModule {
            name: format!("module-{i}"),
            deps,
        }));
    }
    registry
}

fn benchmark_topological_sorting(c: &mut Criterion) {
    let mut group = c.benchmark_group("topological_sorting");

    for module_count in [10usize, 50, 100, 200, 500, 1000] {
        group.bench_with_input(
            BenchmarkId::new("linear_chain", module_count),
            &module_count,
            |b, &size| {
                b.iter_batched(
                    || linear_chain(size),
                    |registry| {
                        black_box(registry.resolve_order().unwrap());
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

fn benchmark_complete_lifecycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("complete_lifecycle");

    for module_count in [10usize, 50, 100, 200] {
        group.bench_with_input(
            BenchmarkId::new("init_start_stop", module_count),
            &module_count,
            |b, &size| {
                b.to_async(&rt).iter_batched(
                    || {
                        let logger = Arc::new(TracingLogger::new());
                        let registry = linear_chain(size);
                        let services = Arc::new(ServiceRegistry::new());
                        let config = Arc::new(ConfigPipeline::new(logger.clone()));
                        let observers = Arc::new(ObserverBus::new(logger.clone()));
                        LifecycleEngine::new(registry, services, config, observers, logger)
                    },
                    |mut engine| async move {
                        engine.init().await.unwrap();
                        engine.start().await.unwrap();
                        engine
                            .stop(std::time::Duration::from_secs(5))
                            .await
                            .unwrap();
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

fn benchmark_builder_roundtrip(c: &mut Criterion) {
    c.bench_function("application_builder_empty_build", |b| {
        b.iter(|| {
            black_box(
                ApplicationBuilder::new()
                    .with_logger(Arc::new(TracingLogger::new()))
                    .build()
                    .unwrap(),
            );
        });
    });
}

criterion_group!(
    benches,
    benchmark_topological_sorting,
    benchmark_complete_lifecycle,
    benchmark_builder_roundtrip
);
criterion_main!(benches);
