//! Metrics collection for observability

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, Histogram, IntCounter, IntCounterVec, Registry,
};
use std::sync::Arc;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> =
    Lazy::new(|| Arc::new(Metrics::new().expect("Failed to initialize metrics")));

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Index metrics
    pub files_indexed: IntCounter,
    pub chunks_indexed: IntCounter,
    pub searches_total: IntCounter,

    // Context assembly metrics
    pub packs_built: IntCounter,
    pub pack_overflows: IntCounter,

    // Agent metrics
    pub agent_tasks_total: IntCounter,
    pub agent_tasks_success: IntCounter,
    pub agent_tasks_failed: IntCounter,
    pub agent_attempts_total: IntCounterVec,
    pub agent_task_duration: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let files_indexed = register_int_counter_with_registry!(
            "index_files_total",
            "Total files added to the embedding index",
            registry
        )?;

        let chunks_indexed = register_int_counter_with_registry!(
            "index_chunks_total",
            "Total chunks embedded and stored",
            registry
        )?;

        let searches_total = register_int_counter_with_registry!(
            "index_searches_total",
            "Total nearest-neighbor searches served",
            registry
        )?;

        let packs_built = register_int_counter_with_registry!(
            "context_packs_built_total",
            "Total context packs assembled",
            registry
        )?;

        let pack_overflows = register_int_counter_with_registry!(
            "context_pack_overflows_total",
            "Context packs whose prompt exceeded the token ceiling",
            registry
        )?;

        let agent_tasks_total = register_int_counter_with_registry!(
            "agent_tasks_total",
            "Total agent task runs started",
            registry
        )?;

        let agent_tasks_success = register_int_counter_with_registry!(
            "agent_tasks_success_total",
            "Agent task runs that ended in success",
            registry
        )?;

        let agent_tasks_failed = register_int_counter_with_registry!(
            "agent_tasks_failed_total",
            "Agent task runs that ended in failure",
            registry
        )?;

        let agent_attempts_total = register_int_counter_vec_with_registry!(
            "agent_attempts_total",
            "Agent attempts by outcome",
            &["outcome"],
            registry
        )?;

        let agent_task_duration = register_histogram_with_registry!(
            "agent_task_duration_seconds",
            "Agent task run duration in seconds",
            registry
        )?;

        Ok(Self {
            registry,
            files_indexed,
            chunks_indexed,
            searches_total,
            packs_built,
            pack_overflows,
            agent_tasks_total,
            agent_tasks_success,
            agent_tasks_failed,
            agent_attempts_total,
            agent_task_duration,
        })
    }

    /// Snapshot all metric families for export
    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }
}
