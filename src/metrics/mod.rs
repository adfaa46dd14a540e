//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Este módulo define la capacidad `MetricsSink` de la que depende el núcleo
//! y su implementación sobre el cliente `prometheus`:
//! - Contador de jobs procesados por `(worker, type, version)`
//! - Contador de jobs fallidos por `(worker, type, version)`
//! - Gauge de pendientes por `(type, version)`
//! - Histograma de duración por `(worker, type, version)`
//!
//! El núcleo sólo muta agregados; la exposición (JSON o texto Prometheus)
//! se hace bajo demanda.

pub mod collector;
pub mod exposition;

pub use collector::{HistogramSnapshot, MetricsCollector, MetricsSnapshot};
pub use exposition::render_prometheus;

use crate::jobs::types::{JobType, JobVersion};

/// Identificador de worker dentro del pool (0..N-1)
pub type WorkerId = usize;

/// Capacidad de registrar resultados de jobs
///
/// Cada llamada debe ser segura bajo concurrencia ilimitada y no puede
/// bloquear indefinidamente.
pub trait MetricsSink: Send + Sync {
    /// Un job terminó exitosamente en `worker_id`
    fn increment_processed(&self, worker_id: WorkerId, job_type: JobType, version: JobVersion);

    /// Ajusta el gauge de pendientes (+1 al encolar, -1 al terminar)
    fn set_pending_delta(&self, job_type: JobType, version: JobVersion, delta: i64);

    /// Registra la duración del procesamiento en segundos
    fn observe_duration(&self, worker_id: WorkerId, job_type: JobType, version: JobVersion, seconds: f64);

    /// Un job falló en `worker_id`
    fn increment_failed(&self, worker_id: WorkerId, job_type: JobType, version: JobVersion);
}
