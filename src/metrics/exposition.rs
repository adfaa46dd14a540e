//! # Exposición en formato Prometheus
//! src/metrics/exposition.rs
//!
//! Codifica el `Registry` de un collector al formato de texto que consume
//! un scraper Prometheus (pull). No hay push por red desde el núcleo.

use crate::error::PipelineError;
use crate::metrics::collector::MetricsCollector;
use prometheus::{Encoder, TextEncoder};

pub const PROCESSED_TOTAL: &str = "worker_jobs_processed_total";
pub const FAILED_TOTAL: &str = "worker_jobs_failed_total";
pub const PENDING: &str = "worker_jobs_pending";
pub const PROCESS_TIME: &str = "worker_jobs_process_time_seconds";

/// Content-Type del formato de texto 0.0.4
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Genera el texto de exposición
///
/// Las familias sin series no aparecen.
pub fn render_prometheus(collector: &MetricsCollector) -> Result<String, PipelineError> {
    let encoder = TextEncoder::new();
    let families = collector.registry().gather();
    let mut buffer = Vec::new();
    encoder.encode(&families, &mut buffer)?;

    String::from_utf8(buffer)
        .map_err(|e| PipelineError::Metrics(prometheus::Error::Msg(format!("invalid UTF-8 in metrics: {}", e))))
}
