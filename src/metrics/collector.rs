//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Implementación de `MetricsSink` sobre el cliente `prometheus`. Cada
//! collector tiene su propio `Registry`, así que dos pipelines en el mismo
//! proceso (o dos tests) nunca comparten series.
//!
//! Las consultas tipadas (`processed`, `pending`, `duration`...) leen lo
//! que `collect()` reporta; nunca crean series nuevas.

use crate::error::PipelineError;
use crate::jobs::types::{JobType, JobVersion};
use crate::metrics::exposition::{FAILED_TOTAL, PENDING, PROCESSED_TOTAL, PROCESS_TIME};
use crate::metrics::{MetricsSink, WorkerId};
use prometheus::core::Collector;
use prometheus::proto::Metric;
use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_gauge_vec_with_registry, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec,
    Opts, Registry,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

const WORKER_LABELS: &[&str] = &["worker_id", "type", "version"];
const JOB_LABELS: &[&str] = &["type", "version"];

/// Vista inmutable de un histograma
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramSnapshot {
    /// `(límite superior, conteo acumulado)` sin incluir +Inf
    pub buckets: Vec<(f64, u64)>,
    pub count: u64,
    pub sum_seconds: f64,
}

impl HistogramSnapshot {
    fn from_metric(metric: &Metric) -> Self {
        let histogram = metric.get_histogram();
        Self {
            buckets: histogram
                .get_bucket()
                .iter()
                .map(|b| (b.get_upper_bound(), b.get_cumulative_count()))
                .collect(),
            count: histogram.get_sample_count(),
            sum_seconds: histogram.get_sample_sum(),
        }
    }
}

/// Collector de métricas thread-safe
///
/// Se inyecta en el dispatcher y el pool; `Clone` comparte el mismo estado.
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<MetricsData>,
}

struct MetricsData {
    registry: Registry,
    processed: IntCounterVec,
    failed: IntCounterVec,
    pending: IntGaugeVec,
    durations: HistogramVec,
    start_time: Instant,
}

impl MetricsCollector {
    /// Registra las cuatro familias en un `Registry` nuevo
    pub fn new() -> Result<Self, PipelineError> {
        let registry = Registry::new();

        let processed = register_int_counter_vec_with_registry!(
            Opts::new(PROCESSED_TOTAL, "Total number of jobs processed by the workers"),
            WORKER_LABELS,
            registry
        )?;
        let failed = register_int_counter_vec_with_registry!(
            Opts::new(FAILED_TOTAL, "Total number of jobs that failed processing"),
            WORKER_LABELS,
            registry
        )?;
        let pending = register_int_gauge_vec_with_registry!(
            Opts::new(PENDING, "Number of pending jobs"),
            JOB_LABELS,
            registry
        )?;
        let durations = register_histogram_vec_with_registry!(
            HistogramOpts::new(PROCESS_TIME, "Amount of time spent processing jobs"),
            WORKER_LABELS,
            registry
        )?;

        Ok(Self {
            inner: Arc::new(MetricsData {
                registry,
                processed,
                failed,
                pending,
                durations,
                start_time: Instant::now(),
            }),
        })
    }

    /// Registry propio, para el encoder de texto
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Total procesado para `(type, version)` sumando todos los workers
    pub fn processed(&self, job_type: JobType, version: JobVersion) -> u64 {
        sum_counters(&self.inner.processed, |key| key.matches(job_type, version))
    }

    /// Procesado por un worker específico
    pub fn processed_by_worker(&self, worker_id: WorkerId, job_type: JobType, version: JobVersion) -> u64 {
        sum_counters(&self.inner.processed, |key| {
            key.worker_id == worker_id && key.matches(job_type, version)
        })
    }

    /// Total procesado en todas las series
    pub fn total_processed(&self) -> u64 {
        sum_counters(&self.inner.processed, |_| true)
    }

    /// Total procesado por un worker (todas las etiquetas)
    pub fn total_processed_by_worker(&self, worker_id: WorkerId) -> u64 {
        sum_counters(&self.inner.processed, |key| key.worker_id == worker_id)
    }

    pub fn failed(&self, job_type: JobType, version: JobVersion) -> u64 {
        sum_counters(&self.inner.failed, |key| key.matches(job_type, version))
    }

    pub fn total_failed(&self) -> u64 {
        sum_counters(&self.inner.failed, |_| true)
    }

    pub fn pending(&self, job_type: JobType, version: JobVersion) -> i64 {
        self.pending_series()
            .into_iter()
            .filter(|s| s.job_type == job_type && s.version == version)
            .map(|s| s.value)
            .sum()
    }

    pub fn total_pending(&self) -> i64 {
        self.pending_series().into_iter().map(|s| s.value).sum()
    }

    /// Histograma de un worker para `(type, version)`
    pub fn duration(&self, worker_id: WorkerId, job_type: JobType, version: JobVersion) -> Option<HistogramSnapshot> {
        series(&self.inner.durations)
            .iter()
            .find(|metric| {
                WorkerKey::from_metric(metric)
                    .map_or(false, |key| key.worker_id == worker_id && key.matches(job_type, version))
            })
            .map(HistogramSnapshot::from_metric)
    }

    /// Snapshot ordenado de todas las series
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut processed = worker_series(&self.inner.processed);
        processed.sort_by_key(WorkerSeries::sort_key);

        let mut failed = worker_series(&self.inner.failed);
        failed.sort_by_key(WorkerSeries::sort_key);

        let mut pending = self.pending_series();
        pending.sort_by_key(|s| (s.job_type, s.version));

        let mut durations: Vec<DurationSeries> = series(&self.inner.durations)
            .iter()
            .filter_map(|metric| {
                let key = WorkerKey::from_metric(metric)?;
                Some(DurationSeries {
                    worker_id: key.worker_id,
                    job_type: key.job_type,
                    version: key.version,
                    histogram: HistogramSnapshot::from_metric(metric),
                })
            })
            .collect();
        durations.sort_by_key(|s| (s.worker_id, s.job_type, s.version));

        MetricsSnapshot {
            uptime_secs: self.inner.start_time.elapsed().as_secs(),
            processed,
            failed,
            pending,
            durations,
        }
    }

    fn pending_series(&self) -> Vec<PendingSeries> {
        series(&self.inner.pending)
            .iter()
            .filter_map(|metric| {
                Some(PendingSeries {
                    job_type: label(metric, "type")?.parse().ok()?,
                    version: label(metric, "version")?.parse().ok()?,
                    value: metric.get_gauge().get_value() as i64,
                })
            })
            .collect()
    }
}

impl MetricsSink for MetricsCollector {
    fn increment_processed(&self, worker_id: WorkerId, job_type: JobType, version: JobVersion) {
        let worker = worker_id.to_string();
        self.inner
            .processed
            .with_label_values(&[&worker, job_type.as_str(), version.as_str()])
            .inc();
    }

    fn set_pending_delta(&self, job_type: JobType, version: JobVersion, delta: i64) {
        self.inner
            .pending
            .with_label_values(&[job_type.as_str(), version.as_str()])
            .add(delta);
    }

    fn observe_duration(&self, worker_id: WorkerId, job_type: JobType, version: JobVersion, seconds: f64) {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        let worker = worker_id.to_string();
        self.inner
            .durations
            .with_label_values(&[&worker, job_type.as_str(), version.as_str()])
            .observe(seconds);
    }

    fn increment_failed(&self, worker_id: WorkerId, job_type: JobType, version: JobVersion) {
        let worker = worker_id.to_string();
        self.inner
            .failed
            .with_label_values(&[&worker, job_type.as_str(), version.as_str()])
            .inc();
    }
}

/// Etiquetas `(worker_id, type, version)` leídas de una serie
#[derive(Debug, Clone, Copy)]
struct WorkerKey {
    worker_id: WorkerId,
    job_type: JobType,
    version: JobVersion,
}

impl WorkerKey {
    fn from_metric(metric: &Metric) -> Option<Self> {
        Some(Self {
            worker_id: label(metric, "worker_id")?.parse().ok()?,
            job_type: label(metric, "type")?.parse().ok()?,
            version: label(metric, "version")?.parse().ok()?,
        })
    }

    fn matches(&self, job_type: JobType, version: JobVersion) -> bool {
        self.job_type == job_type && self.version == version
    }
}

fn series(collector: &impl Collector) -> Vec<Metric> {
    collector
        .collect()
        .iter()
        .flat_map(|family| family.get_metric().to_vec())
        .collect()
}

fn label<'a>(metric: &'a Metric, name: &str) -> Option<&'a str> {
    metric
        .get_label()
        .iter()
        .find(|pair| pair.get_name() == name)
        .map(|pair| pair.get_value())
}

fn sum_counters<F: Fn(&WorkerKey) -> bool>(counters: &IntCounterVec, keep: F) -> u64 {
    series(counters)
        .iter()
        .filter(|metric| WorkerKey::from_metric(metric).map_or(false, |key| keep(&key)))
        .map(|metric| metric.get_counter().get_value() as u64)
        .sum()
}

fn worker_series(counters: &IntCounterVec) -> Vec<WorkerSeries> {
    series(counters)
        .iter()
        .filter_map(|metric| {
            let key = WorkerKey::from_metric(metric)?;
            Some(WorkerSeries {
                worker_id: key.worker_id,
                job_type: key.job_type,
                version: key.version,
                value: metric.get_counter().get_value() as u64,
            })
        })
        .collect()
}

/// Serie `(worker, type, version) -> valor`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerSeries {
    pub worker_id: WorkerId,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub version: JobVersion,
    pub value: u64,
}

impl WorkerSeries {
    fn sort_key(&self) -> (WorkerId, JobType, JobVersion) {
        (self.worker_id, self.job_type, self.version)
    }
}

/// Serie del gauge de pendientes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingSeries {
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub version: JobVersion,
    pub value: i64,
}

/// Serie del histograma de duración
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationSeries {
    pub worker_id: WorkerId,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub version: JobVersion,
    pub histogram: HistogramSnapshot,
}

/// Snapshot de métricas (para `GET /metrics/json`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub processed: Vec<WorkerSeries>,
    pub failed: Vec<WorkerSeries>,
    pub pending: Vec<PendingSeries>,
    pub durations: Vec<DurationSeries>,
}
