//! # Gestor Central de Jobs
//! src/jobs/manager.rs
//!
//! Arma el pipeline completo (cola, dispatcher, pool y generador) sobre un
//! `MetricsCollector` inyectado, y coordina el apagado ordenado.

use crate::config::Config;
use crate::error::PipelineError;
use crate::jobs::dispatcher::Dispatcher;
use crate::jobs::generator::Generator;
use crate::jobs::job::{CostPolicy, JobSpec};
use crate::jobs::queue::{JobQueue, QueueStats};
use crate::jobs::types::LabelSet;
use crate::jobs::worker::{JobProcessor, ShutdownReport, SimulatedProcessor, WorkerPool};
use crate::metrics::MetricsCollector;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Configuración del Job Manager
#[derive(Debug, Clone)]
pub struct JobManagerConfig {
    /// Número de workers del pool
    pub workers: usize,

    /// Capacidad de la cola acotada
    pub queue_capacity: usize,

    /// Etiquetas aceptadas
    pub labels: LabelSet,

    /// Rango y modo del costo simulado
    pub cost_policy: CostPolicy,

    /// Intervalo del generador sintético (None = deshabilitado)
    pub generator_interval: Option<Duration>,

    /// Arrancar el pool con la compuerta cerrada
    pub start_paused: bool,
}

impl Default for JobManagerConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            queue_capacity: 10_000,
            labels: LabelSet::default(),
            cost_policy: CostPolicy::default(),
            generator_interval: None,
            start_paused: false,
        }
    }
}

impl JobManagerConfig {
    /// Crea una configuración desde el Config principal
    pub fn from_config(config: &Config) -> Self {
        Self {
            workers: config.workers,
            queue_capacity: config.queue_capacity,
            labels: config.labels(),
            cost_policy: config.cost_policy(),
            generator_interval: config.generate.then(|| config.generator_interval()),
            start_paused: false,
        }
    }
}

/// Gestor central del pipeline
pub struct JobManager {
    config: JobManagerConfig,
    queue: Arc<JobQueue>,
    metrics: MetricsCollector,
    dispatcher: Dispatcher,

    /// `None` después del shutdown
    pool: Mutex<Option<WorkerPool>>,
    generator: Mutex<Option<Generator>>,
}

impl JobManager {
    /// Arranca el pipeline con el procesador simulado
    pub fn start(config: JobManagerConfig, metrics: MetricsCollector) -> Result<Self, PipelineError> {
        let processor = Arc::new(SimulatedProcessor::new(config.cost_policy));
        Self::start_with_processor(config, metrics, processor)
    }

    /// Arranca el pipeline con un procesador arbitrario
    pub fn start_with_processor(
        config: JobManagerConfig,
        metrics: MetricsCollector,
        processor: Arc<dyn JobProcessor>,
    ) -> Result<Self, PipelineError> {
        let queue = Arc::new(JobQueue::new(config.queue_capacity));
        let dispatcher = Dispatcher::new(
            Arc::clone(&queue),
            Arc::new(metrics.clone()),
            config.labels.clone(),
            config.cost_policy,
        );

        let pool = if config.start_paused {
            WorkerPool::start_paused(config.workers, Arc::clone(&queue), Arc::new(metrics.clone()), processor)?
        } else {
            WorkerPool::start(config.workers, Arc::clone(&queue), Arc::new(metrics.clone()), processor)?
        };

        let generator = match config.generator_interval {
            Some(interval) => match Generator::start(dispatcher.clone(), interval, None) {
                Ok(generator) => Some(generator),
                Err(err) => {
                    pool.shutdown(Duration::ZERO);
                    return Err(err);
                }
            },
            None => None,
        };

        tracing::info!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            generator = generator.is_some(),
            "job manager started"
        );

        Ok(Self {
            config,
            queue,
            metrics,
            dispatcher,
            pool: Mutex::new(Some(pool)),
            generator: Mutex::new(generator),
        })
    }

    /// Encola un job (bloquea si la cola está llena)
    pub fn submit(&self, spec: JobSpec) -> Result<(), PipelineError> {
        self.dispatcher.submit(spec)
    }

    /// Encola a partir de etiquetas sin validar
    pub fn submit_raw(&self, job_type: &str, version: &str) -> Result<(), PipelineError> {
        self.dispatcher.submit_raw(job_type, version)
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn config(&self) -> &JobManagerConfig {
        &self.config
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    pub fn pause(&self) {
        if let Some(pool) = self.pool.lock().as_ref() {
            pool.pause();
        }
    }

    pub fn resume(&self) {
        if let Some(pool) = self.pool.lock().as_ref() {
            pool.resume();
        }
    }

    pub fn is_running(&self) -> bool {
        self.pool.lock().is_some()
    }

    /// Workers procesando en este momento
    pub fn busy_workers(&self) -> usize {
        self.pool
            .lock()
            .as_ref()
            .map(|pool| pool.busy_workers())
            .unwrap_or(0)
    }

    /// Estado del pipeline para `/status`
    pub fn status_json(&self) -> serde_json::Value {
        let stats = self.queue_stats();
        let (running, paused) = match self.pool.lock().as_ref() {
            Some(pool) => (true, pool.is_paused()),
            None => (false, false),
        };
        let generator = self.generator.lock().as_ref().map(|g| {
            serde_json::json!({ "running": !g.is_finished(), "submitted": g.submitted() })
        });

        serde_json::json!({
            "running": running,
            "paused": paused,
            "accepting": self.dispatcher.is_accepting(),
            "workers": self.config.workers,
            "busy_workers": self.busy_workers(),
            "queue": stats,
            "pending": self.metrics.total_pending(),
            "processed": self.metrics.total_processed(),
            "failed": self.metrics.total_failed(),
            "generator": generator,
        })
    }

    /// Apaga el pipeline
    ///
    /// Deja de aceptar jobs, detiene el generador y espera a que el pool
    /// drene hasta `timeout`. Llamadas posteriores devuelven un reporte vacío.
    pub fn shutdown(&self, timeout: Duration) -> ShutdownReport {
        self.dispatcher.stop_accepting();

        let generator = self.generator.lock().take();
        if let Some(generator) = generator.as_ref() {
            generator.request_stop();
        }

        let pool = self.pool.lock().take();
        let report = match pool {
            Some(pool) => pool.shutdown(timeout),
            None => ShutdownReport::default(),
        };

        if let Some(generator) = generator {
            let submitted = generator.stop();
            tracing::info!(submitted, "generator joined");
        }

        report
    }
}
