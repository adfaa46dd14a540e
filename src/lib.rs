//! # Job Pipeline
//! src/lib.rs
//!
//! Pipeline acotado de procesamiento de jobs: una cola FIFO con
//! backpressure, un pool fijo de workers y un sink de métricas con
//! exposición Prometheus.
//!
//! ## Arquitectura
//!
//! - `jobs`: cola, dispatcher, pool de workers, generador y gestor
//! - `metrics`: trait `MetricsSink` y su colector en memoria
//! - `config`: CLI + variables de entorno
//! - `error`: errores tipados del pipeline
//! - `http`, `router`, `server`: superficie HTTP/1.0 delgada
//! - `shutdown`: señal de apagado ordenado
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use job_pipeline::jobs::{JobManager, JobManagerConfig, JobSpec, JobType, JobVersion};
//! use job_pipeline::metrics::MetricsCollector;
//! use std::time::Duration;
//!
//! let manager = JobManager::start(JobManagerConfig::default(), MetricsCollector::new().unwrap()).unwrap();
//! manager.submit(JobSpec::new(JobType::Standard, JobVersion::V1)).unwrap();
//! let report = manager.shutdown(Duration::from_secs(5));
//! assert!(report.is_clean());
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod jobs;
pub mod metrics;
pub mod router;
pub mod server;
pub mod shutdown;

pub use error::{PipelineError, Result};
