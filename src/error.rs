//! # Errores del Pipeline
//! src/error.rs
//!
//! Taxonomía de errores del núcleo. La cola llena NO es un error: es
//! backpressure y se manifiesta como bloqueo del productor.

use thiserror::Error;

/// Errores de configuración (fatales al arrancar)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("workers must be >= 1")]
    NoWorkers,

    #[error("queue capacity must be >= 1")]
    ZeroCapacity,

    #[error("at least one {0} label must be allowed")]
    EmptyLabelSet(&'static str),

    #[error("invalid cost range: min {min}ms must be < max {max}ms")]
    InvalidCostRange { min: u64, max: u64 },

    #[error("generator interval must be > 0")]
    ZeroGeneratorInterval,
}

/// Errores del pipeline de jobs
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("unknown job type: {0}")]
    InvalidType(String),

    #[error("unknown job version: {0}")]
    InvalidVersion(String),

    #[error("label not allowed by configuration: {0}")]
    LabelNotAllowed(String),

    #[error("pipeline is shutting down")]
    ShuttingDown,

    #[error("job queue is closed")]
    QueueClosed,

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl PipelineError {
    /// Indica si el error proviene de input inválido del cliente
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidType(_)
                | PipelineError::InvalidVersion(_)
                | PipelineError::LabelNotAllowed(_)
        )
    }
}

/// Falla al procesar un job individual
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("processing failed: {0}")]
pub struct ProcessingError(pub String);

pub type Result<T> = std::result::Result<T, PipelineError>;
