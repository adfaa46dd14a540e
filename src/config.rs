//! # Configuración del Pipeline
//! src/config.rs
//!
//! Configuración del proceso con soporte para argumentos CLI y variables
//! de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./job_pipeline --port 1123 \
//!   --workers 10 \
//!   --queue-capacity 10000 \
//!   --types free,pro --versions v1 \
//!   --cost-mode processing
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! WORKERS=4 QUEUE_CAPACITY=500 GENERATE_JOBS=false ./job_pipeline
//! ```

use crate::error::ConfigError;
use crate::jobs::job::{CostMode, CostPolicy};
use crate::jobs::types::{JobType, JobVersion, LabelSet};
use clap::{ArgAction, Parser};
use std::time::Duration;

/// Configuración del pipeline de jobs
#[derive(Debug, Clone, Parser)]
#[command(name = "job_pipeline")]
#[command(about = "Pipeline acotado de jobs con pool de workers y métricas Prometheus")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto del endpoint HTTP (submission + métricas)
    #[arg(short, long, default_value = "1123", env = "PIPELINE_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "PIPELINE_HOST")]
    pub host: String,

    // === Pool y cola ===

    /// Número de workers concurrentes
    #[arg(short, long, default_value = "10", env = "WORKERS")]
    pub workers: usize,

    /// Capacidad máxima de la cola de jobs
    #[arg(long = "queue-capacity", default_value = "10000", env = "QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    // === Etiquetas ===

    /// Tipos de job aceptados (lista separada por comas)
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = JobType::ALL.to_vec(),
        env = "JOB_TYPES"
    )]
    pub types: Vec<JobType>,

    /// Versiones aceptadas (lista separada por comas)
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = JobVersion::ALL.to_vec(),
        env = "JOB_VERSIONS"
    )]
    pub versions: Vec<JobVersion>,

    // === Costo simulado ===

    /// Costo mínimo de un job en milisegundos (inclusivo)
    #[arg(long = "min-cost-ms", default_value = "10", env = "MIN_COST_MS")]
    pub min_cost_ms: u64,

    /// Costo máximo de un job en milisegundos (exclusivo)
    #[arg(long = "max-cost-ms", default_value = "110", env = "MAX_COST_MS")]
    pub max_cost_ms: u64,

    /// Cuándo se sortea el costo: al crear el job o al procesarlo
    #[arg(long = "cost-mode", value_enum, default_value = "creation", env = "COST_MODE")]
    pub cost_mode: CostMode,

    // === Generador sintético ===

    /// Generar jobs sintéticos en background
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "GENERATE_JOBS")]
    pub generate: bool,

    /// Pausa entre jobs sintéticos en milisegundos
    #[arg(long = "generator-interval-ms", default_value = "5", env = "GENERATOR_INTERVAL_MS")]
    pub generator_interval_ms: u64,

    // === Shutdown y logging ===

    /// Tiempo máximo para que los workers drenen al apagar
    #[arg(long = "shutdown-timeout-ms", default_value = "5000", env = "SHUTDOWN_TIMEOUT_MS")]
    pub shutdown_timeout_ms: u64,

    /// Filtro de logging (sintaxis de `RUST_LOG`)
    #[arg(long = "log-level", default_value = "info", env = "RUST_LOG")]
    pub log_level: String,
}

impl Config {
    /// Crea la configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Dirección completa para bind (host:port)
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Valida la configuración
    ///
    /// Cualquier error aquí es fatal al arrancar.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.types.is_empty() {
            return Err(ConfigError::EmptyLabelSet("type"));
        }
        if self.versions.is_empty() {
            return Err(ConfigError::EmptyLabelSet("version"));
        }
        if self.min_cost_ms >= self.max_cost_ms {
            return Err(ConfigError::InvalidCostRange {
                min: self.min_cost_ms,
                max: self.max_cost_ms,
            });
        }
        if self.generate && self.generator_interval_ms == 0 {
            return Err(ConfigError::ZeroGeneratorInterval);
        }
        Ok(())
    }

    pub fn labels(&self) -> LabelSet {
        LabelSet::new(&self.types, &self.versions)
    }

    pub fn cost_policy(&self) -> CostPolicy {
        CostPolicy::new(
            self.cost_mode,
            Duration::from_millis(self.min_cost_ms),
            Duration::from_millis(self.max_cost_ms),
        )
    }

    pub fn generator_interval(&self) -> Duration {
        Duration::from_millis(self.generator_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Loguea un resumen de la configuración
    pub fn log_summary(&self) {
        let types: Vec<&str> = self.types.iter().map(|t| t.as_str()).collect();
        let versions: Vec<&str> = self.versions.iter().map(|v| v.as_str()).collect();

        tracing::info!(
            address = %self.address(),
            workers = self.workers,
            queue_capacity = self.queue_capacity,
            "pipeline configuration"
        );
        tracing::info!(
            types = %types.join(","),
            versions = %versions.join(","),
            cost = %format!("{}..{}ms ({:?})", self.min_cost_ms, self.max_cost_ms, self.cost_mode),
            "job labels and cost"
        );
        if self.generate {
            tracing::info!(interval_ms = self.generator_interval_ms, "synthetic generator enabled");
        } else {
            tracing::info!("synthetic generator disabled");
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 1123,
            host: "127.0.0.1".to_string(),
            workers: 10,
            queue_capacity: 10_000,
            types: JobType::ALL.to_vec(),
            versions: JobVersion::ALL.to_vec(),
            min_cost_ms: 10,
            max_cost_ms: 110,
            cost_mode: CostMode::Creation,
            generate: true,
            generator_interval_ms: 5,
            shutdown_timeout_ms: 5_000,
            log_level: "info".to_string(),
        }
    }
}
