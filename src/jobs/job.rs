//! # Estructura de Job
//! src/jobs/job.rs
//!
//! Un job es inmutable una vez creado: tipo, versión y (opcionalmente) su
//! costo simulado. Se descarta después de ser procesado; las métricas son
//! su único rastro.

use crate::jobs::types::{JobType, JobVersion, LabelSet};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Momento en que se decide el costo simulado de un job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CostMode {
    /// El dispatcher sortea el costo al crear el job (determinista por job)
    Creation,
    /// El worker sortea el costo al procesarlo
    Processing,
}

/// Rango y modo del costo simulado
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostPolicy {
    pub mode: CostMode,
    /// Límite inferior inclusivo
    pub min: Duration,
    /// Límite superior exclusivo
    pub max: Duration,
}

impl CostPolicy {
    pub fn new(mode: CostMode, min: Duration, max: Duration) -> Self {
        Self { mode, min, max }
    }

    /// Sortea un costo en `[min, max)` con granularidad de milisegundos
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min_ms = self.min.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        if max_ms <= min_ms {
            return self.min;
        }
        Duration::from_millis(rng.gen_range(min_ms..max_ms))
    }

    /// Costo a fijar en la creación (None si se resuelve en el worker)
    pub fn creation_cost<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Duration> {
        match self.mode {
            CostMode::Creation => Some(self.draw(rng)),
            CostMode::Processing => None,
        }
    }
}

impl Default for CostPolicy {
    /// 10..110 ms, sorteado al crear
    fn default() -> Self {
        Self::new(
            CostMode::Creation,
            Duration::from_millis(10),
            Duration::from_millis(110),
        )
    }
}

/// Pedido de submission tal como llega de un productor externo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub version: JobVersion,
    /// Costo explícito; si falta, lo decide la `CostPolicy`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_ms: Option<u64>,
}

impl JobSpec {
    pub fn new(job_type: JobType, version: JobVersion) -> Self {
        Self {
            job_type,
            version,
            cost_ms: None,
        }
    }

    pub fn with_cost(mut self, cost: Duration) -> Self {
        self.cost_ms = Some(cost.as_millis() as u64);
        self
    }

    /// Etiquetas aleatorias dentro del set habilitado
    pub fn random<R: Rng + ?Sized>(labels: &LabelSet, rng: &mut R) -> Option<Self> {
        let job_type = *labels.types().choose(rng)?;
        let version = *labels.versions().choose(rng)?;
        Some(Self::new(job_type, version))
    }
}

/// Unidad de trabajo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    job_type: JobType,
    version: JobVersion,
    cost: Option<Duration>,
}

impl Job {
    pub fn new(job_type: JobType, version: JobVersion, cost: Option<Duration>) -> Self {
        Self {
            job_type,
            version,
            cost,
        }
    }

    pub fn job_type(&self) -> JobType {
        self.job_type
    }

    pub fn version(&self) -> JobVersion {
        self.version
    }

    /// Costo fijado al crear; `None` si lo resuelve el worker
    pub fn cost(&self) -> Option<Duration> {
        self.cost
    }
}
