//! # Etiquetas de Jobs
//! src/jobs/types.rs
//!
//! Define los conjuntos cerrados de etiquetas (`type` y `version`) que
//! identifican a un job en las métricas. Al ser enums, la cardinalidad de
//! las series queda acotada y el input inválido se rechaza en el borde.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Categoría del job
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Free,
    Standard,
    Advanced,
    Pro,
}

impl JobType {
    pub const ALL: [JobType; 4] = [
        JobType::Free,
        JobType::Standard,
        JobType::Advanced,
        JobType::Pro,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Free => "free",
            JobType::Standard => "standard",
            JobType::Advanced => "advanced",
            JobType::Pro => "pro",
        }
    }
}

impl FromStr for JobType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(JobType::Free),
            "standard" => Ok(JobType::Standard),
            "advanced" => Ok(JobType::Advanced),
            "pro" => Ok(JobType::Pro),
            _ => Err(PipelineError::InvalidType(s.to_string())),
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Versión del job
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum JobVersion {
    V1,
    V2,
    V3,
}

impl JobVersion {
    pub const ALL: [JobVersion; 3] = [JobVersion::V1, JobVersion::V2, JobVersion::V3];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobVersion::V1 => "v1",
            JobVersion::V2 => "v2",
            JobVersion::V3 => "v3",
        }
    }
}

impl FromStr for JobVersion {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "v1" => Ok(JobVersion::V1),
            "v2" => Ok(JobVersion::V2),
            "v3" => Ok(JobVersion::V3),
            _ => Err(PipelineError::InvalidVersion(s.to_string())),
        }
    }
}

impl fmt::Display for JobVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subconjunto de etiquetas habilitadas por configuración
///
/// El enum fija el universo; el `LabelSet` decide cuáles acepta este
/// proceso (por defecto, todas).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    types: Vec<JobType>,
    versions: Vec<JobVersion>,
}

impl LabelSet {
    /// Crea un set deduplicado y ordenado
    pub fn new(types: &[JobType], versions: &[JobVersion]) -> Self {
        let mut types = types.to_vec();
        types.sort();
        types.dedup();

        let mut versions = versions.to_vec();
        versions.sort();
        versions.dedup();

        Self { types, versions }
    }

    pub fn types(&self) -> &[JobType] {
        &self.types
    }

    pub fn versions(&self) -> &[JobVersion] {
        &self.versions
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() || self.versions.is_empty()
    }

    /// Valida que ambas etiquetas estén habilitadas
    pub fn check(&self, job_type: JobType, version: JobVersion) -> Result<(), PipelineError> {
        if !self.types.contains(&job_type) {
            return Err(PipelineError::LabelNotAllowed(job_type.to_string()));
        }
        if !self.versions.contains(&version) {
            return Err(PipelineError::LabelNotAllowed(version.to_string()));
        }
        Ok(())
    }

    /// Parsea y valida un par de strings crudos (p.ej. de un request HTTP)
    pub fn parse(&self, job_type: &str, version: &str) -> Result<(JobType, JobVersion), PipelineError> {
        let job_type: JobType = job_type.parse()?;
        let version: JobVersion = version.parse()?;
        self.check(job_type, version)?;
        Ok((job_type, version))
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::new(&JobType::ALL, &JobVersion::ALL)
    }
}
