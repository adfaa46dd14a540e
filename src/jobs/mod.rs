//! # Pipeline de Jobs
//! src/jobs/mod.rs
//!
//! ```text
//! productores ──submit──► Dispatcher ──enqueue──► JobQueue ──dequeue──► WorkerPool
//!  (HTTP, generador)         │ pending +1            (acotada)              │ processed / failed
//!                            └──────────────► MetricsSink ◄─────────────────┘ pending -1
//! ```

pub mod dispatcher;
pub mod generator;
pub mod handlers;
pub mod job;
pub mod manager;
pub mod queue;
pub mod types;
pub mod worker;

pub use dispatcher::Dispatcher;
pub use generator::Generator;
pub use job::{CostMode, CostPolicy, Job, JobSpec};
pub use manager::{JobManager, JobManagerConfig};
pub use queue::{JobQueue, QueueStats};
pub use types::{JobType, JobVersion, LabelSet};
pub use worker::{JobProcessor, PauseGate, ShutdownReport, SimulatedProcessor, WorkerPool};
