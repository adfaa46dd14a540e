//! # Dispatcher
//! src/jobs/dispatcher.rs
//!
//! Camino de submission: valida etiquetas, incrementa el gauge de
//! pendientes y recién entonces encola. El orden importa: un worker nunca
//! puede decrementar un job que todavía no fue contado como pendiente.

use crate::error::PipelineError;
use crate::jobs::job::{CostPolicy, Job, JobSpec};
use crate::jobs::queue::JobQueue;
use crate::jobs::types::LabelSet;
use crate::metrics::MetricsSink;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Punto de entrada de productores (HTTP o generador sintético)
///
/// `Clone` comparte cola, sink y el flag de aceptación.
#[derive(Clone)]
pub struct Dispatcher {
    queue: Arc<JobQueue>,
    sink: Arc<dyn MetricsSink>,
    labels: LabelSet,
    cost_policy: CostPolicy,
    accepting: Arc<AtomicBool>,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<JobQueue>,
        sink: Arc<dyn MetricsSink>,
        labels: LabelSet,
        cost_policy: CostPolicy,
    ) -> Self {
        Self {
            queue,
            sink,
            labels,
            cost_policy,
            accepting: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Encola un job, bloqueando si la cola está llena
    ///
    /// Rechaza etiquetas no habilitadas antes de tocar el gauge o la cola.
    /// Si la cola se cierra mientras espera, revierte el incremento.
    pub fn submit(&self, spec: JobSpec) -> Result<(), PipelineError> {
        self.labels.check(spec.job_type, spec.version)?;

        if !self.is_accepting() {
            return Err(PipelineError::ShuttingDown);
        }

        let cost = match spec.cost_ms {
            Some(ms) => Some(Duration::from_millis(ms)),
            None => self.cost_policy.creation_cost(&mut rand::thread_rng()),
        };
        let job = Job::new(spec.job_type, spec.version, cost);

        self.sink.set_pending_delta(spec.job_type, spec.version, 1);

        if let Err(err) = self.queue.enqueue(job) {
            self.sink.set_pending_delta(spec.job_type, spec.version, -1);
            return Err(match err {
                PipelineError::QueueClosed => PipelineError::ShuttingDown,
                other => other,
            });
        }

        tracing::trace!(job_type = %spec.job_type, version = %spec.version, "job enqueued");
        Ok(())
    }

    /// Parsea etiquetas crudas y encola
    pub fn submit_raw(&self, job_type: &str, version: &str) -> Result<(), PipelineError> {
        let (job_type, version) = self.labels.parse(job_type, version)?;
        self.submit(JobSpec::new(job_type, version))
    }

    /// Deja de aceptar submissions nuevas
    pub fn stop_accepting(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn cost_policy(&self) -> CostPolicy {
        self.cost_policy
    }

    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::{JobType, JobVersion};
    use crate::metrics::MetricsCollector;
    use std::sync::mpsc;
    use std::thread;

    fn setup(capacity: usize) -> (Dispatcher, Arc<JobQueue>, MetricsCollector) {
        let queue = Arc::new(JobQueue::new(capacity));
        let metrics = MetricsCollector::new().unwrap();
        let dispatcher = Dispatcher::new(
            Arc::clone(&queue),
            Arc::new(metrics.clone()),
            LabelSet::default(),
            CostPolicy::default(),
        );
        (dispatcher, queue, metrics)
    }

    #[test]
    fn test_submit_counts_pending_and_enqueues() {
        let (dispatcher, queue, metrics) = setup(10);
        dispatcher
            .submit(JobSpec::new(JobType::Standard, JobVersion::V1))
            .unwrap();
        dispatcher.submit_raw("standard", "v1").unwrap();

        assert_eq!(queue.stats().len, 2);
        assert_eq!(metrics.pending(JobType::Standard, JobVersion::V1), 2);

        let job = queue.dequeue().unwrap();
        let cost = job.cost().expect("cost assigned at creation");
        assert!(cost >= Duration::from_millis(10) && cost < Duration::from_millis(110));
    }

    #[test]
    fn test_explicit_cost_is_kept() {
        let (dispatcher, queue, _) = setup(10);
        dispatcher
            .submit(JobSpec::new(JobType::Pro, JobVersion::V3).with_cost(Duration::from_millis(7)))
            .unwrap();
        assert_eq!(queue.dequeue().unwrap().cost(), Some(Duration::from_millis(7)));
    }

    #[test]
    fn test_rejects_unknown_labels_without_side_effects() {
        let (dispatcher, queue, metrics) = setup(10);
        assert!(matches!(
            dispatcher.submit_raw("gold", "v1"),
            Err(PipelineError::InvalidType(_))
        ));
        assert!(matches!(
            dispatcher.submit_raw("free", "v9"),
            Err(PipelineError::InvalidVersion(_))
        ));
        assert_eq!(queue.stats().len, 0);
        assert_eq!(metrics.total_pending(), 0);
    }

    #[test]
    fn test_rejects_disabled_labels() {
        let queue = Arc::new(JobQueue::new(4));
        let metrics = MetricsCollector::new().unwrap();
        let dispatcher = Dispatcher::new(
            Arc::clone(&queue),
            Arc::new(metrics.clone()),
            LabelSet::new(&[JobType::Free], &[JobVersion::V1]),
            CostPolicy::default(),
        );

        let result = dispatcher.submit(JobSpec::new(JobType::Pro, JobVersion::V1));
        assert!(matches!(result, Err(PipelineError::LabelNotAllowed(_))));
        assert_eq!(metrics.pending(JobType::Pro, JobVersion::V1), 0);
        assert_eq!(queue.stats().len, 0);
    }

    #[test]
    fn test_stop_accepting() {
        let (dispatcher, queue, metrics) = setup(10);
        dispatcher.stop_accepting();
        assert!(matches!(
            dispatcher.submit_raw("free", "v1"),
            Err(PipelineError::ShuttingDown)
        ));
        assert_eq!(queue.stats().len, 0);
        assert_eq!(metrics.total_pending(), 0);
    }

    #[test]
    fn test_blocked_submit_rolls_back_on_close() {
        let (dispatcher, queue, metrics) = setup(1);
        dispatcher.submit_raw("free", "v2").unwrap();

        let (tx, rx) = mpsc::channel();
        let producer = {
            let dispatcher = dispatcher.clone();
            thread::spawn(move || {
                tx.send(dispatcher.submit_raw("free", "v2")).unwrap();
            })
        };

        // Bloqueado por backpressure, pero ya contado como pendiente
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        assert_eq!(metrics.pending(JobType::Free, JobVersion::V2), 2);

        queue.close();
        let result = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(matches!(result, Err(PipelineError::ShuttingDown)));
        producer.join().unwrap();

        assert_eq!(metrics.pending(JobType::Free, JobVersion::V2), 1);
    }
}
