//! Tests de integración del pipeline
//! tests/pipeline_test.rs
//!
//! Ejercitan cola, dispatcher, pool y métricas juntos a través de la API
//! pública de `JobManager`. Cada test usa su propio `MetricsCollector`.

use job_pipeline::error::{PipelineError, ProcessingError};
use job_pipeline::jobs::{
    CostMode, CostPolicy, Job, JobManager, JobManagerConfig, JobSpec, JobType, JobVersion, LabelSet,
};
use job_pipeline::metrics::{MetricsCollector, WorkerId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

fn config(workers: usize, capacity: usize, paused: bool) -> JobManagerConfig {
    JobManagerConfig {
        workers,
        queue_capacity: capacity,
        labels: LabelSet::default(),
        cost_policy: CostPolicy::new(
            CostMode::Creation,
            Duration::from_millis(1),
            Duration::from_millis(5),
        ),
        generator_interval: None,
        start_paused: paused,
    }
}

/// Espera activa acotada hasta que `cond` se cumpla
fn wait_for<F: Fn() -> bool>(cond: F, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

#[test]
fn test_backpressure_scenario() {
    let manager = Arc::new(JobManager::start(config(1, 5, true), MetricsCollector::new().unwrap()).unwrap());
    let spec = JobSpec::new(JobType::Standard, JobVersion::V1).with_cost(Duration::from_millis(5));

    for _ in 0..5 {
        manager.submit(spec).unwrap();
    }
    assert_eq!(manager.metrics().pending(JobType::Standard, JobVersion::V1), 5);
    assert_eq!(manager.queue_stats().len, 5);

    // El 6to submit debe quedar bloqueado mientras el worker está pausado
    let (done_tx, done_rx) = mpsc::channel();
    let producer = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || {
            let result = manager.submit(spec);
            let _ = done_tx.send(());
            result
        })
    };

    assert!(
        done_rx.recv_timeout(Duration::from_millis(200)).is_err(),
        "sixth submit should block while the queue is full"
    );
    assert_eq!(manager.queue_stats().len, 5);

    manager.resume();

    done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("sixth submit should unblock after resume");
    producer.join().unwrap().unwrap();

    let metrics = manager.metrics();
    assert!(wait_for(
        || metrics.pending(JobType::Standard, JobVersion::V1) == 0
            && metrics.processed(JobType::Standard, JobVersion::V1) == 6,
        Duration::from_secs(5)
    ));
    assert!(manager.shutdown(Duration::from_secs(2)).is_clean());
}

#[test]
fn test_pause_after_start_applies_backpressure() {
    let manager = Arc::new(JobManager::start(config(2, 5, false), MetricsCollector::new().unwrap()).unwrap());
    let spec = JobSpec::new(JobType::Pro, JobVersion::V2).with_cost(Duration::from_millis(1));

    thread::sleep(Duration::from_millis(50));
    manager.pause();
    for _ in 0..5 {
        manager.submit(spec).unwrap();
    }

    let (done_tx, done_rx) = mpsc::channel();
    let producer = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || {
            let result = manager.submit(spec);
            let _ = done_tx.send(());
            result
        })
    };

    assert!(done_rx.recv_timeout(Duration::from_millis(200)).is_err());
    assert_eq!(manager.queue_stats().len, 5);
    assert_eq!(manager.metrics().total_processed(), 0);

    manager.resume();
    done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    producer.join().unwrap().unwrap();

    let metrics = manager.metrics();
    assert!(wait_for(
        || metrics.total_processed() == 6 && metrics.total_pending() == 0,
        Duration::from_secs(5)
    ));
    assert!(manager.shutdown(Duration::from_secs(2)).is_clean());
}

#[test]
fn test_pending_conservation_per_label() {
    let manager = JobManager::start(config(2, 100, true), MetricsCollector::new().unwrap()).unwrap();

    let batch = [
        (JobType::Free, JobVersion::V1, 3),
        (JobType::Pro, JobVersion::V2, 7),
        (JobType::Advanced, JobVersion::V3, 4),
    ];
    for &(job_type, version, count) in &batch {
        for _ in 0..count {
            manager.submit(JobSpec::new(job_type, version)).unwrap();
        }
    }

    for &(job_type, version, count) in &batch {
        assert_eq!(manager.metrics().pending(job_type, version), count);
    }

    manager.resume();
    let metrics = manager.metrics();
    assert!(wait_for(
        || metrics.total_processed() == 14 && metrics.total_pending() == 0,
        Duration::from_secs(5)
    ));

    for &(job_type, version, count) in &batch {
        assert_eq!(metrics.pending(job_type, version), 0);
        assert_eq!(metrics.processed(job_type, version), count as u64);
    }
    manager.shutdown(Duration::from_secs(2));
}

#[test]
fn test_exactly_once_under_load() {
    const JOBS: u64 = 1000;
    const WORKERS: usize = 10;

    let manager = Arc::new(JobManager::start(config(WORKERS, 64, false), MetricsCollector::new().unwrap()).unwrap());

    // Cuatro productores concurrentes contra una cola chica
    let producers: Vec<_> = (0..4)
        .map(|p| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                for i in 0..JOBS / 4 {
                    let job_type = JobType::ALL[((p + i) % 4) as usize];
                    let spec = JobSpec::new(job_type, JobVersion::V2).with_cost(Duration::ZERO);
                    manager.submit(spec).unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let report = manager.shutdown(Duration::from_secs(10));
    assert!(report.is_clean());
    assert_eq!(report.stopped.len(), WORKERS);

    let metrics = manager.metrics();
    assert_eq!(metrics.total_processed(), JOBS);
    let per_worker: u64 = (0..WORKERS)
        .map(|id| metrics.total_processed_by_worker(id))
        .sum();
    assert_eq!(per_worker, JOBS);
    assert_eq!(metrics.total_pending(), 0);
    assert_eq!(metrics.total_failed(), 0);
}

#[test]
fn test_latency_observation_sanity() {
    const COST: Duration = Duration::from_millis(40);
    const SLACK: f64 = 0.25;

    let manager = JobManager::start(config(1, 4, false), MetricsCollector::new().unwrap()).unwrap();
    manager
        .submit(JobSpec::new(JobType::Pro, JobVersion::V3).with_cost(COST))
        .unwrap();

    let metrics = manager.metrics();
    assert!(wait_for(
        || metrics.duration(0, JobType::Pro, JobVersion::V3).is_some(),
        Duration::from_secs(5)
    ));

    let histogram = metrics
        .duration(0, JobType::Pro, JobVersion::V3)
        .expect("duration recorded for worker 0");
    assert_eq!(histogram.count, 1);
    assert!(histogram.sum_seconds >= COST.as_secs_f64());
    assert!(histogram.sum_seconds <= COST.as_secs_f64() + SLACK);
    manager.shutdown(Duration::from_secs(2));
}

#[test]
fn test_label_rejection_leaves_no_trace() {
    let mut cfg = config(1, 4, true);
    cfg.labels = LabelSet::new(&[JobType::Standard], &[JobVersion::V1]);
    let manager = JobManager::start(cfg, MetricsCollector::new().unwrap()).unwrap();

    assert!(matches!(
        manager.submit_raw("gold", "v1"),
        Err(PipelineError::InvalidType(_))
    ));
    assert!(matches!(
        manager.submit_raw("standard", "v9"),
        Err(PipelineError::InvalidVersion(_))
    ));
    assert!(matches!(
        manager.submit(JobSpec::new(JobType::Pro, JobVersion::V1)),
        Err(PipelineError::LabelNotAllowed(_))
    ));

    assert_eq!(manager.metrics().total_pending(), 0);
    assert_eq!(manager.queue_stats().len, 0);
    manager.shutdown(Duration::from_secs(1));
}

#[test]
fn test_failures_counted_without_duration() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let processor = {
        let attempts = Arc::clone(&attempts);
        move |job: &Job, _worker: WorkerId| -> Result<(), ProcessingError> {
            attempts.fetch_add(1, Ordering::SeqCst);
            if job.job_type() == JobType::Free {
                Err(ProcessingError("free tier quota exceeded".to_string()))
            } else {
                Ok(())
            }
        }
    };

    let manager = JobManager::start_with_processor(
        config(2, 16, false),
        MetricsCollector::new().unwrap(),
        Arc::new(processor),
    )
    .unwrap();

    for _ in 0..3 {
        manager.submit(JobSpec::new(JobType::Free, JobVersion::V1)).unwrap();
        manager.submit(JobSpec::new(JobType::Standard, JobVersion::V1)).unwrap();
    }

    let metrics = manager.metrics();
    assert!(wait_for(|| attempts.load(Ordering::SeqCst) == 6, Duration::from_secs(5)));
    assert!(manager.shutdown(Duration::from_secs(2)).is_clean());

    assert_eq!(metrics.failed(JobType::Free, JobVersion::V1), 3);
    assert_eq!(metrics.processed(JobType::Free, JobVersion::V1), 0);
    assert_eq!(metrics.processed(JobType::Standard, JobVersion::V1), 3);
    assert_eq!(metrics.total_pending(), 0);

    let snapshot = metrics.snapshot();
    assert!(snapshot
        .durations
        .iter()
        .all(|series| series.job_type != JobType::Free));
}

#[test]
fn test_shutdown_unblocks_waiting_producer() {
    let manager = Arc::new(JobManager::start(config(1, 2, true), MetricsCollector::new().unwrap()).unwrap());
    manager.submit(JobSpec::new(JobType::Free, JobVersion::V1)).unwrap();
    manager.submit(JobSpec::new(JobType::Free, JobVersion::V1)).unwrap();

    let producer = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || manager.submit(JobSpec::new(JobType::Free, JobVersion::V1)))
    };
    thread::sleep(Duration::from_millis(50));

    manager.shutdown(Duration::from_secs(5));
    let result = producer.join().unwrap();

    // Según el orden, el productor entró antes o después del cierre
    let metrics = manager.metrics();
    match result {
        Ok(()) => assert_eq!(metrics.total_processed(), 3),
        Err(err) => {
            assert!(matches!(err, PipelineError::ShuttingDown));
            assert_eq!(metrics.total_processed(), 2);
        }
    }
    assert_eq!(metrics.total_pending(), 0);
}

#[test]
fn test_processing_mode_draws_cost_in_worker() {
    let mut cfg = config(1, 4, false);
    cfg.cost_policy = CostPolicy::new(
        CostMode::Processing,
        Duration::from_millis(20),
        Duration::from_millis(21),
    );
    let manager = JobManager::start(cfg, MetricsCollector::new().unwrap()).unwrap();
    manager.submit(JobSpec::new(JobType::Advanced, JobVersion::V1)).unwrap();

    let metrics = manager.metrics();
    assert!(wait_for(
        || metrics.duration(0, JobType::Advanced, JobVersion::V1).is_some(),
        Duration::from_secs(5)
    ));
    let histogram = metrics.duration(0, JobType::Advanced, JobVersion::V1).unwrap();
    assert!(histogram.sum_seconds >= 0.020);
    manager.shutdown(Duration::from_secs(2));
}
