//! # Pool de Workers
//! src/jobs/worker.rs
//!
//! N threads independientes que drenan la cola compartida. Cada worker:
//!
//! 1. Espera en el `PauseGate` (si el pool está pausado)
//! 2. Desencola un job (bloquea si la cola está vacía, y suelta la espera
//!    si el pool se pausa mientras tanto)
//! 3. Lo procesa y mide el tiempo transcurrido
//! 4. Reporta processed, pending -1 y duración, en ese orden
//!
//! Un job que falla (o cuyo procesador hace panic) igual decrementa el
//! gauge y se cuenta como fallido; el worker sigue vivo.

use crate::error::{ConfigError, PipelineError, ProcessingError};
use crate::jobs::job::{CostPolicy, Job};
use crate::jobs::queue::{Dequeued, JobQueue};
use crate::metrics::{MetricsSink, WorkerId};
use parking_lot::{Condvar, Mutex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Trabajo real que ejecuta un worker sobre un job
pub trait JobProcessor: Send + Sync {
    fn process(&self, job: &Job, worker_id: WorkerId) -> Result<(), ProcessingError>;
}

impl<F> JobProcessor for F
where
    F: Fn(&Job, WorkerId) -> Result<(), ProcessingError> + Send + Sync,
{
    fn process(&self, job: &Job, worker_id: WorkerId) -> Result<(), ProcessingError> {
        self(job, worker_id)
    }
}

/// Procesador simulado: duerme el costo del job
///
/// Si el job no trae costo (modo `processing`), lo sortea en el momento.
pub struct SimulatedProcessor {
    policy: CostPolicy,
}

impl SimulatedProcessor {
    pub fn new(policy: CostPolicy) -> Self {
        Self { policy }
    }
}

impl JobProcessor for SimulatedProcessor {
    fn process(&self, job: &Job, _worker_id: WorkerId) -> Result<(), ProcessingError> {
        let cost = job
            .cost()
            .unwrap_or_else(|| self.policy.draw(&mut rand::thread_rng()));
        thread::sleep(cost);
        Ok(())
    }
}

/// Compuerta que detiene a los workers antes de desencolar
///
/// Pausar no interrumpe jobs en curso. Un worker bloqueado esperando datos
/// reevalúa la compuerta cuando `WorkerPool::pause` despierta la cola.
pub struct PauseGate {
    paused: Mutex<bool>,
    changed: Condvar,
}

impl PauseGate {
    pub fn new(paused: bool) -> Self {
        Self {
            paused: Mutex::new(paused),
            changed: Condvar::new(),
        }
    }

    pub fn pause(&self) {
        *self.paused.lock() = true;
    }

    pub fn resume(&self) {
        let mut paused = self.paused.lock();
        *paused = false;
        self.changed.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.lock()
    }

    /// Bloquea mientras la compuerta esté cerrada
    pub fn wait(&self) {
        let mut paused = self.paused.lock();
        while *paused {
            self.changed.wait(&mut paused);
        }
    }
}

/// Resultado de `WorkerPool::shutdown`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShutdownReport {
    /// Workers que confirmaron su salida antes del timeout
    pub stopped: Vec<WorkerId>,
    /// Workers que no terminaron a tiempo (quedan desacoplados)
    pub stragglers: Vec<WorkerId>,
    /// Jobs que quedaban en la cola al abortar
    pub discarded: usize,
}

impl ShutdownReport {
    /// Todos los workers terminaron y no se descartó nada
    pub fn is_clean(&self) -> bool {
        self.stragglers.is_empty() && self.discarded == 0
    }
}

/// Estado compartido por un worker
struct WorkerContext {
    id: WorkerId,
    queue: Arc<JobQueue>,
    sink: Arc<dyn MetricsSink>,
    processor: Arc<dyn JobProcessor>,
    gate: Arc<PauseGate>,
    abort: Arc<AtomicBool>,
    busy: Arc<AtomicUsize>,
    exit_tx: mpsc::Sender<WorkerId>,
}

/// Pool de tamaño fijo
pub struct WorkerPool {
    handles: Vec<(WorkerId, JoinHandle<()>)>,
    exit_rx: mpsc::Receiver<WorkerId>,
    queue: Arc<JobQueue>,
    sink: Arc<dyn MetricsSink>,
    gate: Arc<PauseGate>,
    abort: Arc<AtomicBool>,
    busy: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Inicia `size` workers sobre la cola
    pub fn start(
        size: usize,
        queue: Arc<JobQueue>,
        sink: Arc<dyn MetricsSink>,
        processor: Arc<dyn JobProcessor>,
    ) -> Result<Self, PipelineError> {
        Self::spawn(size, queue, sink, processor, false)
    }

    /// Igual que `start` pero con la compuerta cerrada hasta `resume()`
    pub fn start_paused(
        size: usize,
        queue: Arc<JobQueue>,
        sink: Arc<dyn MetricsSink>,
        processor: Arc<dyn JobProcessor>,
    ) -> Result<Self, PipelineError> {
        Self::spawn(size, queue, sink, processor, true)
    }

    fn spawn(
        size: usize,
        queue: Arc<JobQueue>,
        sink: Arc<dyn MetricsSink>,
        processor: Arc<dyn JobProcessor>,
        paused: bool,
    ) -> Result<Self, PipelineError> {
        if size == 0 {
            return Err(ConfigError::NoWorkers.into());
        }

        tracing::info!(workers = size, paused, "starting worker pool");

        let gate = Arc::new(PauseGate::new(paused));
        let abort = Arc::new(AtomicBool::new(false));
        let busy = Arc::new(AtomicUsize::new(0));
        let (exit_tx, exit_rx) = mpsc::channel();

        let mut pool = Self {
            handles: Vec::with_capacity(size),
            exit_rx,
            queue: Arc::clone(&queue),
            sink: Arc::clone(&sink),
            gate: Arc::clone(&gate),
            abort: Arc::clone(&abort),
            busy: Arc::clone(&busy),
        };

        for id in 0..size {
            let ctx = WorkerContext {
                id,
                queue: Arc::clone(&queue),
                sink: Arc::clone(&sink),
                processor: Arc::clone(&processor),
                gate: Arc::clone(&gate),
                abort: Arc::clone(&abort),
                busy: Arc::clone(&busy),
                exit_tx: exit_tx.clone(),
            };

            let spawned = thread::Builder::new()
                .name(format!("worker-{}", id))
                .spawn(move || worker_loop(ctx));

            match spawned {
                Ok(handle) => pool.handles.push((id, handle)),
                Err(err) => {
                    // Los ya lanzados no deben quedar colgados de la cola
                    pool.abort.store(true, Ordering::SeqCst);
                    pool.gate.resume();
                    pool.queue.close();
                    return Err(err.into());
                }
            }
        }

        Ok(pool)
    }

    /// Workers procesando un job en este momento
    pub fn busy_workers(&self) -> usize {
        self.busy.load(Ordering::SeqCst)
    }

    /// Al volver, ningún worker toma otro job hasta `resume()`
    pub fn pause(&self) {
        self.gate.pause();
        self.queue.wake_consumers();
    }

    pub fn resume(&self) {
        self.gate.resume();
    }

    pub fn is_paused(&self) -> bool {
        self.gate.is_paused()
    }

    /// Detiene el pool de forma observable
    ///
    /// Cierra la cola (los productores fallan rápido), deja que los workers
    /// drenen lo pendiente y espera sus confirmaciones hasta `timeout`. Si
    /// el plazo vence, aborta: los workers salen en el próximo límite entre
    /// jobs y lo que quede en cola se descarta revirtiendo su pendiente.
    pub fn shutdown(self, timeout: Duration) -> ShutdownReport {
        tracing::info!(workers = self.handles.len(), ?timeout, "shutting down worker pool");

        self.gate.resume();
        self.queue.close();

        let deadline = Instant::now() + timeout;
        let mut stopped = Vec::with_capacity(self.handles.len());
        while stopped.len() < self.handles.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.exit_rx.recv_timeout(remaining) {
                Ok(id) => stopped.push(id),
                Err(_) => break,
            }
        }

        let mut report = ShutdownReport::default();

        if stopped.len() < self.handles.len() {
            self.abort.store(true, Ordering::SeqCst);
            for job in self.queue.drain() {
                self.sink.set_pending_delta(job.job_type(), job.version(), -1);
                report.discarded += 1;
            }
            tracing::warn!(
                stopped = stopped.len(),
                discarded = report.discarded,
                "worker pool did not drain before timeout"
            );
        }

        for (id, handle) in self.handles {
            if stopped.contains(&id) {
                if handle.join().is_err() {
                    tracing::warn!(worker_id = id, "worker thread panicked");
                }
            } else {
                report.stragglers.push(id);
            }
        }

        stopped.sort_unstable();
        report.stopped = stopped;
        tracing::info!(
            stopped = report.stopped.len(),
            stragglers = report.stragglers.len(),
            "worker pool stopped"
        );
        report
    }
}

/// Loop principal del worker
fn worker_loop(ctx: WorkerContext) {
    tracing::debug!(worker_id = ctx.id, "worker started");

    loop {
        ctx.gate.wait();
        if ctx.abort.load(Ordering::SeqCst) {
            break;
        }

        let job = match ctx.queue.dequeue_unless(|| ctx.gate.is_paused()) {
            Dequeued::Job(job) => job,
            Dequeued::Held => continue,
            Dequeued::Closed => break,
        };

        if ctx.abort.load(Ordering::SeqCst) {
            // Nunca se procesará: revertir su pendiente
            ctx.sink.set_pending_delta(job.job_type(), job.version(), -1);
            break;
        }

        ctx.busy.fetch_add(1, Ordering::SeqCst);
        process_job(&ctx, &job);
        ctx.busy.fetch_sub(1, Ordering::SeqCst);
    }

    let _ = ctx.exit_tx.send(ctx.id);
    tracing::debug!(worker_id = ctx.id, "worker stopped");
}

/// Procesa un job y registra su resultado exactamente una vez
fn process_job(ctx: &WorkerContext, job: &Job) {
    let job_type = job.job_type();
    let version = job.version();

    let start = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| ctx.processor.process(job, ctx.id)));
    let elapsed = start.elapsed().as_secs_f64();

    match outcome {
        Ok(Ok(())) => {
            ctx.sink.increment_processed(ctx.id, job_type, version);
            ctx.sink.set_pending_delta(job_type, version, -1);
            ctx.sink.observe_duration(ctx.id, job_type, version, elapsed);
            tracing::debug!(
                worker_id = ctx.id,
                job_type = %job_type,
                version = %version,
                "processed job in {:.3} seconds",
                elapsed
            );
        }
        Ok(Err(err)) => {
            ctx.sink.increment_failed(ctx.id, job_type, version);
            ctx.sink.set_pending_delta(job_type, version, -1);
            tracing::warn!(worker_id = ctx.id, job_type = %job_type, version = %version, error = %err, "job failed");
        }
        Err(_) => {
            ctx.sink.increment_failed(ctx.id, job_type, version);
            ctx.sink.set_pending_delta(job_type, version, -1);
            tracing::warn!(worker_id = ctx.id, job_type = %job_type, version = %version, "job processor panicked");
        }
    }
}
