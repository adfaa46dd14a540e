//! # Generador Sintético de Jobs
//! src/jobs/generator.rs
//!
//! Fabrica jobs aleatorios a una cadencia fija para simular carga. Usa el
//! mismo `Dispatcher::submit` que el camino HTTP, así que también sufre el
//! backpressure de la cola.

use crate::error::PipelineError;
use crate::jobs::dispatcher::Dispatcher;
use crate::jobs::job::JobSpec;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handle de un generador en ejecución
pub struct Generator {
    stop: Arc<AtomicBool>,
    submitted: Arc<AtomicU64>,
    handle: JoinHandle<()>,
}

impl Generator {
    /// Lanza el thread generador
    ///
    /// `limit` acota la cantidad de jobs (None = infinito).
    pub fn start(
        dispatcher: Dispatcher,
        interval: Duration,
        limit: Option<u64>,
    ) -> Result<Self, PipelineError> {
        let stop = Arc::new(AtomicBool::new(false));
        let submitted = Arc::new(AtomicU64::new(0));

        let handle = {
            let stop = Arc::clone(&stop);
            let submitted = Arc::clone(&submitted);
            thread::Builder::new()
                .name("job-generator".to_string())
                .spawn(move || generate(dispatcher, interval, limit, stop, submitted))?
        };

        tracing::info!(interval_ms = interval.as_millis() as u64, "job generator started");

        Ok(Self {
            stop,
            submitted,
            handle,
        })
    }

    /// Jobs aceptados hasta ahora
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Pide al generador que pare y espera a que termine
    ///
    /// Si está bloqueado en un `submit` con la cola llena, sólo sale cuando
    /// la cola se libera o se cierra.
    pub fn stop(self) -> u64 {
        self.stop.store(true, Ordering::SeqCst);
        if self.handle.join().is_err() {
            tracing::warn!("job generator thread panicked");
        }
        self.submitted.load(Ordering::SeqCst)
    }

    /// Marca el pedido de parada sin esperar
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

fn generate(
    dispatcher: Dispatcher,
    interval: Duration,
    limit: Option<u64>,
    stop: Arc<AtomicBool>,
    submitted: Arc<AtomicU64>,
) {
    let mut rng = rand::thread_rng();

    while !stop.load(Ordering::SeqCst) {
        if let Some(limit) = limit {
            if submitted.load(Ordering::SeqCst) >= limit {
                break;
            }
        }

        let spec = match JobSpec::random(dispatcher.labels(), &mut rng) {
            Some(spec) => spec,
            None => {
                tracing::error!("no labels enabled, generator exiting");
                break;
            }
        };

        match dispatcher.submit(spec) {
            Ok(()) => {
                submitted.fetch_add(1, Ordering::SeqCst);
            }
            Err(PipelineError::ShuttingDown) | Err(PipelineError::QueueClosed) => break,
            Err(err) => {
                tracing::warn!(error = %err, "generator submission rejected");
            }
        }

        thread::sleep(interval);
    }

    tracing::info!(submitted = submitted.load(Ordering::SeqCst), "job generator stopped");
}
