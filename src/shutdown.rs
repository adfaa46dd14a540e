//! # Señal de Apagado
//! src/shutdown.rs
//!
//! Token de cancelación compartido entre threads. Lo disparan SIGINT,
//! SIGTERM o `POST /admin/shutdown`, y el thread principal lo espera para
//! correr el apagado ordenado del pipeline.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Inner {
    triggered: Mutex<bool>,
    changed: Condvar,
}

/// Token clonable; todos los clones comparten el mismo estado
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispara la señal; devuelve `false` si ya estaba disparada
    pub fn trigger(&self) -> bool {
        let mut triggered = self.inner.triggered.lock();
        if *triggered {
            return false;
        }
        *triggered = true;
        self.inner.changed.notify_all();
        tracing::info!("shutdown requested");
        true
    }

    /// Dispara la señal al recibir SIGINT o SIGTERM
    ///
    /// El handler es único por proceso: una segunda instalación falla.
    pub fn listen_for_termination(&self) -> Result<(), ctrlc::Error> {
        let signal = self.clone();
        ctrlc::set_handler(move || {
            if signal.trigger() {
                tracing::info!("termination signal received");
            }
        })
    }

    pub fn is_triggered(&self) -> bool {
        *self.inner.triggered.lock()
    }

    /// Bloquea hasta que alguien dispare la señal
    pub fn wait(&self) {
        let mut triggered = self.inner.triggered.lock();
        while !*triggered {
            self.inner.changed.wait(&mut triggered);
        }
    }

    /// Como `wait`, con límite; devuelve si la señal quedó disparada
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut triggered = self.inner.triggered.lock();
        if !*triggered {
            self.inner
                .changed
                .wait_while_for(&mut triggered, |triggered| !*triggered, timeout);
        }
        *triggered
    }
}
