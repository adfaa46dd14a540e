//! # Cola Acotada de Jobs
//! src/jobs/queue.rs
//!
//! FIFO thread-safe de capacidad fija. Es el único mecanismo de
//! backpressure del sistema:
//!
//! - `enqueue` bloquea al productor mientras la cola está llena
//! - `dequeue` bloquea al worker mientras la cola está vacía
//! - `close` despierta a todos: los productores fallan rápido y los
//!   workers drenan lo que quede antes de recibir `None`

use crate::error::PipelineError;
use crate::jobs::job::Job;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

struct QueueState {
    items: VecDeque<Job>,
    closed: bool,
}

/// Cola FIFO acotada compartida por dispatchers y workers
pub struct JobQueue {
    state: Mutex<QueueState>,

    /// Señal para workers esperando datos
    not_empty: Condvar,

    /// Señal para productores esperando espacio
    not_full: Condvar,

    capacity: usize,
}

impl JobQueue {
    /// Crea una cola vacía. Una capacidad de 0 se trata como 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity.min(16_384)),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Inserta al final, bloqueando mientras la cola esté llena
    ///
    /// Retorna `QueueClosed` si la cola se cerró antes o durante la espera;
    /// en ese caso el job no se insertó.
    pub fn enqueue(&self, job: Job) -> Result<(), PipelineError> {
        let mut state = self.state.lock();

        loop {
            if state.closed {
                return Err(PipelineError::QueueClosed);
            }
            if state.items.len() < self.capacity {
                break;
            }
            self.not_full.wait(&mut state);
        }

        state.items.push_back(job);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Remueve el job en la cabeza, bloqueando mientras esté vacía
    ///
    /// Retorna `None` sólo cuando la cola está cerrada y ya no quedan items.
    pub fn dequeue(&self) -> Option<Job> {
        match self.dequeue_unless(|| false) {
            Dequeued::Job(job) => Some(job),
            Dequeued::Held | Dequeued::Closed => None,
        }
    }

    /// Como `dequeue`, pero no entrega nada mientras `hold()` sea verdadero
    ///
    /// `hold` se evalúa con el lock de la cola tomado, antes de cada intento.
    /// Quien cambie la condición debe llamar a `wake_consumers` para que los
    /// que esperan la vuelvan a evaluar.
    pub fn dequeue_unless<F: Fn() -> bool>(&self, hold: F) -> Dequeued {
        let mut state = self.state.lock();

        loop {
            if state.closed && state.items.is_empty() {
                return Dequeued::Closed;
            }
            if hold() {
                return Dequeued::Held;
            }
            if let Some(job) = state.items.pop_front() {
                self.not_full.notify_one();
                return Dequeued::Job(job);
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// Despierta a los consumidores bloqueados para que reevalúen su `hold`
    pub fn wake_consumers(&self) {
        // Con el lock tomado nadie queda entre la evaluación y el wait
        let _state = self.state.lock();
        self.not_empty.notify_all();
    }

    /// Cierra la cola y despierta a todos los que esperan
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Vacía la cola y devuelve lo que quedaba (usado al abortar)
    pub fn drain(&self) -> Vec<Job> {
        let mut state = self.state.lock();
        let drained: Vec<Job> = state.items.drain(..).collect();
        self.not_full.notify_all();
        drained
    }

    /// Estadísticas puntuales de la cola
    pub fn stats(&self) -> QueueStats {
        let state = self.state.lock();
        QueueStats {
            len: state.items.len(),
            capacity: self.capacity,
            closed: state.closed,
        }
    }
}

/// Resultado de `JobQueue::dequeue_unless`
#[derive(Debug)]
pub enum Dequeued {
    Job(Job),
    /// `hold()` fue verdadero; la cola no se tocó
    Held,
    /// Cerrada y sin items
    Closed,
}

/// Estadísticas de una cola
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct QueueStats {
    pub len: usize,
    pub capacity: usize,
    pub closed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::{JobType, JobVersion};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    fn job(cost_ms: u64) -> Job {
        Job::new(
            JobType::Standard,
            JobVersion::V1,
            Some(Duration::from_millis(cost_ms)),
        )
    }

    #[test]
    fn test_fifo_order() {
        let queue = JobQueue::new(10);
        for i in 0..5 {
            queue.enqueue(job(i)).unwrap();
        }

        for i in 0..5 {
            let out = queue.dequeue().unwrap();
            assert_eq!(out.cost(), Some(Duration::from_millis(i)));
        }
        assert_eq!(queue.stats().len, 0);
    }

    #[test]
    fn test_enqueue_blocks_when_full() {
        let queue = Arc::new(JobQueue::new(1));
        queue.enqueue(job(1)).unwrap();

        let (done_tx, done_rx) = mpsc::channel();
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                queue.enqueue(job(2)).unwrap();
                done_tx.send(()).unwrap();
            })
        };

        // El productor debe seguir bloqueado
        assert!(done_rx.recv_timeout(Duration::from_millis(100)).is_err());

        // Liberar un lugar lo despierta
        assert_eq!(queue.dequeue().unwrap().cost(), Some(Duration::from_millis(1)));
        done_rx.recv_timeout(Duration::from_secs(1)).expect("producer unblocked");
        producer.join().unwrap();

        assert_eq!(queue.dequeue().unwrap().cost(), Some(Duration::from_millis(2)));
    }

    #[test]
    fn test_dequeue_wakes_on_enqueue() {
        let queue = Arc::new(JobQueue::new(4));
        let (tx, rx) = mpsc::channel();

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let job = queue.dequeue().expect("queue closed");
                tx.send(job.cost()).unwrap();
            })
        };

        thread::sleep(Duration::from_millis(20));
        queue.enqueue(job(42)).unwrap();

        let cost = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(cost, Some(Duration::from_millis(42)));
        consumer.join().unwrap();
    }

    #[test]
    fn test_each_item_consumed_once() {
        let queue = Arc::new(JobQueue::new(1000));
        for i in 0..1000 {
            queue.enqueue(job(i)).unwrap();
        }
        queue.close();

        let consumers = 8;
        let barrier = Arc::new(Barrier::new(consumers));
        let mut handles = Vec::new();
        for _ in 0..consumers {
            let queue = Arc::clone(&queue);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                let mut seen = Vec::new();
                while let Some(job) = queue.dequeue() {
                    seen.push(job.cost().unwrap().as_millis() as u64);
                }
                seen
            }));
        }

        let mut all = HashSet::new();
        let mut total = 0;
        for handle in handles {
            for id in handle.join().unwrap() {
                total += 1;
                assert!(all.insert(id), "job {} delivered twice", id);
            }
        }
        assert_eq!(total, 1000);
        assert_eq!(all.len(), 1000);
    }

    #[test]
    fn test_close_fails_blocked_producer() {
        let queue = Arc::new(JobQueue::new(1));
        queue.enqueue(job(1)).unwrap();

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.enqueue(job(2)))
        };

        thread::sleep(Duration::from_millis(50));
        queue.close();

        let result = producer.join().unwrap();
        assert!(matches!(result, Err(PipelineError::QueueClosed)));
        assert!(matches!(queue.enqueue(job(3)), Err(PipelineError::QueueClosed)));
    }

    #[test]
    fn test_close_drains_then_returns_none() {
        let queue = JobQueue::new(4);
        queue.enqueue(job(1)).unwrap();
        queue.enqueue(job(2)).unwrap();
        queue.close();

        assert!(queue.dequeue().is_some());
        assert!(queue.dequeue().is_some());
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn test_hold_keeps_items_in_queue() {
        let queue = JobQueue::new(4);
        queue.enqueue(job(5)).unwrap();

        assert!(matches!(queue.dequeue_unless(|| true), Dequeued::Held));
        assert_eq!(queue.stats().len, 1);
        assert!(matches!(queue.dequeue_unless(|| false), Dequeued::Job(_)));
    }

    #[test]
    fn test_wake_consumers_reevaluates_hold() {
        let queue = Arc::new(JobQueue::new(4));
        let held = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();

        let consumer = {
            let queue = Arc::clone(&queue);
            let held = Arc::clone(&held);
            thread::spawn(move || {
                let outcome = queue.dequeue_unless(|| held.load(Ordering::SeqCst));
                tx.send(matches!(outcome, Dequeued::Held)).unwrap();
            })
        };

        // El consumidor queda esperando sobre la cola vacía
        thread::sleep(Duration::from_millis(50));
        held.store(true, Ordering::SeqCst);
        queue.wake_consumers();

        assert!(rx.recv_timeout(Duration::from_secs(1)).unwrap());
        consumer.join().unwrap();
    }

    #[test]
    fn test_closed_and_empty_wins_over_hold() {
        let queue = JobQueue::new(2);
        queue.close();
        assert!(matches!(queue.dequeue_unless(|| true), Dequeued::Closed));
    }

    #[test]
    fn test_drain_empties_queue() {
        let queue = JobQueue::new(4);
        queue.enqueue(job(1)).unwrap();
        queue.enqueue(job(2)).unwrap();
        assert_eq!(queue.drain().len(), 2);
        assert_eq!(queue.stats().len, 0);
    }
}
