//! Admission queue and worker pool.
//!
//! The acceptor hands every accepted connection to a fixed set of long-lived
//! workers through an [`AdmissionQueue`]. The queue holds one slot per
//! worker. `offer` waits for a free slot before handing a connection over,
//! and the slot travels with the connection until its handler returns, so at
//! most `workers` connections are ever being handled at once. Connections
//! beyond that wait in the listener backlog.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::lookup::StatusLookup;
use crate::protocol::{handle_connection, HandlerSettings};

/// Coerce a configured worker count to a usable one: anything below 1 is 1.
pub fn effective_workers(configured: i64) -> usize {
    usize::try_from(configured).unwrap_or(0).max(1)
}

/// An accepted connection together with the slot it occupies.
struct Admission {
    stream: TcpStream,
    peer: SocketAddr,
    slot: OwnedSemaphorePermit,
}

/// The admission queue has no receivers left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("admission queue closed")]
pub struct AdmissionClosed;

/// Bounded handoff between the acceptor and the workers.
pub struct AdmissionQueue {
    slots: Arc<Semaphore>,
    sender: mpsc::Sender<Admission>,
    receiver: Arc<Mutex<mpsc::Receiver<Admission>>>,
    capacity: usize,
}

impl AdmissionQueue {
    /// Create a queue with `capacity` slots (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots not currently held by a connection.
    pub fn free_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Hand a connection to the workers, waiting until a slot is free.
    pub async fn offer(&self, stream: TcpStream, peer: SocketAddr) -> Result<(), AdmissionClosed> {
        let slot = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| AdmissionClosed)?;

        // Each queued admission holds a slot, so the channel never fills.
        self.sender
            .send(Admission { stream, peer, slot })
            .await
            .map_err(|_| AdmissionClosed)
    }

    fn receiver(&self) -> Arc<Mutex<mpsc::Receiver<Admission>>> {
        Arc::clone(&self.receiver)
    }
}

/// A fixed set of workers draining one admission queue.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn one worker per queue slot.
    pub fn spawn(
        queue: &AdmissionQueue,
        lookup: Arc<dyn StatusLookup>,
        settings: HandlerSettings,
    ) -> Self {
        let workers = queue.capacity();
        info!(workers, "Starting worker pool");

        let handles = (0..workers)
            .map(|worker_id| {
                let receiver = queue.receiver();
                let lookup = Arc::clone(&lookup);
                tokio::spawn(worker_loop(worker_id, receiver, lookup, settings))
            })
            .collect();

        WorkerPool { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to exit. Workers only exit once the queue is
    /// dropped.
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<Admission>>>,
    lookup: Arc<dyn StatusLookup>,
    settings: HandlerSettings,
) {
    debug!(worker = worker_id, "Worker started");

    loop {
        let admission = receiver.lock().await.recv().await;
        let Some(Admission { stream, peer, slot }) = admission else {
            break;
        };

        let outcome = handle_connection(stream, peer, &*lookup, &settings).await;
        debug!(worker = worker_id, %peer, ?outcome, "Connection closed");
        drop(slot);
    }

    debug!(worker = worker_id, "Worker stopped");
}
