//! TCP acceptor for the status protocol.
//!
//! Binds the listener, starts the worker pool, and feeds every accepted
//! connection into the admission queue. The acceptor blocks on the queue
//! when all workers are busy; that is the only backpressure the server has.

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, trace};

use crate::config::Config;
use crate::lookup::StatusLookup;
use crate::pool::{effective_workers, AdmissionClosed, AdmissionQueue, WorkerPool};
use crate::protocol::HandlerSettings;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid listen address '{0}'")]
    InvalidAddress(String),
    #[error("unable to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error(transparent)]
    Admission(#[from] AdmissionClosed),
}

/// Server instance
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    workers: usize,
    settings: HandlerSettings,
    lookup: Arc<dyn StatusLookup>,
}

impl Server {
    /// Bind the listen socket. Must be called from within a Tokio runtime.
    pub fn bind(config: &Config, lookup: Arc<dyn StatusLookup>) -> Result<Self, ServerError> {
        let addr = config
            .listen
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| ServerError::InvalidAddress(config.listen.clone()))?;

        let listener = create_listener(addr, config.backlog)
            .and_then(TcpListener::from_std)
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Server {
            listener,
            local_addr,
            workers: effective_workers(config.workers),
            settings: config.handler_settings(),
            lookup,
        })
    }

    /// The address actually bound, useful when listening on port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Start the workers and accept connections until the process exits.
    pub async fn run(self) -> Result<(), ServerError> {
        let queue = AdmissionQueue::new(self.workers);
        let _pool = WorkerPool::spawn(&queue, Arc::clone(&self.lookup), self.settings);

        info!(
            address = %self.local_addr,
            workers = self.workers,
            read_timeout_ms = self.settings.read_timeout.as_millis() as u64,
            "Server listening"
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    trace!(%peer, "Accepted connection");
                    queue.offer(stream, peer).await?;
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

fn create_listener(addr: SocketAddr, backlog: i32) -> std::io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog.max(1))?;

    Ok(socket.into())
}
