//! TCP listener that serves each accepted connection on its own thread.
//!
//! All connections share one [`MessagePool`] and one [`Handler`].  The
//! accept loop polls a non-blocking listener so it can notice the `running`
//! flag being cleared; connections already accepted keep running until
//! their peer disconnects.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::Duration;

use lrpc_core::protocol::{MessagePool, ProtocolError};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::application::dispatch::Handler;
use crate::infrastructure::network::connection::Connection;
use crate::infrastructure::network::is_timeout_error;
use crate::infrastructure::storage::config::{ConfigError, NodeConfig};

/// How long the accept loop sleeps when no connection is pending.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Error type for the server and its connections.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The listener socket could not be configured or queried.
    #[error("listener error: {0}")]
    Listener(#[source] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A frame could not be read from or written to a connection.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// A bound listener plus the state its connections share.
pub struct Server {
    listener: TcpListener,
    pool: Arc<MessagePool>,
    handler: Arc<dyn Handler>,
    max_body_len: u32,
    read_timeout: Option<Duration>,
}

impl Server {
    /// Binds the listener described by `config.server`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] for an unparsable bind address and
    /// [`ServerError::Bind`] if the port cannot be bound.
    pub fn bind(config: &NodeConfig, handler: Arc<dyn Handler>) -> Result<Self, ServerError> {
        let addr = config.server.socket_addr()?;
        let listener =
            TcpListener::bind(addr).map_err(|source| ServerError::Bind { addr, source })?;
        listener
            .set_nonblocking(true)
            .map_err(ServerError::Listener)?;

        Ok(Self {
            listener,
            pool: Arc::new(MessagePool::new(config.pool.max_idle)),
            handler,
            max_body_len: config.server.max_body_len,
            read_timeout: config.server.read_timeout(),
        })
    }

    /// The bound address; useful after binding port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr().map_err(ServerError::Listener)
    }

    pub fn pool(&self) -> &Arc<MessagePool> {
        &self.pool
    }

    /// Accepts connections until `running` is cleared.
    pub fn run(&self, running: Arc<AtomicBool>) {
        match self.local_addr() {
            Ok(addr) => info!("lrpc server listening on {addr}"),
            Err(e) => warn!("lrpc server listening on unknown address: {e}"),
        }

        while running.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, peer)) => self.spawn_connection(stream, peer),
                Err(e) if is_timeout_error(&e) => thread::sleep(ACCEPT_POLL_INTERVAL),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    // Typically fd exhaustion or an aborted handshake; keep serving
                    error!("accept failed: {e}");
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        let stats = self.pool.stats();
        info!(
            pool = ?stats,
            "lrpc server stopped (pool hit rate {:.1}%)",
            stats.hit_rate()
        );
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = self.configure_stream(&stream) {
            warn!(%peer, "dropping connection, socket setup failed: {e}");
            return;
        }
        info!(%peer, "connection accepted");

        let pool = Arc::clone(&self.pool);
        let handler = Arc::clone(&self.handler);
        let max_body_len = self.max_body_len;

        let spawned = thread::Builder::new()
            .name(format!("lrpc-conn-{peer}"))
            .spawn(move || {
                let mut conn = Connection::new(stream, pool, handler)
                    .with_peer(peer.to_string())
                    .with_max_body_len(max_body_len);
                match conn.serve() {
                    Ok(frames) => info!(%peer, frames, "connection closed"),
                    Err(e) => warn!(%peer, "connection failed: {e}"),
                }
            });
        if let Err(e) = spawned {
            error!(%peer, "failed to spawn connection thread: {e}");
        }
    }

    fn configure_stream(&self, stream: &TcpStream) -> std::io::Result<()> {
        // Some platforms hand out accepted sockets in the listener's mode
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(self.read_timeout)
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("local_addr", &self.listener.local_addr().ok())
            .field("pool", &self.pool)
            .field("max_body_len", &self.max_body_len)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}
