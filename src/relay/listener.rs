//! RTMP relay listener
//!
//! Accepts clients and runs a [`RelaySession`] for each one. The upstream
//! server is dialed only after the client's C0+C1 has been validated.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::relay::config::RelayConfig;
use crate::relay::handler::{RelayContext, RelayHandler};
use crate::relay::session::{EstablishedRelay, RelaySession};

/// Pause after a failed accept so a persistent error (e.g. EMFILE) does not spin
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// RTMP handshake relay server
pub struct RelayServer<H: RelayHandler> {
    config: RelayConfig,
    handler: Arc<H>,
    next_session_id: AtomicU64,
    session_semaphore: Option<Arc<Semaphore>>,
}

impl<H: RelayHandler> RelayServer<H> {
    /// Create a new relay with the given configuration and handler
    pub fn new(config: RelayConfig, handler: H) -> Self {
        let session_semaphore = if config.max_sessions > 0 {
            Some(Arc::new(Semaphore::new(config.max_sessions)))
        } else {
            None
        };

        Self {
            config,
            handler: Arc::new(handler),
            next_session_id: AtomicU64::new(1),
            session_semaphore,
        }
    }

    /// Run the relay
    ///
    /// This method blocks until the listener fails.
    pub async fn run(&self) -> Result<()> {
        self.config.validate()?;
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            upstream = %self.config.upstream_addr,
            "RTMP relay listening"
        );
        self.accept_loop(&listener).await
    }

    /// Run the relay with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        self.config.validate()?;
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        self.config.validate()?;
        tracing::info!(
            addr = %listener.local_addr()?,
            upstream = %self.config.upstream_addr,
            "RTMP relay listening"
        );

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        }
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check session limit
        let permit = if let Some(ref sem) = self.session_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(session_id = session_id, peer = %peer_addr, "New connection");

        let ctx = RelayContext {
            session_id,
            peer_addr,
            upstream_addr: self.config.upstream_addr.clone(),
        };
        let config = self.config.clone();
        let handler = Arc::clone(&self.handler);

        tokio::spawn(async move {
            let _permit = permit;

            if !handler.on_connection(&ctx).await {
                tracing::debug!(session_id = session_id, "Connection refused by handler");
                return;
            }

            match relay_connection(&ctx, socket, &config).await {
                Ok(relay) => {
                    if let Err(e) = handler.on_established(&ctx, relay).await {
                        tracing::debug!(session_id = session_id, error = %e, "Relay error");
                    }
                }
                Err(e) => {
                    handler.on_failed(&ctx, &e).await;
                }
            }

            tracing::debug!(session_id = session_id, "Connection closed");
        });
    }
}

/// Relay the handshake for one client, dialing the upstream once C1 checks out
async fn relay_connection(
    ctx: &RelayContext,
    client: TcpStream,
    config: &RelayConfig,
) -> Result<EstablishedRelay<TcpStream, TcpStream>> {
    if config.tcp_nodelay {
        client.set_nodelay(true)?;
    }

    RelaySession::new(ctx.session_id, client, config.read_timeout)
        .run(|| dial_upstream(ctx, config))
        .await
}

async fn dial_upstream(ctx: &RelayContext, config: &RelayConfig) -> Result<TcpStream> {
    let server = timeout(config.connect_timeout, TcpStream::connect(&config.upstream_addr))
        .await
        .map_err(|_| Error::Timeout)?
        .map_err(|e| {
            tracing::warn!(
                session_id = ctx.session_id,
                upstream = %config.upstream_addr,
                error = %e,
                "Failed to dial upstream"
            );
            Error::Io(e)
        })?;

    if config.tcp_nodelay {
        server.set_nodelay(true)?;
    }
    Ok(server)
}
