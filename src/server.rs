use crate::{
    auth,
    commands::{self, Connect},
    config::Config,
    error::{ProxyError, Result},
};
use std::{net::SocketAddr, num::NonZeroUsize, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpListener,
    sync::Semaphore,
    time::timeout,
};
use tracing::{debug, info};

/// Deadline for a client to get from connect to the start of the relay
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(60);

/// Socks5Server represents a SOCKS5 server and houses related
/// configuration data
pub struct Socks5Server {
    pub config: Arc<Config>,
    max_connections: Option<NonZeroUsize>,
    listener: Option<TcpListener>,
}

/// Socks5Server implementation block
impl Socks5Server {
    /// new is a constructor for the Socks5Server type
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            max_connections: None,
            listener: None,
        }
    }

    /// with_max_connections bounds how many clients are served at once.
    /// Unbounded unless set.
    pub fn with_max_connections(mut self, max_connections: Option<NonZeroUsize>) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// bind to the configured port on all interfaces
    pub async fn bind(&mut self) -> anyhow::Result<SocketAddr> {
        if let Some(listener) = &self.listener {
            return Ok(listener.local_addr()?);
        }

        let listener = TcpListener::bind(self.config.listen_addr()).await?;
        let addr = listener.local_addr()?;

        info!("SOCKS5 proxy listening on {}", addr);

        self.listener = Some(listener);
        Ok(addr)
    }

    /// run accepts clients forever, handing each to its own task.
    /// Accept errors are transient and never stop the loop.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let listener = match self.listener.take() {
            Some(listener) => listener,
            None => {
                self.bind().await?;
                self.listener
                    .take()
                    .ok_or_else(|| anyhow::anyhow!("[ERR] listener missing after bind"))?
            }
        };

        let limiter = self
            .max_connections
            .map(|n| Arc::new(Semaphore::new(n.get())));

        loop {
            // Wait for a free slot before accepting when bounded
            let permit = match &limiter {
                Some(limiter) => Some(Arc::clone(limiter).acquire_owned().await?),
                None => None,
            };

            let (inbound, peer_addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    debug!("accept error: {}", e);
                    continue;
                }
            };

            let config = Arc::clone(&self.config);

            tokio::spawn(async move {
                debug!("new client: {}", peer_addr);

                match handle_connection(inbound, config).await {
                    Ok((from_client, from_server)) => debug!(
                        "client {} closed: {} bytes from client, {} bytes from server",
                        peer_addr, from_client, from_server
                    ),
                    Err(e) => debug!("client {} dropped: {}", peer_addr, e),
                }

                drop(permit);
            });
        }
    }
}

/// handle_connection owns one client for its whole life: negotiation under the
/// handshake deadline, then an unbounded relay. The client stream is moved in
/// and dropped on every return path, so it is closed exactly once.
pub async fn handle_connection<S>(mut stream: S, config: Arc<Config>) -> Result<(u64, u64)>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let outbound = timeout(HANDSHAKE_TIMEOUT, async {
        auth::negotiate_method(&mut stream).await?;
        auth::authenticate_userpass(&mut stream, &config).await?;
        let target = commands::handle_socks_request(&mut stream).await?;

        debug!("CONNECT {}", target);

        commands::handle_connect(&mut stream, &target).await
    })
    .await
    .map_err(|_| ProxyError::HandshakeTimeout)??;

    // No deadline once data transfer begins
    Connect {
        inbound: stream,
        outbound,
    }
    .run()
    .await
}
