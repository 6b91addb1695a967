//! WebSocket server for the document relay.
//!
//! The relay is whatever runs next to the rendered documents and forwards
//! frames between them and the host: a webview shim, a browser extension
//! background page, or a test double.
//!
//! # Connection Flow
//!
//! 1. Host binds WebSocket server to `localhost:0` (random port)
//! 2. Host hands [`PendingServer::ws_url`] to the relay
//! 3. Relay connects; the upgraded stream becomes a [`Connection`]

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::Connection;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for waiting for the relay to connect.
const ACCEPT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// PendingServer
// ============================================================================

/// A WebSocket server that is bound but not yet connected.
///
/// # Example
///
/// ```ignore
/// use std::net::{IpAddr, Ipv4Addr};
/// use page_translate_bridge::transport::PendingServer;
///
/// let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
/// let ws_url = server.ws_url();
///
/// // Start the relay with ws_url...
///
/// let connection = server.accept().await?;
/// ```
pub struct PendingServer {
    /// TCP listener for incoming connections.
    listener: TcpListener,
    /// Address the server is bound to.
    addr: SocketAddr,
}

impl PendingServer {
    /// Binds a WebSocket server to the specified address and port.
    ///
    /// Use port 0 to let the OS assign a random available port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let addr = listener.local_addr()?;

        debug!(port = addr.port(), "WebSocket server bound");

        Ok(Self { listener, addr })
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Returns the WebSocket URL for this server.
    ///
    /// Format: `ws://{ip}:{port}`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Returns the local socket address.
    #[inline]
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Accepts the relay's connection.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the relay doesn't connect within 30s
    /// - [`Error::WebSocket`] if the WebSocket upgrade fails
    pub async fn accept(self) -> Result<Connection> {
        let (stream, addr) = timeout(ACCEPT_TIMEOUT, self.listener.accept())
            .await
            .map_err(|_| {
                Error::protocol(format!(
                    "Relay did not connect within {}ms",
                    ACCEPT_TIMEOUT.as_millis()
                ))
            })??;

        debug!(?addr, "TCP connection accepted");

        let ws_stream = tokio_tungstenite::accept_async(stream).await?;

        info!(port = self.addr.port(), ?addr, "Relay connection established");

        Ok(Connection::new(ws_stream))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_server_bind_random_port() {
        let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind should succeed");

        assert!(server.port() > 0);
        assert!(server.ws_url().starts_with("ws://127.0.0.1:"));
    }

    #[tokio::test]
    async fn test_server_ws_url_format() {
        let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind should succeed");

        let expected = format!("ws://127.0.0.1:{}", server.port());
        assert_eq!(server.ws_url(), expected);
    }

    #[tokio::test]
    async fn test_accept_relay() {
        let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind should succeed");
        let url = server.ws_url();

        let relay = tokio::spawn(async move { tokio_tungstenite::connect_async(url).await });

        let connection = server.accept().await.expect("accept");
        assert!(!connection.is_closed());
        assert_eq!(connection.pending_count(), 0);

        let (_ws, _response) = relay.await.expect("join").expect("connect");
    }
}
