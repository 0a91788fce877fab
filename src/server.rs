//! SOCKS5 server accept loop

use crate::config::ServerConfig;
use crate::resolver::{Resolver, SystemResolver};
use crate::socks::serve_connection;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// The SOCKS5 server.
///
/// Owns the configuration and the resolver; every accepted connection is
/// served by its own task and shares nothing with the others.
#[derive(Clone)]
pub struct Socks5Server {
    config: Arc<ServerConfig>,
    resolver: Arc<dyn Resolver>,
}

impl Socks5Server {
    /// Create a server with the system resolver.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            resolver: Arc::new(SystemResolver),
        }
    }

    /// Replace the resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Bind the configured listen address and serve forever.
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.config.listen_addr))?;

        self.serve(listener).await
    }

    /// Serve connections from an already-bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!("SOCKS5 server listening on {}", local_addr);

        loop {
            let (stream, peer_addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    // Transient accept failures must not stop the server.
                    error!("failed to accept connection: {}", e);
                    continue;
                }
            };

            let local_bind = match stream.local_addr() {
                Ok(addr) => addr,
                Err(e) => {
                    error!("failed to read local address: {}", e);
                    continue;
                }
            };

            debug!("accepted connection from {}", peer_addr);

            let config = self.config.clone();
            let resolver = self.resolver.clone();
            tokio::spawn(async move {
                let _ = serve_connection(
                    stream,
                    peer_addr,
                    local_bind,
                    &config.socks,
                    resolver.as_ref(),
                )
                .await;
                debug!("connection from {} closed", peer_addr);
            });
        }
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SocksConfig;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    #[test]
    fn test_server_new_keeps_config() {
        let config = ServerConfig {
            listen_addr: "127.0.0.1:7777".to_string(),
            socks: SocksConfig::default(),
        };
        let server = Socks5Server::new(config);
        assert_eq!(server.config().listen_addr, "127.0.0.1:7777");
    }

    #[tokio::test]
    async fn test_serve_accepts_connections() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = Socks5Server::new(ServerConfig::default());
        tokio::spawn(async move {
            let _ = server.serve(listener).await;
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(&[0x05, 0x01, 0x00]).await.unwrap();

        let mut selection = [0u8; 2];
        client.read_exact(&mut selection).await.unwrap();
        assert_eq!(selection, [0x05, 0x00]);
    }

    #[tokio::test]
    async fn test_custom_resolver_is_used() {
        struct FixedResolver;

        #[async_trait::async_trait]
        impl Resolver for FixedResolver {
            async fn resolve(&self, _name: &str) -> std::io::Result<std::net::IpAddr> {
                Ok(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST))
            }
        }

        // One-shot echo target the fixed resolver points at.
        let echo = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let echo_port = echo.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut conn, _) = echo.accept().await.unwrap();
            let mut buf = [0u8; 16];
            if let Ok(n) = conn.read(&mut buf).await {
                let _ = conn.write_all(&buf[..n]).await;
            }
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server =
            Socks5Server::new(ServerConfig::default()).with_resolver(Arc::new(FixedResolver));
        tokio::spawn(async move {
            let _ = server.serve(listener).await;
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(&[0x05, 0x01, 0x00]).await.unwrap();
        let mut selection = [0u8; 2];
        client.read_exact(&mut selection).await.unwrap();

        let name = b"echo.internal";
        let mut request = vec![0x05, 0x01, 0x00, 0x03, name.len() as u8];
        request.extend_from_slice(name);
        request.extend_from_slice(&echo_port.to_be_bytes());
        client.write_all(&request).await.unwrap();

        let mut reply = [0u8; 10];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply[1], 0x00);

        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
    }

    #[tokio::test]
    async fn test_run_fails_on_unbindable_address() {
        let server = Socks5Server::new(ServerConfig {
            listen_addr: "256.0.0.1:1080".to_string(),
            socks: SocksConfig::default(),
        });
        assert!(server.run().await.is_err());
    }
}
