//! Domain name resolution
//!
//! The connection driver resolves domain destinations through a [`Resolver`]
//! before dispatching a request. The default implementation uses the
//! system resolver via tokio; deployments can substitute their own.

use async_trait::async_trait;
use std::io;
use std::net::IpAddr;

/// Resolves a domain name to a single IP address.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `name` to an IP address.
    async fn resolve(&self, name: &str) -> io::Result<IpAddr>;
}

/// Resolver backed by the operating system via [`tokio::net::lookup_host`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, name: &str) -> io::Result<IpAddr> {
        let mut addrs = tokio::net::lookup_host((name, 0)).await?;
        addrs.next().map(|addr| addr.ip()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses found for {name}"),
            )
        })
    }
}
