//! # socksd - SOCKS5 Proxy Server
//!
//! socksd is a standalone SOCKS5 proxy server implementing RFC 1928 with
//! username/password sub-negotiation per RFC 1929. It accepts inbound TCP
//! connections, negotiates an authentication method, parses the request,
//! and relays traffic to the requested destination.
//!
//! ## Features
//!
//! - **CONNECT**: full-duplex TCP relay with half-close propagation
//! - **UDP ASSOCIATE**: per-session UDP relay socket with client/peer mapping
//! - **Authentication**: no-auth and username/password, in configurable
//!   preference order
//! - **Error mapping**: socket errors are translated into RFC 1928 reply codes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use socksd::config::load_config;
//! use socksd::server::Socks5Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config("config.toml")?;
//!     Socks5Server::new(config.server).run().await
//! }
//! ```
//!
//! ## Architecture
//!
//! Each accepted connection is served by its own task:
//!
//! ```text
//! accept -> negotiate auth -> parse request -> dispatch -> relay -> close
//! ```
//!
//! Any failure produces at most one reply frame with the mapped code,
//! followed by connection close.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod resolver;
pub mod server;
pub mod socks;

// Re-export commonly used items
pub use config::{load_config, Config};
pub use error::{ReplyCode, Socks5Error};
pub use server::Socks5Server;

/// Version of the socksd library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
