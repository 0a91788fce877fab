//! Per-connection driver
//!
//! Orchestrates one SOCKS5 connection through its states:
//!
//! ```text
//! ACCEPTED -> METHOD_NEG -> AUTH -> REQ_PARSE -> DISPATCH
//!                                                   |- CONNECT: REPLY_OK -> RELAYING -> CLOSED
//!                                                   |- UDP:     REPLY_OK -> UDP_RELAY -> CLOSED
//!                                                   `- *:       REPLY_ERR -> CLOSED
//! ```
//!
//! The driver is the sole authority for error replies: handlers only
//! return errors before their success reply has been written, so at most
//! one reply frame is ever sent per connection.

use crate::config::SocksConfig;
use crate::error::Socks5Error;
use crate::resolver::Resolver;
use crate::socks::auth;
use crate::socks::command::{parse_request, send_reply};
use crate::socks::tcp_relay::handle_connect;
use crate::socks::types::{SocksCommand, TargetAddr};
use crate::socks::udp::handle_udp_associate;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

/// Serve one accepted connection to completion.
///
/// On failure, sends the mapped reply frame when the protocol state
/// allows one and logs a single line with the cause. All resources owned
/// by the connection are released by the time this returns.
pub async fn serve_connection<S>(
    mut stream: S,
    client_peer: SocketAddr,
    local_bind: SocketAddr,
    config: &SocksConfig,
    resolver: &dyn Resolver,
) -> Result<(), Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    match drive(&mut stream, client_peer, local_bind, config, resolver).await {
        Ok(()) => Ok(()),
        Err(err) => {
            if let Some(code) = err.reply_code() {
                warn!("request from {} failed ({:?}): {}", client_peer, code, err);
                if let Err(write_err) = send_reply(&mut stream, code, None).await {
                    debug!("failed to send error reply: {}", write_err);
                }
            } else {
                warn!("connection from {} failed: {}", client_peer, err);
            }
            Err(err)
        }
    }
}

async fn drive<S>(
    stream: &mut S,
    client_peer: SocketAddr,
    local_bind: SocketAddr,
    config: &SocksConfig,
    resolver: &dyn Resolver,
) -> Result<(), Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let method = auth::negotiate(stream, config).await?;
    debug!("authenticated {} with {:?}", client_peer, method);

    let request = parse_request(stream, client_peer, local_bind).await?;
    info!("{} {} from {}", request.command, request.dest, client_peer);

    // The original domain stays on the request for logging; the outbound
    // socket uses the resolved destination.
    let dest = match &request.dest {
        TargetAddr::Ip(addr) => *addr,
        TargetAddr::Domain(name, port) => {
            let ip = resolver
                .resolve(name)
                .await
                .map_err(|source| Socks5Error::Resolve {
                    domain: name.clone(),
                    source,
                })?;
            debug!("resolved {} to {}", name, ip);
            SocketAddr::new(ip, *port)
        }
    };

    match request.command {
        SocksCommand::Connect => handle_connect(stream, &request, dest, config).await,
        SocksCommand::Bind => {
            if config.enable_bind {
                Err(Socks5Error::BindUnimplemented)
            } else {
                Err(Socks5Error::CommandNotSupported(u8::from(
                    SocksCommand::Bind,
                )))
            }
        }
        SocksCommand::UdpAssociate => {
            if config.enable_udp {
                handle_udp_associate(stream, &request, config, resolver).await
            } else {
                Err(Socks5Error::CommandNotSupported(u8::from(
                    SocksCommand::UdpAssociate,
                )))
            }
        }
    }
}
