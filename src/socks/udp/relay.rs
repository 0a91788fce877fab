//! UDP ASSOCIATE relay
//!
//! Allocates the per-session relay socket, confirms it to the client, and
//! rewrites datagrams between the client and its peers until the control
//! TCP connection closes.

use crate::config::SocksConfig;
use crate::error::Socks5Error;
use crate::resolver::Resolver;
use crate::socks::command::send_success;
use crate::socks::consts::{MAX_UDP_PACKET, MIN_UDP_PACKET};
use crate::socks::types::{Request, TargetAddr};
use crate::socks::udp::packet::{encode_reply_packet, parse_packet};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

/// Handle a UDP ASSOCIATE request.
///
/// Binds a fresh relay socket, replies with its advertised address, and
/// runs the datagram rewriter. The session lives as long as the control
/// connection: when the client closes it (or the relay socket fails) the
/// socket is released and all peer mappings are dropped.
///
/// Errors returned from this function always precede the success reply.
pub async fn handle_udp_associate<S>(
    stream: &mut S,
    request: &Request,
    config: &SocksConfig,
    resolver: &dyn Resolver,
) -> Result<(), Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    // Bind in the same address family the client reached us on.
    let bind_addr: SocketAddr = match request.local_bind {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };

    let socket = UdpSocket::bind(bind_addr)
        .await
        .map_err(Socks5Error::UdpBind)?;
    let local_addr = socket.local_addr().map_err(Socks5Error::UdpBind)?;

    // Advertise the interface the control connection arrived on; the
    // relay socket itself is bound to the wildcard address.
    let advertised = if local_addr.ip().is_unspecified() {
        SocketAddr::new(request.local_bind.ip(), local_addr.port())
    } else {
        local_addr
    };

    send_success(stream, advertised).await?;

    info!(
        "udp associate established for {} at {}",
        request.client_peer, advertised
    );

    let mut session = UdpSession {
        socket,
        client_ip: request.client_peer.ip(),
        client_addr: None,
        peers: HashMap::new(),
        resolver,
    };
    session.run(stream, config.idle_timeout()).await;

    info!("udp associate session for {} ended", request.client_peer);
    Ok(())
}

/// State of one UDP ASSOCIATE session.
///
/// The peer map records, for every destination the client has contacted,
/// the client address to deliver replies to. It is owned by the single
/// relay loop, so lookups and updates need no further coordination.
struct UdpSession<'a> {
    socket: UdpSocket,
    /// Client IP pinned from the control connection (RFC 1928 section 7)
    client_ip: IpAddr,
    /// The client's UDP endpoint, learned from its first datagram
    client_addr: Option<SocketAddr>,
    /// peer address -> client address
    peers: HashMap<SocketAddr, SocketAddr>,
    resolver: &'a dyn Resolver,
}

impl UdpSession<'_> {
    /// Run the relay until the control connection closes, the socket
    /// fails, or the optional idle timeout fires.
    async fn run<S>(&mut self, control: &mut S, idle_timeout: Option<Duration>)
    where
        S: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; MAX_UDP_PACKET];
        let mut ctrl_buf = [0u8; 1];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buf) => {
                    match result {
                        Ok((n, src)) => self.dispatch(&buf[..n], src).await,
                        Err(e) => {
                            warn!("udp relay socket failed: {}", e);
                            break;
                        }
                    }
                }
                result = control.read(&mut ctrl_buf) => {
                    match result {
                        Ok(0) => {
                            debug!("control connection closed, tearing down udp session");
                            break;
                        }
                        Ok(_) => {
                            debug!("ignoring stray data on udp control connection");
                        }
                        Err(e) => {
                            debug!("control connection error: {}", e);
                            break;
                        }
                    }
                }
                _ = idle_tick(idle_timeout) => {
                    debug!("udp session idle timeout");
                    break;
                }
            }
        }
    }

    /// Route one received datagram to the client or peer path.
    async fn dispatch(&mut self, data: &[u8], src: SocketAddr) {
        if self.client_addr == Some(src) {
            self.relay_client_datagram(data, src).await;
        } else if self.peers.contains_key(&src) {
            self.relay_peer_datagram(data, src).await;
        } else if self.client_addr.is_none() && src.ip() == self.client_ip {
            debug!("pinned udp client endpoint: {}", src);
            self.client_addr = Some(src);
            self.relay_client_datagram(data, src).await;
        } else {
            debug!("dropping datagram from unassociated source {}", src);
        }
    }

    /// Client-to-peer direction: strip the request header and forward the
    /// payload to the destination.
    async fn relay_client_datagram(&mut self, data: &[u8], client: SocketAddr) {
        if data.len() < MIN_UDP_PACKET {
            debug!("dropping short datagram ({} bytes)", data.len());
            return;
        }

        let packet = match parse_packet(data) {
            Ok(packet) => packet,
            Err(e) => {
                debug!("dropping malformed datagram: {}", e);
                return;
            }
        };

        // Fragmentation is unsupported; drop without touching the peer map.
        if packet.is_fragmented() {
            debug!("dropping fragmented datagram (frag={})", packet.frag);
            return;
        }

        let dest = match self.resolve_dest(&packet.addr).await {
            Ok(dest) => dest,
            Err(e) => {
                debug!("dropping datagram for unresolvable target: {}", e);
                return;
            }
        };

        self.peers.insert(dest, client);

        if let Err(e) = self.socket.send_to(&packet.data, dest).await {
            warn!("udp forward to {} failed: {}", dest, e);
        }
    }

    /// Peer-to-client direction: prepend the reply header carrying the
    /// peer's actual address and deliver to the client.
    async fn relay_peer_datagram(&mut self, data: &[u8], peer: SocketAddr) {
        let Some(&client) = self.peers.get(&peer) else {
            return;
        };

        let reply = encode_reply_packet(peer, data);
        if let Err(e) = self.socket.send_to(&reply, client).await {
            warn!("udp reply to client {} failed: {}", client, e);
        }
    }

    async fn resolve_dest(&self, addr: &TargetAddr) -> Result<SocketAddr, Socks5Error> {
        match addr {
            TargetAddr::Ip(dest) => Ok(*dest),
            TargetAddr::Domain(name, port) => {
                let ip = self
                    .resolver
                    .resolve(name)
                    .await
                    .map_err(|source| Socks5Error::Resolve {
                        domain: name.clone(),
                        source,
                    })?;
                Ok(SocketAddr::new(ip, *port))
            }
        }
    }
}

/// Sleeps for the idle limit, or forever when none is configured.
async fn idle_tick(idle_timeout: Option<Duration>) {
    match idle_timeout {
        Some(limit) => tokio::time::sleep(limit).await,
        None => std::future::pending().await,
    }
}
