//! SOCKS5 reply writer

use crate::error::{ReplyCode, Socks5Error};
use crate::socks::consts::*;
use crate::socks::types::TargetAddr;
use bytes::{BufMut, BytesMut};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Send a SOCKS5 reply frame.
///
/// # Reply format (RFC 1928 section 6)
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// With no bind address the zero IPv4 address `0.0.0.0:0` is written,
/// which is the form used by all failure replies.
pub async fn send_reply<S>(
    stream: &mut S,
    code: ReplyCode,
    bind_addr: Option<SocketAddr>,
) -> Result<(), Socks5Error>
where
    S: AsyncWrite + Unpin,
{
    let bind = TargetAddr::from(
        bind_addr.unwrap_or_else(|| SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)),
    );

    let mut reply = BytesMut::with_capacity(3 + 1 + 16 + 2);
    reply.put_slice(&[SOCKS5_VERSION, code.into(), SOCKS5_RESERVED]);
    bind.write_to_buf(&mut reply);

    stream.write_all(&reply).await?;
    stream.flush().await?;

    Ok(())
}

/// Send a success reply carrying the server-side bind address.
pub async fn send_success<S>(stream: &mut S, bind_addr: SocketAddr) -> Result<(), Socks5Error>
where
    S: AsyncWrite + Unpin,
{
    send_reply(stream, ReplyCode::Succeeded, Some(bind_addr)).await
}
