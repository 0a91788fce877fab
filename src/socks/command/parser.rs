//! SOCKS5 request parser

use crate::error::Socks5Error;
use crate::socks::consts::*;
use crate::socks::types::{Request, SocksCommand, TargetAddr};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

/// Parse a SOCKS5 request from the stream.
///
/// # Request format (RFC 1928 section 4)
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// A wrong version or a non-zero reserved byte is fatal for the
/// connection. An unknown ATYP or command yields the corresponding
/// recoverable error; the command is validated only after the address has
/// been consumed, so a command-not-supported reply follows a fully read
/// frame.
///
/// `client_peer` and `local_bind` are the accepted socket's addresses and
/// are recorded on the request as-is.
pub async fn parse_request<S>(
    stream: &mut S,
    client_peer: SocketAddr,
    local_bind: SocketAddr,
) -> Result<Request, Socks5Error>
where
    S: AsyncRead + Unpin,
{
    let mut header = [0u8; 3];
    stream.read_exact(&mut header).await?;

    let version = header[0];
    let cmd_byte = header[1];
    let reserved = header[2];

    if version != SOCKS5_VERSION {
        return Err(Socks5Error::UnsupportedVersion(version));
    }
    if reserved != SOCKS5_RESERVED {
        return Err(Socks5Error::Malformed(format!(
            "reserved byte must be zero, got {reserved:#04x}"
        )));
    }

    let dest = TargetAddr::read_from(stream).await?;

    let command = SocksCommand::try_from_byte(cmd_byte)?;

    debug!("parsed request: {} {}", command, dest);

    Ok(Request {
        command,
        dest,
        client_peer,
        local_bind,
    })
}
