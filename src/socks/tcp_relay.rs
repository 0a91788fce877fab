//! TCP relay for the CONNECT command
//!
//! Dials the destination, confirms with a success reply carrying the
//! outbound socket's local address, then relays bytes in both directions
//! until both sides reach end-of-stream.

use crate::config::SocksConfig;
use crate::error::Socks5Error;
use crate::socks::command::send_success;
use crate::socks::consts::RELAY_BUFFER_SIZE;
use crate::socks::types::Request;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

/// Handle a CONNECT request.
///
/// Errors returned from this function always precede the success reply;
/// the caller maps them to the single error reply. Once the reply is
/// written, transport failures only terminate the relay.
pub async fn handle_connect<S>(
    stream: &mut S,
    request: &Request,
    dest: SocketAddr,
    config: &SocksConfig,
) -> Result<(), Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    debug!("connecting to target: {}", dest);

    let target = match timeout(config.connect_timeout(), TcpStream::connect(dest)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => return Err(Socks5Error::Connect { dest, source }),
        Err(_) => {
            return Err(Socks5Error::Connect {
                dest,
                source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
            })
        }
    };

    let bind_addr = target
        .local_addr()
        .map_err(|source| Socks5Error::Connect { dest, source })?;
    send_success(stream, bind_addr).await?;

    info!(
        "tunnel established: {} -> {} (via {})",
        request.client_peer, dest, bind_addr
    );

    match relay(stream, target, config.idle_timeout()).await {
        Ok((up, down)) => {
            debug!("relay finished: {} bytes up, {} bytes down", up, down);
        }
        Err(e) => {
            debug!("relay terminated: {}", e);
        }
    }

    Ok(())
}

/// Relay bytes between two streams in both directions.
///
/// Each direction copies until end-of-stream on its source and then shuts
/// down the write half of its destination, so a half-closed peer keeps
/// receiving the other direction. The relay ends when both directions
/// reach EOF, or immediately on the first transport error.
///
/// Returns the byte counts copied client-to-target and target-to-client.
pub async fn relay<A, B>(a: A, b: B, idle_timeout: Option<Duration>) -> io::Result<(u64, u64)>
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (a_read, a_write) = tokio::io::split(a);
    let (b_read, b_write) = tokio::io::split(b);

    tokio::try_join!(
        copy_half(a_read, b_write, idle_timeout),
        copy_half(b_read, a_write, idle_timeout),
    )
}

/// Copy one direction with a fixed reusable buffer, then propagate
/// half-close to the destination.
async fn copy_half<R, W>(
    mut src: ReadHalf<R>,
    mut dst: WriteHalf<W>,
    idle_timeout: Option<Duration>,
) -> io::Result<u64>
where
    R: AsyncRead,
    W: AsyncWrite,
{
    let mut buf = vec![0u8; RELAY_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let n = match idle_timeout {
            Some(limit) => match timeout(limit, src.read(&mut buf)).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "relay idle timeout",
                    ))
                }
            },
            None => src.read(&mut buf).await?,
        };

        if n == 0 {
            break;
        }

        dst.write_all(&buf[..n]).await?;
        total += n as u64;
    }

    dst.shutdown().await?;
    Ok(total)
}
