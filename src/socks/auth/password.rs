//! Username/password authentication (RFC 1929)

use crate::config::SocksConfig;
use crate::error::Socks5Error;
use crate::socks::consts::SOCKS5_AUTH_VERSION;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

const AUTH_SUCCESS: u8 = 0x00;
const AUTH_FAILURE: u8 = 0x01;

/// Run the username/password sub-negotiation on the stream.
///
/// # Protocol
///
/// Client sends:
/// ```text
/// +----+------+----------+------+----------+
/// |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
/// +----+------+----------+------+----------+
/// | 1  |  1   | 1 to 255 |  1   | 1 to 255 |
/// +----+------+----------+------+----------+
/// ```
///
/// Server responds:
/// ```text
/// +----+--------+
/// |VER | STATUS |
/// +----+--------+
/// | 1  |   1    |
/// +----+--------+
/// ```
pub async fn authenticate<S>(stream: &mut S, config: &SocksConfig) -> Result<(), Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut header = [0u8; 2];
    stream.read_exact(&mut header).await?;

    let version = header[0];
    let username_len = header[1] as usize;

    if version != SOCKS5_AUTH_VERSION {
        send_status(stream, AUTH_FAILURE).await?;
        return Err(Socks5Error::UnsupportedAuthVersion(version));
    }

    if username_len == 0 {
        send_status(stream, AUTH_FAILURE).await?;
        return Err(Socks5Error::Malformed("empty username".to_string()));
    }

    let mut username = vec![0u8; username_len];
    stream.read_exact(&mut username).await?;
    let username = match String::from_utf8(username) {
        Ok(username) => username,
        Err(_) => {
            send_status(stream, AUTH_FAILURE).await?;
            return Err(Socks5Error::Malformed("username is not UTF-8".to_string()));
        }
    };

    let password_len = stream.read_u8().await? as usize;
    if password_len == 0 {
        send_status(stream, AUTH_FAILURE).await?;
        return Err(Socks5Error::Malformed("empty password".to_string()));
    }

    let mut password = vec![0u8; password_len];
    stream.read_exact(&mut password).await?;

    if verify_credentials(config, &username, &password) {
        send_status(stream, AUTH_SUCCESS).await?;
        debug!("authentication successful for user: {}", username);
        Ok(())
    } else {
        send_status(stream, AUTH_FAILURE).await?;
        warn!("authentication failed for user: {}", username);
        Err(Socks5Error::AuthFailed(username))
    }
}

/// Check a username/password pair against the configured user database.
///
/// The password comparison runs in constant time; an unknown username is
/// compared against an empty slice so lookup failures take the same path.
pub fn verify_credentials(config: &SocksConfig, username: &str, password: &[u8]) -> bool {
    match config.lookup_user(username) {
        Some(stored) => constant_time_compare(stored.as_bytes(), password),
        None => {
            let _ = constant_time_compare(b"", password);
            false
        }
    }
}

/// Constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

async fn send_status<S: AsyncWrite + Unpin>(stream: &mut S, status: u8) -> Result<(), Socks5Error> {
    stream.write_all(&[SOCKS5_AUTH_VERSION, status]).await?;
    stream.flush().await?;
    Ok(())
}
