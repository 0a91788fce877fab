//! SOCKS5 authentication
//!
//! Method negotiation (RFC 1928 section 3) and the username/password
//! sub-negotiation (RFC 1929). The method set is closed, so methods are a
//! plain variant type dispatched by the negotiator.

mod password;

pub use password::verify_credentials;

use super::consts::*;
use crate::config::SocksConfig;
use crate::error::Socks5Error;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Authentication methods the server can offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthMethod {
    /// No authentication required
    #[serde(rename = "none")]
    NoAuth,
    /// Username/password authentication (RFC 1929)
    #[serde(rename = "password")]
    UserPass,
}

impl AuthMethod {
    /// The method identifier byte
    pub fn id(self) -> u8 {
        match self {
            AuthMethod::NoAuth => SOCKS5_AUTH_METHOD_NONE,
            AuthMethod::UserPass => SOCKS5_AUTH_METHOD_PASSWORD,
        }
    }

    /// Parse a method identifier byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_AUTH_METHOD_NONE => Some(AuthMethod::NoAuth),
            SOCKS5_AUTH_METHOD_PASSWORD => Some(AuthMethod::UserPass),
            _ => None,
        }
    }
}

/// Negotiate and execute an authentication method.
///
/// Reads `VER | NMETHODS | METHODS`, selects the first method in the
/// server's preference order that the client also offers, confirms the
/// selection with `05 <id>`, and runs the method's sub-negotiation.
///
/// With no intersection the refusal `05 FF` is written and the
/// connection is unusable.
pub async fn negotiate<S>(stream: &mut S, config: &SocksConfig) -> Result<AuthMethod, Socks5Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut header = [0u8; 2];
    stream.read_exact(&mut header).await?;

    let version = header[0];
    let num_methods = header[1];

    if version != SOCKS5_VERSION {
        return Err(Socks5Error::UnsupportedVersion(version));
    }
    if num_methods == 0 {
        return Err(Socks5Error::Malformed(
            "no authentication methods offered".to_string(),
        ));
    }

    let mut offered = vec![0u8; num_methods as usize];
    stream.read_exact(&mut offered).await?;

    let selected = select_method(&config.auth_methods, &offered);

    let confirm = [
        SOCKS5_VERSION,
        selected
            .map(AuthMethod::id)
            .unwrap_or(SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE),
    ];
    stream.write_all(&confirm).await?;
    stream.flush().await?;

    let method = selected.ok_or(Socks5Error::NoAcceptableMethod)?;
    debug!("selected auth method: {:?}", method);

    match method {
        // Selection byte is the whole exchange
        AuthMethod::NoAuth => {}
        AuthMethod::UserPass => password::authenticate(stream, config).await?,
    }

    Ok(method)
}

/// Pick the server's highest-preference method also offered by the client.
fn select_method(preference: &[AuthMethod], offered: &[u8]) -> Option<AuthMethod> {
    preference
        .iter()
        .copied()
        .find(|method| offered.contains(&method.id()))
}
