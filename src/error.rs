//! Error types for socksd
//!
//! Defines the SOCKS5 protocol error type and the mapping from socket
//! errors to RFC 1928 reply codes.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors raised while serving a SOCKS5 connection
#[derive(Error, Debug)]
pub enum Socks5Error {
    /// Client spoke a SOCKS version other than 5
    #[error("unsupported SOCKS version: {0:#04x}")]
    UnsupportedVersion(u8),

    /// Username/password sub-negotiation used a version other than 0x01
    #[error("unsupported auth sub-negotiation version: {0:#04x}")]
    UnsupportedAuthVersion(u8),

    /// Frame violated the protocol (non-zero reserved byte, bad lengths, ...)
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// No intersection between client methods and server preference list
    #[error("no acceptable authentication method")]
    NoAcceptableMethod,

    /// Username/password verification failed
    #[error("authentication failed for user: {0}")]
    AuthFailed(String),

    /// Request carried a command outside CONNECT/BIND/UDP ASSOCIATE,
    /// or the command is disabled by configuration
    #[error("command not supported: {0:#04x}")]
    CommandNotSupported(u8),

    /// Request carried an unknown ATYP byte
    #[error("address type not supported: {0:#04x}")]
    AddressTypeNotSupported(u8),

    /// Domain name resolution failed
    #[error("failed to resolve domain {domain}: {source}")]
    Resolve {
        /// The domain name from the request
        domain: String,
        /// The underlying resolver error
        #[source]
        source: io::Error,
    },

    /// Outbound TCP dial failed
    #[error("failed to connect to {dest}: {source}")]
    Connect {
        /// The destination that was dialed
        dest: SocketAddr,
        /// The underlying socket error
        #[source]
        source: io::Error,
    },

    /// UDP relay socket allocation failed
    #[error("failed to bind UDP relay socket: {0}")]
    UdpBind(#[source] io::Error),

    /// BIND is enabled but not implemented
    #[error("BIND command not implemented")]
    BindUnimplemented,

    /// Transport failure on the control connection
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Socks5Error {
    /// The reply code to send for this error, if one is defined.
    ///
    /// Returns `None` for protocol violations and authentication failures:
    /// those close the connection without a request-reply frame (the
    /// negotiation sub-protocol has its own refusal bytes).
    pub fn reply_code(&self) -> Option<ReplyCode> {
        match self {
            Socks5Error::CommandNotSupported(_) => Some(ReplyCode::CommandNotSupported),
            Socks5Error::AddressTypeNotSupported(_) => Some(ReplyCode::AddressTypeNotSupported),
            Socks5Error::Resolve { .. } => Some(ReplyCode::HostUnreachable),
            Socks5Error::Connect { source, .. } => Some(ReplyCode::from_io_error(source)),
            Socks5Error::UdpBind(source) => Some(ReplyCode::from_io_error(source)),
            Socks5Error::BindUnimplemented => Some(ReplyCode::GeneralFailure),
            _ => None,
        }
    }
}

/// Reply codes for the SOCKS5 protocol (RFC 1928 section 6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReplyCode {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
    /// Connection not allowed by ruleset
    ConnectionNotAllowed = 0x02,
    /// Network unreachable
    NetworkUnreachable = 0x03,
    /// Host unreachable
    HostUnreachable = 0x04,
    /// Connection refused
    ConnectionRefused = 0x05,
    /// TTL expired
    TtlExpired = 0x06,
    /// Command not supported
    CommandNotSupported = 0x07,
    /// Address type not supported
    AddressTypeNotSupported = 0x08,
}

impl ReplyCode {
    /// Classify a socket error into a reply code.
    ///
    /// Matches on structured [`io::ErrorKind`] values first; unmatched
    /// kinds fall back to substring classification of the error text,
    /// which covers platforms that surface raw OS errors as `Other`.
    pub fn from_io_error(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => ReplyCode::ConnectionRefused,
            io::ErrorKind::NetworkUnreachable => ReplyCode::NetworkUnreachable,
            io::ErrorKind::HostUnreachable => ReplyCode::HostUnreachable,
            io::ErrorKind::TimedOut => ReplyCode::HostUnreachable,
            io::ErrorKind::AddrNotAvailable => ReplyCode::HostUnreachable,
            io::ErrorKind::PermissionDenied => ReplyCode::ConnectionNotAllowed,
            _ => Self::classify_message(err),
        }
    }

    // Portability fallback only; structured kinds take precedence.
    fn classify_message(err: &io::Error) -> Self {
        let msg = err.to_string();
        if msg.contains("refused") {
            ReplyCode::ConnectionRefused
        } else if msg.contains("network is unreachable") {
            ReplyCode::NetworkUnreachable
        } else if msg.contains("unreachable") || msg.contains("no route") {
            ReplyCode::HostUnreachable
        } else {
            ReplyCode::GeneralFailure
        }
    }
}

impl From<ReplyCode> for u8 {
    fn from(code: ReplyCode) -> Self {
        code as u8
    }
}

impl TryFrom<u8> for ReplyCode {
    type Error = Socks5Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(ReplyCode::Succeeded),
            0x01 => Ok(ReplyCode::GeneralFailure),
            0x02 => Ok(ReplyCode::ConnectionNotAllowed),
            0x03 => Ok(ReplyCode::NetworkUnreachable),
            0x04 => Ok(ReplyCode::HostUnreachable),
            0x05 => Ok(ReplyCode::ConnectionRefused),
            0x06 => Ok(ReplyCode::TtlExpired),
            0x07 => Ok(ReplyCode::CommandNotSupported),
            0x08 => Ok(ReplyCode::AddressTypeNotSupported),
            other => Err(Socks5Error::Malformed(format!(
                "unknown reply code: {other:#04x}"
            ))),
        }
    }
}
