//! SOCKS5 core types
//!
//! The command enum, the address codec, and the request record.

use super::consts::*;
use crate::error::Socks5Error;
use bytes::BufMut;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::io::{AsyncRead, AsyncReadExt};

/// SOCKS5 command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocksCommand {
    /// TCP CONNECT - establish a TCP tunnel to the destination
    Connect,
    /// TCP BIND - accept an inbound connection on the client's behalf (reserved)
    Bind,
    /// UDP ASSOCIATE - establish a UDP relay
    UdpAssociate,
}

impl SocksCommand {
    /// Decode the CMD byte of a request frame.
    ///
    /// Bytes outside the three commands of RFC 1928 fail with
    /// [`Socks5Error::CommandNotSupported`].
    pub fn try_from_byte(byte: u8) -> Result<Self, Socks5Error> {
        match byte {
            SOCKS5_CMD_TCP_CONNECT => Ok(SocksCommand::Connect),
            SOCKS5_CMD_TCP_BIND => Ok(SocksCommand::Bind),
            SOCKS5_CMD_UDP_ASSOCIATE => Ok(SocksCommand::UdpAssociate),
            other => Err(Socks5Error::CommandNotSupported(other)),
        }
    }

    fn name(self) -> &'static str {
        match self {
            SocksCommand::Connect => "CONNECT",
            SocksCommand::Bind => "BIND",
            SocksCommand::UdpAssociate => "UDP ASSOCIATE",
        }
    }
}

impl From<SocksCommand> for u8 {
    fn from(command: SocksCommand) -> Self {
        match command {
            SocksCommand::Connect => SOCKS5_CMD_TCP_CONNECT,
            SocksCommand::Bind => SOCKS5_CMD_TCP_BIND,
            SocksCommand::UdpAssociate => SOCKS5_CMD_UDP_ASSOCIATE,
        }
    }
}

impl fmt::Display for SocksCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A SOCKS5 address: `ATYP | addr | port` on the wire.
///
/// IP addresses carry raw octets; domain names are length-prefixed and
/// not validated beyond their length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAddr {
    /// IP address with port
    Ip(SocketAddr),
    /// Domain name with port
    Domain(String, u16),
}

impl TargetAddr {
    /// IPv4 destination
    pub fn ipv4(ip: Ipv4Addr, port: u16) -> Self {
        TargetAddr::Ip((ip, port).into())
    }

    /// IPv6 destination
    pub fn ipv6(ip: Ipv6Addr, port: u16) -> Self {
        TargetAddr::Ip((ip, port).into())
    }

    /// Named destination, resolved later by the driver
    pub fn domain(name: impl Into<String>, port: u16) -> Self {
        TargetAddr::Domain(name.into(), port)
    }

    /// Decode an address from the stream: `ATYP | addr | port`.
    ///
    /// All reads are exact-length; a peer that closes mid-frame produces
    /// an error. An unknown ATYP fails with
    /// [`Socks5Error::AddressTypeNotSupported`].
    pub async fn read_from<R>(stream: &mut R) -> Result<Self, Socks5Error>
    where
        R: AsyncRead + Unpin,
    {
        let atyp = stream.read_u8().await?;

        match atyp {
            SOCKS5_ADDR_TYPE_IPV4 => {
                let mut octets = [0u8; 4];
                stream.read_exact(&mut octets).await?;
                let port = stream.read_u16().await?;
                Ok(TargetAddr::ipv4(octets.into(), port))
            }

            SOCKS5_ADDR_TYPE_DOMAIN => {
                let len = stream.read_u8().await? as usize;
                if len == 0 || len > MAX_DOMAIN_LEN {
                    return Err(Socks5Error::Malformed(format!(
                        "invalid domain length: {len}"
                    )));
                }

                let mut name = vec![0u8; len];
                stream.read_exact(&mut name).await?;
                let name = String::from_utf8(name)
                    .map_err(|_| Socks5Error::Malformed("domain name is not UTF-8".to_string()))?;

                let port = stream.read_u16().await?;
                Ok(TargetAddr::Domain(name, port))
            }

            SOCKS5_ADDR_TYPE_IPV6 => {
                let mut octets = [0u8; 16];
                stream.read_exact(&mut octets).await?;
                let port = stream.read_u16().await?;
                Ok(TargetAddr::ipv6(octets.into(), port))
            }

            other => Err(Socks5Error::AddressTypeNotSupported(other)),
        }
    }

    /// Append the wire form `ATYP | addr | port` to `buf`.
    ///
    /// Shared by the reply writer and the UDP datagram codec.
    pub fn write_to_buf<B: BufMut>(&self, buf: &mut B) {
        match self {
            TargetAddr::Ip(SocketAddr::V4(v4)) => {
                buf.put_u8(SOCKS5_ADDR_TYPE_IPV4);
                buf.put_slice(&v4.ip().octets());
                buf.put_u16(v4.port());
            }
            TargetAddr::Ip(SocketAddr::V6(v6)) => {
                buf.put_u8(SOCKS5_ADDR_TYPE_IPV6);
                buf.put_slice(&v6.ip().octets());
                buf.put_u16(v6.port());
            }
            TargetAddr::Domain(name, port) => {
                buf.put_u8(SOCKS5_ADDR_TYPE_DOMAIN);
                buf.put_u8(name.len() as u8);
                buf.put_slice(name.as_bytes());
                buf.put_u16(*port);
            }
        }
    }

    /// Encode to a standalone byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + 16 + 2);
        self.write_to_buf(&mut buf);
        buf
    }
}

impl fmt::Display for TargetAddr {
    // `host:port`, with brackets around IPv6 literals
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAddr::Ip(addr) => fmt::Display::fmt(addr, f),
            TargetAddr::Domain(name, port) => write!(f, "{name}:{port}"),
        }
    }
}

impl From<SocketAddr> for TargetAddr {
    fn from(addr: SocketAddr) -> Self {
        TargetAddr::Ip(addr)
    }
}

/// A parsed SOCKS5 request.
///
/// `client_peer` and `local_bind` come from the accepted socket, not from
/// wire bytes.
#[derive(Debug, Clone)]
pub struct Request {
    /// The requested command
    pub command: SocksCommand,
    /// The requested destination
    pub dest: TargetAddr,
    /// Remote address of the inbound TCP connection
    pub client_peer: SocketAddr,
    /// Local address of the inbound TCP connection
    pub local_bind: SocketAddr,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::net::IpAddr;

    #[test]
    fn test_socks_command_try_from_byte() {
        assert_eq!(
            SocksCommand::try_from_byte(1).unwrap(),
            SocksCommand::Connect
        );
        assert_eq!(SocksCommand::try_from_byte(2).unwrap(), SocksCommand::Bind);
        assert_eq!(
            SocksCommand::try_from_byte(3).unwrap(),
            SocksCommand::UdpAssociate
        );
        assert!(matches!(
            SocksCommand::try_from_byte(0),
            Err(Socks5Error::CommandNotSupported(0))
        ));
        assert!(matches!(
            SocksCommand::try_from_byte(4),
            Err(Socks5Error::CommandNotSupported(4))
        ));
    }

    #[test]
    fn test_socks_command_to_u8() {
        assert_eq!(u8::from(SocksCommand::Connect), 1);
        assert_eq!(u8::from(SocksCommand::Bind), 2);
        assert_eq!(u8::from(SocksCommand::UdpAssociate), 3);
    }

    #[test]
    fn test_socks_command_display() {
        assert_eq!(format!("{}", SocksCommand::Connect), "CONNECT");
        assert_eq!(format!("{}", SocksCommand::Bind), "BIND");
        assert_eq!(format!("{}", SocksCommand::UdpAssociate), "UDP ASSOCIATE");
    }

    #[tokio::test]
    async fn test_address_round_trip() {
        let cases = vec![
            TargetAddr::ipv4(Ipv4Addr::new(192, 168, 1, 1), 8080),
            TargetAddr::ipv4(Ipv4Addr::new(0, 0, 0, 0), 0),
            TargetAddr::ipv6(Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 1), 443),
            TargetAddr::domain("example.com", 80),
            TargetAddr::domain("x", 65535),
        ];

        for addr in cases {
            let encoded = addr.to_bytes();
            let mut cursor = Cursor::new(encoded);
            let decoded = TargetAddr::read_from(&mut cursor).await.unwrap();
            assert_eq!(decoded, addr);
        }
    }

    #[tokio::test]
    async fn test_address_decode_unknown_atyp() {
        let mut cursor = Cursor::new(vec![0xFFu8, 0, 0]);
        let result = TargetAddr::read_from(&mut cursor).await;
        assert!(matches!(
            result,
            Err(Socks5Error::AddressTypeNotSupported(0xFF))
        ));
    }

    #[tokio::test]
    async fn test_address_decode_empty_domain() {
        let mut cursor = Cursor::new(vec![SOCKS5_ADDR_TYPE_DOMAIN, 0, 0x00, 0x50]);
        let result = TargetAddr::read_from(&mut cursor).await;
        assert!(matches!(result, Err(Socks5Error::Malformed(_))));
    }

    #[tokio::test]
    async fn test_address_decode_truncated() {
        // IPv4 ATYP but only two address bytes before EOF
        let mut cursor = Cursor::new(vec![SOCKS5_ADDR_TYPE_IPV4, 127, 0]);
        let result = TargetAddr::read_from(&mut cursor).await;
        assert!(matches!(result, Err(Socks5Error::Io(_))));
    }

    #[test]
    fn test_address_display() {
        let addr = TargetAddr::ipv4(Ipv4Addr::new(127, 0, 0, 1), 8080);
        assert_eq!(format!("{}", addr), "127.0.0.1:8080");

        let addr = TargetAddr::ipv6(Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 1), 443);
        assert_eq!(format!("{}", addr), "[::1]:443");

        let addr = TargetAddr::domain("test.com", 443);
        assert_eq!(format!("{}", addr), "test.com:443");
    }

    #[test]
    fn test_address_to_bytes_ipv4() {
        let addr = TargetAddr::ipv4(Ipv4Addr::new(192, 168, 1, 1), 8080);
        let bytes = addr.to_bytes();

        assert_eq!(bytes[0], SOCKS5_ADDR_TYPE_IPV4);
        assert_eq!(&bytes[1..5], &[192, 168, 1, 1]);
        assert_eq!(&bytes[5..7], &8080u16.to_be_bytes());
    }

    #[test]
    fn test_address_to_bytes_domain() {
        let addr = TargetAddr::domain("test", 80);
        let bytes = addr.to_bytes();

        assert_eq!(bytes[0], SOCKS5_ADDR_TYPE_DOMAIN);
        assert_eq!(bytes[1], 4);
        assert_eq!(&bytes[2..6], b"test");
        assert_eq!(&bytes[6..8], &80u16.to_be_bytes());
    }

    #[test]
    fn test_write_to_buf_matches_to_bytes() {
        use bytes::BytesMut;

        let cases = vec![
            TargetAddr::ipv4(Ipv4Addr::LOCALHOST, 1080),
            TargetAddr::ipv6(Ipv6Addr::LOCALHOST, 443),
            TargetAddr::domain("example.net", 8080),
        ];

        for addr in cases {
            let mut buf = BytesMut::new();
            addr.write_to_buf(&mut buf);
            assert_eq!(&buf[..], &addr.to_bytes()[..]);
        }
    }

    #[test]
    fn test_address_from_socket_addr() {
        let socket_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 1234);
        let target: TargetAddr = socket_addr.into();
        assert_eq!(target, TargetAddr::Ip(socket_addr));
    }
}
