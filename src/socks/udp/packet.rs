//! UDP datagram encapsulation (RFC 1928 section 7)

use crate::error::Socks5Error;
use crate::socks::consts::*;
use crate::socks::types::TargetAddr;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

/// A decoded UDP request datagram.
///
/// # Encapsulation format
///
/// ```text
/// +----+------+------+----------+----------+----------+
/// |RSV | FRAG | ATYP | DST.ADDR | DST.PORT |   DATA   |
/// +----+------+------+----------+----------+----------+
/// | 2  |  1   |  1   | Variable |    2     | Variable |
/// +----+------+------+----------+----------+----------+
/// ```
#[derive(Debug, Clone)]
pub struct UdpPacket {
    /// Fragment number; anything non-zero is unsupported
    pub frag: u8,
    /// Destination (request) or source (reply) address
    pub addr: TargetAddr,
    /// Payload
    pub data: Bytes,
}

impl UdpPacket {
    /// Whether this datagram is part of a fragment sequence
    pub fn is_fragmented(&self) -> bool {
        self.frag != 0
    }
}

/// Parse a request datagram received from the client.
pub fn parse_packet(data: &[u8]) -> Result<UdpPacket, Socks5Error> {
    if data.len() < 4 {
        return Err(Socks5Error::Malformed(format!(
            "UDP datagram too short: {} bytes",
            data.len()
        )));
    }

    let mut buf = data;

    let rsv = buf.get_u16();
    if rsv != 0 {
        return Err(Socks5Error::Malformed(format!(
            "UDP reserved field must be zero, got {rsv:#06x}"
        )));
    }

    let frag = buf.get_u8();
    let atyp = buf.get_u8();

    let (addr, remaining) = parse_address(atyp, buf)?;
    let data = Bytes::copy_from_slice(remaining);

    Ok(UdpPacket { frag, addr, data })
}

fn parse_address(atyp: u8, mut buf: &[u8]) -> Result<(TargetAddr, &[u8]), Socks5Error> {
    match atyp {
        SOCKS5_ADDR_TYPE_IPV4 => {
            if buf.len() < 6 {
                return Err(Socks5Error::Malformed(
                    "truncated IPv4 address".to_string(),
                ));
            }
            let ip = Ipv4Addr::new(buf[0], buf[1], buf[2], buf[3]);
            buf.advance(4);
            let port = buf.get_u16();
            Ok((TargetAddr::ipv4(ip, port), buf))
        }

        SOCKS5_ADDR_TYPE_DOMAIN => {
            if buf.is_empty() {
                return Err(Socks5Error::Malformed(
                    "truncated domain length".to_string(),
                ));
            }
            let len = buf[0] as usize;
            buf.advance(1);

            if len == 0 {
                return Err(Socks5Error::Malformed("empty domain name".to_string()));
            }
            if buf.len() < len + 2 {
                return Err(Socks5Error::Malformed(
                    "truncated domain address".to_string(),
                ));
            }
            let domain = String::from_utf8(buf[..len].to_vec())
                .map_err(|_| Socks5Error::Malformed("domain name is not UTF-8".to_string()))?;
            buf.advance(len);
            let port = buf.get_u16();
            Ok((TargetAddr::domain(domain, port), buf))
        }

        SOCKS5_ADDR_TYPE_IPV6 => {
            if buf.len() < 18 {
                return Err(Socks5Error::Malformed(
                    "truncated IPv6 address".to_string(),
                ));
            }
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&buf[..16]);
            buf.advance(16);
            let port = buf.get_u16();
            Ok((TargetAddr::ipv6(Ipv6Addr::from(octets), port), buf))
        }

        other => Err(Socks5Error::AddressTypeNotSupported(other)),
    }
}

/// Encode a reply datagram for the client.
///
/// The header carries the peer's actual socket address; the return path
/// never uses the domain form.
pub fn encode_reply_packet(peer: SocketAddr, payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(4 + 18 + payload.len());
    buf.put_slice(&[0x00, 0x00, 0x00]); // RSV + FRAG
    TargetAddr::from(peer).write_to_buf(&mut buf);
    buf.put_slice(payload);
    buf.to_vec()
}
