//! SOCKS5 protocol constants
//!
//! Wire-level constants from RFC 1928 and RFC 1929.

/// SOCKS5 protocol version
pub const SOCKS5_VERSION: u8 = 0x05;

/// Username/password sub-negotiation version (RFC 1929)
pub const SOCKS5_AUTH_VERSION: u8 = 0x01;

// Authentication methods
/// No authentication required
pub const SOCKS5_AUTH_METHOD_NONE: u8 = 0x00;
/// GSSAPI authentication (not implemented)
pub const SOCKS5_AUTH_METHOD_GSSAPI: u8 = 0x01;
/// Username/password authentication
pub const SOCKS5_AUTH_METHOD_PASSWORD: u8 = 0x02;
/// No acceptable methods
pub const SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE: u8 = 0xFF;

// Commands
/// TCP CONNECT command
pub const SOCKS5_CMD_TCP_CONNECT: u8 = 0x01;
/// TCP BIND command (reserved)
pub const SOCKS5_CMD_TCP_BIND: u8 = 0x02;
/// UDP ASSOCIATE command
pub const SOCKS5_CMD_UDP_ASSOCIATE: u8 = 0x03;

// Address types
/// IPv4 address
pub const SOCKS5_ADDR_TYPE_IPV4: u8 = 0x01;
/// Domain name
pub const SOCKS5_ADDR_TYPE_DOMAIN: u8 = 0x03;
/// IPv6 address
pub const SOCKS5_ADDR_TYPE_IPV6: u8 = 0x04;

// Reserved byte
/// Reserved byte value (always 0x00)
pub const SOCKS5_RESERVED: u8 = 0x00;

// Limits and buffer sizes
/// Maximum domain name length
pub const MAX_DOMAIN_LEN: usize = 255;
/// Fixed buffer size per TCP relay direction
pub const RELAY_BUFFER_SIZE: usize = 8192;
/// Maximum UDP datagram size
pub const MAX_UDP_PACKET: usize = 65535;
/// Shortest valid UDP request datagram (IPv4 form header)
pub const MIN_UDP_PACKET: usize = 10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socks5_version() {
        assert_eq!(SOCKS5_VERSION, 5);
        assert_eq!(SOCKS5_AUTH_VERSION, 1);
    }

    #[test]
    fn test_auth_methods() {
        assert_eq!(SOCKS5_AUTH_METHOD_NONE, 0);
        assert_eq!(SOCKS5_AUTH_METHOD_GSSAPI, 1);
        assert_eq!(SOCKS5_AUTH_METHOD_PASSWORD, 2);
        assert_eq!(SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE, 255);
    }

    #[test]
    fn test_commands() {
        assert_eq!(SOCKS5_CMD_TCP_CONNECT, 1);
        assert_eq!(SOCKS5_CMD_TCP_BIND, 2);
        assert_eq!(SOCKS5_CMD_UDP_ASSOCIATE, 3);
    }

    #[test]
    fn test_address_types() {
        assert_eq!(SOCKS5_ADDR_TYPE_IPV4, 1);
        assert_eq!(SOCKS5_ADDR_TYPE_DOMAIN, 3);
        assert_eq!(SOCKS5_ADDR_TYPE_IPV6, 4);
    }

    #[test]
    fn test_udp_limits() {
        assert_eq!(MAX_UDP_PACKET, 65535);
        // RSV(2) + FRAG(1) + ATYP(1) + IPv4(4) + PORT(2)
        assert_eq!(MIN_UDP_PACKET, 10);
    }
}
