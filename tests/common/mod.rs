//! Shared test utilities for socksd integration tests

use socksd::config::{ServerConfig, SocksConfig};
use socksd::Socks5Server;
use std::net::SocketAddr;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

/// Start a server with the given SOCKS options on an ephemeral port.
pub async fn start_server(socks: SocksConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = Socks5Server::new(ServerConfig {
        listen_addr: addr.to_string(),
        socks,
    });
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });

    addr
}

/// Start a TCP echo server on an ephemeral port.
pub async fn start_tcp_echo() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut conn, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                use tokio::io::AsyncWriteExt;
                let mut buf = [0u8; 4096];
                loop {
                    match conn.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if conn.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });

    addr
}

/// Read a request reply and return `(code, bind_addr)`.
///
/// Only IPv4-form replies are expected in these tests.
pub async fn read_reply(stream: &mut TcpStream) -> (u8, SocketAddr) {
    let mut reply = [0u8; 10];
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply[0], 0x05);
    assert_eq!(reply[2], 0x00);
    assert_eq!(reply[3], 0x01);

    let ip = std::net::Ipv4Addr::new(reply[4], reply[5], reply[6], reply[7]);
    let port = u16::from_be_bytes([reply[8], reply[9]]);
    (reply[1], SocketAddr::new(ip.into(), port))
}

/// SOCKS5 wire frame builders
pub mod frames {
    use std::net::SocketAddr;

    /// Method selection request offering the given methods
    pub fn methods(methods: &[u8]) -> Vec<u8> {
        let mut frame = vec![0x05, methods.len() as u8];
        frame.extend_from_slice(methods);
        frame
    }

    /// RFC 1929 username/password sub-negotiation request
    pub fn userpass(username: &str, password: &str) -> Vec<u8> {
        let mut frame = vec![0x01, username.len() as u8];
        frame.extend_from_slice(username.as_bytes());
        frame.push(password.len() as u8);
        frame.extend_from_slice(password.as_bytes());
        frame
    }

    /// Request frame for the given command and IPv4 destination
    pub fn request_ipv4(cmd: u8, dest: SocketAddr) -> Vec<u8> {
        let SocketAddr::V4(dest) = dest else {
            panic!("expected IPv4 destination");
        };
        let mut frame = vec![0x05, cmd, 0x00, 0x01];
        frame.extend_from_slice(&dest.ip().octets());
        frame.extend_from_slice(&dest.port().to_be_bytes());
        frame
    }

    /// CONNECT request frame for a domain destination
    pub fn connect_domain(domain: &str, port: u16) -> Vec<u8> {
        let mut frame = vec![0x05, 0x01, 0x00, 0x03, domain.len() as u8];
        frame.extend_from_slice(domain.as_bytes());
        frame.extend_from_slice(&port.to_be_bytes());
        frame
    }

    /// UDP request datagram: header for an IPv4 destination plus payload
    pub fn udp_datagram(frag: u8, dest: SocketAddr, payload: &[u8]) -> Vec<u8> {
        let SocketAddr::V4(dest) = dest else {
            panic!("expected IPv4 destination");
        };
        let mut datagram = vec![0x00, 0x00, frag, 0x01];
        datagram.extend_from_slice(&dest.ip().octets());
        datagram.extend_from_slice(&dest.port().to_be_bytes());
        datagram.extend_from_slice(payload);
        datagram
    }
}
