//! Live SOA serial lookup.
//!
//! Only what `check` needs: ask one server for one zone's SOA over UDP and
//! read the serial back.

pub mod header;
pub mod soa;

use crate::serial::Serial;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Port used when the server address does not name one
pub const DNS_PORT: u16 = 53;

#[derive(Error, Debug)]
pub enum WireError {
    #[error("Invalid bit stream: {0}")]
    InvalidBitStream(#[from] std::io::Error),
    #[error("Invalid DNS label")]
    InvalidLabel,
    #[error("Invalid zone name: {0}")]
    InvalidName(String),
    #[error("Response does not match the query")]
    UnexpectedResponse,
    #[error("Response truncated")]
    Truncated,
    #[error("Server answered with rcode {0}")]
    Rcode(u8),
    #[error("No SOA record in answer")]
    NoSoa,
}

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Cannot resolve server {0}")]
    Resolve(String),
    #[error("Query failed: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Source of the serial currently served for a zone
pub trait SerialLookup {
    fn soa_serial(&self, zone: &str, server: &str) -> Result<Serial, LookupError>;
}

/// [`SerialLookup`] sending a single UDP query
#[derive(Debug, Clone)]
pub struct UdpSerialLookup {
    timeout: Duration,
}

impl UdpSerialLookup {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl SerialLookup for UdpSerialLookup {
    fn soa_serial(&self, zone: &str, server: &str) -> Result<Serial, LookupError> {
        let addr = resolve_server(server)?;
        let bind_addr: SocketAddr = if addr.is_ipv4() {
            (IpAddr::from([0u8; 4]), 0).into()
        } else {
            (IpAddr::from([0u16; 8]), 0).into()
        };

        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_read_timeout(Some(self.timeout))?;
        socket.connect(addr)?;

        let id: u16 = rand::random();
        let query = soa::encode_query(id, zone)?;
        socket.send(&query)?;

        let mut buf = vec![0; 4096];
        let len = socket.recv(&mut buf)?;
        let serial = soa::decode_serial(id, &buf[..len])?;
        debug!("{} serves {} with serial {}", addr, zone, serial);
        Ok(serial)
    }
}

/// Parses `host`, `ip`, `ip:port` or `[v6]:port`, defaulting to port 53
pub fn resolve_server(server: &str) -> Result<SocketAddr, LookupError> {
    if let Ok(addr) = server.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = server.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DNS_PORT));
    }
    let candidates = if server.contains(':') {
        server.to_socket_addrs()
    } else {
        (server, DNS_PORT).to_socket_addrs()
    };
    candidates
        .map_err(|_| LookupError::Resolve(server.to_string()))?
        .next()
        .ok_or_else(|| LookupError::Resolve(server.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_server() {
        assert_eq!(
            resolve_server("192.0.2.1").unwrap(),
            "192.0.2.1:53".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            resolve_server("192.0.2.1:5353").unwrap(),
            "192.0.2.1:5353".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            resolve_server("2001:db8::1").unwrap(),
            "[2001:db8::1]:53".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            resolve_server("localhost").unwrap().port(),
            DNS_PORT
        );
    }

    #[test]
    fn test_lookup_against_local_socket() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let server_addr = server.local_addr().unwrap();
        let responder = std::thread::spawn(move || {
            let mut buf = [0u8; 512];
            let (len, peer) = server.recv_from(&mut buf).unwrap();
            let mut reply = buf[..len].to_vec();
            reply[2] |= 0x80;
            reply[7] = 1;
            reply.extend_from_slice(&[0xC0, 0x0C, 0, 6, 0, 1, 0, 0, 0, 60, 0, 22]);
            reply.extend_from_slice(&[0, 0]);
            reply.extend_from_slice(&99u32.to_be_bytes());
            reply.extend_from_slice(&[0; 16]);
            server.send_to(&reply, peer).unwrap();
        });

        let lookup = UdpSerialLookup::new(Duration::from_secs(2));
        let serial = lookup
            .soa_serial("example.com", &server_addr.to_string())
            .unwrap();
        assert_eq!(serial, Serial(99));
        responder.join().unwrap();
    }
}
