//! Resolver: sends one DNS query, awaits one reply with a
//! caller-supplied timeout, and returns the first usable address.
//!
//! Two interchangeable implementations of the same contract; the
//! transaction state machine does not know which is in use. Both are
//! always compiled in; `ContextConfig::use_os_resolver` picks between
//! them at runtime, defaulted by the `os-resolver` Cargo feature.

use std::net::{IpAddr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use crate::error::Error;

pub trait Resolve {
    fn resolve(&self, host: &str, prefer_v6: bool, deadline: Instant) -> Result<IpAddr, Error>;
}

/// Resolves hostnames with the crate's own DNS codec over a raw UDP
/// socket, rather than going through the OS resolver.
pub struct SelfResolver {
    pub dns_server: SocketAddr,
}

impl SelfResolver {
    pub fn new(dns_server: SocketAddr) -> Self {
        SelfResolver { dns_server }
    }
}

impl Resolve for SelfResolver {
    fn resolve(&self, host: &str, prefer_v6: bool, deadline: Instant) -> Result<IpAddr, Error> {
        let want_v6 = prefer_v6 && cfg!(feature = "ipv6");
        let qtype = if want_v6 {
            dns_codec::QType::Aaaa
        } else {
            dns_codec::QType::A
        };
        let id = transaction_id();
        let query = dns_codec::build_query(id, host, qtype)?;

        let local_addr = if self.dns_server.is_ipv6() {
            "[::]:0"
        } else {
            "0.0.0.0:0"
        };
        let socket = UdpSocket::bind(local_addr)?;
        let now = Instant::now();
        if now >= deadline {
            return Err(Error::Timeout);
        }
        socket.set_read_timeout(Some(deadline - now))?;
        socket.set_write_timeout(Some(deadline - now))?;
        socket.connect(self.dns_server)?;
        socket.send(&query)?;

        let mut buf = [0u8; 512];
        let n = match socket.recv(&mut buf) {
            Ok(n) => n,
            Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
                return Err(Error::Timeout);
            }
            Err(e) => return Err(e.into()),
        };

        let addresses = dns_codec::decode_response(&buf[..n], id, qtype)?;
        match addresses.first() {
            Some(dns_codec::DnsAddress::V4(v4)) => {
                tracing::debug!(host, addr = %v4, "resolved via self-dns");
                Ok(IpAddr::V4(*v4))
            }
            Some(dns_codec::DnsAddress::V6(v6)) => {
                tracing::debug!(host, addr = %v6, "resolved via self-dns");
                Ok(IpAddr::V6(*v6))
            }
            None => Err(Error::Dns(dns_codec::DnsCodecError::NoAddressRecord)),
        }
    }
}

fn transaction_id() -> u16 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    Instant::now().hash(&mut hasher);
    (hasher.finish() & 0xFFFF) as u16
}

/// Resolves hostnames through the platform resolver (`getaddrinfo`).
pub struct OsResolver;

impl Resolve for OsResolver {
    fn resolve(&self, host: &str, prefer_v6: bool, _deadline: Instant) -> Result<IpAddr, Error> {
        let mut addrs = (host, 0u16)
            .to_socket_addrs()
            .map_err(|_| Error::Dns(dns_codec::DnsCodecError::NoAddressRecord))?;
        let chosen = if prefer_v6 && cfg!(feature = "ipv6") {
            addrs
                .clone()
                .find(SocketAddr::is_ipv6)
                .or_else(|| addrs.next())
        } else {
            addrs
                .clone()
                .find(SocketAddr::is_ipv4)
                .or_else(|| addrs.next())
        };
        chosen
            .map(|a| a.ip())
            .ok_or(Error::Dns(dns_codec::DnsCodecError::NoAddressRecord))
    }
}

/// How long the resolver should wait for an individual attempt before
/// the caller retries once.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);
