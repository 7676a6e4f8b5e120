//! Abstract I/O capability consumed by the transaction state machine.
//! Specifies the capability the engine needs (connect, write, read,
//! each bounded by a deadline) and provides one concrete implementation
//! over `std::net` + `rustls`.

use std::io::{Read, Write};
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustls::{ClientConfig, ClientConnection, StreamOwned};

use crate::error::Error;

/// One connected transport stream, plain or TLS.
pub enum Stream {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl Stream {
    fn set_timeouts(&self, timeout: Duration) -> std::io::Result<()> {
        let tcp = match self {
            Stream::Plain(s) => s,
            Stream::Tls(s) => &s.sock,
        };
        tcp.set_read_timeout(Some(timeout))?;
        tcp.set_write_timeout(Some(timeout))?;
        Ok(())
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Stream::Plain(s) => s.read(buf),
            Stream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Stream::Plain(s) => s.write(buf),
            Stream::Tls(s) => s.write(buf),
        }
    }
    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Stream::Plain(s) => s.flush(),
            Stream::Tls(s) => s.flush(),
        }
    }
}

fn remaining(deadline: Instant) -> Result<Duration, Error> {
    let now = Instant::now();
    if now >= deadline {
        Err(Error::Timeout)
    } else {
        Ok(deadline - now)
    }
}

static TLS_ROOTS: std::sync::OnceLock<Arc<ClientConfig>> = std::sync::OnceLock::new();

fn tls_config() -> Arc<ClientConfig> {
    TLS_ROOTS
        .get_or_init(|| {
            let mut roots = rustls::RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            Arc::new(
                ClientConfig::builder()
                    .with_root_certificates(roots)
                    .with_no_client_auth(),
            )
        })
        .clone()
}

/// Open a TCP connection to `addr`, optionally layering TLS for
/// `server_name`, respecting `deadline`.
pub fn connect(
    addr: IpAddr,
    port: u16,
    server_name: &str,
    use_tls: bool,
    deadline: Instant,
) -> Result<Stream, Error> {
    let sockaddr = SocketAddr::new(addr, port);
    let timeout = remaining(deadline)?;
    let tcp = TcpStream::connect_timeout(&sockaddr, timeout)?;
    tcp.set_nodelay(true).ok();

    if !use_tls {
        let stream = Stream::Plain(tcp);
        stream.set_timeouts(remaining(deadline)?)?;
        return Ok(stream);
    }

    let name = server_name
        .to_owned()
        .try_into()
        .map_err(|_| Error::Format("invalid TLS server name"))?;
    let conn = ClientConnection::new(tls_config(), name)?;
    let stream = Stream::Tls(Box::new(StreamOwned::new(conn, tcp)));
    stream.set_timeouts(remaining(deadline)?)?;
    Ok(stream)
}

/// Write `buf` in full, respecting `deadline`.
pub fn write_all(stream: &mut Stream, buf: &[u8], deadline: Instant) -> Result<(), Error> {
    stream.set_timeouts(remaining(deadline)?)?;
    match stream.write_all(buf) {
        Ok(()) => Ok(()),
        Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
            Err(Error::Timeout)
        }
        Err(e) => Err(e.into()),
    }
}

/// Read whatever is available into `buf`, returning the number of bytes
/// read (0 means the peer closed the connection).
pub fn read_some(stream: &mut Stream, buf: &mut [u8], deadline: Instant) -> Result<usize, Error> {
    stream.set_timeouts(remaining(deadline)?)?;
    match stream.read(buf) {
        Ok(n) => Ok(n),
        Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
            Err(Error::Timeout)
        }
        Err(e) => Err(e.into()),
    }
}
