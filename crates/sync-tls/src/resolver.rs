//! Client-side address resolution and connection establishment
//! (SPEC_FULL.md §4.E).
//!
//! Grounded on `examples/original_source/src/client/connection.c`'s
//! `connect_server`/`poll_for_asynchronous_connection`: try each resolved
//! address in turn, treat `ECONNREFUSED` as a distinct, loggable outcome
//! from a plain timeout, and bound the attempt by a wall-clock deadline
//! rather than busy-retrying. `std::net::TcpStream::connect_timeout`
//! already implements that nonblocking-connect-then-poll sequence, so it
//! replaces the source's hand-rolled `poll()`/`getsockopt(SO_ERROR)` pair.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::SyncError;

/// Matches the source's `POLL_TIMEOUT_MILLISECONDS` for establishing a
/// connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolve `host:port` and connect to the first address that accepts,
/// mirroring `connect_server`'s per-address retry without its single
/// hardcoded `sockaddr_in`.
pub fn connect(host: &str, port: u16) -> Result<TcpStream, SyncError> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(SyncError::Io)?
        .collect();

    if addrs.is_empty() {
        return Err(SyncError::InvalidPath(format!(
            "{host}:{port} did not resolve to any address"
        )));
    }

    let mut saw_refused = false;

    for addr in &addrs {
        match TcpStream::connect_timeout(addr, CONNECT_TIMEOUT) {
            Ok(stream) => {
                debug!(%addr, "connected");
                return Ok(stream);
            }
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                warn!(%addr, "ECONNREFUSED: server is probably not listening there");
                saw_refused = true;
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                warn!(%addr, "connection attempt timed out after {CONNECT_TIMEOUT:?}");
            }
            Err(e) => {
                warn!(%addr, error = %e, "connection attempt failed");
            }
        }
    }

    if saw_refused {
        Err(SyncError::ConnectionRefused)
    } else {
        Err(SyncError::ConnectionFailed)
    }
}
