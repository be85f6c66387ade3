//! Handshake and shutdown (SPEC_FULL.md §4.D).
//!
//! Grounded on `examples/original_source/src/client/security.c`
//! (`start_ssl_handshake`, `verify_cert`) and
//! `examples/original_source/src/server/security.c`
//! (`accept_client_handshake`), plus
//! `examples/original_source/src/common/security.c`'s
//! `bidirectional_shutdown_handshake`. The retry counts below
//! (`MAX_CONNECT_RETRIES`, `MAX_ACCEPT_RETRIES`) are carried over from the
//! same source file's `MAX_CONNECTION_RETRY_COUNT`/`MAX_SSL_ACCEPT_RETRIES`.

use std::net::TcpStream;
use std::os::unix::io::AsRawFd;

use openssl::ssl::{ErrorCode as SslErrorCode, HandshakeError, Ssl, ShutdownResult, SslStream};
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::io::SSL_POLL_TIMEOUT_MILLISECONDS;

pub const MAX_CONNECT_RETRIES: u32 = 3;
pub const MAX_ACCEPT_RETRIES: u32 = 5;

/// Drive the client side of a handshake to completion, polling on
/// `WANT_READ`/`WANT_WRITE` rather than busy-looping.
pub fn client_handshake(ssl: Ssl, stream: TcpStream) -> Result<SslStream<TcpStream>, SyncError> {
    let fd = stream.as_raw_fd();
    let mut attempt = ssl.connect(stream);
    let mut retries = 0u32;

    loop {
        match attempt {
            Ok(stream) => {
                verify_peer_certificate(&stream)?;
                debug!("SSL_connect() success");
                return Ok(stream);
            }
            Err(HandshakeError::WouldBlock(mid)) => {
                if retries >= MAX_CONNECT_RETRIES {
                    warn!("maximum number of SSL_connect() retries reached, giving up");
                    return Err(SyncError::RetryExhausted(MAX_CONNECT_RETRIES));
                }
                poll_for(fd, mid.error().code())?;
                retries += 1;
                attempt = mid.handshake();
            }
            Err(HandshakeError::Failure(mid)) => {
                return Err(SyncError::TransportError(mid.error().to_string()));
            }
            Err(HandshakeError::SetupFailure(e)) => return Err(SyncError::OpenSslErrorStack(e)),
        }
    }
}

/// Drive the server side of a handshake to completion. Same retry/poll
/// discipline as `client_handshake`, with the source's larger accept budget.
pub fn server_handshake(ssl: Ssl, stream: TcpStream) -> Result<SslStream<TcpStream>, SyncError> {
    let fd = stream.as_raw_fd();
    debug!("waiting for client's SSL handshake...");
    let mut attempt = ssl.accept(stream);
    let mut retries = 0u32;

    loop {
        match attempt {
            Ok(stream) => {
                info!("client's SSL handshake accepted successfully");
                return Ok(stream);
            }
            Err(HandshakeError::WouldBlock(mid)) => {
                if retries >= MAX_ACCEPT_RETRIES {
                    warn!("maximum number of SSL_accept() retries reached, giving up");
                    return Err(SyncError::RetryExhausted(MAX_ACCEPT_RETRIES));
                }
                poll_for(fd, mid.error().code())?;
                retries += 1;
                attempt = mid.handshake();
            }
            Err(HandshakeError::Failure(mid)) => {
                return Err(SyncError::TransportError(mid.error().to_string()));
            }
            Err(HandshakeError::SetupFailure(e)) => return Err(SyncError::OpenSslErrorStack(e)),
        }
    }
}

fn poll_for(fd: std::os::unix::io::RawFd, code: SslErrorCode) -> Result<(), SyncError> {
    let events = match code {
        SslErrorCode::WANT_WRITE => libc::POLLOUT,
        SslErrorCode::WANT_READ | SslErrorCode::WANT_CONNECT | SslErrorCode::WANT_ACCEPT => {
            libc::POLLIN
        }
        _ => libc::POLLIN,
    };

    let mut fds = [libc::pollfd {
        fd,
        events,
        revents: 0,
    }];
    let status =
        unsafe { libc::poll(fds.as_mut_ptr(), 1, SSL_POLL_TIMEOUT_MILLISECONDS) };
    if status < 0 {
        return Err(SyncError::Io(std::io::Error::last_os_error()));
    }
    if status == 0 {
        return Err(SyncError::TransportTimeout(match events {
            libc::POLLOUT => crate::error::PollDirection::Write,
            _ => crate::error::PollDirection::Read,
        }));
    }
    Ok(())
}

/// Explicit re-check that the peer actually presented a certificate and that
/// it verified, in addition to whatever `SslVerifyMode` already enforced
/// during the handshake.
fn verify_peer_certificate(stream: &SslStream<TcpStream>) -> Result<(), SyncError> {
    let ssl = stream.ssl();
    if ssl.peer_certificate().is_none() {
        return Err(SyncError::CertificateRejected(
            "peer didn't send any certificate".into(),
        ));
    }
    if ssl.verify_result() != openssl::x509::X509VerifyResult::OK {
        return Err(SyncError::CertificateRejected(
            ssl.verify_result().to_string(),
        ));
    }
    Ok(())
}

/// Send and wait for a TLS `close_notify`, matching the source's two-call
/// shutdown sequence rather than a single fire-and-forget call.
pub fn bidirectional_shutdown(stream: &mut SslStream<TcpStream>) -> Result<(), SyncError> {
    match stream.shutdown() {
        Ok(ShutdownResult::Received) => {
            info!("bidirectional shut down SSL connection success");
            Ok(())
        }
        Ok(ShutdownResult::Sent) => match stream.shutdown() {
            Ok(_) => {
                info!("bidirectional shut down SSL connection success");
                Ok(())
            }
            Err(e) => {
                warn!("receiving close_notify via SSL_shutdown() has failed: {e}");
                Err(SyncError::TransportError(e.to_string()))
            }
        },
        Err(e) if e.code() == SslErrorCode::SYSCALL => {
            debug!("ignoring SSL_ERROR_SYSCALL after SSL_shutdown() returned 0");
            Ok(())
        }
        Err(e) => Err(SyncError::TransportError(e.to_string())),
    }
}
