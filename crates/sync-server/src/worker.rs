//! Per-client worker state machine (SPEC_FULL.md §4.G).
//!
//! Grounded on `examples/original_source/src/server/client_thread.c`'s
//! `thread_work`/`start_protocol` (handshake → wait-for-message → read →
//! reply → shutdown shape) and
//! `examples/original_source/src/server/protocol/proto_upgrade_response.c`'s
//! `send_upgrade_response` (length-prefixed chunked streaming via
//! `bulk_pread`).

use std::net::TcpStream;
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sync_config::ServerConfig;
use sync_tls::{
    bulk_pread, server_handshake, ssl_read_exact, ssl_write_exact, PollDirection, SyncError,
    TlsContext,
};
use sync_wire::{
    decode_header, decode_upgrade_request, encode_proto_failure, encode_upgrade_response_header,
    ErrorCode, PacketType, HEADER_LEN, PROTO_FAILURE_LEN, UPGRADE_REQUEST_LEN,
    UPGRADE_RESPONSE_HEADER_LEN,
};
use tracing::{error, info, info_span, warn};

use crate::validator::validate;

/// Matches the source's `MSG_POLL_TIMEOUT_MILLISECONDS`: how long a worker
/// waits for the first byte of the request after the handshake completes.
pub const MSG_POLL_TIMEOUT_MILLISECONDS: i32 = 30_000;

/// Matches the source's `READ_CHUNK_LEN = MIN(1 << 20, SSIZE_MAX)`.
pub const READ_CHUNK_LEN: usize = 1 << 20;

/// RAII guard for the acceptor's bounded worker counter: decrements on every
/// exit path, matching the source's `atomic_remove_client_counter()` call in
/// `thread_work_wrapper` which runs regardless of how `thread_work` exited.
pub struct WorkerSlot {
    counter: Arc<AtomicUsize>,
}

impl WorkerSlot {
    /// Attempts to claim a slot; `None` if the cap (`MAX_CLIENTS_THREADS`) is
    /// already reached.
    pub fn try_acquire(counter: Arc<AtomicUsize>, max: usize) -> Option<Self> {
        let mut current = counter.load(Ordering::SeqCst);
        loop {
            if current >= max {
                return None;
            }
            match counter.compare_exchange_weak(
                current,
                current + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Some(Self { counter }),
                Err(observed) => current = observed,
            }
        }
    }
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs the full per-connection protocol for one accepted socket. Every
/// error path still reaches the end of this function (and therefore drops
/// `_slot`, freeing the counter) because nothing here panics or early-returns
/// past the guard's scope without dropping it.
pub fn handle_connection(
    socket: TcpStream,
    tls: Arc<TlsContext>,
    config: Arc<ServerConfig>,
    _slot: WorkerSlot,
) {
    let peer = socket
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "<unknown>".into());
    let span = info_span!("worker", peer = %peer);
    let _enter = span.enter();

    if let Err(e) = run(socket, &tls, &config) {
        warn!(error = %e, "worker terminated with an error");
    }
}

fn run(socket: TcpStream, tls: &TlsContext, config: &ServerConfig) -> Result<(), SyncError> {
    let ssl = tls.new_session()?;
    let stream = server_handshake(ssl, socket)?;
    info!("client's SSL handshake accepted successfully");

    // Guarantees the close_notify handshake runs on every exit path (early
    // returns included), matching the source's `goto cleanup_ssl` discipline
    // in `client_thread.c` rather than only shutting down on the happy path.
    let mut stream = scopeguard::guard(stream, |mut s| {
        if let Err(e) = sync_tls::bidirectional_shutdown(&mut s) {
            warn!(error = %e, "bidirectional shutdown failed");
        }
    });

    wait_for_first_byte(&mut stream)?;

    let mut header_buf = [0u8; HEADER_LEN];
    if let Err(e) = ssl_read_exact(&mut stream, &mut header_buf) {
        warn!(error = %e, "failed reading request header");
        return Err(e);
    }

    let header = match decode_header(&header_buf) {
        Ok(h) => h,
        Err(code) => return fail(&mut stream, code),
    };
    if header.packet_type != PacketType::UpgradeRequest {
        return fail(&mut stream, ErrorCode::UnknownPacketType);
    }

    let mut body_buf = [0u8; UPGRADE_REQUEST_LEN];
    body_buf[..HEADER_LEN].copy_from_slice(&header_buf);
    if let Err(e) = ssl_read_exact(&mut stream, &mut body_buf[HEADER_LEN..]) {
        warn!(error = %e, "failed reading request body");
        return Err(e);
    }

    let request = match decode_upgrade_request(&body_buf) {
        Ok(r) => r,
        Err(code) => return fail(&mut stream, code),
    };

    let validated = match validate(&request, config) {
        Ok(v) => v,
        Err(code) => return fail(&mut stream, code),
    };

    let package_names = match sync_archive::download_packages(
        validated.package_manager,
        &validated.config_set_absolute_path,
        &config.pkg_cache_dir,
        config.verify_package_existence,
    ) {
        Ok(names) => names,
        Err(e) => {
            error!(error = %e, "package download failed");
            return fail(&mut stream, ErrorCode::ServerInternalErr);
        }
    };

    let request_id = format!("{}-{}", std::process::id(), rough_request_nonce());
    let archive_path = match sync_archive::build_archive(
        &config.archives_dir,
        &config.pkg_cache_dir,
        &package_names,
        &request_id,
        validated.compression,
    ) {
        Ok(path) => path,
        Err(e) => {
            error!(error = %e, "archive build failed");
            return fail(&mut stream, ErrorCode::ServerInternalErr);
        }
    };

    stream_archive(&mut stream, &archive_path)?;

    Ok(())
}

fn wait_for_first_byte(stream: &mut sync_tls::Stream) -> Result<(), SyncError> {
    let fd = stream.get_ref().as_raw_fd();
    let mut fds = [libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    }];
    let status = unsafe { libc::poll(fds.as_mut_ptr(), 1, MSG_POLL_TIMEOUT_MILLISECONDS) };
    if status < 0 {
        return Err(SyncError::Io(std::io::Error::last_os_error()));
    }
    if status == 0 {
        warn!("waiting for client's message has timed out");
        return Err(SyncError::TransportTimeout(PollDirection::Read));
    }
    Ok(())
}

fn fail(stream: &mut sync_tls::Stream, code: ErrorCode) -> Result<(), SyncError> {
    warn!(code = ?code, "rejecting request");
    let mut buf = [0u8; PROTO_FAILURE_LEN];
    encode_proto_failure(&mut buf, code);
    let _ = ssl_write_exact(stream, &buf);
    Ok(())
}

fn stream_archive(
    stream: &mut sync_tls::Stream,
    archive_path: &std::path::Path,
) -> Result<(), SyncError> {
    let file = std::fs::File::open(archive_path)?;
    let length = file.metadata()?.len();

    let mut header = [0u8; UPGRADE_RESPONSE_HEADER_LEN];
    encode_upgrade_response_header(&mut header, length);
    ssl_write_exact(stream, &header)?;

    let fd = file.as_raw_fd();
    let mut remaining = length;
    let mut offset = 0u64;
    let mut chunk = vec![0u8; READ_CHUNK_LEN.min(length.max(1) as usize)];

    while remaining > 0 {
        let want = remaining.min(chunk.len() as u64) as usize;
        let n = bulk_pread(fd, &mut chunk[..want], offset)?;
        if n == 0 {
            return Err(SyncError::UnexpectedEof);
        }
        ssl_write_exact(stream, &chunk[..n])?;
        offset += n as u64;
        remaining -= n as u64;
    }

    Ok(())
}

fn rough_request_nonce() -> u64 {
    use std::sync::atomic::AtomicU64;
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}
