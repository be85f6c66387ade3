//! Client-side protocol driver (SPEC_FULL.md §4.J).
//!
//! Grounded on `examples/original_source/src/client/main_loop.c`'s
//! `connect_server`/`send_hello_to_server` shape (connect → handshake → run
//! protocol → shutdown) and
//! `examples/original_source/src/client/protocol/proto_upgrade_request.c`'s
//! `send_upgrade_request` for the request frame this replaces the stub
//! "hello" message with, plus `sync_server::worker`'s `stream_archive` for
//! the response side of the same exchange.

use std::os::unix::io::AsRawFd;
use std::path::Path;

use sync_config::ClientConfig;
use sync_tls::{bulk_write, client_handshake, connect, ssl_read_exact, ssl_write_exact, TlsContext};
use sync_wire::{
    decode_header, decode_proto_failure, decode_upgrade_response_header, encode_upgrade_request,
    PacketType, UpgradeRequestWire, HEADER_LEN, PROTO_FAILURE_LEN, UPGRADE_REQUEST_LEN,
    UPGRADE_RESPONSE_HEADER_LEN,
};
use tracing::{info, warn};

use crate::error::ClientError;

/// Streaming chunk size for writing the received archive to disk, matching
/// the server's own `READ_CHUNK_LEN`.
const WRITE_CHUNK_LEN: usize = 1 << 20;

/// Runs one full upgrade exchange against `config.server_host`: connect,
/// handshake, send `UPGRADE_REQUEST`, and write the received archive to
/// `config.destination_dir`. Returns the path the archive was written to.
pub fn run_upgrade(tls: &TlsContext, config: &ClientConfig) -> Result<std::path::PathBuf, ClientError> {
    let socket = connect(&config.server_host, config.server_port)?;
    let ssl = tls.new_session()?;
    let mut stream = client_handshake(ssl, socket)?;
    info!("SSL handshake with server completed");

    let request = UpgradeRequestWire::new(
        config.config_set,
        config.compression,
        config.package_manager,
        config.last_upgrade_time,
    );
    let mut buf = [0u8; UPGRADE_REQUEST_LEN];
    encode_upgrade_request(&mut buf, request);
    ssl_write_exact(&mut stream, &buf)?;

    let mut header_buf = [0u8; HEADER_LEN];
    ssl_read_exact(&mut stream, &mut header_buf)?;
    let header = decode_header(&header_buf).map_err(ClientError::ServerRejected)?;

    let destination = match header.packet_type {
        PacketType::UpgradeResponse => {
            let mut response_header = [0u8; UPGRADE_RESPONSE_HEADER_LEN];
            response_header[..HEADER_LEN].copy_from_slice(&header_buf);
            ssl_read_exact(&mut stream, &mut response_header[HEADER_LEN..])?;
            let length = decode_upgrade_response_header(&response_header)
                .map_err(ClientError::ServerRejected)?;
            receive_archive(&mut stream, &config.destination_dir, length)?
        }
        PacketType::ProtoFailure => {
            let mut failure_buf = [0u8; PROTO_FAILURE_LEN];
            failure_buf[..HEADER_LEN].copy_from_slice(&header_buf);
            ssl_read_exact(&mut stream, &mut failure_buf[HEADER_LEN..])?;
            let code =
                decode_proto_failure(&failure_buf).map_err(ClientError::ServerRejected)?;
            return Err(ClientError::ServerRejected(code));
        }
        _ => return Err(ClientError::UnexpectedPacket),
    };

    if let Err(e) = sync_tls::bidirectional_shutdown(&mut stream) {
        warn!(error = %e, "bidirectional shutdown failed");
    }

    Ok(destination)
}

fn receive_archive(
    stream: &mut sync_tls::Stream,
    destination_dir: &Path,
    length: u64,
) -> Result<std::path::PathBuf, ClientError> {
    let destination = destination_dir.join("upgrade.archive");
    let file = std::fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&destination)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                ClientError::DestinationExists(destination.clone())
            } else {
                ClientError::Io(e)
            }
        })?;
    let fd = file.as_raw_fd();

    let mut remaining = length;
    let mut chunk = vec![0u8; WRITE_CHUNK_LEN.min(length.max(1) as usize)];
    while remaining > 0 {
        let want = remaining.min(chunk.len() as u64) as usize;
        ssl_read_exact(stream, &mut chunk[..want])?;
        bulk_write(fd, &chunk[..want])?;
        remaining -= want as u64;
    }

    info!(bytes = length, path = %destination.display(), "archive received");
    Ok(destination)
}
