//! Wire framing for the package/configuration sync protocol.
//!
//! This crate is pure — no sockets, no TLS, no threads. It only knows how
//! to turn the four frame types (`UPGRADE_REQUEST`, `UPGRADE_RESPONSE`,
//! `UPGRADE_STATUS`, `PROTO_FAILURE`) into bytes and back, and how to
//! recognize a malformed or truncated frame. See `sync-tls` for the
//! transport that reads/writes these frames off a real socket.

mod error;
mod failure;
mod header;
mod request;
mod response;
mod status;

pub use error::ErrorCode;
pub use failure::{decode_proto_failure, encode_proto_failure, PROTO_FAILURE_LEN};
pub use header::{decode_header, encode_header, Header, PacketType, HEADER_LEN, PROTO_VER};
pub use request::{
    decode_upgrade_request, encode_upgrade_request, CompressionType, PackageManager,
    UpgradeRequestWire, UPGRADE_REQUEST_LEN,
};
pub use response::{
    decode_upgrade_response_header, encode_upgrade_response_header, UPGRADE_RESPONSE_HEADER_LEN,
};
pub use status::{decode_upgrade_status, encode_upgrade_status, UPGRADE_STATUS_LEN};
