//! Blocking TLS transport for the sync protocol: context construction,
//! handshake/shutdown, secure I/O, and client-side connection setup.
//!
//! This crate intentionally does not use `tokio`: SPEC_FULL.md mandates a
//! thread-per-connection server and an explicitly poll-driven client, not
//! an async reactor (see DESIGN.md for why that diverges from the
//! `gel-stream`/`pgrust` crates this one is otherwise modeled on).

mod context;
mod error;
mod handshake;
mod io;
mod resolver;

pub use context::{TlsClientParams, TlsContext, TlsServerParams, CIPHER_LIST, CLIENT_VERIFY_DEPTH};
pub use error::{PollDirection, SyncError};
pub use handshake::{
    bidirectional_shutdown, client_handshake, server_handshake, MAX_ACCEPT_RETRIES,
    MAX_CONNECT_RETRIES,
};
pub use io::{
    bulk_pread, bulk_read, bulk_write, ssl_read_exact, ssl_write_exact, MAX_SSL_READ_RETRIES,
    MAX_SSL_WRITE_RETRIES, SSL_POLL_TIMEOUT_MILLISECONDS,
};
pub use resolver::{connect, CONNECT_TIMEOUT};

/// A TLS session bound to a TCP socket, as produced by `client_handshake`/
/// `server_handshake`.
pub type Stream = openssl::ssl::SslStream<std::net::TcpStream>;
