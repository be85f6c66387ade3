/// Internal, non-wire errors (SPEC_FULL.md §7). These never cross the wire
/// themselves; where a `PROTO_FAILURE` can meaningfully be sent instead
/// (frame-codec/validator errors), callers convert `sync_wire::ErrorCode`
/// into a frame directly rather than going through this type.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("transport error: {0}")]
    TransportError(String),

    #[error("transport timed out waiting for {0:?}")]
    TransportTimeout(PollDirection),

    #[error("peer closed the connection")]
    PeerClosed,

    #[error("retry budget exhausted after {0} attempts")]
    RetryExhausted(u32),

    #[error("TLS context initialization failed: {0}")]
    TlsInitError(String),

    #[error("peer certificate was rejected: {0}")]
    CertificateRejected(String),

    #[error("connection refused")]
    ConnectionRefused,

    #[error("connection failed: no address succeeded")]
    ConnectionFailed,

    #[error("connection attempt timed out")]
    ConnectTimeout,

    #[error("unexpected end of stream before framed length was satisfied")]
    UnexpectedEof,

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OpenSSL error stack: {0}")]
    OpenSslErrorStack(#[from] openssl::error::ErrorStack),

    #[error("protocol error: {0}")]
    Wire(#[from] sync_wire::ErrorCode),
}

/// Which direction a poll was waiting on when it timed out or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDirection {
    Read,
    Write,
}
