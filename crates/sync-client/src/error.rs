/// Top-level errors the client binary can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(#[from] sync_config::ConfigError),

    #[error("transport error: {0}")]
    Transport(#[from] sync_tls::SyncError),

    #[error("server rejected the request: {0:?}")]
    ServerRejected(sync_wire::ErrorCode),

    #[error("server sent an unexpected packet type")]
    UnexpectedPacket,

    #[error("destination file {0} already exists")]
    DestinationExists(std::path::PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
