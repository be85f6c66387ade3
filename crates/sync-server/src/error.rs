/// Top-level errors the server binary can fail to start with. Per-connection
/// failures never reach this far — `worker::handle_connection` contains them.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] sync_config::ConfigError),

    #[error("TLS initialization error: {0}")]
    Tls(#[from] sync_tls::SyncError),

    #[error("another instance is already running (pid file lock held): {0}")]
    AlreadyRunning(std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
