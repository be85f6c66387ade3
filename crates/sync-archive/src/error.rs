use std::path::PathBuf;

/// Failures from the download/compress pipeline. Every variant here is
/// reported to the client as `PROTO_FAILURE(SERVER_INTERNAL_ERR)`; nothing
/// finer-grained crosses the wire (see SPEC_FULL.md §7).
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to open config set file {0}: {1}")]
    ConfigSetRead(PathBuf, std::io::Error),

    #[error("package download command failed to start: {0}")]
    DownloadSpawn(std::io::Error),

    #[error("package download command exited with status {0}")]
    DownloadFailed(std::process::ExitStatus),

    #[error("failed to create archive at {0}: {1}")]
    ArchiveCreate(PathBuf, std::io::Error),

    #[error("failed to append {0} to archive: {1}")]
    ArchiveAppend(PathBuf, std::io::Error),

    #[error("failed to finalize archive: {0}")]
    ArchiveFinish(std::io::Error),

    #[error("compression type {0:?} is not in the server's supported subset")]
    UnsupportedCompression(sync_wire::CompressionType),
}
