use std::path::PathBuf;

/// Failures from loading and validating a `ServerConfig`/`ClientConfig`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("failed to parse configuration file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("port {0} is outside the allowed range [1025, 65535]")]
    PortOutOfRange(u16),

    #[error("path {0} does not exist")]
    PathMissing(PathBuf),

    #[error("no supported compression types configured")]
    NoSupportedCompression,

    #[error("no supported package managers configured")]
    NoSupportedPackageManager,

    #[error("required field `{0}` was not provided by the config file or the command line")]
    MissingField(&'static str),

    #[error("invalid value for `{field}`: `{value}`")]
    InvalidValue { field: &'static str, value: String },
}
