use std::path::{Path, PathBuf};

use serde::Deserialize;
use sync_wire::{CompressionType, PackageManager};

use crate::error::ConfigError;
use crate::server::{DEFAULT_PORT, MIN_PORT};
use crate::tls_file::{TlsFileConfig, TlsFileConfigSource};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfigSource {
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub config_set: Option<u16>,
    pub compression: Option<String>,
    pub package_manager: Option<String>,
    pub last_upgrade_time: Option<u32>,
    pub destination_dir: Option<PathBuf>,
    #[serde(default)]
    pub tls: TlsFileConfigSource,
}

/// CLI overrides for the client binary (SPEC_FULL.md §4.L).
#[derive(Debug, Clone, Default)]
pub struct ClientConfigOverrides {
    pub config_set: Option<u16>,
    pub compression: Option<String>,
    pub package_manager: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_host: String,
    pub server_port: u16,
    pub config_set: u16,
    pub compression: CompressionType,
    pub package_manager: PackageManager,
    pub last_upgrade_time: u32,
    pub destination_dir: PathBuf,
    pub tls: TlsFileConfig,
}

impl ClientConfig {
    pub fn load(
        config_path: &Path,
        overrides: ClientConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(config_path)
            .map_err(|e| ConfigError::Read(config_path.to_path_buf(), e))?;
        let source: ClientConfigSource =
            toml::from_str(&text).map_err(|e| ConfigError::Parse(config_path.to_path_buf(), e))?;
        Self::merge(source, overrides)
    }

    fn merge(source: ClientConfigSource, overrides: ClientConfigOverrides) -> Result<Self, ConfigError> {
        let server_host = source
            .server_host
            .ok_or(ConfigError::MissingField("server_host"))?;
        let server_port = source.server_port.unwrap_or(DEFAULT_PORT);
        if server_port < MIN_PORT {
            return Err(ConfigError::PortOutOfRange(server_port));
        }

        let compression_name = overrides.compression.or(source.compression);
        let compression = match compression_name.as_deref() {
            Some("none") => CompressionType::None,
            Some("tar_gz") | Some("targz") | None => CompressionType::TarGz,
            Some("tar_bz2") | Some("tarbz2") => CompressionType::TarBz2,
            Some("tar_xz") | Some("tarxz") => CompressionType::TarXz,
            Some("zip") => CompressionType::Zip,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    field: "compression",
                    value: other.to_string(),
                })
            }
        };

        let package_manager_name = overrides.package_manager.or(source.package_manager);
        let package_manager = match package_manager_name.as_deref() {
            Some("dpkg") | None => PackageManager::Dpkg,
            Some("tar_xz") | Some("tarxz") => PackageManager::TarXz,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    field: "package_manager",
                    value: other.to_string(),
                })
            }
        };

        let destination_dir = source
            .destination_dir
            .ok_or(ConfigError::MissingField("destination_dir"))?;
        if !destination_dir.is_dir() {
            return Err(ConfigError::PathMissing(destination_dir));
        }

        let tls = TlsFileConfig::from_source(source.tls)?;

        Ok(Self {
            server_host,
            server_port,
            config_set: overrides.config_set.or(source.config_set).unwrap_or(0),
            compression,
            package_manager,
            last_upgrade_time: source.last_upgrade_time.unwrap_or(0),
            destination_dir,
            tls,
        })
    }
}
