use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use sync_wire::{CompressionType, PackageManager};

use crate::error::ConfigError;
use crate::tls_file::{TlsFileConfig, TlsFileConfigSource};

pub const DEFAULT_PORT: u16 = 4440;
pub const MIN_PORT: u16 = 1025;
pub const DEFAULT_MAX_CLIENTS_THREADS: usize = 64;

/// TOML shape of the server config file. Every field is optional here; CLI
/// overrides and defaults are reconciled in `ServerConfig::load`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigSource {
    pub port: Option<u16>,
    pub max_clients_threads: Option<usize>,
    pub configuration_sets_dir: Option<PathBuf>,
    pub pkg_cache_dir: Option<PathBuf>,
    pub archives_dir: Option<PathBuf>,
    pub supported_compressions: Option<Vec<String>>,
    pub supported_package_managers: Option<Vec<String>>,
    pub verify_package_existence: Option<bool>,
    #[serde(default)]
    pub tls: TlsFileConfigSource,
}

/// CLI overrides for the server binary (SPEC_FULL.md §4.L): any `Some` field
/// here wins over the config file's value for that field.
#[derive(Debug, Clone, Default)]
pub struct ServerConfigOverrides {
    pub port: Option<u16>,
    pub max_clients_threads: Option<usize>,
    pub configuration_sets_dir: Option<PathBuf>,
}

/// Typed, immutable server configuration (SPEC_FULL.md §3). Built once at
/// startup and shared read-only via `Arc`; nothing mutates it afterward.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub max_clients_threads: usize,
    pub configuration_sets_dir: PathBuf,
    pub pkg_cache_dir: PathBuf,
    pub archives_dir: PathBuf,
    pub supported_compressions: BTreeSet<CompressionType>,
    pub supported_package_managers: BTreeSet<PackageManager>,
    pub tls: TlsFileConfig,
    pub verify_package_existence: bool,
}

impl ServerConfig {
    pub fn load(
        config_path: &Path,
        overrides: ServerConfigOverrides,
    ) -> Result<Arc<Self>, ConfigError> {
        let text = std::fs::read_to_string(config_path)
            .map_err(|e| ConfigError::Read(config_path.to_path_buf(), e))?;
        let source: ServerConfigSource =
            toml::from_str(&text).map_err(|e| ConfigError::Parse(config_path.to_path_buf(), e))?;
        Self::merge(source, overrides)
    }

    fn merge(
        source: ServerConfigSource,
        overrides: ServerConfigOverrides,
    ) -> Result<Arc<Self>, ConfigError> {
        let port = overrides.port.or(source.port).unwrap_or(DEFAULT_PORT);
        if port < MIN_PORT {
            return Err(ConfigError::PortOutOfRange(port));
        }

        let max_clients_threads = overrides
            .max_clients_threads
            .or(source.max_clients_threads)
            .unwrap_or(DEFAULT_MAX_CLIENTS_THREADS);

        let configuration_sets_dir = overrides
            .configuration_sets_dir
            .or(source.configuration_sets_dir)
            .ok_or(ConfigError::MissingField("configuration_sets_dir"))?;
        require_dir(&configuration_sets_dir)?;

        let pkg_cache_dir = source
            .pkg_cache_dir
            .ok_or(ConfigError::MissingField("pkg_cache_dir"))?;
        require_dir(&pkg_cache_dir)?;

        let archives_dir = source
            .archives_dir
            .ok_or(ConfigError::MissingField("archives_dir"))?;
        require_dir(&archives_dir)?;

        let supported_compressions = parse_compressions(source.supported_compressions)?;
        let supported_package_managers = parse_package_managers(source.supported_package_managers)?;

        let tls = TlsFileConfig::from_source(source.tls)?;

        Ok(Arc::new(Self {
            port,
            max_clients_threads,
            configuration_sets_dir,
            pkg_cache_dir,
            archives_dir,
            supported_compressions,
            supported_package_managers,
            tls,
            verify_package_existence: source.verify_package_existence.unwrap_or(false),
        }))
    }
}

fn require_dir(path: &Path) -> Result<(), ConfigError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(ConfigError::PathMissing(path.to_path_buf()))
    }
}

fn parse_compressions(names: Option<Vec<String>>) -> Result<BTreeSet<CompressionType>, ConfigError> {
    let names = names.unwrap_or_else(|| {
        vec!["none".into(), "tar_gz".into(), "tar_bz2".into(), "tar_xz".into()]
    });

    let mut set = BTreeSet::new();
    for name in names {
        if let Some(c) = compression_from_name(&name) {
            set.insert(c);
        }
    }
    if set.is_empty() {
        return Err(ConfigError::NoSupportedCompression);
    }
    Ok(set)
}

fn compression_from_name(name: &str) -> Option<CompressionType> {
    match name.to_ascii_lowercase().as_str() {
        "none" => Some(CompressionType::None),
        "tar_gz" | "targz" => Some(CompressionType::TarGz),
        "tar_bz2" | "tarbz2" => Some(CompressionType::TarBz2),
        "tar_xz" | "tarxz" => Some(CompressionType::TarXz),
        "zip" => Some(CompressionType::Zip),
        "rar" => None,
        _ => None,
    }
}

fn parse_package_managers(
    names: Option<Vec<String>>,
) -> Result<BTreeSet<PackageManager>, ConfigError> {
    let names = names.unwrap_or_else(|| vec!["dpkg".into()]);

    let mut set = BTreeSet::new();
    for name in names {
        match name.to_ascii_lowercase().as_str() {
            "dpkg" => {
                set.insert(PackageManager::Dpkg);
            }
            "tar_xz" | "tarxz" => {
                set.insert(PackageManager::TarXz);
            }
            _ => {}
        }
    }
    if set.is_empty() {
        return Err(ConfigError::NoSupportedPackageManager);
    }
    Ok(set)
}
