//! Request validator (SPEC_FULL.md §4.H).
//!
//! Grounded on `examples/original_source/src/server/server_parser.c`'s
//! field-by-field checks and the traversal-protection idiom used throughout
//! the source's path handling, generalized to `std::path::Path::canonicalize`
//! instead of hand-rolled `..`-stripping.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use sync_config::ServerConfig;
use sync_wire::{CompressionType, ErrorCode, PackageManager, UpgradeRequestWire};

/// A validated `UPGRADE_REQUEST`, with its `config_set` resolved to an
/// absolute path known to live under `configuration_sets_dir` (SPEC_FULL.md
/// §3).
#[derive(Debug, Clone)]
pub struct ValidatedUpgradeRequest {
    pub config_set_absolute_path: PathBuf,
    pub compression: CompressionType,
    pub package_manager: PackageManager,
    pub last_upgrade_time: u32,
}

pub fn validate(
    request: &UpgradeRequestWire,
    config: &ServerConfig,
) -> Result<ValidatedUpgradeRequest, ErrorCode> {
    let config_set_absolute_path = resolve_config_set(request.config_set, config)?;

    let compression = request
        .compression()
        .ok_or(ErrorCode::UnknownComprType)?;
    if !config.supported_compressions.contains(&compression) {
        return Err(ErrorCode::UnknownComprType);
    }

    let package_manager = request
        .package_manager()
        .ok_or(ErrorCode::UnknownPkgMgr)?;
    if !config.supported_package_managers.contains(&package_manager) {
        return Err(ErrorCode::UnknownPkgMgr);
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    if u64::from(request.last_upgrade_time) > now {
        return Err(ErrorCode::MalformedPacket);
    }

    Ok(ValidatedUpgradeRequest {
        config_set_absolute_path,
        compression,
        package_manager,
        last_upgrade_time: request.last_upgrade_time,
    })
}

fn resolve_config_set(config_set: u16, config: &ServerConfig) -> Result<PathBuf, ErrorCode> {
    let root = config
        .configuration_sets_dir
        .canonicalize()
        .map_err(|_| ErrorCode::UnknownConfigSet)?;

    let candidate = root.join(config_set.to_string());
    let resolved = candidate
        .canonicalize()
        .map_err(|_| ErrorCode::UnknownConfigSet)?;

    if !resolved.starts_with(&root) {
        return Err(ErrorCode::UnknownConfigSet);
    }
    if !resolved.is_file() {
        return Err(ErrorCode::UnknownConfigSet);
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use sync_config::TlsFileConfig;

    fn make_config(dir: &std::path::Path) -> ServerConfig {
        let config_sets = dir.join("config_sets");
        std::fs::create_dir_all(&config_sets).unwrap();
        std::fs::write(config_sets.join("0"), "curl\n").unwrap();

        let mut compressions = BTreeSet::new();
        compressions.insert(CompressionType::TarGz);
        let mut managers = BTreeSet::new();
        managers.insert(PackageManager::Dpkg);

        ServerConfig {
            port: 4440,
            max_clients_threads: 4,
            configuration_sets_dir: config_sets,
            pkg_cache_dir: dir.to_path_buf(),
            archives_dir: dir.to_path_buf(),
            supported_compressions: compressions,
            supported_package_managers: managers,
            tls: TlsFileConfig {
                cert_chain: None,
                private_key: None,
                private_key_password: None,
                ca_path: dir.to_path_buf(),
            },
            verify_package_existence: false,
        }
    }

    #[test]
    fn rejects_config_set_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = make_config(dir.path());

        let request = UpgradeRequestWire::new(99, CompressionType::TarGz, PackageManager::Dpkg, 0);
        let err = validate(&request, &config).unwrap_err();
        assert_eq!(err, ErrorCode::UnknownConfigSet);
    }

    #[test]
    fn accepts_known_config_set() {
        let dir = tempfile::tempdir().unwrap();
        let config = make_config(dir.path());

        let request = UpgradeRequestWire::new(0, CompressionType::TarGz, PackageManager::Dpkg, 0);
        let validated = validate(&request, &config).unwrap();
        assert!(validated.config_set_absolute_path.starts_with(
            config.configuration_sets_dir.canonicalize().unwrap()
        ));
    }

    #[test]
    fn rejects_unsupported_compression() {
        let dir = tempfile::tempdir().unwrap();
        let config = make_config(dir.path());

        let request = UpgradeRequestWire::new(0, CompressionType::Rar, PackageManager::Dpkg, 0);
        let err = validate(&request, &config).unwrap_err();
        assert_eq!(err, ErrorCode::UnknownComprType);
    }

    #[test]
    fn rejects_future_last_upgrade_time() {
        let dir = tempfile::tempdir().unwrap();
        let config = make_config(dir.path());

        let far_future = u32::MAX;
        let request = UpgradeRequestWire::new(0, CompressionType::TarGz, PackageManager::Dpkg, far_future);
        let err = validate(&request, &config).unwrap_err();
        assert_eq!(err, ErrorCode::MalformedPacket);
    }
}
