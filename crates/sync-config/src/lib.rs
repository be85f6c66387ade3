//! Typed, immutable configuration (SPEC_FULL.md §4.K) and the daemon/lock
//! collaborator traits (§4.N) for the sync protocol's two binaries.

mod client;
mod daemon;
mod error;
mod lock;
mod server;
mod tls_file;

pub use client::{ClientConfig, ClientConfigOverrides, ClientConfigSource};
pub use daemon::{Daemonize, NoopDaemonize, UnixDaemonize};
pub use error::ConfigError;
pub use lock::{FlockPidLock, SingleInstanceLock};
pub use server::{
    ServerConfig, ServerConfigOverrides, ServerConfigSource, DEFAULT_MAX_CLIENTS_THREADS,
    DEFAULT_PORT, MIN_PORT,
};
pub use tls_file::{TlsFileConfig, TlsFileConfigSource};

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn cli_override_wins_over_config_file_value() {
        let dir = tempfile::tempdir().unwrap();
        let config_sets = dir.path().join("config_sets");
        let pkg_cache = dir.path().join("pkg_cache");
        let archives = dir.path().join("archives");
        let ca = write_tmp(&dir, "ca.pem", "not a real cert, just existence-checked");
        std::fs::create_dir_all(&config_sets).unwrap();
        std::fs::create_dir_all(&pkg_cache).unwrap();
        std::fs::create_dir_all(&archives).unwrap();

        let config_path = write_tmp(
            &dir,
            "server.toml",
            &format!(
                r#"
                port = 5000
                configuration_sets_dir = "{config_sets}"
                pkg_cache_dir = "{pkg_cache}"
                archives_dir = "{archives}"

                [tls]
                ca_path = "{ca}"
                "#,
                config_sets = config_sets.display(),
                pkg_cache = pkg_cache.display(),
                archives = archives.display(),
                ca = ca.display(),
            ),
        );

        let config = ServerConfig::load(
            &config_path,
            ServerConfigOverrides {
                port: Some(6000),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(config.port, 6000);
    }

    #[test]
    fn rejects_port_below_minimum() {
        let dir = tempfile::tempdir().unwrap();
        let config_sets = dir.path().join("config_sets");
        let pkg_cache = dir.path().join("pkg_cache");
        let archives = dir.path().join("archives");
        let ca = write_tmp(&dir, "ca.pem", "cert");
        std::fs::create_dir_all(&config_sets).unwrap();
        std::fs::create_dir_all(&pkg_cache).unwrap();
        std::fs::create_dir_all(&archives).unwrap();

        let config_path = write_tmp(
            &dir,
            "server.toml",
            &format!(
                r#"
                port = 80
                configuration_sets_dir = "{config_sets}"
                pkg_cache_dir = "{pkg_cache}"
                archives_dir = "{archives}"

                [tls]
                ca_path = "{ca}"
                "#,
                config_sets = config_sets.display(),
                pkg_cache = pkg_cache.display(),
                archives = archives.display(),
                ca = ca.display(),
            ),
        );

        let err = ServerConfig::load(&config_path, ServerConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::PortOutOfRange(80)));
    }
}
