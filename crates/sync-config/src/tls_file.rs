use std::path::PathBuf;

use serde::Deserialize;
use zeroize::Zeroizing;

use crate::error::ConfigError;

/// File-based TLS material shared by both roles (SPEC_FULL.md §3). The
/// private-key password, if any, is wrapped so its backing buffer is
/// zeroized on drop rather than left in freed heap memory — the Rust
/// realization of §9's "password's bytes zeroized on destruction if the
/// language permits".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsFileConfigSource {
    pub cert_chain: Option<PathBuf>,
    pub private_key: Option<PathBuf>,
    pub private_key_password: Option<String>,
    pub ca_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct TlsFileConfig {
    pub cert_chain: Option<PathBuf>,
    pub private_key: Option<PathBuf>,
    pub private_key_password: Option<Zeroizing<String>>,
    pub ca_path: PathBuf,
}

impl TlsFileConfig {
    pub fn from_source(source: TlsFileConfigSource) -> Result<Self, ConfigError> {
        let ca_path = source
            .ca_path
            .ok_or(ConfigError::MissingField("tls.ca_path"))?;
        if !ca_path.exists() {
            return Err(ConfigError::PathMissing(ca_path));
        }
        for path in [&source.cert_chain, &source.private_key]
            .into_iter()
            .flatten()
        {
            if !path.exists() {
                return Err(ConfigError::PathMissing(path.clone()));
            }
        }

        Ok(Self {
            cert_chain: source.cert_chain,
            private_key: source.private_key,
            private_key_password: source.private_key_password.map(Zeroizing::new),
            ca_path,
        })
    }
}
