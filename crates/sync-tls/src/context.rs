//! TLS context factory (SPEC_FULL.md §4.C): one process-wide, read-only
//! context per role, built from a PFS-only cipher policy.
//!
//! Grounded on
//! `examples/edgedb-edgedb/rust/pgrust/src/connection/openssl.rs`'s
//! `create_ssl_client_context` (context-builder shape, cert/key/CA loading)
//! and `examples/original_source/include/server/security.h` /
//! `src/common/security.c` for the role split and cipher string.

use std::path::{Path, PathBuf};

use openssl::pkey::PKey;
use openssl::ssl::{Ssl, SslContext, SslContextBuilder, SslMethod, SslOptions, SslVerifyMode};
use openssl::x509::X509;

use crate::error::SyncError;

/// PFS-only cipher policy: ECDHE/DHE only, no anonymous/MD5/RC4/3DES/IDEA/
/// CAMELLIA/SEED/PSK/SRP/static-ECDH, ordered by strength.
pub const CIPHER_LIST: &str = "kEECDH+ECDSA kEECDH kEDH +SHA !aNULL !eNULL !LOW !3DES !MD5 !EXP !DSS !PSK !SRP !kECDH !CAMELLIA !IDEA !RC4 !SEED @STRENGTH";

/// Verify depth used for client-side peer verification.
pub const CLIENT_VERIFY_DEPTH: u32 = 32;

/// Parameters needed to build a server-role `TlsContext`.
#[derive(Debug, Clone)]
pub struct TlsServerParams {
    pub cert_chain: PathBuf,
    pub private_key: PathBuf,
    pub private_key_password: Option<String>,
}

/// Parameters needed to build a client-role `TlsContext`.
#[derive(Debug, Clone)]
pub struct TlsClientParams {
    /// A CA bundle file, or a directory of hashed CA certificates.
    pub ca_path: PathBuf,
}

/// A process-wide, read-only TLS context. Safe to share by reference across
/// every session derived from it (openssl's `SslContext` is `Sync`).
pub struct TlsContext {
    ctx: SslContext,
}

impl TlsContext {
    pub fn new_server(params: &TlsServerParams) -> Result<Self, SyncError> {
        let mut builder = base_builder()?;

        let chain = std::fs::read(&params.cert_chain)
            .map_err(|e| SyncError::InvalidPath(format!("{}: {e}", params.cert_chain.display())))?;
        let cert = X509::from_pem(&chain).map_err(wrap_init_err("parsing certificate chain"))?;
        builder
            .set_certificate(&cert)
            .map_err(wrap_init_err("loading certificate chain"))?;

        load_private_key(&mut builder, &params.private_key, &params.private_key_password)?;
        builder
            .check_private_key()
            .map_err(wrap_init_err("certificate/private key mismatch"))?;

        Ok(Self {
            ctx: builder.build(),
        })
    }

    pub fn new_client(params: &TlsClientParams) -> Result<Self, SyncError> {
        let mut builder = base_builder()?;

        set_ca_verify_location(&mut builder, &params.ca_path)?;
        builder.set_verify(SslVerifyMode::PEER);
        builder.set_verify_depth(CLIENT_VERIFY_DEPTH);

        Ok(Self {
            ctx: builder.build(),
        })
    }

    /// Create a fresh `Ssl` session bound to this context. The caller binds
    /// it to a socket and drives the handshake (see `handshake.rs`).
    pub fn new_session(&self) -> Result<Ssl, SyncError> {
        Ssl::new(&self.ctx).map_err(SyncError::OpenSslErrorStack)
    }
}

fn base_builder() -> Result<SslContextBuilder, SyncError> {
    let mut builder =
        SslContextBuilder::new(SslMethod::tls()).map_err(SyncError::OpenSslErrorStack)?;

    // TLS 1.2+ only; explicitly forbid SSLv2/SSLv3.
    builder.set_options(SslOptions::NO_SSLV2 | SslOptions::NO_SSLV3 | SslOptions::SINGLE_DH_USE);
    builder.set_min_proto_version(Some(openssl::ssl::SslVersion::TLS1_2))
        .map_err(wrap_init_err("setting minimum TLS version"))?;
    builder
        .set_cipher_list(CIPHER_LIST)
        .map_err(wrap_init_err("setting PFS-only cipher list"))?;

    Ok(builder)
}

fn load_private_key(
    builder: &mut SslContextBuilder,
    key_path: &Path,
    password: &Option<String>,
) -> Result<(), SyncError> {
    let pem = std::fs::read(key_path)
        .map_err(|e| SyncError::InvalidPath(format!("{}: {e}", key_path.display())))?;

    let key = match password {
        Some(password) => PKey::private_key_from_pem_passphrase(&pem, password.as_bytes())
            .map_err(wrap_init_err("decrypting private key"))?,
        None => PKey::private_key_from_pem(&pem).map_err(wrap_init_err("parsing private key"))?,
    };

    builder
        .set_private_key(&key)
        .map_err(wrap_init_err("installing private key"))
}

fn set_ca_verify_location(builder: &mut SslContextBuilder, ca_path: &Path) -> Result<(), SyncError> {
    if ca_path.is_dir() {
        builder
            .load_verify_locations(None, Some(ca_path))
            .map_err(wrap_init_err("loading CA directory"))
    } else {
        builder
            .load_verify_locations(Some(ca_path), None)
            .map_err(wrap_init_err("loading CA file"))
    }
}

fn wrap_init_err(step: &'static str) -> impl FnOnce(openssl::error::ErrorStack) -> SyncError {
    move |e| SyncError::TlsInitError(format!("{step}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cipher_list_excludes_weak_and_anonymous_suites() {
        for forbidden in [
            "!aNULL", "!eNULL", "!LOW", "!3DES", "!MD5", "!EXP", "!DSS", "!PSK", "!SRP",
            "!kECDH", "!CAMELLIA", "!IDEA", "!RC4", "!SEED",
        ] {
            assert!(CIPHER_LIST.contains(forbidden), "missing {forbidden}");
        }
        assert!(CIPHER_LIST.contains("kEECDH"));
        assert!(CIPHER_LIST.contains("kEDH"));
    }
}
