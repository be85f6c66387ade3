//! Package download (SPEC_FULL.md §4.I, download phase).
//!
//! Grounded on `examples/original_source/src/server/packages_manager.c`'s
//! `append_pkg_list`/`download_missing_packages`: read the config-set file
//! line by line, skip comments/blanks, validate each package name, and run
//! the package manager's download tool with the package cache directory as
//! its working directory. The source builds one `system()` string (`cd %s
//! && apt-get download pkg1 pkg2 ...`); this crate keeps the same shape —
//! one downloader invocation per request — but passes package names as
//! separate `Command` arguments instead of interpolating them into a shell
//! string, so a malicious config-set line cannot break out of the
//! argument list.

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::Command;

use regex::Regex;
use sync_wire::PackageManager;
use tracing::{debug, warn};

use crate::error::ArchiveError;

/// Matches the source's `^[A-Za-z0-9._+\-]+$` package-name allow-list.
fn package_name_pattern() -> Regex {
    Regex::new(r"^[A-Za-z0-9._+\-]+$").expect("static regex is valid")
}

/// Read a config-set file into the list of package names it names, applying
/// the same comment/blank-line/whitespace rules as the source.
pub fn read_config_set(path: &Path) -> Result<Vec<String>, ArchiveError> {
    let file = std::fs::File::open(path)
        .map_err(|e| ArchiveError::ConfigSetRead(path.to_path_buf(), e))?;
    let pattern = package_name_pattern();

    let mut names = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| ArchiveError::ConfigSetRead(path.to_path_buf(), e))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if !pattern.is_match(trimmed) {
            warn!(line = trimmed, "skipping config-set line: invalid package name");
            continue;
        }
        names.push(trimmed.to_string());
    }

    debug!(count = names.len(), path = %path.display(), "packages read from config set");
    Ok(names)
}

/// The external binary and download subcommand for a given package manager.
/// `TarXz` names a site-local fetch helper with the same `download <names..>`
/// calling convention as `apt-get`; the core only needs to know its name.
fn downloader_binary(pkg_manager: PackageManager) -> &'static str {
    match pkg_manager {
        PackageManager::Dpkg => "apt-get",
        PackageManager::TarXz => "tar-xz-pkgtool",
    }
}

/// Optionally confirm a package name exists in the package index before
/// trying to download it, by shelling out to `apt-cache show <name>` (or the
/// matching command for the configured package manager) and checking its
/// exit status. This corresponds to the source's commented reference to
/// package-index lookups; the core does not do this by default.
pub fn package_exists(pkg_manager: PackageManager, name: &str, pkg_cache_dir: &Path) -> bool {
    let status = match pkg_manager {
        PackageManager::Dpkg => Command::new("apt-cache")
            .arg("show")
            .arg(name)
            .current_dir(pkg_cache_dir)
            .status(),
        PackageManager::TarXz => Command::new("tar-xz-pkgtool")
            .arg("show")
            .arg(name)
            .current_dir(pkg_cache_dir)
            .status(),
    };

    matches!(status, Ok(status) if status.success())
}

/// Download every package named by `config_set_path` into `pkg_cache_dir`,
/// optionally filtering by `package_exists` first. One child process is
/// spawned per request, mirroring the source's one `system()` call per
/// upgrade.
pub fn download_packages(
    pkg_manager: PackageManager,
    config_set_path: &Path,
    pkg_cache_dir: &Path,
    verify_package_existence: bool,
) -> Result<Vec<String>, ArchiveError> {
    let names = read_config_set(config_set_path)?;

    let names: Vec<String> = if verify_package_existence {
        names
            .into_iter()
            .filter(|name| {
                let exists = package_exists(pkg_manager, name, pkg_cache_dir);
                if !exists {
                    warn!(package = name, "package not found in index, skipping");
                }
                exists
            })
            .collect()
    } else {
        names
    };

    if names.is_empty() {
        debug!("no packages to download for this config set");
        return Ok(names);
    }

    let status = Command::new(downloader_binary(pkg_manager))
        .arg("download")
        .args(&names)
        .current_dir(pkg_cache_dir)
        .status()
        .map_err(ArchiveError::DownloadSpawn)?;

    if !status.success() {
        return Err(ArchiveError::DownloadFailed(status));
    }

    Ok(names)
}
