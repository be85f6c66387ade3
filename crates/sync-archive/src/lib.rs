//! Package download and archive building for the sync protocol's worker
//! state machine (SPEC_FULL.md §4.I).

mod compress;
mod download;
mod error;

pub use compress::build_archive;
pub use download::{download_packages, package_exists, read_config_set};
pub use error::ArchiveError;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn read_config_set_skips_comments_blanks_and_invalid_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "# a comment").unwrap();
        writeln!(file, "   ").unwrap();
        writeln!(file, "curl").unwrap();
        writeln!(file, "jq ").unwrap();
        writeln!(file, "bad;name").unwrap();
        writeln!(file, "libc6-dev").unwrap();
        drop(file);

        let names = read_config_set(&path).unwrap();
        assert_eq!(names, vec!["curl", "jq", "libc6-dev"]);
    }

    #[test]
    fn build_archive_tar_gz_round_trips_file_contents() {
        let pkg_cache = tempfile::tempdir().unwrap();
        let archives = tempfile::tempdir().unwrap();
        std::fs::write(pkg_cache.path().join("curl"), b"curl package bytes").unwrap();

        let path = build_archive(
            archives.path(),
            pkg_cache.path(),
            &["curl".to_string()],
            "req-1",
            sync_wire::CompressionType::TarGz,
        )
        .unwrap();

        assert_eq!(path, archives.path().join("req-1.tar.gz"));
        let file = std::fs::File::open(&path).unwrap();
        let decoder = flate2::read::GzDecoder::new(file);
        let mut archive = tar::Archive::new(decoder);
        let mut found = false;
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            if entry.path().unwrap().to_str() == Some("curl") {
                let mut contents = String::new();
                std::io::Read::read_to_string(&mut entry, &mut contents).unwrap();
                assert_eq!(contents, "curl package bytes");
                found = true;
            }
        }
        assert!(found, "archive did not contain the expected entry");
    }

    #[test]
    fn build_archive_rar_is_unsupported() {
        let pkg_cache = tempfile::tempdir().unwrap();
        let archives = tempfile::tempdir().unwrap();

        let err = build_archive(
            archives.path(),
            pkg_cache.path(),
            &[],
            "req-2",
            sync_wire::CompressionType::Rar,
        )
        .unwrap_err();
        assert!(matches!(err, ArchiveError::UnsupportedCompression(_)));
    }
}
