//! Archive building (SPEC_FULL.md §4.I, compress phase).
//!
//! `examples/original_source/src/server/packages_manager.c`'s
//! `compress_packages` is an unimplemented stub, so this module's shape is
//! designed fresh against SPEC_FULL.md rather than translated; it follows
//! each compression crate's own documented builder idiom (`tar::Builder`
//! wrapping a `Write`, `flate2`/`bzip2`/`xz2` encoder adapters, `zip::ZipWriter`
//! for the one non-tar format).

use std::fs::File;
use std::path::{Path, PathBuf};

use bzip2::write::BzEncoder;
use bzip2::Compression as BzCompression;
use flate2::write::GzEncoder;
use flate2::Compression as GzCompression;
use sync_wire::CompressionType;
use tracing::debug;
use xz2::write::XzEncoder;

use crate::error::ArchiveError;

fn extension_for(compression: CompressionType) -> &'static str {
    match compression {
        CompressionType::None => "tar",
        CompressionType::TarGz => "tar.gz",
        CompressionType::TarBz2 => "tar.bz2",
        CompressionType::TarXz => "tar.xz",
        CompressionType::Rar => "rar",
        CompressionType::Zip => "zip",
    }
}

/// Build an archive named `request_id` (under `archives_dir`) from the files
/// in `pkg_cache_dir` matching `package_names`, in the requested
/// `compression` format. Returns the path of the finished archive.
pub fn build_archive(
    archives_dir: &Path,
    pkg_cache_dir: &Path,
    package_names: &[String],
    request_id: &str,
    compression: CompressionType,
) -> Result<PathBuf, ArchiveError> {
    let archive_path = archives_dir.join(format!("{request_id}.{}", extension_for(compression)));
    let file = File::create(&archive_path)
        .map_err(|e| ArchiveError::ArchiveCreate(archive_path.clone(), e))?;

    match compression {
        CompressionType::None => write_tar(file, pkg_cache_dir, package_names, &archive_path)?,
        CompressionType::TarGz => {
            let encoder = GzEncoder::new(file, GzCompression::default());
            let encoder = write_tar(encoder, pkg_cache_dir, package_names, &archive_path)?;
            encoder
                .finish()
                .map_err(ArchiveError::ArchiveFinish)?;
        }
        CompressionType::TarBz2 => {
            let encoder = BzEncoder::new(file, BzCompression::default());
            let encoder = write_tar(encoder, pkg_cache_dir, package_names, &archive_path)?;
            encoder
                .finish()
                .map_err(ArchiveError::ArchiveFinish)?;
        }
        CompressionType::TarXz => {
            let encoder = XzEncoder::new(file, 6);
            let encoder = write_tar(encoder, pkg_cache_dir, package_names, &archive_path)?;
            encoder
                .finish()
                .map_err(ArchiveError::ArchiveFinish)?;
        }
        CompressionType::Zip => write_zip(file, pkg_cache_dir, package_names, &archive_path)?,
        CompressionType::Rar => {
            return Err(ArchiveError::UnsupportedCompression(compression));
        }
    }

    debug!(path = %archive_path.display(), "archive built");
    Ok(archive_path)
}

fn write_tar<W: std::io::Write>(
    writer: W,
    pkg_cache_dir: &Path,
    package_names: &[String],
    archive_path: &Path,
) -> Result<W, ArchiveError> {
    let mut builder = tar::Builder::new(writer);
    for name in package_names {
        let source = pkg_cache_dir.join(name);
        builder
            .append_path_with_name(&source, name)
            .map_err(|e| ArchiveError::ArchiveAppend(source, e))?;
    }
    builder.into_inner().map_err(ArchiveError::ArchiveFinish)
}

fn write_zip(
    file: File,
    pkg_cache_dir: &Path,
    package_names: &[String],
    archive_path: &Path,
) -> Result<(), ArchiveError> {
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for name in package_names {
        let source = pkg_cache_dir.join(name);
        let mut contents = File::open(&source)
            .map_err(|e| ArchiveError::ArchiveAppend(source.clone(), e))?;
        writer
            .start_file(name, options)
            .map_err(|e| ArchiveError::ArchiveAppend(source.clone(), std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        std::io::copy(&mut contents, &mut writer)
            .map_err(|e| ArchiveError::ArchiveAppend(source.clone(), e))?;
    }

    writer
        .finish()
        .map_err(|e| ArchiveError::ArchiveCreate(archive_path.to_path_buf(), std::io::Error::new(std::io::ErrorKind::Other, e)))?;
    Ok(())
}
