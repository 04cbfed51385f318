// src/codec/zip_body.rs

//! ZIP body reading and writing shared by the CRX and XPI codecs

use std::io::{Cursor, Read, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{ArchiveEntry, CodecError, CodecResult, EntryObserver, MANIFEST_PATH};

/// Read every entry of a ZIP archive into memory
///
/// Entry paths must stay inside the archive root. The total decompressed
/// size is capped at `max_unpacked` regardless of what the entry headers
/// claim.
pub(crate) fn read_entries(
    data: &[u8],
    max_unpacked: u64,
    observer: &mut EntryObserver<'_>,
) -> CodecResult<Vec<ArchiveEntry>> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| CodecError::Corrupt(format!("failed to open ZIP body: {}", e)))?;

    let total = archive.len();
    let mut entries = Vec::with_capacity(total);
    let mut unpacked: u64 = 0;

    for i in 0..total {
        let mut file = archive
            .by_index(i)
            .map_err(|e| CodecError::Corrupt(format!("failed to read ZIP entry {}: {}", i, e)))?;

        let path = file.name().to_string();
        if file.enclosed_name().is_none() {
            return Err(CodecError::Corrupt(format!("unsafe entry path: {}", path)));
        }

        let is_dir = file.is_dir();
        let unix_mode = file.unix_mode();
        let mut content = Vec::new();

        if !is_dir {
            let budget = max_unpacked.saturating_sub(unpacked);
            (&mut file)
                .take(budget.saturating_add(1))
                .read_to_end(&mut content)
                .map_err(|e| CodecError::Corrupt(format!("failed to inflate {}: {}", path, e)))?;

            if content.len() as u64 > budget {
                return Err(CodecError::TooLarge {
                    limit: max_unpacked,
                });
            }
            unpacked += content.len() as u64;
        }

        entries.push(ArchiveEntry {
            path,
            data: content,
            is_dir,
            unix_mode,
        });

        if !observer(i + 1, total) {
            return Err(CodecError::Interrupted);
        }
    }

    if !entries.iter().any(|e| e.is_manifest()) {
        return Err(CodecError::MissingManifest);
    }

    debug!("Read {} ZIP entries ({} bytes unpacked)", entries.len(), unpacked);
    Ok(entries)
}

/// Write entries into a new ZIP archive
///
/// The manifest entry keeps its position but its content is replaced by
/// `manifest`; if the entry list has no manifest one is appended.
pub(crate) fn write_entries(
    entries: &[ArchiveEntry],
    manifest: &[u8],
    observer: &mut EntryObserver<'_>,
) -> CodecResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let total = entries.len();
    let mut wrote_manifest = false;

    for (i, entry) in entries.iter().enumerate() {
        let mut options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        if let Some(mode) = entry.unix_mode {
            options = options.unix_permissions(mode & 0o7777);
        }

        if entry.is_dir {
            writer
                .add_directory(entry.path.as_str(), options)
                .map_err(|e| CodecError::Write(format!("{}: {}", entry.path, e)))?;
        } else if entry.is_manifest() {
            if !wrote_manifest {
                write_file(&mut writer, MANIFEST_PATH, manifest, options)?;
                wrote_manifest = true;
            }
        } else {
            write_file(&mut writer, &entry.path, &entry.data, options)?;
        }

        if !observer(i + 1, total) {
            return Err(CodecError::Interrupted);
        }
    }

    if !wrote_manifest {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        write_file(&mut writer, MANIFEST_PATH, manifest, options)?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| CodecError::Write(format!("failed to finish ZIP body: {}", e)))?;
    Ok(cursor.into_inner())
}

fn write_file(
    writer: &mut ZipWriter<Cursor<Vec<u8>>>,
    path: &str,
    data: &[u8],
    options: SimpleFileOptions,
) -> CodecResult<()> {
    writer
        .start_file(path, options)
        .map_err(|e| CodecError::Write(format!("{}: {}", path, e)))?;
    writer
        .write_all(data)
        .map_err(|e| CodecError::Write(format!("{}: {}", path, e)))
}
