// src/codec/xpi.rs

//! Firefox XPI container (a plain ZIP archive)

use tracing::debug;

use super::{
    zip_body, ArchiveContents, ArchiveEntry, CodecError, CodecOptions, CodecResult,
    ContainerCodec, EntryObserver, ZIP_LOCAL_HEADER_MAGIC,
};
use crate::manifest::ManifestDocument;
use crate::package::ContainerKind;

/// Codec for Firefox `.xpi` packages
#[derive(Debug, Clone, Default)]
pub struct FirefoxCodec {
    options: CodecOptions,
}

impl FirefoxCodec {
    pub fn new(options: CodecOptions) -> Self {
        Self { options }
    }
}

impl ContainerCodec for FirefoxCodec {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Firefox
    }

    fn read_observed(
        &self,
        bytes: &[u8],
        observer: &mut EntryObserver<'_>,
    ) -> CodecResult<ArchiveContents> {
        // The ZIP reader tolerates prepended data; an XPI must start at the archive
        if !bytes.starts_with(ZIP_LOCAL_HEADER_MAGIC) {
            return Err(CodecError::Corrupt(
                "XPI does not start with a ZIP local file header".to_string(),
            ));
        }

        let entries = zip_body::read_entries(bytes, self.options.max_unpacked_size, observer)?;
        debug!("Read XPI with {} entries", entries.len());
        Ok(ArchiveContents {
            entries,
            header: None,
        })
    }

    fn write_observed(
        &self,
        entries: &[ArchiveEntry],
        manifest: &ManifestDocument,
        observer: &mut EntryObserver<'_>,
    ) -> CodecResult<Vec<u8>> {
        let manifest_bytes = manifest
            .to_bytes()
            .map_err(|e| CodecError::Write(e.to_string()))?;
        zip_body::write_entries(entries, &manifest_bytes, observer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ChromeCodec;

    fn manifest() -> ManifestDocument {
        ManifestDocument::parse(br#"{"manifest_version": 3, "name": "Demo", "version": "1.0"}"#)
            .unwrap()
    }

    fn entries() -> Vec<ArchiveEntry> {
        vec![
            ArchiveEntry::file("manifest.json", b"{}".to_vec()),
            ArchiveEntry::file("content.js", b"alert(1)".to_vec()),
        ]
    }

    #[test]
    fn test_write_then_read() {
        let codec = FirefoxCodec::default();
        let bytes = codec.write(&entries(), &manifest()).unwrap();
        assert!(bytes.starts_with(ZIP_LOCAL_HEADER_MAGIC));

        let contents = codec.read(&bytes).unwrap();
        assert!(contents.header.is_none());
        assert_eq!(contents.entries.len(), 2);
        assert_eq!(contents.entries[1].data, b"alert(1)");

        let parsed = ManifestDocument::parse(contents.manifest_bytes().unwrap()).unwrap();
        assert_eq!(parsed, manifest());
    }

    #[test]
    fn test_rejects_crx_input() {
        let crx = ChromeCodec::default().write(&entries(), &manifest()).unwrap();
        let err = FirefoxCodec::default().read(&crx).unwrap_err();
        assert!(matches!(err, CodecError::Corrupt(_)));
    }

    #[test]
    fn test_chrome_output_carries_unsigned_v3_header() {
        let crx = ChromeCodec::default().write(&entries(), &manifest()).unwrap();
        let contents = ChromeCodec::default().read(&crx).unwrap();
        let header = contents.header.unwrap();
        assert_eq!(header.version().as_u32(), 3);
        assert!(!header.is_signed());
        assert!(header.extension_id().is_some());
        assert_eq!(contents.entries[1].path, "content.js");
    }
}
