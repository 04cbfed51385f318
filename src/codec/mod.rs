// src/codec/mod.rs

//! Container codecs for CRX and XPI packages
//!
//! Both formats carry a ZIP body. CRX prefixes it with a `Cr24` header
//! (signature material), XPI is the ZIP archive alone. A codec reads the
//! ordered entry list out of a package and writes a new package of its own
//! kind from an entry list plus a (translated) manifest.
//!
//! Written packages are structurally valid but unsigned: a CRX produced
//! here must be re-signed (e.g. by the Chrome Web Store or
//! `chrome --pack-extension`) and an XPI must be signed by AMO before a
//! release browser will install it.

pub mod crx;
mod xpi;
mod zip_body;

pub use crx::{ChromeCodec, CrxHeader, CrxVersion};
pub use xpi::FirefoxCodec;

use thiserror::Error;

use crate::error::ErrorKind;
use crate::manifest::ManifestDocument;
use crate::package::ContainerKind;

/// Path of the WebExtension manifest inside the archive
pub const MANIFEST_PATH: &str = "manifest.json";

/// Manifest of legacy (pre-WebExtension) Firefox add-ons
pub const LEGACY_INSTALL_MANIFEST: &str = "install.rdf";

/// ZIP local file header magic
pub const ZIP_LOCAL_HEADER_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// Default cap on the total decompressed size of an archive (512 MB)
pub const DEFAULT_MAX_UNPACKED_SIZE: u64 = 512 * 1024 * 1024;

/// Archive entries that carry signatures of the source package
const SIGNATURE_ENTRIES: &[&str] = &[
    "META-INF/mozilla.rsa",
    "META-INF/mozilla.sf",
    "META-INF/manifest.mf",
    "META-INF/cose.manifest",
    "META-INF/cose.sig",
    "_metadata/verified_contents.json",
    "_metadata/computed_hashes.json",
];

/// Errors raised by container codecs
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Corrupt archive: {0}")]
    Corrupt(String),

    #[error("Archive has no manifest.json entry")]
    MissingManifest,

    #[error("Archive unpacks to more than the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("Failed to write archive: {0}")]
    Write(String),

    #[error("Archive processing interrupted")]
    Interrupted,
}

impl CodecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Corrupt(_) => ErrorKind::CorruptArchive,
            Self::MissingManifest => ErrorKind::MissingManifest,
            Self::TooLarge { .. } => ErrorKind::TooLarge,
            Self::Write(_) | Self::Interrupted => ErrorKind::IoFailure,
        }
    }
}

/// Result type for codec operations
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Per-entry callback: `(entries_done, entries_total)`, returning `false`
/// aborts the operation with [`CodecError::Interrupted`]
pub type EntryObserver<'a> = dyn FnMut(usize, usize) -> bool + 'a;

/// A single archive entry with its content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path inside the archive, verbatim (directories end with `/`)
    pub path: String,
    pub data: Vec<u8>,
    pub is_dir: bool,
    pub unix_mode: Option<u32>,
}

impl ArchiveEntry {
    /// Create a regular file entry
    pub fn file(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
            is_dir: false,
            unix_mode: None,
        }
    }

    /// Create a directory entry
    pub fn directory(path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.ends_with('/') {
            path.push('/');
        }
        Self {
            path,
            data: Vec::new(),
            is_dir: true,
            unix_mode: None,
        }
    }

    pub fn is_manifest(&self) -> bool {
        !self.is_dir && self.path == MANIFEST_PATH
    }
}

/// Contents of a package as read by a codec
#[derive(Debug, Clone)]
pub struct ArchiveContents {
    /// Entries in archive order
    pub entries: Vec<ArchiveEntry>,
    /// Outer CRX header (Chrome packages only)
    pub header: Option<CrxHeader>,
}

impl ArchiveContents {
    /// The `manifest.json` entry
    pub fn manifest_entry(&self) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.is_manifest())
    }

    /// Raw bytes of `manifest.json`
    pub fn manifest_bytes(&self) -> Option<&[u8]> {
        self.manifest_entry().map(|e| e.data.as_slice())
    }

    /// Total size of all entry data
    pub fn unpacked_size(&self) -> u64 {
        self.entries.iter().map(|e| e.data.len() as u64).sum()
    }

    /// Describe signature material the source package carries
    ///
    /// Conversion always rewrites the manifest, so any such signature no
    /// longer matches the converted content.
    pub fn signature_material(&self) -> Vec<String> {
        let mut found = Vec::new();
        if let Some(header) = &self.header {
            if header.is_signed() {
                found.push(format!("{} header signature", header.version()));
            }
        }
        found.extend(self.signature_entries().map(|e| e.path.clone()));
        found
    }

    /// Entries holding signature files of the source package
    ///
    /// They are written to the target unchanged and no longer verify.
    pub fn signature_entries(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.entries
            .iter()
            .filter(|e| SIGNATURE_ENTRIES.contains(&e.path.as_str()))
    }
}

/// Reads and writes one container format
pub trait ContainerCodec: Send + Sync {
    /// Container kind this codec handles
    fn kind(&self) -> ContainerKind;

    /// Read entries, reporting each one to `observer`
    fn read_observed(
        &self,
        bytes: &[u8],
        observer: &mut EntryObserver<'_>,
    ) -> CodecResult<ArchiveContents>;

    /// Write a package, replacing the manifest entry with `manifest`
    fn write_observed(
        &self,
        entries: &[ArchiveEntry],
        manifest: &ManifestDocument,
        observer: &mut EntryObserver<'_>,
    ) -> CodecResult<Vec<u8>>;

    /// Read entries from a package
    fn read(&self, bytes: &[u8]) -> CodecResult<ArchiveContents> {
        self.read_observed(bytes, &mut |_, _| true)
    }

    /// Write a package from entries and a manifest
    fn write(&self, entries: &[ArchiveEntry], manifest: &ManifestDocument) -> CodecResult<Vec<u8>> {
        self.write_observed(entries, manifest, &mut |_, _| true)
    }
}

/// Options shared by both codecs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecOptions {
    /// Cap on the total decompressed size of an archive
    pub max_unpacked_size: u64,
    /// Header version for written CRX packages
    pub crx_version: CrxVersion,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            max_unpacked_size: DEFAULT_MAX_UNPACKED_SIZE,
            crx_version: CrxVersion::V3,
        }
    }
}

/// Get the codec for a container kind
pub fn codec_for(kind: ContainerKind, options: &CodecOptions) -> Box<dyn ContainerCodec> {
    match kind {
        ContainerKind::Chrome => Box::new(ChromeCodec::new(*options)),
        ContainerKind::Firefox => Box::new(FirefoxCodec::new(*options)),
    }
}
