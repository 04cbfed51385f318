// src/package/validator.rs

//! Input package validation
//!
//! Checks run in a fixed order: size limit, declared suffix, then (unless
//! disabled) the container magic bytes. The validator never touches the
//! filesystem; it is a pure function of its inputs.

use std::io::Cursor;
use thiserror::Error;
use tracing::debug;

use super::{ContainerKind, Package};
use crate::codec::crx::{CrxHeader, CRX_MAGIC};
use crate::codec::{LEGACY_INSTALL_MANIFEST, MANIFEST_PATH, ZIP_LOCAL_HEADER_MAGIC};
use crate::error::ErrorKind;

/// Errors raised while validating an input package
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("File size exceeds the maximum limit of {} ({size} bytes)", describe_limit(.limit))]
    TooLarge { size: u64, limit: u64 },

    #[error("Invalid file format for '{name}'. Only .crx and .xpi files are supported")]
    UnsupportedFormat { name: String },

    #[error("'{name}' is named as a {declared} extension but {reason}")]
    FormatMismatch {
        name: String,
        declared: ContainerKind,
        reason: String,
    },
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TooLarge { .. } => ErrorKind::TooLarge,
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::FormatMismatch { .. } => ErrorKind::FormatMismatch,
        }
    }
}

/// Whole megabytes where possible, bytes for sub-megabyte limits
fn describe_limit(limit: &u64) -> String {
    const MB: u64 = 1024 * 1024;
    if *limit >= MB {
        format!("{}MB", limit / MB)
    } else {
        format!("{} bytes", limit)
    }
}

/// Detect the container kind from magic bytes
///
/// - CRX: `43 72 32 34` ("Cr24")
/// - XPI: `50 4b 03 04` (ZIP local file header)
pub fn sniff_container(data: &[u8]) -> Option<ContainerKind> {
    if data.starts_with(CRX_MAGIC) {
        Some(ContainerKind::Chrome)
    } else if data.starts_with(ZIP_LOCAL_HEADER_MAGIC) {
        Some(ContainerKind::Firefox)
    } else {
        None
    }
}

/// Validates untrusted input before a conversion job starts
#[derive(Debug, Clone)]
pub struct PackageValidator {
    verify_content: bool,
}

impl Default for PackageValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageValidator {
    /// Create a validator that confirms container identity from content
    pub fn new() -> Self {
        Self {
            verify_content: true,
        }
    }

    /// Enable or disable magic-byte confirmation
    pub fn with_content_verification(mut self, enabled: bool) -> Self {
        self.verify_content = enabled;
        self
    }

    /// Whether magic-byte confirmation is enabled
    pub fn verifies_content(&self) -> bool {
        self.verify_content
    }

    /// Validate raw bytes and a declared name against a size limit
    pub fn validate(
        &self,
        raw_bytes: Vec<u8>,
        declared_name: &str,
        size_limit: u64,
    ) -> Result<Package, ValidationError> {
        let size = raw_bytes.len() as u64;
        if size > size_limit {
            return Err(ValidationError::TooLarge {
                size,
                limit: size_limit,
            });
        }

        let kind = ContainerKind::from_file_name(declared_name).ok_or_else(|| {
            ValidationError::UnsupportedFormat {
                name: declared_name.to_string(),
            }
        })?;

        if self.verify_content {
            confirm_content(&raw_bytes, declared_name, kind)?;
        }

        debug!("Validated {} as {} package ({} bytes)", declared_name, kind, size);
        Ok(Package::new(raw_bytes, declared_name, kind))
    }
}

/// Validate with content verification enabled
pub fn validate(
    raw_bytes: Vec<u8>,
    declared_name: &str,
    size_limit: u64,
) -> Result<Package, ValidationError> {
    PackageValidator::new().validate(raw_bytes, declared_name, size_limit)
}

fn confirm_content(
    data: &[u8],
    declared_name: &str,
    declared: ContainerKind,
) -> Result<(), ValidationError> {
    let mismatch = |reason: String| ValidationError::FormatMismatch {
        name: declared_name.to_string(),
        declared,
        reason,
    };

    if data.len() < 4 {
        return Err(mismatch(format!("the file is only {} bytes long", data.len())));
    }

    match (declared, sniff_container(data)) {
        (ContainerKind::Chrome, Some(ContainerKind::Chrome)) => {
            CrxHeader::parse(data)
                .map_err(|e| mismatch(format!("its CRX header is invalid: {}", e)))?;
            Ok(())
        }
        (ContainerKind::Firefox, Some(ContainerKind::Firefox)) => {
            // An unreadable central directory is left for the codec to report
            if let Ok(archive) = zip::ZipArchive::new(Cursor::new(data)) {
                let has_manifest = archive
                    .file_names()
                    .any(|name| name == MANIFEST_PATH || name == LEGACY_INSTALL_MANIFEST);
                if !has_manifest {
                    return Err(mismatch(
                        "the ZIP archive contains neither manifest.json nor install.rdf"
                            .to_string(),
                    ));
                }
            }
            Ok(())
        }
        (_, Some(actual)) => Err(mismatch(format!("its content is a {} package", actual))),
        (_, None) => Err(mismatch("its content has no recognizable container header".to_string())),
    }
}
