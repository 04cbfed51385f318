// src/error.rs

//! Error taxonomy for the conversion pipeline
//!
//! Each layer (validator, codec, manifest, config, history store) has its
//! own error enum. Every pipeline error maps onto one [`ErrorKind`], which
//! is what a failed job and its history entry carry.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::codec::CodecError;
use crate::config::ConfigError;
use crate::history::StoreError;
use crate::manifest::ManifestError;
use crate::package::ValidationError;

/// Flat classification of terminal job failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input exceeds the configured size limit
    TooLarge,
    /// File suffix is neither `crx` nor `xpi`
    UnsupportedFormat,
    /// Declared suffix disagrees with the sniffed content
    FormatMismatch,
    /// Archive structure or manifest could not be read
    CorruptArchive,
    /// No `manifest.json` entry in the archive
    MissingManifest,
    /// Reading the underlying bytes failed
    IoFailure,
}

impl ErrorKind {
    /// Stable identifier used in logs and the history store
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TooLarge => "too_large",
            Self::UnsupportedFormat => "unsupported_format",
            Self::FormatMismatch => "format_mismatch",
            Self::CorruptArchive => "corrupt_archive",
            Self::MissingManifest => "missing_manifest",
            Self::IoFailure => "io_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Crate-level error
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify this error for outcomes and history entries
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(e) => e.kind(),
            Self::Codec(e) => e.kind(),
            Self::Manifest(_) => ErrorKind::CorruptArchive,
            Self::Config(_) | Self::Store(_) | Self::Io(_) => ErrorKind::IoFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_identifiers() {
        assert_eq!(ErrorKind::TooLarge.as_str(), "too_large");
        assert_eq!(ErrorKind::MissingManifest.to_string(), "missing_manifest");
        let json = serde_json::to_string(&ErrorKind::FormatMismatch).unwrap();
        assert_eq!(json, "\"format_mismatch\"");
    }

    #[test]
    fn test_crate_error_kind_delegates() {
        let err: Error = ValidationError::UnsupportedFormat {
            name: "bar.txt".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);

        let err: Error = CodecError::MissingManifest.into();
        assert_eq!(err.kind(), ErrorKind::MissingManifest);

        let err: Error = std::io::Error::other("boom").into();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }
}
