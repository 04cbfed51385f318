// src/lib.rs

//! extconv: browser extension converter
//!
//! Converts Chrome extension packages (`.crx`) into Firefox add-on packages
//! (`.xpi`) and back again.
//!
//! # Architecture
//!
//! - Package validation: size limit, suffix and magic-byte checks
//! - Container codecs: CRX2/CRX3 headers and XPI bodies over one ZIP layer
//! - Manifest translation: key, permission and background rewrites with warnings
//! - Conversion engine: one job at a time, monotonic progress, cancellation
//! - History: newest-first ledger of finished jobs, persisted as JSON

pub mod codec;
pub mod config;
pub mod engine;
mod error;
pub mod hash;
pub mod history;
pub mod manifest;
pub mod package;
pub mod progress;

pub use codec::{
    codec_for, ArchiveContents, ArchiveEntry, ChromeCodec, CodecError, CodecOptions,
    ContainerCodec, CrxHeader, CrxVersion, FirefoxCodec,
};
pub use config::{ConfigError, ConverterConfig};
pub use engine::{
    CancelHandle, ConversionEngine, ConversionJob, ConversionOutcome, EngineOptions, EngineState,
};
pub use error::{Error, ErrorKind};
pub use history::{HistoryEntry, HistoryLedger, HistoryStore, StoreError};
pub use manifest::{
    ManifestDocument, ManifestError, ManifestTranslator, Translation, TranslationWarning,
    TranslatorOptions, WarningKind,
};
pub use package::{ContainerKind, Package, PackageValidator, ValidationError, DEFAULT_SIZE_LIMIT};
pub use progress::{
    CallbackProgress, CliProgress, LogProgress, ProgressEvent, ProgressTracker, SilentProgress,
};
