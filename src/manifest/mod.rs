// src/manifest/mod.rs

//! WebExtension manifest handling
//!
//! [`ManifestDocument`] wraps the parsed `manifest.json` object and keeps
//! key order, so a translated manifest stays readable next to its source.
//! [`ManifestTranslator`] rewrites a manifest for the other browser and
//! reports everything it could not carry over as [`TranslationWarning`]s.

mod document;
pub mod permissions;
mod translate;

pub use document::{ManifestDocument, ManifestError};
pub use translate::{
    synthesize_gecko_id, ManifestTranslator, Translation, TranslationWarning, TranslatorOptions,
    WarningKind,
};
