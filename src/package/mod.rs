// src/package/mod.rs

//! Extension packages and their container kinds
//!
//! A [`Package`] is the validated, immutable input of a conversion job:
//! the raw bytes as supplied by the caller, the declared file name and the
//! container kind derived from that name's suffix.

mod validator;

pub use validator::{validate, sniff_container, PackageValidator, ValidationError};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default size limit for input packages (50 MiB)
pub const DEFAULT_SIZE_LIMIT: u64 = 50 * 1024 * 1024;

/// Browser container kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    /// Chrome `.crx` (Cr24 header + ZIP body)
    Chrome,
    /// Firefox `.xpi` (plain ZIP)
    Firefox,
}

impl ContainerKind {
    /// Detect container kind from a file suffix (case-insensitive, no dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "crx" => Some(Self::Chrome),
            "xpi" => Some(Self::Firefox),
            _ => None,
        }
    }

    /// Detect container kind from the suffix of a file name
    pub fn from_file_name(name: &str) -> Option<Self> {
        name.rsplit_once('.')
            .and_then(|(_, ext)| Self::from_extension(ext))
    }

    /// File suffix for this container kind
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Chrome => "crx",
            Self::Firefox => "xpi",
        }
    }

    /// The kind a package of this kind converts into
    pub fn target(&self) -> Self {
        match self {
            Self::Chrome => Self::Firefox,
            Self::Firefox => Self::Chrome,
        }
    }

    /// Human-readable browser name
    pub fn browser_name(&self) -> &'static str {
        match self {
            Self::Chrome => "Chrome",
            Self::Firefox => "Firefox",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.browser_name())
    }
}

impl FromStr for ContainerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chrome" | "crx" => Ok(Self::Chrome),
            "firefox" | "xpi" => Ok(Self::Firefox),
            _ => Err(format!("Unknown container kind: {}", s)),
        }
    }
}

/// A validated extension package
#[derive(Debug, Clone)]
pub struct Package {
    bytes: Vec<u8>,
    declared_name: String,
    kind: ContainerKind,
}

impl Package {
    pub(crate) fn new(bytes: Vec<u8>, declared_name: &str, kind: ContainerKind) -> Self {
        Self {
            bytes,
            declared_name: declared_name.to_string(),
            kind,
        }
    }

    /// Raw package bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// File name as supplied by the caller
    pub fn declared_name(&self) -> &str {
        &self.declared_name
    }

    /// Size of the package in bytes
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Container kind derived from the declared suffix
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// Kind this package converts into
    pub fn target_kind(&self) -> ContainerKind {
        self.kind.target()
    }

    /// File name for the converted artifact: `<stem>_converted.<ext>`
    pub fn artifact_name(&self) -> String {
        converted_file_name(&self.declared_name, self.kind.target())
    }
}

/// Build `<stem>_converted.<ext>` from a declared name
///
/// Directory components are discarded; the stem is everything up to the
/// last `.` of the file name.
pub fn converted_file_name(declared_name: &str, target: ContainerKind) -> String {
    let file_name = declared_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(declared_name);
    let stem = match file_name.rfind('.') {
        Some(pos) => &file_name[..pos],
        None => file_name,
    };
    format!("{}_converted.{}", stem, target.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(ContainerKind::from_extension("crx"), Some(ContainerKind::Chrome));
        assert_eq!(ContainerKind::from_extension("XPI"), Some(ContainerKind::Firefox));
        assert_eq!(ContainerKind::from_extension("zip"), None);
        assert_eq!(ContainerKind::from_file_name("foo.CrX"), Some(ContainerKind::Chrome));
        assert_eq!(ContainerKind::from_file_name("crx"), None);
    }

    #[test]
    fn test_kind_target_is_other_kind() {
        assert_eq!(ContainerKind::Chrome.target(), ContainerKind::Firefox);
        assert_eq!(ContainerKind::Firefox.target(), ContainerKind::Chrome);
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("firefox".parse::<ContainerKind>().unwrap(), ContainerKind::Firefox);
        assert_eq!("CRX".parse::<ContainerKind>().unwrap(), ContainerKind::Chrome);
        assert!("safari".parse::<ContainerKind>().is_err());
    }

    #[test]
    fn test_converted_file_name() {
        assert_eq!(
            converted_file_name("foo.crx", ContainerKind::Firefox),
            "foo_converted.xpi"
        );
        assert_eq!(
            converted_file_name("my.addon.xpi", ContainerKind::Chrome),
            "my.addon_converted.crx"
        );
        assert_eq!(
            converted_file_name("/tmp/downloads/ext.crx", ContainerKind::Firefox),
            "ext_converted.xpi"
        );
    }

    #[test]
    fn test_package_accessors() {
        let pkg = Package::new(vec![1, 2, 3], "bar.xpi", ContainerKind::Firefox);
        assert_eq!(pkg.len(), 3);
        assert!(!pkg.is_empty());
        assert_eq!(pkg.target_kind(), ContainerKind::Chrome);
        assert_eq!(pkg.artifact_name(), "bar_converted.crx");
    }
}
