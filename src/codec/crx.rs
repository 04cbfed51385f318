// src/codec/crx.rs

//! Chrome CRX container
//!
//! Layout:
//! - magic `Cr24`
//! - u32 LE format version (2 or 3)
//! - CRX2: u32 LE public key length, u32 LE signature length, key, signature
//! - CRX3: u32 LE header length, `CrxFileHeader` protobuf
//! - ZIP body
//!
//! Only the parts of `CrxFileHeader` needed here are decoded: the proof
//! fields (2 = RSA, 3 = ECDSA) to tell whether the package is signed, and
//! `signed_header_data` (10000) for the embedded crx id.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::{
    zip_body, ArchiveContents, ArchiveEntry, CodecError, CodecOptions, CodecResult,
    ContainerCodec, EntryObserver,
};
use crate::hash;
use crate::manifest::ManifestDocument;
use crate::package::ContainerKind;

/// CRX magic number
pub const CRX_MAGIC: &[u8; 4] = b"Cr24";

/// Fixed prefix: magic + version
const PREFIX_LEN: usize = 8;

/// Upper bound on any header length field
const MAX_HEADER_FIELD: u32 = 16 * 1024 * 1024;

const FIELD_RSA_PROOF: u64 = 2;
const FIELD_ECDSA_PROOF: u64 = 3;
const FIELD_SIGNED_HEADER_DATA: u64 = 10000;
const FIELD_CRX_ID: u64 = 1;

const WIRE_VARINT: u64 = 0;
const WIRE_FIXED64: u64 = 1;
const WIRE_LEN: u64 = 2;
const WIRE_FIXED32: u64 = 5;

/// CRX format version for written packages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum CrxVersion {
    V2,
    V3,
}

impl CrxVersion {
    pub fn as_u32(&self) -> u32 {
        match self {
            Self::V2 => 2,
            Self::V3 => 3,
        }
    }
}

impl TryFrom<u32> for CrxVersion {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Self::V2),
            3 => Ok(Self::V3),
            other => Err(format!("unsupported CRX version {} (expected 2 or 3)", other)),
        }
    }
}

impl From<CrxVersion> for u32 {
    fn from(version: CrxVersion) -> Self {
        version.as_u32()
    }
}

impl fmt::Display for CrxVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CRX{}", self.as_u32())
    }
}

/// Parsed CRX header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrxHeader {
    version: CrxVersion,
    /// CRX2 public key (DER SubjectPublicKeyInfo)
    public_key: Vec<u8>,
    /// CRX2 signature
    signature: Vec<u8>,
    /// CRX3 raw `CrxFileHeader` bytes
    file_header: Vec<u8>,
    /// CRX3 has at least one key proof
    has_proofs: bool,
    crx_id: Option<[u8; 16]>,
    body_offset: usize,
}

impl CrxHeader {
    /// Parse the header at the start of a CRX package
    pub fn parse(data: &[u8]) -> CodecResult<Self> {
        if data.len() < PREFIX_LEN {
            return Err(CodecError::Corrupt(format!(
                "CRX header truncated ({} bytes)",
                data.len()
            )));
        }
        if &data[..4] != CRX_MAGIC {
            return Err(CodecError::Corrupt("missing Cr24 magic".to_string()));
        }

        let version = read_u32(data, 4)?;
        match version {
            2 => Self::parse_v2(data),
            3 => Self::parse_v3(data),
            other => Err(CodecError::Corrupt(format!(
                "unsupported CRX version {}",
                other
            ))),
        }
    }

    fn parse_v2(data: &[u8]) -> CodecResult<Self> {
        let key_len = read_len(data, 8)?;
        let sig_len = read_len(data, 12)?;
        let key_start = 16;
        let sig_start = key_start + key_len;
        let body_offset = sig_start + sig_len;
        if data.len() < body_offset {
            return Err(CodecError::Corrupt(format!(
                "CRX2 header declares {} bytes but package has {}",
                body_offset,
                data.len()
            )));
        }

        let public_key = data[key_start..sig_start].to_vec();
        let crx_id = if public_key.is_empty() {
            None
        } else {
            Some(crx_id_from_digest(&public_key))
        };

        Ok(Self {
            version: CrxVersion::V2,
            signature: data[sig_start..body_offset].to_vec(),
            public_key,
            file_header: Vec::new(),
            has_proofs: false,
            crx_id,
            body_offset,
        })
    }

    fn parse_v3(data: &[u8]) -> CodecResult<Self> {
        let header_len = read_len(data, 8)?;
        let header_start = 12;
        let body_offset = header_start + header_len;
        if data.len() < body_offset {
            return Err(CodecError::Corrupt(format!(
                "CRX3 header declares {} bytes but package has {}",
                body_offset,
                data.len()
            )));
        }

        let file_header = data[header_start..body_offset].to_vec();
        let mut has_proofs = false;
        let mut crx_id = None;

        for field in ProtoFields::new(&file_header) {
            let (number, payload) = field?;
            match number {
                FIELD_RSA_PROOF | FIELD_ECDSA_PROOF => has_proofs = true,
                FIELD_SIGNED_HEADER_DATA => {
                    if let Some(signed) = payload {
                        crx_id = signed_data_crx_id(signed)?;
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            version: CrxVersion::V3,
            public_key: Vec::new(),
            signature: Vec::new(),
            file_header,
            has_proofs,
            crx_id,
            body_offset,
        })
    }

    /// Build an unsigned header for a written package
    pub fn unsigned(version: CrxVersion, crx_id: [u8; 16]) -> Self {
        let file_header = match version {
            CrxVersion::V2 => Vec::new(),
            CrxVersion::V3 => {
                let mut signed_data = Vec::with_capacity(18);
                encode_varint((FIELD_CRX_ID << 3) | WIRE_LEN, &mut signed_data);
                encode_varint(crx_id.len() as u64, &mut signed_data);
                signed_data.extend_from_slice(&crx_id);

                let mut header = Vec::with_capacity(signed_data.len() + 4);
                encode_varint((FIELD_SIGNED_HEADER_DATA << 3) | WIRE_LEN, &mut header);
                encode_varint(signed_data.len() as u64, &mut header);
                header.extend_from_slice(&signed_data);
                header
            }
        };

        let body_offset = match version {
            CrxVersion::V2 => 16,
            CrxVersion::V3 => 12 + file_header.len(),
        };

        Self {
            version,
            public_key: Vec::new(),
            signature: Vec::new(),
            file_header,
            has_proofs: false,
            crx_id: Some(crx_id),
            body_offset,
        }
    }

    /// Serialize the header (everything before the ZIP body)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.body_offset);
        out.extend_from_slice(CRX_MAGIC);
        out.extend_from_slice(&self.version.as_u32().to_le_bytes());
        match self.version {
            CrxVersion::V2 => {
                out.extend_from_slice(&(self.public_key.len() as u32).to_le_bytes());
                out.extend_from_slice(&(self.signature.len() as u32).to_le_bytes());
                out.extend_from_slice(&self.public_key);
                out.extend_from_slice(&self.signature);
            }
            CrxVersion::V3 => {
                out.extend_from_slice(&(self.file_header.len() as u32).to_le_bytes());
                out.extend_from_slice(&self.file_header);
            }
        }
        out
    }

    pub fn version(&self) -> CrxVersion {
        self.version
    }

    /// Offset of the ZIP body within the package
    pub fn body_offset(&self) -> usize {
        self.body_offset
    }

    /// The ZIP body following this header
    pub fn body<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        data.get(self.body_offset..).unwrap_or(&[])
    }

    /// Whether the header carries a signature
    pub fn is_signed(&self) -> bool {
        match self.version {
            CrxVersion::V2 => !self.signature.is_empty(),
            CrxVersion::V3 => self.has_proofs,
        }
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// The 16-byte crx id, if the header carries or implies one
    pub fn crx_id(&self) -> Option<[u8; 16]> {
        self.crx_id
    }

    /// Chrome extension id (32 chars, `a`-`p`)
    pub fn extension_id(&self) -> Option<String> {
        self.crx_id.as_ref().map(extension_id)
    }
}

/// Derive a crx id from the first 16 bytes of a SHA-256 digest
pub fn crx_id_from_digest(data: &[u8]) -> [u8; 16] {
    let digest = hash::sha256_digest(data);
    let mut id = [0u8; 16];
    id.copy_from_slice(&digest[..16]);
    id
}

/// Render a crx id in Chrome's `a`-`p` nibble alphabet
pub fn extension_id(crx_id: &[u8; 16]) -> String {
    crx_id
        .iter()
        .flat_map(|b| [b >> 4, b & 0x0f])
        .map(|nibble| char::from(b'a' + nibble))
        .collect()
}

fn read_u32(data: &[u8], offset: usize) -> CodecResult<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| CodecError::Corrupt("CRX header truncated".to_string()))
}

fn read_len(data: &[u8], offset: usize) -> CodecResult<usize> {
    let len = read_u32(data, offset)?;
    if len > MAX_HEADER_FIELD {
        return Err(CodecError::Corrupt(format!(
            "CRX header field of {} bytes exceeds limit",
            len
        )));
    }
    Ok(len as usize)
}

fn signed_data_crx_id(signed: &[u8]) -> CodecResult<Option<[u8; 16]>> {
    for field in ProtoFields::new(signed) {
        if let (FIELD_CRX_ID, Some(value)) = field? {
            if value.len() == 16 {
                let mut id = [0u8; 16];
                id.copy_from_slice(value);
                return Ok(Some(id));
            }
        }
    }
    Ok(None)
}

fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

fn decode_varint(data: &[u8], pos: &mut usize) -> CodecResult<u64> {
    let mut value: u64 = 0;
    for shift in (0..64).step_by(7) {
        let byte = *data
            .get(*pos)
            .ok_or_else(|| CodecError::Corrupt("truncated varint in CRX header".to_string()))?;
        *pos += 1;
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(CodecError::Corrupt("overlong varint in CRX header".to_string()))
}

/// Iterator over top-level protobuf fields: `(field number, length-delimited payload)`
struct ProtoFields<'a> {
    data: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> ProtoFields<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            failed: false,
        }
    }

    fn next_field(&mut self) -> CodecResult<(u64, Option<&'a [u8]>)> {
        let key = decode_varint(self.data, &mut self.pos)?;
        let number = key >> 3;
        let payload = match key & 0x7 {
            WIRE_VARINT => {
                decode_varint(self.data, &mut self.pos)?;
                None
            }
            WIRE_FIXED64 => {
                self.skip(8)?;
                None
            }
            WIRE_LEN => {
                let len = decode_varint(self.data, &mut self.pos)? as usize;
                let start = self.pos;
                self.skip(len)?;
                Some(&self.data[start..self.pos])
            }
            WIRE_FIXED32 => {
                self.skip(4)?;
                None
            }
            other => {
                return Err(CodecError::Corrupt(format!(
                    "unsupported protobuf wire type {} in CRX header",
                    other
                )));
            }
        };
        Ok((number, payload))
    }

    fn skip(&mut self, len: usize) -> CodecResult<()> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| CodecError::Corrupt("truncated field in CRX header".to_string()))?;
        self.pos = end;
        Ok(())
    }
}

impl<'a> Iterator for ProtoFields<'a> {
    type Item = CodecResult<(u64, Option<&'a [u8]>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.data.len() {
            return None;
        }
        let field = self.next_field();
        self.failed = field.is_err();
        Some(field)
    }
}

/// Codec for Chrome `.crx` packages
#[derive(Debug, Clone, Default)]
pub struct ChromeCodec {
    options: CodecOptions,
}

impl ChromeCodec {
    pub fn new(options: CodecOptions) -> Self {
        Self { options }
    }
}

impl ContainerCodec for ChromeCodec {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Chrome
    }

    fn read_observed(
        &self,
        bytes: &[u8],
        observer: &mut EntryObserver<'_>,
    ) -> CodecResult<ArchiveContents> {
        let header = CrxHeader::parse(bytes)?;
        debug!(
            "{} header: body at offset {}, signed: {}",
            header.version(),
            header.body_offset(),
            header.is_signed()
        );

        let entries =
            zip_body::read_entries(header.body(bytes), self.options.max_unpacked_size, observer)?;
        Ok(ArchiveContents {
            entries,
            header: Some(header),
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
        let body = zip_body::write_entries(entries, &manifest_bytes, observer)?;

        // No signing key is available, so the id is derived from the manifest
        let header = CrxHeader::unsigned(self.options.crx_version, crx_id_from_digest(&manifest_bytes));
        let mut out = header.to_bytes();
        out.extend_from_slice(&body);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crx2(key: &[u8], sig: &[u8], body: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(CRX_MAGIC);
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&(key.len() as u32).to_le_bytes());
        data.extend_from_slice(&(sig.len() as u32).to_le_bytes());
        data.extend_from_slice(key);
        data.extend_from_slice(sig);
        data.extend_from_slice(body);
        data
    }

    #[test]
    fn test_signed_data_tag_encoding() {
        let mut out = Vec::new();
        encode_varint((FIELD_SIGNED_HEADER_DATA << 3) | WIRE_LEN, &mut out);
        assert_eq!(out, vec![0x82, 0xF1, 0x04]);

        let mut pos = 0;
        assert_eq!(decode_varint(&out, &mut pos).unwrap(), 80002);
        assert_eq!(pos, 3);
    }

    #[test]
    fn test_parse_v2() {
        let data = crx2(b"KEY", b"SIGNATURE", b"PK\x03\x04body");
        let header = CrxHeader::parse(&data).unwrap();
        assert_eq!(header.version(), CrxVersion::V2);
        assert_eq!(header.public_key(), b"KEY");
        assert!(header.is_signed());
        assert_eq!(header.body(&data), b"PK\x03\x04body");
        assert_eq!(header.crx_id(), Some(crx_id_from_digest(b"KEY")));
    }

    #[test]
    fn test_unsigned_v3_round_trip() {
        let id = crx_id_from_digest(b"manifest");
        let header = CrxHeader::unsigned(CrxVersion::V3, id);
        let mut data = header.to_bytes();
        assert_eq!(data.len(), header.body_offset());
        data.extend_from_slice(b"PK\x03\x04");

        let parsed = CrxHeader::parse(&data).unwrap();
        assert_eq!(parsed.version(), CrxVersion::V3);
        assert!(!parsed.is_signed());
        assert_eq!(parsed.crx_id(), Some(id));
        assert_eq!(parsed.body(&data), b"PK\x03\x04");
    }

    #[test]
    fn test_v3_with_proof_is_signed() {
        // CrxFileHeader { sha256_with_rsa: { public_key: "k" } }
        let proof = [0x0A, 0x01, b'k'];
        let mut file_header = vec![0x12, proof.len() as u8];
        file_header.extend_from_slice(&proof);

        let mut data = Vec::new();
        data.extend_from_slice(CRX_MAGIC);
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&(file_header.len() as u32).to_le_bytes());
        data.extend_from_slice(&file_header);

        let header = CrxHeader::parse(&data).unwrap();
        assert!(header.is_signed());
        assert_eq!(header.crx_id(), None);
    }

    #[test]
    fn test_parse_rejects_bad_headers() {
        assert!(CrxHeader::parse(b"Cr24").is_err());
        assert!(CrxHeader::parse(b"PK\x03\x04\x02\0\0\0").is_err());

        let mut v4 = CRX_MAGIC.to_vec();
        v4.extend_from_slice(&4u32.to_le_bytes());
        assert!(CrxHeader::parse(&v4).is_err());

        let mut truncated = CRX_MAGIC.to_vec();
        truncated.extend_from_slice(&3u32.to_le_bytes());
        truncated.extend_from_slice(&100u32.to_le_bytes());
        truncated.extend_from_slice(&[0u8; 10]);
        assert!(CrxHeader::parse(&truncated).is_err());

        // Length-delimited field running past the header end
        let mut bad_proto = CRX_MAGIC.to_vec();
        bad_proto.extend_from_slice(&3u32.to_le_bytes());
        bad_proto.extend_from_slice(&2u32.to_le_bytes());
        bad_proto.extend_from_slice(&[0x12, 0x7f]);
        assert!(CrxHeader::parse(&bad_proto).is_err());
    }

    #[test]
    fn test_extension_id_alphabet() {
        let id = [0u8; 16];
        assert_eq!(extension_id(&id), "a".repeat(32));

        let id = [0xffu8; 16];
        assert_eq!(extension_id(&id), "p".repeat(32));

        let id = crx_id_from_digest(b"anything");
        let rendered = extension_id(&id);
        assert_eq!(rendered.len(), 32);
        assert!(rendered.chars().all(|c| ('a'..='p').contains(&c)));
    }

    #[test]
    fn test_crx_version_conversion() {
        assert_eq!(CrxVersion::try_from(2).unwrap(), CrxVersion::V2);
        assert_eq!(CrxVersion::try_from(3).unwrap(), CrxVersion::V3);
        assert!(CrxVersion::try_from(4).is_err());
        assert_eq!(CrxVersion::V3.to_string(), "CRX3");
    }

    #[test]
    fn test_codec_reads_crx2_body() {
        let body = zip_body::write_entries(
            &[ArchiveEntry::file("manifest.json", b"{}".to_vec())],
            br#"{"name":"x"}"#,
            &mut |_, _| true,
        )
        .unwrap();
        let data = crx2(b"", b"", &body);

        let contents = ChromeCodec::default().read(&data).unwrap();
        assert_eq!(contents.entries.len(), 1);
        assert_eq!(contents.manifest_bytes(), Some(&br#"{"name":"x"}"#[..]));
        assert!(contents.signature_material().is_empty());
    }

    #[test]
    fn test_codec_writes_crx2_when_configured() {
        let codec = ChromeCodec::new(CodecOptions {
            crx_version: CrxVersion::V2,
            ..CodecOptions::default()
        });
        let entries = vec![
            ArchiveEntry::file("manifest.json", Vec::new()),
            ArchiveEntry::file("bg.js", b"chrome.runtime.id".to_vec()),
        ];
        let manifest = ManifestDocument::parse(br#"{"name":"Legacy","version":"1"}"#).unwrap();
        let data = codec.write(&entries, &manifest).unwrap();

        let header = CrxHeader::parse(&data).unwrap();
        assert_eq!(header.version(), CrxVersion::V2);
        assert_eq!(header.body_offset(), 16);
        assert!(!header.is_signed());
        assert!(header.body(&data).starts_with(b"PK\x03\x04"));

        let contents = codec.read(&data).unwrap();
        let paths: Vec<&str> = contents.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["manifest.json", "bg.js"]);
        assert_eq!(contents.entries[1].data, b"chrome.runtime.id");
        assert_eq!(
            ManifestDocument::parse(contents.manifest_bytes().unwrap())
                .unwrap()
                .name(),
            Some("Legacy")
        );
        assert!(contents.signature_material().is_empty());
    }
}
