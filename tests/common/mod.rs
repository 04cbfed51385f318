// tests/common/mod.rs

//! Shared fixture builders for integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Manifest of a typical MV3 Chrome extension
pub const CHROME_MANIFEST: &str = r#"{
  "manifest_version": 3,
  "name": "Tab Notes",
  "version": "1.4.2",
  "description": "Attach notes to open tabs",
  "background": { "service_worker": "background.js" },
  "action": { "default_popup": "popup.html" },
  "permissions": ["tabs", "storage", "tabGroups"],
  "host_permissions": ["https://*.example.com/*"],
  "update_url": "https://clients2.google.com/service/update2/crx"
}"#;

/// Manifest of a typical MV2 Firefox add-on
pub const FIREFOX_MANIFEST: &str = r#"{
  "manifest_version": 2,
  "name": "Reader Mode Plus",
  "version": "3.0",
  "description": "Cleaner reading",
  "background": { "scripts": ["bg.js"] },
  "permissions": ["menus", "storage", "<all_urls>"],
  "browser_specific_settings": { "gecko": { "id": "reader@example.org" } }
}"#;

/// Build a deflated ZIP archive from `(path, data)` pairs.
///
/// Paths ending in `/` become directory entries.
pub fn zip_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (path, data) in entries {
        if path.ends_with('/') {
            writer.add_directory(*path, options).unwrap();
        } else {
            writer.start_file(*path, options).unwrap();
            writer.write_all(data).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// Extension files shared by the fixtures (manifest supplied separately)
pub fn extension_entries<'a>(manifest: &'a str) -> Vec<(&'a str, &'a [u8])> {
    vec![
        ("manifest.json", manifest.as_bytes()),
        ("background.js", &b"chrome.runtime.onInstalled.addListener(() => {});"[..]),
        ("popup.html", &b"<!doctype html><title>Notes</title>"[..]),
        ("icons/", &b""[..]),
        ("icons/icon48.png", &[0x89, b'P', b'N', b'G', 0, 1, 2, 3][..]),
    ]
}

fn varint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

fn len_field(field: u64, payload: &[u8], out: &mut Vec<u8>) {
    varint((field << 3) | 2, out);
    varint(payload.len() as u64, out);
    out.extend_from_slice(payload);
}

/// A CRX3 package whose header carries an RSA proof and a crx id
pub fn signed_crx3(body: &[u8], crx_id: [u8; 16]) -> Vec<u8> {
    let mut proof = Vec::new();
    len_field(1, b"fake-public-key", &mut proof);
    len_field(2, b"fake-signature", &mut proof);

    let mut signed_data = Vec::new();
    len_field(1, &crx_id, &mut signed_data);

    let mut header = Vec::new();
    len_field(2, &proof, &mut header);
    len_field(10000, &signed_data, &mut header);

    let mut out = b"Cr24".to_vec();
    out.extend_from_slice(&3u32.to_le_bytes());
    out.extend_from_slice(&(header.len() as u32).to_le_bytes());
    out.extend_from_slice(&header);
    out.extend_from_slice(body);
    out
}

/// A CRX2 package with an explicit public key and signature
pub fn crx2(body: &[u8], public_key: &[u8], signature: &[u8]) -> Vec<u8> {
    let mut out = b"Cr24".to_vec();
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(public_key.len() as u32).to_le_bytes());
    out.extend_from_slice(&(signature.len() as u32).to_le_bytes());
    out.extend_from_slice(public_key);
    out.extend_from_slice(signature);
    out.extend_from_slice(body);
    out
}

/// The Chrome fixture as a signed CRX3
pub fn chrome_package() -> Vec<u8> {
    let body = zip_archive(&extension_entries(CHROME_MANIFEST));
    signed_crx3(&body, [0x01; 16])
}

/// The Firefox fixture as an XPI, including AMO signature files
pub fn firefox_package() -> Vec<u8> {
    let mut entries = extension_entries(FIREFOX_MANIFEST);
    entries.push(("bg.js", &b"browser.menus.create({id: 'read'});"[..]));
    entries.push(("META-INF/", &b""[..]));
    entries.push(("META-INF/mozilla.rsa", &b"pkcs7"[..]));
    entries.push(("META-INF/manifest.mf", &b"Manifest-Version: 1.0"[..]));
    zip_archive(&entries)
}
