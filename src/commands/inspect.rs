// src/commands/inspect.rs
//! Inspect command: show a package's container, header and manifest

use anyhow::{Context, Result};
use extconv::hash;
use extconv::{codec_for, ConverterConfig, ManifestDocument, PackageValidator};
use std::fs;
use std::path::Path;

use super::format_bytes;

/// Print a summary of a package without converting it
pub fn cmd_inspect(input: &Path, config: &ConverterConfig) -> Result<()> {
    let bytes = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());
    let digest = hash::sha256(&bytes);

    let package = PackageValidator::new()
        .with_content_verification(config.validation.verify_content)
        .validate(bytes, &name, config.limits.max_package_size)?;
    let contents = codec_for(package.kind(), &config.codec_options()).read(package.bytes())?;

    println!("Package: {}", package.declared_name());
    println!("  Container: {} (.{})", package.kind(), package.kind().extension());
    println!("  Size: {}", format_bytes(package.len()));
    println!("  SHA-256: {}", digest);

    if let Some(header) = &contents.header {
        println!("  CRX version: {}", header.version());
        println!("  Signed: {}", if header.is_signed() { "yes" } else { "no" });
        if let Some(id) = header.extension_id() {
            println!("  Extension ID: {}", id);
        }
    }

    println!(
        "  Entries: {} ({} unpacked)",
        contents.entries.len(),
        format_bytes(contents.unpacked_size())
    );

    let signatures = contents.signature_material();
    if !signatures.is_empty() {
        println!("  Signature material: {}", signatures.join(", "));
    }

    match contents.manifest_bytes() {
        Some(raw) => match ManifestDocument::parse(raw) {
            Ok(manifest) => print_manifest(&manifest),
            Err(e) => println!("  Manifest: unreadable ({})", e),
        },
        None => println!("  Manifest: missing"),
    }

    Ok(())
}

fn print_manifest(manifest: &ManifestDocument) {
    println!();
    println!("Manifest:");
    println!("  Name: {}", manifest.name().unwrap_or("(unnamed)"));
    println!("  Version: {}", manifest.version().unwrap_or("(none)"));
    if let Some(mv) = manifest.manifest_version() {
        println!("  Manifest version: {}", mv);
    }
    if let Some(description) = manifest.description() {
        println!("  Description: {}", description);
    }

    let permissions: Vec<String> = manifest
        .string_list("permissions")
        .into_iter()
        .filter(|p| !extconv::manifest::permissions::is_host_pattern(p))
        .collect();
    if !permissions.is_empty() {
        println!("  Permissions: {}", permissions.join(", "));
    }
    let hosts = manifest.host_patterns();
    if !hosts.is_empty() {
        println!("  Host patterns: {}", hosts.join(", "));
    }
}
