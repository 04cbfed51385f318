// src/commands/convert.rs
//! Convert command: one package in, one converted package out

use anyhow::{Context, Result};
use extconv::hash;
use extconv::{
    CliProgress, ConversionEngine, ConversionOutcome, ConverterConfig, ErrorKind, HistoryEntry,
    HistoryStore, LogProgress, ProgressTracker, SilentProgress, WarningKind,
};
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::format_bytes;

/// Options for the convert command
pub struct ConvertOptions<'a> {
    pub input: &'a Path,
    /// Directory for the artifact (default: the input's directory)
    pub output_dir: Option<&'a Path>,
    /// History store to record into (`None` disables recording)
    pub history: Option<&'a HistoryStore>,
    /// Hide the progress bar
    pub quiet: bool,
}

/// Convert a package file and write the artifact next to it
pub fn cmd_convert(options: ConvertOptions<'_>, config: &ConverterConfig) -> Result<()> {
    let input = options.input;
    let label = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());

    let progress = progress_for(&label, options.quiet, std::io::stderr().is_terminal());

    let mut engine = ConversionEngine::from_config(config);
    if engine.submit_path(input, progress.as_ref()).is_none() {
        anyhow::bail!("Conversion of {} was cancelled", label);
    }
    let Some(job) = engine.take_job() else {
        anyhow::bail!("Conversion of {} produced no result", label);
    };

    let outcome = job.outcome().cloned();
    let mut entry = HistoryEntry::from_job(&job);

    let result = match outcome {
        Some(ConversionOutcome::Success {
            artifact_bytes,
            artifact_name,
            target_kind,
            warnings,
        }) => {
            let dir = output_directory(input, options.output_dir);
            let path = dir.join(&artifact_name);
            match write_artifact(&dir, &path, &artifact_bytes) {
                Ok(()) => {
                    println!(
                        "Converted {} -> {} ({})",
                        label,
                        path.display(),
                        target_kind
                    );
                    println!(
                        "  size: {}  sha256: {}",
                        format_bytes(artifact_bytes.len() as u64),
                        hash::sha256(&artifact_bytes)
                    );

                    if !warnings.is_empty() {
                        println!();
                        println!("Warnings ({}):", warnings.len());
                        for warning in &warnings {
                            println!("  {}", warning);
                        }
                    }
                    if !warnings
                        .iter()
                        .any(|w| w.kind == WarningKind::SignatureInvalidated)
                    {
                        println!();
                        println!(
                            "Note: {} is unsigned; sign it before installing in a release {} build.",
                            artifact_name, target_kind
                        );
                    }
                    Ok(())
                }
                Err(e) => {
                    entry = Some(HistoryEntry::failure(
                        job.declared_name(),
                        job.source_kind(),
                        ErrorKind::IoFailure,
                        format!("{:#}", e),
                    ));
                    Err(e)
                }
            }
        }
        Some(ConversionOutcome::Failure {
            error_kind,
            message,
        }) => Err(anyhow::anyhow!("Conversion failed ({}): {}", error_kind, message)),
        None => Err(anyhow::anyhow!("Conversion of {} did not finish", label)),
    };

    if let (Some(store), Some(entry)) = (options.history, entry) {
        if let Err(e) = record(store, entry, config.history.max_entries) {
            warn!("Failed to record conversion history: {:#}", e);
        }
    }

    result
}

/// Bar on a terminal, log lines when stderr is redirected
fn progress_for(label: &str, quiet: bool, interactive: bool) -> Box<dyn ProgressTracker> {
    if quiet {
        Box::new(SilentProgress::new())
    } else if interactive {
        Box::new(CliProgress::new(label))
    } else {
        Box::new(LogProgress::new(label))
    }
}

fn output_directory(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        },
    }
}

fn write_artifact(dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Prepend an entry to the stored ledger, applying the retention cap
fn record(store: &HistoryStore, entry: HistoryEntry, max_entries: Option<usize>) -> Result<()> {
    let mut ledger = store.load()?;
    ledger.record(entry);
    if let Some(max) = max_entries {
        let dropped = ledger.truncate(max);
        if dropped > 0 {
            info!("Dropped {} old history entries", dropped);
        }
    }
    store.save(&ledger)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use extconv::{ArchiveEntry, ChromeCodec, ContainerCodec, ManifestDocument};

    fn sample_crx() -> Vec<u8> {
        let manifest = ManifestDocument::parse(
            br#"{"manifest_version": 3, "name": "Demo", "version": "1.0",
                 "background": {"service_worker": "bg.js"}}"#,
        )
        .unwrap();
        let entries = vec![
            ArchiveEntry::file("manifest.json", Vec::new()),
            ArchiveEntry::file("bg.js", b"// worker".to_vec()),
        ];
        ChromeCodec::default().write(&entries, &manifest).unwrap()
    }

    fn options<'a>(input: &'a Path, out: &'a Path, store: &'a HistoryStore) -> ConvertOptions<'a> {
        ConvertOptions {
            input,
            output_dir: Some(out),
            history: Some(store),
            quiet: true,
        }
    }

    #[test]
    fn test_convert_writes_artifact_and_records_history() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("demo.crx");
        fs::write(&input, sample_crx()).unwrap();
        let out = dir.path().join("out");
        let store = HistoryStore::new(dir.path().join("history.json"));

        cmd_convert(options(&input, &out, &store), &ConverterConfig::default()).unwrap();

        assert!(out.join("demo_converted.xpi").exists());
        let ledger = store.load().unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(ledger.entries()[0].is_success());
        assert_eq!(ledger.entries()[0].artifact_name(), Some("demo_converted.xpi"));
    }

    #[test]
    fn test_convert_failure_is_recorded_and_returned() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.txt");
        fs::write(&input, b"hello").unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        let err = cmd_convert(
            options(&input, dir.path(), &store),
            &ConverterConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unsupported_format"));

        let ledger = store.load().unwrap();
        assert_eq!(ledger.entries()[0].error_kind(), Some(ErrorKind::UnsupportedFormat));
    }

    #[test]
    fn test_history_retention_cap() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("demo.crx");
        fs::write(&input, sample_crx()).unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        let mut config = ConverterConfig::default();
        config.history.max_entries = Some(2);

        for _ in 0..3 {
            cmd_convert(options(&input, dir.path(), &store), &config).unwrap();
        }
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[test]
    fn test_redirected_stderr_gets_log_progress() {
        let progress = progress_for("demo.crx", false, false);
        progress.set_position(40);
        assert_eq!(progress.position(), 40);
        progress.finish_with_message("done");
        assert!(progress.is_finished());

        let quiet = progress_for("demo.crx", true, false);
        quiet.set_position(40);
        quiet.finish_with_message("done");
        assert!(quiet.is_finished());
    }

    #[test]
    fn test_output_directory_defaults_to_input_parent() {
        assert_eq!(
            output_directory(Path::new("/tmp/a/ext.crx"), None),
            PathBuf::from("/tmp/a")
        );
        assert_eq!(output_directory(Path::new("ext.crx"), None), PathBuf::from("."));
    }
}
