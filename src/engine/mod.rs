// src/engine/mod.rs

//! Conversion engine
//!
//! Drives one job at a time through a fixed pipeline:
//!
//! ```text
//! Idle -> Validating -> Reading -> Translating -> Writing -> Succeeded
//!              |            |            |            |
//!              +------------+------------+------------+---> Failed
//! ```
//!
//! The pipeline is synchronous. Progress is reported as a percentage that
//! never decreases within a job, and each progress point is also where a
//! pending cancellation is observed. A cancelled job is discarded and the
//! engine returns to `Idle`.
//!
//! The engine does not touch the history ledger; callers record terminal
//! jobs themselves (see [`crate::history::HistoryEntry::from_job`]).

mod job;

pub use job::{ConversionJob, ConversionOutcome, EngineState};

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::codec::{codec_for, CodecError, CodecOptions};
use crate::config::ConverterConfig;
use crate::error::{Error, ErrorKind};
use crate::manifest::{
    ManifestDocument, ManifestError, ManifestTranslator, Translation, TranslationWarning,
    TranslatorOptions, WarningKind,
};
use crate::package::{PackageValidator, ValidationError, DEFAULT_SIZE_LIMIT};
use crate::progress::ProgressTracker;

const PROGRESS_VALIDATING: u64 = 0;
const PROGRESS_READING: u64 = 10;
const PROGRESS_TRANSLATING: u64 = 40;
const PROGRESS_TRANSLATED: u64 = 55;
const PROGRESS_WRITING: u64 = 60;
const PROGRESS_WRITTEN: u64 = 95;
const PROGRESS_DONE: u64 = 100;

/// Cooperative cancellation flag shared with the engine
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the running job
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Largest accepted input package in bytes
    pub size_limit: u64,
    /// Confirm declared suffixes against magic bytes
    pub verify_content: bool,
    pub codec: CodecOptions,
    pub translator: TranslatorOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            size_limit: DEFAULT_SIZE_LIMIT,
            verify_content: true,
            codec: CodecOptions::default(),
            translator: TranslatorOptions::default(),
        }
    }
}

impl From<&ConverterConfig> for EngineOptions {
    fn from(config: &ConverterConfig) -> Self {
        Self {
            size_limit: config.limits.max_package_size,
            verify_content: config.validation.verify_content,
            codec: config.codec_options(),
            translator: config.translator_options(),
        }
    }
}

/// Why the pipeline stopped early
enum Halt {
    Cancelled,
    Failed { kind: ErrorKind, message: String },
}

impl From<Error> for Halt {
    fn from(err: Error) -> Self {
        match err {
            Error::Codec(CodecError::Interrupted) => Halt::Cancelled,
            other => Halt::Failed {
                kind: other.kind(),
                message: other.to_string(),
            },
        }
    }
}

impl From<ValidationError> for Halt {
    fn from(err: ValidationError) -> Self {
        Error::from(err).into()
    }
}

impl From<CodecError> for Halt {
    fn from(err: CodecError) -> Self {
        Error::from(err).into()
    }
}

impl From<ManifestError> for Halt {
    fn from(err: ManifestError) -> Self {
        Error::from(err).into()
    }
}

/// Forwards clamped progress to the caller's tracker
struct Reporter<'a> {
    sink: &'a dyn ProgressTracker,
    cancel: CancelHandle,
    position: u64,
}

impl<'a> Reporter<'a> {
    fn new(sink: &'a dyn ProgressTracker, cancel: CancelHandle) -> Self {
        sink.set_length(PROGRESS_DONE);
        Self {
            sink,
            cancel,
            position: 0,
        }
    }

    /// Report a phase boundary; fails if cancellation is pending
    fn phase(&mut self, state: EngineState, position: u64) -> Result<(), Halt> {
        self.checkpoint(position)?;
        self.sink.set_message(&state.to_string());
        Ok(())
    }

    fn checkpoint(&mut self, position: u64) -> Result<(), Halt> {
        if self.cancel.is_cancelled() {
            return Err(Halt::Cancelled);
        }
        self.emit(position);
        Ok(())
    }

    fn emit(&mut self, position: u64) {
        self.position = position.min(PROGRESS_DONE).max(self.position);
        self.sink.set_position(self.position);
    }

    /// Per-entry progress between two boundaries; `false` once cancelled
    fn entry(&mut self, start: u64, end: u64, done: usize, total: usize) -> bool {
        if total > 0 {
            let position = start + (end - start) * done as u64 / total as u64;
            if position > self.position {
                self.position = position;
                self.sink.set_position(position);
            }
        }
        !self.cancel.is_cancelled()
    }
}

/// Runs conversion jobs
pub struct ConversionEngine {
    options: EngineOptions,
    validator: PackageValidator,
    translator: ManifestTranslator,
    state: EngineState,
    job: Option<ConversionJob>,
    cancel: CancelHandle,
}

impl Default for ConversionEngine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

impl ConversionEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            validator: PackageValidator::new().with_content_verification(options.verify_content),
            translator: ManifestTranslator::new(options.translator.clone()),
            options,
            state: EngineState::Idle,
            job: None,
            cancel: CancelHandle::new(),
        }
    }

    /// Create an engine from a loaded configuration
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(EngineOptions::from(config))
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The current (terminal) job, if any
    pub fn job(&self) -> Option<&ConversionJob> {
        self.job.as_ref()
    }

    /// Take ownership of the current job, returning the engine to `Idle`
    pub fn take_job(&mut self) -> Option<ConversionJob> {
        self.state = EngineState::Idle;
        self.job.take()
    }

    /// Handle for cancelling the running job from a progress sink or another thread
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Discard the current job and return to `Idle`
    pub fn reset(&mut self) {
        if self.job.is_some() {
            debug!("Discarding previous conversion job");
        }
        self.job = None;
        self.state = EngineState::Idle;
    }

    /// Convert a package held in memory
    ///
    /// Returns the terminal outcome, or `None` if the job was cancelled.
    pub fn submit(
        &mut self,
        raw_bytes: Vec<u8>,
        declared_name: &str,
        progress: &dyn ProgressTracker,
    ) -> Option<&ConversionOutcome> {
        self.reset();
        self.cancel.clear();
        info!("Converting {} ({} bytes)", declared_name, raw_bytes.len());

        let mut job = ConversionJob::new(declared_name);
        let mut reporter = Reporter::new(progress, self.cancel.clone());
        let result = self.run(&mut job, raw_bytes, &mut reporter);

        let outcome = match result {
            Ok(outcome) => {
                self.state = EngineState::Succeeded;
                reporter.emit(PROGRESS_DONE);
                let artifact = outcome.artifact_name().unwrap_or_default();
                info!(
                    "Converted {} -> {} with {} warning(s)",
                    declared_name,
                    artifact,
                    outcome.warnings().len()
                );
                progress.finish_with_message(&format!("Wrote {}", artifact));
                outcome
            }
            Err(Halt::Failed { kind, message }) => {
                self.state = EngineState::Failed;
                warn!("Conversion of {} failed ({}): {}", declared_name, kind, message);
                progress.finish_with_error(&message);
                ConversionOutcome::Failure {
                    error_kind: kind,
                    message,
                }
            }
            Err(Halt::Cancelled) => {
                info!("Conversion of {} cancelled", declared_name);
                progress.finish_with_error("Conversion cancelled");
                self.reset();
                return None;
            }
        };

        job.progress = reporter.position;
        job.outcome = Some(outcome);
        self.job = Some(job);
        self.job.as_ref().and_then(ConversionJob::outcome)
    }

    /// Convert a package file
    ///
    /// The declared name is the file name component of `path`. Read errors
    /// produce an `IoFailure` job; files over the size limit are rejected
    /// before their content is loaded.
    pub fn submit_path(
        &mut self,
        path: &Path,
        progress: &dyn ProgressTracker,
    ) -> Option<&ConversionOutcome> {
        let declared_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let read = std::fs::metadata(path).and_then(|meta| {
            if meta.len() > self.options.size_limit {
                Ok(Err(ValidationError::TooLarge {
                    size: meta.len(),
                    limit: self.options.size_limit,
                }))
            } else {
                std::fs::read(path).map(Ok)
            }
        });

        match read {
            Ok(Ok(bytes)) => self.submit(bytes, &declared_name, progress),
            Ok(Err(err)) => self.fail_early(&declared_name, err.kind(), err.to_string(), progress),
            Err(err) => self.fail_early(
                &declared_name,
                ErrorKind::IoFailure,
                format!("Failed to read {}: {}", path.display(), err),
                progress,
            ),
        }
    }

    /// Record a job that failed before its bytes reached the pipeline
    fn fail_early(
        &mut self,
        declared_name: &str,
        kind: ErrorKind,
        message: String,
        progress: &dyn ProgressTracker,
    ) -> Option<&ConversionOutcome> {
        self.reset();
        warn!("Conversion of {} failed ({}): {}", declared_name, kind, message);
        progress.set_length(PROGRESS_DONE);
        progress.set_position(PROGRESS_VALIDATING);
        progress.finish_with_error(&message);

        let mut job = ConversionJob::new(declared_name);
        job.outcome = Some(ConversionOutcome::Failure {
            error_kind: kind,
            message,
        });
        self.state = EngineState::Failed;
        self.job = Some(job);
        self.job.as_ref().and_then(ConversionJob::outcome)
    }

    fn enter(
        &mut self,
        state: EngineState,
        reporter: &mut Reporter<'_>,
        position: u64,
    ) -> Result<(), Halt> {
        reporter.phase(state, position)?;
        debug!("Engine state: {} -> {}", self.state, state);
        self.state = state;
        Ok(())
    }

    fn run(
        &mut self,
        job: &mut ConversionJob,
        raw_bytes: Vec<u8>,
        reporter: &mut Reporter<'_>,
    ) -> Result<ConversionOutcome, Halt> {
        self.enter(EngineState::Validating, reporter, PROGRESS_VALIDATING)?;
        let package =
            self.validator
                .validate(raw_bytes, job.declared_name(), self.options.size_limit)?;
        let package = &*job.source.insert(package);

        self.enter(EngineState::Reading, reporter, PROGRESS_READING)?;
        let source_codec = codec_for(package.kind(), &self.options.codec);
        let contents = source_codec.read_observed(package.bytes(), &mut |done, total| {
            reporter.entry(PROGRESS_READING, PROGRESS_TRANSLATING, done, total)
        })?;
        debug!(
            "Read {} entries ({} bytes unpacked) from {}",
            contents.entries.len(),
            contents.unpacked_size(),
            package.declared_name()
        );

        self.enter(EngineState::Translating, reporter, PROGRESS_TRANSLATING)?;
        let manifest_bytes = contents
            .manifest_bytes()
            .ok_or(CodecError::MissingManifest)?;
        let manifest = ManifestDocument::parse(manifest_bytes)?;
        reporter.checkpoint(PROGRESS_TRANSLATED)?;

        let Translation {
            manifest,
            mut warnings,
        } = self
            .translator
            .translate(manifest, package.kind(), package.target_kind());

        let signatures = contents.signature_material();
        if !signatures.is_empty() {
            let mut message = format!(
                "the converted package is unsigned and must be signed for {} before release",
                package.target_kind()
            );
            if contents.signature_entries().next().is_some() {
                message.push_str(
                    "; the stale signature files are copied unchanged and must be replaced when re-signing",
                );
            }
            warnings.push(TranslationWarning::new(
                WarningKind::SignatureInvalidated,
                signatures.join(", "),
                message,
            ));
        }
        for warning in &warnings {
            debug!("{}", warning);
        }

        self.enter(EngineState::Writing, reporter, PROGRESS_WRITING)?;
        let target_codec = codec_for(package.target_kind(), &self.options.codec);
        let artifact_bytes =
            target_codec.write_observed(&contents.entries, &manifest, &mut |done, total| {
                reporter.entry(PROGRESS_WRITING, PROGRESS_WRITTEN, done, total)
            })?;

        Ok(ConversionOutcome::Success {
            artifact_bytes,
            artifact_name: package.artifact_name(),
            target_kind: package.target_kind(),
            warnings,
        })
    }
}
