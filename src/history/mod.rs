// src/history/mod.rs

//! Conversion history
//!
//! [`HistoryLedger`] is an in-memory, newest-first list of immutable
//! [`HistoryEntry`] records. It has no size cap; retention is a caller
//! policy. [`HistoryStore`] persists a ledger as JSON between CLI runs.

mod store;

pub use store::{default_history_path, HistoryStore, StoreError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{ConversionJob, ConversionOutcome};
use crate::error::ErrorKind;
use crate::package::ContainerKind;

/// Record of one finished conversion attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    id: Uuid,
    timestamp: DateTime<Utc>,
    original_name: String,
    source_kind: Option<ContainerKind>,
    target_kind: Option<ContainerKind>,
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    artifact_name: Option<String>,
    #[serde(default)]
    warning_count: usize,
}

impl HistoryEntry {
    /// Entry for a successful conversion
    pub fn success(
        original_name: impl Into<String>,
        source_kind: ContainerKind,
        artifact_name: impl Into<String>,
        warning_count: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            original_name: original_name.into(),
            source_kind: Some(source_kind),
            target_kind: Some(source_kind.target()),
            success: true,
            error_kind: None,
            error: None,
            artifact_name: Some(artifact_name.into()),
            warning_count,
        }
    }

    /// Entry for a failed conversion
    ///
    /// `source_kind` is `None` when the input's kind could not be determined.
    pub fn failure(
        original_name: impl Into<String>,
        source_kind: Option<ContainerKind>,
        error_kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            original_name: original_name.into(),
            source_kind,
            target_kind: source_kind.map(|kind| kind.target()),
            success: false,
            error_kind: Some(error_kind),
            error: Some(message.into()),
            artifact_name: None,
            warning_count: 0,
        }
    }

    /// Entry for a terminal job (`None` if the job has no outcome)
    pub fn from_job(job: &ConversionJob) -> Option<Self> {
        let entry = match job.outcome()? {
            ConversionOutcome::Success {
                artifact_name,
                target_kind,
                warnings,
                ..
            } => Self {
                id: Uuid::new_v4(),
                timestamp: Utc::now(),
                original_name: job.declared_name().to_string(),
                source_kind: Some(target_kind.target()),
                target_kind: Some(*target_kind),
                success: true,
                error_kind: None,
                error: None,
                artifact_name: Some(artifact_name.clone()),
                warning_count: warnings.len(),
            },
            ConversionOutcome::Failure {
                error_kind,
                message,
            } => Self::failure(
                job.declared_name(),
                job.source_kind(),
                *error_kind,
                message.clone(),
            ),
        };
        Some(entry)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn source_kind(&self) -> Option<ContainerKind> {
        self.source_kind
    }

    pub fn target_kind(&self) -> Option<ContainerKind> {
        self.target_kind
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_kind
    }

    /// Failure message, verbatim
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn artifact_name(&self) -> Option<&str> {
        self.artifact_name.as_deref()
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }
}

/// Newest-first conversion history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from entries already ordered newest first
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    /// Prepend an entry
    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry);
    }

    /// Remove the entry with `id`, if present
    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries, newest first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, id: Uuid) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Entries whose id starts with a (hex) prefix
    pub fn find_by_prefix(&self, prefix: &str) -> Vec<&HistoryEntry> {
        let prefix = prefix.to_ascii_lowercase();
        self.entries
            .iter()
            .filter(|e| e.id.to_string().starts_with(&prefix))
            .collect()
    }

    /// Drop all but the newest `max` entries, returning how many were removed
    pub fn truncate(&mut self, max: usize) -> usize {
        let removed = self.entries.len().saturating_sub(max);
        self.entries.truncate(max);
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<HistoryEntry> {
        self.entries
    }
}
