// src/engine/job.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::manifest::TranslationWarning;
use crate::package::{ContainerKind, Package};

/// Engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    Validating,
    Reading,
    Translating,
    Writing,
    Succeeded,
    Failed,
}

impl EngineState {
    /// `Succeeded` or `Failed`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Whether a job is in flight
    pub fn is_running(&self) -> bool {
        !self.is_terminal() && *self != Self::Idle
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "Idle",
            Self::Validating => "Validating",
            Self::Reading => "Reading",
            Self::Translating => "Translating",
            Self::Writing => "Writing",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
        };
        f.write_str(label)
    }
}

/// Terminal result of a conversion job
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionOutcome {
    Success {
        artifact_bytes: Vec<u8>,
        /// `<stem>_converted.<ext>`
        artifact_name: String,
        target_kind: ContainerKind,
        warnings: Vec<TranslationWarning>,
    },
    Failure {
        error_kind: ErrorKind,
        message: String,
    },
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn warnings(&self) -> &[TranslationWarning] {
        match self {
            Self::Success { warnings, .. } => warnings,
            Self::Failure { .. } => &[],
        }
    }

    pub fn artifact_name(&self) -> Option<&str> {
        match self {
            Self::Success { artifact_name, .. } => Some(artifact_name),
            Self::Failure { .. } => None,
        }
    }

    pub fn artifact_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Success { artifact_bytes, .. } => Some(artifact_bytes),
            Self::Failure { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error_kind, .. } => Some(*error_kind),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { message, .. } => Some(message),
        }
    }
}

/// One conversion attempt
#[derive(Debug, Clone)]
pub struct ConversionJob {
    id: Uuid,
    started_at: DateTime<Utc>,
    declared_name: String,
    pub(super) source: Option<Package>,
    pub(super) progress: u64,
    pub(super) outcome: Option<ConversionOutcome>,
}

impl ConversionJob {
    pub(super) fn new(declared_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            declared_name: declared_name.to_string(),
            source: None,
            progress: 0,
            outcome: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// File name as submitted
    pub fn declared_name(&self) -> &str {
        &self.declared_name
    }

    /// Validated source package (absent if validation failed)
    pub fn source(&self) -> Option<&Package> {
        self.source.as_ref()
    }

    /// Last reported progress percentage
    pub fn progress(&self) -> u64 {
        self.progress
    }

    pub fn outcome(&self) -> Option<&ConversionOutcome> {
        self.outcome.as_ref()
    }

    /// Source kind: from the validated package, else from the declared suffix
    pub fn source_kind(&self) -> Option<ContainerKind> {
        self.source
            .as_ref()
            .map(Package::kind)
            .or_else(|| ContainerKind::from_file_name(&self.declared_name))
    }

    pub fn target_kind(&self) -> Option<ContainerKind> {
        self.source_kind().map(|kind| kind.target())
    }
}
