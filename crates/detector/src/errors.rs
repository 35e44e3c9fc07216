use crate::artifacts::ArtifactKind;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("{kind} file (*{}) is not found in {}", .kind.extension(), .directory.display())]
    InvalidArtifact {
        kind: ArtifactKind,
        directory: PathBuf,
    },

    #[error("multiple {kind} files (*{}) found in {}: {count}", .kind.extension(), .directory.display())]
    DuplicateArtifact {
        kind: ArtifactKind,
        count: usize,
        directory: PathBuf,
    },

    #[error("malformed network config {}: {reason}", .path.display())]
    MalformedConfig { path: PathBuf, reason: String },

    #[error("label file {} contains no labels", .path.display())]
    MalformedLabels { path: PathBuf },

    #[error("backend failed to load network: {0:#}")]
    BackendLoadFailed(#[source] anyhow::Error),

    #[error("prediction failed: {0:#}")]
    PredictionFailed(#[source] anyhow::Error),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DetectorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DetectorError::Io {
            path: path.into(),
            source,
        }
    }

    /// Artifact kind the error is about, for the resolution failures.
    pub fn artifact_kind(&self) -> Option<ArtifactKind> {
        match self {
            DetectorError::InvalidArtifact { kind, .. }
            | DetectorError::DuplicateArtifact { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
