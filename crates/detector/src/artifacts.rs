use crate::errors::DetectorError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// The three files a Darknet detector is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Labels,
    Weights,
    Config,
}

impl ArtifactKind {
    /// Resolution checks run in this order; the first failure is reported.
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Labels,
        ArtifactKind::Weights,
        ArtifactKind::Config,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Labels => ".names",
            ArtifactKind::Weights => ".weights",
            ArtifactKind::Config => ".cfg",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Labels => "labels",
            ArtifactKind::Weights => "weights",
            ArtifactKind::Config => "config",
        }
    }

    pub fn classify(file_name: &str) -> Option<ArtifactKind> {
        Self::ALL
            .into_iter()
            .find(|kind| file_name.ends_with(kind.extension()))
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Paths of a validated artifact triad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    labels_path: PathBuf,
    weights_path: PathBuf,
    config_path: PathBuf,
}

impl ArtifactSet {
    /// Scan `directory` (non-recursively) for exactly one file of each kind.
    pub fn resolve(directory: &Path) -> Result<Self, DetectorError> {
        let entries = fs::read_dir(directory).map_err(|e| DetectorError::io(directory, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DetectorError::io(directory, e))?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_owned());
            } else {
                tracing::debug!(file = ?entry.file_name(), "Skipping non UTF-8 file name");
            }
        }
        names.sort();

        let mut found: [Vec<PathBuf>; 3] = Default::default();
        for name in &names {
            if let Some(kind) = ArtifactKind::classify(name) {
                tracing::debug!(file = %name, kind = %kind, "Classified artifact");
                found[kind as usize].push(directory.join(name));
            }
        }

        let [labels, weights, config] = found;
        let labels_path = Self::exactly_one(ArtifactKind::Labels, labels, directory)?;
        let weights_path = Self::exactly_one(ArtifactKind::Weights, weights, directory)?;
        let config_path = Self::exactly_one(ArtifactKind::Config, config, directory)?;

        tracing::info!(
            directory = %directory.display(),
            labels = %labels_path.display(),
            weights = %weights_path.display(),
            config = %config_path.display(),
            "Resolved model artifacts"
        );

        Ok(Self {
            labels_path,
            weights_path,
            config_path,
        })
    }

    fn exactly_one(
        kind: ArtifactKind,
        mut matches: Vec<PathBuf>,
        directory: &Path,
    ) -> Result<PathBuf, DetectorError> {
        match matches.len() {
            0 => Err(DetectorError::InvalidArtifact {
                kind,
                directory: directory.to_path_buf(),
            }),
            1 => Ok(matches.remove(0)),
            count => Err(DetectorError::DuplicateArtifact {
                kind,
                count,
                directory: directory.to_path_buf(),
            }),
        }
    }

    pub fn labels_path(&self) -> &Path {
        &self.labels_path
    }

    pub fn weights_path(&self) -> &Path {
        &self.weights_path
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn path(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::Labels => &self.labels_path,
            ArtifactKind::Weights => &self.weights_path,
            ArtifactKind::Config => &self.config_path,
        }
    }
}
