use crate::errors::DetectorError;
use rustc_hash::FxHasher;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::hash::Hasher;
use std::path::Path;

/// Stable key identifying a registered artifact directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DetectorIdentity(String);

impl DetectorIdentity {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DetectorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps an artifact directory to a key registries can deduplicate on.
pub trait IdentityKeyDeriver {
    fn derive_key(&self, directory: &Path) -> Result<DetectorIdentity, DetectorError>;
}

impl<F> IdentityKeyDeriver for F
where
    F: Fn(&Path) -> Result<DetectorIdentity, DetectorError>,
{
    fn derive_key(&self, directory: &Path) -> Result<DetectorIdentity, DetectorError> {
        self(directory)
    }
}

/// Hashes the canonical directory path together with the name and size of
/// every regular file in it, visited in name order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryFingerprint;

impl IdentityKeyDeriver for DirectoryFingerprint {
    fn derive_key(&self, directory: &Path) -> Result<DetectorIdentity, DetectorError> {
        let canonical = directory
            .canonicalize()
            .map_err(|e| DetectorError::io(directory, e))?;

        let mut files = Vec::new();
        for entry in fs::read_dir(&canonical).map_err(|e| DetectorError::io(&canonical, e))? {
            let entry = entry.map_err(|e| DetectorError::io(&canonical, e))?;
            let metadata = entry
                .metadata()
                .map_err(|e| DetectorError::io(entry.path(), e))?;
            if metadata.is_file() {
                files.push((entry.file_name(), metadata.len()));
            }
        }
        files.sort();

        let mut hasher = FxHasher::default();
        hasher.write(canonical.as_os_str().as_encoded_bytes());
        for (name, len) in &files {
            hasher.write(name.as_encoded_bytes());
            hasher.write_u8(0);
            hasher.write_u64(*len);
        }

        Ok(DetectorIdentity(format!("{:016x}", hasher.finish())))
    }
}
