use crate::errors::DetectorError;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LabelEntry {
    pub id: u32,
    pub name: String,
}

/// Class names in `.names` file order; the line index is the class id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelCatalog {
    entries: Vec<LabelEntry>,
}

impl LabelCatalog {
    pub fn load(labels_path: &Path) -> Result<Self, DetectorError> {
        let text =
            fs::read_to_string(labels_path).map_err(|e| DetectorError::io(labels_path, e))?;

        let catalog = Self::parse(&text);
        if catalog.is_empty() {
            return Err(DetectorError::MalformedLabels {
                path: labels_path.to_path_buf(),
            });
        }

        tracing::debug!(
            path = %labels_path.display(),
            classes = catalog.len(),
            "Loaded label catalog"
        );
        Ok(catalog)
    }

    /// One label per non-blank line. Duplicate names keep distinct ids.
    pub fn parse(text: &str) -> Self {
        let entries = text
            .trim()
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(id, name)| LabelEntry {
                id: id as u32,
                name: name.to_string(),
            })
            .collect();

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&LabelEntry> {
        self.entries.get(id as usize)
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.get(id).map(|entry| entry.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelEntry> {
        self.entries.iter()
    }
}

/// Serialized as `{"0": {"id": 0, "name": "person"}, ...}` in id order.
impl Serialize for LabelCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.id.to_string(), entry)?;
        }
        map.end()
    }
}
