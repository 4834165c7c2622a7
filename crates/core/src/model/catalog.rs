use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{WorkUnitId, WorkUnitIdError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("manifest is not valid: {0}")]
    InvalidManifest(String),

    #[error("duplicate work unit in catalog: {0}")]
    DuplicateUnit(String),

    #[error(transparent)]
    InvalidUnit(#[from] WorkUnitIdError),
}

/// On-disk manifest listing the work units of a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(
        rename = "lastUpdated",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_updated: Option<String>,
    pub files: Vec<String>,
}

impl Manifest {
    /// Parse a manifest document.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidManifest` if the JSON is malformed or
    /// `files` is missing or not an array of strings.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        serde_json::from_str(raw).map_err(|err| CatalogError::InvalidManifest(err.to_string()))
    }

    /// Serialize the manifest as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidManifest` if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, CatalogError> {
        serde_json::to_string_pretty(self)
            .map_err(|err| CatalogError::InvalidManifest(err.to_string()))
    }
}

/// Ordered, duplicate-free list of work units loaded for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    units: Vec<WorkUnitId>,
}

impl Catalog {
    /// Build a catalog, keeping the given order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateUnit` if an id appears twice.
    pub fn new(units: Vec<WorkUnitId>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(units.len());
        for unit in &units {
            if !seen.insert(unit.as_str()) {
                return Err(CatalogError::DuplicateUnit(unit.to_string()));
            }
        }
        Ok(Self { units })
    }

    /// Build a catalog from a parsed manifest.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if an entry is blank or duplicated.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self, CatalogError> {
        let units = manifest
            .files
            .iter()
            .map(|file| WorkUnitId::new(file.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(units)
    }

    /// Parse manifest JSON straight into a catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` for malformed JSON, blank or duplicate entries.
    pub fn from_manifest_json(raw: &str) -> Result<Self, CatalogError> {
        Self::from_manifest(&Manifest::from_json(raw)?)
    }

    #[must_use]
    pub fn units(&self) -> &[WorkUnitId] {
        &self.units
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    #[must_use]
    pub fn contains(&self, unit: &WorkUnitId) -> bool {
        self.units.contains(unit)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WorkUnitId> {
        self.units.iter()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a WorkUnitId;
    type IntoIter = std::slice::Iter<'a, WorkUnitId>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_manifest_in_order() {
        let catalog = Catalog::from_manifest_json(
            r#"{"lastUpdated":"2024-03-01T10:00:00","files":["inputs/b.csv","inputs/a.csv"]}"#,
        )
        .unwrap();

        let names: Vec<&str> = catalog.iter().map(WorkUnitId::as_str).collect();
        assert_eq!(names, vec!["inputs/b.csv", "inputs/a.csv"]);
    }

    #[test]
    fn rejects_manifest_without_files_array() {
        let err = Catalog::from_manifest_json(r#"{"files":"inputs/a.csv"}"#).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidManifest(_)));

        let err = Catalog::from_manifest_json(r#"{"lastUpdated":"x"}"#).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidManifest(_)));
    }

    #[test]
    fn rejects_duplicates_and_blank_entries() {
        let err = Catalog::from_manifest_json(r#"{"files":["a.csv","a.csv"]}"#).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateUnit("a.csv".into()));

        let err = Catalog::from_manifest_json(r#"{"files":["a.csv","  "]}"#).unwrap_err();
        assert_eq!(err, CatalogError::InvalidUnit(WorkUnitIdError::Empty));
    }

    #[test]
    fn manifest_round_trips_without_last_updated() {
        let manifest = Manifest {
            last_updated: None,
            files: vec!["inputs/a.csv".into()],
        };
        let json = manifest.to_json_pretty().unwrap();
        assert!(!json.contains("lastUpdated"));
        assert_eq!(Manifest::from_json(&json).unwrap(), manifest);
    }
}
