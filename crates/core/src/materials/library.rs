//! Named material store loaded once at setup
//!
//! The on-disk layout mirrors the multi-group cross-section files used by the
//! reference inputs:
//!
//! ```json
//! {
//!   "# groups": 2,
//!   "material": {
//!     "fuel":  { "total": [..], "scatter matrix": [..], "fission": [..],
//!                "nu-fission": [..], "chi": [..] },
//!     "water": { ... }
//!   }
//! }
//! ```
//!
//! `groups` / `materials` are accepted as aliases of the two top-level keys.

use super::{CrossSections, Material};
use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
struct LibraryFile {
    #[serde(rename = "# groups", alias = "groups")]
    num_groups: usize,
    #[serde(rename = "material", alias = "materials")]
    materials: BTreeMap<String, CrossSections>,
}

/// Key-value store of materials keyed by name
///
/// All materials in a library share one group structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialLibrary {
    num_groups: Option<usize>,
    materials: BTreeMap<String, Material>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a library from its JSON representation
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        let file: LibraryFile =
            serde_json::from_str(json).map_err(|e| ConfigurationError::Load {
                source: "material library".to_string(),
                reason: e.to_string(),
            })?;

        let mut library = Self::new();
        for (name, xs) in file.materials {
            let material = Material::new(name, xs)?;
            if material.num_groups() != file.num_groups {
                return Err(ConfigurationError::InvalidMaterial {
                    name: material.name().to_string(),
                    reason: format!(
                        "has {} groups but the library declares {}",
                        material.num_groups(),
                        file.num_groups
                    ),
                });
            }
            library.insert(material)?;
        }
        library.num_groups = Some(file.num_groups);
        Ok(library)
    }

    /// Read and parse a JSON library file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Load {
            source: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let library = Self::from_json_str(&text)?;
        info!(
            "Loaded {} materials ({} groups) from {}",
            library.len(),
            library.num_groups().unwrap_or(0),
            path.display()
        );
        Ok(library)
    }

    /// Serialize the library in the on-disk layout
    pub fn to_json_string(&self) -> String {
        let file = LibraryFile {
            num_groups: self.num_groups.unwrap_or(0),
            materials: self
                .materials
                .iter()
                .map(|(name, m)| (name.clone(), m.cross_sections()))
                .collect(),
        };
        // Plain maps of f64 vectors always serialize.
        serde_json::to_string_pretty(&file).unwrap_or_default()
    }

    /// Add a material, replacing any previous entry with the same name
    pub fn insert(&mut self, material: Material) -> Result<(), ConfigurationError> {
        match self.num_groups {
            Some(g) if g != material.num_groups() => {
                return Err(ConfigurationError::InvalidMaterial {
                    name: material.name().to_string(),
                    reason: format!(
                        "has {} groups but the library holds {g}-group data",
                        material.num_groups()
                    ),
                });
            }
            _ => self.num_groups = Some(material.num_groups()),
        }
        self.materials.insert(material.name().to_string(), material);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    /// Look up a material, failing with its name when absent
    pub fn require(&self, name: &str) -> Result<&Material, ConfigurationError> {
        self.get(name).ok_or_else(|| ConfigurationError::InvalidMaterial {
            name: name.to_string(),
            reason: "not present in the material library".to_string(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.materials.keys().map(String::as_str)
    }

    pub fn num_groups(&self) -> Option<usize> {
        self.num_groups
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_GROUP: &str = r##"{
        "# groups": 2,
        "material": {
            "fuel": {
                "total": [0.2222222222, 0.8333333333],
                "scatter matrix": [0.1972222222, 0.02, 0.0, 0.7333333333],
                "fission": [0.0020833333, 0.0625],
                "nu-fission": [0.005, 0.15],
                "chi": [1.0, 0.0]
            },
            "water": {
                "total": [0.2222222222, 1.6666666667],
                "scatter matrix": [0.1972222222, 0.025, 0.0, 1.5666666667],
                "nu-fission": [0.0, 0.0],
                "chi": [0.0, 0.0]
            }
        }
    }"##;

    #[test]
    fn test_load_two_group_library() {
        let library = MaterialLibrary::from_json_str(TWO_GROUP).unwrap();
        assert_eq!(library.len(), 2);
        assert_eq!(library.num_groups(), Some(2));
        assert_eq!(library.names().collect::<Vec<_>>(), vec!["fuel", "water"]);

        let water = library.require("water").unwrap();
        assert!(!water.is_fissile());
        assert_eq!(water.sigma_f(1), 0.0);
        assert!(library.require("steel").is_err());
    }

    #[test]
    fn test_aliases_accepted() {
        let json = r#"{"groups": 1, "materials": {"m": {"total": [1.0], "scatter": [0.5], "nu_fission": [0.6], "chi": [1.0]}}}"#;
        let library = MaterialLibrary::from_json_str(json).unwrap();
        assert!(library.get("m").unwrap().is_fissile());
    }

    #[test]
    fn test_group_mismatch_rejected() {
        let mut library = MaterialLibrary::from_json_str(TWO_GROUP).unwrap();
        let one_group = Material::one_group("absorber", 1.0, 0.0, 0.0).unwrap();
        assert!(library.insert(one_group).is_err());
    }

    #[test]
    fn test_round_trip_json_layout() {
        let library = MaterialLibrary::from_json_str(TWO_GROUP).unwrap();
        let json = library.to_json_string();
        assert!(json.contains("# groups"));
        let again = MaterialLibrary::from_json_str(&json).unwrap();
        assert_eq!(again, library);
    }

    #[test]
    fn test_parse_error_is_load_error() {
        let err = MaterialLibrary::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigurationError::Load { .. }));
    }
}
