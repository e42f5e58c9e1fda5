//! package.json parser

use crate::error::{Document, Error, Result};
use crate::types::{DependencyType, PackageIdentity};
use serde::Deserialize;
use std::collections::BTreeMap;

/// The parts of package.json the analysis needs
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Manifest {
    /// Application name
    #[serde(default)]
    pub name: String,

    /// Application version
    #[serde(default)]
    pub version: String,

    /// Runtime dependencies with their constraints
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Development dependencies with their constraints
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, String>,
}

impl Manifest {
    /// Parse package.json text
    ///
    /// # Errors
    /// Returns [`Error::InvalidJson`] if the text is not a JSON object of the
    /// expected shape
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::json(Document::Manifest, e))
    }

    /// Identity of the application root described by this manifest
    pub fn root_identity(&self) -> PackageIdentity {
        PackageIdentity::root(&self.name, &self.version)
    }

    /// Whether any runtime or development dependency is declared
    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty() || !self.dev_dependencies.is_empty()
    }

    /// Fail with [`Error::EmptyDependencies`] when nothing is declared
    pub fn ensure_dependencies(&self) -> Result<()> {
        if self.has_dependencies() {
            Ok(())
        } else {
            Err(Error::EmptyDependencies {
                package: self.root_identity().label(),
            })
        }
    }

    /// Declared dependencies of one section
    pub fn dependencies_of_type(&self, dep_type: DependencyType) -> &BTreeMap<String, String> {
        match dep_type {
            DependencyType::Runtime => &self.dependencies,
            DependencyType::Development => &self.dev_dependencies,
        }
    }
}
