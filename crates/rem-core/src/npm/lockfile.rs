//! package-lock.json parser (nested v1 layout)

use crate::error::{Document, Error, Result};
use crate::types::PackageIdentity;
use serde::Deserialize;
use std::collections::BTreeMap;

/// A package-lock.json document.
///
/// Only the nested `dependencies` tree of lockfile v1 is read. Version 2
/// files carry the same tree next to their flat `packages` map and work
/// unchanged; version 3 files drop it and are rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct Lockfile {
    /// Application name
    #[serde(default)]
    pub name: String,

    /// Application version
    #[serde(default)]
    pub version: String,

    /// Lockfile format version
    #[serde(default, rename = "lockfileVersion")]
    pub lockfile_version: Option<u32>,

    /// Top-level installs
    #[serde(default)]
    pub dependencies: Option<BTreeMap<String, LockedEntry>>,
}

/// One installed package in the nested tree
#[derive(Debug, Clone, Deserialize)]
pub struct LockedEntry {
    /// Exact installed version
    pub version: String,

    /// Requirements of this package, name to constraint
    #[serde(default)]
    pub requires: BTreeMap<String, String>,

    /// Packages installed in this package's own `node_modules`
    #[serde(default)]
    pub dependencies: BTreeMap<String, LockedEntry>,

    /// Installed only for development
    #[serde(default)]
    pub dev: bool,

    /// Installed as an optional dependency
    #[serde(default)]
    pub optional: bool,

    /// Resolved tarball URL
    pub resolved: Option<String>,

    /// Integrity hash
    pub integrity: Option<String>,
}

impl Lockfile {
    /// Parse package-lock.json text
    ///
    /// # Errors
    /// Returns [`Error::InvalidJson`] for malformed JSON and
    /// [`Error::InvalidInput`] when the document has no v1 `dependencies` tree
    pub fn from_json(content: &str) -> Result<Self> {
        let lock: Lockfile =
            serde_json::from_str(content).map_err(|e| Error::json(Document::Lockfile, e))?;

        if lock.dependencies.is_none() {
            let layout = match lock.lockfile_version {
                Some(v) => format!("lockfileVersion {}", v),
                None => "unknown layout".to_string(),
            };
            return Err(Error::input(
                Document::Lockfile,
                format!(
                    "no nested `dependencies` tree ({}); only the package-lock v1 layout is supported",
                    layout
                ),
            ));
        }

        Ok(lock)
    }

    /// Identity of the application root described by this lockfile
    pub fn root_identity(&self) -> PackageIdentity {
        PackageIdentity::root(&self.name, &self.version)
    }

    /// Top-level installs, empty when the tree is absent
    pub fn top_level(&self) -> impl Iterator<Item = (&String, &LockedEntry)> {
        self.dependencies.iter().flatten()
    }
}
