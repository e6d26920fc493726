use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Ecosystem {
    Node,
}

impl std::fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ecosystem::Node => write!(f, "Node"),
        }
    }
}

/// A resolved package. `location` is the fetch URL or path when the source
/// recorded one, empty otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PackageIdentity {
    pub ecosystem: Ecosystem,
    pub name: String,
    pub version: String,
    pub location: String,
}

impl std::fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// "The parent asked for `requested` and got `resolved`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportEdge {
    pub requested: String,
    pub resolved: PackageIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPackage {
    pub id: PackageIdentity,
    pub imports: Vec<ImportEdge>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyGraph {
    pub direct: Vec<ImportEdge>,
    #[serde(serialize_with = "serialize_packages")]
    pub transitive: BTreeMap<PackageIdentity, ResolvedPackage>,
}

#[cfg(test)]
impl DependencyGraph {
    /// Look up a package by name and version, ignoring location.
    pub fn find(&self, name: &str, version: &str) -> Option<&ResolvedPackage> {
        self.transitive
            .values()
            .find(|p| p.id.name == name && p.id.version == version)
    }
}

// JSON object keys must be strings, so the map is written as a list.
fn serialize_packages<S>(
    packages: &BTreeMap<PackageIdentity, ResolvedPackage>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(packages.values())
}

/// One project directory to analyze.
#[derive(Debug, Clone, Serialize)]
pub struct Module {
    pub name: String,
    pub dir: PathBuf,
    pub ecosystem: Ecosystem,
}
