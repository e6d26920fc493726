use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::SourceError;
use crate::tree::TreeNode;

/// The parts of a `package.json` the resolver cares about.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: Option<String>,
    pub version: Option<String>,
    /// Written by npm <= 6 into installed manifests.
    #[serde(rename = "_resolved")]
    pub resolved: Option<String>,
    pub dependencies: Option<BTreeMap<String, String>>,
    pub dev_dependencies: Option<BTreeMap<String, String>>,
    pub optional_dependencies: Option<BTreeMap<String, String>>,
    pub peer_dependencies: Option<BTreeMap<String, String>>,
}

/// A declared requirement: package name, range as written, and whether it was
/// declared as a development dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub range: String,
    pub dev: bool,
}

impl Manifest {
    pub fn parse(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Read an installed package's manifest.
    pub fn read(path: &Path) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Manifest::parse(&content).map_err(|e| SourceError::parse(path.display(), e))
    }

    /// Requirements of the project itself: runtime, dev and optional sections.
    pub fn root_requirements(&self) -> Vec<Requirement> {
        let mut requirements = Vec::new();
        push_section(&mut requirements, self.dependencies.as_ref(), false);
        push_section(&mut requirements, self.dev_dependencies.as_ref(), true);
        push_section(&mut requirements, self.optional_dependencies.as_ref(), false);
        requirements
    }

    /// Requirements of an installed package: runtime, optional and peer sections.
    pub fn package_requirements(&self) -> Vec<Requirement> {
        let mut requirements = Vec::new();
        push_section(&mut requirements, self.dependencies.as_ref(), false);
        push_section(&mut requirements, self.optional_dependencies.as_ref(), false);
        push_section(&mut requirements, self.peer_dependencies.as_ref(), false);
        requirements
    }

    pub fn name_or_default(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn version_or_empty(&self) -> &str {
        self.version.as_deref().unwrap_or_default()
    }

    /// A childless tree node standing for the project itself.
    pub fn root_node(&self) -> TreeNode {
        TreeNode::root(self.name_or_default(), self.version_or_empty())
    }
}

// Earlier sections win when a name is declared twice.
fn push_section(
    requirements: &mut Vec<Requirement>,
    section: Option<&BTreeMap<String, String>>,
    dev: bool,
) {
    for (name, range) in section.into_iter().flatten() {
        if requirements.iter().any(|r| &r.name == name) {
            continue;
        }
        requirements.push(Requirement {
            name: name.clone(),
            range: range.clone(),
            dev,
        });
    }
}
