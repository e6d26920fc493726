//! Installed-tree source: read `node_modules/**/package.json` directly.
//!
//! Requirements are looked up the way Node's `require()` does: the requiring
//! package's own `node_modules` first, then the `node_modules` of each ancestor
//! directory. No range checking is done; the first installed copy wins.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use super::manifest::Manifest;
use crate::error::SourceError;
use crate::tree::TreeNode;

/// Directory-walk adapter entry point.
pub fn tree(dir: &Path, manifest: &Manifest) -> Result<TreeNode, SourceError> {
    let requirements = manifest.root_requirements();
    let mut root = manifest.root_node();
    if requirements.is_empty() {
        return Ok(root);
    }

    let store = dir.join("node_modules");
    if !store.is_dir() {
        return Err(SourceError::NotPresent {
            what: store.display().to_string(),
        });
    }

    let base = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
    let mut walker = Walker {
        expanded: HashSet::new(),
    };
    root.children = requirements
        .iter()
        .map(|r| walker.node(&r.name, &r.range, &base, r.dev))
        .collect::<Result<_, _>>()?;
    Ok(root)
}

struct Walker {
    expanded: HashSet<(PathBuf, bool)>,
}

impl Walker {
    fn node(&mut self, name: &str, range: &str, from: &Path, dev: bool) -> Result<TreeNode, SourceError> {
        let Some(package_dir) = locate(from, name) else {
            return Ok(TreeNode::unmet(name, range, dev));
        };
        let manifest = Manifest::read(&package_dir.join("package.json"))?;

        let mut node = TreeNode {
            name: name.to_string(),
            specifier: range.to_string(),
            version: manifest.version_or_empty().to_string(),
            location: manifest.resolved.clone().unwrap_or_default(),
            dev,
            ..Default::default()
        };

        if !self.expanded.insert((package_dir.clone(), dev)) {
            node.duplicate = true;
            return Ok(node);
        }

        node.children = manifest
            .package_requirements()
            .iter()
            .map(|r| self.node(&r.name, &r.range, &package_dir, dev))
            .collect::<Result<_, _>>()?;
        Ok(node)
    }
}

/// Find the installed directory `name` resolves to from `from`.
fn locate(from: &Path, name: &str) -> Option<PathBuf> {
    from.ancestors()
        .filter(|dir| dir.file_name() != Some(OsStr::new("node_modules")))
        .map(|dir| dir.join("node_modules").join(name))
        .find(|candidate| candidate.join("package.json").is_file())
        .map(|found| std::fs::canonicalize(&found).unwrap_or(found))
}
