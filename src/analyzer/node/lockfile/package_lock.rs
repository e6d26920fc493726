//! `package-lock.json` / `npm-shrinkwrap.json`.
//!
//! Version 1 nests entries under `dependencies` and lists each entry's needs in
//! `requires`. Versions 2 and 3 keep a flat `packages` map keyed by install path
//! (`node_modules/a/node_modules/b`). Both are resolved the way Node resolves
//! `require()`: innermost install location first, then each ancestor.

use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;

use crate::analyzer::node::manifest::{Manifest, Requirement};
use crate::tree::TreeNode;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageLock {
    #[serde(default)]
    packages: BTreeMap<String, FlatEntry>,
    #[serde(default)]
    dependencies: BTreeMap<String, NestedEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NestedEntry {
    #[serde(default)]
    version: String,
    resolved: Option<String>,
    #[serde(default)]
    dev: bool,
    #[serde(default)]
    requires: BTreeMap<String, String>,
    #[serde(default)]
    dependencies: BTreeMap<String, NestedEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlatEntry {
    version: Option<String>,
    resolved: Option<String>,
    #[serde(default)]
    dev: bool,
    #[serde(default)]
    link: bool,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    peer_dependencies: BTreeMap<String, String>,
}

impl FlatEntry {
    fn requirements(&self) -> Vec<(&String, &String)> {
        let mut seen = HashSet::new();
        self.dependencies
            .iter()
            .chain(&self.optional_dependencies)
            .chain(&self.peer_dependencies)
            .filter(|(name, _)| seen.insert(*name))
            .collect()
    }
}

/// Parse a lockfile and attach it below the project's declared requirements.
pub fn tree(content: &str, manifest: &Manifest) -> serde_json::Result<TreeNode> {
    let lock: PackageLock = serde_json::from_str(content)?;
    let requirements = manifest.root_requirements();

    let mut root = manifest.root_node();
    root.children = if lock.packages.is_empty() {
        let mut reader = NestedReader {
            expanded: HashSet::new(),
        };
        let scopes = [Scope {
            path: String::new(),
            entries: &lock.dependencies,
        }];
        requirements
            .iter()
            .map(|Requirement { name, range, dev }| reader.node(name, range, *dev, &scopes))
            .collect()
    } else {
        let mut reader = FlatReader {
            packages: &lock.packages,
            expanded: HashSet::new(),
        };
        requirements
            .iter()
            .map(|Requirement { name, range, dev }| reader.node(name, range, "", *dev))
            .collect()
    };

    Ok(root)
}

#[derive(Clone)]
struct Scope<'a> {
    path: String,
    entries: &'a BTreeMap<String, NestedEntry>,
}

struct NestedReader {
    expanded: HashSet<(String, bool)>,
}

impl NestedReader {
    /// `scopes` runs from the top level (first) to the requiring entry (last).
    fn node(&mut self, name: &str, range: &str, dev: bool, scopes: &[Scope<'_>]) -> TreeNode {
        for (depth, scope) in scopes.iter().enumerate().rev() {
            let Some(entry) = scope.entries.get(name) else {
                continue;
            };

            let path = join(&scope.path, name);
            let dev = dev || entry.dev;
            let mut node = TreeNode {
                name: name.to_string(),
                specifier: range.to_string(),
                version: entry.version.clone(),
                location: entry.resolved.clone().unwrap_or_default(),
                dev,
                ..Default::default()
            };

            if !self.expanded.insert((path.clone(), dev)) {
                node.duplicate = true;
                return node;
            }

            let mut inner = scopes[..=depth].to_vec();
            inner.push(Scope {
                path,
                entries: &entry.dependencies,
            });
            node.children = entry
                .requires
                .iter()
                .map(|(child, child_range)| self.node(child, child_range, dev, &inner))
                .collect();
            return node;
        }

        TreeNode::unmet(name, range, dev)
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

struct FlatReader<'a> {
    packages: &'a BTreeMap<String, FlatEntry>,
    expanded: HashSet<(String, bool)>,
}

impl<'a> FlatReader<'a> {
    fn node(&mut self, name: &str, range: &str, from: &str, dev: bool) -> TreeNode {
        let Some((path, entry)) = self.resolve(from, name) else {
            return TreeNode::unmet(name, range, dev);
        };
        let location = entry.resolved.clone().unwrap_or_default();
        let (path, entry) = self.follow_link(path, entry);

        let dev = dev || entry.dev;
        let mut node = TreeNode {
            name: name.to_string(),
            specifier: range.to_string(),
            version: entry.version.clone().unwrap_or_default(),
            location,
            dev,
            ..Default::default()
        };

        if !self.expanded.insert((path.clone(), dev)) {
            node.duplicate = true;
            return node;
        }

        node.children = entry
            .requirements()
            .into_iter()
            .map(|(child, child_range)| self.node(child, child_range, &path, dev))
            .collect();
        node
    }

    /// Probe `<from>/node_modules/<name>`, then each ancestor install path.
    fn resolve(&self, from: &str, name: &str) -> Option<(String, &'a FlatEntry)> {
        let mut base = from.to_string();
        loop {
            let candidate = if base.is_empty() {
                format!("node_modules/{}", name)
            } else {
                format!("{}/node_modules/{}", base, name)
            };
            if let Some(entry) = self.packages.get(&candidate) {
                return Some((candidate, entry));
            }
            if base.is_empty() {
                return None;
            }
            base = parent_path(&base);
        }
    }

    // Workspace members appear as `link: true` entries whose `resolved` is the
    // key of the real entry.
    fn follow_link(&self, path: String, entry: &'a FlatEntry) -> (String, &'a FlatEntry) {
        if !entry.link {
            return (path, entry);
        }
        match entry
            .resolved
            .as_ref()
            .and_then(|target| self.packages.get_key_value(target))
        {
            Some((target, linked)) => (target.clone(), linked),
            None => (path, entry),
        }
    }
}

fn parent_path(path: &str) -> String {
    match path.rfind("node_modules/") {
        Some(i) => path[..i].trim_end_matches('/').to_string(),
        None => String::new(),
    }
}
