//! `yarn.lock` (classic, v1).
//!
//! Each block is keyed by every `name@range` that resolved to it:
//!
//! ```text
//! "@babel/code-frame@^7.0.0", "@babel/code-frame@^7.10.4":
//!   version "7.10.4"
//!   resolved "https://registry.yarnpkg.com/@babel/code-frame/-/code-frame-7.10.4.tgz#168da1a3"
//!   dependencies:
//!     "@babel/highlight" "^7.10.4"
//! ```

use std::collections::{HashMap, HashSet};

use regex::Regex;

use crate::analyzer::node::manifest::Manifest;
use crate::error::SourceError;
use crate::tree::TreeNode;

#[derive(Debug, Default)]
struct YarnEntry {
    version: String,
    resolved: String,
    dependencies: Vec<(String, String)>,
}

#[derive(Debug, Default)]
pub struct YarnLock {
    entries: Vec<YarnEntry>,
    index: HashMap<String, usize>,
}

impl YarnLock {
    pub fn parse(content: &str) -> Result<Self, SourceError> {
        if content.contains("__metadata:") {
            return Err(SourceError::parse(
                "yarn.lock",
                "yarn 2+ lockfiles are not supported",
            ));
        }

        let pair_re = Regex::new(r#"^"?([^"\s]+)"?\s+"?([^"]*)"?\s*$"#)
            .map_err(|e| SourceError::parse("yarn.lock", e))?;

        let mut lock = YarnLock::default();
        let mut in_dependencies = false;

        for (number, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let indent = line.len() - line.trim_start().len();

            if indent == 0 {
                let Some(header) = trimmed.strip_suffix(':') else {
                    return Err(SourceError::parse(
                        "yarn.lock",
                        format!("line {}: expected an entry header", number + 1),
                    ));
                };
                let id = lock.entries.len();
                lock.entries.push(YarnEntry::default());
                for spec in header.split(',') {
                    lock.index.insert(unquote(spec.trim()).to_string(), id);
                }
                in_dependencies = false;
                continue;
            }

            let Some(entry) = lock.entries.last_mut() else {
                return Err(SourceError::parse(
                    "yarn.lock",
                    format!("line {}: field outside of an entry", number + 1),
                ));
            };

            if let Some(section) = trimmed.strip_suffix(':') {
                in_dependencies = matches!(section, "dependencies" | "optionalDependencies");
                continue;
            }

            let Some(caps) = pair_re.captures(trimmed) else {
                continue;
            };
            let (key, value) = (&caps[1], &caps[2]);

            if indent > 2 && in_dependencies {
                entry.dependencies.push((key.to_string(), value.to_string()));
            } else {
                in_dependencies = false;
                match key {
                    "version" => entry.version = value.to_string(),
                    "resolved" => {
                        entry.resolved = value.split('#').next().unwrap_or(value).to_string()
                    }
                    _ => {}
                }
            }
        }

        Ok(lock)
    }

    fn get(&self, name: &str, range: &str) -> Option<(usize, &YarnEntry)> {
        let id = *self.index.get(&format!("{}@{}", name, range))?;
        Some((id, &self.entries[id]))
    }
}

fn unquote(s: &str) -> &str {
    s.trim_matches('"')
}

/// Parse `yarn.lock` and attach it below the project's declared requirements.
pub fn tree(content: &str, manifest: &Manifest) -> Result<TreeNode, SourceError> {
    let lock = YarnLock::parse(content)?;
    let mut reader = Reader {
        lock: &lock,
        expanded: HashSet::new(),
    };

    let mut root = manifest.root_node();
    root.children = manifest
        .root_requirements()
        .iter()
        .map(|r| reader.node(&r.name, &r.range, r.dev))
        .collect();
    Ok(root)
}

struct Reader<'a> {
    lock: &'a YarnLock,
    expanded: HashSet<(usize, bool)>,
}

impl Reader<'_> {
    fn node(&mut self, name: &str, range: &str, dev: bool) -> TreeNode {
        let Some((id, entry)) = self.lock.get(name, range) else {
            return TreeNode::unmet(name, range, dev);
        };

        let mut node = TreeNode {
            name: name.to_string(),
            specifier: range.to_string(),
            version: entry.version.clone(),
            location: entry.resolved.clone(),
            dev,
            ..Default::default()
        };

        if !self.expanded.insert((id, dev)) {
            node.duplicate = true;
            return node;
        }

        node.children = entry
            .dependencies
            .iter()
            .map(|(child, child_range)| self.node(child, child_range, dev))
            .collect();
        node
    }
}
