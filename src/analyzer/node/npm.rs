//! Tool-output source: `npm ls --json --all`.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use super::manifest::Manifest;
use crate::error::SourceError;
use crate::tree::TreeNode;

/// Anything that can produce an `npm ls` listing for a project directory.
pub trait Npm {
    fn list(&self, dir: &Path) -> impl Future<Output = Result<NpmListing, SourceError>> + Send;
}

/// Runs the real npm binary.
#[derive(Debug, Clone)]
pub struct NpmCli {
    pub binary: PathBuf,
    pub timeout: Duration,
}

impl NpmCli {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        NpmCli {
            binary: binary.into(),
            timeout,
        }
    }
}

const STDERR_TAIL: usize = 400;

impl Npm for NpmCli {
    async fn list(&self, dir: &Path) -> Result<NpmListing, SourceError> {
        let tool = self.binary.display().to_string();

        let child = Command::new(&self.binary)
            .args(["ls", "--json", "--all"])
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SourceError::ToolUnavailable {
                tool: tool.clone(),
                source,
            })?;

        // Dropping the pending wait on timeout kills the child.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| SourceError::ToolUnavailable {
                tool: tool.clone(),
                source,
            })?,
            Err(_) => {
                return Err(SourceError::TimedOut {
                    tool,
                    after: self.timeout,
                })
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!(tool = %tool, dir = %dir.display(), "npm stderr: {}", stderr.trim());
        }

        if !output.status.success() {
            let trimmed = stderr.trim();
            let start = trimmed
                .char_indices()
                .rev()
                .nth(STDERR_TAIL)
                .map(|(i, _)| i)
                .unwrap_or(0);
            return Err(SourceError::ToolFailed {
                tool,
                status: output.status,
                stderr: trimmed[start..].to_string(),
            });
        }

        NpmListing::parse(&String::from_utf8_lossy(&output.stdout))
    }
}

/// One entry of `npm ls --json` output. The top level is the project itself.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpmListing {
    pub name: Option<String>,
    pub version: Option<String>,
    /// `name@range` as requested by the parent (npm <= 6).
    pub from: Option<String>,
    pub resolved: Option<String>,
    /// A range string, or an object describing a missing peer (npm 6).
    pub required: Option<Value>,
    #[serde(default)]
    pub peer_missing: bool,
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub deduped: bool,
    #[serde(default)]
    pub dev: bool,
    /// Kept in listed order; the graph builder breaks ties by first occurrence.
    #[serde(default)]
    pub dependencies: IndexMap<String, NpmListing>,
}

impl NpmListing {
    pub fn parse(content: &str) -> Result<Self, SourceError> {
        serde_json::from_str(content).map_err(|e| SourceError::parse("npm ls output", e))
    }

    /// Convert the listing into a tree rooted at the project.
    ///
    /// npm does not flag development dependencies in its listing, so root
    /// children the manifest declares only under `devDependencies` are marked
    /// dev here.
    pub fn into_tree(self, manifest: &Manifest) -> TreeNode {
        let requirements = manifest.root_requirements();
        let mut root = TreeNode::root(
            self.name
                .clone()
                .unwrap_or_else(|| manifest.name_or_default().to_string()),
            self.version
                .clone()
                .unwrap_or_else(|| manifest.version_or_empty().to_string()),
        );
        root.children = self
            .dependencies
            .into_iter()
            .map(|(name, entry)| {
                let dev_only = requirements.iter().any(|r| r.name == name && r.dev);
                let mut node = entry.into_node(name);
                node.dev |= dev_only;
                node
            })
            .collect();
        root
    }

    fn into_node(self, name: String) -> TreeNode {
        let specifier = self.specifier(&name);
        let unmet = self.peer_missing
            || self.missing
            || (self.version.is_none() && self.required.is_some());
        let children = self
            .dependencies
            .into_iter()
            .map(|(child, entry)| entry.into_node(child))
            .collect();

        TreeNode {
            name,
            specifier,
            version: self.version.unwrap_or_default(),
            location: self.resolved.unwrap_or_default(),
            duplicate: self.deduped,
            unmet,
            dev: self.dev,
            children,
        }
    }

    fn specifier(&self, name: &str) -> String {
        if let Some(range) = self
            .from
            .as_deref()
            .and_then(|from| from.strip_prefix(name))
            .and_then(|rest| rest.strip_prefix('@'))
        {
            return range.to_string();
        }
        match &self.required {
            Some(Value::String(range)) => range.clone(),
            _ => String::new(),
        }
    }
}

/// Tool-output adapter entry point.
pub async fn tree<N: Npm>(npm: &N, dir: &Path, manifest: &Manifest) -> Result<TreeNode, SourceError> {
    let listing = npm.list(dir).await?;
    Ok(listing.into_tree(manifest))
}
