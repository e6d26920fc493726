//! Node.js analyzer.
//!
//! Sources are tried in a fixed order and the first that produces a tree wins:
//!
//! 1. `npm ls --json --all` (skipped when npm use is disabled)
//! 2. `npm-shrinkwrap.json`, `package-lock.json` or `yarn.lock`
//! 3. the installed `node_modules` tree
//!
//! A failing source is logged and the next one is tried. Only an unreadable
//! project manifest, or every source failing, is an error.

use std::path::Path;

use tracing::{info, warn};

use super::{Analyzer, Resolution, Strategy};
use crate::error::{AnalysisError, SourceError};
use crate::graph::{self, BuildOptions};
use crate::models::Module;
use crate::tree::TreeNode;

#[cfg(test)]
mod fixtures;
pub mod lockfile;
pub mod manifest;
pub mod node_modules;
pub mod npm;

use lockfile::LockFormat;
use manifest::Manifest;
use npm::{Npm, NpmCli};

#[derive(Debug, Clone)]
pub struct NodeOptions {
    /// Whether `npm` may be invoked at all.
    pub allow_npm: bool,
    pub include_dev: bool,
}

impl Default for NodeOptions {
    fn default() -> Self {
        NodeOptions {
            allow_npm: true,
            include_dev: true,
        }
    }
}

pub struct NodeAnalyzer<N = NpmCli> {
    npm: N,
    options: NodeOptions,
}

impl<N: Npm> NodeAnalyzer<N> {
    pub fn new(npm: N, options: NodeOptions) -> Self {
        Self { npm, options }
    }

    async fn select(
        &self,
        module: &Module,
        manifest: &Manifest,
    ) -> Result<(Strategy, Option<LockFormat>, TreeNode), AnalysisError> {
        let dir = module.dir.as_path();
        let mut attempts: Vec<(Strategy, SourceError)> = Vec::new();

        if self.options.allow_npm {
            match npm::tree(&self.npm, dir, manifest).await {
                Ok(tree) => return Ok((Strategy::NpmList, None, tree)),
                Err(e) => attempts.push(fell_through(module, Strategy::NpmList, e)),
            }
        }

        let (owned_dir, owned_manifest) = (dir.to_path_buf(), manifest.clone());
        let locked = blocking(Strategy::Lockfile, move || {
            lockfile::tree(&owned_dir, &owned_manifest)
        })
        .await;
        match locked {
            Ok((format, tree)) => return Ok((Strategy::Lockfile, Some(format), tree)),
            Err(e) => attempts.push(fell_through(module, Strategy::Lockfile, e)),
        }

        let (owned_dir, owned_manifest) = (dir.to_path_buf(), manifest.clone());
        let walked = blocking(Strategy::NodeModules, move || {
            node_modules::tree(&owned_dir, &owned_manifest)
        })
        .await;
        match walked {
            Ok(tree) => Ok((Strategy::NodeModules, None, tree)),
            Err(e) => {
                attempts.push(fell_through(module, Strategy::NodeModules, e));
                Err(AnalysisError::Exhausted {
                    module: module.name.clone(),
                    attempts,
                })
            }
        }
    }
}

/// Run a filesystem-only source off the async worker threads.
async fn blocking<T, F>(strategy: Strategy, read: F) -> Result<T, SourceError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, SourceError> + Send + 'static,
{
    tokio::task::spawn_blocking(read)
        .await
        .map_err(|source| SourceError::TaskFailed {
            what: strategy.to_string(),
            source,
        })?
}

fn fell_through(module: &Module, strategy: Strategy, error: SourceError) -> (Strategy, SourceError) {
    warn!(module = %module.name, source = %strategy, "dependency source unusable: {}", error);
    (strategy, error)
}

fn read_manifest(dir: &Path) -> Result<Manifest, AnalysisError> {
    let path = dir.join("package.json");
    let content = std::fs::read_to_string(&path).map_err(|source| AnalysisError::MissingManifest {
        path: path.clone(),
        source,
    })?;
    Manifest::parse(&content).map_err(|source| AnalysisError::InvalidManifest { path, source })
}

impl<N: Npm> Analyzer for NodeAnalyzer<N> {
    async fn analyze(&self, module: &Module) -> Result<Resolution, AnalysisError> {
        let manifest = read_manifest(&module.dir)?;
        let (strategy, lockfile, tree) = self.select(module, &manifest).await?;
        match lockfile {
            Some(format) => info!(module = %module.name, source = %format, "resolved dependency tree"),
            None => info!(module = %module.name, source = %strategy, "resolved dependency tree"),
        }

        let options = BuildOptions {
            ecosystem: module.ecosystem,
            include_dev: self.options.include_dev,
        };
        let (graph, warnings) = graph::build(&tree, &options);

        Ok(Resolution {
            module: module.name.clone(),
            dir: module.dir.clone(),
            strategy,
            lockfile,
            graph,
            warnings,
        })
    }
}
