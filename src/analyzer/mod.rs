use std::future::Future;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::{AnalysisError, Warning};
use crate::models::{DependencyGraph, Module};

pub mod node;

use node::lockfile::LockFormat;

/// Where a module's dependency tree came from, in the order sources are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Strategy {
    /// Live `npm ls` output.
    NpmList,
    Lockfile,
    /// Installed manifests under `node_modules`.
    NodeModules,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::NpmList => write!(f, "npm ls"),
            Strategy::Lockfile => write!(f, "lockfile"),
            Strategy::NodeModules => write!(f, "node_modules"),
        }
    }
}

/// The outcome of analyzing one module.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub module: String,
    pub dir: PathBuf,
    pub strategy: Strategy,
    /// Which lock artifact was read when `strategy` is [`Strategy::Lockfile`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lockfile: Option<LockFormat>,
    pub graph: DependencyGraph,
    pub warnings: Vec<Warning>,
}

pub trait Analyzer {
    fn analyze(&self, module: &Module) -> impl Future<Output = Result<Resolution, AnalysisError>>;
}
