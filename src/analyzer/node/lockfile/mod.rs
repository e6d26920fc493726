//! Lockfile source.
//!
//! The first artifact present wins, in this order:
//! `npm-shrinkwrap.json` → `package-lock.json` → `yarn.lock`.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use super::manifest::Manifest;
use crate::error::SourceError;
use crate::tree::TreeNode;

pub mod package_lock;
pub mod yarn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LockFormat {
    Shrinkwrap,
    PackageLock,
    Yarn,
}

impl LockFormat {
    pub const PRIORITY: [LockFormat; 3] =
        [LockFormat::Shrinkwrap, LockFormat::PackageLock, LockFormat::Yarn];

    pub fn file_name(self) -> &'static str {
        match self {
            LockFormat::Shrinkwrap => "npm-shrinkwrap.json",
            LockFormat::PackageLock => "package-lock.json",
            LockFormat::Yarn => "yarn.lock",
        }
    }
}

impl std::fmt::Display for LockFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

/// Find the highest-priority lock artifact in `dir`.
pub fn locate(dir: &Path) -> Option<(LockFormat, PathBuf)> {
    LockFormat::PRIORITY
        .into_iter()
        .map(|format| (format, dir.join(format.file_name())))
        .find(|(_, path)| path.is_file())
}

/// Lockfile adapter entry point.
pub fn tree(dir: &Path, manifest: &Manifest) -> Result<(LockFormat, TreeNode), SourceError> {
    let Some((format, path)) = locate(dir) else {
        return Err(SourceError::NotPresent {
            what: "lockfile (npm-shrinkwrap.json, package-lock.json, yarn.lock)".to_string(),
        });
    };
    debug!(lockfile = %path.display(), "reading lockfile");

    let content = std::fs::read_to_string(&path).map_err(|source| SourceError::Io {
        path: path.clone(),
        source,
    })?;

    let tree = match format {
        LockFormat::Shrinkwrap | LockFormat::PackageLock => package_lock::tree(&content, manifest)
            .map_err(|e| SourceError::parse(path.display(), e))?,
        LockFormat::Yarn => yarn::tree(&content, manifest)?,
    };

    Ok((format, tree))
}
