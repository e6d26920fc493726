//! Ecosystem-agnostic intermediate dependency tree.
//!
//! Every source adapter produces a [`TreeNode`] rooted at the project manifest;
//! [`crate::graph::build`] turns it into a [`crate::models::DependencyGraph`].

/// A package as seen at one position of a dependency listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    /// Range or tag as written by the parent (`^1.2.0`, `latest`); may be empty.
    pub specifier: String,
    pub version: String,
    pub location: String,
    /// Back-reference to a package defined elsewhere; `children` may be abbreviated.
    pub duplicate: bool,
    /// Declared but not installed (missing or peer-missing).
    pub unmet: bool,
    /// Only reachable through development dependencies.
    pub dev: bool,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn root(name: impl Into<String>, version: impl Into<String>) -> Self {
        TreeNode {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn unmet(name: impl Into<String>, specifier: impl Into<String>, dev: bool) -> Self {
        TreeNode {
            name: name.into(),
            specifier: specifier.into(),
            unmet: true,
            dev,
            ..Default::default()
        }
    }

    /// `name@range` when the range is known, the bare name otherwise.
    pub fn requested(&self) -> String {
        if self.specifier.is_empty() {
            self.name.clone()
        } else {
            format!("{}@{}", self.name, self.specifier)
        }
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.name, &self.version)
    }
}
