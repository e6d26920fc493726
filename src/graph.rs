//! Builds the canonical [`DependencyGraph`] from an intermediate [`TreeNode`].
//!
//! A listing may record the same `(name, version)` at several positions, and any
//! position may carry an abbreviated child list. For each pair the builder keeps
//! the richest occurrence:
//!
//! 1. a defining (non-duplicate) occurrence with children,
//! 2. a duplicate marker with children,
//! 3. an occurrence without children.
//!
//! Within a tier the first occurrence of a depth-first walk (children in listed
//! order) wins. Unmet nodes never become packages and edges to them are dropped.
//!
//! Ranking a defining occurrence above a duplicate marker with children goes
//! one step past plain "first non-empty wins": a marker's list may be
//! abbreviated, so it only decides when no defining occurrence has children.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::Warning;
use crate::models::{DependencyGraph, Ecosystem, ImportEdge, PackageIdentity, ResolvedPackage};
use crate::tree::TreeNode;

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub ecosystem: Ecosystem,
    pub include_dev: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            ecosystem: Ecosystem::Node,
            include_dev: true,
        }
    }
}

type Key<'a> = (&'a str, &'a str);

struct Selected<'a> {
    node: &'a TreeNode,
    tier: u8,
}

struct Walk<'a, 'o> {
    options: &'o BuildOptions,
    root: Key<'a>,
    selected: BTreeMap<Key<'a>, Selected<'a>>,
    locations: HashMap<Key<'a>, &'a str>,
}

impl<'a, 'o> Walk<'a, 'o> {
    fn included(&self, node: &TreeNode) -> bool {
        !node.unmet && (self.options.include_dev || !node.dev)
    }

    fn tier(&self, node: &TreeNode) -> u8 {
        let live = node.children.iter().filter(|c| self.included(c)).count();
        match (live, node.duplicate) {
            (0, _) => 0,
            (_, true) => 1,
            (_, false) => 2,
        }
    }

    fn visit(&mut self, node: &'a TreeNode) {
        if !self.included(node) || node.version.is_empty() || node.key() == self.root {
            return;
        }

        let key = node.key();
        let tier = self.tier(node);
        match self.selected.get(&key) {
            Some(current) if current.tier >= tier => {}
            _ => {
                self.selected.insert(key, Selected { node, tier });
            }
        }
        if !node.location.is_empty() {
            self.locations.entry(key).or_insert(node.location.as_str());
        }

        for child in &node.children {
            self.visit(child);
        }
    }
}

/// Build the dependency graph for the project rooted at `root`.
///
/// Edges that point at a child with no resolved version are dropped and
/// reported as [`Warning::DanglingReference`].
pub fn build(root: &TreeNode, options: &BuildOptions) -> (DependencyGraph, Vec<Warning>) {
    let mut walk = Walk {
        options,
        root: root.key(),
        selected: BTreeMap::new(),
        locations: HashMap::new(),
    };
    for child in &root.children {
        walk.visit(child);
    }

    let identities: HashMap<Key<'_>, PackageIdentity> = walk
        .selected
        .iter()
        .map(|(key, selected)| {
            let location = if selected.node.location.is_empty() {
                walk.locations.get(key).copied().unwrap_or_default()
            } else {
                selected.node.location.as_str()
            };
            let id = PackageIdentity {
                ecosystem: options.ecosystem,
                name: key.0.to_string(),
                version: key.1.to_string(),
                location: location.to_string(),
            };
            (*key, id)
        })
        .collect();

    let mut warnings = Vec::new();
    let direct = edges(root, &walk, &identities, &mut warnings);

    let mut transitive = BTreeMap::new();
    for (key, selected) in &walk.selected {
        let id = identities[key].clone();
        let imports = edges(selected.node, &walk, &identities, &mut warnings);
        transitive.insert(id.clone(), ResolvedPackage { id, imports });
    }

    (DependencyGraph { direct, transitive }, warnings)
}

fn edges(
    parent: &TreeNode,
    walk: &Walk<'_, '_>,
    identities: &HashMap<Key<'_>, PackageIdentity>,
    warnings: &mut Vec<Warning>,
) -> Vec<ImportEdge> {
    let mut seen = HashSet::new();
    let mut imports = Vec::new();

    for child in &parent.children {
        if child.unmet {
            debug!(parent = %parent.name, dependency = %child.requested(), "skipping unmet dependency");
            continue;
        }
        if !walk.included(child) {
            continue;
        }
        if child.key() == walk.root {
            debug!(parent = %parent.name, "dropping edge back to the project root");
            continue;
        }

        let Some(id) = identities.get(&child.key()) else {
            let warning = Warning::DanglingReference {
                parent: display_name(parent),
                target: child.requested(),
            };
            warn!("{}", warning);
            warnings.push(warning);
            continue;
        };

        if seen.insert(id) {
            imports.push(ImportEdge {
                requested: child.requested(),
                resolved: id.clone(),
            });
        }
    }

    imports
}

fn display_name(node: &TreeNode) -> String {
    if node.version.is_empty() {
        node.name.clone()
    } else {
        format!("{}@{}", node.name, node.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;

    fn node(name: &str, version: &str, children: Vec<TreeNode>) -> TreeNode {
        TreeNode {
            name: name.to_string(),
            specifier: format!("^{}", version),
            version: version.to_string(),
            location: format!("https://registry.npmjs.org/{0}/-/{0}-{1}.tgz", name, version),
            children,
            ..Default::default()
        }
    }

    fn duplicate(name: &str, version: &str) -> TreeNode {
        TreeNode {
            duplicate: true,
            ..node(name, version, Vec::new())
        }
    }

    fn import_names(imports: &[ImportEdge]) -> Vec<String> {
        let mut names: Vec<String> = imports.iter().map(|i| i.resolved.to_string()).collect();
        names.sort();
        names
    }

    /*
       └─┬ a@1.0.0
         ├─┬ b@2.0.0
         │ ├── c@3.0.0
         │ └── d@4.0.0
         └── c@3.0.0
    */
    fn transitive_tree() -> TreeNode {
        let mut root = TreeNode::root("project", "0.0.0");
        root.children = vec![node(
            "a",
            "1.0.0",
            vec![
                node(
                    "b",
                    "2.0.0",
                    vec![node("c", "3.0.0", vec![]), node("d", "4.0.0", vec![])],
                ),
                node("c", "3.0.0", vec![]),
            ],
        )];
        root
    }

    /// `babel-runtime` is listed with its children under `babel-polyfill` and as
    /// an abbreviated duplicate under `jira-client`; `request` is peer-missing.
    fn duplicates_tree() -> TreeNode {
        let mut root = TreeNode::root("duplicates", "1.0.0");
        let mut request = TreeNode::unmet("request", "^2.34", false);
        request.location.clear();
        root.children = vec![
            node(
                "babel-polyfill",
                "6.26.0",
                vec![
                    node(
                        "babel-runtime",
                        "6.26.0",
                        vec![
                            node("core-js", "2.5.7", vec![]),
                            node("regenerator-runtime", "0.11.1", vec![]),
                        ],
                    ),
                    node("core-js", "2.5.7", vec![]),
                    node("regenerator-runtime", "0.10.5", vec![]),
                ],
            ),
            node(
                "jira-client",
                "6.4.1",
                vec![duplicate("babel-runtime", "6.26.0"), request.clone()],
            ),
            node(
                "request-promise",
                "4.2.2",
                vec![node("bluebird", "3.5.1", vec![]), request],
            ),
        ];
        root
    }

    fn shuffle(node: &mut TreeNode, rng: &mut impl rand::Rng) {
        node.children.shuffle(rng);
        for child in &mut node.children {
            shuffle(child, rng);
        }
    }

    #[test]
    fn test_transitive_imports() {
        let (graph, warnings) = build(&transitive_tree(), &BuildOptions::default());
        assert!(warnings.is_empty());

        assert_eq!(graph.direct.len(), 1);
        assert_eq!(graph.direct[0].resolved.name, "a");
        assert_eq!(graph.direct[0].requested, "a@^1.0.0");
        assert_eq!(graph.transitive.len(), 4);

        let a = graph.find("a", "1.0.0").unwrap();
        assert_eq!(import_names(&a.imports), vec!["b@2.0.0", "c@3.0.0"]);
        let b = graph.find("b", "2.0.0").unwrap();
        assert_eq!(import_names(&b.imports), vec!["c@3.0.0", "d@4.0.0"]);
        assert!(graph.find("c", "3.0.0").unwrap().imports.is_empty());
        assert!(graph.find("d", "4.0.0").unwrap().imports.is_empty());
    }

    #[test]
    fn test_no_dependencies() {
        let root = TreeNode::root("empty", "1.0.0");
        let (graph, warnings) = build(&root, &BuildOptions::default());
        assert!(graph.direct.is_empty());
        assert!(graph.transitive.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_duplicates_are_order_invariant() {
        let expected = build(&duplicates_tree(), &BuildOptions::default()).0;
        let runtime = PackageIdentity {
            ecosystem: Ecosystem::Node,
            name: "regenerator-runtime".to_string(),
            version: "0.11.1".to_string(),
            location: "https://registry.npmjs.org/regenerator-runtime/-/regenerator-runtime-0.11.1.tgz"
                .to_string(),
        };

        let mut rng = rand::thread_rng();
        for _ in 0..10 {
            let mut tree = duplicates_tree();
            shuffle(&mut tree, &mut rng);
            let (graph, _) = build(&tree, &BuildOptions::default());

            assert!(graph.transitive.contains_key(&runtime));
            let keys: Vec<_> = graph.transitive.keys().collect();
            assert_eq!(keys, expected.transitive.keys().collect::<Vec<_>>());

            let babel = graph.find("babel-runtime", "6.26.0").unwrap();
            assert_eq!(
                import_names(&babel.imports),
                vec!["core-js@2.5.7", "regenerator-runtime@0.11.1"]
            );
        }
    }

    #[test]
    fn test_duplicate_defined_after_abbreviation() {
        let mut root = TreeNode::root("project", "1.0.0");
        root.children = vec![
            node("x", "1.0.0", vec![duplicate("shared", "1.0.0")]),
            node("y", "1.0.0", vec![node("shared", "1.0.0", vec![node("leaf", "1.0.0", vec![])])]),
        ];
        let (graph, _) = build(&root, &BuildOptions::default());
        let shared = graph.find("shared", "1.0.0").unwrap();
        assert_eq!(import_names(&shared.imports), vec!["leaf@1.0.0"]);
    }

    #[test]
    fn test_conflicting_occurrences_keep_first() {
        let mut root = TreeNode::root("project", "1.0.0");
        root.children = vec![
            node("p", "1.0.0", vec![node("q", "1.0.0", vec![])]),
            node("r", "1.0.0", vec![node("p", "1.0.0", vec![node("s", "1.0.0", vec![])])]),
        ];
        let (graph, _) = build(&root, &BuildOptions::default());
        let p = graph.find("p", "1.0.0").unwrap();
        assert_eq!(import_names(&p.imports), vec!["q@1.0.0"]);
        // `s` is still discovered through the losing occurrence.
        assert!(graph.find("s", "1.0.0").is_some());
    }

    #[test]
    fn test_missing_peer_dependency_excluded() {
        let (graph, warnings) = build(&duplicates_tree(), &BuildOptions::default());
        assert!(warnings.is_empty());
        assert!(graph.transitive.keys().all(|id| id.name != "request"));
        for package in graph.transitive.values() {
            assert!(package.imports.iter().all(|i| i.resolved.name != "request"));
        }
        let jira = graph.find("jira-client", "6.4.1").unwrap();
        assert_eq!(import_names(&jira.imports), vec!["babel-runtime@6.26.0"]);
    }

    #[test]
    fn test_dangling_reference_dropped_with_warning() {
        let mut root = TreeNode::root("project", "1.0.0");
        let mut ghost = node("ghost", "", vec![]);
        ghost.specifier = "^1.0.0".to_string();
        root.children = vec![node("a", "1.0.0", vec![ghost])];

        let (graph, warnings) = build(&root, &BuildOptions::default());
        assert_eq!(graph.transitive.len(), 1);
        assert!(graph.find("a", "1.0.0").unwrap().imports.is_empty());
        assert_eq!(
            warnings,
            vec![Warning::DanglingReference {
                parent: "a@1.0.0".to_string(),
                target: "ghost@^1.0.0".to_string(),
            }]
        );
    }

    #[test]
    fn test_dev_dependencies_excluded_on_request() {
        let mut root = TreeNode::root("project", "1.0.0");
        let mut mocha = node("mocha", "5.0.0", vec![node("debug", "3.1.0", vec![])]);
        mocha.dev = true;
        root.children = vec![node("chai", "4.1.2", vec![]), mocha];

        let (all, _) = build(&root, &BuildOptions::default());
        assert_eq!(all.direct.len(), 2);
        assert_eq!(all.transitive.len(), 3);

        let production = BuildOptions {
            include_dev: false,
            ..Default::default()
        };
        let (graph, _) = build(&root, &production);
        assert_eq!(graph.direct.len(), 1);
        assert_eq!(graph.transitive.len(), 1);
        assert!(graph.find("chai", "4.1.2").is_some());
    }

    #[test]
    fn test_location_recovered_from_other_occurrence() {
        let mut root = TreeNode::root("project", "1.0.0");
        let mut bare = node("lib", "1.0.0", vec![node("dep", "1.0.0", vec![])]);
        bare.location.clear();
        root.children = vec![bare, duplicate("lib", "1.0.0")];

        let (graph, _) = build(&root, &BuildOptions::default());
        let lib = graph.find("lib", "1.0.0").unwrap();
        assert_eq!(lib.id.location, "https://registry.npmjs.org/lib/-/lib-1.0.0.tgz");
        assert_eq!(lib.imports.len(), 1);
        assert_eq!(graph.direct.len(), 1);
    }
}
