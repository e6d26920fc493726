//! On-disk project fixtures and fake `npm` implementations for tests.

use std::path::Path;

use super::npm::{Npm, NpmListing};
use crate::error::SourceError;

pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Returns a fixed `npm ls` listing.
pub struct FixtureNpm(pub String);

impl Npm for FixtureNpm {
    async fn list(&self, _dir: &Path) -> Result<NpmListing, SourceError> {
        NpmListing::parse(&self.0)
    }
}

/// Behaves as if npm were not installed.
pub struct MissingNpm;

impl Npm for MissingNpm {
    async fn list(&self, _dir: &Path) -> Result<NpmListing, SourceError> {
        Err(SourceError::ToolUnavailable {
            tool: "npm".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "npm not found"),
        })
    }
}

/// chai 4.1.2 and what it pulls in: `(name, version, dependencies)`.
pub const CHAI_PACKAGES: &[(&str, &str, &[(&str, &str)])] = &[
    (
        "chai",
        "4.1.2",
        &[
            ("assertion-error", "^1.0.1"),
            ("check-error", "^1.0.1"),
            ("deep-eql", "^3.0.0"),
            ("get-func-name", "^2.0.0"),
            ("pathval", "^1.0.0"),
            ("type-detect", "^4.0.0"),
        ],
    ),
    ("assertion-error", "1.1.0", &[]),
    ("check-error", "1.0.2", &[]),
    ("deep-eql", "3.0.1", &[("type-detect", "^4.0.0")]),
    ("get-func-name", "2.0.0", &[]),
    ("pathval", "1.1.0", &[]),
    ("type-detect", "4.0.8", &[]),
];

pub fn tarball(name: &str, version: &str) -> String {
    format!("https://registry.npmjs.org/{0}/-/{0}-{1}.tgz", name, version)
}

fn version_of(name: &str) -> &'static str {
    CHAI_PACKAGES
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, v, _)| *v)
        .unwrap()
}

fn json_map(entries: &[(&str, &str)]) -> String {
    let body: Vec<String> = entries
        .iter()
        .map(|(k, v)| format!("{:?}: {:?}", k, v))
        .collect();
    format!("{{ {} }}", body.join(", "))
}

/// How the chai project under test was set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChaiLayout {
    Installed,
    InstalledLockfile,
    InstalledYarnLockfile,
    InstalledShrinkwrap,
    DevDeps,
}

impl ChaiLayout {
    pub const ALL: [ChaiLayout; 5] = [
        ChaiLayout::Installed,
        ChaiLayout::InstalledLockfile,
        ChaiLayout::InstalledYarnLockfile,
        ChaiLayout::InstalledShrinkwrap,
        ChaiLayout::DevDeps,
    ];
}

/// Write a project depending on chai, with `node_modules` installed flat, plus
/// whatever lock artifact `layout` calls for.
pub fn chai_project(root: &Path, layout: ChaiLayout) {
    let section = if layout == ChaiLayout::DevDeps {
        "devDependencies"
    } else {
        "dependencies"
    };
    write(
        root,
        "package.json",
        &format!(
            r#"{{ "name": "test", "version": "1.0.0", {:?}: {{ "chai": "^4.1.2" }} }}"#,
            section
        ),
    );

    for (name, version, deps) in CHAI_PACKAGES {
        write(
            root,
            &format!("node_modules/{}/package.json", name),
            &format!(
                r#"{{ "name": {:?}, "version": {:?}, "_resolved": {:?}, "dependencies": {} }}"#,
                name,
                version,
                tarball(name, version),
                json_map(deps)
            ),
        );
    }

    match layout {
        ChaiLayout::InstalledLockfile => write(root, "package-lock.json", &chai_package_lock()),
        ChaiLayout::InstalledShrinkwrap => {
            write(root, "npm-shrinkwrap.json", &chai_package_lock())
        }
        ChaiLayout::InstalledYarnLockfile => write(root, "yarn.lock", &chai_yarn_lock()),
        ChaiLayout::Installed | ChaiLayout::DevDeps => {}
    }
}

fn chai_package_lock() -> String {
    let entries: Vec<String> = CHAI_PACKAGES
        .iter()
        .map(|(name, version, deps)| {
            format!(
                r#"{:?}: {{ "version": {:?}, "resolved": {:?}, "requires": {} }}"#,
                name,
                version,
                tarball(name, version),
                json_map(deps)
            )
        })
        .collect();
    format!(
        r#"{{ "name": "test", "version": "1.0.0", "lockfileVersion": 1, "requires": true, "dependencies": {{ {} }} }}"#,
        entries.join(", ")
    )
}

fn chai_yarn_lock() -> String {
    let mut out = String::from("# yarn lockfile v1\n\n");
    let mut requested: Vec<(&str, &str)> = vec![("chai", "^4.1.2")];
    for (_, _, deps) in CHAI_PACKAGES {
        requested.extend(deps.iter().copied());
    }

    for (name, version, deps) in CHAI_PACKAGES {
        let mut specs: Vec<String> = requested
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(n, r)| format!("{}@{}", n, r))
            .collect();
        specs.dedup();
        out.push_str(&format!("{}:\n", specs.join(", ")));
        out.push_str(&format!("  version \"{}\"\n", version));
        out.push_str(&format!("  resolved \"{}#0000\"\n", tarball(name, version)));
        if !deps.is_empty() {
            out.push_str("  dependencies:\n");
            for (dep, range) in deps.iter() {
                out.push_str(&format!("    {} \"{}\"\n", dep, range));
            }
        }
        out.push('\n');
    }
    out
}

/// `npm ls --json` output for the chai project, as npm 6 prints it.
pub fn chai_listing() -> String {
    fn entry(name: &str, range: &str) -> String {
        let version = version_of(name);
        let deps = CHAI_PACKAGES
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, _, d)| *d)
            .unwrap_or(&[]);
        let children: Vec<String> = deps.iter().map(|(n, r)| entry(n, r)).collect();
        format!(
            r#"{:?}: {{ "version": {:?}, "from": "{}@{}", "resolved": {:?}, "dependencies": {{ {} }} }}"#,
            name,
            version,
            name,
            range,
            tarball(name, version),
            children.join(", ")
        )
    }

    format!(
        r#"{{ "name": "test", "version": "1.0.0", "dependencies": {{ {} }} }}"#,
        entry("chai", "^4.1.2")
    )
}
