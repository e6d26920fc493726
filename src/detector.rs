use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::models::{Ecosystem, Module};

#[derive(Deserialize)]
struct NameOnly {
    name: Option<String>,
}

/// Find the modules to analyze under `root`.
///
/// Without `recursive` the root is the only candidate. Otherwise every
/// directory holding a `package.json` is a module, skipping dot-directories
/// and anything named in `ignore`.
pub fn discover_modules(root: &Path, recursive: bool, ignore: &[String]) -> Result<Vec<Module>> {
    let mut modules = Vec::new();
    if recursive {
        walk(root, root, ignore, &mut modules)?;
    } else if root.join("package.json").is_file() {
        modules.push(module(root, root));
    }
    Ok(modules)
}

fn walk(root: &Path, dir: &Path, ignore: &[String], modules: &mut Vec<Module>) -> Result<()> {
    if dir.join("package.json").is_file() {
        modules.push(module(root, dir));
    }

    let mut children: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    children.sort();

    for child in children {
        let Some(name) = child.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with('.') || ignore.iter().any(|i| i == name) {
            continue;
        }
        walk(root, &child, ignore, modules)?;
    }
    Ok(())
}

fn module(root: &Path, dir: &Path) -> Module {
    let declared = std::fs::read_to_string(dir.join("package.json"))
        .ok()
        .and_then(|content| serde_json::from_str::<NameOnly>(&content).ok())
        .and_then(|m| m.name)
        .filter(|name| !name.is_empty());

    let name = declared.unwrap_or_else(|| match dir.strip_prefix(root) {
        Ok(relative) if !relative.as_os_str().is_empty() => relative.display().to_string(),
        _ => dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".".to_string()),
    });

    Module {
        name,
        dir: dir.to_path_buf(),
        ecosystem: Ecosystem::Node,
    }
}
