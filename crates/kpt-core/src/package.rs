//! Package directory discovery (spec.md §3 "Package").
//!
//! Grounded on the donor's `pack::LoadedPack::load` (resolve a root
//! directory, look for a manifest file, compute derived paths) generalized
//! from a single `Pack.yaml` to a package tree that may nest `Kptfile`s at
//! arbitrary depth.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Result;
use crate::manifest::Manifest;

pub const MANIFEST_FILE_NAME: &str = "Kptfile";

/// A package directory, identified by its absolute path and a human-facing
/// display path (spec.md §3).
#[derive(Debug, Clone)]
pub struct Package {
    pub absolute_path: PathBuf,
    pub display_path: String,
    pub manifest: Option<Manifest>,
}

impl Package {
    /// A package without a manifest is "implicit" (spec.md §3).
    pub fn is_implicit(&self) -> bool {
        self.manifest.is_none()
    }

    pub fn name(&self) -> &str {
        self.manifest
            .as_ref()
            .map(|m| m.metadata.name.as_str())
            .unwrap_or_else(|| {
                Path::new(&self.display_path)
                    .file_name()
                    .and_then(|s| s.to_str())
                    .unwrap_or(&self.display_path)
            })
    }
}

/// Loads the package rooted at `root`, reading its `Kptfile` if present.
pub fn load_package(root: impl AsRef<Path>, display_path: impl Into<String>) -> Result<Package> {
    let root = root.as_ref().to_path_buf();
    let manifest_path = root.join(MANIFEST_FILE_NAME);
    let manifest = if manifest_path.exists() {
        let text = std::fs::read_to_string(&manifest_path)?;
        Some(Manifest::parse(MANIFEST_FILE_NAME, &text)?)
    } else {
        None
    };
    Ok(Package {
        absolute_path: root,
        display_path: display_path.into(),
        manifest,
    })
}

/// Finds the *direct* subpackages of `root`: the nearest descendant
/// directories that themselves contain a `Kptfile` (spec.md §4.4 step 2 —
/// "nesting continues only from there", so once a subpackage boundary is
/// found the walk does not recurse further down that branch).
pub fn direct_subpackages(root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    let mut found = Vec::new();
    let mut walker = WalkDir::new(root).min_depth(1).into_iter();
    loop {
        let entry = match walker.next() {
            Some(Ok(e)) => e,
            Some(Err(_)) => continue,
            None => break,
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        if entry.path().join(MANIFEST_FILE_NAME).exists() {
            found.push(entry.path().to_path_buf());
            walker.skip_current_dir();
        }
    }
    found.sort();
    Ok(found)
}

/// Like [`direct_subpackages`] but reports *every* existing subpackage path
/// relative to `root`, regardless of nesting depth — used by the 3-way
/// merger (spec.md §4.5 Phase A) to compute exclusions.
pub fn all_existing_subpackages(root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    let mut found = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
    {
        if entry.path().join(MANIFEST_FILE_NAME).exists() {
            if let Ok(rel) = entry.path().strip_prefix(root) {
                found.push(rel.to_path_buf());
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Reads every file under `root` into a [`crate::store::FileMap`], the
/// carrier a [`crate::store::ResourceStore`] reads from.
pub fn load_file_map(root: impl AsRef<Path>) -> Result<crate::store::FileMap> {
    let root = root.as_ref();
    let mut map = crate::store::FileMap::new();
    for entry in WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let bytes = std::fs::read(entry.path())?;
        map.insert(rel.to_string_lossy().into_owned(), bytes);
    }
    Ok(map)
}

/// Like [`load_file_map`], but stops descending at subpackage boundaries —
/// a package's own file map, excluding anything owned by a nested
/// subpackage (spec.md §4.4 step 2's "gather P's local resources").
pub fn load_local_file_map(root: impl AsRef<Path>) -> Result<crate::store::FileMap> {
    let root = root.as_ref();
    let mut map = crate::store::FileMap::new();
    let mut walker = WalkDir::new(root).into_iter();
    loop {
        let entry = match walker.next() {
            Some(Ok(e)) => e,
            Some(Err(_)) => continue,
            None => break,
        };
        if entry.file_type().is_dir() {
            if entry.depth() > 0 && entry.path().join(MANIFEST_FILE_NAME).exists() {
                walker.skip_current_dir();
            }
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let bytes = std::fs::read(entry.path())?;
        map.insert(rel.to_string_lossy().into_owned(), bytes);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn implicit_package_has_no_manifest() {
        let temp = TempDir::new().unwrap();
        let pkg = load_package(temp.path(), "root").unwrap();
        assert!(pkg.is_implicit());
    }

    #[test]
    fn direct_subpackages_stops_at_nearest_manifest() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("a/b")).unwrap();
        std::fs::write(
            temp.path().join("a/Kptfile"),
            "apiVersion: kpt.dev/v1\nkind: Kptfile\nmetadata:\n  name: a\n",
        )
        .unwrap();
        std::fs::write(
            temp.path().join("a/b/Kptfile"),
            "apiVersion: kpt.dev/v1\nkind: Kptfile\nmetadata:\n  name: b\n",
        )
        .unwrap();

        let direct = direct_subpackages(temp.path()).unwrap();
        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0], temp.path().join("a"));
    }

    #[test]
    fn local_file_map_excludes_subpackage_files() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("sub")).unwrap();
        std::fs::write(
            temp.path().join("sub/Kptfile"),
            "apiVersion: kpt.dev/v1\nkind: Kptfile\nmetadata:\n  name: sub\n",
        )
        .unwrap();
        std::fs::write(temp.path().join("sub/resource.yaml"), "kind: ConfigMap").unwrap();
        std::fs::write(temp.path().join("own.yaml"), "kind: ConfigMap").unwrap();

        let map = load_local_file_map(temp.path()).unwrap();
        assert!(map.contains_key("own.yaml"));
        assert!(!map.contains_key("sub/resource.yaml"));
        assert!(!map.contains_key("sub/Kptfile"));
    }
}
