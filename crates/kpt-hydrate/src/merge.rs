//! The 3-way Package Merger (C5, spec.md §4.5): folds legitimate upstream
//! changes into a local fork while preserving intentional local edits.
//!
//! Grounded on `sherpack-kube::diff::DiffEngine`'s three-way comparison
//! shape (`diff_releases`/`detect_drift`/`three_way_diff`) generalized from
//! live-cluster diffing to original/updated/dest tree comparison; the
//! `MergeAction` enum mirrors the donor's `ChangeType` enum in the same
//! module.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use kpt_core::identity::{identity_of, ResourceId};
use kpt_core::manifest::Manifest;
use kpt_core::store::FileMap;
use kpt_core::{package, CoreError, Resource, ResourceStore};
use serde_json::Value;

use crate::error::{HydrateError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeAction {
    KeepDest,
    KeepUpdated,
    Merge,
    Skip,
}

/// Phase B's decision table (spec.md §4.5), keyed by presence in each tree.
/// `equivalent` is only evaluated for the `(true, false, true)` cell, where
/// it decides between `Skip` (upstream deleted it, local never touched it)
/// and `KeepDest` (local changed it, so the deletion does not apply).
fn decide(o: bool, u: bool, l: bool, equivalent: impl FnOnce() -> bool) -> MergeAction {
    match (o, u, l) {
        (false, false, true) => MergeAction::KeepDest,
        (false, true, false) => MergeAction::KeepUpdated,
        (false, false, false) => MergeAction::Skip,
        (false, true, true) => MergeAction::Merge,
        (true, false, false) => MergeAction::Skip,
        (true, true, false) => MergeAction::Skip,
        (true, false, true) => {
            if equivalent() {
                MergeAction::Skip
            } else {
                MergeAction::KeepDest
            }
        }
        (true, true, true) => MergeAction::Merge,
    }
}

/// Merges one resource's content across the three trees, field by field at
/// the top level: a field local left untouched since `original` adopts
/// whatever `updated` now holds for it (including removal); a field local
/// did touch keeps local's value regardless of what upstream did to it.
/// Nested structures (e.g. `metadata`) are compared, not merged, at this
/// level — a local edit anywhere inside `metadata` keeps the whole local
/// `metadata` object (see DESIGN.md's merge-granularity decision).
fn merge_resource_content(original: Option<&Value>, updated: &Value, dest: &Value) -> Value {
    let empty = serde_json::Map::new();
    let o_obj = original.and_then(|v| v.as_object()).unwrap_or(&empty);
    let u_obj = updated.as_object().unwrap_or(&empty);
    let l_obj = dest.as_object().unwrap_or(&empty);

    let mut keys = Vec::new();
    let mut seen = HashSet::new();
    for key in l_obj.keys().chain(u_obj.keys()).chain(o_obj.keys()) {
        if seen.insert(key.clone()) {
            keys.push(key.clone());
        }
    }

    let mut merged = serde_json::Map::new();
    for key in keys {
        let ov = o_obj.get(&key);
        let uv = u_obj.get(&key);
        let lv = l_obj.get(&key);
        let local_changed = ov != lv;
        if !local_changed {
            if let Some(uv) = uv {
                merged.insert(key, uv.clone());
            }
        } else if let Some(lv) = lv {
            merged.insert(key, lv.clone());
        }
    }
    Value::Object(merged)
}

/// Drives one 3-way merge of `original`/`updated` into `dest` (spec.md
/// §4.5).
pub struct ThreeWayMerger {
    include_subpackages: bool,
    path_mode: bool,
}

impl Default for ThreeWayMerger {
    fn default() -> Self {
        Self {
            include_subpackages: true,
            path_mode: false,
        }
    }
}

impl ThreeWayMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// When `false`, subpackages `dest` already has are excluded from the
    /// `original`/`updated` streams — `dest`'s own boundary governs what
    /// gets merged here, and nested packages are merged independently.
    pub fn include_subpackages(mut self, include: bool) -> Self {
        self.include_subpackages = include;
        self
    }

    pub fn path_mode(mut self, enabled: bool) -> Self {
        self.path_mode = enabled;
        self
    }

    pub fn merge(&self, original: &Path, updated: &Path, dest: &Path) -> Result<MergeOutcome> {
        let exclusions: Vec<PathBuf> = if self.include_subpackages {
            Vec::new()
        } else {
            package::all_existing_subpackages(dest)?
        };

        let (o_resources, o_manifest, _o_passthrough) = self.read_tree(original, "original", &exclusions)?;
        let (u_resources, u_manifest, u_passthrough) = self.read_tree(updated, "updated", &exclusions)?;
        let (l_resources, l_manifest, l_passthrough) = self.read_tree(dest, "dest", &[])?;

        let dest_paths: BTreeSet<String> = package::load_file_map(dest)
            .map_err(|e| self.source_error("dest", dest, e))?
            .into_keys()
            .collect();

        let o_map = self.index(&o_resources);
        let u_map = self.index(&u_resources);
        let l_map = self.index(&l_resources);

        let mut seen = HashSet::new();
        let mut ordered_ids = Vec::new();
        for resource in o_resources.iter().chain(u_resources.iter()).chain(l_resources.iter()) {
            if let Some(id) = identity_of(resource, self.path_mode) {
                if seen.insert(id.clone()) {
                    ordered_ids.push(id);
                }
            }
        }

        let mut merged_resources = Vec::new();
        for id in ordered_ids {
            let o = o_map.get(&id);
            let u = u_map.get(&id);
            let l = l_map.get(&id);
            let action = decide(o.is_some(), u.is_some(), l.is_some(), || match (o, l) {
                (Some(o), Some(l)) => o.content == l.content && o.user_annotations() == l.user_annotations(),
                _ => false,
            });

            match action {
                MergeAction::Skip => {}
                MergeAction::KeepDest => merged_resources.push((*l.expect("KeepDest implies dest")).clone()),
                MergeAction::KeepUpdated => merged_resources.push((*u.expect("KeepUpdated implies updated")).clone()),
                MergeAction::Merge => {
                    let u = u.expect("Merge implies updated present");
                    let l = l.expect("Merge implies dest present");
                    let mut resource = (*l).clone();
                    resource.content = merge_resource_content(o.map(|r| &r.content), &u.content, &l.content);
                    resource.raw = None;
                    merged_resources.push(resource);
                }
            }
        }

        let manifest = self.merge_manifest(o_manifest.as_ref(), u_manifest.as_ref(), l_manifest.as_ref());

        let mut passthrough = l_passthrough;
        for (path, bytes) in u_passthrough {
            passthrough.entry(path).or_insert(bytes);
        }

        let output_paths: BTreeSet<&str> = merged_resources.iter().filter_map(|r| r.path()).collect();
        let mut pruned: Vec<String> = dest_paths
            .into_iter()
            .filter(|p| {
                p != package::MANIFEST_FILE_NAME && !output_paths.contains(p.as_str()) && !passthrough.contains_key(p)
            })
            .collect();
        pruned.sort();

        Ok(MergeOutcome {
            resources: merged_resources,
            manifest,
            passthrough,
            pruned,
        })
    }

    fn read_tree(
        &self,
        root: &Path,
        source: &str,
        exclusions: &[PathBuf],
    ) -> Result<(Vec<Resource>, Option<Manifest>, FileMap)> {
        let mut file_map = package::load_file_map(root).map_err(|e| self.source_error(source, root, e))?;
        if !exclusions.is_empty() {
            file_map.retain(|path, _| {
                !exclusions.iter().any(|excluded| {
                    let excluded = excluded.to_string_lossy().into_owned();
                    *path == excluded || path.starts_with(&format!("{}/", excluded))
                })
            });
        }

        let (mut resources, passthrough) = ResourceStore::read(&file_map).map_err(|e| self.source_error(source, root, e))?;
        resources.retain(|r| r.kind() != Some(kpt_core::manifest::KIND));

        let manifest = package::load_package(root, source)
            .map_err(|e| self.source_error(source, root, e))?
            .manifest;

        Ok((resources, manifest, passthrough))
    }

    fn index<'a>(&self, resources: &'a [Resource]) -> HashMap<ResourceId, &'a Resource> {
        let mut map = HashMap::new();
        for resource in resources {
            if let Some(id) = identity_of(resource, self.path_mode) {
                map.insert(id, resource);
            }
        }
        map
    }

    /// Phase C: the manifest is merged, but `upstream`/`upstreamLock` are
    /// always taken from `updated`.
    fn merge_manifest(
        &self,
        _original: Option<&Manifest>,
        updated: Option<&Manifest>,
        dest: Option<&Manifest>,
    ) -> Option<Manifest> {
        let mut manifest = dest.or(updated).cloned()?;
        if let Some(updated) = updated {
            manifest.upstream = updated.upstream.clone();
            manifest.upstream_lock = updated.upstream_lock.clone();
        }
        Some(manifest)
    }

    fn source_error(&self, source_tree: &str, path: &Path, source: CoreError) -> HydrateError {
        HydrateError::MergeSource {
            source_tree: source_tree.to_string(),
            path: path.display().to_string(),
            message: source.to_string(),
        }
    }
}

/// The merged tree, ready for Phase D write-back.
pub struct MergeOutcome {
    pub resources: Vec<Resource>,
    pub manifest: Option<Manifest>,
    pub passthrough: FileMap,
    /// Paths that existed in `dest` before the merge but carry no resource
    /// (and no passthrough file) in the merged output.
    pub pruned: Vec<String>,
}

impl MergeOutcome {
    /// Writes the merged tree to `dest` (Phase D), removing paths the merge
    /// pruned.
    pub fn write_to(&self, dest: &Path) -> Result<()> {
        let mut file_map = ResourceStore::write(&self.resources, &self.passthrough)?;
        if let Some(manifest) = &self.manifest {
            file_map.insert(package::MANIFEST_FILE_NAME.to_string(), manifest.to_yaml()?.into_bytes());
        }

        for (path, bytes) in &file_map {
            let full = dest.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).map_err(CoreError::from)?;
            }
            std::fs::write(&full, bytes).map_err(CoreError::from)?;
        }
        for path in &self.pruned {
            let _ = std::fs::remove_file(dest.join(path));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn package(dir: &Path, name: &str) {
        std::fs::write(
            dir.join("Kptfile"),
            format!("apiVersion: kpt.dev/v1\nkind: Kptfile\nmetadata:\n  name: {}\n", name),
        )
        .unwrap();
    }

    fn cm(dir: &Path, file: &str, name: &str, extra: &str) {
        std::fs::write(
            dir.join(file),
            format!(
                "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: {}\n{}",
                name, extra
            ),
        )
        .unwrap();
    }

    #[test]
    fn local_only_resource_is_kept() {
        let original = TempDir::new().unwrap();
        let updated = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        package(original.path(), "p");
        package(updated.path(), "p");
        package(dest.path(), "p");
        cm(dest.path(), "a.yaml", "a", "data:\n  k: local\n");

        let outcome = ThreeWayMerger::new()
            .merge(original.path(), updated.path(), dest.path())
            .unwrap();
        assert_eq!(outcome.resources.len(), 1);
        assert_eq!(outcome.resources[0].metadata_name(), Some("a"));
        assert!(outcome.pruned.is_empty());
    }

    #[test]
    fn upstream_only_resource_is_added() {
        let original = TempDir::new().unwrap();
        let updated = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        package(original.path(), "p");
        package(updated.path(), "p");
        package(dest.path(), "p");
        cm(updated.path(), "b.yaml", "b", "data:\n  k: upstream\n");

        let outcome = ThreeWayMerger::new()
            .merge(original.path(), updated.path(), dest.path())
            .unwrap();
        assert_eq!(outcome.resources.len(), 1);
        assert_eq!(outcome.resources[0].metadata_name(), Some("b"));
    }

    #[test]
    fn deleted_upstream_and_untouched_locally_is_dropped() {
        let original = TempDir::new().unwrap();
        let updated = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        package(original.path(), "p");
        package(updated.path(), "p");
        package(dest.path(), "p");
        cm(original.path(), "c.yaml", "c", "data:\n  k: orig\n");
        cm(dest.path(), "c.yaml", "c", "data:\n  k: orig\n");

        let outcome = ThreeWayMerger::new()
            .merge(original.path(), updated.path(), dest.path())
            .unwrap();
        assert!(outcome.resources.is_empty());
        assert!(outcome.pruned.contains(&"c.yaml".to_string()));
    }

    #[test]
    fn deleted_upstream_but_locally_edited_is_kept() {
        let original = TempDir::new().unwrap();
        let updated = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        package(original.path(), "p");
        package(updated.path(), "p");
        package(dest.path(), "p");
        cm(original.path(), "c.yaml", "c", "data:\n  k: orig\n");
        cm(dest.path(), "c.yaml", "c", "data:\n  k: edited-locally\n");

        let outcome = ThreeWayMerger::new()
            .merge(original.path(), updated.path(), dest.path())
            .unwrap();
        assert_eq!(outcome.resources.len(), 1);
        assert_eq!(
            outcome.resources[0].content.pointer("/data/k"),
            Some(&serde_json::json!("edited-locally"))
        );
    }

    #[test]
    fn three_way_merge_adopts_untouched_field_from_upstream() {
        let original = TempDir::new().unwrap();
        let updated = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        package(original.path(), "p");
        package(updated.path(), "p");
        package(dest.path(), "p");
        cm(original.path(), "d.yaml", "d", "data:\n  k: orig\n");
        cm(updated.path(), "d.yaml", "d", "data:\n  k: new-upstream\n");
        cm(dest.path(), "d.yaml", "d", "data:\n  k: orig\n");

        let outcome = ThreeWayMerger::new()
            .merge(original.path(), updated.path(), dest.path())
            .unwrap();
        assert_eq!(
            outcome.resources[0].content.pointer("/data/k"),
            Some(&serde_json::json!("new-upstream"))
        );
    }

    #[test]
    fn three_way_merge_keeps_locally_touched_field() {
        let original = TempDir::new().unwrap();
        let updated = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        package(original.path(), "p");
        package(updated.path(), "p");
        package(dest.path(), "p");
        cm(original.path(), "e.yaml", "e", "data:\n  k: orig\n");
        cm(updated.path(), "e.yaml", "e", "data:\n  k: new-upstream\n");
        cm(dest.path(), "e.yaml", "e", "data:\n  k: local-edit\n");

        let outcome = ThreeWayMerger::new()
            .merge(original.path(), updated.path(), dest.path())
            .unwrap();
        assert_eq!(
            outcome.resources[0].content.pointer("/data/k"),
            Some(&serde_json::json!("local-edit"))
        );
    }

    #[test]
    fn kptfile_upstream_fields_always_come_from_updated() {
        let original = TempDir::new().unwrap();
        let updated = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        std::fs::write(
            original.path().join("Kptfile"),
            "apiVersion: kpt.dev/v1\nkind: Kptfile\nmetadata:\n  name: p\n",
        )
        .unwrap();
        std::fs::write(
            updated.path().join("Kptfile"),
            "apiVersion: kpt.dev/v1\nkind: Kptfile\nmetadata:\n  name: p\nupstreamLock:\n  type: git\n  commit: newsha\n",
        )
        .unwrap();
        std::fs::write(
            dest.path().join("Kptfile"),
            "apiVersion: kpt.dev/v1\nkind: Kptfile\nmetadata:\n  name: p\nupstreamLock:\n  type: git\n  commit: oldsha\n",
        )
        .unwrap();

        let outcome = ThreeWayMerger::new()
            .merge(original.path(), updated.path(), dest.path())
            .unwrap();
        let manifest = outcome.manifest.unwrap();
        assert_eq!(manifest.upstream_lock.unwrap().commit, "newsha");
    }
}
