//! Resource Store (C1): translates a package's file→content map to and
//! from an ordered resource stream (spec.md §4.1).
//!
//! Grounded on `files::{FileProvider, MockFileProvider}` for the carrier and
//! on `pack::LoadedPack::load`'s single-document `serde_yaml::from_str` for
//! the individual-document parse step, extended here to multi-document
//! files via `serde_yaml::Deserializer`.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result};
use crate::package::MANIFEST_FILE_NAME;
use crate::resource::Resource;

/// A package's raw file contents, keyed by path relative to the package
/// root. `BTreeMap` for deterministic iteration (grouping-by-path on write
/// must be stable across runs for P1 identity).
pub type FileMap = BTreeMap<String, Vec<u8>>;

fn is_yaml_path(path: &str) -> bool {
    path.ends_with(".yaml") || path.ends_with(".yml") || path.rsplit('/').next() == Some(MANIFEST_FILE_NAME)
}

/// The document separator convention this store uses to split/join
/// multi-document files while preserving per-document raw bytes for
/// untouched resources (see DESIGN.md's comment-preservation decision).
const DOC_SEPARATOR: &str = "\n---\n";

fn split_documents(text: &str) -> Vec<String> {
    // A leading "---" marks an explicit start-of-stream and is not itself a
    // separator; strip it before splitting so we don't emit a spurious
    // empty leading document.
    let trimmed = text.strip_prefix("---\n").unwrap_or(text);
    trimmed
        .split(DOC_SEPARATOR)
        .map(|s| s.to_string())
        .filter(|s| !s.trim().is_empty())
        .collect()
}

pub struct ResourceStore;

impl ResourceStore {
    /// Parses every YAML/`Kptfile` in `contents` into resources, carrying
    /// every other file through untouched. Returns the resources plus the
    /// passthrough (non-YAML) file map (spec.md §4.1).
    pub fn read(contents: &FileMap) -> Result<(Vec<Resource>, FileMap)> {
        let mut resources = Vec::new();
        let mut passthrough = FileMap::new();

        for (path, bytes) in contents {
            if !is_yaml_path(path) {
                passthrough.insert(path.clone(), bytes.clone());
                continue;
            }

            let text = String::from_utf8_lossy(bytes).to_string();
            let docs = split_documents(&text);
            for (index, doc_text) in docs.iter().enumerate() {
                let value: JsonValue = serde_yaml::from_str(doc_text).map_err(|source| {
                    CoreError::MalformedYaml {
                        path: path.clone(),
                        source,
                    }
                })?;

                let mut resource = Resource::from_value(value);
                resource.raw = Some(doc_text.clone());
                resource.comments = extract_line_comments(doc_text);
                resource.set_path(path.clone());
                if docs.len() > 1 {
                    resource.set_index(index);
                }
                resources.push(resource);
            }
        }

        Ok((resources, passthrough))
    }

    /// Groups `resources` by their `path` annotation and re-renders each
    /// group as one document stream, merging back in `passthrough` files
    /// unchanged. Housekeeping annotations are cleared on the way out.
    pub fn write(resources: &[Resource], passthrough: &FileMap) -> Result<FileMap> {
        let mut by_path: BTreeMap<String, Vec<&Resource>> = BTreeMap::new();
        for resource in resources {
            let path = resource
                .path()
                .ok_or_else(|| CoreError::PathEscape {
                    path: String::new(),
                })?
                .to_string();
            by_path.entry(path).or_default().push(resource);
        }

        let mut out = FileMap::new();
        for (path, mut group) in by_path {
            group.sort_by_key(|r| r.index().unwrap_or(0));
            let mut docs = Vec::with_capacity(group.len());
            for resource in &group {
                docs.push(render_document(resource)?);
            }
            out.insert(path, docs.join("---\n").into_bytes());
        }

        for (path, bytes) in passthrough {
            out.insert(path.clone(), bytes.clone());
        }

        Ok(out)
    }
}

/// Renders one resource back to YAML text. If the resource still carries
/// its original `raw` bytes (no mutator touched it and the merge-comment
/// side-table matches what is already embedded), that text is re-emitted
/// byte-for-byte; otherwise the content is re-serialized and the tracked
/// line comments are spliced back in at their YAML path.
fn render_document(resource: &Resource) -> Result<String> {
    let mut stripped = resource.clone();
    stripped.strip_housekeeping();

    if let Some(raw) = &resource.raw {
        return Ok(raw.clone());
    }

    let mut text = serde_yaml::to_string(&stripped.content)?;
    for comment in &resource.comments {
        text = splice_comment(&text, &comment.yaml_path, &comment.text);
    }
    Ok(text)
}

/// Inserts `# <text>` immediately after the line introducing `yaml_path`'s
/// top-level key (only top-level keys are supported, which is sufficient
/// for the one comment this engine manages: the `metadata:` merge comment).
fn splice_comment(text: &str, yaml_path: &str, comment_text: &str) -> String {
    let needle = format!("{}:", yaml_path);
    let mut out = String::with_capacity(text.len() + comment_text.len() + 8);
    let mut spliced = false;
    for line in text.lines() {
        out.push_str(line);
        if !spliced && line.trim_end() == needle {
            out.push_str(&format!(" # {}", comment_text));
            spliced = true;
        }
        out.push('\n');
    }
    out
}

/// Pulls `# kpt-merge: ...` (and any other top-level trailing comment on a
/// known key) out of raw YAML text into the resource's comment side-table.
fn extract_line_comments(doc_text: &str) -> Vec<crate::resource::LineComment> {
    let mut comments = Vec::new();
    for line in doc_text.lines() {
        let trimmed = line.trim_start();
        if let Some(colon) = trimmed.find(':') {
            let key = trimmed[..colon].trim();
            if key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
                if let Some(hash) = line.find('#') {
                    let comment_text = line[hash + 1..].trim().to_string();
                    if !comment_text.is_empty() {
                        comments.push(crate::resource::LineComment {
                            yaml_path: key.to_string(),
                            text: comment_text,
                        });
                    }
                }
            }
        }
    }
    comments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_map(pairs: &[(&str, &str)]) -> FileMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
            .collect()
    }

    #[test]
    fn read_single_document_sets_path() {
        let contents = file_map(&[("deployment.yaml", "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: d\n")]);
        let (resources, passthrough) = ResourceStore::read(&contents).unwrap();
        assert_eq!(resources.len(), 1);
        assert!(passthrough.is_empty());
        assert_eq!(resources[0].path(), Some("deployment.yaml"));
        assert_eq!(resources[0].index(), None);
    }

    #[test]
    fn read_multi_document_file_assigns_index() {
        let text = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: b\n";
        let contents = file_map(&[("multi.yaml", text)]);
        let (resources, _) = ResourceStore::read(&contents).unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].index(), Some(0));
        assert_eq!(resources[1].index(), Some(1));
    }

    #[test]
    fn non_yaml_files_pass_through_unchanged() {
        let contents = file_map(&[("README.md", "hello")]);
        let (resources, passthrough) = ResourceStore::read(&contents).unwrap();
        assert!(resources.is_empty());
        assert_eq!(passthrough.get("README.md").unwrap(), b"hello");
    }

    #[test]
    fn round_trip_is_noop_modulo_housekeeping() {
        let original = "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: d\n";
        let contents = file_map(&[("deployment.yaml", original)]);
        let (resources, passthrough) = ResourceStore::read(&contents).unwrap();
        let out = ResourceStore::write(&resources, &passthrough).unwrap();
        assert_eq!(
            String::from_utf8(out.get("deployment.yaml").unwrap().clone()).unwrap(),
            original
        );
    }

    #[test]
    fn mutated_resource_is_reserialized_with_comment_spliced_in() {
        let mut resource = Resource::from_value(serde_json::json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "d", "namespace": "default"}
        }));
        resource.set_path("d.yaml");
        resource.set_merge_comment("kpt-merge: default/d".to_string());
        resource.raw = None; // simulate "touched by a mutator"

        let mut resources = vec![resource];
        let out = ResourceStore::write(&resources, &FileMap::new()).unwrap();
        let text = String::from_utf8(out.get("d.yaml").unwrap().clone()).unwrap();
        assert!(text.contains("kpt-merge: default/d"));
        resources.clear();
    }
}
