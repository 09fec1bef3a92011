//! The three pluggable collaborators woven through the hydration engine and
//! merger (spec.md §4.8): package-context generation, merge-comment
//! insertion, and attribution annotation.
//!
//! Grounded on `sherpack-kube::annotations` module's constant-namespace-plus-
//! helper-function layout; here those constants live in `kpt_core::annotations`
//! and this module supplies the three mutations themselves.

use kpt_core::annotations::{self, ATTRIBUTION};
use kpt_core::identity::MergeKeyEngine;
use kpt_core::{Manifest, Resource};
use serde_json::{json, Value};

pub const PACKAGE_CONTEXT_FILE_NAME: &str = "package-context.yaml";
const PACKAGE_CONTEXT_NAME: &str = "kptfile.kpt.dev";

/// Produces the `package-context.yaml` sibling resource (§4.8 bullet 1).
/// Existing context resources must be discarded by the caller before
/// regeneration; this function only builds the replacement.
pub fn package_context(manifest: &Manifest, package_path: Option<&str>) -> Resource {
    let mut data = serde_json::Map::new();
    data.insert("name".to_string(), json!(manifest.metadata.name));
    if let Some(path) = package_path {
        data.insert("package-path".to_string(), json!(path));
    }

    let mut resource = Resource::from_value(json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {
            "name": PACKAGE_CONTEXT_NAME,
            "annotations": {
                "config.kubernetes.io/local-config": "true",
            },
        },
        "data": data,
    }));
    resource.set_path(PACKAGE_CONTEXT_FILE_NAME);
    resource
}

/// Whether a resource is a generated package-context `ConfigMap`, used to
/// discard stale copies before regeneration.
pub fn is_package_context(resource: &Resource) -> bool {
    resource.kind() == Some("ConfigMap") && resource.metadata_name() == Some(PACKAGE_CONTEXT_NAME)
}

/// Merge-comment insertion (§4.8 bullet 2): delegates to the merge-key
/// engine for every resource carrying metadata.
pub fn insert_merge_comments(resources: &mut [Resource]) {
    for resource in resources.iter_mut() {
        MergeKeyEngine::ensure_identity(resource);
    }
}

/// Attribution annotation (§4.8 bullet 3): add or extend `blueprint` with
/// the invoking command group, deduplicating entries. Honors
/// `KPT_NO_ATTRIBUTION`.
///
/// Unlike the `internal.config.kubernetes.io/*` housekeeping keys, `blueprint`
/// is user-visible provenance and must survive into the written YAML, so it
/// is written straight into `metadata.annotations` rather than the
/// housekeeping side-table the store strips on write.
pub fn apply_attribution(resources: &mut [Resource], command_group: &str) {
    if annotations::attribution_opted_out() {
        return;
    }
    for resource in resources.iter_mut() {
        if !resource.has_metadata() {
            continue;
        }
        let existing = resource
            .content
            .pointer(&format!("/metadata/annotations/{ATTRIBUTION}"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let mut groups: Vec<String> = existing
            .map(|existing| existing.split(',').map(str::trim).map(String::from).collect())
            .unwrap_or_default();
        if !groups.iter().any(|g| g == command_group) {
            groups.push(command_group.to_string());
        }

        let metadata = resource
            .content
            .get_mut("metadata")
            .and_then(Value::as_object_mut)
            .expect("has_metadata checked above");
        metadata
            .entry("annotations")
            .or_insert_with(|| json!({}))
            .as_object_mut()
            .expect("annotations is always an object once inserted")
            .insert(ATTRIBUTION.to_string(), json!(groups.join(",")));
        resource.raw = None;
    }
}
