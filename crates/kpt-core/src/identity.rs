//! Merge-key engine (C3): stable resource identity across versions.
//!
//! Grounded on the donor's small dedicated-serde-module pattern
//! (`pack::version_serde`) for encoding one structured concern; here the
//! concern is the `kpt-merge: <ns>/<name>` line comment on `metadata`.

use crate::resource::Resource;

/// Namespace used for resources explicitly marked non-namespaced.
pub const NON_NAMESPACED: &str = "~C";

/// Default namespace substituted for an empty one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Built-in Kinds the Kubernetes API itself declares to have no namespace.
/// A resource of one of these Kinds is "explicitly tagged as non-namespaced"
/// (spec.md §4.3) by virtue of its Kind alone, distinct from an ordinary
/// namespaced resource that simply omits `metadata.namespace`.
const CLUSTER_SCOPED_KINDS: &[&str] = &[
    "Namespace",
    "Node",
    "PersistentVolume",
    "ClusterRole",
    "ClusterRoleBinding",
    "CustomResourceDefinition",
    "StorageClass",
    "PriorityClass",
    "APIService",
    "MutatingWebhookConfiguration",
    "ValidatingWebhookConfiguration",
    "CertificateSigningRequest",
    "RuntimeClass",
    "VolumeAttachment",
];

fn is_cluster_scoped(kind: &str) -> bool {
    CLUSTER_SCOPED_KINDS.contains(&kind)
}

/// Stable identity for a resource, per spec.md §4.3.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    pub group: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
    /// Only populated/compared when "path mode" is enabled.
    pub path: Option<String>,
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.group, self.kind, self.namespace, self.name
        )
    }
}

/// Parses a `kpt-merge: <ns>/<name>` comment body (the part after the
/// `kpt-merge: ` prefix).
fn parse_merge_comment(text: &str) -> Option<(String, String)> {
    let body = text.strip_prefix("kpt-merge:")?.trim();
    let (ns, name) = body.split_once('/')?;
    Some((ns.to_string(), name.to_string()))
}

fn format_merge_comment(namespace: &str, name: &str) -> String {
    format!("kpt-merge: {}/{}", namespace, name)
}

/// Compute identity namespace/name for a resource: merge comment wins,
/// otherwise `metadata.namespace`/`metadata.name`, with empty-namespace
/// normalization (spec.md §4.3).
fn identity_namespace_name(resource: &Resource) -> Option<(String, String)> {
    let kind = resource.kind().unwrap_or_default();
    if let Some(comment) = resource.merge_comment() {
        if let Some((ns, name)) = parse_merge_comment(&comment.text) {
            return Some((normalize_namespace(kind, &ns), name));
        }
    }
    let name = resource.metadata_name()?.to_string();
    let namespace = normalize_namespace(kind, resource.metadata_namespace().unwrap_or(""));
    Some((namespace, name))
}

/// Empty namespace normalizes to `default`, unless `kind` is one of the
/// Kubernetes API's built-in cluster-scoped Kinds, in which case it
/// normalizes to the literal `~C` (spec.md §4.3). A non-empty namespace
/// (including an already-stamped `~C` read back from a merge comment)
/// passes through unchanged.
fn normalize_namespace(kind: &str, ns: &str) -> String {
    if !ns.is_empty() {
        ns.to_string()
    } else if is_cluster_scoped(kind) {
        NON_NAMESPACED.to_string()
    } else {
        DEFAULT_NAMESPACE.to_string()
    }
}

/// Compute a resource's identity, honoring "path mode" if requested.
/// Returns `None` for resources with no metadata at all (non-KRM documents
/// are skipped per spec.md §4.3).
pub fn identity_of(resource: &Resource, path_mode: bool) -> Option<ResourceId> {
    if !resource.has_metadata() {
        return None;
    }
    let (namespace, name) = identity_namespace_name(resource)?;
    let kind = resource.kind()?.to_string();
    let group = resource.group().to_string();
    Some(ResourceId {
        group,
        kind,
        namespace,
        name,
        path: if path_mode {
            resource.path().map(|s| s.to_string())
        } else {
            None
        },
    })
}

/// Engine applying the merge-comment-insertion and upstream-identifier
/// publication rules (§4.3, reused by the §4.8 collaborator of the same
/// name).
pub struct MergeKeyEngine;

impl MergeKeyEngine {
    /// Ensure `resource` carries a merge comment and an
    /// `upstream-identifier` annotation. A no-op if both already exist with
    /// matching content (round-trip law: "adding a merge comment to a
    /// resource that already has one is a no-op").
    pub fn ensure_identity(resource: &mut Resource) {
        if !resource.has_metadata() {
            return;
        }
        let kind = resource.kind().unwrap_or_default().to_string();
        let existing_comment = resource.merge_comment().cloned();
        let (namespace, name) = match existing_comment
            .as_ref()
            .and_then(|c| parse_merge_comment(&c.text))
        {
            Some((ns, name)) => (normalize_namespace(&kind, &ns), name),
            None => {
                let name = match resource.metadata_name() {
                    Some(n) => n.to_string(),
                    None => return,
                };
                let namespace =
                    normalize_namespace(&kind, resource.metadata_namespace().unwrap_or(""));
                (namespace, name)
            }
        };

        if existing_comment.is_none() {
            resource.set_merge_comment(format_merge_comment(&namespace, &name));
        }

        let group = resource.group().to_string();
        let identifier = format!("{}|{}|{}|{}", group, kind, namespace, name);
        if resource.get_annotation(crate::annotations::UPSTREAM_IDENTIFIER) != Some(identifier.as_str())
        {
            resource.set_annotation(crate::annotations::UPSTREAM_IDENTIFIER, identifier);
        }
    }
}
