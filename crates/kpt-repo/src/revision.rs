//! Package revision identity and content (spec.md §3 "Package Revision").
//!
//! Grounded on `sherpack-repo::index::PackEntry`'s flat metadata-record shape
//! (one struct per catalogued unit, `Default`-derivable, label/annotation
//! maps as plain `BTreeMap`s), retargeted from a Helm index entry to an
//! immutable-once-published package snapshot.

use std::collections::BTreeMap;

use kpt_core::manifest::Manifest;
use kpt_core::store::FileMap;

use crate::lifecycle::Lifecycle;

/// Identifies one package revision: *(repository, package path, revision
/// label, workspace name)* per spec.md §3.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RevisionKey {
    pub repository: String,
    pub package_path: String,
    pub revision: String,
    pub workspace: String,
}

impl std::fmt::Display for RevisionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}@{}#{}",
            self.repository, self.package_path, self.revision, self.workspace
        )
    }
}

/// Identifies a package (aggregated across its revisions) within a
/// repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageIdentity {
    pub repository: String,
    pub path: String,
}

/// Reserved label keys the cache publishes on a revision's public form
/// (spec.md §6 "Cache observable state").
pub mod label {
    pub const LATEST_REVISION: &str = "latest-revision";
    pub const LIFECYCLE: &str = "kpt.dev/lifecycle";
}

/// An immutable-once-published snapshot of a package (spec.md §3).
#[derive(Debug, Clone)]
pub struct PackageRevision {
    pub key: RevisionKey,
    pub lifecycle: Lifecycle,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub manifest: Option<Manifest>,
    pub resources: FileMap,
}

impl PackageRevision {
    pub fn new(key: RevisionKey) -> Self {
        Self {
            key,
            lifecycle: Lifecycle::Draft,
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            manifest: None,
            resources: FileMap::new(),
        }
    }

    /// The public form exposed to cache readers: a private copy with the
    /// `latest-revision`/lifecycle labels injected, never mutating the
    /// stored object (spec.md §4.7 "without mutating the stored object").
    pub fn with_labels(&self, extra: &[(&str, String)]) -> Self {
        let mut copy = self.clone();
        for (key, value) in extra {
            copy.labels.insert((*key).to_string(), value.clone());
        }
        copy
    }

    /// The numeric part of the revision label if it matches `vN`, used by
    /// latest/next-revision computation (spec.md §4.7).
    pub fn version_number(&self) -> Option<u64> {
        self.key
            .revision
            .strip_prefix('v')
            .filter(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
            .and_then(|rest| rest.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(revision: &str) -> RevisionKey {
        RevisionKey {
            repository: "repo".to_string(),
            package_path: "pkg".to_string(),
            revision: revision.to_string(),
            workspace: "main".to_string(),
        }
    }

    #[test]
    fn version_number_parses_v_prefixed_labels() {
        assert_eq!(PackageRevision::new(key("v3")).version_number(), Some(3));
        assert_eq!(PackageRevision::new(key("draft-1")).version_number(), None);
        assert_eq!(PackageRevision::new(key("v")).version_number(), None);
    }

    #[test]
    fn with_labels_does_not_mutate_original() {
        let original = PackageRevision::new(key("v1"));
        let public = original.with_labels(&[(label::LATEST_REVISION, "true".to_string())]);
        assert!(!original.labels.contains_key(label::LATEST_REVISION));
        assert_eq!(public.labels.get(label::LATEST_REVISION), Some(&"true".to_string()));
    }
}
