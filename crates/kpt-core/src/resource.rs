//! The `Resource` type: one structured document plus its housekeeping
//! annotations and the side-table of line comments that must survive
//! round-trips (§3 of the spec).

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::annotations::internal;
use crate::error::{CoreError, Result};

/// Tags a resource as an ordinary document or one of the two kinds the
/// engine treats specially. See SPEC_FULL.md §9 "Sum type for resources".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    Plain,
    Kptfile,
    ResourceList,
}

/// A single line comment attached at a YAML path within a document.
///
/// `yaml_path` is a dotted path like `metadata` or `spec.template.metadata`;
/// only `metadata`-level comments are used by the merge-key engine today,
/// but the side-table is general so future housekeeping comments have a
/// home without inventing a second mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineComment {
    pub yaml_path: String,
    pub text: String,
}

/// One structured document read from a package.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Parsed document content (apiVersion/kind/metadata/... as JSON).
    pub content: JsonValue,
    /// Ordered annotation bag, including housekeeping entries while the
    /// resource is in flight; stripped on write.
    pub annotations: IndexMap<String, String>,
    /// Line comments keyed by YAML path, notably the `kpt-merge:` comment.
    pub comments: Vec<LineComment>,
    /// Raw bytes of the document as read, kept so an untouched resource can
    /// be re-emitted byte-for-byte (see DESIGN.md's comment-preservation
    /// decision). `None` once a mutator has rewritten `content`.
    pub raw: Option<String>,
    pub kind_tag: ManifestKind,
}

impl Resource {
    pub fn from_value(content: JsonValue) -> Self {
        let kind_tag = match content.get("kind").and_then(|k| k.as_str()) {
            Some("Kptfile") => ManifestKind::Kptfile,
            Some("ResourceList") => ManifestKind::ResourceList,
            _ => ManifestKind::Plain,
        };
        Self {
            content,
            annotations: IndexMap::new(),
            comments: Vec::new(),
            raw: None,
            kind_tag,
        }
    }

    pub fn api_version(&self) -> Option<&str> {
        self.content.get("apiVersion").and_then(|v| v.as_str())
    }

    pub fn kind(&self) -> Option<&str> {
        self.content.get("kind").and_then(|v| v.as_str())
    }

    /// Group portion of `apiVersion` (empty string for the core group, e.g.
    /// `apiVersion: v1` has no group while `apps/v1` has group `apps`).
    pub fn group(&self) -> &str {
        match self.api_version() {
            Some(av) if av.contains('/') => av.split('/').next().unwrap_or(""),
            _ => "",
        }
    }

    pub fn is_krm(&self) -> bool {
        self.api_version().is_some() && self.kind().is_some()
    }

    pub fn metadata_name(&self) -> Option<&str> {
        self.content.pointer("/metadata/name").and_then(|v| v.as_str())
    }

    pub fn metadata_namespace(&self) -> Option<&str> {
        self.content
            .pointer("/metadata/namespace")
            .and_then(|v| v.as_str())
    }

    pub fn has_metadata(&self) -> bool {
        self.content
            .get("metadata")
            .map(|m| m.is_object())
            .unwrap_or(false)
    }

    pub fn merge_comment(&self) -> Option<&LineComment> {
        self.comments.iter().find(|c| c.yaml_path == "metadata")
    }

    pub fn set_merge_comment(&mut self, text: String) {
        if let Some(existing) = self.comments.iter_mut().find(|c| c.yaml_path == "metadata") {
            existing.text = text;
        } else {
            self.comments.push(LineComment {
                yaml_path: "metadata".to_string(),
                text,
            });
        }
        // Any mutation to the comment side-table invalidates byte-identical
        // passthrough; the store must re-render this resource on write.
        self.raw = None;
    }

    pub fn path(&self) -> Option<&str> {
        self.annotations.get(internal::PATH).map(|s| s.as_str())
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        let path = path.into();
        self.annotations
            .insert(crate::annotations::public::PATH.to_string(), path.clone());
        self.annotations.insert(internal::PATH.to_string(), path);
    }

    pub fn index(&self) -> Option<usize> {
        self.annotations
            .get(internal::INDEX)
            .and_then(|s| s.parse().ok())
    }

    pub fn set_index(&mut self, index: usize) {
        self.annotations
            .insert(crate::annotations::public::INDEX.to_string(), index.to_string());
        self.annotations
            .insert(internal::INDEX.to_string(), index.to_string());
    }

    /// Strip every housekeeping annotation (used on C1 write and before any
    /// equivalence comparison in C5).
    pub fn strip_housekeeping(&mut self) {
        for key in crate::annotations::HOUSEKEEPING_KEYS {
            self.annotations.shift_remove(*key);
        }
    }

    /// Annotations excluding housekeeping, as a stable `BTreeMap` for
    /// equality comparisons.
    pub fn user_annotations(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        for (k, v) in &self.annotations {
            if !crate::annotations::HOUSEKEEPING_KEYS.contains(&k.as_str()) {
                map.insert(k.clone(), v.clone());
            }
        }
        map
    }

    pub fn get_annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(|s| s.as_str())
    }

    pub fn set_annotation(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.annotations.insert(key.into(), value.into());
        self.raw = None;
    }

    /// Validate that, after path adjustment, this resource's path stays
    /// within the render root (I1/I2, §4.4 step 4).
    pub fn validate_path_within_root(&self) -> Result<()> {
        match self.path() {
            Some(p) if !p.is_empty() && !p.starts_with("..") && !p.starts_with('/') => Ok(()),
            Some(p) => Err(CoreError::PathEscape { path: p.to_string() }),
            None => Err(CoreError::PathEscape {
                path: String::new(),
            }),
        }
    }
}
