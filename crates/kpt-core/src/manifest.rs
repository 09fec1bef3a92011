//! The `Kptfile` manifest model (spec.md §3 "Manifest (Kptfile)", §6
//! "External Interfaces").
//!
//! Grounded on the donor's `pack::Pack`/`PackMetadata` shape: camelCase
//! serde, liberal `#[serde(default)]` on optional fields, a distinguished
//! required-fields check performed by the loader rather than by serde.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

pub const API_VERSION: &str = "kpt.dev/v1";
pub const KIND: &str = "Kptfile";

/// Selector/exclusion shape reused by both fields of a function spec
/// (spec.md §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceSelector {
    #[serde(default, rename = "apiVersion")]
    pub api_version: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl ResourceSelector {
    /// Whether a resource's content matches this selector. An unset field
    /// matches anything; all set fields must match (AND semantics).
    pub fn matches(&self, content: &serde_json::Value) -> bool {
        if let Some(av) = &self.api_version {
            if content.get("apiVersion").and_then(|v| v.as_str()) != Some(av.as_str()) {
                return false;
            }
        }
        if let Some(kind) = &self.kind {
            if content.get("kind").and_then(|v| v.as_str()) != Some(kind.as_str()) {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if content.pointer("/metadata/name").and_then(|v| v.as_str()) != Some(name.as_str()) {
                return false;
            }
        }
        if let Some(ns) = &self.namespace {
            if content
                .pointer("/metadata/namespace")
                .and_then(|v| v.as_str())
                != Some(ns.as_str())
            {
                return false;
            }
        }
        for (k, v) in &self.labels {
            let found = content
                .pointer(&format!("/metadata/labels/{}", k))
                .and_then(|value| value.as_str());
            if found != Some(v.as_str()) {
                return false;
            }
        }
        for (k, v) in &self.annotations {
            let found = content
                .pointer(&format!("/metadata/annotations/{}", k))
                .and_then(|value| value.as_str());
            if found != Some(v.as_str()) {
                return false;
            }
        }
        true
    }
}

/// One entry of `pipeline.mutators`/`pipeline.validators` (spec.md §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FunctionSpec {
    pub image: String,
    #[serde(default, rename = "configMap")]
    pub config_map: Option<BTreeMap<String, String>>,
    #[serde(default, rename = "configPath")]
    pub config_path: Option<String>,
    #[serde(default)]
    pub selectors: Vec<ResourceSelector>,
    #[serde(default)]
    pub exclusions: Vec<ResourceSelector>,
    #[serde(default)]
    pub exec: Option<String>,
}

/// The pair of mutator/validator sequences (spec.md §3 "Function Pipeline").
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Pipeline {
    #[serde(default)]
    pub mutators: Vec<FunctionSpec>,
    #[serde(default)]
    pub validators: Vec<FunctionSpec>,
}

impl Pipeline {
    pub fn is_empty(&self) -> bool {
        self.mutators.is_empty() && self.validators.is_empty()
    }
}

/// Update strategy, spec.md §3.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateStrategy {
    #[default]
    ResourceMerge,
    FastForward,
    ForceDeleteReplace,
}

/// Upstream type: Git or OCI (spec.md §3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamType {
    Git,
    Oci,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GitUpstream {
    pub repo: String,
    #[serde(default)]
    pub directory: String,
    #[serde(rename = "ref")]
    pub ref_: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OciUpstream {
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Upstream {
    #[serde(rename = "type")]
    pub upstream_type: UpstreamType,
    #[serde(default)]
    pub git: Option<GitUpstream>,
    #[serde(default)]
    pub oci: Option<OciUpstream>,
    #[serde(default, rename = "updateStrategy")]
    pub update_strategy: UpdateStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpstreamLock {
    #[serde(rename = "type")]
    pub upstream_type: UpstreamType,
    /// Resolved git commit hash or OCI digest.
    pub commit: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ManifestInfo {
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ManifestMetadata {
    pub name: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// The `Kptfile` manifest (spec.md §3, §6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: ManifestMetadata,
    #[serde(default)]
    pub info: Option<ManifestInfo>,
    #[serde(default)]
    pub upstream: Option<Upstream>,
    #[serde(default, rename = "upstreamLock")]
    pub upstream_lock: Option<UpstreamLock>,
    #[serde(default)]
    pub pipeline: Pipeline,
    /// Opaque to the core; passed through untouched.
    #[serde(default)]
    pub inventory: Option<serde_json::Value>,
}

impl Manifest {
    pub fn parse(path: &str, text: &str) -> Result<Self> {
        let manifest: Manifest =
            serde_yaml::from_str(text).map_err(|source| CoreError::MalformedYaml {
                path: path.to_string(),
                source,
            })?;
        manifest.validate(path)?;
        Ok(manifest)
    }

    fn validate(&self, path: &str) -> Result<()> {
        if self.api_version != API_VERSION {
            return Err(CoreError::InvalidManifest {
                path: path.to_string(),
                message: format!(
                    "unsupported apiVersion: {} (expected {})",
                    self.api_version, API_VERSION
                ),
            });
        }
        if self.kind != KIND {
            return Err(CoreError::InvalidManifest {
                path: path.to_string(),
                message: format!("unsupported kind: {} (expected {})", self.kind, KIND),
            });
        }
        if self.metadata.name.is_empty() {
            return Err(CoreError::InvalidManifest {
                path: path.to_string(),
                message: "metadata.name is required".to_string(),
            });
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|source| CoreError::MalformedYaml {
            path: String::new(),
            source,
        })
    }
}
