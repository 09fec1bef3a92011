//! Housekeeping annotation namespaces and small parse helpers.
//!
//! Grounded on the donor's `annotations` module layout (separate constant
//! groups per concern, small `parse_*` free functions) but retargeted from
//! Helm/Sherpack hook annotations to the internal housekeeping annotations
//! this spec defines.

use std::collections::BTreeMap;

/// Internal housekeeping namespace — stripped on write, re-derived on read.
pub mod internal {
    pub const PATH: &str = "internal.config.kubernetes.io/path";
    pub const INDEX: &str = "internal.config.kubernetes.io/index";
    pub const SEQINDENT: &str = "internal.config.kubernetes.io/seqindent";
    pub const ANNOTATIONS_MIGRATION_RESOURCE_ID: &str =
        "internal.config.kubernetes.io/annotations-migration-resource-id";
    pub const MERGE_SOURCE: &str = "internal.config.kubernetes.io/merge-source";
    pub const RESOURCE_ID: &str = "internal.config.kubernetes.io/resource-id";
}

/// Public-namespace counterparts kept in sync with `internal::*` on write.
pub mod public {
    pub const PATH: &str = "config.kubernetes.io/path";
    pub const INDEX: &str = "config.kubernetes.io/index";
}

/// Identity annotation published by the merge-key engine (§4.3).
pub const UPSTREAM_IDENTIFIER: &str = "internal.config.kubernetes.io/upstream-identifier";

/// Attribution annotation woven in by §4.8's third collaborator.
pub const ATTRIBUTION: &str = "blueprint";

/// Environment variable that opts a run out of attribution annotation.
pub const ATTRIBUTION_OPT_OUT_ENV: &str = "KPT_NO_ATTRIBUTION";

/// Cache-facing labels (§6, §4.7).
pub mod label {
    pub const LATEST_REVISION: &str = "latest-revision";
    pub const LIFECYCLE: &str = "kpt.dev/lifecycle";
}

/// All housekeeping keys that must be stripped before comparing two
/// resource trees for equivalence (§4.5 Phase B, `o ≡ l`).
pub const HOUSEKEEPING_KEYS: &[&str] = &[
    internal::PATH,
    internal::INDEX,
    internal::SEQINDENT,
    internal::ANNOTATIONS_MIGRATION_RESOURCE_ID,
    internal::MERGE_SOURCE,
    internal::RESOURCE_ID,
    public::PATH,
    public::INDEX,
    UPSTREAM_IDENTIFIER,
    ATTRIBUTION,
];

/// Strip every housekeeping key from an annotation map, returning a clean copy.
pub fn strip_housekeeping(annotations: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    annotations
        .iter()
        .filter(|(k, _)| !HOUSEKEEPING_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Whether attribution should be skipped for this run (§4.8's opt-out env var).
pub fn attribution_opted_out() -> bool {
    std::env::var(ATTRIBUTION_OPT_OUT_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_housekeeping_removes_internal_keys_only() {
        let mut annotations = BTreeMap::new();
        annotations.insert(internal::PATH.to_string(), "foo/bar.yaml".to_string());
        annotations.insert("example.com/keep".to_string(), "yes".to_string());

        let stripped = strip_housekeeping(&annotations);
        assert_eq!(stripped.len(), 1);
        assert_eq!(stripped.get("example.com/keep"), Some(&"yes".to_string()));
    }

    #[test]
    fn attribution_opt_out_reads_env() {
        // Not set by default in test harness.
        let _ = attribution_opted_out();
    }
}
