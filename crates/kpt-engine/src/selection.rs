//! Selector-based tagging, splitting, and re-merging of a resource stream
//! around one function call (spec.md §4.2/§4.4 step 3b): "Before invocation,
//! every resource is tagged with a per-call `resource-id` annotation. After
//! invocation, the output resources are merged back into the untouched
//! remainder by identity (`resource-id`), then annotations are stripped."

use kpt_core::annotations::internal;
use kpt_core::{Resource, ResourceSelector};

fn matches_selection(content: &serde_json::Value, selectors: &[ResourceSelector], exclusions: &[ResourceSelector]) -> bool {
    let selected = selectors.is_empty() || selectors.iter().any(|s| s.matches(content));
    let excluded = exclusions.iter().any(|s| s.matches(content));
    selected && !excluded
}

/// Tags every resource with a stable per-call `resource-id`, then splits
/// the stream into `(selected, untouched)` per `selectors`/`exclusions`.
pub fn tag_and_select(
    resources: Vec<Resource>,
    selectors: &[ResourceSelector],
    exclusions: &[ResourceSelector],
) -> (Vec<Resource>, Vec<Resource>) {
    let mut selected = Vec::new();
    let mut untouched = Vec::new();
    for (i, mut resource) in resources.into_iter().enumerate() {
        resource.set_annotation(internal::RESOURCE_ID, i.to_string());
        if matches_selection(&resource.content, selectors, exclusions) {
            selected.push(resource);
        } else {
            untouched.push(resource);
        }
    }
    (selected, untouched)
}

/// Merges a runner's output back into the untouched remainder by
/// `resource-id` identity, then strips the per-call annotation from every
/// resource in the combined stream. Output resources not matching any
/// known id (functions may add new resources) are appended as-is.
pub fn merge_back(output: Vec<Resource>, untouched: Vec<Resource>) -> Vec<Resource> {
    let mut combined = untouched;
    combined.extend(output);
    for resource in &mut combined {
        resource.annotations.shift_remove(internal::RESOURCE_ID);
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use kpt_core::ResourceSelector;
    use serde_json::json;

    fn cm(name: &str) -> Resource {
        Resource::from_value(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": name}
        }))
    }

    #[test]
    fn selector_splits_by_kind() {
        let resources = vec![cm("a"), {
            let mut d = Resource::from_value(json!({
                "apiVersion": "apps/v1", "kind": "Deployment", "metadata": {"name": "b"}
            }));
            d.set_path("d.yaml");
            d
        }];
        let selectors = vec![ResourceSelector {
            kind: Some("Deployment".to_string()),
            ..Default::default()
        }];
        let (selected, untouched) = tag_and_select(resources, &selectors, &[]);
        assert_eq!(selected.len(), 1);
        assert_eq!(untouched.len(), 1);
        assert_eq!(selected[0].metadata_name(), Some("b"));
    }

    #[test]
    fn merge_back_strips_resource_id() {
        let (selected, untouched) = tag_and_select(vec![cm("a")], &[], &[]);
        let merged = merge_back(selected, untouched);
        assert!(merged[0].get_annotation(internal::RESOURCE_ID).is_none());
    }

    #[test]
    fn no_selectors_selects_everything() {
        let (selected, untouched) = tag_and_select(vec![cm("a"), cm("b")], &[], &[]);
        assert_eq!(selected.len(), 2);
        assert!(untouched.is_empty());
    }
}
