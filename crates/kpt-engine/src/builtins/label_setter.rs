//! The `label-setter` built-in: merges the function-config's `data` map
//! into `metadata.labels` on every KRM resource (spec.md seed scenario S1).

use kpt_core::Resource;

use crate::builtins::config_data;
use crate::error::Result;
use crate::result::FunctionResult;
use crate::runtime::{Runner, RunnerOutput};

pub struct LabelSetter;

impl Runner for LabelSetter {
    fn run(&self, items: Vec<Resource>, function_config: Option<&Resource>) -> Result<RunnerOutput> {
        let data = config_data(function_config);

        let items = items
            .into_iter()
            .map(|mut resource| {
                if !data.is_empty() && resource.is_krm() && resource.has_metadata() {
                    let metadata = resource
                        .content
                        .get_mut("metadata")
                        .and_then(|m| m.as_object_mut());
                    if let Some(metadata) = metadata {
                        let labels = metadata
                            .entry("labels".to_string())
                            .or_insert_with(|| serde_json::json!({}));
                        if let Some(labels_obj) = labels.as_object_mut() {
                            for (k, v) in &data {
                                labels_obj.insert(k.clone(), serde_json::json!(v));
                            }
                        }
                        resource.raw = None;
                    }
                }
                resource
            })
            .collect();

        Ok(RunnerOutput {
            items,
            results: vec![FunctionResult::info(format!("applied {} label(s)", data.len()))],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merges_labels_preserving_existing() {
        let config = Resource::from_value(json!({"data": {"color": "orange"}}));
        let resource = Resource::from_value(json!({
            "apiVersion": "apps/v1", "kind": "Deployment",
            "metadata": {"name": "d", "labels": {"app": "d"}}
        }));
        let output = LabelSetter.run(vec![resource], Some(&config)).unwrap();
        let labels = output.items[0].content.pointer("/metadata/labels").unwrap();
        assert_eq!(labels["color"], json!("orange"));
        assert_eq!(labels["app"], json!("d"));
    }
}
