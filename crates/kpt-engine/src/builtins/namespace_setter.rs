//! The `namespace-setter` built-in: sets `metadata.namespace` on every
//! namespace-scoped KRM resource in the stream.

use kpt_core::Resource;

use crate::builtins::config_data;
use crate::error::{EngineError, Result};
use crate::result::FunctionResult;
use crate::runtime::{Runner, RunnerOutput};

pub struct NamespaceSetter;

impl Runner for NamespaceSetter {
    fn run(&self, items: Vec<Resource>, function_config: Option<&Resource>) -> Result<RunnerOutput> {
        let data = config_data(function_config);
        let namespace = data.get("namespace").ok_or_else(|| EngineError::RunnerFailed {
            image: "set-namespace".to_string(),
            message: "function config is missing required field `namespace`".to_string(),
        })?;

        let mut results = Vec::new();
        let items = items
            .into_iter()
            .map(|mut resource| {
                if resource.is_krm() && resource.has_metadata() {
                    let obj = resource
                        .content
                        .get_mut("metadata")
                        .and_then(|m| m.as_object_mut());
                    if let Some(obj) = obj {
                        obj.insert("namespace".to_string(), serde_json::json!(namespace));
                        resource.raw = None;
                    }
                }
                resource
            })
            .collect();
        results.push(FunctionResult::info(format!("set namespace to {}", namespace)));
        Ok(RunnerOutput { items, results })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sets_namespace_on_krm_resources() {
        let config = Resource::from_value(json!({"data": {"namespace": "prod"}}));
        let resource = Resource::from_value(json!({
            "apiVersion": "v1", "kind": "ConfigMap", "metadata": {"name": "a"}
        }));
        let output = NamespaceSetter.run(vec![resource], Some(&config)).unwrap();
        assert_eq!(output.items[0].metadata_namespace(), Some("prod"));
    }

    #[test]
    fn fails_without_namespace_field() {
        let config = Resource::from_value(json!({"data": {}}));
        let err = NamespaceSetter.run(vec![], Some(&config)).unwrap_err();
        assert!(matches!(err, EngineError::RunnerFailed { .. }));
    }
}
