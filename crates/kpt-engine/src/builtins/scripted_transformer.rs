//! The `scripted-transformer` built-in (SPEC_FULL.md §9.1, grounding the
//! original kpt "starlark" function without embedding a real Starlark
//! runtime): runs a list of `{selector, script}` rules, each evaluated by
//! `kpt-script` against the resources it selects.

use kpt_core::{Resource, ResourceSelector};
use serde::Deserialize;

use crate::error::{EngineError, Result};
use crate::result::FunctionResult;
use crate::runtime::{Runner, RunnerOutput};

#[derive(Debug, Deserialize)]
struct ScriptRule {
    #[serde(default)]
    selector: ResourceSelector,
    script: String,
}

#[derive(Debug, Default, Deserialize)]
struct ScriptedTransformerConfig {
    #[serde(default)]
    rules: Vec<ScriptRule>,
}

pub struct ScriptedTransformer;

impl Runner for ScriptedTransformer {
    fn run(&self, items: Vec<Resource>, function_config: Option<&Resource>) -> Result<RunnerOutput> {
        let config: ScriptedTransformerConfig = match function_config {
            Some(resource) => {
                serde_json::from_value(resource.content.clone()).map_err(|e| EngineError::RunnerFailed {
                    image: "scripted-transformer".to_string(),
                    message: format!("invalid config: {e}"),
                })?
            }
            None => ScriptedTransformerConfig::default(),
        };

        let mut results = Vec::new();
        let mut items = items;
        for resource in &mut items {
            for rule in &config.rules {
                if rule.selector.matches(&resource.content) {
                    kpt_script::run(&rule.script, &mut resource.content)?;
                    resource.raw = None;
                }
            }
        }
        results.push(FunctionResult::info(format!("evaluated {} rule(s)", config.rules.len())));
        Ok(RunnerOutput { items, results })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn applies_matching_rule_only() {
        let config = Resource::from_value(json!({
            "rules": [{
                "selector": {"kind": "Deployment"},
                "script": ".metadata.labels.tier = \"prod\""
            }]
        }));
        let deployment = Resource::from_value(json!({
            "apiVersion": "apps/v1", "kind": "Deployment", "metadata": {"name": "d"}
        }));
        let service = Resource::from_value(json!({
            "apiVersion": "v1", "kind": "Service", "metadata": {"name": "s"}
        }));
        let output = ScriptedTransformer.run(vec![deployment, service], Some(&config)).unwrap();
        assert_eq!(
            output.items[0].content.pointer("/metadata/labels/tier"),
            Some(&json!("prod"))
        );
        assert_eq!(output.items[1].content.pointer("/metadata/labels"), None);
    }
}
