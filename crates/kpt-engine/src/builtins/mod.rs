//! In-process built-in functions (spec.md §4.2): namespace-setter,
//! label-setter, and the scripted-transformer.

pub mod label_setter;
pub mod namespace_setter;
pub mod scripted_transformer;

use std::collections::BTreeMap;

use kpt_core::Resource;

/// Reads a built-in's `data` map out of its synthesized function-config
/// resource (the shape a `configMap` entry in a `Kptfile` pipeline is
/// lowered to before invocation).
pub fn config_data(function_config: Option<&Resource>) -> BTreeMap<String, String> {
    function_config
        .and_then(|r| r.content.get("data"))
        .and_then(|d| d.as_object())
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}
