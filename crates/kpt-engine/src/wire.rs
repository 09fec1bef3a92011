//! The `ResourceList` wire format exchanged with external (container)
//! functions over stdin/stdout (spec.md §6: `apiVersion:
//! config.kubernetes.io/v1`, `kind: ResourceList`, `items`, `functionConfig`,
//! `results`).

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::result::FunctionResult;

pub const API_VERSION: &str = "config.kubernetes.io/v1";
pub const KIND: &str = "ResourceList";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceListWire {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub items: Vec<JsonValue>,
    #[serde(default, rename = "functionConfig", skip_serializing_if = "Option::is_none")]
    pub function_config: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<FunctionResult>>,
}

impl ResourceListWire {
    pub fn request(items: Vec<JsonValue>, function_config: Option<JsonValue>) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            items,
            function_config,
            results: None,
        }
    }
}
