//! The built-in runtime: a fixed image-name → implementation mapping, with
//! version aliases resolving to the same built-in (spec.md §4.2, §9 "Model
//! the runtime as a capability interface ... registration is a mapping from
//! image name (plus known aliases) to the built-in implementation").

use crate::builtins::{label_setter::LabelSetter, namespace_setter::NamespaceSetter, scripted_transformer::ScriptedTransformer};
use crate::error::{EngineError, Result};
use crate::runtime::{Runner, Runtime};

/// Canonical built-in identifiers; every alias below resolves to one of
/// these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    NamespaceSetter,
    LabelSetter,
    ScriptedTransformer,
}

fn resolve(image: &str) -> Option<Builtin> {
    let bare = image.rsplit('/').next().unwrap_or(image);
    let bare = bare.split(':').next().unwrap_or(bare);
    match bare {
        "set-namespace" | "namespace-setter" => Some(Builtin::NamespaceSetter),
        "set-labels" | "label-setter" => Some(Builtin::LabelSetter),
        "scripted-transformer" | "starlark" => Some(Builtin::ScriptedTransformer),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct BuiltinRuntime;

impl Runtime for BuiltinRuntime {
    fn get_runner(&self, image: &str) -> Result<Box<dyn Runner>> {
        match resolve(image) {
            Some(Builtin::NamespaceSetter) => Ok(Box::new(NamespaceSetter)),
            Some(Builtin::LabelSetter) => Ok(Box::new(LabelSetter)),
            Some(Builtin::ScriptedTransformer) => Ok(Box::new(ScriptedTransformer)),
            None => Err(EngineError::UnknownImage {
                image: image.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_bare_and_versioned_and_namespaced_names() {
        assert!(BuiltinRuntime.get_runner("set-namespace").is_ok());
        assert!(BuiltinRuntime.get_runner("set-namespace:v0.4").is_ok());
        assert!(BuiltinRuntime.get_runner("gcr.io/kpt-fn/set-namespace:v0.4").is_ok());
    }

    #[test]
    fn unknown_image_fails_clearly() {
        let err = BuiltinRuntime.get_runner("totally-unknown").unwrap_err();
        assert!(matches!(err, EngineError::UnknownImage { .. }));
    }
}
