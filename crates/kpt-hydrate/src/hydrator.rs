//! The Hydration Engine (C4, spec.md §4.4): recursive rendering of a
//! package tree into a single flat, fully-resolved resource stream.
//!
//! Grounded on `sherpack-kube::release`'s top-down render walk generalized
//! from "one chart, one values tree" to "a package tree, recursing into
//! subpackages before running the local pipeline", and on
//! `sherpack-kube::diff`'s server-side-apply pass for the shape of
//! collecting function diagnostics alongside transformed output.

use std::path::{Path, PathBuf};

use kpt_core::manifest::FunctionSpec;
use kpt_core::store::ResourceStore;
use kpt_core::{package, Resource};
use kpt_engine::{merge_back, tag_and_select, FunctionResult, Runner, Runtime};

use crate::cancellation::CancellationToken;
use crate::collaborators;
use crate::error::{HydrateError, Result};
use crate::graph::PackageMap;

fn prefix_path(rel_pkg: &str, local: &str) -> String {
    if rel_pkg.is_empty() {
        local.to_string()
    } else {
        format!("{}/{}", rel_pkg, local)
    }
}

/// The full result of one `hydrate()` call: the flattened resource stream,
/// every diagnostic collected along the way, and the set of file paths that
/// existed on disk before hydration but carry no output resource after it
/// (spec.md §4.4 step 5 — these must be deleted on write-back).
pub struct HydrateOutcome {
    pub resources: Vec<Resource>,
    pub results: Vec<FunctionResult>,
    pub deleted_files: Vec<String>,
}

/// Drives one top-to-bottom hydration pass rooted at a package directory.
pub struct Hydrator<'a> {
    root: PathBuf,
    runtime: &'a dyn Runtime,
    exec_runtime: &'a dyn Runtime,
    allow_exec: bool,
    generate_package_context: bool,
    attribution_command_group: Option<&'a str>,
    cancellation: CancellationToken,
}

impl<'a> Hydrator<'a> {
    pub fn new(root: impl Into<PathBuf>, runtime: &'a dyn Runtime, exec_runtime: &'a dyn Runtime) -> Self {
        Self {
            root: root.into(),
            runtime,
            exec_runtime,
            allow_exec: false,
            generate_package_context: false,
            attribution_command_group: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn allow_exec(mut self, allow: bool) -> Self {
        self.allow_exec = allow;
        self
    }

    pub fn generate_package_context(mut self, generate: bool) -> Self {
        self.generate_package_context = generate;
        self
    }

    pub fn attribution(mut self, command_group: &'a str) -> Self {
        self.attribution_command_group = Some(command_group);
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Runs the full recursive hydration (spec.md §4.4 steps 1-4) and
    /// computes the pruning set (step 5).
    pub fn hydrate(&self) -> Result<HydrateOutcome> {
        let mut map = PackageMap::new();
        let mut results = Vec::new();
        let root = self.root.clone();
        let (resources, input_files) = self.hydrate_package(&root, "", &mut map, &mut results)?;

        for resource in &resources {
            resource
                .validate_path_within_root()
                .map_err(|_| HydrateError::PathEscape {
                    path: resource.path().unwrap_or_default().to_string(),
                })?;
        }

        let output_paths: std::collections::BTreeSet<&str> =
            resources.iter().filter_map(|r| r.path()).collect();
        let deleted_files = input_files
            .into_iter()
            .filter(|p| !output_paths.contains(p.as_str()))
            .collect();

        Ok(HydrateOutcome {
            resources,
            results,
            deleted_files,
        })
    }

    /// Writes the outcome's resources and passthrough files back under
    /// `self.root`, pruning the paths `hydrate` flagged for deletion.
    pub fn write_in_place(&self, outcome: &HydrateOutcome) -> Result<()> {
        let file_map = ResourceStore::write(&outcome.resources, &kpt_core::store::FileMap::new())?;
        for (path, bytes) in file_map {
            let full = self.root.join(&path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).map_err(kpt_core::CoreError::from)?;
            }
            std::fs::write(&full, bytes).map_err(kpt_core::CoreError::from)?;
        }
        for path in &outcome.deleted_files {
            let full = self.root.join(path);
            let _ = std::fs::remove_file(full);
        }
        Ok(())
    }

    fn hydrate_package(
        &self,
        abs_path: &Path,
        rel_path: &str,
        map: &mut PackageMap,
        results: &mut Vec<FunctionResult>,
    ) -> Result<(Vec<Resource>, Vec<String>)> {
        if self.cancellation.is_cancelled() {
            return Err(HydrateError::Cancelled);
        }

        let canonical = std::fs::canonicalize(abs_path).map_err(kpt_core::CoreError::from)?;

        match map.state_of(&canonical) {
            Some(crate::graph::NodeState::Hydrating) => {
                return Err(HydrateError::CycleDetected {
                    path: rel_path.to_string(),
                });
            }
            Some(crate::graph::NodeState::Wet) => {
                let cached = map.cached_output(&canonical).unwrap_or(&[]).to_vec();
                return Ok((cached, Vec::new()));
            }
            Some(crate::graph::NodeState::Dry) | None => {}
        }
        map.mark_hydrating(canonical.clone());

        let mut input = Vec::new();
        let mut input_files = Vec::new();

        for sub_abs in package::direct_subpackages(abs_path)? {
            let name = sub_abs
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let sub_rel = prefix_path(rel_path, &name);
            let (sub_output, sub_input_files) = self.hydrate_package(&sub_abs, &sub_rel, map, results)?;
            input.extend(sub_output);
            input_files.extend(sub_input_files);
        }

        let local_map = package::load_local_file_map(abs_path)?;
        let (mut local_resources, _local_passthrough) = ResourceStore::read(&local_map)?;
        for resource in local_resources.iter_mut() {
            if let Some(local_path) = resource.path().map(str::to_string) {
                resource.set_path(prefix_path(rel_path, &local_path));
            }
        }
        input_files.extend(
            local_resources
                .iter()
                .filter_map(|r| r.path().map(String::from)),
        );

        let package = package::load_package(abs_path, rel_path)?;
        let local_pool = local_resources.clone();
        input.extend(local_resources);

        if self.cancellation.is_cancelled() {
            return Err(HydrateError::Cancelled);
        }

        let mut output = self.run_pipeline(&package, input, &local_pool, rel_path, results)?;

        if self.generate_package_context {
            if let Some(manifest) = &package.manifest {
                output.retain(|r| !collaborators::is_package_context(r));
                let mut context = collaborators::package_context(manifest, Some(rel_path));
                context.set_path(prefix_path(rel_path, collaborators::PACKAGE_CONTEXT_FILE_NAME));
                output.push(context);
            }
        }

        collaborators::insert_merge_comments(&mut output);
        if let Some(command_group) = self.attribution_command_group {
            collaborators::apply_attribution(&mut output, command_group);
        }

        map.mark_wet(&canonical, output.clone(), input_files.clone());
        Ok((output, input_files))
    }

    fn run_pipeline(
        &self,
        package: &package::Package,
        mut resources: Vec<Resource>,
        local_pool: &[Resource],
        rel_path: &str,
        results: &mut Vec<FunctionResult>,
    ) -> Result<Vec<Resource>> {
        let pipeline = match &package.manifest {
            Some(manifest) => &manifest.pipeline,
            None => return self.require_krm(resources, rel_path),
        };

        if pipeline.is_empty() {
            return self.require_krm(resources, rel_path);
        }

        for mutator in &pipeline.mutators {
            if self.cancellation.is_cancelled() {
                return Err(HydrateError::Cancelled);
            }
            let config = self.resolve_function_config(mutator, local_pool, rel_path)?;
            let runner = self.runner_for(mutator)?;

            resources = if mutator.selectors.is_empty() && mutator.exclusions.is_empty() {
                let output = runner
                    .run(resources, config.as_ref())
                    .map_err(|source| self.function_error(rel_path, &mutator.image, source))?;
                results.extend(output.results);
                output.items
            } else {
                let (selected, untouched) = tag_and_select(resources, &mutator.selectors, &mutator.exclusions);
                let output = runner
                    .run(selected, config.as_ref())
                    .map_err(|source| self.function_error(rel_path, &mutator.image, source))?;
                results.extend(output.results);
                merge_back(output.items, untouched)
            };
        }

        for validator in &pipeline.validators {
            if self.cancellation.is_cancelled() {
                return Err(HydrateError::Cancelled);
            }
            let config = self.resolve_function_config(validator, local_pool, rel_path)?;
            let runner = self.runner_for(validator)?;
            let (selected, _) = tag_and_select(resources.clone(), &validator.selectors, &validator.exclusions);
            if selected.is_empty() {
                continue;
            }
            let output = runner
                .run(selected, config.as_ref())
                .map_err(|source| self.function_error(rel_path, &validator.image, source))?;
            let failed = kpt_engine::result::has_error(&output.results);
            results.extend(output.results);
            if failed {
                return Err(HydrateError::FunctionError {
                    package: rel_path.to_string(),
                    image: validator.image.clone(),
                    message: "validator reported an error".to_string(),
                });
            }
        }

        Ok(resources)
    }

    /// §4.4 step 3: a package with no pipeline (no manifest at all, or a
    /// manifest whose pipeline has neither mutators nor validators) skips
    /// function execution entirely, but every resource it contributes must
    /// still be KRM (`kind` and `apiVersion` both present).
    fn require_krm(&self, resources: Vec<Resource>, rel_path: &str) -> Result<Vec<Resource>> {
        for resource in &resources {
            if !resource.is_krm() {
                let path = resource.path().unwrap_or(rel_path).to_string();
                return Err(HydrateError::MalformedInput {
                    path,
                    message: "resource is not KRM (missing apiVersion or kind) in a package with no pipeline".to_string(),
                });
            }
        }
        Ok(resources)
    }

    fn function_error(&self, package: &str, image: &str, source: kpt_engine::EngineError) -> HydrateError {
        HydrateError::FunctionError {
            package: package.to_string(),
            image: image.to_string(),
            message: source.to_string(),
        }
    }

    fn runner_for(&self, spec: &FunctionSpec) -> Result<Box<dyn Runner>> {
        if let Some(exec) = &spec.exec {
            if !self.allow_exec {
                return Err(HydrateError::CapabilityDenied { image: exec.clone() });
            }
            return Ok(self.exec_runtime.get_runner(exec)?);
        }
        Ok(self.runtime.get_runner(&spec.image)?)
    }

    fn resolve_function_config(
        &self,
        spec: &FunctionSpec,
        local_pool: &[Resource],
        rel_path: &str,
    ) -> Result<Option<Resource>> {
        if let Some(config_map) = &spec.config_map {
            let mut data = serde_json::Map::new();
            for (k, v) in config_map {
                data.insert(k.clone(), serde_json::json!(v));
            }
            return Ok(Some(Resource::from_value(serde_json::json!({ "data": data }))));
        }
        if let Some(config_path) = &spec.config_path {
            let expected = prefix_path(rel_path, config_path);
            return match local_pool.iter().find(|r| r.path() == Some(expected.as_str())) {
                Some(resource) => Ok(Some(resource.clone())),
                None => Err(HydrateError::MalformedInput {
                    path: expected,
                    message: "configPath does not resolve to a resource local to this package".to_string(),
                }),
            };
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kpt_engine::registry::BuiltinRuntime;
    use tempfile::TempDir;

    fn write_kptfile(dir: &Path, yaml: &str) {
        std::fs::write(dir.join("Kptfile"), yaml).unwrap();
    }

    #[test]
    fn package_without_pipeline_returns_resources_unchanged() {
        let temp = TempDir::new().unwrap();
        write_kptfile(
            temp.path(),
            "apiVersion: kpt.dev/v1\nkind: Kptfile\nmetadata:\n  name: root\n",
        );
        std::fs::write(
            temp.path().join("cm.yaml"),
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n",
        )
        .unwrap();

        let runtime = BuiltinRuntime::default();
        let hydrator = Hydrator::new(temp.path(), &runtime, &runtime);
        let outcome = hydrator.hydrate().unwrap();
        assert_eq!(outcome.resources.len(), 1);
        assert_eq!(outcome.resources[0].path(), Some("cm.yaml"));
    }

    #[test]
    fn nested_subpackage_resources_get_prefixed_paths() {
        let temp = TempDir::new().unwrap();
        write_kptfile(
            temp.path(),
            "apiVersion: kpt.dev/v1\nkind: Kptfile\nmetadata:\n  name: root\n",
        );
        std::fs::create_dir_all(temp.path().join("sub")).unwrap();
        write_kptfile(
            &temp.path().join("sub"),
            "apiVersion: kpt.dev/v1\nkind: Kptfile\nmetadata:\n  name: sub\n",
        );
        std::fs::write(
            temp.path().join("sub/cm.yaml"),
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: b\n",
        )
        .unwrap();

        let runtime = BuiltinRuntime::default();
        let hydrator = Hydrator::new(temp.path(), &runtime, &runtime);
        let outcome = hydrator.hydrate().unwrap();
        assert_eq!(outcome.resources.len(), 1);
        assert_eq!(outcome.resources[0].path(), Some("sub/cm.yaml"));
    }

    #[test]
    fn mutator_with_config_map_runs_and_records_result() {
        let temp = TempDir::new().unwrap();
        write_kptfile(
            temp.path(),
            r#"apiVersion: kpt.dev/v1
kind: Kptfile
metadata:
  name: root
pipeline:
  mutators:
    - image: set-namespace
      configMap:
        namespace: prod
"#,
        );
        std::fs::write(
            temp.path().join("cm.yaml"),
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n",
        )
        .unwrap();

        let runtime = BuiltinRuntime::default();
        let hydrator = Hydrator::new(temp.path(), &runtime, &runtime);
        let outcome = hydrator.hydrate().unwrap();
        assert_eq!(outcome.resources[0].metadata_namespace(), Some("prod"));
        assert!(!outcome.results.is_empty());
    }

    #[test]
    fn config_path_resolves_against_local_resources_only() {
        let temp = TempDir::new().unwrap();
        write_kptfile(
            temp.path(),
            r#"apiVersion: kpt.dev/v1
kind: Kptfile
metadata:
  name: root
pipeline:
  mutators:
    - image: set-namespace
      configPath: ns-config.yaml
"#,
        );
        std::fs::write(
            temp.path().join("ns-config.yaml"),
            "data:\n  namespace: staging\n",
        )
        .unwrap();
        std::fs::write(
            temp.path().join("cm.yaml"),
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n",
        )
        .unwrap();

        let runtime = BuiltinRuntime::default();
        let hydrator = Hydrator::new(temp.path(), &runtime, &runtime);
        let outcome = hydrator.hydrate().unwrap();
        let cm = outcome
            .resources
            .iter()
            .find(|r| r.kind() == Some("ConfigMap"))
            .unwrap();
        assert_eq!(cm.metadata_namespace(), Some("staging"));
    }

    #[test]
    fn exec_function_denied_without_capability() {
        let temp = TempDir::new().unwrap();
        write_kptfile(
            temp.path(),
            r#"apiVersion: kpt.dev/v1
kind: Kptfile
metadata:
  name: root
pipeline:
  mutators:
    - image: ignored
      exec: ./local-fn
"#,
        );
        std::fs::write(
            temp.path().join("cm.yaml"),
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n",
        )
        .unwrap();

        let runtime = BuiltinRuntime::default();
        let hydrator = Hydrator::new(temp.path(), &runtime, &runtime);
        let err = hydrator.hydrate().unwrap_err();
        assert!(matches!(err, HydrateError::CapabilityDenied { .. }));
    }

    #[test]
    fn cycle_is_detected_via_map_state() {
        let temp = TempDir::new().unwrap();
        write_kptfile(
            temp.path(),
            "apiVersion: kpt.dev/v1\nkind: Kptfile\nmetadata:\n  name: root\n",
        );
        let runtime = BuiltinRuntime::default();
        let hydrator = Hydrator::new(temp.path(), &runtime, &runtime);
        let mut map = PackageMap::new();
        let mut results = Vec::new();
        let canonical = std::fs::canonicalize(temp.path()).unwrap();
        map.mark_hydrating(canonical);
        let err = hydrator
            .hydrate_package(temp.path(), "", &mut map, &mut results)
            .unwrap_err();
        assert!(matches!(err, HydrateError::CycleDetected { .. }));
    }

    #[test]
    fn resource_lacking_kind_fails_when_no_pipeline() {
        let temp = TempDir::new().unwrap();
        write_kptfile(
            temp.path(),
            "apiVersion: kpt.dev/v1\nkind: Kptfile\nmetadata:\n  name: root\n",
        );
        std::fs::write(temp.path().join("fragment.yaml"), "plain: true\n").unwrap();
        let runtime = BuiltinRuntime::default();
        let hydrator = Hydrator::new(temp.path(), &runtime, &runtime);
        let err = hydrator.hydrate().unwrap_err();
        assert!(matches!(err, HydrateError::MalformedInput { .. }));
    }

    #[test]
    fn krm_resources_pass_through_when_pipeline_is_empty() {
        let temp = TempDir::new().unwrap();
        write_kptfile(
            temp.path(),
            "apiVersion: kpt.dev/v1\nkind: Kptfile\nmetadata:\n  name: root\npipeline: {}\n",
        );
        std::fs::write(
            temp.path().join("fragment.yaml"),
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n",
        )
        .unwrap();
        let runtime = BuiltinRuntime::default();
        let hydrator = Hydrator::new(temp.path(), &runtime, &runtime);
        let outcome = hydrator.hydrate().unwrap();
        assert_eq!(outcome.resources.len(), 1);
    }

    #[test]
    fn non_krm_resource_fails_when_pipeline_is_present_but_empty() {
        let temp = TempDir::new().unwrap();
        write_kptfile(
            temp.path(),
            "apiVersion: kpt.dev/v1\nkind: Kptfile\nmetadata:\n  name: root\npipeline:\n  mutators: []\n  validators: []\n",
        );
        std::fs::write(temp.path().join("fragment.yaml"), "plain: true\n").unwrap();
        let runtime = BuiltinRuntime::default();
        let hydrator = Hydrator::new(temp.path(), &runtime, &runtime);
        let err = hydrator.hydrate().unwrap_err();
        assert!(matches!(err, HydrateError::MalformedInput { .. }));
    }
}
