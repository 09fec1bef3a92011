//! kpt-core — data model and resource store for the package-orchestration
//! core: packages, manifests (`Kptfile`), resources, the merge-key engine
//! (C3), and the resource store (C1).

pub mod annotations;
pub mod error;
pub mod identity;
pub mod manifest;
pub mod package;
pub mod resource;
pub mod store;

pub use error::CoreError;
pub use identity::{MergeKeyEngine, ResourceId};
pub use manifest::{FunctionSpec, Manifest, Pipeline, ResourceSelector, Upstream, UpstreamLock};
pub use package::{Package, load_package};
pub use resource::{LineComment, ManifestKind, Resource};
pub use store::{FileMap, ResourceStore};
