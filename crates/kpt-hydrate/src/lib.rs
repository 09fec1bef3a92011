//! kpt-hydrate — the Hydration Engine (C4) and 3-way Package Merger (C5),
//! plus the pluggable collaborators woven through both (§4.8).

pub mod cancellation;
pub mod collaborators;
pub mod error;
pub mod graph;
pub mod hydrator;
pub mod merge;

pub use cancellation::CancellationToken;
pub use error::{HydrateError, Result};
pub use graph::{NodeState, PackageMap};
pub use hydrator::{HydrateOutcome, Hydrator};
pub use merge::{MergeOutcome, ThreeWayMerger};
