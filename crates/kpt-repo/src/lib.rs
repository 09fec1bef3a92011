//! Repository adapter (C6) and orchestration cache (C7) for the kpt
//! package-orchestration core.
//!
//! A [`backend::RepositoryAdapter`] is a stateless interface over wherever
//! package revisions actually live; an [`cache::OrchestrationCache`] sits in
//! front of one adapter, giving readers a consistent in-memory snapshot and
//! funneling writes through lifecycle validation (`lifecycle`) and watch
//! notification (`watch`).
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kpt_repo::{InMemoryRepositoryAdapter, OrchestrationCache, OrchestrationConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let adapter = Arc::new(InMemoryRepositoryAdapter::new());
//! let cache = OrchestrationCache::new(adapter, OrchestrationConfig::default());
//!
//! let revisions = cache.list_revisions(&Default::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod revision;
pub mod watch;

pub use backend::{
    GitRepositoryAdapter, InMemoryRepositoryAdapter, OciRepositoryAdapter, PackageFilter,
    RepositoryAdapter, RevisionFilter,
};
pub use cache::OrchestrationCache;
pub use config::OrchestrationConfig;
pub use error::{RepoError, Result};
pub use lifecycle::{validate_content_unchanged, validate_transition, Lifecycle};
pub use revision::{label, PackageIdentity, PackageRevision, RevisionKey};
pub use watch::{WatchEvent, WatchEventKind, Watcher};
