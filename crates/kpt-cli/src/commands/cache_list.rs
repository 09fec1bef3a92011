//! `kpt cache-list`: seed an in-memory orchestration cache from a package
//! directory and print what it reports — a smoke test for C6/C7 wiring, not
//! a real persistent repository.

use std::path::Path;
use std::sync::Arc;

use kpt_core::package;
use kpt_repo::{
    InMemoryRepositoryAdapter, Lifecycle, OrchestrationCache, OrchestrationConfig, PackageRevision,
    RevisionFilter, RevisionKey,
};

use crate::error::Result;

pub async fn run(path: &Path, package_path: &str) -> Result<()> {
    let resources = package::load_file_map(path)?;

    let adapter = Arc::new(InMemoryRepositoryAdapter::new());
    let cache = OrchestrationCache::new(adapter, OrchestrationConfig::default());

    let key = RevisionKey {
        repository: "local".to_string(),
        package_path: package_path.to_string(),
        revision: "v1".to_string(),
        workspace: "default".to_string(),
    };
    let mut draft = PackageRevision::new(key.clone());
    draft.resources = resources;

    cache.create_draft(draft).await?;
    cache.transition(&key, Lifecycle::Proposed).await?;
    cache.transition(&key, Lifecycle::Published).await?;

    let revisions = cache.list_revisions(&RevisionFilter::default()).await?;
    for revision in &revisions {
        println!(
            "{}  lifecycle={}  files={}",
            revision.key,
            revision.lifecycle,
            revision.resources.len()
        );
    }

    if let Some(latest) = cache.latest_revision(package_path).await? {
        println!("latest: {}", latest.key);
    }

    Ok(())
}
