//! The Orchestration Cache (C7, spec.md §4.7): one cache instance per backend
//! repository, giving readers a consistent in-memory view while funneling
//! writes through lifecycle validation and watch notification.
//!
//! Grounded on `sherpack-repo::cache::IndexCache`'s role (a read-through cache
//! sitting in front of the backend, refreshed periodically and on demand) but
//! retargeted from a SQLite/FTS5 index to an in-memory snapshot per §4.7's
//! "Rust notes", since this spec has no search surface to justify SQLite.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, RwLock};

use crate::backend::{PackageFilter, RepositoryAdapter, RevisionFilter};
use crate::config::OrchestrationConfig;
use crate::error::{RepoError, Result};
use crate::lifecycle::{self, Lifecycle};
use crate::revision::{label, PackageIdentity, PackageRevision, RevisionKey};
use crate::watch::{WatchEvent, Watcher};

#[derive(Default)]
struct CacheState {
    revisions: Option<Vec<PackageRevision>>,
    packages: Option<Vec<PackageIdentity>>,
    last_error: Option<String>,
}

/// One cache instance per backend repository (spec.md §4.7).
pub struct OrchestrationCache {
    adapter: Arc<dyn RepositoryAdapter>,
    config: OrchestrationConfig,
    state: RwLock<CacheState>,
    watchers: Mutex<Vec<mpsc::Sender<WatchEvent>>>,
    revision_locks: Mutex<HashMap<RevisionKey, Arc<Mutex<()>>>>,
}

impl OrchestrationCache {
    pub fn new(adapter: Arc<dyn RepositoryAdapter>, config: OrchestrationConfig) -> Self {
        Self {
            adapter,
            config,
            state: RwLock::new(CacheState::default()),
            watchers: Mutex::new(Vec::new()),
            revision_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The most recent refresh failure, if any (spec.md §4.7 "a collection's
    /// own `lastError` field").
    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }

    async fn revision_lock(&self, key: &RevisionKey) -> Arc<Mutex<()>> {
        let mut locks = self.revision_locks.lock().await;
        locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Forces a refresh of the revisions slice. Refreshes are mutually
    /// exclusive per collection by virtue of holding the write lock for the
    /// whole round trip, so concurrent readers only ever see a complete
    /// pre- or post-refresh snapshot (spec.md §4.7).
    #[tracing::instrument(skip(self))]
    pub async fn refresh_revisions(&self) -> Result<()> {
        let mut state = self.state.write().await;
        match self.adapter.list_revisions(&RevisionFilter::default()).await {
            Ok(revisions) => {
                state.revisions = Some(revisions);
                state.last_error = None;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "revision refresh failed");
                state.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn refresh_packages(&self) -> Result<()> {
        let mut state = self.state.write().await;
        match self.adapter.list_packages(&PackageFilter::default()).await {
            Ok(packages) => {
                state.packages = Some(packages);
                state.last_error = None;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "package refresh failed");
                state.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn ensure_revisions(&self) -> Result<()> {
        let cold = self.state.read().await.revisions.is_none();
        if cold {
            self.refresh_revisions().await?;
        }
        Ok(())
    }

    async fn ensure_packages(&self) -> Result<()> {
        let cold = self.state.read().await.packages.is_none();
        if cold {
            self.refresh_packages().await?;
        }
        Ok(())
    }

    pub async fn list_revisions(&self, filter: &RevisionFilter) -> Result<Vec<PackageRevision>> {
        self.ensure_revisions().await?;
        let state = self.state.read().await;
        Ok(state
            .revisions
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .filter(|revision| filter.matches(&revision.key))
            .cloned()
            .collect())
    }

    pub async fn get_revision(&self, key: &RevisionKey) -> Result<PackageRevision> {
        self.ensure_revisions().await?;
        let state = self.state.read().await;
        state
            .revisions
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .find(|revision| &revision.key == key)
            .cloned()
            .ok_or_else(|| RepoError::RevisionNotFound { key: key.to_string() })
    }

    pub async fn list_packages(&self, filter: &PackageFilter) -> Result<Vec<PackageIdentity>> {
        self.ensure_packages().await?;
        let state = self.state.read().await;
        Ok(state
            .packages
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .filter(|identity| filter.matches(identity))
            .cloned()
            .collect())
    }

    /// Latest-revision computation (spec.md §4.7): among published revisions
    /// of one package path whose label matches `^v[0-9]+$`, the
    /// highest-numbered wins. At most one per (repository, packagePath)
    /// (invariant I4), returned with `latest-revision` tagged on a private
    /// copy that never mutates the stored object.
    pub async fn latest_revision(&self, package_path: &str) -> Result<Option<PackageRevision>> {
        let revisions = self
            .list_revisions(&RevisionFilter {
                package_path: Some(package_path.to_string()),
                ..Default::default()
            })
            .await?;
        Ok(compute_latest(&revisions))
    }

    /// Next-revision computation (spec.md §4.7): `vN` where `N` is one past
    /// the highest numbered published revision, or `v1` if none exists.
    pub async fn next_revision_label(&self, package_path: &str) -> Result<String> {
        let revisions = self
            .list_revisions(&RevisionFilter {
                package_path: Some(package_path.to_string()),
                ..Default::default()
            })
            .await?;
        Ok(compute_next_label(&revisions))
    }

    pub async fn create_draft(&self, draft: PackageRevision) -> Result<PackageRevision> {
        let created = self.adapter.create_revision(draft).await?;
        let _ = self.refresh_revisions().await;
        self.broadcast(WatchEvent::added(created.clone())).await;
        Ok(created)
    }

    /// Content/label updates to an existing revision, serialized per
    /// revision so two concurrent writers never interleave (spec.md §5).
    /// Published-content immutability (I5) is enforced before the adapter
    /// ever sees the write.
    pub async fn update_revision(&self, revision: PackageRevision) -> Result<PackageRevision> {
        let lock = self.revision_lock(&revision.key).await;
        let _guard = lock.lock().await;

        let current = self.adapter.get_revision(&revision.key).await?;
        lifecycle::validate_content_unchanged(&current, &revision)?;
        if current.lifecycle != revision.lifecycle {
            lifecycle::validate_transition(current.lifecycle, revision.lifecycle)?;
        }

        let updated = self.adapter.update_revision(revision).await?;
        let _ = self.refresh_revisions().await;
        self.broadcast(WatchEvent::modified(updated.clone())).await;
        Ok(updated)
    }

    /// Advances one revision by exactly one legal lifecycle transition
    /// (propose/approve/reject/unpropose). Serialized per revision: of two
    /// concurrent transitions on the same revision, exactly one wins and the
    /// loser sees an error (spec.md §5).
    pub async fn transition(&self, key: &RevisionKey, to: Lifecycle) -> Result<PackageRevision> {
        let lock = self.revision_lock(key).await;
        let _guard = lock.lock().await;

        let mut current = self.adapter.get_revision(key).await?;
        lifecycle::validate_transition(current.lifecycle, to)?;
        current.lifecycle = to;

        let updated = self.adapter.update_revision(current).await?;
        let _ = self.refresh_revisions().await;
        self.broadcast(WatchEvent::modified(updated.clone())).await;
        Ok(updated)
    }

    /// Draft closure (spec.md §4.7): commits the draft forward to
    /// `Proposed` and reconciles the cache. Fails if the revision vanished
    /// between reopen and commit.
    pub async fn close_draft(&self, key: &RevisionKey) -> Result<PackageRevision> {
        self.adapter
            .get_revision(key)
            .await
            .map_err(|_| RepoError::RevisionNotFound { key: key.to_string() })?;
        self.transition(key, Lifecycle::Proposed).await
    }

    pub async fn delete_revision(&self, key: &RevisionKey) -> Result<()> {
        self.adapter.delete_revision(key).await?;
        let _ = self.refresh_revisions().await;
        self.broadcast(WatchEvent::deleted(key.clone())).await;
        Ok(())
    }

    pub async fn create_package(&self, identity: PackageIdentity) -> Result<PackageIdentity> {
        let created = self.adapter.create_package(identity).await?;
        let _ = self.refresh_packages().await;
        Ok(created)
    }

    pub async fn delete_package(&self, identity: &PackageIdentity) -> Result<()> {
        self.adapter.delete_package(identity).await?;
        let _ = self.refresh_packages().await;
        Ok(())
    }

    /// Registers an observer, then lists: the initial matching set is
    /// replayed as `Added` events ahead of any steady-state event, so a
    /// watcher never misses a change that lands between registration and its
    /// first read (spec.md §4.7 "list-then-watch").
    pub async fn watch(&self, filter: RevisionFilter) -> Result<Watcher> {
        let (sender, receiver) = mpsc::channel(self.config.watch_high_water_mark.max(1));
        self.watchers.lock().await.push(sender.clone());

        let backlog = self.list_revisions(&filter).await?;
        for revision in backlog {
            if sender.send(WatchEvent::added(revision)).await.is_err() {
                break;
            }
        }

        Ok(Watcher::new(receiver))
    }

    async fn broadcast(&self, event: WatchEvent) {
        let mut watchers = self.watchers.lock().await;
        let mut live = Vec::with_capacity(watchers.len());
        for sender in watchers.drain(..) {
            if sender.send(event.clone()).await.is_ok() {
                live.push(sender);
            }
        }
        *watchers = live;
    }

    /// Spawns the periodic refresh loop (spec.md §4.7, recommended one
    /// minute). Cold reads already force an immediate refresh, so the loop
    /// only needs to keep a warm cache from going stale.
    pub fn spawn_refresh_loop(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.refresh_interval());
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let _ = self.refresh_revisions().await;
                let _ = self.refresh_packages().await;
            }
        })
    }
}

fn eligible(revision: &PackageRevision) -> Option<u64> {
    if revision.lifecycle != Lifecycle::Published {
        return None;
    }
    revision.version_number()
}

fn compute_latest(revisions: &[PackageRevision]) -> Option<PackageRevision> {
    revisions
        .iter()
        .filter_map(|revision| eligible(revision).map(|version| (version, revision)))
        .max_by_key(|(version, _)| *version)
        .map(|(_, revision)| revision.with_labels(&[(label::LATEST_REVISION, "true".to_string())]))
}

fn compute_next_label(revisions: &[PackageRevision]) -> String {
    match revisions.iter().filter_map(eligible).max() {
        Some(highest) => format!("v{}", highest + 1),
        None => "v1".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryRepositoryAdapter;

    fn key(path: &str, revision: &str) -> RevisionKey {
        RevisionKey {
            repository: "repo".to_string(),
            package_path: path.to_string(),
            revision: revision.to_string(),
            workspace: "main".to_string(),
        }
    }

    fn cache() -> OrchestrationCache {
        OrchestrationCache::new(
            Arc::new(InMemoryRepositoryAdapter::new()),
            OrchestrationConfig::default(),
        )
    }

    #[tokio::test]
    async fn cold_read_triggers_refresh() {
        let cache = cache();
        let revisions = cache.list_revisions(&RevisionFilter::default()).await.unwrap();
        assert!(revisions.is_empty());
        assert!(cache.last_error().await.is_none());
    }

    #[tokio::test]
    async fn draft_to_published_then_latest_revision() {
        let cache = cache();
        let draft = cache
            .create_draft(PackageRevision::new(key("nginx", "v1")))
            .await
            .unwrap();
        let proposed = cache.close_draft(&draft.key).await.unwrap();
        assert_eq!(proposed.lifecycle, Lifecycle::Proposed);

        let published = cache
            .transition(&proposed.key, Lifecycle::Published)
            .await
            .unwrap();
        assert_eq!(published.lifecycle, Lifecycle::Published);

        let latest = cache.latest_revision("nginx").await.unwrap().unwrap();
        assert_eq!(latest.key.revision, "v1");
        assert_eq!(latest.labels.get(label::LATEST_REVISION), Some(&"true".to_string()));
    }

    #[tokio::test]
    async fn next_revision_label_increments_past_published() {
        let cache = cache();
        let draft = cache
            .create_draft(PackageRevision::new(key("nginx", "v1")))
            .await
            .unwrap();
        cache
            .transition(&draft.key, Lifecycle::Proposed)
            .await
            .unwrap();
        cache
            .transition(&draft.key, Lifecycle::Published)
            .await
            .unwrap();

        assert_eq!(cache.next_revision_label("nginx").await.unwrap(), "v2");
        assert_eq!(cache.next_revision_label("redis").await.unwrap(), "v1");
    }

    #[tokio::test]
    async fn published_revision_rejects_content_change() {
        let cache = cache();
        let draft = cache
            .create_draft(PackageRevision::new(key("nginx", "v1")))
            .await
            .unwrap();
        cache.transition(&draft.key, Lifecycle::Proposed).await.unwrap();
        let published = cache
            .transition(&draft.key, Lifecycle::Published)
            .await
            .unwrap();

        let mut mutated = published.clone();
        mutated
            .resources
            .insert("resource.yaml".to_string(), b"changed".to_vec());

        let err = cache.update_revision(mutated).await.unwrap_err();
        assert!(matches!(err, RepoError::LifecycleViolation { .. }));
    }

    #[tokio::test]
    async fn illegal_transition_is_rejected() {
        let cache = cache();
        let draft = cache
            .create_draft(PackageRevision::new(key("nginx", "v1")))
            .await
            .unwrap();
        let err = cache
            .transition(&draft.key, Lifecycle::Published)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::LifecycleViolation { .. }));
    }

    #[tokio::test]
    async fn watch_replays_backlog_before_steady_state() {
        let cache = cache();
        cache
            .create_draft(PackageRevision::new(key("nginx", "v1")))
            .await
            .unwrap();

        let mut watcher = cache.watch(RevisionFilter::default()).await.unwrap();
        let first = watcher.recv().await.unwrap();
        assert_eq!(first.kind, crate::watch::WatchEventKind::Added);

        cache
            .create_draft(PackageRevision::new(key("redis", "v1")))
            .await
            .unwrap();
        let second = watcher.recv().await.unwrap();
        assert_eq!(second.kind, crate::watch::WatchEventKind::Added);
        assert_eq!(second.key.unwrap().package_path, "redis");
    }
}
