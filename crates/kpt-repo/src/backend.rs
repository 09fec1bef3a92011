//! The Repository Adapter contract (C6, spec.md §4.6): a stateless interface
//! over a package-storage backend.
//!
//! Grounded on `sherpack-repo::backend::RepositoryBackend`'s `#[async_trait]`
//! shape (`name`/`url`/`repo_type`/`refresh`/`search`/`list`/`get_latest`/
//! `get_version`/`find_best_match`/`download`/`download_to`/`exists`) and its
//! factory-function pattern (`create_backend`/`create_backend_by_name`) —
//! kept here as `RepositoryAdapter`'s revision-oriented verbs and a
//! `create_adapter` factory, retargeting the payload from Helm index
//! entries to package revisions.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{RepoError, Result};
use crate::revision::{PackageIdentity, PackageRevision, RevisionKey};

/// Restricts `list_revisions`/`list_packages` to a subset (spec.md §4.6
/// "filter by package path, workspace, revision label, or object name").
#[derive(Debug, Clone, Default)]
pub struct RevisionFilter {
    pub package_path: Option<String>,
    pub workspace: Option<String>,
    pub revision: Option<String>,
}

impl RevisionFilter {
    pub fn matches(&self, key: &RevisionKey) -> bool {
        self.package_path.as_deref().is_none_or(|p| p == key.package_path)
            && self.workspace.as_deref().is_none_or(|w| w == key.workspace)
            && self.revision.as_deref().is_none_or(|r| r == key.revision)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PackageFilter {
    pub path_prefix: Option<String>,
}

impl PackageFilter {
    pub fn matches(&self, identity: &PackageIdentity) -> bool {
        self.path_prefix
            .as_deref()
            .is_none_or(|prefix| identity.path.starts_with(prefix))
    }
}

/// C6's contract: adapters must provide monotonic commit ordering on a
/// given package (§4.6) and all-or-nothing revision-granularity writes.
#[async_trait]
pub trait RepositoryAdapter: Send + Sync {
    async fn list_revisions(&self, filter: &RevisionFilter) -> Result<Vec<PackageRevision>>;
    async fn get_revision(&self, key: &RevisionKey) -> Result<PackageRevision>;
    async fn create_revision(&self, draft: PackageRevision) -> Result<PackageRevision>;
    async fn update_revision(&self, revision: PackageRevision) -> Result<PackageRevision>;
    async fn delete_revision(&self, key: &RevisionKey) -> Result<()>;
    async fn list_packages(&self, filter: &PackageFilter) -> Result<Vec<PackageIdentity>>;
    async fn create_package(&self, identity: PackageIdentity) -> Result<PackageIdentity>;
    async fn delete_package(&self, identity: &PackageIdentity) -> Result<()>;
}

/// A fully in-process adapter: the only adapter this spec fully implements
/// (used by C7's tests and by `kpt-cli`'s demo). Backed by a plain
/// `RwLock`-protected map, matching §5's "resource-store file map owned
/// per-operation" preference for coarse, short-held locks over anything
/// more elaborate.
#[derive(Default)]
pub struct InMemoryRepositoryAdapter {
    revisions: RwLock<HashMap<RevisionKey, PackageRevision>>,
    packages: RwLock<HashMap<PackageIdentity, ()>>,
}

impl InMemoryRepositoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RepositoryAdapter for InMemoryRepositoryAdapter {
    async fn list_revisions(&self, filter: &RevisionFilter) -> Result<Vec<PackageRevision>> {
        let revisions = self.revisions.read().expect("lock poisoned");
        Ok(revisions
            .values()
            .filter(|revision| filter.matches(&revision.key))
            .cloned()
            .collect())
    }

    async fn get_revision(&self, key: &RevisionKey) -> Result<PackageRevision> {
        let revisions = self.revisions.read().expect("lock poisoned");
        revisions
            .get(key)
            .cloned()
            .ok_or_else(|| RepoError::RevisionNotFound { key: key.to_string() })
    }

    async fn create_revision(&self, draft: PackageRevision) -> Result<PackageRevision> {
        let mut revisions = self.revisions.write().expect("lock poisoned");
        if revisions.contains_key(&draft.key) {
            return Err(RepoError::AlreadyExists { key: draft.key.to_string() });
        }
        revisions.insert(draft.key.clone(), draft.clone());
        Ok(draft)
    }

    async fn update_revision(&self, revision: PackageRevision) -> Result<PackageRevision> {
        let mut revisions = self.revisions.write().expect("lock poisoned");
        if !revisions.contains_key(&revision.key) {
            return Err(RepoError::RevisionNotFound {
                key: revision.key.to_string(),
            });
        }
        revisions.insert(revision.key.clone(), revision.clone());
        Ok(revision)
    }

    async fn delete_revision(&self, key: &RevisionKey) -> Result<()> {
        let mut revisions = self.revisions.write().expect("lock poisoned");
        revisions
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| RepoError::RevisionNotFound { key: key.to_string() })
    }

    async fn list_packages(&self, filter: &PackageFilter) -> Result<Vec<PackageIdentity>> {
        let packages = self.packages.read().expect("lock poisoned");
        Ok(packages
            .keys()
            .filter(|identity| filter.matches(identity))
            .cloned()
            .collect())
    }

    async fn create_package(&self, identity: PackageIdentity) -> Result<PackageIdentity> {
        let mut packages = self.packages.write().expect("lock poisoned");
        if packages.contains_key(&identity) {
            return Err(RepoError::AlreadyExists {
                key: format!("{}/{}", identity.repository, identity.path),
            });
        }
        packages.insert(identity.clone(), ());
        Ok(identity)
    }

    async fn delete_package(&self, identity: &PackageIdentity) -> Result<()> {
        let mut packages = self.packages.write().expect("lock poisoned");
        packages
            .remove(identity)
            .map(|_| ())
            .ok_or_else(|| RepoError::PackageNotFound {
                path: identity.path.clone(),
            })
    }
}

/// A documented stub: concrete Git transport is explicitly out of scope
/// (spec.md §1 "Git/OCI transport plumbing"). Every method fails with
/// `BackendError` naming the missing transport rather than attempting a
/// partial implementation.
#[derive(Default)]
pub struct GitRepositoryAdapter;

/// A documented stub for OCI-backed repositories; see
/// [`GitRepositoryAdapter`].
#[derive(Default)]
pub struct OciRepositoryAdapter;

macro_rules! unimplemented_adapter {
    ($ty:ty, $transport:literal) => {
        #[async_trait]
        impl RepositoryAdapter for $ty {
            async fn list_revisions(&self, _filter: &RevisionFilter) -> Result<Vec<PackageRevision>> {
                Err(backend_unavailable($transport))
            }
            async fn get_revision(&self, _key: &RevisionKey) -> Result<PackageRevision> {
                Err(backend_unavailable($transport))
            }
            async fn create_revision(&self, _draft: PackageRevision) -> Result<PackageRevision> {
                Err(backend_unavailable($transport))
            }
            async fn update_revision(&self, _revision: PackageRevision) -> Result<PackageRevision> {
                Err(backend_unavailable($transport))
            }
            async fn delete_revision(&self, _key: &RevisionKey) -> Result<()> {
                Err(backend_unavailable($transport))
            }
            async fn list_packages(&self, _filter: &PackageFilter) -> Result<Vec<PackageIdentity>> {
                Err(backend_unavailable($transport))
            }
            async fn create_package(&self, _identity: PackageIdentity) -> Result<PackageIdentity> {
                Err(backend_unavailable($transport))
            }
            async fn delete_package(&self, _identity: &PackageIdentity) -> Result<()> {
                Err(backend_unavailable($transport))
            }
        }
    };
}

fn backend_unavailable(transport: &str) -> RepoError {
    RepoError::BackendError {
        message: format!("{transport} transport is out of scope for this core; wire in a real adapter"),
    }
}

unimplemented_adapter!(GitRepositoryAdapter, "git");
unimplemented_adapter!(OciRepositoryAdapter, "oci");
