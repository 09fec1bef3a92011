//! Change-notification watch support (spec.md §4.7 "Watch").
//!
//! Grounded on no direct donor analogue (Helm repositories are pull-only);
//! built around `tokio::sync::mpsc` bounded channels, the idiomatic choice
//! already present in the workspace dependency table for "one producer,
//! backpressured consumer" fan-out.

use tokio::sync::mpsc;

use crate::revision::{PackageRevision, RevisionKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEventKind {
    Added,
    Modified,
    Deleted,
    Error,
}

/// One observed change. `Deleted`/`Error` events carry only the key (or no
/// key at all for a terminal stream-level error); `Added`/`Modified` carry
/// the full revision.
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub key: Option<RevisionKey>,
    pub revision: Option<PackageRevision>,
    pub message: Option<String>,
}

impl WatchEvent {
    pub fn added(revision: PackageRevision) -> Self {
        Self {
            kind: WatchEventKind::Added,
            key: Some(revision.key.clone()),
            revision: Some(revision),
            message: None,
        }
    }

    pub fn modified(revision: PackageRevision) -> Self {
        Self {
            kind: WatchEventKind::Modified,
            key: Some(revision.key.clone()),
            revision: Some(revision),
            message: None,
        }
    }

    pub fn deleted(key: RevisionKey) -> Self {
        Self {
            kind: WatchEventKind::Deleted,
            key: Some(key),
            revision: None,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: WatchEventKind::Error,
            key: None,
            revision: None,
            message: Some(message.into()),
        }
    }
}

/// A live subscription returned by `OrchestrationCache::watch`. The initial
/// list is replayed as `Added` events before any steady-state event, per
/// the list-then-watch pattern (spec.md §4.7).
pub struct Watcher {
    receiver: mpsc::Receiver<WatchEvent>,
}

impl Watcher {
    pub(crate) fn new(receiver: mpsc::Receiver<WatchEvent>) -> Self {
        Self { receiver }
    }

    /// Receives the next event, or `None` once the cache has dropped every
    /// sender (the stream is permanently closed, e.g. after a terminal
    /// `Error` event).
    pub async fn recv(&mut self) -> Option<WatchEvent> {
        self.receiver.recv().await
    }
}
