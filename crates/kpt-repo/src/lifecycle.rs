//! The four-state revision lifecycle and its legal transitions (spec.md
//! §4.7, invariant I5).
//!
//! Grounded on no direct donor analogue — Helm charts have no draft/publish
//! workflow — built from spec.md's explicit state diagram.

use crate::error::{RepoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Draft,
    Proposed,
    Published,
    DeletionProposed,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Draft => "Draft",
            Lifecycle::Proposed => "Proposed",
            Lifecycle::Published => "Published",
            Lifecycle::DeletionProposed => "DeletionProposed",
        }
    }
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validates a lifecycle transition per spec.md §4.7's state diagram:
/// `Draft -> Proposed -> Published -> DeletionProposed`, with `Proposed`
/// additionally allowed to step back to `Draft` (unpropose).
pub fn validate_transition(from: Lifecycle, to: Lifecycle) -> Result<()> {
    use Lifecycle::*;
    let allowed = matches!(
        (from, to),
        (Draft, Proposed) | (Proposed, Published) | (Proposed, Draft)
            | (Published, DeletionProposed)
    );
    if allowed || from == to {
        Ok(())
    } else {
        Err(RepoError::LifecycleViolation {
            from: from.to_string(),
            to: to.to_string(),
            message: "no such transition in the revision lifecycle".to_string(),
        })
    }
}

/// Invariant I5: a `Published` revision's resource content is immutable;
/// only labels/annotations may change. Called whenever an update targets a
/// revision that is already `Published` (and stays `Published`, i.e. this
/// is not itself the `Published -> DeletionProposed` transition).
pub fn validate_content_unchanged(
    old: &crate::revision::PackageRevision,
    new: &crate::revision::PackageRevision,
) -> Result<()> {
    if old.lifecycle == Lifecycle::Published
        && new.lifecycle == Lifecycle::Published
        && old.resources != new.resources
    {
        return Err(RepoError::LifecycleViolation {
            from: old.lifecycle.to_string(),
            to: new.lifecycle.to_string(),
            message: "a published revision's resource content is immutable".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use Lifecycle::*;

    #[test]
    fn forward_chain_is_legal() {
        assert!(validate_transition(Draft, Proposed).is_ok());
        assert!(validate_transition(Proposed, Published).is_ok());
        assert!(validate_transition(Published, DeletionProposed).is_ok());
    }

    #[test]
    fn unpropose_is_legal() {
        assert!(validate_transition(Proposed, Draft).is_ok());
    }

    #[test]
    fn skipping_a_state_is_illegal() {
        assert!(validate_transition(Draft, Published).is_err());
        assert!(validate_transition(Draft, DeletionProposed).is_err());
    }

    #[test]
    fn published_is_otherwise_immutable() {
        assert!(validate_transition(Published, Draft).is_err());
        assert!(validate_transition(Published, Proposed).is_err());
    }
}
