// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identity → handle registry for components materialised in a session.
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::document::Handle;
use crate::ident::Identity;

/// Errors returned by the [`ReferenceResolver`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    /// The identity already maps to a handle; registrations are append-only.
    #[error("identity already registered: {identity} -> {existing}")]
    DuplicateIdentity {
        /// Identity that was registered twice.
        identity: Identity,
        /// Handle the identity is already bound to.
        existing: Handle,
    },
    /// No handle has been registered for the identity.
    #[error("unresolved reference: {0}")]
    UnresolvedReference(Identity),
}

/// Journal position captured before a build attempt.
///
/// Rolling back to a checkpoint removes every registration made after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// Session-scoped registry of materialised components.
///
/// Entries are append-only from the caller's point of view: once an identity
/// is bound, the binding never changes. The journal keeps registration order
/// so that the orchestrator can discard the entries of an aborted attempt.
#[derive(Clone, Debug, Default)]
pub struct ReferenceResolver {
    handles: FxHashMap<Identity, Handle>,
    journal: Vec<Identity>,
}

impl ReferenceResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `identity` to `handle`.
    ///
    /// # Errors
    /// Returns [`ReferenceError::DuplicateIdentity`] if `identity` is already
    /// bound; the existing binding is left intact.
    pub fn register(&mut self, identity: Identity, handle: Handle) -> Result<(), ReferenceError> {
        if let Some(existing) = self.handles.get(&identity) {
            return Err(ReferenceError::DuplicateIdentity {
                identity,
                existing: *existing,
            });
        }
        self.journal.push(identity.clone());
        self.handles.insert(identity, handle);
        Ok(())
    }

    /// Looks up the handle bound to `identity`.
    ///
    /// Resolution is exact; nothing is created on a miss.
    ///
    /// # Errors
    /// Returns [`ReferenceError::UnresolvedReference`] if nothing is bound.
    pub fn resolve(&self, identity: &Identity) -> Result<Handle, ReferenceError> {
        self.handles
            .get(identity)
            .copied()
            .ok_or_else(|| ReferenceError::UnresolvedReference(identity.clone()))
    }

    /// Returns the handle for `identity` by string key, if bound.
    #[must_use]
    pub fn get(&self, identity: &str) -> Option<Handle> {
        self.handles.get(identity).copied()
    }

    /// Returns `true` if `identity` is bound.
    #[must_use]
    pub fn contains(&self, identity: &str) -> bool {
        self.handles.contains_key(identity)
    }

    /// Number of bound identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.journal.len()
    }

    /// Returns `true` when nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.journal.is_empty()
    }

    /// Iterates bindings in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&Identity, Handle)> + '_ {
        self.journal
            .iter()
            .filter_map(|id| self.handles.get(id).map(|h| (id, *h)))
    }

    /// Registers a batch of bindings recovered from a prior session.
    ///
    /// Stops at the first duplicate; bindings before it stay registered.
    ///
    /// # Errors
    /// Returns [`ReferenceError::DuplicateIdentity`] on the first repeated identity.
    pub fn seed<I>(&mut self, entries: I) -> Result<usize, ReferenceError>
    where
        I: IntoIterator<Item = (Identity, Handle)>,
    {
        let before = self.len();
        for (identity, handle) in entries {
            self.register(identity, handle)?;
        }
        Ok(self.len() - before)
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.journal.len())
    }

    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint) {
        if checkpoint.0 >= self.journal.len() {
            return;
        }
        for identity in self.journal.drain(checkpoint.0..) {
            self.handles.remove(&identity);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identity {
        Identity::new(s).unwrap()
    }

    #[test]
    fn duplicate_registration_keeps_first_binding() {
        let mut refs = ReferenceResolver::new();
        refs.register(id("A"), Handle::from_raw(1)).unwrap();
        let err = refs.register(id("A"), Handle::from_raw(2)).unwrap_err();
        assert_eq!(
            err,
            ReferenceError::DuplicateIdentity {
                identity: id("A"),
                existing: Handle::from_raw(1)
            }
        );
        assert_eq!(refs.resolve(&id("A")).unwrap(), Handle::from_raw(1));
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn resolve_is_exact() {
        let mut refs = ReferenceResolver::new();
        refs.register(id("wall-1"), Handle::from_raw(3)).unwrap();
        assert_eq!(
            refs.resolve(&id("wall")),
            Err(ReferenceError::UnresolvedReference(id("wall")))
        );
    }

    #[test]
    fn rollback_discards_only_later_entries() {
        let mut refs = ReferenceResolver::new();
        refs.register(id("A"), Handle::from_raw(1)).unwrap();
        let mark = refs.checkpoint();
        refs.register(id("B"), Handle::from_raw(2)).unwrap();
        refs.register(id("C"), Handle::from_raw(3)).unwrap();
        refs.rollback(mark);
        let kept: Vec<_> = refs.iter().map(|(i, _)| i.as_str().to_owned()).collect();
        assert_eq!(kept, ["A"]);
        assert!(!refs.contains("B"));
        // A rolled-back identity can be registered again.
        refs.register(id("B"), Handle::from_raw(4)).unwrap();
        assert_eq!(refs.get("B"), Some(Handle::from_raw(4)));
    }

    #[test]
    fn seed_stops_at_first_duplicate() {
        let mut refs = ReferenceResolver::new();
        let err = refs
            .seed([
                (id("A"), Handle::from_raw(1)),
                (id("A"), Handle::from_raw(2)),
                (id("B"), Handle::from_raw(3)),
            ])
            .unwrap_err();
        assert!(matches!(err, ReferenceError::DuplicateIdentity { .. }));
        assert_eq!(refs.len(), 1);
    }
}
