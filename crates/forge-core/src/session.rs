// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Build orchestration: one atomic attempt per [`BuildSession::build`] call.
//!
//! Attempt lifecycle:
//!
//! ```text
//! LockAcquired -> CreatorResolved -> TransactionOpen -> ReferenceResolved?
//!   -> HandleCreated -> PostProcessed -> Registered -> Committed
//! ```
//!
//! The creator is resolved before the transaction opens, so dispatch
//! failures never touch transactional state. From `TransactionOpen` on, the
//! transaction and the resolver checkpoint are owned by a scope guard;
//! leaving the scope without a successful commit aborts the transaction and
//! drops every registration made by the attempt, including on unwind.
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::component::Component;
use crate::config::BuildOptions;
use crate::creator::{CreateContext, CreationError, CreatorRegistry, DispatchError, ErasedCreator};
use crate::document::{Document, DocumentError, Handle, Metadata};
use crate::ident::Identity;
use crate::reference::{Checkpoint, ReferenceError, ReferenceResolver};
use crate::tx::TxId;

/// Last state reached by a build attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildStage {
    /// The document lock is held.
    LockAcquired,
    /// A single creation capability was selected.
    CreatorResolved,
    /// The document transaction is open.
    TransactionOpen,
    /// The declared reference resolved to a live handle.
    ReferenceResolved,
    /// The capability produced a handle.
    HandleCreated,
    /// Parameters and metadata were applied.
    PostProcessed,
    /// The identity → handle binding was recorded.
    Registered,
    /// The transaction committed.
    Committed,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LockAcquired => "lock-acquired",
            Self::CreatorResolved => "creator-resolved",
            Self::TransactionOpen => "transaction-open",
            Self::ReferenceResolved => "reference-resolved",
            Self::HandleCreated => "handle-created",
            Self::PostProcessed => "post-processed",
            Self::Registered => "registered",
            Self::Committed => "committed",
        };
        f.write_str(name)
    }
}

/// What went wrong during a build attempt.
#[derive(Debug, Error)]
pub enum BuildErrorKind {
    /// No capability is bound to the component's variant.
    #[error("no creator found")]
    NoCreatorFound,
    /// More than one capability is bound to the component's variant.
    #[error("ambiguous creators: {candidates:?}")]
    AmbiguousCreator {
        /// Type names of the competing capabilities.
        candidates: Vec<&'static str>,
    },
    /// Reference use was requested but the component declares no reference.
    #[error("component declares no reference identity")]
    MissingReferenceIdentity,
    /// The declared reference is not registered, or its object is gone.
    #[error("unresolved reference: {0}")]
    UnresolvedReference(Identity),
    /// The component's identity is already registered.
    #[error("identity already registered to {existing}")]
    DuplicateIdentity {
        /// Handle the identity is already bound to.
        existing: Handle,
    },
    /// The creation capability failed.
    #[error("creation failed: {0}")]
    CreationFailed(#[source] CreationError),
    /// Applying parameters or metadata failed.
    #[error("post-processing failed: {0}")]
    PostProcessFailed(#[source] DocumentError),
    /// The document refused to open a transaction.
    #[error("transaction could not be opened: {0}")]
    TransactionFailed(#[source] DocumentError),
    /// The document refused to commit.
    #[error("commit failed: {0}")]
    CommitFailed(#[source] DocumentError),
}

impl From<DispatchError> for BuildErrorKind {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::NoCreatorFound { .. } => Self::NoCreatorFound,
            DispatchError::AmbiguousCreator { candidates, .. } => {
                Self::AmbiguousCreator { candidates }
            }
        }
    }
}

impl From<ReferenceError> for BuildErrorKind {
    fn from(err: ReferenceError) -> Self {
        match err {
            ReferenceError::DuplicateIdentity { existing, .. } => {
                Self::DuplicateIdentity { existing }
            }
            ReferenceError::UnresolvedReference(identity) => Self::UnresolvedReference(identity),
        }
    }
}

/// Failed build attempt, with the context needed to diagnose it.
#[derive(Debug, Error)]
#[error("build of `{identity}` ({variant}) failed after {stage}: {kind}")]
pub struct BuildError {
    /// Identity of the component being built.
    pub identity: Identity,
    /// Variant name of the component.
    pub variant: &'static str,
    /// Last stage reached before the failure.
    pub stage: BuildStage,
    /// Failure classification.
    #[source]
    pub kind: BuildErrorKind,
}

/// Result of a successful [`BuildSession::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildResult {
    /// A new object was created, tagged and registered.
    Created {
        /// Handle of the new object.
        handle: Handle,
        /// Transaction that made it durable.
        tx: TxId,
    },
    /// The capability declined to create anything; the attempt committed.
    Declined {
        /// Transaction that committed (with no changes from the core).
        tx: TxId,
    },
}

impl BuildResult {
    /// Handle of the created object, if any.
    #[must_use]
    pub fn handle(&self) -> Option<Handle> {
        match self {
            Self::Created { handle, .. } => Some(*handle),
            Self::Declined { .. } => None,
        }
    }
}

/// Per-component outcomes of [`BuildSession::build_all`], in input order.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Outcome of every attempted component.
    pub entries: Vec<(Identity, Result<BuildResult, BuildError>)>,
}

impl BuildReport {
    /// Identities that produced an object, with their handles.
    pub fn created(&self) -> impl Iterator<Item = (&Identity, Handle)> + '_ {
        self.entries
            .iter()
            .filter_map(|(id, r)| r.as_ref().ok().and_then(BuildResult::handle).map(|h| (id, h)))
    }

    /// Identities whose capability declined.
    pub fn declined(&self) -> impl Iterator<Item = &Identity> + '_ {
        self.entries
            .iter()
            .filter(|(_, r)| matches!(r, Ok(BuildResult::Declined { .. })))
            .map(|(id, _)| id)
    }

    /// Failed attempts.
    pub fn failures(&self) -> impl Iterator<Item = &BuildError> + '_ {
        self.entries.iter().filter_map(|(_, r)| r.as_ref().err())
    }

    /// `true` when no attempt failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }
}

struct SessionState<D> {
    document: D,
    references: ReferenceResolver,
}

/// A build session over one target document.
///
/// The session owns the document and the [`ReferenceResolver`] behind a
/// single lock, so concurrent `build` calls serialize and the resolver is
/// only ever written by the attempt that holds the document.
pub struct BuildSession<D: Document> {
    state: Mutex<SessionState<D>>,
    creators: Arc<CreatorRegistry<D>>,
    options: BuildOptions,
}

impl<D: Document> BuildSession<D> {
    /// Starts a session with an empty resolver.
    pub fn new(document: D, creators: Arc<CreatorRegistry<D>>, options: BuildOptions) -> Self {
        Self::with_references(document, creators, options, ReferenceResolver::new())
    }

    /// Starts a session with a caller-supplied resolver.
    pub fn with_references(
        document: D,
        creators: Arc<CreatorRegistry<D>>,
        options: BuildOptions,
        references: ReferenceResolver,
    ) -> Self {
        Self {
            state: Mutex::new(SessionState {
                document,
                references,
            }),
            creators,
            options,
        }
    }

    /// Starts a session seeded from metadata already in `document`.
    ///
    /// Only records tagged with `options.application` are replayed.
    ///
    /// # Errors
    /// Returns [`ReferenceError::DuplicateIdentity`] when two objects carry
    /// the same identity.
    #[instrument(level = "debug", skip_all, fields(application = %options.application))]
    pub fn resume(
        document: D,
        creators: Arc<CreatorRegistry<D>>,
        options: BuildOptions,
    ) -> Result<Self, ReferenceError> {
        let mut references = ReferenceResolver::new();
        let recovered = references.seed(
            document
                .tagged_objects()
                .into_iter()
                .filter(|(_, m)| m.application == options.application)
                .map(|(handle, m)| (m.identity, handle)),
        )?;
        debug!(recovered, "seeded references from document");
        Ok(Self::with_references(document, creators, options, references))
    }

    /// Starts a session, resuming when `options.resume_from_document` is set.
    ///
    /// # Errors
    /// See [`BuildSession::resume`].
    pub fn open(
        document: D,
        creators: Arc<CreatorRegistry<D>>,
        options: BuildOptions,
    ) -> Result<Self, ReferenceError> {
        if options.resume_from_document {
            Self::resume(document, creators, options)
        } else {
            Ok(Self::new(document, creators, options))
        }
    }

    /// Session options.
    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Creator registry used for dispatch.
    pub fn creators(&self) -> &Arc<CreatorRegistry<D>> {
        &self.creators
    }

    /// Builds `component` atomically.
    ///
    /// When `use_reference` is set and the selected capability wants a
    /// reference, the component's declared reference must already be
    /// registered. Ordering is the caller's responsibility.
    ///
    /// # Errors
    /// Returns a [`BuildError`]; on error the document and the resolver are
    /// left exactly as they were before the call.
    #[instrument(
        level = "debug",
        skip_all,
        fields(identity = %component.identity(), variant = component.variant_name(), use_reference = use_reference)
    )]
    pub fn build(
        &self,
        component: &Component,
        use_reference: bool,
    ) -> Result<BuildResult, BuildError> {
        let fail = |stage: BuildStage, kind: BuildErrorKind| {
            warn!(%stage, error = %kind, "build aborted");
            BuildError {
                identity: component.identity().clone(),
                variant: component.variant_name(),
                stage,
                kind,
            }
        };

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let SessionState {
            document,
            references,
        } = &mut *state;

        let creator = self
            .creators
            .resolve_for(component)
            .map_err(|e| fail(BuildStage::LockAcquired, e.into()))?;
        debug!(
            creator = creator.creator_name(),
            variant_id = %component.variant().short(),
            "creator resolved"
        );

        let tx = document
            .begin()
            .map_err(|e| fail(BuildStage::CreatorResolved, BuildErrorKind::TransactionFailed(e)))?;
        let mut attempt = Attempt::open(document, references, tx);

        let created = match attempt.run(&**creator, component, use_reference, &self.options) {
            Ok(created) => created,
            Err(kind) => {
                let stage = attempt.stage;
                drop(attempt);
                return Err(fail(stage, kind));
            }
        };

        let stage = attempt.stage;
        attempt
            .commit()
            .map_err(|e| fail(stage, BuildErrorKind::CommitFailed(e)))?;

        match created {
            Some(handle) => {
                info!(%handle, %tx, "component committed");
                Ok(BuildResult::Created { handle, tx })
            }
            None => {
                debug!(%tx, "creator declined; committed without changes");
                Ok(BuildResult::Declined { tx })
            }
        }
    }

    /// Builds `component` using the session's configured reference policy.
    ///
    /// # Errors
    /// See [`BuildSession::build`].
    pub fn build_default(&self, component: &Component) -> Result<BuildResult, BuildError> {
        self.build(component, self.options.use_reference)
    }

    /// Builds components in the given order, one attempt each.
    ///
    /// A failed component does not stop the batch; components are never
    /// reordered, so a reference to a later component fails with
    /// `UnresolvedReference`.
    pub fn build_all<'c, I>(&self, components: I, use_reference: bool) -> BuildReport
    where
        I: IntoIterator<Item = &'c Component>,
    {
        let entries = components
            .into_iter()
            .map(|c| (c.identity().clone(), self.build(c, use_reference)))
            .collect();
        let report = BuildReport { entries };
        debug!(
            attempted = report.entries.len(),
            failed = report.failures().count(),
            "batch finished"
        );
        report
    }

    /// Returns the handle registered for `identity`, if any.
    pub fn resolve(&self, identity: &str) -> Option<Handle> {
        self.lock().references.get(identity)
    }

    /// Returns a copy of the session's registry.
    pub fn references(&self) -> ReferenceResolver {
        self.lock().references.clone()
    }

    /// Runs `f` against the document while holding the document lock.
    pub fn with_document<R>(&self, f: impl FnOnce(&D) -> R) -> R {
        f(&self.lock().document)
    }

    /// Ends the session, returning the document and the registry.
    pub fn into_parts(self) -> (D, ReferenceResolver) {
        let state = self.state.into_inner().unwrap_or_else(PoisonError::into_inner);
        (state.document, state.references)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState<D>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scope guard for one attempt's transaction and registry writes.
struct Attempt<'s, D: Document> {
    document: &'s mut D,
    references: &'s mut ReferenceResolver,
    tx: TxId,
    checkpoint: Checkpoint,
    stage: BuildStage,
    committed: bool,
}

impl<'s, D: Document> Attempt<'s, D> {
    fn open(document: &'s mut D, references: &'s mut ReferenceResolver, tx: TxId) -> Self {
        let checkpoint = references.checkpoint();
        debug!(%tx, "transaction open");
        Self {
            document,
            references,
            tx,
            checkpoint,
            stage: BuildStage::TransactionOpen,
            committed: false,
        }
    }

    fn run(
        &mut self,
        creator: &dyn ErasedCreator<D>,
        component: &Component,
        use_reference: bool,
        options: &BuildOptions,
    ) -> Result<Option<Handle>, BuildErrorKind> {
        let reference = if use_reference && creator.wants_reference() {
            let Some(identity) = component.reference() else {
                return Err(BuildErrorKind::MissingReferenceIdentity);
            };
            let handle = self.references.resolve(identity)?;
            if !self.document.contains(handle) {
                return Err(BuildErrorKind::UnresolvedReference(identity.clone()));
            }
            self.stage = BuildStage::ReferenceResolved;
            Some(handle)
        } else {
            None
        };

        let created = creator
            .create_erased(CreateContext {
                component,
                document: &mut *self.document,
                tx: self.tx,
                reference,
            })
            .map_err(BuildErrorKind::CreationFailed)?;
        let Some(handle) = created else {
            return Ok(None);
        };
        self.stage = BuildStage::HandleCreated;

        for parameter in component.parameters() {
            self.document
                .apply_parameter(self.tx, handle, parameter)
                .map_err(BuildErrorKind::PostProcessFailed)?;
        }
        let metadata = Metadata {
            application: options.application.clone(),
            identity: component.identity().clone(),
            variant: component.variant_name().to_owned(),
        };
        self.document
            .attach_metadata(self.tx, handle, &metadata)
            .map_err(BuildErrorKind::PostProcessFailed)?;
        self.stage = BuildStage::PostProcessed;

        self.references
            .register(component.identity().clone(), handle)?;
        self.stage = BuildStage::Registered;
        Ok(Some(handle))
    }

    fn commit(mut self) -> Result<(), DocumentError> {
        self.document.commit(self.tx)?;
        self.committed = true;
        self.stage = BuildStage::Committed;
        Ok(())
    }
}

impl<D: Document> Drop for Attempt<'_, D> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        self.document.abort(self.tx);
        self.references.rollback(self.checkpoint);
        debug!(tx = %self.tx, stage = %self.stage, "transaction aborted");
    }
}
