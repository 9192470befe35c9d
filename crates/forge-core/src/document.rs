// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Target document port.
//!
//! The build core never touches a document's native object model directly.
//! It needs transactions, an existence check, and the two post-creation
//! primitives (parameters and metadata); everything else belongs to the
//! creation capabilities, which are written against the concrete document
//! type.
use std::fmt;

use thiserror::Error;

use crate::component::Parameter;
use crate::ident::Identity;
use crate::tx::TxId;

/// Opaque reference to a native object inside the target document.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-model", derive(serde::Serialize, serde::Deserialize))]
pub struct Handle(u64);

impl Handle {
    /// Constructs a handle from the document's raw object key.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw object key.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:#x})", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Identity-carrying record attached to every created object.
///
/// `application` scopes the record so that several producers can tag the
/// same document; a session only replays records carrying its own tag.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde-model", derive(serde::Serialize, serde::Deserialize))]
pub struct Metadata {
    /// Application tag (see [`crate::BuildOptions::application`]).
    pub application: String,
    /// Identity of the component that produced the object.
    pub identity: Identity,
    /// Variant name of that component.
    pub variant: String,
}

/// Errors raised by a [`Document`] implementation.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// A transaction is already open against the document.
    #[error("transaction {0} already open")]
    TransactionOpen(TxId),
    /// The supplied transaction identifier did not exist or was already closed.
    #[error("transaction not active: {0}")]
    UnknownTx(TxId),
    /// The handle does not name an object in the document.
    #[error("no object for handle {0}")]
    UnknownHandle(Handle),
    /// The document refused to make the transaction durable.
    #[error("commit rejected: {0}")]
    CommitRejected(String),
    /// The document rejected a parameter value.
    #[error("parameter `{name}` rejected: {reason}")]
    ParameterRejected {
        /// Parameter name.
        name: String,
        /// Document-supplied reason.
        reason: String,
    },
    /// Backend-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Target document collaborator.
///
/// Implementations must honour these rules:
/// - At most one transaction is live at a time; [`Document::begin`] fails with
///   [`DocumentError::TransactionOpen`] otherwise.
/// - Mutations made under a transaction become durable only on
///   [`Document::commit`]. [`Document::abort`] restores the state observed at
///   [`Document::begin`].
/// - A failed commit leaves the transaction live so the caller can abort it.
pub trait Document: Send + 'static {
    /// Opens a transactional scope.
    fn begin(&mut self) -> Result<TxId, DocumentError>;

    /// Makes the transaction's mutations durable and closes it.
    fn commit(&mut self, tx: TxId) -> Result<(), DocumentError>;

    /// Discards the transaction's mutations and closes it.
    ///
    /// Aborting an unknown transaction is a no-op.
    fn abort(&mut self, tx: TxId);

    /// Returns `true` if `handle` names an object visible to the caller.
    fn contains(&self, handle: Handle) -> bool;

    /// Applies a parameter value to an object.
    fn apply_parameter(
        &mut self,
        tx: TxId,
        handle: Handle,
        parameter: &Parameter,
    ) -> Result<(), DocumentError>;

    /// Attaches identity metadata to an object.
    fn attach_metadata(
        &mut self,
        tx: TxId,
        handle: Handle,
        metadata: &Metadata,
    ) -> Result<(), DocumentError>;

    /// Lists committed objects that carry metadata, in handle order.
    fn tagged_objects(&self) -> Vec<(Handle, Metadata)>;
}
