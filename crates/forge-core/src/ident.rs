// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier and hashing utilities.
use std::borrow::Borrow;
use std::fmt;

use blake3::Hasher;
use thiserror::Error;

/// Canonical 256-bit hash used for variant identifiers.
pub type Hash = [u8; 32];

/// Caller-assigned token naming a component within a build session.
///
/// Identities are opaque strings. The only structural rule is that they are
/// non-empty; uniqueness is enforced by the [`crate::ReferenceResolver`] when
/// a handle is registered.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-model", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-model", serde(try_from = "String", into = "String"))]
pub struct Identity(String);

/// Returned when an identity would be empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("component identity must be non-empty")]
pub struct InvalidIdentity;

impl Identity {
    /// Constructs an identity from any string-like value.
    ///
    /// # Errors
    /// Returns [`InvalidIdentity`] when `value` is empty.
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidIdentity> {
        let value = value.into();
        if value.is_empty() {
            return Err(InvalidIdentity);
        }
        Ok(Self(value))
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identity {
    type Error = InvalidIdentity;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Identity {
    type Error = InvalidIdentity;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.0
    }
}

impl Borrow<str> for Identity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({:?})", self.0)
    }
}

/// Strongly typed identifier for a component variant.
///
/// `VariantId` values are produced by [`make_variant_id`] which hashes a label;
/// the dedicated wrapper keeps variant tags from mixing with other hashes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariantId(pub Hash);

impl VariantId {
    /// Returns a short hex prefix for logs.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VariantId({})", hex::encode(&self.0[..8]))
    }
}

/// Produces a stable variant identifier derived from a label using BLAKE3.
///
/// The label is domain-separated (`variant:` prefix) so a variant id never
/// equals a plain hash of the same text.
pub fn make_variant_id(label: &str) -> VariantId {
    let mut hasher = Hasher::new();
    hasher.update(b"variant:");
    hasher.update(label.as_bytes());
    VariantId(hasher.finalize().into())
}
