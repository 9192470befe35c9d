// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Build options and the storage port they are persisted through.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key under which [`BuildOptions`] are stored.
pub const BUILD_OPTIONS_KEY: &str = "build-options";

/// Application tag used when no options are configured.
pub const DEFAULT_APPLICATION: &str = "forge";

/// Session-wide build options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildOptions {
    /// Application tag written into object metadata and used to filter it
    /// when a session resumes.
    pub application: String,
    /// Reference use applied by [`crate::BuildSession::build_default`].
    pub use_reference: bool,
    /// Whether [`crate::BuildSession::open`] replays document metadata.
    pub resume_from_document: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            application: DEFAULT_APPLICATION.to_owned(),
            use_reference: true,
            resume_from_document: true,
        }
    }
}

impl BuildOptions {
    /// Checks option invariants.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] when `application` is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application.trim().is_empty() {
            return Err(ConfigError::Invalid("application tag must be non-empty"));
        }
        Ok(())
    }
}

/// Storage port for raw config blobs (keyed by logical name).
pub trait ConfigStore {
    /// Load a raw config blob. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Persist a raw config blob.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Error type for config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key not present in store.
    #[error("not found")]
    NotFound,
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Loaded options violate an invariant.
    #[error("invalid options: {0}")]
    Invalid(&'static str),
    /// Catch-all error variant.
    #[error("other: {0}")]
    Other(String),
}

/// Loads and saves [`BuildOptions`] through a [`ConfigStore`].
pub struct OptionsService<S> {
    store: S,
}

impl<S> OptionsService<S> {
    /// Create a new service using the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Consume the service and return the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S: ConfigStore> OptionsService<S> {
    /// Loads options, falling back to defaults when none are stored.
    ///
    /// Missing fields take their default values.
    pub fn load(&self) -> Result<BuildOptions, ConfigError> {
        let options = match self.store.load_raw(BUILD_OPTIONS_KEY) {
            Ok(bytes) if bytes.is_empty() => BuildOptions::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(ConfigError::NotFound) => BuildOptions::default(),
            Err(e) => return Err(e),
        };
        options.validate()?;
        Ok(options)
    }

    /// Validates and persists options.
    pub fn save(&self, options: &BuildOptions) -> Result<(), ConfigError> {
        options.validate()?;
        let data = serde_json::to_vec_pretty(options)?;
        self.store.save_raw(BUILD_OPTIONS_KEY, &data)
    }
}
