// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! forge-core: transactional construction of document models.
//!
//! A caller hands [`Component`]s to a [`BuildSession`] in dependency order.
//! Each `build` call locks the target [`Document`], picks the single
//! [`Creator`] bound to the component's variant, resolves the component's
//! declared reference through the session's [`ReferenceResolver`], runs the
//! creator, tags the new object, and commits. Any failure aborts the
//! document transaction and leaves the resolver untouched.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod component;
mod config;
mod creator;
/// Demo variants (line, wall) for [`MemoryDocument`].
pub mod demo;
mod document;
mod ident;
mod memory;
mod payload;
mod reference;
mod session;
mod tx;

#[doc(hidden)]
pub use inventory;

// Re-exports for stable public API
pub use component::{Component, ComponentKind, Parameter, ParameterValue};
pub use config::{
    BuildOptions, ConfigError, ConfigStore, OptionsService, BUILD_OPTIONS_KEY, DEFAULT_APPLICATION,
};
pub use creator::{
    erase_creator, CreateContext, CreationError, Creator, CreatorRegistration, CreatorRegistry,
    CreatorRegistryBuilder, DispatchError, ErasedCreator,
};
pub use demo::line::{Line, LineCreator, LINE_OBJECT_KIND};
pub use demo::wall::{Wall, WallCreator, WallError, WALL_OBJECT_KIND};
pub use document::{Document, DocumentError, Handle, Metadata};
pub use ident::{make_variant_id, Hash, Identity, InvalidIdentity, VariantId};
pub use memory::{MemoryDocument, ObjectRecord};
pub use payload::{
    decode_segment_payload, decode_wall_payload, encode_segment_payload, encode_wall_payload,
};
pub use reference::{ReferenceError, ReferenceResolver};
pub use session::{BuildError, BuildErrorKind, BuildReport, BuildResult, BuildSession, BuildStage};
pub use tx::TxId;
