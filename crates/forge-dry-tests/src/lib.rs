// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for Forge crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`components`] - Component fixtures (identities, lines, walls, probes)
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`creators`] - Probe creators with scripted behaviour and call recording
//! - [`document`] - Document wrapper with failure injection and call counters

pub mod components;
pub mod config;
pub mod creators;
pub mod document;

pub use components::{hosted, id, line, probe, wall};
pub use config::InMemoryConfigStore;
pub use creators::{HostedProbe, HostedProbeCreator, Probe, ProbeBehavior, ProbeCreator, ProbeLog};
pub use document::{FaultPlan, FaultyDocument};
