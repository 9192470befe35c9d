// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Demo variants built against [`crate::MemoryDocument`].
//!
//! Both capabilities self-register, so
//! `CreatorRegistry::<MemoryDocument>::discovered()` resolves them.
pub mod line;
pub mod wall;
