// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wall variant: an extruded baseline, optionally taken from a referenced line.
use thiserror::Error;

use crate::component::ComponentKind;
use crate::creator::{CreateContext, CreationError, Creator};
use crate::document::Handle;
use crate::memory::MemoryDocument;
use crate::payload::{decode_segment_payload, encode_wall_payload};

/// Native object kind written for walls.
pub const WALL_OBJECT_KIND: &str = "wall";

/// Attributes of a wall component.
///
/// `start`/`end` are used when the wall is built without a reference; with a
/// reference the baseline comes from the referenced line object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wall {
    /// Baseline start point.
    pub start: [f32; 3],
    /// Baseline end point.
    pub end: [f32; 3],
    /// Extrusion height; must be positive and finite.
    pub height: f32,
}

impl ComponentKind for Wall {
    const NAME: &'static str = "wall";
}

/// Wall-specific creation failures.
#[derive(Debug, Error)]
pub enum WallError {
    /// Height was zero, negative or not finite.
    #[error("invalid wall height {0}")]
    InvalidHeight(f32),
    /// The referenced object is not a line.
    #[error("referenced object {0} is not a line")]
    NotALine(Handle),
}

/// Creates wall objects, hosting them on a referenced line when one is given.
#[derive(Debug, Default, Clone, Copy)]
pub struct WallCreator;

impl Creator<MemoryDocument> for WallCreator {
    type Kind = Wall;

    const WANTS_REFERENCE: bool = true;

    fn create(
        &self,
        cx: CreateContext<'_, MemoryDocument>,
        wall: &Wall,
    ) -> Result<Option<Handle>, CreationError> {
        if !(wall.height.is_finite() && wall.height > 0.0) {
            return Err(CreationError::capability(WallError::InvalidHeight(wall.height)));
        }
        let (start, end) = match cx.reference {
            Some(host) => cx
                .document
                .object(host)
                .and_then(|record| decode_segment_payload(&record.payload))
                .ok_or_else(|| CreationError::capability(WallError::NotALine(host)))?,
            None => (wall.start, wall.end),
        };
        let payload = encode_wall_payload(start, end, wall.height);
        let handle = cx.document.insert_object(cx.tx, WALL_OBJECT_KIND, payload)?;
        Ok(Some(handle))
    }
}

crate::register_creator!(MemoryDocument, WallCreator);
