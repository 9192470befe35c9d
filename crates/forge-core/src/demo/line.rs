// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Line variant: a straight segment between two points.
use crate::component::ComponentKind;
use crate::creator::{CreateContext, CreationError, Creator};
use crate::document::Handle;
use crate::memory::MemoryDocument;
use crate::payload::encode_segment_payload;

/// Native object kind written for lines.
pub const LINE_OBJECT_KIND: &str = "line";

/// Attributes of a line component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    /// Start point.
    pub start: [f32; 3],
    /// End point.
    pub end: [f32; 3],
}

impl ComponentKind for Line {
    const NAME: &'static str = "line";
}

/// Creates line objects. Degenerate lines (start == end) are declined.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineCreator;

impl Creator<MemoryDocument> for LineCreator {
    type Kind = Line;

    fn create(
        &self,
        cx: CreateContext<'_, MemoryDocument>,
        line: &Line,
    ) -> Result<Option<Handle>, CreationError> {
        if line.start == line.end {
            return Ok(None);
        }
        let payload = encode_segment_payload(line.start, line.end);
        let handle = cx.document.insert_object(cx.tx, LINE_OBJECT_KIND, payload)?;
        Ok(Some(handle))
    }
}

crate::register_creator!(MemoryDocument, LineCreator);
