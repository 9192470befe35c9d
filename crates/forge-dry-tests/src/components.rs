// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Component fixtures.

use forge_core::{Component, Identity, Line, Wall};

use crate::creators::{HostedProbe, Probe};

/// Builds an [`Identity`] from a literal.
///
/// # Panics
/// Panics when `value` is empty; fixtures are expected to use fixed names.
#[allow(clippy::expect_used)]
pub fn id(value: &str) -> Identity {
    Identity::new(value).expect("fixture identity must be non-empty")
}

/// Line component from `start` to `end`.
pub fn line(identity: &str, start: [f32; 3], end: [f32; 3]) -> Component {
    Component::new(id(identity), Line { start, end })
}

/// Wall component 3 units tall hosted on `reference`.
///
/// The wall's own baseline runs along the x axis so it is also buildable
/// without a reference.
pub fn wall(identity: &str, reference: &str) -> Component {
    Component::new(
        id(identity),
        Wall {
            start: [0.0, 0.0, 0.0],
            end: [1.0, 0.0, 0.0],
            height: 3.0,
        },
    )
    .with_reference(id(reference))
}

/// Probe component; its creator never asks for a reference.
pub fn probe(identity: &str) -> Component {
    Component::new(id(identity), Probe)
}

/// Hosted probe component declaring `reference`.
pub fn hosted(identity: &str, reference: &str) -> Component {
    Component::new(id(identity), HostedProbe).with_reference(id(reference))
}
