// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use std::sync::Arc;

use forge_core::{BuildOptions, BuildSession, CreatorRegistry};
use forge_dry_tests::{FaultPlan, FaultyDocument, HostedProbeCreator, ProbeCreator, ProbeLog};

/// Session over a [`FaultyDocument`] with both probe creators registered.
pub struct Rig {
    pub session: BuildSession<FaultyDocument>,
    pub plan: FaultPlan,
    pub log: ProbeLog,
}

pub fn probe_registry(log: &ProbeLog) -> Arc<CreatorRegistry<FaultyDocument>> {
    Arc::new(
        CreatorRegistry::builder()
            .with(ProbeCreator::new(log.clone()))
            .with(HostedProbeCreator::new(log.clone()))
            .build(),
    )
}

pub fn rig() -> Rig {
    rig_with(BuildOptions::default())
}

pub fn rig_with(options: BuildOptions) -> Rig {
    let (document, plan) = FaultyDocument::new();
    let log = ProbeLog::new();
    let session = BuildSession::new(document, probe_registry(&log), options);
    Rig { session, plan, log }
}

/// Number of committed objects in the session's document.
pub fn object_count(session: &BuildSession<FaultyDocument>) -> usize {
    session.with_document(|doc| doc.inner().len())
}
