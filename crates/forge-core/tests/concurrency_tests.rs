// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod common;

use std::thread;

use forge_core::BuildErrorKind;
use forge_dry_tests::probe;

use common::{object_count, rig};

const THREADS: usize = 8;
const PER_THREAD: usize = 16;

#[test]
fn concurrent_builds_serialize_on_the_document() {
    let rig = rig();
    thread::scope(|scope| {
        for t in 0..THREADS {
            let session = &rig.session;
            scope.spawn(move || {
                for i in 0..PER_THREAD {
                    session.build(&probe(&format!("t{t}-{i}")), true).unwrap();
                }
            });
        }
    });

    assert_eq!(rig.plan.max_live(), 1);
    assert_eq!(rig.plan.commits(), THREADS * PER_THREAD);
    assert_eq!(object_count(&rig.session), THREADS * PER_THREAD);
    assert_eq!(rig.session.references().len(), THREADS * PER_THREAD);
}

#[test]
fn racing_builds_of_one_identity_register_once() {
    let rig = rig();
    let outcomes: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let session = &rig.session;
                scope.spawn(move || session.build(&probe("shared"), true))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .filter_map(|o| o.as_ref().err())
        .all(|e| matches!(e.kind, BuildErrorKind::DuplicateIdentity { .. })));
    assert_eq!(object_count(&rig.session), 1);
    assert_eq!(rig.plan.aborts(), THREADS - 1);
}
