// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod common;

use std::collections::BTreeSet;

use forge_core::BuildErrorKind;
use forge_dry_tests::{hosted, probe, ProbeBehavior};
use proptest::prelude::*;

use common::{object_count, rig};

#[derive(Debug, Clone)]
enum Step {
    Probe(u8),
    Hosted(u8, u8),
    FailingProbe(u8),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (0u8..12).prop_map(Step::Probe),
        3 => (0u8..12, 0u8..12).prop_map(|(a, b)| Step::Hosted(a, b)),
        1 => (0u8..12).prop_map(Step::FailingProbe),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn identities_register_at_most_once_and_failures_leave_no_trace(
        steps in prop::collection::vec(step(), 1..40)
    ) {
        let rig = rig();
        let mut registered = BTreeSet::new();

        for s in &steps {
            let (name, outcome) = match *s {
                Step::Probe(n) => {
                    let name = format!("n{n}");
                    (name.clone(), rig.session.build(&probe(&name), true))
                }
                Step::Hosted(n, host) => {
                    let name = format!("n{n}");
                    let outcome = rig.session.build(&hosted(&name, &format!("n{host}")), true);
                    (name, outcome)
                }
                Step::FailingProbe(n) => {
                    let name = format!("n{n}");
                    rig.log.set_behavior(ProbeBehavior::Fail);
                    let outcome = rig.session.build(&probe(&name), true);
                    rig.log.set_behavior(ProbeBehavior::Create);
                    prop_assert!(outcome.is_err());
                    (name, outcome)
                }
            };
            match outcome {
                Ok(result) => {
                    prop_assert!(registered.insert(name.clone()), "{name} registered twice");
                    prop_assert_eq!(rig.session.resolve(&name), result.handle());
                }
                Err(err) => {
                    if registered.contains(&name) {
                        prop_assert!(rig.session.resolve(&name).is_some());
                    } else {
                        let is_duplicate = matches!(err.kind, BuildErrorKind::DuplicateIdentity { .. });
                        prop_assert!(!is_duplicate);
                        prop_assert_eq!(rig.session.resolve(&name), None);
                    }
                }
            }
        }

        prop_assert_eq!(rig.session.references().len(), registered.len());
        prop_assert_eq!(object_count(&rig.session), registered.len());
    }
}
