// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod common;

use std::panic::{catch_unwind, AssertUnwindSafe};

use forge_core::{
    BuildErrorKind, BuildOptions, BuildResult, BuildSession, BuildStage, CreationError,
    DocumentError, Handle, Parameter, ReferenceResolver,
};
use forge_dry_tests::{hosted, id, probe, FaultyDocument, ProbeBehavior, ProbeLog};

use common::{object_count, probe_registry, rig};

fn assert_pristine(session: &BuildSession<FaultyDocument>) {
    assert_eq!(object_count(session), 0);
    assert!(session.references().is_empty());
    assert_eq!(session.with_document(|doc| doc.inner().live_tx()), None);
}

#[test]
fn creation_failure_discards_partial_object_and_allows_retry() {
    let rig = rig();
    rig.log.set_behavior(ProbeBehavior::Fail);

    let err = rig.session.build(&probe("P"), true).unwrap_err();
    assert!(matches!(
        err.kind,
        BuildErrorKind::CreationFailed(CreationError::Document(DocumentError::Other(_)))
    ));
    assert_eq!(err.stage, BuildStage::TransactionOpen);
    assert_eq!(rig.plan.aborts(), 1);
    assert_pristine(&rig.session);

    rig.log.set_behavior(ProbeBehavior::Create);
    let handle = rig.session.build(&probe("P"), true).unwrap().handle();
    assert_eq!(rig.session.resolve("P"), handle);
}

#[test]
fn panicking_creator_aborts_and_session_stays_usable() {
    let rig = rig();
    rig.log.set_behavior(ProbeBehavior::Panic);

    let outcome = catch_unwind(AssertUnwindSafe(|| rig.session.build(&probe("P"), true)));
    assert!(outcome.is_err());
    assert_eq!(rig.plan.aborts(), 1);
    assert_pristine(&rig.session);

    rig.log.set_behavior(ProbeBehavior::Create);
    assert!(rig.session.build(&probe("P"), true).is_ok());
    assert_eq!(object_count(&rig.session), 1);
}

#[test]
fn commit_failure_rolls_back_registration() {
    let rig = rig();
    rig.plan.set_fail_commit(true);

    let err = rig.session.build(&probe("P"), true).unwrap_err();
    assert!(matches!(err.kind, BuildErrorKind::CommitFailed(_)));
    assert_eq!(err.stage, BuildStage::Registered);
    assert_eq!(rig.plan.aborts(), 1);
    assert_pristine(&rig.session);

    rig.plan.set_fail_commit(false);
    assert!(rig.session.build(&probe("P"), true).is_ok());
}

#[test]
fn begin_failure_never_reaches_the_creator() {
    let rig = rig();
    rig.plan.set_fail_begin(true);

    let err = rig.session.build(&probe("P"), true).unwrap_err();
    assert!(matches!(err.kind, BuildErrorKind::TransactionFailed(_)));
    assert_eq!(err.stage, BuildStage::CreatorResolved);
    assert_eq!(rig.log.calls(), 0);
    assert_eq!(rig.plan.aborts(), 0);
}

#[test]
fn post_processing_failures_abort_after_creation() {
    let rig = rig();
    rig.plan.set_fail_metadata(true);
    let err = rig.session.build(&probe("P"), true).unwrap_err();
    assert!(matches!(err.kind, BuildErrorKind::PostProcessFailed(_)));
    assert_eq!(err.stage, BuildStage::HandleCreated);
    assert_pristine(&rig.session);

    rig.plan.set_fail_metadata(false);
    rig.plan.reject_parameter(Some("mark"));
    let marked = probe("P").with_parameter(Parameter::new("mark", "x"));
    let err = rig.session.build(&marked, true).unwrap_err();
    assert!(matches!(
        err.kind,
        BuildErrorKind::PostProcessFailed(DocumentError::ParameterRejected { ref name, .. }) if name == "mark"
    ));
    assert_pristine(&rig.session);
}

#[test]
fn duplicate_identity_is_rejected_and_first_binding_kept() {
    let rig = rig();
    let first = rig.session.build(&probe("P"), true).unwrap().handle().unwrap();

    let err = rig.session.build(&probe("P"), true).unwrap_err();
    assert!(matches!(err.kind, BuildErrorKind::DuplicateIdentity { existing } if existing == first));
    assert_eq!(err.stage, BuildStage::PostProcessed);
    assert_eq!(rig.session.resolve("P"), Some(first));
    assert_eq!(object_count(&rig.session), 1);
}

#[test]
fn declined_creation_commits_without_registering() {
    let rig = rig();
    rig.log.set_behavior(ProbeBehavior::Decline);

    let result = rig.session.build(&probe("P"), true).unwrap();
    assert!(matches!(result, BuildResult::Declined { .. }));
    assert_eq!(rig.plan.commits(), 1);
    assert_pristine(&rig.session);
}

#[test]
fn stale_reference_handle_is_unresolved() {
    let (document, _plan) = FaultyDocument::new();
    let log = ProbeLog::new();
    let mut references = ReferenceResolver::new();
    references
        .register(id("ghost"), Handle::from_raw(99))
        .unwrap();
    let session = BuildSession::with_references(
        document,
        probe_registry(&log),
        BuildOptions::default(),
        references,
    );

    let err = session.build(&hosted("H", "ghost"), true).unwrap_err();
    assert!(matches!(err.kind, BuildErrorKind::UnresolvedReference(ref r) if *r == id("ghost")));
    assert_eq!(log.calls(), 0);
    assert_eq!(session.references().len(), 1);
}
