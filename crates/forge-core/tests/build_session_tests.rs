// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(
    missing_docs,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::float_cmp
)]
use forge_core::{
    decode_wall_payload, BuildErrorKind, BuildOptions, BuildResult, BuildSession, BuildStage,
    CreatorRegistry, Document, MemoryDocument, Parameter, ParameterValue, WALL_OBJECT_KIND,
};
use forge_dry_tests::{id, line, wall};

fn demo_session() -> BuildSession<MemoryDocument> {
    BuildSession::new(
        MemoryDocument::new(),
        CreatorRegistry::discovered(),
        BuildOptions::default(),
    )
}

#[test]
fn discovered_registry_binds_demo_variants() {
    let registry = CreatorRegistry::<MemoryDocument>::discovered();
    assert_eq!(registry.variants(), vec!["line", "wall"]);
    assert!(std::sync::Arc::ptr_eq(
        &registry,
        &CreatorRegistry::<MemoryDocument>::discovered()
    ));
}

#[test]
fn line_then_hosted_wall_then_dangling_wall() {
    let session = demo_session();
    let a = line("A", [0.0, 0.0, 0.0], [4.0, 0.0, 0.0]);
    let b = wall("B", "A");
    let c = wall("C", "Z");

    let a_handle = session.build(&a, true).unwrap().handle().unwrap();
    let b_handle = session.build(&b, true).unwrap().handle().unwrap();
    let err = session.build(&c, true).unwrap_err();

    assert_eq!(err.identity, id("C"));
    assert_eq!(err.variant, "wall");
    assert_eq!(err.stage, BuildStage::TransactionOpen);
    assert!(matches!(err.kind, BuildErrorKind::UnresolvedReference(ref r) if *r == id("Z")));

    assert_eq!(session.resolve("A"), Some(a_handle));
    assert_eq!(session.resolve("B"), Some(b_handle));
    assert_eq!(session.resolve("C"), None);
    let ids: Vec<_> = session
        .references()
        .iter()
        .map(|(identity, _)| identity.as_str().to_owned())
        .collect();
    assert_eq!(ids, ["A", "B"]);

    session.with_document(|doc| {
        assert_eq!(doc.len(), 2);
        let record = doc.object(b_handle).unwrap();
        assert_eq!(record.kind, WALL_OBJECT_KIND);
        let (start, end, height) = decode_wall_payload(&record.payload).unwrap();
        assert_eq!((start, end, height), ([0.0; 3], [4.0, 0.0, 0.0], 3.0));
        assert_eq!(record.metadata[0].identity, id("B"));
        assert_eq!(record.metadata[0].application, "forge");
        assert_eq!(record.metadata[0].variant, "wall");
    });
}

#[test]
fn wall_without_reference_uses_own_baseline() {
    let session = demo_session();
    let handle = session
        .build(&wall("B", "A"), false)
        .unwrap()
        .handle()
        .unwrap();
    session.with_document(|doc| {
        let (start, end, _) = decode_wall_payload(&doc.object(handle).unwrap().payload).unwrap();
        assert_eq!((start, end), ([0.0; 3], [1.0, 0.0, 0.0]));
    });
}

#[test]
fn degenerate_line_is_declined_and_not_registered() {
    let session = demo_session();
    let result = session
        .build(&line("P", [1.0; 3], [1.0; 3]), true)
        .unwrap();
    assert!(matches!(result, BuildResult::Declined { .. }));
    assert_eq!(result.handle(), None);
    assert!(session.references().is_empty());
    session.with_document(|doc| assert!(doc.is_empty()));
}

#[test]
fn parameters_are_applied_to_created_object() {
    let session = demo_session();
    let component = line("A", [0.0; 3], [1.0, 1.0, 0.0])
        .with_parameter(Parameter::new("layer", "structure"))
        .with_parameter(Parameter::new("fire-rating", 2_i64));
    let handle = session.build(&component, true).unwrap().handle().unwrap();
    session.with_document(|doc| {
        let params = &doc.object(handle).unwrap().parameters;
        assert_eq!(params["layer"], ParameterValue::Text("structure".into()));
        assert_eq!(params["fire-rating"], ParameterValue::Integer(2));
    });
}

#[test]
fn build_all_keeps_input_order_and_continues_past_failures() {
    let session = demo_session();
    let components = [
        wall("W", "L"),
        line("L", [0.0; 3], [2.0, 0.0, 0.0]),
        line("L", [0.0; 3], [3.0, 0.0, 0.0]),
        wall("V", "L"),
    ];
    let report = session.build_all(&components, true);

    let outcomes: Vec<_> = report
        .entries
        .iter()
        .map(|(identity, outcome)| (identity.as_str(), outcome.is_ok()))
        .collect();
    assert_eq!(
        outcomes,
        vec![("W", false), ("L", true), ("L", false), ("V", true)]
    );
    assert!(!report.is_clean());
    assert_eq!(report.created().count(), 2);
    let kinds: Vec<_> = report.failures().map(|e| &e.kind).collect();
    assert!(matches!(kinds[0], BuildErrorKind::UnresolvedReference(_)));
    assert!(matches!(kinds[1], BuildErrorKind::DuplicateIdentity { .. }));
}

#[test]
fn build_default_follows_configured_reference_policy() {
    let session = BuildSession::new(
        MemoryDocument::new(),
        CreatorRegistry::discovered(),
        BuildOptions {
            use_reference: false,
            ..BuildOptions::default()
        },
    );
    assert!(!session.options().use_reference);
    assert_eq!(session.creators().variants(), vec!["line", "wall"]);
    // The reference "A" does not exist, but reference use is off.
    assert!(session.build_default(&wall("B", "A")).is_ok());
}

#[test]
fn into_parts_returns_committed_document() {
    let session = demo_session();
    session
        .build(&line("A", [0.0; 3], [1.0, 0.0, 0.0]), true)
        .unwrap();
    let (document, references) = session.into_parts();
    assert_eq!(document.live_tx(), None);
    assert_eq!(document.tagged_objects().len(), 1);
    assert_eq!(references.len(), 1);
}
