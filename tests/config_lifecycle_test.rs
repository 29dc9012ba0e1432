//! Configuration lifecycle tests for the processor.
//!
//! These tests cover registration, revision tracking, atomic replacement,
//! rejection of malformed configurations and removal.

use std::sync::Arc;

use matchgate::{
    evaluate, BuildError, EvalBuffer, Event, FieldValue, MatchState, Processor, QueryVerdict,
    VecSink,
};

const REV1_CONFIG: &str = r#"
matchers:
  - name: M_login
    match:
      categories: [42]
      fields:
        - { position: 0, op: eq, value: "login" }
  - name: M_target
    any_of: [M_login]
targets: [M_target]
"#;

const REV2_CONFIG: &str = r#"
matchers:
  - name: M_logout
    match:
      categories: [42]
      fields:
        - { position: 0, op: eq, value: "logout" }
  - name: M_target
    any_of: [M_logout]
targets: [M_target]
"#;

fn new_processor() -> Processor {
    Processor::new(Arc::new(VecSink::new()))
}

fn login_event() -> Event {
    Event::new(42, vec!["login".into()], 0)
}

#[test]
fn test_revisions_increment_per_source() -> anyhow::Result<()> {
    let processor = new_processor();

    assert_eq!(processor.update_config("app", REV1_CONFIG.as_bytes())?, 1);
    assert_eq!(processor.update_config("app", REV2_CONFIG.as_bytes())?, 2);
    assert_eq!(processor.update_config("web", REV1_CONFIG.as_bytes())?, 1);

    assert_eq!(processor.revision("app"), Some(2));
    assert_eq!(processor.revision("web"), Some(1));
    assert_eq!(processor.active_configs(), vec!["app", "web"]);
    Ok(())
}

#[test]
fn test_replacement_changes_behavior_atomically() -> anyhow::Result<()> {
    let processor = new_processor();
    processor.update_config("app", REV1_CONFIG.as_bytes())?;

    let event = login_event();
    assert_eq!(
        processor.query("app", "M_target", &event),
        QueryVerdict::Matched
    );

    processor.update_config("app", REV2_CONFIG.as_bytes())?;
    assert_eq!(
        processor.query("app", "M_target", &event),
        QueryVerdict::NotMatched
    );
    assert_eq!(
        processor.query("app", "M_login", &event),
        QueryVerdict::UnknownTarget
    );
    Ok(())
}

#[test]
fn test_snapshot_taken_before_update_keeps_old_semantics() -> anyhow::Result<()> {
    let processor = new_processor();
    processor.update_config("app", REV1_CONFIG.as_bytes())?;

    let old = processor.config("app").expect("config should be active");
    processor.update_config("app", REV2_CONFIG.as_bytes())?;

    // The held handle still evaluates with revision 1 semantics.
    assert_eq!(old.revision, 1);
    let target = old.graph.index_of("M_target").expect("target should exist");
    let mut buf = EvalBuffer::for_graph(&old.graph);
    assert_eq!(
        evaluate(&old.graph, &login_event(), target, &mut buf)?,
        MatchState::Matched
    );

    // The processor itself has moved on.
    assert_eq!(processor.config("app").map(|c| c.revision), Some(2));
    Ok(())
}

#[test]
fn test_rejected_update_preserves_previous_revision() {
    let processor = new_processor();
    processor
        .update_config("app", REV1_CONFIG.as_bytes())
        .unwrap();

    let broken = r#"
matchers:
  - name: M_top
    all_of: [M_ghost]
"#;
    let err = processor.update_config("app", broken.as_bytes()).unwrap_err();
    assert_eq!(
        err,
        BuildError::UnresolvedReference {
            matcher: "M_top".to_string(),
            reference: "M_ghost".to_string(),
        }
    );

    assert_eq!(processor.revision("app"), Some(1));
    assert_eq!(
        processor.query("app", "M_target", &login_event()),
        QueryVerdict::Matched
    );
}

#[test]
fn test_update_rejects_matcher_with_two_bodies() {
    let processor = new_processor();
    processor
        .update_config("app", REV1_CONFIG.as_bytes())
        .unwrap();

    // A matcher carrying both a `match` body and a `not` body is ambiguous;
    // the update must fail outright rather than keep one body and drop the
    // other.
    let ambiguous = r#"
matchers:
  - name: M_base
    match:
      categories: [2]
  - name: M_weird
    match:
      categories: [2]
    not: M_base
"#;
    let err = processor
        .update_config("app", ambiguous.as_bytes())
        .unwrap_err();
    assert!(matches!(err, BuildError::Parse(_)));

    assert_eq!(processor.revision("app"), Some(1));
    assert_eq!(
        processor.query("app", "M_target", &login_event()),
        QueryVerdict::Matched
    );
}

#[test]
fn test_cyclic_configuration_is_rejected() {
    let processor = new_processor();

    let cyclic = r#"
matchers:
  - name: M1
    all_of: [M2]
  - name: M2
    all_of: [M1]
"#;
    let err = processor.update_config("app", cyclic.as_bytes()).unwrap_err();
    assert!(matches!(err, BuildError::CyclicGraph { .. }));
    assert_eq!(processor.revision("app"), None);
}

#[test]
fn test_duplicate_matcher_name_is_rejected() {
    let processor = new_processor();

    let duplicated = r#"
matchers:
  - name: M_twice
    match:
      categories: [1]
  - name: M_twice
    match:
      categories: [2]
"#;
    let err = processor
        .update_config("app", duplicated.as_bytes())
        .unwrap_err();
    assert_eq!(
        err,
        BuildError::DuplicateName {
            name: "M_twice".to_string(),
        }
    );
}

#[test]
fn test_malformed_yaml_is_rejected_as_parse_error() {
    let processor = new_processor();

    let err = processor
        .update_config("app", b"matchers: [not a mapping")
        .unwrap_err();
    assert!(matches!(err, BuildError::Parse(_)));
}

#[test]
fn test_unknown_target_name_is_rejected() {
    let processor = new_processor();

    let bad_targets = r#"
matchers:
  - name: M_only
    match:
      categories: [1]
targets: [M_elsewhere]
"#;
    let err = processor
        .update_config("app", bad_targets.as_bytes())
        .unwrap_err();
    assert_eq!(
        err,
        BuildError::UnknownTarget {
            name: "M_elsewhere".to_string(),
        }
    );
}

#[test]
fn test_invalid_regex_is_rejected_at_build_time() {
    let processor = new_processor();

    let bad_regex = r#"
matchers:
  - name: M_re
    match:
      categories: [1]
      fields:
        - { position: 0, op: regex, value: "([unclosed" }
"#;
    let err = processor
        .update_config("app", bad_regex.as_bytes())
        .unwrap_err();
    assert!(matches!(err, BuildError::InvalidRegex { .. }));
}

#[test]
fn test_mismatched_op_and_value_are_rejected() {
    let processor = new_processor();

    let bad_predicate = r#"
matchers:
  - name: M_odd
    match:
      categories: [1]
      fields:
        - { position: 0, op: gt, value: "tall" }
"#;
    let err = processor
        .update_config("app", bad_predicate.as_bytes())
        .unwrap_err();
    assert!(matches!(err, BuildError::InvalidPredicate { .. }));
}

#[test]
fn test_remove_config_then_re_register() -> anyhow::Result<()> {
    let processor = new_processor();
    processor.update_config("app", REV1_CONFIG.as_bytes())?;
    processor.update_config("app", REV2_CONFIG.as_bytes())?;

    assert!(processor.remove_config("app"));
    assert!(!processor.remove_config("app"));
    assert_eq!(processor.revision("app"), None);
    assert_eq!(
        processor.query("app", "M_target", &login_event()),
        QueryVerdict::UnknownConfig
    );

    // A fresh registration starts a new revision line.
    assert_eq!(processor.update_config("app", REV1_CONFIG.as_bytes())?, 1);
    Ok(())
}

#[test]
fn test_sources_are_isolated() -> anyhow::Result<()> {
    let processor = new_processor();
    processor.update_config("app", REV1_CONFIG.as_bytes())?;
    processor.update_config("web", REV2_CONFIG.as_bytes())?;

    let event = login_event();
    assert_eq!(
        processor.query("app", "M_target", &event),
        QueryVerdict::Matched
    );
    assert_eq!(
        processor.query("web", "M_target", &event),
        QueryVerdict::NotMatched
    );

    // Removing one source leaves the other untouched.
    processor.remove_config("app");
    assert_eq!(processor.revision("web"), Some(1));
    Ok(())
}

#[test]
fn test_empty_targets_registers_every_matcher() -> anyhow::Result<()> {
    let processor = new_processor();

    let no_targets = r#"
matchers:
  - name: M_login
    match:
      categories: [42]
      fields:
        - { position: 0, op: eq, value: "login" }
  - name: M_any
    match:
      categories: [42]
"#;
    processor.update_config("app", no_targets.as_bytes())?;

    let config = processor.config("app").expect("config should be active");
    assert_eq!(config.targets, vec![0, 1]);
    Ok(())
}

#[test]
fn test_nested_combination_targets() -> anyhow::Result<()> {
    let processor = new_processor();

    let nested = r#"
matchers:
  - name: M_a
    match:
      categories: [1]
      fields:
        - { position: 0, op: eq, value: "a" }
  - name: M_b
    match:
      categories: [1]
      fields:
        - { position: 0, op: eq, value: "b" }
  - name: M_either
    any_of: [M_a, M_b]
  - name: M_neither
    not: M_either
targets: [M_neither]
"#;
    processor.update_config("app", nested.as_bytes())?;

    let event_a = Event::new(1, vec!["a".into()], 0);
    let event_c = Event::new(1, vec![FieldValue::from("c")], 0);

    assert_eq!(
        processor.query("app", "M_neither", &event_a),
        QueryVerdict::NotMatched
    );
    assert_eq!(
        processor.query("app", "M_neither", &event_c),
        QueryVerdict::Matched
    );
    Ok(())
}
