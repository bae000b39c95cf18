//! Propagation across the full three-layer stack.
//!
//! A base-class edit must reach modules that only ever looked at the
//! outermost layer, and an incremental update chain must end up equivalent
//! to a from-scratch rebuild over the new source state.

use std::collections::BTreeSet;

use sift_conformance::CheckerStack;
use sift_environment::DependencyKey;

// ---------------------------------------------------------------------------
// Multi-key fan-in: metadata reads both the class and its base pointer
// ---------------------------------------------------------------------------

#[test]
fn base_class_edit_propagates_to_checked_modules() {
    let stack = CheckerStack::new();
    let dep = stack.check_module("m");

    stack.publish("pkg.C", "class C");
    stack.publish("pkg.C.base", "class B");
    assert_eq!(
        stack.get_global(Some(&dep), "pkg.C"),
        Some("class C <: class B".to_string())
    );

    // Edit only the base pointer; pkg.C itself is untouched.
    let result = stack.update(&["pkg.C.base"]);
    assert_eq!(result.triggered(), &BTreeSet::from([dep]));

    stack.publish("pkg.C.base", "class A");
    assert_eq!(
        stack.get_global(None, "pkg.C"),
        Some("class C <: class A".to_string())
    );
}

#[test]
fn base_pointer_appearing_later_invalidates_the_class() {
    let stack = CheckerStack::new();
    let dep = stack.check_module("m");

    // No base fact yet: metadata is the bare class.
    stack.publish("pkg.C", "class C");
    assert_eq!(
        stack.get_global(Some(&dep), "pkg.C"),
        Some("class C".to_string())
    );

    // The base pointer coming into existence is a change to a key the
    // metadata derivation read (and found absent).
    let result = stack.update(&["pkg.C.base"]);
    assert_eq!(result.triggered(), &BTreeSet::from([dep]));

    stack.publish("pkg.C.base", "class B");
    assert_eq!(
        stack.get_global(None, "pkg.C"),
        Some("class C <: class B".to_string())
    );
}

#[test]
fn class_edit_does_not_disturb_unrelated_classes() {
    let stack = CheckerStack::new();
    let dep_c = stack.check_module("uses_c");
    let dep_d = stack.check_module("uses_d");

    stack.publish("pkg.C", "class C");
    stack.publish("pkg.C.base", "class B");
    stack.publish("pkg.D", "class D");
    stack.get_global(Some(&dep_c), "pkg.C");
    stack.get_global(Some(&dep_d), "pkg.D");

    let result = stack.update(&["pkg.C.base"]);
    assert_eq!(result.triggered(), &BTreeSet::from([dep_c]));
}

// ---------------------------------------------------------------------------
// Incremental vs. from-scratch equivalence
// ---------------------------------------------------------------------------

/// Applies `edits` to `stack` through the update chain, republishes the new
/// values, and returns the triggered dependency set.
fn apply_edits(stack: &CheckerStack, edits: &[(&str, &str)]) -> BTreeSet<DependencyKey> {
    let changed: Vec<&str> = edits.iter().map(|(k, _)| *k).collect();
    let result = stack.update(&changed);
    for (key, value) in edits {
        stack.publish(key, value);
    }
    result.triggered().clone()
}

#[test]
fn incremental_answers_match_a_fresh_rebuild() {
    let initial = [
        ("app.Model", "class Model"),
        ("app.Model.base", "class Base"),
        ("app.View", "class View"),
        ("lib.helper", "def helper"),
    ];
    let edits = [("app.Model.base", "class NewBase"), ("lib.helper", "def helper2")];
    let queries = ["app.Model", "app.View", "lib.helper", "missing.name"];

    // Incremental stack: query, edit, update, re-query.
    let stack = CheckerStack::new();
    for (key, value) in initial {
        stack.publish(key, value);
    }
    let mut old_values = Vec::new();
    for (i, q) in queries.iter().enumerate() {
        let dep = stack.check_module(&format!("m{i}"));
        old_values.push(stack.get_global(Some(&dep), q));
    }
    let triggered = apply_edits(&stack, &edits);
    let new_values: Vec<_> = queries.iter().map(|q| stack.get_global(None, q)).collect();

    // Fresh stack over the post-edit source state.
    let fresh = CheckerStack::new();
    fresh.publish("app.Model", "class Model");
    fresh.publish("app.Model.base", "class NewBase");
    fresh.publish("app.View", "class View");
    fresh.publish("lib.helper", "def helper2");
    let fresh_values: Vec<_> = queries.iter().map(|q| fresh.get_global(None, q)).collect();

    assert_eq!(new_values, fresh_values);

    // Every module whose answer actually changed must have been triggered.
    for (i, q) in queries.iter().enumerate() {
        let dep = stack.check_module(&format!("m{i}"));
        if old_values[i] != new_values[i] {
            assert!(
                triggered.contains(&dep),
                "module m{i} read {q}, whose value changed, but was not triggered"
            );
        }
    }
    // And modules reading only untouched keys must not be.
    assert!(!triggered.contains(&stack.check_module("m1")), "app.View is untouched");
}

#[test]
fn new_name_appearing_triggers_its_seekers() {
    let stack = CheckerStack::new();
    let dep = stack.check_module("m");

    // The module looked for a name that does not exist; absence is cached.
    assert_eq!(stack.get_global(Some(&dep), "pkg.Missing"), None);
    assert_eq!(stack.get_global(Some(&dep), "pkg.Missing"), None);

    let result = stack.update(&["pkg.Missing"]);
    assert_eq!(result.triggered(), &BTreeSet::from([dep]));

    stack.publish("pkg.Missing", "class Missing");
    assert_eq!(
        stack.get_global(None, "pkg.Missing"),
        Some("class Missing".to_string())
    );
}

#[test]
fn chained_updates_accumulate_correctly() {
    let stack = CheckerStack::new();
    let dep = stack.check_module("m");

    stack.publish("a.x", "1");
    stack.get_global(Some(&dep), "a.x");

    // First edit round.
    let first = stack.update(&["a.x"]);
    assert_eq!(first.triggered(), &BTreeSet::from([dep]));
    stack.publish("a.x", "2");

    // The reader has not re-run yet, so a second edit finds no registered
    // readers: the first trigger already told the driver to redo the work.
    let second = stack.update(&["a.x"]);
    assert!(second.triggered().is_empty());
    stack.publish("a.x", "3");

    // Re-running the reader registers it fresh.
    assert_eq!(stack.get_global(Some(&dep), "a.x"), Some("3".to_string()));
    let third = stack.update(&["a.x"]);
    assert_eq!(third.triggered(), &BTreeSet::from([dep]));
}
