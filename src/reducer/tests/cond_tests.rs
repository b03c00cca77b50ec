//! Tests for conditionals

use super::helpers::*;
use crate::reducer::types::*;
use maplit::btreemap;

#[test]
fn test_empty_condition_selects_else() {
    let h = Harness::new();
    let cond = Compound::single(Cond::new(Compound::nil(), lit(&["A"]), lit(&["B"])));
    assert_eq!(h.reduce(&cond).unwrap(), lit(&["B"]));
}

#[test]
fn test_non_empty_condition_selects_then() {
    let h = Harness::new();
    // Any atom counts as true, including the empty string
    for test in [lit(&["false"]), lit(&[""]), lit(&["a", "b"])] {
        let cond = Compound::single(Cond::new(test, lit(&["A"]), lit(&["B"])));
        assert_eq!(h.reduce(&cond).unwrap(), lit(&["A"]));
    }
}

#[test]
fn test_untaken_branch_is_never_reduced() {
    let h = Harness::new();
    // The then branch would fail if it were touched
    let cond = Compound::single(Cond::new(Compound::nil(), var("unbound"), lit(&["B"])));
    assert_eq!(h.reduce(&cond).unwrap(), lit(&["B"]));
    assert!(h.drain().is_empty());
}

#[test]
fn test_branch_reduced_in_current_scope() {
    let h = Harness::new();
    let scope = Scope::from_bindings(btreemap! {
        "flag".to_string() => lit(&["yes"]),
        "x".to_string() => lit(&["X"]),
    });
    let cond = Compound::single(Cond::new(var("flag"), var("x"), Compound::nil()));
    assert_eq!(h.reduce_in(&cond, &scope).unwrap(), lit(&["X"]));
}

#[test]
fn test_pending_condition_preserves_branches() {
    let h = Harness::new();
    let then = Compound::single(apply(foreign("rm -rf scratch", &[])));
    let otherwise = var("not_even_bound");
    let cond = Compound::single(Cond::new(
        Compound::single(apply(foreign("test -f x", &[]))),
        then.clone(),
        otherwise.clone(),
    ));

    let residual = h.reduce(&cond).unwrap();
    assert_eq!(
        residual,
        Compound::single(Cond::new(
            Compound::single(TicketHandle::new(1, ticket(1))),
            then,
            otherwise,
        ))
    );
    // Only the condition was submitted
    let submitted = h.drain();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].lambda.src, "test -f x");
}

#[test]
fn test_branch_evaluates_only_on_final_condition() {
    let mut h = Harness::new();
    let cond = Compound::single(Cond::new(
        Compound::single(apply(foreign("check", &[]))),
        Compound::single(apply(foreign("then-step", &[]))),
        Compound::single(apply(foreign("else-step", &[]))),
    ));

    let residual = h.reduce(&cond).unwrap();
    let first: Vec<String> = h.drain().into_iter().map(|i| i.lambda.src).collect();
    assert_eq!(first, vec!["check"]);

    h.finish(1, ticket(1), lit(&["ok"]));
    let next = h.reduce(&residual).unwrap();
    let second: Vec<String> = h.drain().into_iter().map(|i| i.lambda.src).collect();
    assert_eq!(second, vec!["then-step"]);
    assert_eq!(next, Compound::single(TicketHandle::new(1, ticket(2))));
}
