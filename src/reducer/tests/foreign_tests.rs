//! Tests for foreign applications and ticket handles

use super::helpers::*;
use crate::reducer::types::*;
use crate::reducer::ReduceError;
use crate::tickets::TicketSource;

#[test]
fn test_ground_foreign_app_requests_ticket() {
    let mut h = Harness::new();
    let app = Compound::single(apply(foreign("seq 1 3", &[])));

    let residual = h.reduce(&app).unwrap();
    assert_eq!(residual, Compound::single(TicketHandle::new(1, ticket(1))));
    assert!(!h.registry.is_queue_clear(h.query));

    h.finish(1, ticket(1), lit(&["1", "2", "3"]));
    assert_eq!(h.reduce(&residual).unwrap(), lit(&["1", "2", "3"]));
}

#[test]
fn test_unresolved_handle_is_unchanged() {
    let h = Harness::new();
    let handle = Compound::single(TicketHandle::new(2, ticket(9)));
    assert_eq!(h.reduce(&handle).unwrap(), handle);
}

#[test]
fn test_handle_substitution_is_observed() {
    let mut h = Harness::new();
    h.finish(1, ticket(4), lit(&["v"]));
    let observer = RecordingObserver::default();
    let value = h
        .reduce_observed(&Compound::single(TicketHandle::new(1, ticket(4))), &observer)
        .unwrap();
    assert_eq!(value, lit(&["v"]));
    assert_eq!(observer.events(), vec!["substituted 'v'"]);
}

#[test]
fn test_channel_is_carried_into_handle() {
    let mut h = Harness::new();
    let lam = ForeignLambda::bash(Signature::new().output("a").output("b"), "a=1; b=2");
    let app = Compound::single(Apply::new(2, Compound::single(lam)));

    let residual = h.reduce(&app).unwrap();
    assert_eq!(residual, Compound::single(TicketHandle::new(2, ticket(1))));
    let submitted = h.drain();
    assert_eq!(submitted[0].channel, 2);

    h.finish(1, ticket(1), lit(&["1"]));
    h.finish(2, ticket(1), lit(&["2"]));
    assert_eq!(h.reduce(&residual).unwrap(), lit(&["2"]));
}

#[test]
fn test_arguments_are_submitted_ground() {
    let h = Harness::new().global("name", lit(&["world"]));
    let app = Compound::single(apply(foreign("echo $who", &["who"])).bind("who", var("name")));
    h.reduce(&app).unwrap();

    let submitted = h.drain();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].query, h.query);
    assert_eq!(submitted[0].args["who"], vec!["world".to_string()]);
}

#[test]
fn test_multi_valued_param_requests_one_ticket_each() {
    let h = Harness::new();
    let app = Compound::single(apply(foreign("echo $x", &["x"])).bind("x", lit(&["a", "b"])));

    let residual = h.reduce(&app).unwrap();
    assert_eq!(
        residual,
        Compound::new(vec![
            TicketHandle::new(1, ticket(1)).into(),
            TicketHandle::new(1, ticket(2)).into(),
        ])
    );
    let args: Vec<Vec<String>> = h.drain().into_iter().map(|i| i.args["x"].clone()).collect();
    assert_eq!(args, vec![vec!["a".to_string()], vec!["b".to_string()]]);
}

#[test]
fn test_identical_applications_are_not_deduplicated() {
    let h = Harness::new();
    let one = apply(foreign("date", &[]));
    let value = Compound::new(vec![one.clone().into(), one.into()]);
    let residual = h.reduce(&value).unwrap();
    assert_eq!(residual.len(), 2);
    assert_ne!(residual.get(0), residual.get(1));
    assert_eq!(h.registry.outstanding(h.query), 2);
}

#[test]
fn test_missing_foreign_param_is_unbound() {
    let h = Harness::new();
    let app = Compound::single(apply(foreign("echo $x", &["x"])));
    assert_eq!(
        h.reduce(&app).unwrap_err(),
        ReduceError::UnboundName {
            name: "x".to_string()
        }
    );
    assert!(h.drain().is_empty());
}

#[test]
fn test_foreign_app_with_cond_param_stays_pending() {
    let h = Harness::new();
    let lam = foreign("echo $x", &["x"]);
    let pending_cond = Cond::new(
        Compound::single(TicketHandle::new(1, ticket(99))),
        lit(&["a"]),
        lit(&["b"]),
    );
    let app = Compound::single(apply(lam.clone()).bind("x", Compound::single(pending_cond)));

    let residual = h.reduce(&app).unwrap();
    let Some(Expr::App(res)) = residual.get(0) else {
        panic!("Expected the application to stay, got {}", residual);
    };
    assert_eq!(res.task, Compound::single(lam));
    assert!(h.drain().is_empty());
}

#[test]
fn test_foreign_app_with_app_param_stays_pending() {
    let mut h = Harness::new();
    let outer = foreign("wc -l $x", &["x"]);
    let app = Compound::single(
        apply(outer.clone()).bind("x", Compound::single(apply(foreign("ls", &[])))),
    );

    let residual = h.reduce(&app).unwrap();
    let Some(Expr::App(res)) = residual.get(0) else {
        panic!("Expected the application to stay, got {}", residual);
    };
    assert_eq!(res.task, Compound::single(outer));
    let first: Vec<String> = h.drain().into_iter().map(|i| i.lambda.src).collect();
    assert_eq!(first, vec!["ls"]);

    h.finish(1, ticket(1), lit(&["a.txt"]));
    let next = h.reduce(&residual).unwrap();
    assert_eq!(next, Compound::single(TicketHandle::new(1, ticket(2))));
    let second = h.drain();
    assert_eq!(second[0].args["x"], vec!["a.txt".to_string()]);
}
