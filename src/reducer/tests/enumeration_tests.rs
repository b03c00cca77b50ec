//! Tests for cross product, correlated (dot product) and candidate enumeration

use super::helpers::*;
use crate::reducer::types::*;
use crate::reducer::ReduceError;

/// `out1 out2 : p1 p2` (or `[p1 p2]` when correlated) echoing both params
fn pairs(correlated: bool) -> NativeLambda {
    let sign = Signature::new().output("out1").output("out2");
    let sign = if correlated {
        sign.correlated(["p1", "p2"])
    } else {
        sign.param("p1").param("p2")
    };
    NativeLambda::new(sign, bindings(&[("out1", var("p1")), ("out2", var("p2"))]))
}

fn pairs_app(lam: NativeLambda, channel: usize) -> Compound {
    Compound::single(
        Apply::new(channel, Compound::single(lam))
            .bind("p1", lit(&["A", "B"]))
            .bind("p2", lit(&["1", "2"])),
    )
}

/* ===================== Cross product ===================== */

#[test]
fn test_cross_product() {
    let h = Harness::new();
    assert_eq!(
        h.reduce(&pairs_app(pairs(false), 1)).unwrap(),
        lit(&["A", "A", "B", "B"])
    );
    assert_eq!(
        h.reduce(&pairs_app(pairs(false), 2)).unwrap(),
        lit(&["1", "2", "1", "2"])
    );
}

#[test]
fn test_three_dimensions_first_is_slowest() {
    let h = Harness::new();
    let lam = NativeLambda::new(
        Signature::new().output("out").param("a").param("b").param("c"),
        bindings(&[(
            "out",
            Compound::new(vec![Expr::var("a"), Expr::var("b"), Expr::var("c")]),
        )]),
    );
    let app = Compound::single(
        apply(lam)
            .bind("a", lit(&["a1", "a2"]))
            .bind("b", lit(&["b1"]))
            .bind("c", lit(&["c1", "c2"])),
    );
    assert_eq!(
        h.reduce(&app).unwrap(),
        lit(&[
            "a1", "b1", "c1", //
            "a1", "b1", "c2", //
            "a2", "b1", "c1", //
            "a2", "b1", "c2",
        ])
    );
}

#[test]
fn test_empty_param_yields_nothing() {
    let h = Harness::new();
    let app = Compound::single(apply(identity()).bind("inp", Compound::nil()));
    assert_eq!(h.reduce(&app).unwrap(), Compound::nil());
}

/* ===================== Correlated groups ===================== */

#[test]
fn test_dot_product() {
    let h = Harness::new();
    assert_eq!(
        h.reduce(&pairs_app(pairs(true), 1)).unwrap(),
        lit(&["A", "B"])
    );
    assert_eq!(
        h.reduce(&pairs_app(pairs(true), 2)).unwrap(),
        lit(&["1", "2"])
    );
}

#[test]
fn test_correlated_cardinality_mismatch() {
    let h = Harness::new();
    let app = Compound::single(
        apply(pairs(true))
            .bind("p1", lit(&["A", "B"]))
            .bind("p2", lit(&["1"])),
    );
    let err = h.reduce(&app).unwrap_err();
    assert_eq!(
        err,
        ReduceError::Consistency {
            names: vec!["p1".to_string(), "p2".to_string()],
            cardinalities: vec![2, 1],
        }
    );
    assert_eq!(err.kind(), "ConsistencyError");
}

#[test]
fn test_task_correlation() {
    let h = Harness::new();
    let sign = Signature::new().output("out").correlated(["task", "c"]).param("p");
    let first = NativeLambda::new(
        sign.clone(),
        bindings(&[("out", Compound::new(vec![Expr::var("c"), Expr::var("p")]))]),
    );
    let second = NativeLambda::new(
        sign,
        bindings(&[("out", Compound::new(vec![Expr::var("p"), Expr::var("c")]))]),
    );
    let app = Compound::single(
        Apply::new(1, Compound::new(vec![first.into(), second.into()]))
            .bind("c", lit(&["A", "B"]))
            .bind("p", lit(&["1", "2"])),
    );
    assert_eq!(
        h.reduce(&app).unwrap(),
        lit(&["A", "1", "A", "2", "1", "B", "2", "B"])
    );
}

#[test]
fn test_task_correlation_mismatch() {
    let h = Harness::new();
    let sign = Signature::new().output("out").correlated(["task", "c"]);
    let lam = NativeLambda::new(sign, bindings(&[("out", var("c"))]));
    let app = Compound::single(
        Apply::new(1, Compound::new(vec![lam.clone().into(), lam.into()]))
            .bind("c", lit(&["A", "B", "C"])),
    );
    assert!(matches!(
        h.reduce(&app),
        Err(ReduceError::Consistency { cardinalities, .. }) if cardinalities == vec![2, 3]
    ));
}

/* ===================== Uncorrelated candidates ===================== */

#[test]
fn test_candidates_concatenate_in_order() {
    let h = Harness::new();
    let tagged = |tag: &str| {
        NativeLambda::new(
            Signature::new().output("out").param("inp"),
            bindings(&[("out", Compound::new(vec![Expr::str(tag), Expr::var("inp")]))]),
        )
    };
    let app = Compound::single(
        Apply::new(1, Compound::new(vec![tagged("1").into(), tagged("2").into()]))
            .bind("inp", lit(&["a", "b"])),
    );
    assert_eq!(
        h.reduce(&app).unwrap(),
        lit(&["1", "a", "1", "b", "2", "a", "2", "b"])
    );
}

#[test]
fn test_candidate_list_with_literal_fails() {
    let h = Harness::new();
    let app = Compound::single(Apply::new(
        1,
        Compound::new(vec![identity().into(), Expr::str("oops")]),
    ));
    assert_eq!(
        h.reduce(&app).unwrap_err(),
        ReduceError::NotCallable {
            found: "'oops'".to_string()
        }
    );
}

/* ===================== Cascading applications ===================== */

#[test]
fn test_cascading_app_does_not_break_enumeration() {
    let h = Harness::new();
    let lam = NativeLambda::new(
        Signature::new().output("out").param("a").param("b"),
        bindings(&[("out", Compound::new(vec![Expr::var("a"), Expr::var("b")]))]),
    );
    let inner = apply(identity()).bind("inp", lit(&["1", "2"]));
    let app = Compound::single(
        apply(lam)
            .bind("a", lit(&["A"]))
            .bind("b", Compound::single(inner)),
    );
    assert_eq!(h.reduce(&app).unwrap(), lit(&["A", "1", "A", "2"]));
}

#[test]
fn test_pending_binding_defers_enumeration() {
    let mut h = Harness::new();
    let lam = NativeLambda::new(
        Signature::new().output("out").param("a").param("b"),
        bindings(&[("out", Compound::new(vec![Expr::var("a"), Expr::var("b")]))]),
    );
    let app = Compound::single(
        apply(lam.clone())
            .bind("a", lit(&["A"]))
            .bind("b", Compound::single(apply(foreign("seq 1 2", &[])))),
    );

    let observer = RecordingObserver::default();
    let residual = h.reduce_observed(&app, &observer).unwrap();
    assert_eq!(observer.events(), vec!["requested 1", "deferred"]);
    assert_eq!(
        residual,
        Compound::single(
            apply(lam)
                .bind("a", lit(&["A"]))
                .bind("b", Compound::single(TicketHandle::new(1, ticket(1)))),
        )
    );

    h.finish(1, ticket(1), lit(&["1", "2"]));
    assert_eq!(h.reduce(&residual).unwrap(), lit(&["A", "1", "A", "2"]));
}

#[test]
fn test_pending_aggregate_defers_enumeration() {
    let mut h = Harness::new();
    let lam = NativeLambda::new(
        Signature::new().output("out").aggregate_param("all"),
        bindings(&[("out", Compound::new(vec![Expr::str("n"), Expr::var("all")]))]),
    );
    let app = Compound::single(
        apply(lam).bind("all", Compound::single(apply(foreign("ls", &[])))),
    );
    let residual = h.reduce(&app).unwrap();
    assert!(matches!(residual.get(0), Some(Expr::App(_))));

    h.finish(1, ticket(1), lit(&["x", "y", "z"]));
    assert_eq!(h.reduce(&residual).unwrap(), lit(&["n", "x", "y", "z"]));
}
