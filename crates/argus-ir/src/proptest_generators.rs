//! Proptest strategies for valuations and formulas over a small fixed variable pool.

use proptest::prelude::*;

use crate::decl::VarDecl;
use crate::expr::Expr;
use crate::literal::LitValue;
use crate::valuation::Valuation;

/// The variable pool every generated valuation draws from.
pub fn var_pool() -> Vec<VarDecl> {
    vec![
        VarDecl::int("x"),
        VarDecl::int("y"),
        VarDecl::int("z"),
        VarDecl::bool("b"),
    ]
}

fn arb_value_for(decl: &VarDecl) -> BoxedStrategy<LitValue> {
    if decl.name.as_ref() == "b" {
        any::<bool>().prop_map(LitValue::Bool).boxed()
    } else {
        // A narrow range so that independently generated valuations collide often.
        (-2i64..=2).prop_map(LitValue::Int).boxed()
    }
}

/// Strategy for a partial valuation over [`var_pool`].
pub fn arb_valuation() -> impl Strategy<Value = Valuation> {
    let per_var: Vec<_> = var_pool()
        .into_iter()
        .map(|d| {
            let value = arb_value_for(&d);
            proptest::option::of(value).prop_map(move |v| v.map(|v| (d.clone(), v)))
        })
        .collect();
    per_var.prop_map(|pairs| pairs.into_iter().flatten().collect())
}

fn arb_int_expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (-3i64..=3).prop_map(Expr::int),
        prop::sample::select(vec!["x", "y", "z"]).prop_map(|n| Expr::var(&VarDecl::int(n))),
    ];
    leaf.prop_recursive(3, 12, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::add(vec![a, b])),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::sub(a, b)),
            inner.clone().prop_map(Expr::neg),
            (inner, -2i64..=2).prop_map(|(a, k)| Expr::mul(vec![Expr::int(k), a])),
        ]
    })
}

/// Strategy for quantifier-free boolean formulas over [`var_pool`] using
/// linear integer arithmetic.
pub fn arb_bool_expr() -> impl Strategy<Value = Expr> {
    let atom = prop_oneof![
        any::<bool>().prop_map(Expr::bool),
        Just(Expr::var(&VarDecl::bool("b"))),
        (arb_int_expr(), arb_int_expr()).prop_map(|(a, b)| Expr::leq(a, b)),
        (arb_int_expr(), arb_int_expr()).prop_map(|(a, b)| Expr::eq(a, b)),
        (arb_int_expr(), arb_int_expr()).prop_map(|(a, b)| Expr::gt(a, b)),
    ];
    atom.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(Expr::not),
            prop::collection::vec(inner.clone(), 1..3).prop_map(Expr::and),
            prop::collection::vec(inner.clone(), 1..3).prop_map(Expr::or),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::imply(a, b)),
            (inner.clone(), inner).prop_map(|(a, b)| Expr::iff(a, b)),
        ]
    })
}
