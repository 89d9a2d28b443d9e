//! Moving between the primed and the step-indexed views of a formula.

use crate::decl::Decl;
use crate::expr::{Expr, ExprKind};
use crate::indexing::VarIndexing;

/// Pins every state variable to its step: a reference to `x` under `n` primes
/// becomes `x#(indexing(x) + n)`. Quantifier parameters and already indexed
/// references are left untouched.
pub fn unfold(expr: &Expr, indexing: &VarIndexing) -> Expr {
    unfold_shifted(expr, indexing, 0)
}

fn unfold_shifted(expr: &Expr, indexing: &VarIndexing, primes: u32) -> Expr {
    match expr.kind() {
        ExprKind::Ref(Decl::Var(v)) => Expr::indexed(v, indexing.get(v) + primes),
        ExprKind::Prime(op) => unfold_shifted(op, indexing, primes + 1),
        _ => expr.map_children(|c| unfold_shifted(c, indexing, primes)),
    }
}

/// Wraps each variable reference in as many primes as `counts` assigns to it.
pub fn prime_by(expr: &Expr, counts: &VarIndexing) -> Expr {
    match expr.kind() {
        ExprKind::Ref(Decl::Var(v)) => Expr::primed(expr.clone(), counts.get(v)),
        ExprKind::Prime(_) => expr.clone(),
        _ => expr.map_children(|c| prime_by(c, counts)),
    }
}

/// Largest number of primes applied to each variable anywhere in `expr`.
pub fn prime_depths(expr: &Expr) -> VarIndexing {
    fn walk(expr: &Expr, primes: u32, acc: &mut VarIndexing) {
        match expr.kind() {
            ExprKind::Ref(Decl::Var(v)) => {
                if primes > acc.get(v) {
                    *acc = acc.with(v, primes);
                }
            }
            ExprKind::Prime(op) => walk(op, primes + 1, acc),
            _ => {
                for c in expr.children() {
                    walk(c, primes, acc);
                }
            }
        }
    }
    let mut acc = VarIndexing::all(0);
    walk(expr, 0, &mut acc);
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::VarDecl;

    #[test]
    fn unfold_shifts_primed_references() {
        let x = VarDecl::int("x");
        let y = VarDecl::int("y");
        let idx = VarIndexing::all(2).with(&y, 5);
        let e = Expr::eq(
            Expr::prime(Expr::var(&x)),
            Expr::add(vec![Expr::var(&x), Expr::var(&y)]),
        );
        let expected = Expr::eq(
            Expr::indexed(&x, 3),
            Expr::add(vec![Expr::indexed(&x, 2), Expr::indexed(&y, 5)]),
        );
        assert_eq!(unfold(&e, &idx), expected);
    }

    #[test]
    fn unfold_leaves_bound_parameters_alone() {
        let x = VarDecl::int("x");
        let p = VarDecl::int("p");
        let e = Expr::exists(vec![p.clone()], Expr::lt(Expr::param(&p), Expr::var(&x)));
        let expected = Expr::exists(vec![p.clone()], Expr::lt(Expr::param(&p), Expr::indexed(&x, 1)));
        assert_eq!(unfold(&e, &VarIndexing::all(1)), expected);
    }

    #[test]
    fn prime_depths_records_deepest_prime() {
        let x = VarDecl::int("x");
        let y = VarDecl::int("y");
        let e = Expr::and(vec![
            Expr::eq(Expr::primed(Expr::var(&x), 2), Expr::var(&y)),
            Expr::eq(Expr::prime(Expr::var(&x)), Expr::int(0)),
        ]);
        let depths = prime_depths(&e);
        assert_eq!(depths.get(&x), 2);
        assert_eq!(depths.get(&y), 0);
    }

    #[test]
    fn prime_by_then_unfold_equals_shifted_unfold() {
        let x = VarDecl::int("x");
        let counts = VarIndexing::all(0).with(&x, 2);
        let e = Expr::geq(Expr::var(&x), Expr::int(0));
        assert_eq!(
            unfold(&prime_by(&e, &counts), &VarIndexing::all(1)),
            unfold(&e, &VarIndexing::all(3))
        );
    }
}
