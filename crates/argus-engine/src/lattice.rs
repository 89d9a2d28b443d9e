//! Order and lattice operations over the states of an abstract domain.
//!
//! For every pair of states `a`, `b` an implementation must satisfy
//! `is_leq(meet(a, b), a)`, `is_leq(a, join(a, b))`, `meet(a, a) == a`,
//! `join(a, a) == a`, `is_leq(a, top())` and `is_leq(bottom(), a)`.

/// Subsumption between abstract states: `is_leq(a, b)` holds when every
/// concrete state described by `a` is also described by `b`.
pub trait PartialOrder<S> {
    fn is_leq(&self, a: &S, b: &S) -> bool;
}

pub trait Lattice<S>: PartialOrder<S> {
    /// The least informative state.
    fn top(&self) -> S;

    /// The infeasible state.
    fn bottom(&self) -> S;

    /// Greatest lower bound.
    fn meet(&self, a: &S, b: &S) -> S;

    /// Least upper bound.
    fn join(&self, a: &S, b: &S) -> S;
}
