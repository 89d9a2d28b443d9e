use std::fmt;
use std::hash::Hash;

use argus_ir::{Edge, Expr, Valuation};
use argus_smt::{SessionError, SmtSolver, SolverSession};

use crate::lattice::PartialOrder;

/// An element of an abstract domain.
pub trait AbstractState: Clone + Eq + Hash + fmt::Debug + fmt::Display {
    /// True for the infeasible state.
    fn is_bottom(&self) -> bool;

    /// A formula over current-state variables describing the state.
    fn to_expr(&self) -> Expr;
}

/// The transfer functions of an abstract domain, parameterised by a
/// per-location precision.
pub trait Analysis {
    type State: AbstractState;
    type Prec: Clone + Eq;
    type Ord: PartialOrder<Self::State>;

    fn ord(&self) -> &Self::Ord;

    /// Abstract states covering every concrete state satisfying `init`.
    fn init_states<S>(
        &self,
        session: &mut SolverSession<S>,
        init: &Expr,
        prec: &Self::Prec,
    ) -> Result<Vec<Self::State>, SessionError<S::Error>>
    where
        S: SmtSolver,
        S::Error: 'static;

    /// Non-bottom abstract successors of `state` along `edge`.
    fn successors(&self, state: &Self::State, edge: &Edge, prec: &Self::Prec) -> Vec<Self::State>;

    /// False only if no concrete state in `state` can violate `prop`.
    fn may_violate(&self, state: &Self::State, prop: &Expr) -> bool;

    /// The most precise abstract state containing the concrete valuation.
    fn valuation_to_state(&self, val: &Valuation) -> Self::State;
}
