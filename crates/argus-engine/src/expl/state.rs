use std::fmt;

use argus_ir::{Expr, Valuation};

use crate::analysis::AbstractState;
use crate::lattice::{Lattice, PartialOrder};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExplState {
    Bottom,
    /// Bound variables hold exactly their value; unbound ones are free.
    Val(Valuation),
}

impl ExplState {
    pub fn top() -> Self {
        ExplState::Val(Valuation::new())
    }

    pub fn valuation(&self) -> Option<&Valuation> {
        match self {
            ExplState::Bottom => None,
            ExplState::Val(v) => Some(v),
        }
    }
}

impl From<Valuation> for ExplState {
    fn from(val: Valuation) -> Self {
        ExplState::Val(val)
    }
}

impl AbstractState for ExplState {
    fn is_bottom(&self) -> bool {
        matches!(self, ExplState::Bottom)
    }

    fn to_expr(&self) -> Expr {
        match self {
            ExplState::Bottom => Expr::false_(),
            ExplState::Val(v) => v.to_expr(),
        }
    }
}

impl fmt::Display for ExplState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExplState::Bottom => write!(f, "bottom"),
            ExplState::Val(v) => write!(f, "{v}"),
        }
    }
}

/// Lattice of explicit states ordered by binding inclusion: more bindings
/// describe fewer concrete states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExplLattice;

impl ExplLattice {
    /// Shared stateless instance.
    pub const INSTANCE: ExplLattice = ExplLattice;
}

impl PartialOrder<ExplState> for ExplLattice {
    fn is_leq(&self, a: &ExplState, b: &ExplState) -> bool {
        match (a, b) {
            (ExplState::Bottom, _) => true,
            (_, ExplState::Bottom) => false,
            (ExplState::Val(a), ExplState::Val(b)) => a.is_leq(b),
        }
    }
}

impl Lattice<ExplState> for ExplLattice {
    fn top(&self) -> ExplState {
        ExplState::top()
    }

    fn bottom(&self) -> ExplState {
        ExplState::Bottom
    }

    /// Union of the bindings; a variable bound to two different values makes
    /// the conjunction infeasible.
    fn meet(&self, a: &ExplState, b: &ExplState) -> ExplState {
        match (a, b) {
            (ExplState::Val(a), ExplState::Val(b)) => {
                a.disjoint_union(b).map_or(ExplState::Bottom, ExplState::Val)
            }
            _ => ExplState::Bottom,
        }
    }

    /// Bindings both sides agree on.
    fn join(&self, a: &ExplState, b: &ExplState) -> ExplState {
        match (a, b) {
            (ExplState::Bottom, other) | (other, ExplState::Bottom) => other.clone(),
            (ExplState::Val(a), ExplState::Val(b)) => ExplState::Val(a.agreement(b)),
        }
    }
}
