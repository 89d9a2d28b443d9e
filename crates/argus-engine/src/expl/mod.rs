//! Explicit-value domain: a state binds some variables to concrete values and
//! leaves the others unconstrained.

mod analysis;
mod prec;
mod state;

pub use analysis::ExplAnalysis;
pub use prec::ExplPrec;
pub use state::{ExplLattice, ExplState};
